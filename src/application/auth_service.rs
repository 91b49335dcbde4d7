use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::domain::errors::DomainError;
use crate::domain::ports::{SessionStore, UserRepository};
use crate::domain::session::{Cart, SessionData};
use crate::domain::user::{NewUser, Role, UserView};

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Honored only when the acting caller is an admin; anything else is
    /// degraded to customer.
    pub requested_role: Option<Role>,
}

pub struct AuthService<U, S> {
    users: U,
    sessions: S,
}

impl<U: UserRepository, S: SessionStore> AuthService<U, S> {
    pub fn new(users: U, sessions: S) -> Self {
        Self { users, sessions }
    }

    pub fn register(
        &self,
        req: RegisterRequest,
        acting_is_admin: bool,
    ) -> Result<(UserView, SessionData), DomainError> {
        let username = req.username.trim();
        let email = req.email.trim();
        if username.is_empty() || email.is_empty() || req.password.is_empty() {
            return Err(DomainError::Validation(
                "Username, email and password are required".into(),
            ));
        }
        if self.users.username_or_email_taken(username, email)? {
            return Err(DomainError::Conflict(
                "Username or email already registered".into(),
            ));
        }

        let role = match req.requested_role {
            Some(role @ (Role::Admin | Role::Employee)) if acting_is_admin => role,
            _ => Role::Customer,
        };

        let user = self.users.insert(NewUser {
            username: username.to_string(),
            email: Some(email.to_string()),
            password_hash: Some(hash_password(&req.password)?),
            role,
            phone: None,
            address: None,
            position: None,
        })?;
        let session = self.sessions.create(user.id)?;
        Ok((user, session))
    }

    pub fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(UserView, SessionData), DomainError> {
        let Some((user, hash)) = self.users.find_with_hash_by_username(username)? else {
            return Err(DomainError::Validation("Unknown username".into()));
        };
        let Some(hash) = hash else {
            // Walk-in customer records carry no credentials.
            return Err(DomainError::Validation(
                "This account cannot log in".into(),
            ));
        };
        if !verify_password(&hash, password) {
            return Err(DomainError::Validation("Wrong password".into()));
        }
        if !user.is_active {
            return Err(DomainError::Validation("Account is deactivated".into()));
        }
        let session = self.sessions.create(user.id)?;
        Ok((user, session))
    }

    pub fn logout(&self, token: &str) -> Result<(), DomainError> {
        self.sessions.delete(token)
    }

    /// Resolve a session token to its user, revalidating the account on
    /// every request. Sessions pointing at a deleted or deactivated user
    /// are removed server-side.
    pub fn authenticate(
        &self,
        token: &str,
    ) -> Result<Option<(UserView, SessionData)>, DomainError> {
        let Some(session) = self.sessions.get(token)? else {
            return Ok(None);
        };
        match self.users.find_by_id(session.user_id)? {
            Some(user) if user.is_active => Ok(Some((user, session))),
            _ => {
                self.sessions.delete(token)?;
                Ok(None)
            }
        }
    }

    pub fn update_cart(&self, token: &str, cart: &Cart) -> Result<(), DomainError> {
        self.sessions.save_cart(token, cart)
    }

    /// Create the first admin account when none exists yet. Returns whether
    /// a user was created.
    pub fn ensure_initial_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<bool, DomainError> {
        if self.users.admin_exists()? {
            return Ok(false);
        }
        self.users.insert(NewUser {
            username: username.to_string(),
            email: Some(email.to_string()),
            password_hash: Some(hash_password(password)?),
            role: Role::Admin,
            phone: None,
            address: None,
            position: None,
        })?;
        Ok(true)
    }
}

fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(format!("password hashing failed: {}", e)))
}

fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;
    use crate::domain::user::UserPatch;

    #[derive(Default)]
    struct InMemoryUsers {
        rows: Mutex<Vec<(UserView, Option<String>)>>,
    }

    impl InMemoryUsers {
        fn push(&self, user: NewUser) -> UserView {
            let view = UserView {
                id: Uuid::new_v4(),
                username: user.username,
                email: user.email,
                role: user.role,
                phone: user.phone,
                address: user.address,
                position: user.position,
                is_active: true,
                created_at: chrono::Utc::now(),
            };
            self.rows
                .lock()
                .unwrap()
                .push((view.clone(), user.password_hash));
            view
        }
    }

    impl UserRepository for InMemoryUsers {
        fn insert(&self, user: NewUser) -> Result<UserView, DomainError> {
            Ok(self.push(user))
        }

        fn find_by_id(&self, id: Uuid) -> Result<Option<UserView>, DomainError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|(u, _)| u.id == id)
                .map(|(u, _)| u.clone()))
        }

        fn find_with_hash_by_username(
            &self,
            username: &str,
        ) -> Result<Option<(UserView, Option<String>)>, DomainError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|(u, _)| u.username == username)
                .cloned())
        }

        fn username_or_email_taken(
            &self,
            username: &str,
            email: &str,
        ) -> Result<bool, DomainError> {
            Ok(self.rows.lock().unwrap().iter().any(|(u, _)| {
                u.username == username || u.email.as_deref() == Some(email)
            }))
        }

        fn list_by_role(&self, role: Role) -> Result<Vec<UserView>, DomainError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|(u, _)| u.role == role)
                .map(|(u, _)| u.clone())
                .collect())
        }

        fn update(&self, id: Uuid, patch: UserPatch) -> Result<(), DomainError> {
            let mut rows = self.rows.lock().unwrap();
            let (user, _) = rows
                .iter_mut()
                .find(|(u, _)| u.id == id)
                .ok_or(DomainError::NotFound("User"))?;
            if let Some(active) = patch.is_active {
                user.is_active = active;
            }
            Ok(())
        }

        fn delete(&self, id: Uuid) -> Result<(), DomainError> {
            self.rows.lock().unwrap().retain(|(u, _)| u.id != id);
            Ok(())
        }

        fn count_by_role(&self, role: Role) -> Result<i64, DomainError> {
            Ok(self.list_by_role(role)?.len() as i64)
        }

        fn count_all(&self) -> Result<i64, DomainError> {
            Ok(self.rows.lock().unwrap().len() as i64)
        }

        fn admin_exists(&self) -> Result<bool, DomainError> {
            Ok(self.count_by_role(Role::Admin)? > 0)
        }
    }

    #[derive(Default)]
    struct InMemorySessions {
        rows: Mutex<Vec<SessionData>>,
    }

    impl SessionStore for InMemorySessions {
        fn create(&self, user_id: Uuid) -> Result<SessionData, DomainError> {
            let session = SessionData {
                token: Uuid::new_v4().to_string(),
                user_id,
                cart: Cart::new(),
            };
            self.rows.lock().unwrap().push(session.clone());
            Ok(session)
        }

        fn get(&self, token: &str) -> Result<Option<SessionData>, DomainError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.token == token)
                .cloned())
        }

        fn save_cart(&self, token: &str, cart: &Cart) -> Result<(), DomainError> {
            let mut rows = self.rows.lock().unwrap();
            let session = rows
                .iter_mut()
                .find(|s| s.token == token)
                .ok_or(DomainError::NotFound("Session"))?;
            session.cart = cart.clone();
            Ok(())
        }

        fn delete(&self, token: &str) -> Result<(), DomainError> {
            self.rows.lock().unwrap().retain(|s| s.token != token);
            Ok(())
        }
    }

    fn service() -> AuthService<InMemoryUsers, InMemorySessions> {
        AuthService::new(InMemoryUsers::default(), InMemorySessions::default())
    }

    fn register_req(username: &str, role: Option<Role>) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "hunter2".to_string(),
            requested_role: role,
        }
    }

    #[test]
    fn register_then_login_round_trip() {
        let svc = service();
        let (user, _) = svc.register(register_req("alice", None), false).unwrap();
        assert_eq!(user.role, Role::Customer);

        let (back, session) = svc.login("alice", "hunter2").unwrap();
        assert_eq!(back.id, user.id);
        assert!(svc.authenticate(&session.token).unwrap().is_some());
    }

    #[test]
    fn register_rejects_missing_fields() {
        let svc = service();
        let mut req = register_req("bob", None);
        req.password.clear();
        assert!(matches!(
            svc.register(req, false),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn register_rejects_duplicate_username_or_email() {
        let svc = service();
        svc.register(register_req("carol", None), false).unwrap();
        assert!(matches!(
            svc.register(register_req("carol", None), false),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn elevated_roles_require_an_acting_admin() {
        let svc = service();
        let (as_guest, _) = svc
            .register(register_req("eve", Some(Role::Admin)), false)
            .unwrap();
        assert_eq!(as_guest.role, Role::Customer);

        let (as_admin, _) = svc
            .register(register_req("frank", Some(Role::Employee)), true)
            .unwrap();
        assert_eq!(as_admin.role, Role::Employee);
    }

    #[test]
    fn login_rejects_wrong_password() {
        let svc = service();
        svc.register(register_req("gina", None), false).unwrap();
        assert!(matches!(
            svc.login("gina", "wrong"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn login_rejects_unknown_username() {
        let svc = service();
        assert!(matches!(
            svc.login("nobody", "x"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn deactivated_user_session_is_cleared_on_authenticate() {
        let svc = service();
        let (user, session) = svc.register(register_req("hank", None), false).unwrap();

        svc.users
            .update(
                user.id,
                UserPatch {
                    is_active: Some(false),
                    ..UserPatch::default()
                },
            )
            .unwrap();

        assert!(svc.authenticate(&session.token).unwrap().is_none());
        // The stale session was deleted, not merely hidden.
        assert!(svc.sessions.get(&session.token).unwrap().is_none());
    }

    #[test]
    fn logout_invalidates_the_token() {
        let svc = service();
        let (_, session) = svc.register(register_req("iris", None), false).unwrap();
        svc.logout(&session.token).unwrap();
        assert!(svc.authenticate(&session.token).unwrap().is_none());
    }

    #[test]
    fn initial_admin_is_created_once() {
        let svc = service();
        assert!(svc.ensure_initial_admin("admin", "a@b.c", "secret").unwrap());
        assert!(!svc.ensure_initial_admin("admin2", "x@y.z", "secret").unwrap());
        let (admin, _) = svc.login("admin", "secret").unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
