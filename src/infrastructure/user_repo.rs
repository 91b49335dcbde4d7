use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, Role, UserPatch, UserView};
use crate::schema::users;

use super::models::{NewUserRow, UserChangeset, UserRow};

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn insert(&self, user: NewUser) -> Result<UserView, DomainError> {
        let mut conn = self.pool.get()?;
        let row: UserRow = diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: Uuid::new_v4(),
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                role: user.role.as_str().to_string(),
                phone: user.phone,
                address: user.address,
                position: user.position,
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)?;
        row.into_view()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<UserView>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(UserRow::into_view)
            .transpose()
    }

    fn find_with_hash_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(UserView, Option<String>)>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<UserRow> = users::table
            .filter(users::username.eq(username))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|row| {
            let hash = row.password_hash.clone();
            row.into_view().map(|view| (view, hash))
        })
        .transpose()
    }

    fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let count: i64 = users::table
            .filter(
                users::username
                    .eq(username)
                    .or(users::email.eq(Some(email))),
            )
            .count()
            .get_result(&mut conn)?;
        Ok(count > 0)
    }

    fn list_by_role(&self, role: Role) -> Result<Vec<UserView>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .filter(users::role.eq(role.as_str()))
            .order(users::created_at.desc())
            .select(UserRow::as_select())
            .load::<UserRow>(&mut conn)?
            .into_iter()
            .map(UserRow::into_view)
            .collect()
    }

    fn update(&self, id: Uuid, patch: UserPatch) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(users::table.find(id))
            .set(&UserChangeset {
                username: patch.username,
                email: patch.email,
                phone: patch.phone,
                address: patch.address,
                position: patch.position,
                is_active: patch.is_active,
            })
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("User"));
        }
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(users::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(DomainError::NotFound("User"));
        }
        Ok(())
    }

    fn count_by_role(&self, role: Role) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(users::table
            .filter(users::role.eq(role.as_str()))
            .count()
            .get_result(&mut conn)?)
    }

    fn count_all(&self) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(users::table.count().get_result(&mut conn)?)
    }

    fn admin_exists(&self) -> Result<bool, DomainError> {
        Ok(self.count_by_role(Role::Admin)? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::test_support::{seed_user, setup_db};

    fn sample(role: Role, username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: Some(format!("{}@test.example", username)),
            password_hash: Some("$argon2id$fake".to_string()),
            role,
            phone: None,
            address: None,
            position: None,
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool);

        let created = repo.insert(sample(Role::Customer, "ana")).unwrap();
        let found = repo.find_by_id(created.id).unwrap().expect("user exists");

        assert_eq!(found.username, "ana");
        assert_eq!(found.role, Role::Customer);
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool);

        repo.insert(sample(Role::Customer, "bo")).unwrap();
        let err = repo.insert(sample(Role::Customer, "bo")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn username_or_email_taken_checks_both_columns() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool);
        repo.insert(sample(Role::Customer, "cleo")).unwrap();

        assert!(repo.username_or_email_taken("cleo", "other@x.y").unwrap());
        assert!(repo
            .username_or_email_taken("other", "cleo@test.example")
            .unwrap());
        assert!(!repo.username_or_email_taken("other", "other@x.y").unwrap());
    }

    #[tokio::test]
    async fn update_patches_only_given_fields() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool);
        let user = repo.insert(sample(Role::Employee, "dani")).unwrap();

        repo.update(
            user.id,
            UserPatch {
                phone: Some("77777777".into()),
                is_active: Some(false),
                ..UserPatch::default()
            },
        )
        .unwrap();

        let updated = repo.find_by_id(user.id).unwrap().expect("user exists");
        assert_eq!(updated.username, "dani");
        assert_eq!(updated.phone.as_deref(), Some("77777777"));
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool);
        assert!(matches!(
            repo.delete(Uuid::new_v4()),
            Err(DomainError::NotFound("User"))
        ));
    }

    #[tokio::test]
    async fn admin_exists_after_seeding_one() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool.clone());

        assert!(!repo.admin_exists().unwrap());
        seed_user(&pool, Role::Admin);
        assert!(repo.admin_exists().unwrap());
    }
}
