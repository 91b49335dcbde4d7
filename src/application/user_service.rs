use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, Role, UserPatch, UserView};

/// Contact details managed through the admin user CRUD. These records are
/// directory entries; credentials are only ever set through registration.
#[derive(Debug, Clone)]
pub struct ContactInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
}

pub struct UserService<U> {
    users: U,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    pub fn list(&self, role: Role) -> Result<Vec<UserView>, DomainError> {
        self.users.list_by_role(role)
    }

    pub fn create(&self, role: Role, input: ContactInput) -> Result<UserView, DomainError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("Name is required".into()));
        }
        if role == Role::Customer && input.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
            return Err(DomainError::Validation("Name and email are required".into()));
        }
        self.users.insert(NewUser {
            username: name.to_string(),
            email: input.email.map(|e| e.trim().to_string()),
            password_hash: None,
            role,
            phone: input.phone,
            address: input.address,
            position: input.position,
        })
    }

    pub fn update(&self, id: Uuid, input: ContactInput) -> Result<(), DomainError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("Name is required".into()));
        }
        self.users.update(
            id,
            UserPatch {
                username: Some(name.to_string()),
                email: input.email,
                phone: input.phone,
                address: input.address,
                position: input.position,
                ..UserPatch::default()
            },
        )
    }

    pub fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        self.users.delete(id)
    }
}
