use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Account roles, ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Employee,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Customer => "customer",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "employee" => Some(Role::Employee),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }

    /// Landing page for the role, used after login and on authorization
    /// redirects.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/",
            Role::Employee => "/empleado/",
            Role::Customer => "/cliente/index",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload. `password_hash` is `None` for walk-in customer records,
/// which cannot log in.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
}

/// Partial update; `None` fields are left untouched. Credentials are only
/// ever set at registration time, never patched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
    pub is_active: Option<bool>,
}
