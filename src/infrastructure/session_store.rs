use diesel::prelude::*;
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::SessionStore;
use crate::domain::session::{Cart, SessionData};
use crate::schema::sessions;

use super::models::{NewSessionRow, SessionRow};

const TOKEN_LENGTH: usize = 48;

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub struct DieselSessionStore {
    pool: DbPool,
}

impl DieselSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SessionStore for DieselSessionStore {
    fn create(&self, user_id: Uuid) -> Result<SessionData, DomainError> {
        let mut conn = self.pool.get()?;
        let token = generate_token();
        diesel::insert_into(sessions::table)
            .values(&NewSessionRow {
                token: token.clone(),
                user_id,
                cart: serde_json::json!({}),
            })
            .execute(&mut conn)?;
        Ok(SessionData {
            token,
            user_id,
            cart: Cart::new(),
        })
    }

    fn get(&self, token: &str) -> Result<Option<SessionData>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<SessionRow> = sessions::table
            .find(token)
            .select(SessionRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|row| {
            let cart: Cart = serde_json::from_value(row.cart)
                .map_err(|e| DomainError::Internal(format!("corrupt session cart: {}", e)))?;
            Ok(SessionData {
                token: row.token,
                user_id: row.user_id,
                cart,
            })
        })
        .transpose()
    }

    fn save_cart(&self, token: &str, cart: &Cart) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let value = serde_json::to_value(cart)
            .map_err(|e| DomainError::Internal(format!("cart serialization failed: {}", e)))?;
        let updated = diesel::update(sessions::table.find(token))
            .set(sessions::cart.eq(value))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Session"));
        }
        Ok(())
    }

    fn delete(&self, token: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(sessions::table.find(token)).execute(&mut conn)?;
        Ok(())
    }
}
