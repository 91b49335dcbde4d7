use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::catalog::{CategoryView, ProductStatus, ProductView};
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderStatus, OrderView};
use crate::domain::user::{Role, UserView};
use crate::schema::{categories, order_lines, orders, products, sessions, users};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_view(self) -> Result<UserView, DomainError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| DomainError::Internal(format!("unknown role '{}'", self.role)))?;
        Ok(UserView {
            id: self.id,
            username: self.username,
            email: self.email,
            role,
            phone: self.phone,
            address: self.address,
            position: self.position,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChangeset {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryRow> for CategoryView {
    fn from(row: CategoryRow) -> Self {
        CategoryView {
            id: row.id,
            name: row.name,
            icon: row.icon,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategoryRow {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price: BigDecimal,
    pub status: String,
    pub quantity: i32,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn into_view(self, category_name: String) -> Result<ProductView, DomainError> {
        let status = ProductStatus::parse(&self.status).ok_or_else(|| {
            DomainError::Internal(format!("unknown product status '{}'", self.status))
        })?;
        Ok(ProductView {
            id: self.id,
            name: self.name,
            description: self.description,
            category_id: self.category_id,
            category_name,
            price: self.price,
            status,
            quantity: self.quantity,
            image: self.image,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price: BigDecimal,
    pub status: String,
    pub quantity: i32,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub status: String,
    pub total: BigDecimal,
    pub created_in_person: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn parsed_status(&self) -> Result<OrderStatus, DomainError> {
        OrderStatus::parse(&self.status).ok_or_else(|| {
            DomainError::Internal(format!("unknown order status '{}'", self.status))
        })
    }

    pub fn into_view(
        self,
        customer_name: String,
        lines: Vec<crate::domain::order::OrderLineView>,
    ) -> Result<OrderView, DomainError> {
        let status = self.parsed_status()?;
        Ok(OrderView {
            id: self.id,
            customer_id: self.customer_id,
            customer_name,
            employee_id: self.employee_id,
            status,
            total: self.total,
            created_in_person: self.created_in_person,
            created_at: self.created_at,
            lines,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub status: String,
    pub total: BigDecimal,
    pub created_in_person: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = sessions)]
#[diesel(primary_key(token))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionRow {
    pub token: String,
    pub user_id: Uuid,
    pub cart: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSessionRow {
    pub token: String,
    pub user_id: Uuid,
    pub cart: Value,
}
