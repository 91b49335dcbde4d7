use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::catalog::{CategoryView, ProductView};
use crate::domain::order::{OrderLineView, OrderView};
use crate::domain::user::UserView;

// ── Shared response DTOs ─────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub status: String,
    pub quantity: i32,
    pub image: Option<String>,
}

impl From<ProductView> for ProductResponse {
    fn from(p: ProductView) -> Self {
        ProductResponse {
            id: p.id,
            name: p.name,
            description: p.description,
            category_id: p.category_id,
            category_name: p.category_name,
            price: p.price.to_string(),
            status: p.status.as_str().to_string(),
            quantity: p.quantity,
            image: p.image,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub description: String,
}

impl From<CategoryView> for CategoryResponse {
    fn from(c: CategoryView) -> Self {
        CategoryResponse {
            id: c.id,
            name: c.name,
            icon: c.icon,
            description: c.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
}

impl From<UserView> for UserResponse {
    fn from(u: UserView) -> Self {
        UserResponse {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role.as_str().to_string(),
            phone: u.phone,
            address: u.address,
            position: u.position,
            is_active: u.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub subtotal: String,
}

impl From<OrderLineView> for OrderLineResponse {
    fn from(l: OrderLineView) -> Self {
        OrderLineResponse {
            id: l.id,
            product_id: l.product_id,
            product_name: l.product_name,
            quantity: l.quantity,
            unit_price: l.unit_price.to_string(),
            subtotal: l.subtotal.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub employee_id: Option<Uuid>,
    pub status: String,
    pub total: String,
    pub created_in_person: bool,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        OrderResponse {
            id: o.id,
            customer_id: o.customer_id,
            customer_name: o.customer_name,
            employee_id: o.employee_id,
            status: o.status.as_str().to_string(),
            total: o.total.to_string(),
            created_in_person: o.created_in_person,
            created_at: o.created_at.to_rfc3339(),
            lines: o.lines.into_iter().map(OrderLineResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Shared request DTOs ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

impl ListParams {
    /// Clamped (page, limit, offset-ready) values.
    pub fn clamped(&self) -> (i64, i64) {
        (self.page.max(1), self.limit.clamp(1, 100))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderLineBody {
    pub product_id: Uuid,
    pub quantity: i32,
}
