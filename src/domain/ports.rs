use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::{CategoryInput, CategoryView, ProductFilter, ProductInput, ProductView};
use super::errors::DomainError;
use super::order::{ListResult, NewOrder, OrderFilter, OrderLineInput, OrderView};
use super::session::{Cart, SessionData};
use super::user::{NewUser, Role, UserPatch, UserView};

pub trait UserRepository: Send + Sync + 'static {
    fn insert(&self, user: NewUser) -> Result<UserView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<UserView>, DomainError>;
    /// The view plus the stored password hash, for credential checks.
    fn find_with_hash_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(UserView, Option<String>)>, DomainError>;
    fn username_or_email_taken(&self, username: &str, email: &str) -> Result<bool, DomainError>;
    fn list_by_role(&self, role: Role) -> Result<Vec<UserView>, DomainError>;
    fn update(&self, id: Uuid, patch: UserPatch) -> Result<(), DomainError>;
    fn delete(&self, id: Uuid) -> Result<(), DomainError>;
    fn count_by_role(&self, role: Role) -> Result<i64, DomainError>;
    fn count_all(&self) -> Result<i64, DomainError>;
    fn admin_exists(&self) -> Result<bool, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn list_categories(&self) -> Result<Vec<CategoryView>, DomainError>;
    /// Categories with the number of products referencing each.
    fn list_categories_with_counts(&self) -> Result<Vec<(CategoryView, i64)>, DomainError>;
    fn find_category_by_name(&self, name: &str) -> Result<Option<CategoryView>, DomainError>;
    fn insert_category(&self, input: CategoryInput) -> Result<CategoryView, DomainError>;
    fn update_category(&self, id: Uuid, input: CategoryInput) -> Result<(), DomainError>;
    /// Fails with a conflict while any product references the category.
    fn delete_category(&self, id: Uuid) -> Result<(), DomainError>;

    fn list_products(&self, filter: ProductFilter) -> Result<Vec<ProductView>, DomainError>;
    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError>;
    fn insert_product(&self, input: ProductInput) -> Result<ProductView, DomainError>;
    fn update_product(&self, id: Uuid, input: ProductInput) -> Result<(), DomainError>;
    fn delete_product(&self, id: Uuid) -> Result<(), DomainError>;

    /// Apply a signed delta to the product's quantity-on-hand as one
    /// conditional update. Negative deltas that would drive the quantity
    /// below zero fail with an insufficient-stock error naming the
    /// available quantity. Returns the new quantity.
    fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<i32, DomainError>;
    /// Absolute restock / correction.
    fn set_stock(&self, id: Uuid, quantity: i32) -> Result<(), DomainError>;
    fn low_stock(&self, threshold: i32) -> Result<Vec<ProductView>, DomainError>;
    fn count_products(&self) -> Result<i64, DomainError>;
    fn count_categories(&self) -> Result<i64, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Create the order and reserve stock for every line in one
    /// transaction; any failing line aborts the whole creation.
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list(&self, filter: OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    /// Replace the line set of a pending order, adjusting stock by the
    /// difference between reserved and newly-requested quantities.
    fn replace_lines(&self, id: Uuid, lines: Vec<OrderLineInput>) -> Result<(), DomainError>;
    /// pending -> accepted, binding the accepting employee.
    fn accept(&self, id: Uuid, employee_id: Uuid) -> Result<(), DomainError>;
    /// accepted -> delivered.
    fn deliver(&self, id: Uuid) -> Result<(), DomainError>;
    /// pending|accepted -> cancelled, returning the reserved stock.
    fn cancel(&self, id: Uuid) -> Result<(), DomainError>;
    /// delivered -> paid.
    fn mark_paid(&self, id: Uuid) -> Result<(), DomainError>;

    fn count_by_status(&self, status: super::order::OrderStatus) -> Result<i64, DomainError>;
    fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64, DomainError>;
    /// (product id, product name, units sold) ordered by units sold.
    fn top_products(&self, limit: i64) -> Result<Vec<(Uuid, String, i64)>, DomainError>;
    /// (customer id, username, order count) ordered by order count.
    fn top_customers(&self, limit: i64) -> Result<Vec<(Uuid, String, i64)>, DomainError>;
}

pub trait SessionStore: Send + Sync + 'static {
    /// Mint a fresh opaque token and persist an empty-cart session.
    fn create(&self, user_id: Uuid) -> Result<SessionData, DomainError>;
    fn get(&self, token: &str) -> Result<Option<SessionData>, DomainError>;
    fn save_cart(&self, token: &str, cart: &Cart) -> Result<(), DomainError>;
    fn delete(&self, token: &str) -> Result<(), DomainError>;
}
