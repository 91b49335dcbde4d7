use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::user_service::ContactInput;
use crate::domain::catalog::{CategoryInput, ProductFilter, ProductInput, ProductStatus};
use crate::domain::user::Role;
use crate::errors::AppError;
use crate::{AppCatalogService, AppDashboardService, AppOrderService, AppUserService};

use super::dto::{
    CategoryResponse, ListParams, OrderListResponse, OrderResponse, ProductResponse, UserResponse,
};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboardResponse {
    pub total_products: i64,
    pub total_categories: i64,
    pub total_users: i64,
    pub pending_orders: i64,
    pub low_stock: Vec<ProductResponse>,
    pub recent_orders: Vec<OrderResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryWithCountResponse {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub product_count: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryBody {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryBody {
    fn into_input(self) -> CategoryInput {
        CategoryInput {
            name: self.name,
            icon: self.icon.unwrap_or_else(|| "default.png".to_string()),
            description: self.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: Uuid,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProductBody {
    fn into_input(self) -> Result<ProductInput, AppError> {
        let price = BigDecimal::from_str(&self.price)
            .map_err(|e| AppError::Validation(format!("Invalid price '{}': {}", self.price, e)))?;
        let status = match self.status.as_deref() {
            None => ProductStatus::Available,
            Some(s) => ProductStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("Invalid status '{}'", s)))?,
        };
        Ok(ProductInput {
            name: self.name,
            description: self.description.unwrap_or_default(),
            category_id: self.category_id,
            price,
            status,
            quantity: self.quantity.unwrap_or(0),
            image: self.image,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockBody {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RestockBody {
    pub product_id: Uuid,
    /// Signed adjustment: positive restocks, negative corrects shrinkage.
    pub delta: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactBody {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

impl From<ContactBody> for ContactInput {
    fn from(b: ContactBody) -> Self {
        ContactInput {
            name: b.name,
            email: b.email,
            phone: b.phone,
            address: b.address,
            position: b.position,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesReportResponse {
    pub top_products: Vec<TopProductEntry>,
    pub top_customers: Vec<TopCustomerEntry>,
    pub products_per_category: Vec<CategoryCountEntry>,
    pub orders_per_status: Vec<StatusCountEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProductEntry {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopCustomerEntry {
    pub customer_id: Uuid,
    pub username: String,
    pub orders: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryCountEntry {
    pub category: String,
    pub products: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCountEntry {
    pub status: String,
    pub orders: i64,
}

// ── Dashboard / reports ──────────────────────────────────────────────────────

/// GET /admin/
#[utoipa::path(
    get,
    path = "/admin/",
    responses((status = 200, description = "Admin dashboard", body = AdminDashboardResponse)),
    tag = "admin"
)]
pub async fn dashboard(
    dashboards: web::Data<AppDashboardService>,
) -> Result<HttpResponse, AppError> {
    let data = web::block(move || dashboards.admin_dashboard()).await??;

    Ok(HttpResponse::Ok().json(AdminDashboardResponse {
        total_products: data.total_products,
        total_categories: data.total_categories,
        total_users: data.total_users,
        pending_orders: data.pending_orders,
        low_stock: data.low_stock.into_iter().map(ProductResponse::from).collect(),
        recent_orders: data
            .recent_orders
            .into_iter()
            .map(OrderResponse::from)
            .collect(),
    }))
}

/// GET /admin/reportes
#[utoipa::path(
    get,
    path = "/admin/reportes",
    responses((status = 200, description = "Sales aggregates", body = SalesReportResponse)),
    tag = "admin"
)]
pub async fn reports(
    dashboards: web::Data<AppDashboardService>,
) -> Result<HttpResponse, AppError> {
    let report = web::block(move || dashboards.sales_report()).await??;

    Ok(HttpResponse::Ok().json(SalesReportResponse {
        top_products: report
            .top_products
            .into_iter()
            .map(|(product_id, name, units_sold)| TopProductEntry {
                product_id,
                name,
                units_sold,
            })
            .collect(),
        top_customers: report
            .top_customers
            .into_iter()
            .map(|(customer_id, username, orders)| TopCustomerEntry {
                customer_id,
                username,
                orders,
            })
            .collect(),
        products_per_category: report
            .products_per_category
            .into_iter()
            .map(|(category, products)| CategoryCountEntry { category, products })
            .collect(),
        orders_per_status: report
            .orders_per_status
            .into_iter()
            .map(|(status, orders)| StatusCountEntry {
                status: status.as_str().to_string(),
                orders,
            })
            .collect(),
    }))
}

// ── Categories ───────────────────────────────────────────────────────────────

/// GET /admin/categorias
#[utoipa::path(
    get,
    path = "/admin/categorias",
    responses((status = 200, description = "Categories with product counts", body = [CategoryWithCountResponse])),
    tag = "admin"
)]
pub async fn list_categories(
    catalog: web::Data<AppCatalogService>,
) -> Result<HttpResponse, AppError> {
    let categories = web::block(move || catalog.categories_with_counts()).await??;
    let body: Vec<CategoryWithCountResponse> = categories
        .into_iter()
        .map(|(c, product_count)| CategoryWithCountResponse {
            id: c.id,
            name: c.name,
            icon: c.icon,
            description: c.description,
            product_count,
        })
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /admin/categorias/agregar
#[utoipa::path(
    post,
    path = "/admin/categorias/agregar",
    request_body = CategoryBody,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Category already exists"),
    ),
    tag = "admin"
)]
pub async fn add_category(
    catalog: web::Data<AppCatalogService>,
    body: web::Json<CategoryBody>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner().into_input();
    let category = web::block(move || catalog.create_category(input)).await??;
    Ok(HttpResponse::Created().json(CategoryResponse::from(category)))
}

/// POST /admin/categorias/editar/{id}
#[utoipa::path(
    post,
    path = "/admin/categorias/editar/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = CategoryBody,
    responses(
        (status = 200, description = "Category updated"),
        (status = 404, description = "Category not found"),
    ),
    tag = "admin"
)]
pub async fn edit_category(
    catalog: web::Data<AppCatalogService>,
    path: web::Path<Uuid>,
    body: web::Json<CategoryBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = body.into_inner().into_input();
    web::block(move || catalog.update_category(id, input)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Category updated" })))
}

/// POST /admin/categorias/eliminar/{id}
#[utoipa::path(
    post,
    path = "/admin/categorias/eliminar/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 409, description = "Category is referenced by products"),
    ),
    tag = "admin"
)]
pub async fn delete_category(
    catalog: web::Data<AppCatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || catalog.delete_category(id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Category deleted" })))
}

// ── Products ─────────────────────────────────────────────────────────────────

/// GET /admin/productos
#[utoipa::path(
    get,
    path = "/admin/productos",
    responses((status = 200, description = "All products", body = [ProductResponse])),
    tag = "admin"
)]
pub async fn list_products(
    catalog: web::Data<AppCatalogService>,
) -> Result<HttpResponse, AppError> {
    let products = web::block(move || catalog.products(ProductFilter::default())).await??;
    let body: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /admin/productos/agregar
#[utoipa::path(
    post,
    path = "/admin/productos/agregar",
    request_body = ProductBody,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid price, status or missing category"),
    ),
    tag = "admin"
)]
pub async fn add_product(
    catalog: web::Data<AppCatalogService>,
    body: web::Json<ProductBody>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner().into_input()?;
    let product = web::block(move || catalog.create_product(input)).await??;
    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// POST /admin/productos/editar/{id}
#[utoipa::path(
    post,
    path = "/admin/productos/editar/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ProductBody,
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Product not found"),
    ),
    tag = "admin"
)]
pub async fn edit_product(
    catalog: web::Data<AppCatalogService>,
    path: web::Path<Uuid>,
    body: web::Json<ProductBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = body.into_inner().into_input()?;
    web::block(move || catalog.update_product(id, input)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Product updated" })))
}

/// POST /admin/productos/eliminar/{id}
#[utoipa::path(
    post,
    path = "/admin/productos/eliminar/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 409, description = "Product is referenced by order history"),
    ),
    tag = "admin"
)]
pub async fn delete_product(
    catalog: web::Data<AppCatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || catalog.delete_product(id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Product deleted" })))
}

// ── Inventory ────────────────────────────────────────────────────────────────

/// GET /admin/inventario
#[utoipa::path(
    get,
    path = "/admin/inventario",
    responses((status = 200, description = "Products with quantity-on-hand", body = [ProductResponse])),
    tag = "admin"
)]
pub async fn inventory(
    catalog: web::Data<AppCatalogService>,
) -> Result<HttpResponse, AppError> {
    let products = web::block(move || catalog.products(ProductFilter::default())).await??;
    let body: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /admin/inventario/actualizar
///
/// Overwrite a product's quantity-on-hand (stocktake correction).
#[utoipa::path(
    post,
    path = "/admin/inventario/actualizar",
    request_body = StockBody,
    responses(
        (status = 200, description = "Stock updated"),
        (status = 400, description = "Negative quantity"),
        (status = 404, description = "Product not found"),
    ),
    tag = "admin"
)]
pub async fn set_stock(
    catalog: web::Data<AppCatalogService>,
    body: web::Json<StockBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    web::block(move || catalog.set_stock(body.product_id, body.quantity)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Stock updated" })))
}

/// POST /admin/inventario/ajustar
///
/// Apply a signed delta through the same conditional adjustment the order
/// flow uses; a delta that would drive stock negative is rejected.
#[utoipa::path(
    post,
    path = "/admin/inventario/ajustar",
    request_body = RestockBody,
    responses(
        (status = 200, description = "Stock adjusted; answers the new quantity"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Adjustment would drive stock negative"),
    ),
    tag = "admin"
)]
pub async fn adjust_stock(
    catalog: web::Data<AppCatalogService>,
    body: web::Json<RestockBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let quantity =
        web::block(move || catalog.adjust_stock(body.product_id, body.delta)).await??;
    Ok(HttpResponse::Ok().json(json!({
        "ok": true,
        "msg": "Stock adjusted",
        "quantity": quantity
    })))
}

// ── Orders ───────────────────────────────────────────────────────────────────

/// GET /admin/pedidos
#[utoipa::path(
    get,
    path = "/admin/pedidos",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses((status = 200, description = "All orders, newest first", body = OrderListResponse)),
    tag = "admin"
)]
pub async fn list_orders(
    orders: web::Data<AppOrderService>,
    query: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.clamped();
    let result = web::block(move || {
        orders.list(crate::domain::order::OrderFilter::default(), page, limit)
    })
    .await??;

    Ok(HttpResponse::Ok().json(OrderListResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

// ── Users ────────────────────────────────────────────────────────────────────

/// GET /admin/clientes
#[utoipa::path(
    get,
    path = "/admin/clientes",
    responses((status = 200, description = "Customer directory", body = [UserResponse])),
    tag = "admin"
)]
pub async fn list_customers(users: web::Data<AppUserService>) -> Result<HttpResponse, AppError> {
    let customers = web::block(move || users.list(Role::Customer)).await??;
    let body: Vec<UserResponse> = customers.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /admin/clientes
#[utoipa::path(
    post,
    path = "/admin/clientes",
    request_body = ContactBody,
    responses(
        (status = 201, description = "Customer record created"),
        (status = 400, description = "Missing name or email"),
    ),
    tag = "admin"
)]
pub async fn create_customer(
    users: web::Data<AppUserService>,
    body: web::Json<ContactBody>,
) -> Result<HttpResponse, AppError> {
    let input = ContactInput::from(body.into_inner());
    let user = web::block(move || users.create(Role::Customer, input)).await??;
    Ok(HttpResponse::Created().json(json!({
        "ok": true,
        "msg": "Customer created",
        "id": user.id
    })))
}

/// POST /admin/clientes/editar/{id}
#[utoipa::path(
    post,
    path = "/admin/clientes/editar/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = ContactBody,
    responses(
        (status = 200, description = "Customer updated"),
        (status = 404, description = "User not found"),
    ),
    tag = "admin"
)]
pub async fn edit_customer(
    users: web::Data<AppUserService>,
    path: web::Path<Uuid>,
    body: web::Json<ContactBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = ContactInput::from(body.into_inner());
    web::block(move || users.update(id, input)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Customer updated" })))
}

/// POST /admin/clientes/eliminar/{id}
#[utoipa::path(
    post,
    path = "/admin/clientes/eliminar/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Customer deleted"),
        (status = 409, description = "Customer has order history"),
    ),
    tag = "admin"
)]
pub async fn delete_customer(
    users: web::Data<AppUserService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || users.delete(id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Customer deleted" })))
}

/// GET /admin/empleados
#[utoipa::path(
    get,
    path = "/admin/empleados",
    responses((status = 200, description = "Employee directory", body = [UserResponse])),
    tag = "admin"
)]
pub async fn list_employees(users: web::Data<AppUserService>) -> Result<HttpResponse, AppError> {
    let employees = web::block(move || users.list(Role::Employee)).await??;
    let body: Vec<UserResponse> = employees.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /admin/empleados
#[utoipa::path(
    post,
    path = "/admin/empleados",
    request_body = ContactBody,
    responses(
        (status = 201, description = "Employee record created"),
        (status = 400, description = "Missing name"),
    ),
    tag = "admin"
)]
pub async fn create_employee(
    users: web::Data<AppUserService>,
    body: web::Json<ContactBody>,
) -> Result<HttpResponse, AppError> {
    let input = ContactInput::from(body.into_inner());
    let user = web::block(move || users.create(Role::Employee, input)).await??;
    Ok(HttpResponse::Created().json(json!({
        "ok": true,
        "msg": "Employee created",
        "id": user.id
    })))
}

/// POST /admin/empleados/editar/{id}
#[utoipa::path(
    post,
    path = "/admin/empleados/editar/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = ContactBody,
    responses(
        (status = 200, description = "Employee updated"),
        (status = 404, description = "User not found"),
    ),
    tag = "admin"
)]
pub async fn edit_employee(
    users: web::Data<AppUserService>,
    path: web::Path<Uuid>,
    body: web::Json<ContactBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = ContactInput::from(body.into_inner());
    web::block(move || users.update(id, input)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Employee updated" })))
}

/// POST /admin/empleados/eliminar/{id}
#[utoipa::path(
    post,
    path = "/admin/empleados/eliminar/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Employee deleted")),
    tag = "admin"
)]
pub async fn delete_employee(
    users: web::Data<AppUserService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || users.delete(id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Employee deleted" })))
}
