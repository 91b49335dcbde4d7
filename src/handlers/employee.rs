use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::WalkinCustomer;
use crate::domain::catalog::ProductFilter;
use crate::domain::order::{OrderFilter, OrderLineInput, OrderStatus};
use crate::domain::user::Role;
use crate::errors::AppError;
use crate::middleware::CurrentUser;
use crate::{AppCatalogService, AppDashboardService, AppOrderService, AppUserService};

use super::dto::{
    CategoryResponse, OrderLineBody, OrderListResponse, OrderResponse, ProductResponse,
    UserResponse,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeDashboardResponse {
    pub pending_orders: i64,
    pub orders_today: i64,
    pub customers: i64,
    pub low_stock: Vec<ProductResponse>,
    pub assigned_orders: Vec<OrderResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WalkinBody {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderBody {
    /// Registered customer placing the order, if any; a walk-in customer
    /// record is created otherwise.
    pub customer_id: Option<Uuid>,
    pub customer: Option<WalkinBody>,
    pub lines: Vec<OrderLineBody>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditOrderBody {
    pub lines: Vec<OrderLineBody>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Restrict to one lifecycle state.
    #[serde(default)]
    pub estado: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

fn to_line_inputs(lines: Vec<OrderLineBody>) -> Vec<OrderLineInput> {
    lines
        .into_iter()
        .map(|l| OrderLineInput {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect()
}

/// GET /empleado/
#[utoipa::path(
    get,
    path = "/empleado/",
    responses((status = 200, description = "Employee dashboard", body = EmployeeDashboardResponse)),
    tag = "employee"
)]
pub async fn dashboard(
    identity: CurrentUser,
    dashboards: web::Data<AppDashboardService>,
) -> Result<HttpResponse, AppError> {
    let data = web::block(move || dashboards.employee_dashboard(identity.user.id)).await??;

    Ok(HttpResponse::Ok().json(EmployeeDashboardResponse {
        pending_orders: data.pending_orders,
        orders_today: data.orders_today,
        customers: data.customers,
        low_stock: data.low_stock.into_iter().map(ProductResponse::from).collect(),
        assigned_orders: data
            .assigned_orders
            .into_iter()
            .map(OrderResponse::from)
            .collect(),
    }))
}

/// GET /empleado/pedidos
#[utoipa::path(
    get,
    path = "/empleado/pedidos",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("estado" = Option<String>, Query, description = "Restrict to one lifecycle state"),
    ),
    responses((status = 200, description = "All orders, newest first", body = OrderListResponse)),
    tag = "employee"
)]
pub async fn list_orders(
    orders: web::Data<AppOrderService>,
    query: web::Query<OrderListQuery>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let status = match params.estado.as_deref() {
        None => None,
        Some(s) => Some(
            OrderStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("Unknown order status '{}'", s)))?,
        ),
    };

    let result = web::block(move || {
        orders.list(
            OrderFilter {
                status,
                ..OrderFilter::default()
            },
            page,
            limit,
        )
    })
    .await??;

    Ok(HttpResponse::Ok().json(OrderListResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /empleado/pedidos/{id}
#[utoipa::path(
    get,
    path = "/empleado/pedidos/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "employee"
)]
pub async fn order_detail(
    identity: CurrentUser,
    orders: web::Data<AppOrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = web::block(move || orders.get_for(&identity.user, id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /empleado/crear_pedido
#[utoipa::path(
    post,
    path = "/empleado/crear_pedido",
    request_body = CreateOrderBody,
    responses(
        (status = 201, description = "Order created"),
        (status = 409, description = "Insufficient stock for a line"),
    ),
    tag = "employee"
)]
pub async fn create_order(
    identity: CurrentUser,
    orders: web::Data<AppOrderService>,
    body: web::Json<CreateOrderBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let order_id = web::block(move || {
        orders.create_for_employee(
            identity.user.id,
            body.customer_id,
            body.customer.map(|c| WalkinCustomer {
                name: c.name,
                email: c.email,
            }),
            to_line_inputs(body.lines),
        )
    })
    .await??;

    Ok(HttpResponse::Created().json(json!({
        "ok": true,
        "msg": "Order created",
        "order_id": order_id
    })))
}

/// POST /empleado/pedidos/editar/{id}
#[utoipa::path(
    post,
    path = "/empleado/pedidos/editar/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = EditOrderBody,
    responses(
        (status = 200, description = "Order updated"),
        (status = 409, description = "Order is not pending, or insufficient stock"),
    ),
    tag = "employee"
)]
pub async fn edit_order(
    orders: web::Data<AppOrderService>,
    path: web::Path<Uuid>,
    body: web::Json<EditOrderBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let lines = to_line_inputs(body.into_inner().lines);
    web::block(move || orders.edit_lines(id, lines)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Order updated" })))
}

/// POST /empleado/pedidos/aceptar/{id}
#[utoipa::path(
    post,
    path = "/empleado/pedidos/aceptar/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order accepted and bound to the caller"),
        (status = 409, description = "Order is not pending"),
    ),
    tag = "employee"
)]
pub async fn accept_order(
    identity: CurrentUser,
    orders: web::Data<AppOrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || orders.accept(id, identity.user.id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Order accepted" })))
}

/// POST /empleado/pedidos/entregar/{id}
#[utoipa::path(
    post,
    path = "/empleado/pedidos/entregar/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order delivered"),
        (status = 409, description = "Order is not accepted"),
    ),
    tag = "employee"
)]
pub async fn deliver_order(
    orders: web::Data<AppOrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || orders.deliver(id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Order delivered" })))
}

/// POST /empleado/pedidos/cancelar/{id}
#[utoipa::path(
    post,
    path = "/empleado/pedidos/cancelar/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled and its reservation returned"),
        (status = 409, description = "Delivered or paid orders cannot be cancelled"),
    ),
    tag = "employee"
)]
pub async fn cancel_order(
    orders: web::Data<AppOrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || orders.cancel(id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Order cancelled" })))
}

/// POST /empleado/pedidos/pagar/{id}
#[utoipa::path(
    post,
    path = "/empleado/pedidos/pagar/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order marked as paid"),
        (status = 409, description = "Order is not delivered"),
    ),
    tag = "employee"
)]
pub async fn pay_order(
    orders: web::Data<AppOrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || orders.mark_paid(id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Order marked as paid" })))
}

/// GET /empleado/clientes
#[utoipa::path(
    get,
    path = "/empleado/clientes",
    responses((status = 200, description = "Registered customers", body = [UserResponse])),
    tag = "employee"
)]
pub async fn list_customers(
    users: web::Data<AppUserService>,
) -> Result<HttpResponse, AppError> {
    let customers = web::block(move || users.list(Role::Customer)).await??;
    let body: Vec<UserResponse> = customers.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /empleado/productos
#[utoipa::path(
    get,
    path = "/empleado/productos",
    responses((status = 200, description = "Full catalog with categories")),
    tag = "employee"
)]
pub async fn list_products(
    catalog: web::Data<AppCatalogService>,
) -> Result<HttpResponse, AppError> {
    let (products, categories) = web::block(move || {
        let products = catalog.products(ProductFilter::default())?;
        let categories = catalog.categories()?;
        Ok::<_, crate::domain::errors::DomainError>((products, categories))
    })
    .await??;

    Ok(HttpResponse::Ok().json(json!({
        "products": products.into_iter().map(ProductResponse::from).collect::<Vec<_>>(),
        "categories": categories.into_iter().map(CategoryResponse::from).collect::<Vec<_>>(),
    })))
}

/// GET /empleado/inventario
#[utoipa::path(
    get,
    path = "/empleado/inventario",
    responses((status = 200, description = "Products with quantity-on-hand", body = [ProductResponse])),
    tag = "employee"
)]
pub async fn inventory(
    catalog: web::Data<AppCatalogService>,
) -> Result<HttpResponse, AppError> {
    let products = web::block(move || catalog.products(ProductFilter::default())).await??;
    let body: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}
