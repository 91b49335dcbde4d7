use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::catalog::ProductStatus;
use crate::domain::errors::DomainError;
use crate::domain::session::Cart;
use crate::errors::AppError;
use crate::middleware::CurrentUser;
use crate::{AppAuthService, AppCatalogService, AppOrderService};

use super::dto::{ListParams, OrderListResponse, OrderResponse, ProductResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemBody {
    pub product_id: Uuid,
    /// Defaults to 1 when omitted.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartRemoveBody {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub product: ProductResponse,
    pub quantity: i32,
    pub subtotal: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub total: String,
}

/// GET /cliente/carrito
///
/// The cart priced against the current product rows. Products that have
/// gone missing or unavailable since they were added are skipped.
#[utoipa::path(
    get,
    path = "/cliente/carrito",
    responses((status = 200, description = "Cart contents", body = CartResponse)),
    tag = "cart"
)]
pub async fn view_cart(
    identity: CurrentUser,
    catalog: web::Data<AppCatalogService>,
) -> Result<HttpResponse, AppError> {
    let cart = identity.session.cart;
    let body = web::block(move || {
        let mut lines = Vec::with_capacity(cart.len());
        let mut total = BigDecimal::from(0);
        for (product_id, quantity) in cart.items() {
            let product = match catalog.product(product_id) {
                Ok(p) if p.status == ProductStatus::Available => p,
                Ok(_) => continue,
                Err(DomainError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let subtotal = product.price.clone() * BigDecimal::from(quantity);
            total += subtotal.clone();
            lines.push(CartLineResponse {
                product: ProductResponse::from(product),
                quantity,
                subtotal: subtotal.to_string(),
            });
        }
        Ok(CartResponse {
            lines,
            total: total.to_string(),
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(body))
}

/// POST /cliente/carrito/agregar
#[utoipa::path(
    post,
    path = "/cliente/carrito/agregar",
    request_body = CartItemBody,
    responses(
        (status = 200, description = "Product added to the cart"),
        (status = 409, description = "Product not available"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    identity: CurrentUser,
    auth: web::Data<AppAuthService>,
    catalog: web::Data<AppCatalogService>,
    body: web::Json<CartItemBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.quantity <= 0 {
        return Err(AppError::Validation("Quantity must be positive".into()));
    }

    let items = web::block(move || {
        let product = catalog.product(body.product_id)?;
        if product.status != ProductStatus::Available {
            return Err(DomainError::Conflict(format!(
                "Product '{}' is not available",
                product.name
            )));
        }
        let mut cart = identity.session.cart;
        cart.add(body.product_id, body.quantity);
        auth.update_cart(&identity.session.token, &cart)?;
        Ok(cart.len())
    })
    .await??;

    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Added to cart", "items": items })))
}

/// POST /cliente/carrito/actualizar
///
/// Set a line's quantity outright; zero removes the line.
#[utoipa::path(
    post,
    path = "/cliente/carrito/actualizar",
    request_body = CartItemBody,
    responses((status = 200, description = "Cart updated")),
    tag = "cart"
)]
pub async fn update_cart(
    identity: CurrentUser,
    auth: web::Data<AppAuthService>,
    body: web::Json<CartItemBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.quantity < 0 {
        return Err(AppError::Validation("Quantity cannot be negative".into()));
    }

    let items = web::block(move || {
        let mut cart = identity.session.cart;
        cart.set(body.product_id, body.quantity);
        auth.update_cart(&identity.session.token, &cart)?;
        Ok::<_, DomainError>(cart.len())
    })
    .await??;

    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Cart updated", "items": items })))
}

/// POST /cliente/carrito/eliminar
#[utoipa::path(
    post,
    path = "/cliente/carrito/eliminar",
    request_body = CartRemoveBody,
    responses((status = 200, description = "Line removed")),
    tag = "cart"
)]
pub async fn remove_from_cart(
    identity: CurrentUser,
    auth: web::Data<AppAuthService>,
    body: web::Json<CartRemoveBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let items = web::block(move || {
        let mut cart = identity.session.cart;
        cart.remove(body.product_id);
        auth.update_cart(&identity.session.token, &cart)?;
        Ok::<_, DomainError>(cart.len())
    })
    .await??;

    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Removed from cart", "items": items })))
}

/// POST /cliente/carrito/vaciar
#[utoipa::path(
    post,
    path = "/cliente/carrito/vaciar",
    responses((status = 200, description = "Cart emptied")),
    tag = "cart"
)]
pub async fn clear_cart(
    identity: CurrentUser,
    auth: web::Data<AppAuthService>,
) -> Result<HttpResponse, AppError> {
    web::block(move || auth.update_cart(&identity.session.token, &Cart::new())).await??;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "msg": "Cart emptied" })))
}

/// POST /cliente/checkout
///
/// Turn the session cart into a pending order. Stock is reserved for every
/// line inside one transaction; any shortfall aborts the whole order and the
/// cart is kept so the customer can adjust it.
#[utoipa::path(
    post,
    path = "/cliente/checkout",
    responses(
        (status = 201, description = "Order placed; cart emptied"),
        (status = 400, description = "Cart is empty"),
        (status = 409, description = "Insufficient stock for a line"),
    ),
    tag = "cart"
)]
pub async fn checkout(
    identity: CurrentUser,
    auth: web::Data<AppAuthService>,
    orders: web::Data<AppOrderService>,
) -> Result<HttpResponse, AppError> {
    let order_id = web::block(move || {
        let order_id = orders.checkout(identity.user.id, &identity.session.cart)?;
        auth.update_cart(&identity.session.token, &Cart::new())?;
        Ok::<_, DomainError>(order_id)
    })
    .await??;

    Ok(HttpResponse::Created().json(json!({
        "ok": true,
        "msg": "Order placed",
        "order_id": order_id
    })))
}

/// GET /cliente/mis_pedidos
#[utoipa::path(
    get,
    path = "/cliente/mis_pedidos",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses((status = 200, description = "The caller's orders", body = OrderListResponse)),
    tag = "orders"
)]
pub async fn my_orders(
    identity: CurrentUser,
    orders: web::Data<AppOrderService>,
    query: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.clamped();
    let result =
        web::block(move || orders.list_for(&identity.user, page, limit)).await??;

    Ok(HttpResponse::Ok().json(OrderListResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /cliente/pedidos/{id}
#[utoipa::path(
    get,
    path = "/cliente/pedidos/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = OrderResponse),
        (status = 404, description = "Not found, including other customers' orders"),
    ),
    tag = "orders"
)]
pub async fn my_order_detail(
    identity: CurrentUser,
    orders: web::Data<AppOrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = web::block(move || orders.get_for(&identity.user, id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
