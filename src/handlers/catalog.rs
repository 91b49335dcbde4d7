use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::catalog::ProductFilter;
use crate::errors::AppError;
use crate::AppCatalogService;

use super::dto::{CategoryResponse, ProductResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchParams {
    /// Case-insensitive search over product name and description.
    #[serde(default)]
    pub buscar: Option<String>,
    /// Restrict to one category.
    #[serde(default)]
    pub categoria: Option<Uuid>,
}

/// GET /cliente/index
///
/// Storefront landing data: a taste of the catalog for the home page.
#[utoipa::path(
    get,
    path = "/cliente/index",
    responses((status = 200, description = "Featured products and categories")),
    tag = "catalog"
)]
pub async fn storefront(
    catalog: web::Data<AppCatalogService>,
) -> Result<HttpResponse, AppError> {
    let (products, categories) = web::block(move || {
        let products = catalog.products(ProductFilter {
            only_available: true,
            limit: Some(8),
            ..ProductFilter::default()
        })?;
        let categories = catalog.categories()?;
        Ok::<_, crate::domain::errors::DomainError>((products, categories))
    })
    .await??;

    Ok(HttpResponse::Ok().json(json!({
        "products": products.into_iter().map(ProductResponse::from).collect::<Vec<_>>(),
        "categories": categories
            .into_iter()
            .take(6)
            .map(CategoryResponse::from)
            .collect::<Vec<_>>(),
    })))
}

/// GET /cliente/productos
#[utoipa::path(
    get,
    path = "/cliente/productos",
    params(
        ("buscar" = Option<String>, Query, description = "Search over name and description"),
        ("categoria" = Option<Uuid>, Query, description = "Restrict to one category"),
    ),
    responses((status = 200, description = "Available products", body = [ProductResponse])),
    tag = "catalog"
)]
pub async fn list_products(
    catalog: web::Data<AppCatalogService>,
    query: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let search = params
        .buscar
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let products = web::block(move || {
        catalog.products(ProductFilter {
            only_available: true,
            category_id: params.categoria,
            search,
            ..ProductFilter::default()
        })
    })
    .await??;

    let body: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /cliente/categorias
#[utoipa::path(
    get,
    path = "/cliente/categorias",
    responses((status = 200, description = "Categories plus a product sampling")),
    tag = "catalog"
)]
pub async fn list_categories(
    catalog: web::Data<AppCatalogService>,
) -> Result<HttpResponse, AppError> {
    let (categories, products) = web::block(move || {
        let categories = catalog.categories()?;
        let products = catalog.products(ProductFilter {
            only_available: true,
            limit: Some(12),
            ..ProductFilter::default()
        })?;
        Ok::<_, crate::domain::errors::DomainError>((categories, products))
    })
    .await??;

    Ok(HttpResponse::Ok().json(json!({
        "categories": categories.into_iter().map(CategoryResponse::from).collect::<Vec<_>>(),
        "products": products.into_iter().map(ProductResponse::from).collect::<Vec<_>>(),
    })))
}

/// GET /cliente/producto/{id}
#[utoipa::path(
    get,
    path = "/cliente/producto/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product detail", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn product_detail(
    catalog: web::Data<AppCatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = web::block(move || catalog.product(id)).await??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}
