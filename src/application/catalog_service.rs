use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::catalog::{
    CategoryInput, CategoryView, ProductFilter, ProductInput, ProductView,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;

/// Products with fewer units than this are surfaced on the dashboards.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

pub struct CatalogService<C> {
    catalog: C,
}

impl<C: CatalogRepository> CatalogService<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    // ── Categories ──────────────────────────────────────────────────────

    pub fn categories(&self) -> Result<Vec<CategoryView>, DomainError> {
        self.catalog.list_categories()
    }

    pub fn categories_with_counts(&self) -> Result<Vec<(CategoryView, i64)>, DomainError> {
        self.catalog.list_categories_with_counts()
    }

    pub fn create_category(&self, input: CategoryInput) -> Result<CategoryView, DomainError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("Category name is required".into()));
        }
        if self.catalog.find_category_by_name(name)?.is_some() {
            return Err(DomainError::Conflict("Category already exists".into()));
        }
        self.catalog.insert_category(CategoryInput {
            name: name.to_string(),
            ..input
        })
    }

    pub fn update_category(&self, id: Uuid, input: CategoryInput) -> Result<(), DomainError> {
        if input.name.trim().is_empty() {
            return Err(DomainError::Validation("Category name is required".into()));
        }
        self.catalog.update_category(id, input)
    }

    pub fn delete_category(&self, id: Uuid) -> Result<(), DomainError> {
        self.catalog.delete_category(id)
    }

    // ── Products ────────────────────────────────────────────────────────

    pub fn products(&self, filter: ProductFilter) -> Result<Vec<ProductView>, DomainError> {
        self.catalog.list_products(filter)
    }

    pub fn product(&self, id: Uuid) -> Result<ProductView, DomainError> {
        self.catalog
            .find_product(id)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn create_product(&self, input: ProductInput) -> Result<ProductView, DomainError> {
        validate_product(&input)?;
        self.catalog.insert_product(input)
    }

    pub fn update_product(&self, id: Uuid, input: ProductInput) -> Result<(), DomainError> {
        validate_product(&input)?;
        self.catalog.update_product(id, input)
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        self.catalog.delete_product(id)
    }

    // ── Stock ───────────────────────────────────────────────────────────

    /// Restock (positive delta) or correct (negative delta) a product's
    /// quantity-on-hand. Returns the new quantity.
    pub fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<i32, DomainError> {
        if delta == 0 {
            return Err(DomainError::Validation("Adjustment cannot be zero".into()));
        }
        self.catalog.adjust_stock(id, delta)
    }

    pub fn set_stock(&self, id: Uuid, quantity: i32) -> Result<(), DomainError> {
        if quantity < 0 {
            return Err(DomainError::Validation(
                "Stock quantity cannot be negative".into(),
            ));
        }
        self.catalog.set_stock(id, quantity)
    }
}

fn validate_product(input: &ProductInput) -> Result<(), DomainError> {
    if input.name.trim().is_empty() {
        return Err(DomainError::Validation(
            "Product name and category are required".into(),
        ));
    }
    if input.price < BigDecimal::from(0) {
        return Err(DomainError::Validation("Price cannot be negative".into()));
    }
    if input.quantity < 0 {
        return Err(DomainError::Validation(
            "Stock quantity cannot be negative".into(),
        ));
    }
    Ok(())
}
