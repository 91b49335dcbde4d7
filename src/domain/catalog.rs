use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Available,
    Unavailable,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Unavailable => "unavailable",
        }
    }

    pub fn parse(s: &str) -> Option<ProductStatus> {
        match s {
            "available" => Some(ProductStatus::Available),
            "unavailable" => Some(ProductStatus::Unavailable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub price: BigDecimal,
    pub status: ProductStatus,
    pub quantity: i32,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price: BigDecimal,
    pub status: ProductStatus,
    pub quantity: i32,
    pub image: Option<String>,
}

/// Listing filter; all fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub only_available: bool,
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_status_round_trips() {
        for status in [ProductStatus::Available, ProductStatus::Unavailable] {
            assert_eq!(ProductStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProductStatus::parse("sold_out"), None);
    }
}
