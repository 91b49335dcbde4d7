use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::schema::products;

/// Apply a signed delta to a product's quantity-on-hand.
///
/// Implemented as one conditional UPDATE so concurrent adjustments to the
/// same product serialize on the row lock instead of racing a separate
/// read-then-write pair. The `quantity >= -delta` guard keeps the stored
/// quantity non-negative for any committed call.
///
/// Returns the new quantity. Fails with `NotFound` for an unknown product
/// and `InsufficientStock { available }` when a negative delta would drive
/// the quantity below zero.
pub fn adjust_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    delta: i32,
) -> Result<i32, DomainError> {
    let updated: Option<i32> = diesel::update(
        products::table
            .filter(products::id.eq(product_id))
            .filter(products::quantity.ge(-delta)),
    )
    .set(products::quantity.eq(products::quantity + delta))
    .returning(products::quantity)
    .get_result(conn)
    .optional()?;

    match updated {
        Some(quantity) => Ok(quantity),
        None => {
            let available: Option<i32> = products::table
                .filter(products::id.eq(product_id))
                .select(products::quantity)
                .first(conn)
                .optional()?;
            match available {
                Some(available) => Err(DomainError::InsufficientStock { available }),
                None => Err(DomainError::NotFound("Product")),
            }
        }
    }
}
