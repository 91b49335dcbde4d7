use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{
    CategoryInput, CategoryView, ProductFilter, ProductInput, ProductStatus, ProductView,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::{categories, products};

use super::models::{CategoryRow, NewCategoryRow, NewProductRow, ProductRow};
use super::stock;

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn rows_into_views(rows: Vec<(ProductRow, String)>) -> Result<Vec<ProductView>, DomainError> {
    rows.into_iter()
        .map(|(row, category_name)| row.into_view(category_name))
        .collect()
}

impl CatalogRepository for DieselCatalogRepository {
    fn list_categories(&self) -> Result<Vec<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = categories::table
            .order(categories::name.asc())
            .select(CategoryRow::as_select())
            .load::<CategoryRow>(&mut conn)?;
        Ok(rows.into_iter().map(CategoryView::from).collect())
    }

    fn list_categories_with_counts(&self) -> Result<Vec<(CategoryView, i64)>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = categories::table
            .order(categories::name.asc())
            .select(CategoryRow::as_select())
            .load::<CategoryRow>(&mut conn)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let count: i64 = products::table
                .filter(products::category_id.eq(row.id))
                .count()
                .get_result(&mut conn)?;
            out.push((CategoryView::from(row), count));
        }
        Ok(out)
    }

    fn find_category_by_name(&self, name: &str) -> Result<Option<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(categories::table
            .filter(categories::name.eq(name))
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(CategoryView::from))
    }

    fn insert_category(&self, input: CategoryInput) -> Result<CategoryView, DomainError> {
        let mut conn = self.pool.get()?;
        let row: CategoryRow = diesel::insert_into(categories::table)
            .values(&NewCategoryRow {
                id: Uuid::new_v4(),
                name: input.name,
                icon: input.icon,
                description: input.description,
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_category(&self, id: Uuid, input: CategoryInput) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(categories::table.find(id))
            .set((
                categories::name.eq(input.name),
                categories::icon.eq(input.icon),
                categories::description.eq(input.description),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Category"));
        }
        Ok(())
    }

    fn delete_category(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let references: i64 = products::table
            .filter(products::category_id.eq(id))
            .count()
            .get_result(&mut conn)?;
        if references > 0 {
            return Err(DomainError::Conflict(format!(
                "Category is referenced by {} product(s)",
                references
            )));
        }
        // The ON DELETE RESTRICT constraint catches a racing insert; it
        // surfaces as a Conflict through the error conversion.
        let deleted = diesel::delete(categories::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(DomainError::NotFound("Category"));
        }
        Ok(())
    }

    fn list_products(&self, filter: ProductFilter) -> Result<Vec<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;
        let mut query = products::table
            .inner_join(categories::table)
            .select((ProductRow::as_select(), categories::name))
            .into_boxed();

        if filter.only_available {
            query = query.filter(products::status.eq(ProductStatus::Available.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(products::category_id.eq(category_id));
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            query = query.filter(
                products::name
                    .ilike(pattern.clone())
                    .or(products::description.ilike(pattern)),
            );
        }
        query = query.order(products::name.asc());
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let rows = query.load::<(ProductRow, String)>(&mut conn)?;
        rows_into_views(rows)
    }

    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;
        products::table
            .inner_join(categories::table)
            .filter(products::id.eq(id))
            .select((ProductRow::as_select(), categories::name))
            .first::<(ProductRow, String)>(&mut conn)
            .optional()?
            .map(|(row, category_name)| row.into_view(category_name))
            .transpose()
    }

    fn insert_product(&self, input: ProductInput) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;
        let category_name: Option<String> = categories::table
            .find(input.category_id)
            .select(categories::name)
            .first(&mut conn)
            .optional()?;
        let Some(category_name) = category_name else {
            return Err(DomainError::Validation("Category does not exist".into()));
        };

        let row: ProductRow = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: input.name,
                description: input.description,
                category_id: input.category_id,
                price: input.price,
                status: input.status.as_str().to_string(),
                quantity: input.quantity,
                image: input.image,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        row.into_view(category_name)
    }

    fn update_product(&self, id: Uuid, input: ProductInput) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(products::table.find(id))
            .set((
                products::name.eq(input.name),
                products::description.eq(input.description),
                products::category_id.eq(input.category_id),
                products::price.eq(input.price),
                products::status.eq(input.status.as_str()),
                products::quantity.eq(input.quantity),
                products::image.eq(input.image),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Product"));
        }
        Ok(())
    }

    fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(DomainError::NotFound("Product"));
        }
        Ok(())
    }

    fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<i32, DomainError> {
        let mut conn = self.pool.get()?;
        stock::adjust_stock(&mut conn, id, delta)
    }

    fn set_stock(&self, id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(products::table.find(id))
            .set(products::quantity.eq(quantity))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Product"));
        }
        Ok(())
    }

    fn low_stock(&self, threshold: i32) -> Result<Vec<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = products::table
            .inner_join(categories::table)
            .filter(products::quantity.lt(threshold))
            .order(products::quantity.asc())
            .select((ProductRow::as_select(), categories::name))
            .load::<(ProductRow, String)>(&mut conn)?;
        rows_into_views(rows)
    }

    fn count_products(&self) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(products::table.count().get_result(&mut conn)?)
    }

    fn count_categories(&self) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(categories::table.count().get_result(&mut conn)?)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::infrastructure::test_support::{seed_product, setup_db};

    #[tokio::test]
    async fn deleting_an_unreferenced_category_succeeds() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);

        let category = repo
            .insert_category(CategoryInput {
                name: "Bebidas".into(),
                icon: "drink.png".into(),
                description: String::new(),
            })
            .unwrap();

        repo.delete_category(category.id).unwrap();
        assert!(repo.find_category_by_name("Bebidas").unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_referenced_category_is_a_conflict_and_keeps_the_row() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let product = seed_product(&pool, 3, "9.99");

        let err = repo.delete_category(product.category_id).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // The category survives the failed delete.
        assert!(repo
            .find_category_by_name(&product.category_name)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn product_search_is_case_insensitive() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let category = repo
            .insert_category(CategoryInput {
                name: "Pasteleria".into(),
                icon: "cake.png".into(),
                description: String::new(),
            })
            .unwrap();
        repo.insert_product(ProductInput {
            name: "Cupcake Vainilla".into(),
            description: "Delicioso cupcake suave".into(),
            category_id: category.id,
            price: BigDecimal::from_str("10.00").unwrap(),
            status: ProductStatus::Available,
            quantity: 4,
            image: None,
        })
        .unwrap();

        let hits = repo
            .list_products(ProductFilter {
                search: Some("CUPCAKE".into()),
                ..ProductFilter::default()
            })
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].category_name, "Pasteleria");

        let misses = repo
            .list_products(ProductFilter {
                search: Some("galleta".into()),
                ..ProductFilter::default()
            })
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn only_available_filter_hides_unavailable_products() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let product = seed_product(&pool, 2, "5.00");

        repo.update_product(
            product.id,
            ProductInput {
                name: product.name.clone(),
                description: product.description.clone(),
                category_id: product.category_id,
                price: product.price.clone(),
                status: ProductStatus::Unavailable,
                quantity: product.quantity,
                image: None,
            },
        )
        .unwrap();

        let visible = repo
            .list_products(ProductFilter {
                only_available: true,
                ..ProductFilter::default()
            })
            .unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn insert_product_requires_an_existing_category() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);

        let err = repo
            .insert_product(ProductInput {
                name: "Orphan".into(),
                description: String::new(),
                category_id: Uuid::new_v4(),
                price: BigDecimal::from(1),
                status: ProductStatus::Available,
                quantity: 0,
                image: None,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn set_stock_overwrites_and_low_stock_reports() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let product = seed_product(&pool, 50, "2.50");

        repo.set_stock(product.id, 2).unwrap();
        let low = repo.low_stock(5).unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].quantity, 2);
    }

    #[tokio::test]
    async fn adjust_stock_round_trip_through_the_repository() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let product = seed_product(&pool, 10, "1.00");

        assert_eq!(repo.adjust_stock(product.id, -4).unwrap(), 6);
        assert_eq!(repo.adjust_stock(product.id, 3).unwrap(), 9);

        let err = repo.adjust_stock(product.id, -20).unwrap_err();
        match err {
            DomainError::InsufficientStock { available } => assert_eq!(available, 9),
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }
}
