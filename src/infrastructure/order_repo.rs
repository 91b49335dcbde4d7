use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    stock_deltas, ListResult, NewOrder, OrderFilter, OrderLineInput, OrderLineView, OrderStatus,
    OrderView,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_lines, orders, products, users};

use super::models::{NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow, ProductRow};
use super::stock;

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Status-guarded transition; `accept` is separate because it also
    /// binds the employee.
    fn transition(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(
            orders::table
                .find(id)
                .filter(orders::status.eq(from.as_str())),
        )
        .set(orders::status.eq(to.as_str()))
        .execute(&mut conn)?;
        if updated == 1 {
            return Ok(());
        }
        Err(state_error(&mut conn, id, from)?)
    }
}

/// Figure out why a status-guarded update matched nothing: the order is
/// either missing or in the wrong state.
fn state_error(
    conn: &mut PgConnection,
    id: Uuid,
    expected: OrderStatus,
) -> Result<DomainError, DomainError> {
    let current: Option<String> = orders::table
        .find(id)
        .select(orders::status)
        .first(conn)
        .optional()?;
    Ok(match current {
        None => DomainError::NotFound("Order"),
        Some(status) => DomainError::InvalidState(format!(
            "Order must be {} (currently {})",
            expected.as_str(),
            status
        )),
    })
}

/// Insert one line, snapshotting the current unit price. Stock must have
/// been reserved by the caller already. Returns the line subtotal.
fn insert_line(
    conn: &mut PgConnection,
    order_id: Uuid,
    line: &OrderLineInput,
) -> Result<BigDecimal, DomainError> {
    let product: ProductRow = products::table
        .find(line.product_id)
        .select(ProductRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound("Product"))?;
    if product.status != "available" {
        return Err(DomainError::Conflict(format!(
            "Product '{}' is not available",
            product.name
        )));
    }

    let subtotal = product.price.clone() * BigDecimal::from(line.quantity);
    diesel::insert_into(order_lines::table)
        .values(&NewOrderLineRow {
            id: Uuid::new_v4(),
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: product.price,
            subtotal: subtotal.clone(),
        })
        .execute(conn)?;
    Ok(subtotal)
}

fn load_lines(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderLineView>, DomainError> {
    let rows = order_lines::table
        .inner_join(products::table)
        .filter(order_lines::order_id.eq(order_id))
        .order(order_lines::created_at.asc())
        .select((OrderLineRow::as_select(), products::name))
        .load::<(OrderLineRow, String)>(conn)?;
    Ok(rows
        .into_iter()
        .map(|(row, product_name)| OrderLineView {
            id: row.id,
            product_id: row.product_id,
            product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            subtotal: row.subtotal,
        })
        .collect())
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;

        // Order row, lines and every stock reservation commit together;
        // one failing line rolls all of it back.
        conn.transaction::<_, DomainError, _>(|conn| {
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    customer_id: order.customer_id,
                    employee_id: order.employee_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    total: BigDecimal::from(0),
                    created_in_person: order.created_in_person,
                })
                .execute(conn)?;

            let mut total = BigDecimal::from(0);
            for line in &order.lines {
                stock::adjust_stock(conn, line.product_id, -line.quantity)?;
                total += insert_line(conn, order_id, line)?;
            }

            diesel::update(orders::table.find(order_id))
                .set(orders::total.eq(total))
                .execute(conn)?;
            Ok(order_id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let row: Option<(OrderRow, String)> = orders::table
            .inner_join(users::table.on(users::id.eq(orders::customer_id)))
            .filter(orders::id.eq(id))
            .select((OrderRow::as_select(), users::username))
            .first(&mut conn)
            .optional()?;

        let Some((order, customer_name)) = row else {
            return Ok(None);
        };
        let lines = load_lines(&mut conn, order.id)?;
        Ok(Some(order.into_view(customer_name, lines)?))
    }

    fn list(&self, filter: OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;
        let offset = (page - 1) * limit;

        let mut count_query = orders::table.count().into_boxed();
        let mut query = orders::table
            .inner_join(users::table.on(users::id.eq(orders::customer_id)))
            .select((OrderRow::as_select(), users::username))
            .into_boxed();

        if let Some(customer_id) = filter.customer_id {
            count_query = count_query.filter(orders::customer_id.eq(customer_id));
            query = query.filter(orders::customer_id.eq(customer_id));
        }
        if let Some(employee_id) = filter.employee_id {
            count_query = count_query.filter(orders::employee_id.eq(employee_id));
            query = query.filter(orders::employee_id.eq(employee_id));
        }
        if let Some(status) = filter.status {
            count_query = count_query.filter(orders::status.eq(status.as_str()));
            query = query.filter(orders::status.eq(status.as_str()));
        }

        let total: i64 = count_query.get_result(&mut conn)?;
        let rows = query
            .order(orders::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load::<(OrderRow, String)>(&mut conn)?;

        let items = rows
            .into_iter()
            .map(|(order, customer_name)| order.into_view(customer_name, vec![]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListResult { items, total })
    }

    fn replace_lines(&self, id: Uuid, lines: Vec<OrderLineInput>) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order: OrderRow = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound("Order"))?;
            if order.parsed_status()? != OrderStatus::Pending {
                return Err(DomainError::InvalidState(format!(
                    "Only pending orders can be edited (currently {})",
                    order.status
                )));
            }

            let previous: Vec<(Uuid, i32)> = order_lines::table
                .filter(order_lines::order_id.eq(id))
                .select((order_lines::product_id, order_lines::quantity))
                .load(conn)?;

            // Return what is no longer needed, reserve what is newly
            // requested; any shortfall aborts the whole edit.
            for (product_id, delta) in stock_deltas(&previous, &lines) {
                stock::adjust_stock(conn, product_id, delta)?;
            }

            diesel::delete(order_lines::table.filter(order_lines::order_id.eq(id)))
                .execute(conn)?;

            let mut total = BigDecimal::from(0);
            for line in &lines {
                total += insert_line(conn, id, line)?;
            }

            diesel::update(orders::table.find(id))
                .set(orders::total.eq(total))
                .execute(conn)?;
            Ok(())
        })
    }

    fn accept(&self, id: Uuid, employee_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(
            orders::table
                .find(id)
                .filter(orders::status.eq(OrderStatus::Pending.as_str())),
        )
        .set((
            orders::status.eq(OrderStatus::Accepted.as_str()),
            orders::employee_id.eq(employee_id),
        ))
        .execute(&mut conn)?;
        if updated == 1 {
            return Ok(());
        }
        Err(state_error(&mut conn, id, OrderStatus::Pending)?)
    }

    fn deliver(&self, id: Uuid) -> Result<(), DomainError> {
        self.transition(id, OrderStatus::Accepted, OrderStatus::Delivered)
    }

    fn cancel(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Only orders still holding their reservation can be cancelled;
            // the status guard doubles as protection against double-restore.
            let updated = diesel::update(
                orders::table.find(id).filter(
                    orders::status.eq_any([
                        OrderStatus::Pending.as_str(),
                        OrderStatus::Accepted.as_str(),
                    ]),
                ),
            )
            .set(orders::status.eq(OrderStatus::Cancelled.as_str()))
            .execute(conn)?;

            if updated == 0 {
                let current: Option<String> = orders::table
                    .find(id)
                    .select(orders::status)
                    .first(conn)
                    .optional()?;
                return Err(match current {
                    None => DomainError::NotFound("Order"),
                    Some(status) => DomainError::InvalidState(format!(
                        "A {} order cannot be cancelled",
                        status
                    )),
                });
            }

            let lines: Vec<(Uuid, i32)> = order_lines::table
                .filter(order_lines::order_id.eq(id))
                .select((order_lines::product_id, order_lines::quantity))
                .load(conn)?;
            for (product_id, quantity) in lines {
                stock::adjust_stock(conn, product_id, quantity)?;
            }
            Ok(())
        })
    }

    fn mark_paid(&self, id: Uuid) -> Result<(), DomainError> {
        self.transition(id, OrderStatus::Delivered, OrderStatus::Paid)
    }

    fn count_by_status(&self, status: OrderStatus) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(orders::table
            .filter(orders::status.eq(status.as_str()))
            .count()
            .get_result(&mut conn)?)
    }

    fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(orders::table
            .filter(orders::created_at.ge(since))
            .count()
            .get_result(&mut conn)?)
    }

    fn top_products(&self, limit: i64) -> Result<Vec<(Uuid, String, i64)>, DomainError> {
        use diesel::dsl::sum;
        let mut conn = self.pool.get()?;
        let rows: Vec<(Uuid, String, Option<i64>)> = order_lines::table
            .inner_join(products::table)
            .group_by((order_lines::product_id, products::name))
            .select((
                order_lines::product_id,
                products::name,
                sum(order_lines::quantity),
            ))
            .order(sum(order_lines::quantity).desc())
            .limit(limit)
            .load(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|(id, name, sold)| (id, name, sold.unwrap_or(0)))
            .collect())
    }

    fn top_customers(&self, limit: i64) -> Result<Vec<(Uuid, String, i64)>, DomainError> {
        use diesel::dsl::count_star;
        let mut conn = self.pool.get()?;
        Ok(orders::table
            .inner_join(users::table.on(users::id.eq(orders::customer_id)))
            .group_by((orders::customer_id, users::username))
            .select((orders::customer_id, users::username, count_star()))
            .order(count_star().desc())
            .limit(limit)
            .load(&mut conn)?)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::ports::CatalogRepository;
    use crate::domain::user::Role;
    use crate::infrastructure::catalog_repo::DieselCatalogRepository;
    use crate::infrastructure::test_support::{seed_product, seed_user, setup_db};

    fn line(product_id: Uuid, quantity: i32) -> OrderLineInput {
        OrderLineInput {
            product_id,
            quantity,
        }
    }

    fn new_order(customer_id: Uuid, lines: Vec<OrderLineInput>) -> NewOrder {
        NewOrder {
            customer_id,
            employee_id: None,
            created_in_person: false,
            lines,
        }
    }

    fn quantity_of(pool: &DbPool, product_id: Uuid) -> i32 {
        DieselCatalogRepository::new(pool.clone())
            .find_product(product_id)
            .unwrap()
            .expect("product exists")
            .quantity
    }

    #[tokio::test]
    async fn create_reserves_stock_and_snapshots_prices() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let product = seed_product(&pool, 5, "4.00");

        let order_id = repo
            .create(new_order(customer.id, vec![line(product.id, 2)]))
            .unwrap();

        assert_eq!(quantity_of(&pool, product.id), 3);

        let order = repo.find_by_id(order_id).unwrap().expect("order exists");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, BigDecimal::from_str("8.00").unwrap());
        assert_eq!(order.customer_name, customer.username);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(
            order.lines[0].unit_price,
            BigDecimal::from_str("4.00").unwrap()
        );
    }

    #[tokio::test]
    async fn create_aborts_atomically_when_one_line_lacks_stock() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let plenty = seed_product(&pool, 10, "1.00");
        let scarce = seed_product(&pool, 1, "2.00");

        let err = repo
            .create(new_order(
                customer.id,
                vec![line(plenty.id, 5), line(scarce.id, 3)],
            ))
            .unwrap_err();

        match err {
            DomainError::InsufficientStock { available } => assert_eq!(available, 1),
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
        // Nothing was committed, not even the line that had stock.
        assert_eq!(quantity_of(&pool, plenty.id), 10);
        assert_eq!(quantity_of(&pool, scarce.id), 1);
    }

    #[tokio::test]
    async fn create_rejects_unavailable_products() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let catalog = DieselCatalogRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let product = seed_product(&pool, 5, "3.00");

        catalog
            .update_product(
                product.id,
                crate::domain::catalog::ProductInput {
                    name: product.name.clone(),
                    description: product.description.clone(),
                    category_id: product.category_id,
                    price: product.price.clone(),
                    status: crate::domain::catalog::ProductStatus::Unavailable,
                    quantity: product.quantity,
                    image: None,
                },
            )
            .unwrap();

        let err = repo
            .create(new_order(customer.id, vec![line(product.id, 1)]))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(quantity_of(&pool, product.id), 5);
    }

    #[tokio::test]
    async fn edit_rediffs_reservations_against_previous_quantities() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let product = seed_product(&pool, 5, "2.00");

        let order_id = repo
            .create(new_order(customer.id, vec![line(product.id, 2)]))
            .unwrap();
        assert_eq!(quantity_of(&pool, product.id), 3);

        // 2 -> 5 needs three more of the three remaining: succeeds.
        repo.replace_lines(order_id, vec![line(product.id, 5)])
            .unwrap();
        assert_eq!(quantity_of(&pool, product.id), 0);
        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.lines[0].quantity, 5);
        assert_eq!(order.total, BigDecimal::from_str("10.00").unwrap());

        // 5 -> 10 needs five more than exist: fails, order and stock as before.
        let err = repo
            .replace_lines(order_id, vec![line(product.id, 10)])
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(quantity_of(&pool, product.id), 0);
        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.lines[0].quantity, 5);
        assert_eq!(order.total, BigDecimal::from_str("10.00").unwrap());
    }

    #[tokio::test]
    async fn edit_returns_stock_for_removed_lines() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let kept = seed_product(&pool, 5, "1.00");
        let dropped = seed_product(&pool, 5, "1.00");

        let order_id = repo
            .create(new_order(
                customer.id,
                vec![line(kept.id, 1), line(dropped.id, 4)],
            ))
            .unwrap();
        assert_eq!(quantity_of(&pool, dropped.id), 1);

        repo.replace_lines(order_id, vec![line(kept.id, 2)]).unwrap();

        assert_eq!(quantity_of(&pool, dropped.id), 5);
        assert_eq!(quantity_of(&pool, kept.id), 3);
        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.lines.len(), 1);
    }

    #[tokio::test]
    async fn edit_is_rejected_once_accepted() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let employee = seed_user(&pool, Role::Employee);
        let product = seed_product(&pool, 5, "1.00");

        let order_id = repo
            .create(new_order(customer.id, vec![line(product.id, 1)]))
            .unwrap();
        repo.accept(order_id, employee.id).unwrap();

        let err = repo
            .replace_lines(order_id, vec![line(product.id, 2)])
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn accepting_twice_fails_and_keeps_the_first_employee() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let first = seed_user(&pool, Role::Employee);
        let second = seed_user(&pool, Role::Employee);
        let product = seed_product(&pool, 5, "1.00");

        let order_id = repo
            .create(new_order(customer.id, vec![line(product.id, 1)]))
            .unwrap();

        repo.accept(order_id, first.id).unwrap();
        let err = repo.accept(order_id, second.id).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.employee_id, Some(first.id));
        assert_eq!(order.status, OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn lifecycle_deliver_then_pay_and_no_cancel_after_delivery() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let employee = seed_user(&pool, Role::Employee);
        let product = seed_product(&pool, 5, "1.00");

        let order_id = repo
            .create(new_order(customer.id, vec![line(product.id, 2)]))
            .unwrap();

        // Cannot deliver or pay out of order.
        assert!(repo.deliver(order_id).is_err());
        repo.accept(order_id, employee.id).unwrap();
        assert!(repo.mark_paid(order_id).is_err());

        repo.deliver(order_id).unwrap();
        let err = repo.cancel(order_id).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        // Delivered stock stays consumed.
        assert_eq!(quantity_of(&pool, product.id), 3);

        repo.mark_paid(order_id).unwrap();
        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn cancelling_a_pending_order_restores_its_reservation() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let product = seed_product(&pool, 5, "1.00");

        let order_id = repo
            .create(new_order(customer.id, vec![line(product.id, 4)]))
            .unwrap();
        assert_eq!(quantity_of(&pool, product.id), 1);

        repo.cancel(order_id).unwrap();
        assert_eq!(quantity_of(&pool, product.id), 5);

        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        // A second cancel must not restore again.
        assert!(repo.cancel(order_id).is_err());
        assert_eq!(quantity_of(&pool, product.id), 5);
    }

    #[tokio::test]
    async fn list_filters_by_customer_and_paginates() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let alice = seed_user(&pool, Role::Customer);
        let bob = seed_user(&pool, Role::Customer);
        let product = seed_product(&pool, 100, "1.00");

        for _ in 0..3 {
            repo.create(new_order(alice.id, vec![line(product.id, 1)]))
                .unwrap();
        }
        repo.create(new_order(bob.id, vec![line(product.id, 1)]))
            .unwrap();

        let all = repo.list(OrderFilter::default(), 1, 10).unwrap();
        assert_eq!(all.total, 4);

        let only_alice = repo
            .list(
                OrderFilter {
                    customer_id: Some(alice.id),
                    ..OrderFilter::default()
                },
                1,
                2,
            )
            .unwrap();
        assert_eq!(only_alice.total, 3);
        assert_eq!(only_alice.items.len(), 2);
        assert!(only_alice.items.iter().all(|o| o.customer_id == alice.id));
    }

    #[tokio::test]
    async fn top_products_sums_quantities_across_orders() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let customer = seed_user(&pool, Role::Customer);
        let best = seed_product(&pool, 100, "1.00");
        let slow = seed_product(&pool, 100, "1.00");

        repo.create(new_order(customer.id, vec![line(best.id, 7)]))
            .unwrap();
        repo.create(new_order(
            customer.id,
            vec![line(best.id, 5), line(slow.id, 2)],
        ))
        .unwrap();

        let top = repo.top_products(5).unwrap();
        assert_eq!(top[0].0, best.id);
        assert_eq!(top[0].2, 12);
        assert_eq!(top[1].0, slow.id);
        assert_eq!(top[1].2, 2);
    }
}
