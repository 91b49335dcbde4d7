use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::domain::catalog::ProductView;
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderFilter, OrderStatus, OrderView};
use crate::domain::ports::{CatalogRepository, OrderRepository, UserRepository};
use crate::domain::user::Role;

use super::catalog_service::LOW_STOCK_THRESHOLD;

#[derive(Debug)]
pub struct AdminDashboard {
    pub total_products: i64,
    pub total_categories: i64,
    pub total_users: i64,
    pub pending_orders: i64,
    pub low_stock: Vec<ProductView>,
    pub recent_orders: Vec<OrderView>,
}

#[derive(Debug)]
pub struct EmployeeDashboard {
    pub pending_orders: i64,
    pub orders_today: i64,
    pub customers: i64,
    pub low_stock: Vec<ProductView>,
    pub assigned_orders: Vec<OrderView>,
}

#[derive(Debug)]
pub struct SalesReport {
    /// (product id, product name, units sold), best sellers first.
    pub top_products: Vec<(Uuid, String, i64)>,
    /// (customer id, username, order count), most frequent first.
    pub top_customers: Vec<(Uuid, String, i64)>,
    /// (category name, product count).
    pub products_per_category: Vec<(String, i64)>,
    /// (status, order count) over every lifecycle state.
    pub orders_per_status: Vec<(OrderStatus, i64)>,
}

pub struct DashboardService<O, C, U> {
    orders: O,
    catalog: C,
    users: U,
}

impl<O, C, U> DashboardService<O, C, U>
where
    O: OrderRepository,
    C: CatalogRepository,
    U: UserRepository,
{
    pub fn new(orders: O, catalog: C, users: U) -> Self {
        Self {
            orders,
            catalog,
            users,
        }
    }

    pub fn admin_dashboard(&self) -> Result<AdminDashboard, DomainError> {
        Ok(AdminDashboard {
            total_products: self.catalog.count_products()?,
            total_categories: self.catalog.count_categories()?,
            total_users: self.users.count_all()?,
            pending_orders: self.orders.count_by_status(OrderStatus::Pending)?,
            low_stock: self.catalog.low_stock(LOW_STOCK_THRESHOLD)?,
            recent_orders: self.orders.list(OrderFilter::default(), 1, 5)?.items,
        })
    }

    pub fn employee_dashboard(&self, employee_id: Uuid) -> Result<EmployeeDashboard, DomainError> {
        let today = Utc
            .from_utc_datetime(&Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap_or_default());
        let assigned = self.orders.list(
            OrderFilter {
                employee_id: Some(employee_id),
                ..OrderFilter::default()
            },
            1,
            20,
        )?;
        Ok(EmployeeDashboard {
            pending_orders: self.orders.count_by_status(OrderStatus::Pending)?,
            orders_today: self.orders.count_created_since(today)?,
            customers: self.users.count_by_role(Role::Customer)?,
            low_stock: self.catalog.low_stock(LOW_STOCK_THRESHOLD)?,
            assigned_orders: assigned.items,
        })
    }

    pub fn sales_report(&self) -> Result<SalesReport, DomainError> {
        let products_per_category = self
            .catalog
            .list_categories_with_counts()?
            .into_iter()
            .map(|(category, count)| (category.name, count))
            .collect();

        let mut orders_per_status = Vec::new();
        for status in [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Paid,
        ] {
            orders_per_status.push((status, self.orders.count_by_status(status)?));
        }

        Ok(SalesReport {
            top_products: self.orders.top_products(5)?,
            top_customers: self.orders.top_customers(5)?,
            products_per_category,
            orders_per_status,
        })
    }
}
