use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    merge_lines, ListResult, NewOrder, OrderFilter, OrderLineInput, OrderView,
};
use crate::domain::ports::{OrderRepository, UserRepository};
use crate::domain::session::Cart;
use crate::domain::user::{NewUser, Role, UserView};

/// Customer details for a walk-in sale (no registered account).
#[derive(Debug, Clone, Default)]
pub struct WalkinCustomer {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub struct OrderService<O, U> {
    orders: O,
    users: U,
}

impl<O: OrderRepository, U: UserRepository> OrderService<O, U> {
    pub fn new(orders: O, users: U) -> Self {
        Self { orders, users }
    }

    /// Customer checkout: turn the session cart into a pending order,
    /// reserving stock for every line.
    pub fn checkout(&self, customer_id: Uuid, cart: &Cart) -> Result<Uuid, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::Validation("Cart is empty".into()));
        }
        self.place(customer_id, None, false, cart.to_lines())
    }

    /// Employee-keyed order, for a registered customer or a walk-in.
    pub fn create_for_employee(
        &self,
        employee_id: Uuid,
        customer_id: Option<Uuid>,
        walkin: Option<WalkinCustomer>,
        lines: Vec<OrderLineInput>,
    ) -> Result<Uuid, DomainError> {
        let (customer_id, in_person) = match customer_id {
            Some(id) => {
                self.users
                    .find_by_id(id)?
                    .ok_or(DomainError::NotFound("Customer"))?;
                (id, false)
            }
            None => {
                let customer = self.create_walkin_customer(walkin.unwrap_or_default())?;
                (customer.id, true)
            }
        };
        self.place(customer_id, Some(employee_id), in_person, lines)
    }

    fn place(
        &self,
        customer_id: Uuid,
        employee_id: Option<Uuid>,
        created_in_person: bool,
        lines: Vec<OrderLineInput>,
    ) -> Result<Uuid, DomainError> {
        validate_lines(&lines)?;
        self.orders.create(NewOrder {
            customer_id,
            employee_id,
            created_in_person,
            lines: merge_lines(lines),
        })
    }

    /// Replace the line set of a pending order, re-reserving stock for the
    /// difference.
    pub fn edit_lines(&self, id: Uuid, lines: Vec<OrderLineInput>) -> Result<(), DomainError> {
        validate_lines(&lines)?;
        self.orders.replace_lines(id, merge_lines(lines))
    }

    /// Order detail, scoped to the caller: customers only see their own.
    pub fn get_for(&self, caller: &UserView, id: Uuid) -> Result<OrderView, DomainError> {
        let order = self
            .orders
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Order"))?;
        if caller.role == Role::Customer && order.customer_id != caller.id {
            return Err(DomainError::NotFound("Order"));
        }
        Ok(order)
    }

    /// Order listing, scoped to the caller: customers see only their own,
    /// staff see everything.
    pub fn list_for(
        &self,
        caller: &UserView,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let filter = match caller.role {
            Role::Customer => OrderFilter {
                customer_id: Some(caller.id),
                ..OrderFilter::default()
            },
            _ => OrderFilter::default(),
        };
        self.orders.list(filter, page, limit)
    }

    pub fn list(&self, filter: OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.orders.list(filter, page, limit)
    }

    pub fn accept(&self, id: Uuid, employee_id: Uuid) -> Result<(), DomainError> {
        self.orders.accept(id, employee_id)
    }

    pub fn deliver(&self, id: Uuid) -> Result<(), DomainError> {
        self.orders.deliver(id)
    }

    pub fn cancel(&self, id: Uuid) -> Result<(), DomainError> {
        self.orders.cancel(id)
    }

    pub fn mark_paid(&self, id: Uuid) -> Result<(), DomainError> {
        self.orders.mark_paid(id)
    }

    fn create_walkin_customer(&self, walkin: WalkinCustomer) -> Result<UserView, DomainError> {
        let display_name = walkin
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("walk-in");
        // Usernames are unique; suffix with a fresh id so repeat walk-ins
        // never collide.
        let suffix = Uuid::new_v4().simple().to_string();
        self.users.insert(NewUser {
            username: format!("{}-{}", display_name, &suffix[..8]),
            email: walkin.email.filter(|e| !e.trim().is_empty()),
            password_hash: None,
            role: Role::Customer,
            phone: None,
            address: None,
            position: None,
        })
    }
}

fn validate_lines(lines: &[OrderLineInput]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::Validation("Order needs at least one line".into()));
    }
    if lines.iter().any(|l| l.quantity <= 0) {
        return Err(DomainError::Validation(
            "Line quantities must be positive".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::domain::user::UserPatch;

    #[derive(Default)]
    struct RecordingOrders {
        created: Mutex<Vec<NewOrder>>,
    }

    impl OrderRepository for RecordingOrders {
        fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
            self.created.lock().unwrap().push(order);
            Ok(Uuid::new_v4())
        }

        fn find_by_id(&self, _id: Uuid) -> Result<Option<OrderView>, DomainError> {
            Ok(None)
        }

        fn list(
            &self,
            _filter: OrderFilter,
            _page: i64,
            _limit: i64,
        ) -> Result<ListResult, DomainError> {
            Ok(ListResult {
                items: vec![],
                total: 0,
            })
        }

        fn replace_lines(
            &self,
            _id: Uuid,
            _lines: Vec<OrderLineInput>,
        ) -> Result<(), DomainError> {
            Ok(())
        }

        fn accept(&self, _id: Uuid, _employee_id: Uuid) -> Result<(), DomainError> {
            Ok(())
        }

        fn deliver(&self, _id: Uuid) -> Result<(), DomainError> {
            Ok(())
        }

        fn cancel(&self, _id: Uuid) -> Result<(), DomainError> {
            Ok(())
        }

        fn mark_paid(&self, _id: Uuid) -> Result<(), DomainError> {
            Ok(())
        }

        fn count_by_status(&self, _status: OrderStatus) -> Result<i64, DomainError> {
            Ok(0)
        }

        fn count_created_since(&self, _since: DateTime<Utc>) -> Result<i64, DomainError> {
            Ok(0)
        }

        fn top_products(&self, _limit: i64) -> Result<Vec<(Uuid, String, i64)>, DomainError> {
            Ok(vec![])
        }

        fn top_customers(&self, _limit: i64) -> Result<Vec<(Uuid, String, i64)>, DomainError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct RecordingUsers {
        inserted: Mutex<Vec<NewUser>>,
    }

    impl UserRepository for RecordingUsers {
        fn insert(&self, user: NewUser) -> Result<UserView, DomainError> {
            let view = UserView {
                id: Uuid::new_v4(),
                username: user.username.clone(),
                email: user.email.clone(),
                role: user.role,
                phone: None,
                address: None,
                position: None,
                is_active: true,
                created_at: Utc::now(),
            };
            self.inserted.lock().unwrap().push(user);
            Ok(view)
        }

        fn find_by_id(&self, _id: Uuid) -> Result<Option<UserView>, DomainError> {
            Ok(None)
        }

        fn find_with_hash_by_username(
            &self,
            _username: &str,
        ) -> Result<Option<(UserView, Option<String>)>, DomainError> {
            Ok(None)
        }

        fn username_or_email_taken(
            &self,
            _username: &str,
            _email: &str,
        ) -> Result<bool, DomainError> {
            Ok(false)
        }

        fn list_by_role(&self, _role: Role) -> Result<Vec<UserView>, DomainError> {
            Ok(vec![])
        }

        fn update(&self, _id: Uuid, _patch: UserPatch) -> Result<(), DomainError> {
            Ok(())
        }

        fn delete(&self, _id: Uuid) -> Result<(), DomainError> {
            Ok(())
        }

        fn count_by_role(&self, _role: Role) -> Result<i64, DomainError> {
            Ok(0)
        }

        fn count_all(&self) -> Result<i64, DomainError> {
            Ok(0)
        }

        fn admin_exists(&self) -> Result<bool, DomainError> {
            Ok(false)
        }
    }

    fn service() -> OrderService<RecordingOrders, RecordingUsers> {
        OrderService::new(RecordingOrders::default(), RecordingUsers::default())
    }

    fn line(product_id: Uuid, quantity: i32) -> OrderLineInput {
        OrderLineInput {
            product_id,
            quantity,
        }
    }

    #[test]
    fn checkout_rejects_an_empty_cart() {
        let svc = service();
        assert!(matches!(
            svc.checkout(Uuid::new_v4(), &Cart::new()),
            Err(DomainError::Validation(_))
        ));
        assert!(svc.orders.created.lock().unwrap().is_empty());
    }

    #[test]
    fn checkout_merges_and_forwards_cart_lines() {
        let svc = service();
        let product = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(product, 2);
        cart.add(product, 1);

        svc.checkout(Uuid::new_v4(), &cart).unwrap();

        let created = svc.orders.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].lines, vec![line(product, 3)]);
        assert!(!created[0].created_in_person);
        assert!(created[0].employee_id.is_none());
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let svc = service();
        let err = svc.create_for_employee(
            Uuid::new_v4(),
            None,
            None,
            vec![line(Uuid::new_v4(), 0)],
        );
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }

    #[test]
    fn walkin_order_creates_a_placeholder_customer() {
        let svc = service();
        let employee = Uuid::new_v4();
        svc.create_for_employee(
            employee,
            None,
            Some(WalkinCustomer {
                name: Some("Juan".into()),
                email: None,
            }),
            vec![line(Uuid::new_v4(), 1)],
        )
        .unwrap();

        let users = svc.users.inserted.lock().unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].username.starts_with("Juan-"));
        assert_eq!(users[0].role, Role::Customer);
        assert!(users[0].password_hash.is_none());

        let created = svc.orders.created.lock().unwrap();
        assert!(created[0].created_in_person);
        assert_eq!(created[0].employee_id, Some(employee));
    }

    #[test]
    fn order_for_unknown_registered_customer_is_rejected() {
        let svc = service();
        let err = svc.create_for_employee(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            None,
            vec![line(Uuid::new_v4(), 1)],
        );
        assert!(matches!(err, Err(DomainError::NotFound("Customer"))));
        assert!(svc.orders.created.lock().unwrap().is_empty());
    }
}
