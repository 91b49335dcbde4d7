use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Accepted,
    Delivered,
    Cancelled,
    Paid,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "accepted" => Some(OrderStatus::Accepted),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "paid" => Some(OrderStatus::Paid),
            _ => None,
        }
    }

    /// Legal lifecycle steps. Cancellation is only reachable while the
    /// goods have not left the shop; a delivered order is closed by
    /// payment, never by cancellation.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Accepted)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Accepted, OrderStatus::Delivered)
                | (OrderStatus::Accepted, OrderStatus::Cancelled)
                | (OrderStatus::Delivered, OrderStatus::Paid)
        )
    }

}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub employee_id: Option<Uuid>,
    pub status: OrderStatus,
    pub total: BigDecimal,
    pub created_in_person: bool,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderView>,
    pub total: i64,
}

/// Listing filter; all fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

/// Insert payload for a new order. `employee_id` is the staff member who
/// keyed the order in, if any; `created_in_person` marks walk-in sales.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub created_in_person: bool,
    pub lines: Vec<OrderLineInput>,
}

/// Collapse duplicate product lines by summing their quantities,
/// preserving first-seen order.
pub fn merge_lines(lines: Vec<OrderLineInput>) -> Vec<OrderLineInput> {
    let mut merged: Vec<OrderLineInput> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line),
        }
    }
    merged
}

/// Per-product stock delta when replacing `old` reservations with `new`
/// requests: previously-reserved minus newly-requested. Positive values
/// return stock, negative values reserve more. Zero deltas are dropped.
pub fn stock_deltas(old: &[(Uuid, i32)], new: &[OrderLineInput]) -> Vec<(Uuid, i32)> {
    let mut deltas: HashMap<Uuid, i32> = HashMap::new();
    for (product_id, quantity) in old {
        *deltas.entry(*product_id).or_insert(0) += quantity;
    }
    for line in new {
        *deltas.entry(line.product_id).or_insert(0) -= line.quantity;
    }
    let mut out: Vec<(Uuid, i32)> = deltas.into_iter().filter(|(_, d)| *d != 0).collect();
    // Deterministic application order keeps multi-line failures reproducible.
    out.sort_by_key(|(id, _)| *id);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_accepted_or_cancelled() {
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Accepted));
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Paid));
    }

    #[test]
    fn accepted_can_be_delivered_or_cancelled() {
        assert!(OrderStatus::Accepted.can_transition(OrderStatus::Delivered));
        assert!(OrderStatus::Accepted.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Accepted.can_transition(OrderStatus::Accepted));
    }

    #[test]
    fn delivered_orders_cannot_be_cancelled() {
        assert!(!OrderStatus::Delivered.can_transition(OrderStatus::Cancelled));
        assert!(OrderStatus::Delivered.can_transition(OrderStatus::Paid));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Paid,
        ] {
            assert!(!OrderStatus::Cancelled.can_transition(next));
            assert!(!OrderStatus::Paid.can_transition(next));
        }
    }

    fn line(product_id: Uuid, quantity: i32) -> OrderLineInput {
        OrderLineInput {
            product_id,
            quantity,
        }
    }

    #[test]
    fn merge_lines_sums_duplicates_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_lines(vec![line(a, 2), line(b, 1), line(a, 3)]);
        assert_eq!(merged, vec![line(a, 5), line(b, 1)]);
    }

    #[test]
    fn stock_deltas_returns_and_reserves() {
        let kept = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let added = Uuid::new_v4();

        // kept: 2 reserved -> 5 requested = reserve 3 more (delta -3)
        // removed: 4 reserved -> gone = return 4
        // added: new line of 2 = reserve 2 (delta -2)
        let deltas = stock_deltas(&[(kept, 2), (removed, 4)], &[line(kept, 5), line(added, 2)]);

        let find = |id: Uuid| deltas.iter().find(|(d, _)| *d == id).map(|(_, d)| *d);
        assert_eq!(find(kept), Some(-3));
        assert_eq!(find(removed), Some(4));
        assert_eq!(find(added), Some(-2));
    }

    #[test]
    fn stock_deltas_drops_unchanged_lines() {
        let p = Uuid::new_v4();
        assert!(stock_deltas(&[(p, 3)], &[line(p, 3)]).is_empty());
    }
}
