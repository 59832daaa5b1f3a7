use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::impl_entity;

// ============================================================================
// Order Lifecycle - Status State Machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
        }
    }

    /// Transition table for the order lifecycle.
    ///
    /// Pending → Confirmed → Processing → Shipped → Delivered, any of those
    /// four can be cancelled, and a delivered order can come back as a
    /// return. Cancelled and Returned are terminal.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Delivered, Returned)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Processing, Cancelled)
                | (Shipped, Cancelled)
        )
    }

    pub fn transition(self, target: OrderStatus) -> Result<OrderStatus, OrderError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(OrderError::InvalidTransition { from: self, to: target })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "returned" => Ok(OrderStatus::Returned),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order items cannot be empty")]
    EmptyItems,

    #[error("invalid item quantity: {0}")]
    InvalidQuantity(Decimal),

    #[error("invalid unit price: {0}")]
    InvalidUnitPrice(Decimal),

    #[error("cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("unknown order status: {0}")]
    UnknownStatus(String),
}

// ============================================================================
// Order / OrderItem Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub order_date: DateTime<Utc>,
    /// Captured at creation as the sum of item line totals.
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    /// Area in square metres.
    pub quantity: Decimal,
    /// Unit price captured at order time, independent of later catalog edits.
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Item requested on a new order, before identity is assigned.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl Order {
    /// Builds an order with its items, validating quantities and prices and
    /// capturing `total_amount` as the sum of line totals.
    pub fn new(
        customer_id: Uuid,
        shipping_address: String,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>), OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        for item in &items {
            if item.quantity <= Decimal::ZERO {
                return Err(OrderError::InvalidQuantity(item.quantity));
            }
            if item.unit_price <= Decimal::ZERO {
                return Err(OrderError::InvalidUnitPrice(item.unit_price));
            }
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_items: Vec<OrderItem> = items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .collect();
        let total_amount = order_items.iter().map(OrderItem::line_total).sum();

        let order = Order {
            id: order_id,
            customer_id,
            status: OrderStatus::Pending,
            shipping_address,
            order_date: now,
            total_amount,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        Ok((order, order_items))
    }

    /// Moves the order to `target` through the transition table.
    pub fn transition_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        self.status = self.status.transition(target)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl_entity!(Order, "order");
impl_entity!(OrderItem, "order item");

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, unit_price: Decimal) -> NewOrderItem {
        NewOrderItem {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn new_order_captures_total_and_starts_pending() {
        let (order, items) = Order::new(
            Uuid::new_v4(),
            "12 Quarry Lane".into(),
            vec![item(dec!(2), dec!(100)), item(dec!(1.5), dec!(40))],
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, dec!(260));
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.order_id == order.id));
    }

    #[test]
    fn new_order_rejects_bad_input() {
        let customer = Uuid::new_v4();
        assert!(matches!(
            Order::new(customer, "a".into(), vec![]),
            Err(OrderError::EmptyItems)
        ));
        assert!(matches!(
            Order::new(customer, "a".into(), vec![item(dec!(0), dec!(10))]),
            Err(OrderError::InvalidQuantity(_))
        ));
        assert!(matches!(
            Order::new(customer, "a".into(), vec![item(dec!(1), dec!(-5))]),
            Err(OrderError::InvalidUnitPrice(_))
        ));
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        use OrderStatus::*;
        let chain = [Pending, Confirmed, Processing, Shipped, Delivered, Returned];
        for pair in chain.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn cancel_is_legal_only_before_delivery() {
        use OrderStatus::*;
        for status in [Pending, Confirmed, Processing, Shipped] {
            assert!(status.can_transition_to(Cancelled));
        }
        for status in [Delivered, Cancelled, Returned] {
            assert!(!status.can_transition_to(Cancelled));
        }
    }

    #[test]
    fn every_illegal_pair_is_rejected() {
        use OrderStatus::*;
        let all = [
            Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Returned,
        ];
        for from in all {
            for to in all {
                let legal = from.can_transition_to(to);
                match from.transition(to) {
                    Ok(next) => {
                        assert!(legal);
                        assert_eq!(next, to);
                    }
                    Err(OrderError::InvalidTransition { from: f, to: t }) => {
                        assert!(!legal);
                        assert_eq!((f, t), (from, to));
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
        }
    }

    #[test]
    fn terminal_states_admit_nothing_but_returns() {
        use OrderStatus::*;
        let all = [
            Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Returned,
        ];
        for to in all {
            assert!(!Cancelled.can_transition_to(to));
            assert!(!Returned.can_transition_to(to));
            assert_eq!(Delivered.can_transition_to(to), to == Returned);
        }
    }

    #[test]
    fn transition_to_rejects_and_preserves_status() {
        let (mut order, _) = Order::new(
            Uuid::new_v4(),
            "a".into(),
            vec![item(dec!(1), dec!(10))],
        )
        .unwrap();
        order.transition_to(OrderStatus::Confirmed).unwrap();
        let err = order.transition_to(OrderStatus::Delivered).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn status_names_round_trip() {
        use OrderStatus::*;
        for status in [Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Returned] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_ok());
        assert!("teleported".parse::<OrderStatus>().is_err());
    }
}
