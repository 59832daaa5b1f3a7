use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::Product;
use super::impl_entity;

// ============================================================================
// Basket - Per-Customer Pending Purchase Lines
// ============================================================================
//
// One basket per customer, created on first access. Totals are derived from
// the lines, never stored. The basket is emptied exactly once when an order
// is placed from it.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Basket {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Basket {
    pub fn new(customer_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BasketItem {
    pub id: Uuid,
    pub basket_id: Uuid,
    pub product_id: Uuid,
    /// Area in square metres.
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl BasketItem {
    pub fn new(basket_id: Uuid, product_id: Uuid, quantity: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            basket_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Basket line joined with its product, for the read model.
#[derive(Debug, Clone, Serialize)]
pub struct BasketLine {
    pub item: BasketItem,
    pub product: Product,
}

impl BasketLine {
    pub fn line_total(&self) -> Decimal {
        self.item.quantity * self.product.unit_price
    }
}

/// Basket read model returned to callers; the total is always recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct BasketDetails {
    pub basket: Basket,
    pub lines: Vec<BasketLine>,
}

impl BasketDetails {
    pub fn total_amount(&self) -> Decimal {
        self.lines.iter().map(BasketLine::line_total).sum()
    }
}

impl_entity!(Basket, "basket");
impl_entity!(BasketItem, "basket item");

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn basket_total_is_sum_of_line_totals() {
        let basket = Basket::new(Uuid::new_v4());
        let granite = Product::new(
            Uuid::new_v4(),
            "Grey granite".into(),
            "".into(),
            dec!(120),
            dec!(20),
            dec!(30),
        );
        let marble = Product::new(
            Uuid::new_v4(),
            "Carrara marble".into(),
            "".into(),
            dec!(250),
            dec!(18),
            dec!(20),
        );
        let details = BasketDetails {
            lines: vec![
                BasketLine {
                    item: BasketItem::new(basket.id, granite.id, dec!(2.5)),
                    product: granite,
                },
                BasketLine {
                    item: BasketItem::new(basket.id, marble.id, dec!(1)),
                    product: marble,
                },
            ],
            basket,
        };
        assert_eq!(details.total_amount(), dec!(550));
    }

    #[test]
    fn empty_basket_totals_zero() {
        let details = BasketDetails {
            basket: Basket::new(Uuid::new_v4()),
            lines: vec![],
        };
        assert_eq!(details.total_amount(), Decimal::ZERO);
    }
}
