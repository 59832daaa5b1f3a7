use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::basket::BasketDetails;
use crate::domain::customer::Customer;
use crate::error::AppError;
use crate::metrics::Metrics;
use crate::repository::{BasketLineChange, BasketStore, ProductStore, Repository};

// ============================================================================
// Basket Service
// ============================================================================
//
// Every entry point resolves the customer's basket first, creating it empty
// on first access. Mutations return the refreshed read model so callers
// never render a stale total.
//
// ============================================================================

pub struct BasketService {
    baskets: Arc<dyn BasketStore>,
    customers: Arc<dyn Repository<Customer>>,
    products: Arc<dyn ProductStore>,
    metrics: Arc<Metrics>,
}

impl BasketService {
    pub fn new(
        baskets: Arc<dyn BasketStore>,
        customers: Arc<dyn Repository<Customer>>,
        products: Arc<dyn ProductStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            baskets,
            customers,
            products,
            metrics,
        }
    }

    async fn details_for(&self, customer_id: Uuid) -> Result<BasketDetails, AppError> {
        self.customers
            .get(customer_id)
            .await?
            .ok_or(AppError::not_found("customer"))?;
        let basket = self.baskets.get_or_create(customer_id).await?;
        let lines = self.baskets.lines(basket.id).await?;
        Ok(BasketDetails { basket, lines })
    }

    pub async fn get_basket(&self, customer_id: Uuid) -> Result<BasketDetails, AppError> {
        self.details_for(customer_id).await
    }

    pub async fn add_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketDetails, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::validation("quantity must be positive"));
        }
        self.products
            .get(product_id)
            .await?
            .ok_or(AppError::not_found("product"))?;

        let details = self.details_for(customer_id).await?;
        self.baskets
            .add_item(details.basket.id, product_id, quantity)
            .await?;
        self.metrics.basket_items_added.inc();
        tracing::info!(
            customer_id = %customer_id,
            product_id = %product_id,
            quantity = %quantity,
            "basket item added"
        );
        self.details_for(customer_id).await
    }

    /// Overwrites the line quantity; setting a line nobody has is 404.
    pub async fn update_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketDetails, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::validation("quantity must be positive"));
        }
        let details = self.details_for(customer_id).await?;
        match self
            .baskets
            .set_item(details.basket.id, product_id, quantity)
            .await?
        {
            BasketLineChange::NotFound => Err(AppError::not_found("basket item")),
            _ => self.details_for(customer_id).await,
        }
    }

    /// Decrements the line; the storage layer clamps at zero.
    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketDetails, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::validation("quantity must be positive"));
        }
        let details = self.details_for(customer_id).await?;
        match self
            .baskets
            .remove_item(details.basket.id, product_id, quantity)
            .await?
        {
            BasketLineChange::NotFound => Err(AppError::not_found("basket item")),
            _ => self.details_for(customer_id).await,
        }
    }

    /// Drops the whole line regardless of its quantity.
    pub async fn remove_line(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<BasketDetails, AppError> {
        let details = self.details_for(customer_id).await?;
        match self
            .baskets
            .set_item(details.basket.id, product_id, Decimal::ZERO)
            .await?
        {
            BasketLineChange::NotFound => Err(AppError::not_found("basket item")),
            _ => self.details_for(customer_id).await,
        }
    }

    pub async fn clear(&self, customer_id: Uuid) -> Result<BasketDetails, AppError> {
        let details = self.details_for(customer_id).await?;
        let removed = self.baskets.clear(details.basket.id).await?;
        tracing::info!(customer_id = %customer_id, removed, "basket cleared");
        self.details_for(customer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{Category, Product};
    use crate::domain::customer::{AuthUser, Role};
    use crate::repository::memory::MemoryStore;
    use crate::repository::UserStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        svc: BasketService,
        customer_id: Uuid,
        product_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let svc = BasketService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(Metrics::new().unwrap()),
        );

        let user = AuthUser::new(
            "selim".into(),
            "selim@example.com".into(),
            "hash".into(),
            Role::Customer,
        );
        let customer = Customer::new(user.id, "B654321".into());
        let customer_id = customer.id;
        store.create_with_customer(user, customer).await.unwrap();

        let category = Category::new("Marble".into(), String::new());
        let product = Product::new(
            category.id,
            "Carrara".into(),
            String::new(),
            dec!(250),
            dec!(18),
            dec!(20),
        );
        let product_id = product.id;
        Repository::<Category>::add(store.as_ref(), category)
            .await
            .unwrap();
        Repository::<Product>::add(store.as_ref(), product)
            .await
            .unwrap();

        Fixture {
            svc,
            customer_id,
            product_id,
        }
    }

    #[tokio::test]
    async fn first_access_creates_an_empty_basket() {
        let fx = fixture().await;
        let details = fx.svc.get_basket(fx.customer_id).await.unwrap();
        assert!(details.lines.is_empty());
        assert_eq!(details.total_amount(), Decimal::ZERO);

        let again = fx.svc.get_basket(fx.customer_id).await.unwrap();
        assert_eq!(details.basket.id, again.basket.id);
    }

    #[tokio::test]
    async fn adding_same_product_twice_merges_the_line() {
        let fx = fixture().await;
        fx.svc
            .add_item(fx.customer_id, fx.product_id, dec!(1))
            .await
            .unwrap();
        let details = fx
            .svc
            .add_item(fx.customer_id, fx.product_id, dec!(1.5))
            .await
            .unwrap();

        assert_eq!(details.lines.len(), 1);
        assert_eq!(details.lines[0].item.quantity, dec!(2.5));
        assert_eq!(details.total_amount(), dec!(625));
    }

    #[tokio::test]
    async fn update_item_overwrites_quantity() {
        let fx = fixture().await;
        fx.svc
            .add_item(fx.customer_id, fx.product_id, dec!(3))
            .await
            .unwrap();
        let details = fx
            .svc
            .update_item(fx.customer_id, fx.product_id, dec!(1))
            .await
            .unwrap();
        assert_eq!(details.lines[0].item.quantity, dec!(1));

        assert!(matches!(
            fx.svc
                .update_item(fx.customer_id, Uuid::new_v4(), dec!(1))
                .await,
            Err(AppError::NotFound { kind: "basket item" })
        ));
    }

    #[tokio::test]
    async fn remove_item_clamps_and_drops_the_line() {
        let fx = fixture().await;
        fx.svc
            .add_item(fx.customer_id, fx.product_id, dec!(2))
            .await
            .unwrap();

        let details = fx
            .svc
            .remove_item(fx.customer_id, fx.product_id, dec!(0.5))
            .await
            .unwrap();
        assert_eq!(details.lines[0].item.quantity, dec!(1.5));

        // removing more than the line holds drops it rather than going
        // negative
        let details = fx
            .svc
            .remove_item(fx.customer_id, fx.product_id, dec!(10))
            .await
            .unwrap();
        assert!(details.lines.is_empty());
    }

    #[tokio::test]
    async fn remove_line_drops_everything_at_once() {
        let fx = fixture().await;
        fx.svc
            .add_item(fx.customer_id, fx.product_id, dec!(4))
            .await
            .unwrap();

        let details = fx
            .svc
            .remove_line(fx.customer_id, fx.product_id)
            .await
            .unwrap();
        assert!(details.lines.is_empty());

        assert!(matches!(
            fx.svc.remove_line(fx.customer_id, fx.product_id).await,
            Err(AppError::NotFound { kind: "basket item" })
        ));
    }

    #[tokio::test]
    async fn mutations_reject_non_positive_quantities() {
        let fx = fixture().await;
        for qty in [dec!(0), dec!(-1)] {
            assert!(matches!(
                fx.svc.add_item(fx.customer_id, fx.product_id, qty).await,
                Err(AppError::Validation(_))
            ));
            assert!(matches!(
                fx.svc.update_item(fx.customer_id, fx.product_id, qty).await,
                Err(AppError::Validation(_))
            ));
            assert!(matches!(
                fx.svc.remove_item(fx.customer_id, fx.product_id, qty).await,
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn add_item_requires_an_existing_product_and_customer() {
        let fx = fixture().await;
        assert!(matches!(
            fx.svc.add_item(fx.customer_id, Uuid::new_v4(), dec!(1)).await,
            Err(AppError::NotFound { kind: "product" })
        ));
        assert!(matches!(
            fx.svc.add_item(Uuid::new_v4(), fx.product_id, dec!(1)).await,
            Err(AppError::NotFound { kind: "customer" })
        ));
    }

    #[tokio::test]
    async fn clear_empties_the_basket() {
        let fx = fixture().await;
        fx.svc
            .add_item(fx.customer_id, fx.product_id, dec!(2))
            .await
            .unwrap();
        let details = fx.svc.clear(fx.customer_id).await.unwrap();
        assert!(details.lines.is_empty());
    }
}
