use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::customer::Customer;
use crate::domain::order::{NewOrderItem, Order, OrderStatus};
use crate::error::AppError;
use crate::metrics::Metrics;
use crate::repository::{
    OrderDetails, OrderSearch, OrderStore, Page, PageRequest, OrderSummary, ProductStore,
    Repository,
};

// ============================================================================
// Order Service - Lifecycle Orchestration
// ============================================================================
//
// Owns order creation from a customer's requested items (with the basket
// cleared in the same unit of work) and every status mutation, all of which
// pass through the transition table.
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub customer_id: Uuid,
    pub shipping_address: String,
    pub items: Vec<OrderItemInput>,
}

pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    customers: Arc<dyn Repository<Customer>>,
    products: Arc<dyn ProductStore>,
    metrics: Arc<Metrics>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        customers: Arc<dyn Repository<Customer>>,
        products: Arc<dyn ProductStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            orders,
            customers,
            products,
            metrics,
        }
    }

    /// Places an order. The stored total equals the sum of the item line
    /// totals, and the customer's basket is emptied exactly once, atomically
    /// with the order insert.
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<Order, AppError> {
        self.customers
            .get(input.customer_id)
            .await?
            .ok_or(AppError::not_found("customer"))?;
        if input.shipping_address.trim().is_empty() {
            return Err(AppError::validation("shipping address cannot be empty"));
        }
        for item in &input.items {
            self.products
                .get(item.product_id)
                .await?
                .ok_or(AppError::not_found("product"))?;
        }

        let items = input
            .items
            .into_iter()
            .map(|i| NewOrderItem {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect();
        let (order, order_items) = Order::new(input.customer_id, input.shipping_address, items)?;

        self.orders.create_order(order.clone(), order_items).await?;
        self.metrics.orders_created.inc();
        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            total_amount = %order.total_amount,
            "order created, basket cleared"
        );
        Ok(order)
    }

    pub async fn get_details(&self, id: Uuid) -> Result<OrderDetails, AppError> {
        self.orders
            .get_details(id)
            .await?
            .ok_or(AppError::not_found("order"))
    }

    pub async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, AppError> {
        Ok(self.orders.list_by_customer(customer_id).await?)
    }

    /// Admin listing: optional status filter, optional keyword over status
    /// name, customer username, and shipping address. 1-based pages.
    pub async fn search(
        &self,
        status_name: Option<&str>,
        keyword: Option<String>,
        page: u32,
        page_size: u32,
    ) -> Result<Page<OrderSummary>, AppError> {
        let status = status_name
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(|e| AppError::validation(e.to_string()))?;
        let search = OrderSearch { status, keyword };
        Ok(self
            .orders
            .search(search, PageRequest::new(page, page_size))
            .await?)
    }

    /// Moves an order to `target` through the transition table; an illegal
    /// move is rejected without touching the row. The write is a
    /// compare-and-set against the status the table was checked for, so a
    /// concurrent writer cannot be overwritten from a stale read.
    pub async fn change_status(&self, id: Uuid, target: OrderStatus) -> Result<Order, AppError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or(AppError::not_found("order"))?;
        let from = order.status;

        if let Err(err) = from.transition(target) {
            self.metrics
                .rejected_transitions
                .with_label_values(&[from.as_str(), target.as_str()])
                .inc();
            tracing::warn!(order_id = %id, from = %from, to = %target, "order transition rejected");
            return Err(err.into());
        }

        match self.orders.set_status_checked(id, from, target).await? {
            Some(order) => {
                self.metrics
                    .order_transitions
                    .with_label_values(&[from.as_str(), target.as_str()])
                    .inc();
                tracing::info!(order_id = %id, from = %from, to = %target, "order status changed");
                Ok(order)
            }
            None => {
                // lost the race; re-check against whatever is stored now
                let current = self
                    .orders
                    .get(id)
                    .await?
                    .ok_or(AppError::not_found("order"))?;
                self.metrics
                    .rejected_transitions
                    .with_label_values(&[current.status.as_str(), target.as_str()])
                    .inc();
                tracing::warn!(
                    order_id = %id,
                    from = %current.status,
                    to = %target,
                    "order transition rejected by concurrent update"
                );
                Err(AppError::InvalidTransition {
                    from: current.status,
                    to: target,
                })
            }
        }
    }

    pub async fn change_status_by_name(&self, id: Uuid, name: &str) -> Result<Order, AppError> {
        let target: OrderStatus = name
            .parse()
            .map_err(|e: crate::domain::order::OrderError| AppError::validation(e.to_string()))?;
        self.change_status(id, target).await
    }

    pub async fn mark_processing(&self, id: Uuid) -> Result<Order, AppError> {
        self.change_status(id, OrderStatus::Processing).await
    }

    pub async fn mark_delivered(&self, id: Uuid) -> Result<Order, AppError> {
        self.change_status(id, OrderStatus::Delivered).await
    }

    pub async fn mark_returned(&self, id: Uuid) -> Result<Order, AppError> {
        self.change_status(id, OrderStatus::Returned).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Order, AppError> {
        self.change_status(id, OrderStatus::Cancelled).await
    }

    /// Customer-facing cancel: an order belonging to someone else is
    /// indistinguishable from a missing one.
    pub async fn cancel_own(&self, customer_id: Uuid, id: Uuid) -> Result<Order, AppError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or(AppError::not_found("order"))?;
        if order.customer_id != customer_id {
            return Err(AppError::not_found("order"));
        }
        self.cancel(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{Category, Product};
    use crate::domain::customer::{AuthUser, Role};
    use crate::repository::memory::MemoryStore;
    use crate::repository::{BasketStore, UserStore};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<MemoryStore>,
        svc: OrderService,
        customer_id: Uuid,
        product_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let svc = OrderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(Metrics::new().unwrap()),
        );

        let user = AuthUser::new(
            "meryem".into(),
            "meryem@example.com".into(),
            "hash".into(),
            Role::Customer,
        );
        let customer = Customer::new(user.id, "A123456".into());
        let customer_id = customer.id;
        store.create_with_customer(user, customer).await.unwrap();

        let category = Category::new("Granite".into(), String::new());
        let product = Product::new(
            category.id,
            "Baltic Brown".into(),
            String::new(),
            dec!(100),
            dec!(20),
            dec!(30),
        );
        let product_id = product.id;
        Repository::<Category>::add(store.as_ref(), category)
            .await
            .unwrap();
        Repository::<Product>::add(store.as_ref(), product)
            .await
            .unwrap();

        Fixture {
            store,
            svc,
            customer_id,
            product_id,
        }
    }

    fn create_input(fx: &Fixture, items: Vec<OrderItemInput>) -> CreateOrderInput {
        CreateOrderInput {
            customer_id: fx.customer_id,
            shipping_address: "12 Quarry Lane".into(),
            items,
        }
    }

    #[tokio::test]
    async fn created_order_total_equals_sum_of_line_totals() {
        let fx = fixture().await;
        let order = fx
            .svc
            .create_order(create_input(
                &fx,
                vec![OrderItemInput {
                    product_id: fx.product_id,
                    quantity: dec!(2),
                    unit_price: dec!(100),
                }],
            ))
            .await
            .unwrap();

        assert_eq!(order.total_amount, dec!(200));
        assert_eq!(order.status, OrderStatus::Pending);

        let details = fx.svc.get_details(order.id).await.unwrap();
        let computed: Decimal = details.items.iter().map(|i| i.item.line_total()).sum();
        assert_eq!(details.order.total_amount, computed);
    }

    #[tokio::test]
    async fn order_creation_clears_the_basket_once() {
        let fx = fixture().await;
        let basket = fx.store.get_or_create(fx.customer_id).await.unwrap();
        fx.store
            .add_item(basket.id, fx.product_id, dec!(2))
            .await
            .unwrap();
        assert_eq!(fx.store.lines(basket.id).await.unwrap().len(), 1);

        let order = fx
            .svc
            .create_order(create_input(
                &fx,
                vec![OrderItemInput {
                    product_id: fx.product_id,
                    quantity: dec!(2),
                    unit_price: dec!(100),
                }],
            ))
            .await
            .unwrap();

        assert_eq!(order.total_amount, dec!(200));
        assert!(fx.store.lines(basket.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_order_validates_customer_items_and_amounts() {
        let fx = fixture().await;

        let missing_customer = CreateOrderInput {
            customer_id: Uuid::new_v4(),
            shipping_address: "somewhere".into(),
            items: vec![],
        };
        assert!(matches!(
            fx.svc.create_order(missing_customer).await,
            Err(AppError::NotFound { kind: "customer" })
        ));

        assert!(matches!(
            fx.svc.create_order(create_input(&fx, vec![])).await,
            Err(AppError::Validation(_))
        ));

        let zero_qty = create_input(
            &fx,
            vec![OrderItemInput {
                product_id: fx.product_id,
                quantity: dec!(0),
                unit_price: dec!(100),
            }],
        );
        assert!(matches!(
            fx.svc.create_order(zero_qty).await,
            Err(AppError::Validation(_))
        ));

        let negative_price = create_input(
            &fx,
            vec![OrderItemInput {
                product_id: fx.product_id,
                quantity: dec!(1),
                unit_price: dec!(-1),
            }],
        );
        assert!(matches!(
            fx.svc.create_order(negative_price).await,
            Err(AppError::Validation(_))
        ));
    }

    async fn place_order(fx: &Fixture) -> Order {
        fx.svc
            .create_order(create_input(
                fx,
                vec![OrderItemInput {
                    product_id: fx.product_id,
                    quantity: dec!(1),
                    unit_price: dec!(100),
                }],
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn lifecycle_happy_path_reaches_returned() {
        let fx = fixture().await;
        let order = place_order(&fx).await;

        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Returned,
        ] {
            let updated = fx.svc.change_status(order.id, target).await.unwrap();
            assert_eq!(updated.status, target);
        }
    }

    #[tokio::test]
    async fn cancelled_order_cannot_be_delivered() {
        let fx = fixture().await;
        let order = place_order(&fx).await;
        fx.svc.cancel(order.id).await.unwrap();

        let result = fx.svc.mark_delivered(order.id).await;
        assert!(matches!(
            result,
            Err(AppError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Delivered,
            })
        ));

        // the row is untouched
        let details = fx.svc.get_details(order.id).await.unwrap();
        assert_eq!(details.order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn stale_writers_cannot_overwrite_a_concurrent_transition() {
        let fx = fixture().await;
        let order = place_order(&fx).await;
        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ] {
            fx.svc.change_status(order.id, target).await.unwrap();
        }

        // a second writer still sees Shipped while the first delivers
        let stale = Repository::<Order>::get(fx.store.as_ref(), order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stale.status, OrderStatus::Shipped);
        fx.svc.mark_delivered(order.id).await.unwrap();

        // the compare-and-set refuses the write from the stale status
        let outcome = fx
            .store
            .set_status_checked(order.id, stale.status, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert!(outcome.is_none());

        // the service reports the conflict against the stored status
        let err = fx.svc.cancel(order.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled,
            }
        ));

        // replaying the stale snapshot through a plain update carries no
        // status either
        let mut replay = stale;
        replay.transition_to(OrderStatus::Cancelled).unwrap();
        Repository::<Order>::update(fx.store.as_ref(), replay)
            .await
            .unwrap();
        let details = fx.svc.get_details(order.id).await.unwrap();
        assert_eq!(details.order.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn mark_processing_requires_confirmed_first() {
        let fx = fixture().await;
        let order = place_order(&fx).await;
        assert!(matches!(
            fx.svc.mark_processing(order.id).await,
            Err(AppError::InvalidTransition { .. })
        ));

        fx.svc
            .change_status(order.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        let updated = fx.svc.mark_processing(order.id).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn change_status_by_name_parses_and_guards() {
        let fx = fixture().await;
        let order = place_order(&fx).await;

        let updated = fx
            .svc
            .change_status_by_name(order.id, "confirmed")
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Confirmed);

        assert!(matches!(
            fx.svc.change_status_by_name(order.id, "vanished").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn cancel_own_hides_other_customers_orders() {
        let fx = fixture().await;
        let order = place_order(&fx).await;

        let stranger = Uuid::new_v4();
        assert!(matches!(
            fx.svc.cancel_own(stranger, order.id).await,
            Err(AppError::NotFound { kind: "order" })
        ));

        let cancelled = fx.svc.cancel_own(fx.customer_id, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn search_filters_by_status_and_keyword() {
        let fx = fixture().await;
        let order = place_order(&fx).await;
        fx.svc
            .change_status(order.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        place_order(&fx).await; // second order, still pending

        let page = fx.svc.search(Some("confirmed"), None, 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status, OrderStatus::Confirmed);

        let page = fx
            .svc
            .search(None, Some("meryem".into()), 1, 10)
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        let page = fx
            .svc
            .search(None, Some("QUARRY".into()), 1, 10)
            .await
            .unwrap();
        assert_eq!(page.total, 2, "keyword match is case-insensitive");

        let page = fx.svc.search(None, None, 2, 1).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 2);

        assert!(matches!(
            fx.svc.search(Some("nonsense"), None, 1, 10).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn details_of_missing_order_is_not_found() {
        let fx = fixture().await;
        assert!(matches!(
            fx.svc.get_details(Uuid::new_v4()).await,
            Err(AppError::NotFound { kind: "order" })
        ));
    }
}
