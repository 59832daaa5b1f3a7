use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::basket::{Basket, BasketItem, BasketLine};
use crate::domain::catalog::{Category, Product};
use crate::domain::customer::{AuthUser, Customer};
use crate::domain::delivery::{Delivery, DeliveryStatus, DeliveryStatusType};
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::domain::payment::{Payment, PaymentMethod};
use crate::domain::Entity;

use super::{
    BasketLineChange, BasketStore, CustomerStore, DeliveryStore, OrderDetails, OrderItemDetails,
    OrderSearch, OrderStore, OrderSummary, Page, PageRequest, PaymentStore, ProductStore,
    RepoError, Repository, StatusDeleteOutcome, UserStore,
};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Map-backed implementation of every store trait. Backs the service-level
// test suite; the semantics (soft-delete visibility, clamping, guards)
// mirror the Postgres store.
//
// ============================================================================

#[derive(Clone)]
pub struct MemTable<E: Entity> {
    rows: Arc<RwLock<HashMap<Uuid, E>>>,
}

impl<E: Entity> Default for MemTable<E> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<E: Entity> MemTable<E> {
    async fn list_live(&self) -> Vec<E> {
        self.rows
            .read()
            .await
            .values()
            .filter(|e| !e.is_deleted())
            .cloned()
            .collect()
    }

    async fn get_live(&self, id: Uuid) -> Option<E> {
        self.rows
            .read()
            .await
            .get(&id)
            .filter(|e| !e.is_deleted())
            .cloned()
    }

    /// Lookup that ignores the soft-delete flag, for joins from live rows.
    async fn get_any(&self, id: Uuid) -> Option<E> {
        self.rows.read().await.get(&id).cloned()
    }

    async fn put(&self, entity: E) -> E {
        self.rows.write().await.insert(entity.id(), entity.clone());
        entity
    }

    async fn soft_delete(&self, id: Uuid) -> bool {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(e) if !e.is_deleted() => {
                e.mark_deleted(Utc::now());
                true
            }
            _ => false,
        }
    }

    async fn find<F: Fn(&E) -> bool>(&self, pred: F) -> Vec<E> {
        self.rows
            .read()
            .await
            .values()
            .filter(|e| !e.is_deleted() && pred(e))
            .cloned()
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    users: MemTable<AuthUser>,
    customers: MemTable<Customer>,
    categories: MemTable<Category>,
    products: MemTable<Product>,
    baskets: MemTable<Basket>,
    basket_items: MemTable<BasketItem>,
    orders: MemTable<Order>,
    order_items: MemTable<OrderItem>,
    deliveries: MemTable<Delivery>,
    delivery_statuses: MemTable<DeliveryStatus>,
    payments: MemTable<Payment>,
    payment_methods: MemTable<PaymentMethod>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

macro_rules! memory_repository {
    ($field:ident, $ty:ty) => {
        #[async_trait]
        impl Repository<$ty> for MemoryStore {
            async fn list(&self) -> Result<Vec<$ty>, RepoError> {
                Ok(self.$field.list_live().await)
            }

            async fn get(&self, id: Uuid) -> Result<Option<$ty>, RepoError> {
                Ok(self.$field.get_live(id).await)
            }

            async fn add(&self, entity: $ty) -> Result<$ty, RepoError> {
                Ok(self.$field.put(entity).await)
            }

            async fn update(&self, mut entity: $ty) -> Result<$ty, RepoError> {
                entity.touch(Utc::now());
                Ok(self.$field.put(entity).await)
            }

            async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
                Ok(self.$field.soft_delete(id).await)
            }
        }
    };
}

memory_repository!(users, AuthUser);
memory_repository!(customers, Customer);
memory_repository!(categories, Category);
memory_repository!(products, Product);
memory_repository!(deliveries, Delivery);
memory_repository!(delivery_statuses, DeliveryStatus);
memory_repository!(payments, Payment);
memory_repository!(payment_methods, PaymentMethod);

// ============================================================================
// Order Store
// ============================================================================

#[async_trait]
impl Repository<Order> for MemoryStore {
    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        Ok(self.orders.list_live().await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get_live(id).await)
    }

    async fn add(&self, order: Order) -> Result<Order, RepoError> {
        Ok(self.orders.put(order).await)
    }

    // Status is deliberately not taken from the caller's snapshot: every
    // status write goes through `set_status_checked`.
    async fn update(&self, mut order: Order) -> Result<Order, RepoError> {
        let mut rows = self.orders.rows.write().await;
        order.touch(Utc::now());
        if let Some(existing) = rows.get(&order.id) {
            order.status = existing.status;
        }
        rows.insert(order.id, order.clone());
        Ok(order)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.orders.soft_delete(id).await)
    }
}

impl MemoryStore {
    async fn username_for(&self, customer: &Customer) -> Result<String, RepoError> {
        self.users
            .get_any(customer.user_id)
            .await
            .map(|u| u.username)
            .ok_or_else(|| RepoError::Decode(format!("customer {} has no user", customer.id)))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: Order, items: Vec<OrderItem>) -> Result<(), RepoError> {
        let customer_id = order.customer_id;
        self.orders.put(order).await;
        for item in items {
            self.order_items.put(item).await;
        }
        if let Some(basket) = self
            .baskets
            .find(|b| b.customer_id == customer_id)
            .await
            .into_iter()
            .next()
        {
            let lines = self.basket_items.find(|i| i.basket_id == basket.id).await;
            for line in lines {
                self.basket_items.soft_delete(line.id).await;
            }
        }
        Ok(())
    }

    async fn set_status_checked(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        // Check and write under one lock acquisition, like the SQL
        // compare-and-set.
        let mut rows = self.orders.rows.write().await;
        match rows.get_mut(&id) {
            Some(order) if !order.is_deleted() && order.status == from => {
                order.status = to;
                order.touch(Utc::now());
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn get_details(&self, id: Uuid) -> Result<Option<OrderDetails>, RepoError> {
        let Some(order) = self.orders.get_live(id).await else {
            return Ok(None);
        };
        let customer = self
            .customers
            .get_any(order.customer_id)
            .await
            .ok_or_else(|| RepoError::Decode(format!("order {id} has no customer")))?;
        let customer_username = self.username_for(&customer).await?;

        let mut items = Vec::new();
        for item in self.order_items.find(|i| i.order_id == id).await {
            let product_title = self
                .products
                .get_any(item.product_id)
                .await
                .map(|p| p.title)
                .ok_or_else(|| {
                    RepoError::Decode(format!("order item {} has no product", item.id))
                })?;
            items.push(OrderItemDetails {
                item,
                product_title,
            });
        }
        let deliveries = self.deliveries.find(|d| d.order_id == id).await;

        Ok(Some(OrderDetails {
            order,
            customer,
            customer_username,
            items,
            deliveries,
        }))
    }

    async fn search(
        &self,
        search: OrderSearch,
        page: PageRequest,
    ) -> Result<Page<OrderSummary>, RepoError> {
        let mut summaries = Vec::new();
        for order in self.orders.list_live().await {
            let customer = self
                .customers
                .get_any(order.customer_id)
                .await
                .ok_or_else(|| RepoError::Decode(format!("order {} has no customer", order.id)))?;
            let customer_username = self.username_for(&customer).await?;
            summaries.push(OrderSummary {
                id: order.id,
                customer_id: order.customer_id,
                customer_username,
                status: order.status,
                shipping_address: order.shipping_address.clone(),
                order_date: order.order_date,
                total_amount: order.total_amount,
            });
        }

        if let Some(status) = search.status {
            summaries.retain(|s| s.status == status);
        }
        if let Some(keyword) = search.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            let needle = keyword.to_lowercase();
            summaries.retain(|s| {
                s.status.as_str().to_lowercase().contains(&needle)
                    || s.customer_username.to_lowercase().contains(&needle)
                    || s.shipping_address.to_lowercase().contains(&needle)
            });
        }

        summaries.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        let total = summaries.len() as u64;
        let items = summaries
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok(Page {
            items,
            page: page.page,
            page_size: page.page_size,
            total,
        })
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, RepoError> {
        let mut orders = self.orders.find(|o| o.customer_id == customer_id).await;
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(orders)
    }
}

// ============================================================================
// Basket Store
// ============================================================================

impl MemoryStore {
    async fn live_line(&self, basket_id: Uuid, product_id: Uuid) -> Option<BasketItem> {
        self.basket_items
            .find(|i| i.basket_id == basket_id && i.product_id == product_id)
            .await
            .into_iter()
            .next()
    }
}

#[async_trait]
impl BasketStore for MemoryStore {
    async fn get_or_create(&self, customer_id: Uuid) -> Result<Basket, RepoError> {
        if let Some(basket) = self
            .baskets
            .find(|b| b.customer_id == customer_id)
            .await
            .into_iter()
            .next()
        {
            return Ok(basket);
        }
        Ok(self.baskets.put(Basket::new(customer_id)).await)
    }

    async fn lines(&self, basket_id: Uuid) -> Result<Vec<BasketLine>, RepoError> {
        let mut lines = Vec::new();
        for item in self.basket_items.find(|i| i.basket_id == basket_id).await {
            let product = self
                .products
                .get_any(item.product_id)
                .await
                .ok_or_else(|| RepoError::Decode(format!("basket line {} has no product", item.id)))?;
            lines.push(BasketLine { item, product });
        }
        lines.sort_by(|a, b| a.item.created_at.cmp(&b.item.created_at));
        Ok(lines)
    }

    async fn add_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketItem, RepoError> {
        match self.live_line(basket_id, product_id).await {
            Some(mut line) => {
                line.quantity += quantity;
                line.touch(Utc::now());
                Ok(self.basket_items.put(line).await)
            }
            None => {
                Ok(self
                    .basket_items
                    .put(BasketItem::new(basket_id, product_id, quantity))
                    .await)
            }
        }
    }

    async fn set_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketLineChange, RepoError> {
        let Some(mut line) = self.live_line(basket_id, product_id).await else {
            return Ok(BasketLineChange::NotFound);
        };
        if quantity <= Decimal::ZERO {
            self.basket_items.soft_delete(line.id).await;
            return Ok(BasketLineChange::Removed);
        }
        line.quantity = quantity;
        line.touch(Utc::now());
        Ok(BasketLineChange::Updated(self.basket_items.put(line).await))
    }

    async fn remove_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketLineChange, RepoError> {
        let Some(mut line) = self.live_line(basket_id, product_id).await else {
            return Ok(BasketLineChange::NotFound);
        };
        if line.quantity <= quantity {
            self.basket_items.soft_delete(line.id).await;
            return Ok(BasketLineChange::Removed);
        }
        line.quantity -= quantity;
        line.touch(Utc::now());
        Ok(BasketLineChange::Updated(self.basket_items.put(line).await))
    }

    async fn clear(&self, basket_id: Uuid) -> Result<u64, RepoError> {
        let lines = self.basket_items.find(|i| i.basket_id == basket_id).await;
        let mut removed = 0;
        for line in lines {
            if self.basket_items.soft_delete(line.id).await {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// ============================================================================
// Delivery Store
// ============================================================================

#[async_trait]
impl DeliveryStore for MemoryStore {
    async fn find_status_by_type(
        &self,
        status_type: DeliveryStatusType,
    ) -> Result<Option<DeliveryStatus>, RepoError> {
        Ok(self
            .delivery_statuses
            .find(|s| s.status_type == status_type)
            .await
            .into_iter()
            .next())
    }

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Delivery>, RepoError> {
        Ok(self.deliveries.find(|d| d.order_id == order_id).await)
    }

    async fn delete_status_guarded(
        &self,
        status_id: Uuid,
    ) -> Result<StatusDeleteOutcome, RepoError> {
        if self.delivery_statuses.get_live(status_id).await.is_none() {
            return Ok(StatusDeleteOutcome::NotFound);
        }
        let referenced = !self
            .deliveries
            .find(|d| d.delivery_status_id == status_id)
            .await
            .is_empty();
        if referenced {
            return Ok(StatusDeleteOutcome::InUse);
        }
        self.delivery_statuses.soft_delete(status_id).await;
        Ok(StatusDeleteOutcome::Deleted)
    }
}

// ============================================================================
// Identity / Customer / Catalog / Payment Stores
// ============================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<AuthUser>, RepoError> {
        Ok(self
            .users
            .find(|u| u.username == username)
            .await
            .into_iter()
            .next())
    }

    async fn create_with_customer(
        &self,
        user: AuthUser,
        customer: Customer,
    ) -> Result<(), RepoError> {
        self.users.put(user).await;
        self.customers.put(customer).await;
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Customer>, RepoError> {
        Ok(self
            .customers
            .find(|c| c.user_id == user_id)
            .await
            .into_iter()
            .next())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<Product>, RepoError> {
        Ok(self.products.find(|p| p.category_id == category_id).await)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>, RepoError> {
        Ok(self.payments.find(|p| p.customer_id == customer_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn soft_deleted_rows_are_invisible_to_reads() {
        let store = MemoryStore::new();
        let category = Category::new("Granite".into(), "Hard stone".into());
        let id = category.id;
        Repository::<Category>::add(&store, category).await.unwrap();

        assert!(Repository::<Category>::get(&store, id).await.unwrap().is_some());
        assert!(Repository::<Category>::soft_delete(&store, id).await.unwrap());
        assert!(Repository::<Category>::get(&store, id).await.unwrap().is_none());
        assert!(Repository::<Category>::list(&store).await.unwrap().is_empty());

        // second delete reports failure
        assert!(!Repository::<Category>::soft_delete(&store, id).await.unwrap());
    }

    #[tokio::test]
    async fn update_bumps_updated_at() {
        let store = MemoryStore::new();
        let category = Category::new("Marble".into(), String::new());
        let created = Repository::<Category>::add(&store, category).await.unwrap();
        let before = created.updated_at;

        let updated = Repository::<Category>::update(&store, created).await.unwrap();
        assert!(updated.updated_at >= before);
    }

    #[tokio::test]
    async fn basket_is_created_once_per_customer() {
        let store = MemoryStore::new();
        let customer_id = Uuid::new_v4();
        let first = store.get_or_create(customer_id).await.unwrap();
        let second = store.get_or_create(customer_id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(store.lines(first.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_item_clamps_at_zero() {
        let store = MemoryStore::new();
        let product = Product::new(
            Uuid::new_v4(),
            "Slate".into(),
            String::new(),
            dec!(80),
            dec!(10),
            dec!(12),
        );
        let product_id = product.id;
        Repository::<Product>::add(&store, product).await.unwrap();

        let basket = store.get_or_create(Uuid::new_v4()).await.unwrap();
        store.add_item(basket.id, product_id, dec!(3)).await.unwrap();

        let change = store.remove_item(basket.id, product_id, dec!(1)).await.unwrap();
        match change {
            BasketLineChange::Updated(line) => assert_eq!(line.quantity, dec!(2)),
            other => panic!("expected updated line, got {other:?}"),
        }

        let change = store.remove_item(basket.id, product_id, dec!(5)).await.unwrap();
        assert!(matches!(change, BasketLineChange::Removed));
        assert!(store.lines(basket.id).await.unwrap().is_empty());
    }
}
