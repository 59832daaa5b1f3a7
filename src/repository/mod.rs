use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::basket::{Basket, BasketItem, BasketLine};
use crate::domain::catalog::Product;
use crate::domain::customer::{AuthUser, Customer};
use crate::domain::delivery::{Delivery, DeliveryStatus, DeliveryStatusType};
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::domain::payment::Payment;
use crate::domain::Entity;

pub mod memory;
pub mod postgres;

// ============================================================================
// Repository Contracts
// ============================================================================
//
// A single generic contract covers uniform CRUD for every entity; the few
// entities with richer query or consistency needs get a specialized store
// trait layered on top. Reads exclude soft-deleted rows. Repositories own
// their commit boundary: a method either persists its whole effect or
// nothing, so callers never stage writes that someone else must flush.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored value: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// All live (non-deleted) entities.
    async fn list(&self) -> Result<Vec<E>, RepoError>;

    /// `None` when the row is missing or soft-deleted.
    async fn get(&self, id: Uuid) -> Result<Option<E>, RepoError>;

    async fn add(&self, entity: E) -> Result<E, RepoError>;

    /// Persists every column and bumps `updated_at`.
    async fn update(&self, entity: E) -> Result<E, RepoError>;

    /// Flips the soft-delete flag. `false` when the row is missing or was
    /// already deleted.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError>;
}

// ============================================================================
// Pagination
// ============================================================================

/// 1-based page request. Out-of-range values are clamped, not rejected.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

// ============================================================================
// Order Store
// ============================================================================

/// Filter for the admin order listing. The keyword matches status name,
/// customer username, or shipping address, case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct OrderSearch {
    pub status: Option<OrderStatus>,
    pub keyword: Option<String>,
}

/// Flat row for the admin order listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_username: String,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub order_date: chrono::DateTime<chrono::Utc>,
    pub total_amount: rust_decimal::Decimal,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderItemDetails {
    pub item: OrderItem,
    pub product_title: String,
}

/// Single order with everything eagerly loaded.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub customer: Customer,
    pub customer_username: String,
    pub items: Vec<OrderItemDetails>,
    pub deliveries: Vec<Delivery>,
}

#[async_trait]
pub trait OrderStore: Repository<Order> {
    /// Persists the order with its items and clears the customer's basket,
    /// all inside one unit of work. The basket is emptied exactly once; a
    /// failure rolls back the order as well.
    async fn create_order(&self, order: Order, items: Vec<OrderItem>) -> Result<(), RepoError>;

    /// Compare-and-set status write: the row moves to `to` only while its
    /// stored status still equals `from`. `None` means the order is gone or
    /// another writer got there first; the stored status is untouched.
    async fn set_status_checked(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, RepoError>;

    async fn get_details(&self, id: Uuid) -> Result<Option<OrderDetails>, RepoError>;

    async fn search(
        &self,
        search: OrderSearch,
        page: PageRequest,
    ) -> Result<Page<OrderSummary>, RepoError>;

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, RepoError>;
}

// ============================================================================
// Basket Store
// ============================================================================

/// Outcome of a quantity mutation on a basket line.
#[derive(Debug, Clone)]
pub enum BasketLineChange {
    /// No live line for that product.
    NotFound,
    /// Quantity reached zero; the line was removed.
    Removed,
    Updated(BasketItem),
}

#[async_trait]
pub trait BasketStore: Send + Sync {
    /// The customer's basket, created empty on first access.
    async fn get_or_create(&self, customer_id: Uuid) -> Result<Basket, RepoError>;

    /// Live lines with their products.
    async fn lines(&self, basket_id: Uuid) -> Result<Vec<BasketLine>, RepoError>;

    /// Adds `quantity` to the line for `product_id`, creating the line if
    /// absent. The increment is atomic at the storage layer.
    async fn add_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: rust_decimal::Decimal,
    ) -> Result<BasketItem, RepoError>;

    /// Overwrites the line quantity.
    async fn set_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: rust_decimal::Decimal,
    ) -> Result<BasketLineChange, RepoError>;

    /// Decrements the line, clamping at zero; a line at zero is removed.
    /// Read and write share one unit of work.
    async fn remove_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: rust_decimal::Decimal,
    ) -> Result<BasketLineChange, RepoError>;

    /// Removes every line; returns how many were removed.
    async fn clear(&self, basket_id: Uuid) -> Result<u64, RepoError>;
}

// ============================================================================
// Delivery Store
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDeleteOutcome {
    Deleted,
    NotFound,
    /// At least one live delivery still references the status row.
    InUse,
}

#[async_trait]
pub trait DeliveryStore: Repository<Delivery> {
    /// The live status row for an enumerated type, if one exists.
    async fn find_status_by_type(
        &self,
        status_type: DeliveryStatusType,
    ) -> Result<Option<DeliveryStatus>, RepoError>;

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Delivery>, RepoError>;

    /// Soft-deletes the status row unless a live delivery references it.
    /// The reference check and the delete share one unit of work.
    async fn delete_status_guarded(&self, status_id: Uuid) -> Result<StatusDeleteOutcome, RepoError>;
}

// ============================================================================
// Identity / Customer / Payment Stores
// ============================================================================

#[async_trait]
pub trait UserStore: Repository<AuthUser> {
    async fn get_by_username(&self, username: &str) -> Result<Option<AuthUser>, RepoError>;

    /// Registers a login identity with its customer record in one unit of
    /// work.
    async fn create_with_customer(
        &self,
        user: AuthUser,
        customer: Customer,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CustomerStore: Repository<Customer> {
    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Customer>, RepoError>;
}

#[async_trait]
pub trait ProductStore: Repository<Product> {
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<Product>, RepoError>;
}

#[async_trait]
pub trait PaymentStore: Repository<Payment> {
    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_out_of_range_values() {
        let req = PageRequest::new(0, 0);
        assert_eq!((req.page, req.page_size), (1, 1));
        assert_eq!(req.offset(), 0);

        let req = PageRequest::new(3, 500);
        assert_eq!(req.page_size, PageRequest::MAX_PAGE_SIZE);
        assert_eq!(req.offset(), 200);
        assert_eq!(req.limit(), 100);
    }
}
