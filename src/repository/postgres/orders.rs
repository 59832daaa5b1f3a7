use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::customer::Customer;
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::domain::Entity;
use crate::repository::{
    OrderDetails, OrderItemDetails, OrderSearch, OrderStore, OrderSummary, Page, PageRequest,
    RepoError, Repository,
};

use super::PgStore;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    status: String,
    shipping_address: String,
    order_date: DateTime<Utc>,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepoError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e: crate::domain::order::OrderError| RepoError::Decode(e.to_string()))?;
        Ok(Order {
            id: row.id,
            customer_id: row.customer_id,
            status,
            shipping_address: row.shipping_address,
            order_date: row.order_date,
            total_amount: row.total_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderSummaryRow {
    id: Uuid,
    customer_id: Uuid,
    customer_username: String,
    status: String,
    shipping_address: String,
    order_date: DateTime<Utc>,
    total_amount: Decimal,
}

impl TryFrom<OrderSummaryRow> for OrderSummary {
    type Error = RepoError;

    fn try_from(row: OrderSummaryRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e: crate::domain::order::OrderError| RepoError::Decode(e.to_string()))?;
        Ok(OrderSummary {
            id: row.id,
            customer_id: row.customer_id,
            customer_username: row.customer_username,
            status,
            shipping_address: row.shipping_address,
            order_date: row.order_date,
            total_amount: row.total_amount,
        })
    }
}

const ORDER_COLUMNS: &str = "id, customer_id, status, shipping_address, order_date, total_amount, \
                             created_at, updated_at, deleted_at";

#[async_trait]
impl Repository<Order> for PgStore {
    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE deleted_at IS NULL ORDER BY order_date DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn add(&self, order: Order) -> Result<Order, RepoError> {
        sqlx::query(
            "INSERT INTO orders (id, customer_id, status, shipping_address, order_date, total_amount, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.status.as_str())
        .bind(&order.shipping_address)
        .bind(order.order_date)
        .bind(order.total_amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(order)
    }

    // Status is deliberately absent: every status write goes through
    // `set_status_checked`, so a stale snapshot cannot overwrite it.
    async fn update(&self, mut order: Order) -> Result<Order, RepoError> {
        order.touch(Utc::now());
        sqlx::query(
            "UPDATE orders SET shipping_address = $2, total_amount = $3, updated_at = $4 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(order.id)
        .bind(&order.shipping_address)
        .bind(order.total_amount)
        .bind(order.updated_at)
        .execute(self.pool())
        .await?;
        Ok(order)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE orders SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, order: Order, items: Vec<OrderItem>) -> Result<(), RepoError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, customer_id, status, shipping_address, order_date, total_amount, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.status.as_str())
        .bind(&order.shipping_address)
        .bind(order.order_date)
        .bind(order.total_amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.deleted_at)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, created_at, updated_at, deleted_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.created_at)
            .bind(item.updated_at)
            .bind(item.deleted_at)
            .execute(&mut *tx)
            .await?;
        }

        // Basket cleared in the same unit of work: either the order lands and
        // the basket empties, or neither happens.
        sqlx::query(
            "UPDATE basket_items SET deleted_at = $2, updated_at = $2 \
             FROM baskets \
             WHERE basket_items.basket_id = baskets.id \
               AND baskets.customer_id = $1 \
               AND baskets.deleted_at IS NULL \
               AND basket_items.deleted_at IS NULL",
        )
        .bind(order.customer_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_status_checked(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 AND deleted_at IS NULL \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(Utc::now())
        .fetch_optional(self.pool())
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn get_details(&self, id: Uuid) -> Result<Option<OrderDetails>, RepoError> {
        let Some(order) = Repository::<Order>::get(self, id).await? else {
            return Ok(None);
        };

        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(order.customer_id)
            .fetch_one(self.pool())
            .await?;
        let customer_username: String =
            sqlx::query_scalar("SELECT username FROM auth_users WHERE id = $1")
                .bind(customer.user_id)
                .fetch_one(self.pool())
                .await?;

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 AND deleted_at IS NULL ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let titles: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, title FROM products WHERE id = ANY($1)")
                .bind(&product_ids)
                .fetch_all(self.pool())
                .await?;
        let items = items
            .into_iter()
            .map(|item| {
                let product_title = titles
                    .iter()
                    .find(|(pid, _)| *pid == item.product_id)
                    .map(|(_, title)| title.clone())
                    .ok_or_else(|| {
                        RepoError::Decode(format!("order item {} has no product", item.id))
                    })?;
                Ok(OrderItemDetails {
                    item,
                    product_title,
                })
            })
            .collect::<Result<_, RepoError>>()?;

        let deliveries = sqlx::query_as::<_, crate::domain::delivery::Delivery>(
            "SELECT * FROM deliveries WHERE order_id = $1 AND deleted_at IS NULL ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

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
        let status = search.status.map(|s| s.as_str().to_string());
        let pattern = search
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| format!("%{k}%"));

        const FILTER: &str = "o.deleted_at IS NULL \
             AND ($1::text IS NULL OR o.status = $1) \
             AND ($2::text IS NULL OR o.status ILIKE $2 OR u.username ILIKE $2 OR o.shipping_address ILIKE $2)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM orders o \
             JOIN customers c ON c.id = o.customer_id \
             JOIN auth_users u ON u.id = c.user_id \
             WHERE {FILTER}"
        ))
        .bind(&status)
        .bind(&pattern)
        .fetch_one(self.pool())
        .await?;

        let rows = sqlx::query_as::<_, OrderSummaryRow>(&format!(
            "SELECT o.id, o.customer_id, u.username AS customer_username, o.status, \
                    o.shipping_address, o.order_date, o.total_amount \
             FROM orders o \
             JOIN customers c ON c.id = o.customer_id \
             JOIN auth_users u ON u.id = c.user_id \
             WHERE {FILTER} \
             ORDER BY o.order_date DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(&status)
        .bind(&pattern)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        let items = rows
            .into_iter()
            .map(OrderSummary::try_from)
            .collect::<Result<_, _>>()?;

        Ok(Page {
            items,
            page: page.page,
            page_size: page.page_size,
            total: total as u64,
        })
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, RepoError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE customer_id = $1 AND deleted_at IS NULL ORDER BY order_date DESC"
        ))
        .bind(customer_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }
}
