use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::basket::{Basket, BasketItem, BasketLine};
use crate::domain::catalog::Product;
use crate::repository::{BasketLineChange, BasketStore, RepoError};

use super::PgStore;

#[async_trait]
impl BasketStore for PgStore {
    async fn get_or_create(&self, customer_id: Uuid) -> Result<Basket, RepoError> {
        let mut tx = self.pool().begin().await?;
        let basket = Basket::new(customer_id);
        // The partial unique index on customer_id makes first access racing
        // with itself converge on one basket.
        sqlx::query(
            "INSERT INTO baskets (id, customer_id, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (customer_id) WHERE deleted_at IS NULL DO NOTHING",
        )
        .bind(basket.id)
        .bind(basket.customer_id)
        .bind(basket.created_at)
        .bind(basket.updated_at)
        .bind(basket.deleted_at)
        .execute(&mut *tx)
        .await?;
        let basket = sqlx::query_as::<_, Basket>(
            "SELECT * FROM baskets WHERE customer_id = $1 AND deleted_at IS NULL",
        )
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(basket)
    }

    async fn lines(&self, basket_id: Uuid) -> Result<Vec<BasketLine>, RepoError> {
        let items = sqlx::query_as::<_, BasketItem>(
            "SELECT * FROM basket_items WHERE basket_id = $1 AND deleted_at IS NULL ORDER BY created_at",
        )
        .bind(basket_id)
        .fetch_all(self.pool())
        .await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
                .bind(&product_ids)
                .fetch_all(self.pool())
                .await?;

        items
            .into_iter()
            .map(|item| {
                let product = products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .cloned()
                    .ok_or_else(|| {
                        RepoError::Decode(format!("basket line {} has no product", item.id))
                    })?;
                Ok(BasketLine { item, product })
            })
            .collect()
    }

    async fn add_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketItem, RepoError> {
        // Atomic increment: the line's quantity never sees a read-modify-write
        // round trip.
        let line = BasketItem::new(basket_id, product_id, quantity);
        let line = sqlx::query_as::<_, BasketItem>(
            "INSERT INTO basket_items (id, basket_id, product_id, quantity, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (basket_id, product_id) WHERE deleted_at IS NULL \
             DO UPDATE SET quantity = basket_items.quantity + EXCLUDED.quantity, updated_at = EXCLUDED.updated_at \
             RETURNING *",
        )
        .bind(line.id)
        .bind(line.basket_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.created_at)
        .bind(line.updated_at)
        .bind(line.deleted_at)
        .fetch_one(self.pool())
        .await?;
        Ok(line)
    }

    async fn set_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketLineChange, RepoError> {
        if quantity <= Decimal::ZERO {
            let result = sqlx::query(
                "UPDATE basket_items SET deleted_at = $3, updated_at = $3 \
                 WHERE basket_id = $1 AND product_id = $2 AND deleted_at IS NULL",
            )
            .bind(basket_id)
            .bind(product_id)
            .bind(Utc::now())
            .execute(self.pool())
            .await?;
            return Ok(if result.rows_affected() == 1 {
                BasketLineChange::Removed
            } else {
                BasketLineChange::NotFound
            });
        }

        let line = sqlx::query_as::<_, BasketItem>(
            "UPDATE basket_items SET quantity = $3, updated_at = $4 \
             WHERE basket_id = $1 AND product_id = $2 AND deleted_at IS NULL \
             RETURNING *",
        )
        .bind(basket_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(self.pool())
        .await?;
        Ok(match line {
            Some(line) => BasketLineChange::Updated(line),
            None => BasketLineChange::NotFound,
        })
    }

    async fn remove_item(
        &self,
        basket_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<BasketLineChange, RepoError> {
        let mut tx = self.pool().begin().await?;
        let line = sqlx::query_as::<_, BasketItem>(
            "SELECT * FROM basket_items \
             WHERE basket_id = $1 AND product_id = $2 AND deleted_at IS NULL \
             FOR UPDATE",
        )
        .bind(basket_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(mut line) = line else {
            tx.commit().await?;
            return Ok(BasketLineChange::NotFound);
        };

        let now = Utc::now();
        let change = if line.quantity <= quantity {
            sqlx::query(
                "UPDATE basket_items SET deleted_at = $2, updated_at = $2 WHERE id = $1",
            )
            .bind(line.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            BasketLineChange::Removed
        } else {
            line.quantity -= quantity;
            line.updated_at = now;
            sqlx::query("UPDATE basket_items SET quantity = $2, updated_at = $3 WHERE id = $1")
                .bind(line.id)
                .bind(line.quantity)
                .bind(line.updated_at)
                .execute(&mut *tx)
                .await?;
            BasketLineChange::Updated(line)
        };
        tx.commit().await?;
        Ok(change)
    }

    async fn clear(&self, basket_id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE basket_items SET deleted_at = $2, updated_at = $2 \
             WHERE basket_id = $1 AND deleted_at IS NULL",
        )
        .bind(basket_id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
