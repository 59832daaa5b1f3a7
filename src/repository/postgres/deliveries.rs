use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::delivery::{Delivery, DeliveryStatus, DeliveryStatusType};
use crate::domain::Entity;
use crate::repository::{DeliveryStore, RepoError, Repository, StatusDeleteOutcome};

use super::PgStore;

#[derive(sqlx::FromRow)]
struct DeliveryStatusRow {
    id: Uuid,
    status_type: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DeliveryStatusRow> for DeliveryStatus {
    type Error = RepoError;

    fn try_from(row: DeliveryStatusRow) -> Result<Self, Self::Error> {
        let status_type: DeliveryStatusType =
            row.status_type.parse().map_err(RepoError::Decode)?;
        Ok(DeliveryStatus {
            id: row.id,
            status_type,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[async_trait]
impl Repository<Delivery> for PgStore {
    async fn list(&self) -> Result<Vec<Delivery>, RepoError> {
        Ok(sqlx::query_as::<_, Delivery>(
            "SELECT * FROM deliveries WHERE deleted_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Delivery>, RepoError> {
        Ok(sqlx::query_as::<_, Delivery>(
            "SELECT * FROM deliveries WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?)
    }

    async fn add(&self, delivery: Delivery) -> Result<Delivery, RepoError> {
        sqlx::query(
            "INSERT INTO deliveries \
             (id, order_id, delivery_status_id, scheduled_date, actual_date, installer_name, notes, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(delivery.id)
        .bind(delivery.order_id)
        .bind(delivery.delivery_status_id)
        .bind(delivery.scheduled_date)
        .bind(delivery.actual_date)
        .bind(&delivery.installer_name)
        .bind(&delivery.notes)
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .bind(delivery.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(delivery)
    }

    async fn update(&self, mut delivery: Delivery) -> Result<Delivery, RepoError> {
        delivery.touch(Utc::now());
        sqlx::query(
            "UPDATE deliveries SET delivery_status_id = $2, scheduled_date = $3, actual_date = $4, \
             installer_name = $5, notes = $6, updated_at = $7 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(delivery.id)
        .bind(delivery.delivery_status_id)
        .bind(delivery.scheduled_date)
        .bind(delivery.actual_date)
        .bind(&delivery.installer_name)
        .bind(&delivery.notes)
        .bind(delivery.updated_at)
        .execute(self.pool())
        .await?;
        Ok(delivery)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE deliveries SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl Repository<DeliveryStatus> for PgStore {
    async fn list(&self) -> Result<Vec<DeliveryStatus>, RepoError> {
        let rows = sqlx::query_as::<_, DeliveryStatusRow>(
            "SELECT * FROM delivery_statuses WHERE deleted_at IS NULL ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(DeliveryStatus::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeliveryStatus>, RepoError> {
        let row = sqlx::query_as::<_, DeliveryStatusRow>(
            "SELECT * FROM delivery_statuses WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(DeliveryStatus::try_from).transpose()
    }

    async fn add(&self, status: DeliveryStatus) -> Result<DeliveryStatus, RepoError> {
        sqlx::query(
            "INSERT INTO delivery_statuses (id, status_type, name, description, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(status.id)
        .bind(status.status_type.as_str())
        .bind(&status.name)
        .bind(&status.description)
        .bind(status.created_at)
        .bind(status.updated_at)
        .bind(status.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(status)
    }

    async fn update(&self, mut status: DeliveryStatus) -> Result<DeliveryStatus, RepoError> {
        status.touch(Utc::now());
        sqlx::query(
            "UPDATE delivery_statuses SET status_type = $2, name = $3, description = $4, updated_at = $5 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(status.id)
        .bind(status.status_type.as_str())
        .bind(&status.name)
        .bind(&status.description)
        .bind(status.updated_at)
        .execute(self.pool())
        .await?;
        Ok(status)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE delivery_statuses SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl DeliveryStore for PgStore {
    async fn find_status_by_type(
        &self,
        status_type: DeliveryStatusType,
    ) -> Result<Option<DeliveryStatus>, RepoError> {
        let row = sqlx::query_as::<_, DeliveryStatusRow>(
            "SELECT * FROM delivery_statuses \
             WHERE status_type = $1 AND deleted_at IS NULL \
             ORDER BY created_at LIMIT 1",
        )
        .bind(status_type.as_str())
        .fetch_optional(self.pool())
        .await?;
        row.map(DeliveryStatus::try_from).transpose()
    }

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Delivery>, RepoError> {
        Ok(sqlx::query_as::<_, Delivery>(
            "SELECT * FROM deliveries WHERE order_id = $1 AND deleted_at IS NULL ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(self.pool())
        .await?)
    }

    async fn delete_status_guarded(
        &self,
        status_id: Uuid,
    ) -> Result<StatusDeleteOutcome, RepoError> {
        let mut tx = self.pool().begin().await?;

        let found: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM delivery_statuses WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(status_id)
        .fetch_optional(&mut *tx)
        .await?;
        if found.is_none() {
            tx.commit().await?;
            return Ok(StatusDeleteOutcome::NotFound);
        }

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM deliveries WHERE delivery_status_id = $1 AND deleted_at IS NULL)",
        )
        .bind(status_id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            tx.commit().await?;
            return Ok(StatusDeleteOutcome::InUse);
        }

        sqlx::query(
            "UPDATE delivery_statuses SET deleted_at = $2, updated_at = $2 WHERE id = $1",
        )
        .bind(status_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(StatusDeleteOutcome::Deleted)
    }
}
