use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::domain::Entity;
use crate::repository::{PaymentStore, RepoError, Repository};

use super::PgStore;

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    customer_id: Uuid,
    payment_method_id: Uuid,
    amount: Decimal,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepoError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row.status.parse().map_err(RepoError::Decode)?;
        Ok(Payment {
            id: row.id,
            customer_id: row.customer_id,
            payment_method_id: row.payment_method_id,
            amount: row.amount,
            status,
            paid_at: row.paid_at,
            refunded_at: row.refunded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[async_trait]
impl Repository<PaymentMethod> for PgStore {
    async fn list(&self) -> Result<Vec<PaymentMethod>, RepoError> {
        Ok(sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE deleted_at IS NULL ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PaymentMethod>, RepoError> {
        Ok(sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?)
    }

    async fn add(&self, method: PaymentMethod) -> Result<PaymentMethod, RepoError> {
        sqlx::query(
            "INSERT INTO payment_methods (id, name, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(method.id)
        .bind(&method.name)
        .bind(method.created_at)
        .bind(method.updated_at)
        .bind(method.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(method)
    }

    async fn update(&self, mut method: PaymentMethod) -> Result<PaymentMethod, RepoError> {
        method.touch(Utc::now());
        sqlx::query(
            "UPDATE payment_methods SET name = $2, updated_at = $3 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(method.id)
        .bind(&method.name)
        .bind(method.updated_at)
        .execute(self.pool())
        .await?;
        Ok(method)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE payment_methods SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl Repository<Payment> for PgStore {
    async fn list(&self) -> Result<Vec<Payment>, RepoError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT * FROM payments WHERE deleted_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>, RepoError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT * FROM payments WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Payment::try_from).transpose()
    }

    async fn add(&self, payment: Payment) -> Result<Payment, RepoError> {
        sqlx::query(
            "INSERT INTO payments \
             (id, customer_id, payment_method_id, amount, status, paid_at, refunded_at, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(payment.id)
        .bind(payment.customer_id)
        .bind(payment.payment_method_id)
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .bind(payment.refunded_at)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .bind(payment.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(payment)
    }

    async fn update(&self, mut payment: Payment) -> Result<Payment, RepoError> {
        payment.touch(Utc::now());
        sqlx::query(
            "UPDATE payments SET payment_method_id = $2, amount = $3, status = $4, paid_at = $5, \
             refunded_at = $6, updated_at = $7 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(payment.id)
        .bind(payment.payment_method_id)
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .bind(payment.refunded_at)
        .bind(payment.updated_at)
        .execute(self.pool())
        .await?;
        Ok(payment)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE payments SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>, RepoError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT * FROM payments WHERE customer_id = $1 AND deleted_at IS NULL ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Payment::try_from).collect()
    }
}
