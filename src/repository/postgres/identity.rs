use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::customer::{AuthUser, Customer, Role};
use crate::domain::Entity;
use crate::repository::{CustomerStore, RepoError, Repository, UserStore};

use super::PgStore;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for AuthUser {
    type Error = RepoError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(RepoError::Decode)?;
        Ok(AuthUser {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, created_at, updated_at, deleted_at";

#[async_trait]
impl Repository<AuthUser> for PgStore {
    async fn list(&self) -> Result<Vec<AuthUser>, RepoError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM auth_users WHERE deleted_at IS NULL"
        ))
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(AuthUser::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<AuthUser>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM auth_users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(AuthUser::try_from).transpose()
    }

    async fn add(&self, user: AuthUser) -> Result<AuthUser, RepoError> {
        sqlx::query(
            "INSERT INTO auth_users (id, username, email, password_hash, role, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(user)
    }

    async fn update(&self, mut user: AuthUser) -> Result<AuthUser, RepoError> {
        user.touch(Utc::now());
        sqlx::query(
            "UPDATE auth_users SET username = $2, email = $3, password_hash = $4, role = $5, updated_at = $6 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .execute(self.pool())
        .await?;
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE auth_users SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<AuthUser>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM auth_users WHERE username = $1 AND deleted_at IS NULL"
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await?;
        row.map(AuthUser::try_from).transpose()
    }

    async fn create_with_customer(
        &self,
        user: AuthUser,
        customer: Customer,
    ) -> Result<(), RepoError> {
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO auth_users (id, username, email, password_hash, role, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO customers (id, user_id, identity_card, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(customer.id)
        .bind(customer.user_id)
        .bind(&customer.identity_card)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .bind(customer.deleted_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl Repository<Customer> for PgStore {
    async fn list(&self) -> Result<Vec<Customer>, RepoError> {
        Ok(sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE deleted_at IS NULL",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Customer>, RepoError> {
        Ok(sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?)
    }

    async fn add(&self, customer: Customer) -> Result<Customer, RepoError> {
        sqlx::query(
            "INSERT INTO customers (id, user_id, identity_card, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(customer.id)
        .bind(customer.user_id)
        .bind(&customer.identity_card)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .bind(customer.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(customer)
    }

    async fn update(&self, mut customer: Customer) -> Result<Customer, RepoError> {
        customer.touch(Utc::now());
        sqlx::query(
            "UPDATE customers SET user_id = $2, identity_card = $3, updated_at = $4 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(customer.id)
        .bind(customer.user_id)
        .bind(&customer.identity_card)
        .bind(customer.updated_at)
        .execute(self.pool())
        .await?;
        Ok(customer)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE customers SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Customer>, RepoError> {
        Ok(sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?)
    }
}
