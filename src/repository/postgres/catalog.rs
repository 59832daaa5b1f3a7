use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::catalog::{Category, Product};
use crate::domain::Entity;
use crate::repository::{ProductStore, RepoError, Repository};

use super::PgStore;

#[async_trait]
impl Repository<Category> for PgStore {
    async fn list(&self) -> Result<Vec<Category>, RepoError> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE deleted_at IS NULL ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?)
    }

    async fn add(&self, category: Category) -> Result<Category, RepoError> {
        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .bind(category.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(category)
    }

    async fn update(&self, mut category: Category) -> Result<Category, RepoError> {
        category.touch(Utc::now());
        sqlx::query(
            "UPDATE categories SET name = $2, description = $3, updated_at = $4 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.updated_at)
        .execute(self.pool())
        .await?;
        Ok(category)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE categories SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl Repository<Product> for PgStore {
    async fn list(&self) -> Result<Vec<Product>, RepoError> {
        Ok(sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE deleted_at IS NULL ORDER BY title",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        Ok(sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?)
    }

    async fn add(&self, product: Product) -> Result<Product, RepoError> {
        sqlx::query(
            "INSERT INTO products \
             (id, category_id, title, description, unit_price, thickness_min_mm, thickness_max_mm, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(product.id)
        .bind(product.category_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.unit_price)
        .bind(product.thickness_min_mm)
        .bind(product.thickness_max_mm)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(product)
    }

    async fn update(&self, mut product: Product) -> Result<Product, RepoError> {
        product.touch(Utc::now());
        sqlx::query(
            "UPDATE products SET category_id = $2, title = $3, description = $4, unit_price = $5, \
             thickness_min_mm = $6, thickness_max_mm = $7, updated_at = $8 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(product.id)
        .bind(product.category_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.unit_price)
        .bind(product.thickness_min_mm)
        .bind(product.thickness_max_mm)
        .bind(product.updated_at)
        .execute(self.pool())
        .await?;
        Ok(product)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<Product>, RepoError> {
        Ok(sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE category_id = $1 AND deleted_at IS NULL ORDER BY title",
        )
        .bind(category_id)
        .fetch_all(self.pool())
        .await?)
    }
}
