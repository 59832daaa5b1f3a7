use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::catalog::{Category, Product};
use crate::error::AppError;
use crate::repository::{ProductStore, Repository};

use super::crud::EntityMapper;

// ============================================================================
// Catalog - Categories and Products
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
}

pub struct CategoryMapper;

impl EntityMapper for CategoryMapper {
    type Entity = Category;
    type Create = CategoryInput;
    type Update = CategoryInput;

    fn build(input: CategoryInput) -> Result<Category, AppError> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("category name cannot be empty"));
        }
        Ok(Category::new(input.name, input.description))
    }

    fn apply(category: &mut Category, input: CategoryInput) -> Result<(), AppError> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("category name cannot be empty"));
        }
        category.name = input.name;
        category.description = input.description;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub unit_price: Decimal,
    pub thickness_min_mm: Decimal,
    pub thickness_max_mm: Decimal,
}

pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    categories: Arc<dyn Repository<Category>>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductStore>, categories: Arc<dyn Repository<Category>>) -> Self {
        Self {
            products,
            categories,
        }
    }

    fn validate(input: &ProductInput) -> Result<(), AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::validation("product title cannot be empty"));
        }
        if input.unit_price <= Decimal::ZERO {
            return Err(AppError::validation("unit price must be positive"));
        }
        if input.thickness_min_mm <= Decimal::ZERO
            || input.thickness_min_mm >= input.thickness_max_mm
        {
            return Err(AppError::validation(
                "thickness range must satisfy 0 < min < max",
            ));
        }
        Ok(())
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, AppError> {
        Self::validate(&input)?;
        self.categories
            .get(input.category_id)
            .await?
            .ok_or(AppError::not_found("category"))?;

        let product = Product::new(
            input.category_id,
            input.title,
            input.description,
            input.unit_price,
            input.thickness_min_mm,
            input.thickness_max_mm,
        );
        tracing::info!(product_id = %product.id, title = %product.title, "product created");
        Ok(self.products.add(product).await?)
    }

    pub async fn update_product(&self, id: Uuid, input: ProductInput) -> Result<Product, AppError> {
        Self::validate(&input)?;
        self.categories
            .get(input.category_id)
            .await?
            .ok_or(AppError::not_found("category"))?;

        let mut product = self.get_product(id).await?;
        product.category_id = input.category_id;
        product.title = input.title;
        product.description = input.description;
        product.unit_price = input.unit_price;
        product.thickness_min_mm = input.thickness_min_mm;
        product.thickness_max_mm = input.thickness_max_mm;
        Ok(self.products.update(product).await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, AppError> {
        self.products
            .get(id)
            .await?
            .ok_or(AppError::not_found("product"))
    }

    pub async fn list_products(&self, category_id: Option<Uuid>) -> Result<Vec<Product>, AppError> {
        Ok(match category_id {
            Some(category_id) => self.products.list_by_category(category_id).await?,
            None => self.products.list().await?,
        })
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<(), AppError> {
        if self.products.soft_delete(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("product"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;
    use rust_decimal_macros::dec;

    fn service() -> (Arc<MemoryStore>, CatalogService) {
        let store = Arc::new(MemoryStore::new());
        let svc = CatalogService::new(store.clone(), store.clone());
        (store, svc)
    }

    async fn seed_category(store: &MemoryStore) -> Uuid {
        let category = Category::new("Granite".into(), String::new());
        let id = category.id;
        Repository::<Category>::add(store, category).await.unwrap();
        id
    }

    fn input(category_id: Uuid) -> ProductInput {
        ProductInput {
            category_id,
            title: "Baltic Brown".into(),
            description: "Brown granite".into(),
            unit_price: dec!(140),
            thickness_min_mm: dec!(20),
            thickness_max_mm: dec!(30),
        }
    }

    #[tokio::test]
    async fn create_requires_existing_category() {
        let (_store, svc) = service();
        let result = svc.create_product(input(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::NotFound { kind: "category" })));
    }

    #[tokio::test]
    async fn create_rejects_inverted_thickness_range() {
        let (store, svc) = service();
        let category_id = seed_category(&store).await;
        let mut bad = input(category_id);
        bad.thickness_min_mm = dec!(30);
        bad.thickness_max_mm = dec!(20);
        assert!(matches!(
            svc.create_product(bad).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deleted_products_disappear_from_catalog_reads() {
        let (store, svc) = service();
        let category_id = seed_category(&store).await;
        let product = svc.create_product(input(category_id)).await.unwrap();

        assert_eq!(svc.list_products(None).await.unwrap().len(), 1);
        svc.delete_product(product.id).await.unwrap();
        assert!(svc.list_products(None).await.unwrap().is_empty());
        assert!(svc
            .list_products(Some(category_id))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            svc.get_product(product.id).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
