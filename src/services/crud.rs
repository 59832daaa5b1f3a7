use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Entity;
use crate::error::AppError;
use crate::repository::Repository;

// ============================================================================
// Generic CRUD Service
// ============================================================================
//
// Thin mapping layer between request inputs and an entity repository,
// instantiated once per simple entity. Entities with richer rules get their
// own service and only borrow this for the plain parts.
//
// ============================================================================

/// Input-to-entity mapping for one entity type.
pub trait EntityMapper: Send + Sync + 'static {
    type Entity: Entity;
    type Create: Send;
    type Update: Send;

    /// Builds a fresh entity, rejecting invalid input.
    fn build(input: Self::Create) -> Result<Self::Entity, AppError>;

    /// Applies an update in place, rejecting invalid input.
    fn apply(entity: &mut Self::Entity, input: Self::Update) -> Result<(), AppError>;
}

pub struct CrudService<M: EntityMapper> {
    repo: Arc<dyn Repository<M::Entity>>,
    _mapper: PhantomData<fn() -> M>,
}

impl<M: EntityMapper> CrudService<M> {
    pub fn new(repo: Arc<dyn Repository<M::Entity>>) -> Self {
        Self {
            repo,
            _mapper: PhantomData,
        }
    }

    pub async fn list(&self) -> Result<Vec<M::Entity>, AppError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<M::Entity, AppError> {
        self.repo
            .get(id)
            .await?
            .ok_or(AppError::not_found(M::Entity::KIND))
    }

    pub async fn create(&self, input: M::Create) -> Result<M::Entity, AppError> {
        let entity = M::build(input)?;
        Ok(self.repo.add(entity).await?)
    }

    pub async fn update(&self, id: Uuid, input: M::Update) -> Result<M::Entity, AppError> {
        let mut entity = self.get(id).await?;
        M::apply(&mut entity, input)?;
        Ok(self.repo.update(entity).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if self.repo.soft_delete(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(M::Entity::KIND))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Category;
    use crate::repository::memory::MemoryStore;
    use crate::services::catalog::{CategoryInput, CategoryMapper};

    fn service() -> CrudService<CategoryMapper> {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        CrudService::new(store as Arc<dyn Repository<Category>>)
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let svc = service();
        let created = svc
            .create(CategoryInput {
                name: "Granite".into(),
                description: "Igneous".into(),
            })
            .await
            .unwrap();

        let fetched = svc.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "Granite");

        let updated = svc
            .update(
                created.id,
                CategoryInput {
                    name: "Granite slabs".into(),
                    description: "Igneous".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Granite slabs");

        svc.delete(created.id).await.unwrap();
        assert!(matches!(
            svc.get(created.id).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            svc.delete(created.id).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let svc = service();
        let result = svc
            .create(CategoryInput {
                name: "  ".into(),
                description: String::new(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
