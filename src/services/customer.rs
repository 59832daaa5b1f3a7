use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::customer::{Customer, Role};
use crate::error::AppError;
use crate::repository::{CustomerStore, UserStore};

// ============================================================================
// Customer Service
// ============================================================================

/// Customer record joined with its login identity for display.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerProfile {
    pub customer: Customer,
    pub username: String,
    pub email: String,
    pub role: Role,
}

pub struct CustomerService {
    customers: Arc<dyn CustomerStore>,
    users: Arc<dyn UserStore>,
}

impl CustomerService {
    pub fn new(customers: Arc<dyn CustomerStore>, users: Arc<dyn UserStore>) -> Self {
        Self { customers, users }
    }

    pub async fn profile(&self, customer_id: Uuid) -> Result<CustomerProfile, AppError> {
        let customer = self
            .customers
            .get(customer_id)
            .await?
            .ok_or(AppError::not_found("customer"))?;
        let user = self
            .users
            .get(customer.user_id)
            .await?
            .ok_or(AppError::not_found("user"))?;
        Ok(CustomerProfile {
            customer,
            username: user.username,
            email: user.email,
            role: user.role,
        })
    }

    pub async fn list(&self) -> Result<Vec<CustomerProfile>, AppError> {
        let mut profiles = Vec::new();
        for customer in self.customers.list().await? {
            let user = self
                .users
                .get(customer.user_id)
                .await?
                .ok_or(AppError::not_found("user"))?;
            profiles.push(CustomerProfile {
                customer,
                username: user.username,
                email: user.email,
                role: user.role,
            });
        }
        Ok(profiles)
    }

    pub async fn update_identity_card(
        &self,
        customer_id: Uuid,
        identity_card: String,
    ) -> Result<Customer, AppError> {
        let identity_card = identity_card.trim().to_string();
        if identity_card.is_empty() {
            return Err(AppError::validation("identity card cannot be empty"));
        }
        let mut customer = self
            .customers
            .get(customer_id)
            .await?
            .ok_or(AppError::not_found("customer"))?;
        customer.identity_card = identity_card;
        Ok(self.customers.update(customer).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::AuthUser;
    use crate::repository::memory::MemoryStore;

    async fn seeded() -> (CustomerService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let svc = CustomerService::new(store.clone(), store.clone());

        let user = AuthUser::new(
            "emre".into(),
            "emre@example.com".into(),
            "hash".into(),
            Role::Customer,
        );
        let customer = Customer::new(user.id, "E555666".into());
        let customer_id = customer.id;
        store.create_with_customer(user, customer).await.unwrap();
        (svc, customer_id)
    }

    #[tokio::test]
    async fn profile_joins_the_login_identity() {
        let (svc, customer_id) = seeded().await;
        let profile = svc.profile(customer_id).await.unwrap();
        assert_eq!(profile.username, "emre");
        assert_eq!(profile.role, Role::Customer);

        assert!(matches!(
            svc.profile(Uuid::new_v4()).await,
            Err(AppError::NotFound { kind: "customer" })
        ));
    }

    #[tokio::test]
    async fn identity_card_updates_and_rejects_blank() {
        let (svc, customer_id) = seeded().await;
        let customer = svc
            .update_identity_card(customer_id, " F777888 ".into())
            .await
            .unwrap();
        assert_eq!(customer.identity_card, "F777888");

        assert!(matches!(
            svc.update_identity_card(customer_id, "  ".into()).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn list_returns_every_live_customer() {
        let (svc, _) = seeded().await;
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }
}
