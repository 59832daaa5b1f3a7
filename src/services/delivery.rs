use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::delivery::{Delivery, DeliveryStatus, DeliveryStatusType};
use crate::domain::order::Order;
use crate::error::AppError;
use crate::repository::{DeliveryStore, Repository, StatusDeleteOutcome};

// ============================================================================
// Delivery Service
// ============================================================================
//
// Deliveries are scheduled against confirmed orders and tracked through the
// admin-editable status rows. A status row cannot be deleted while a live
// delivery still points at it.
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeliveryInput {
    pub order_id: Uuid,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub installer_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDeliveryInput {
    pub scheduled_date: Option<DateTime<Utc>>,
    pub installer_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusInput {
    pub status_type: String,
    pub name: String,
    pub description: Option<String>,
}

pub struct DeliveryService {
    deliveries: Arc<dyn DeliveryStore>,
    statuses: Arc<dyn Repository<DeliveryStatus>>,
    orders: Arc<dyn Repository<Order>>,
}

impl DeliveryService {
    pub fn new(
        deliveries: Arc<dyn DeliveryStore>,
        statuses: Arc<dyn Repository<DeliveryStatus>>,
        orders: Arc<dyn Repository<Order>>,
    ) -> Self {
        Self {
            deliveries,
            statuses,
            orders,
        }
    }

    async fn status_for(&self, status_type: DeliveryStatusType) -> Result<DeliveryStatus, AppError> {
        self.deliveries
            .find_status_by_type(status_type)
            .await?
            .ok_or(AppError::not_found("delivery status"))
    }

    // ------------------------------------------------------------------
    // Deliveries
    // ------------------------------------------------------------------

    /// Schedules a delivery for an order, starting at the Pending status.
    pub async fn create(&self, input: CreateDeliveryInput) -> Result<Delivery, AppError> {
        self.orders
            .get(input.order_id)
            .await?
            .ok_or(AppError::not_found("order"))?;
        let status = self.status_for(DeliveryStatusType::Pending).await?;

        let mut delivery = Delivery::new(input.order_id, status.id);
        delivery.scheduled_date = input.scheduled_date;
        delivery.installer_name = input.installer_name;
        delivery.notes = input.notes;

        let delivery = self.deliveries.add(delivery).await?;
        tracing::info!(delivery_id = %delivery.id, order_id = %delivery.order_id, "delivery scheduled");
        Ok(delivery)
    }

    pub async fn get(&self, id: Uuid) -> Result<Delivery, AppError> {
        self.deliveries
            .get(id)
            .await?
            .ok_or(AppError::not_found("delivery"))
    }

    pub async fn list(&self) -> Result<Vec<Delivery>, AppError> {
        Ok(self.deliveries.list().await?)
    }

    pub async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Delivery>, AppError> {
        Ok(self.deliveries.list_by_order(order_id).await?)
    }

    pub async fn update(&self, id: Uuid, input: UpdateDeliveryInput) -> Result<Delivery, AppError> {
        let mut delivery = self.get(id).await?;
        if input.scheduled_date.is_some() {
            delivery.scheduled_date = input.scheduled_date;
        }
        if input.installer_name.is_some() {
            delivery.installer_name = input.installer_name;
        }
        if input.notes.is_some() {
            delivery.notes = input.notes;
        }
        Ok(self.deliveries.update(delivery).await?)
    }

    /// Moves a delivery to the status row for `status_type`. Reaching
    /// Delivered stamps the actual date.
    pub async fn change_status(
        &self,
        id: Uuid,
        status_type: DeliveryStatusType,
    ) -> Result<Delivery, AppError> {
        let mut delivery = self.get(id).await?;
        let status = self.status_for(status_type).await?;

        delivery.delivery_status_id = status.id;
        if status_type == DeliveryStatusType::Delivered && delivery.actual_date.is_none() {
            delivery.actual_date = Some(Utc::now());
        }
        let delivery = self.deliveries.update(delivery).await?;
        tracing::info!(delivery_id = %id, status = %status_type, "delivery status changed");
        Ok(delivery)
    }

    pub async fn change_status_by_name(&self, id: Uuid, name: &str) -> Result<Delivery, AppError> {
        let status_type: DeliveryStatusType =
            name.parse().map_err(AppError::Validation)?;
        self.change_status(id, status_type).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.deliveries.soft_delete(id).await? {
            return Err(AppError::not_found("delivery"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Status Rows
    // ------------------------------------------------------------------

    pub async fn list_statuses(&self) -> Result<Vec<DeliveryStatus>, AppError> {
        Ok(self.statuses.list().await?)
    }

    pub async fn get_status(&self, id: Uuid) -> Result<DeliveryStatus, AppError> {
        self.statuses
            .get(id)
            .await?
            .ok_or(AppError::not_found("delivery status"))
    }

    pub async fn create_status(&self, input: StatusInput) -> Result<DeliveryStatus, AppError> {
        let (status_type, name, description) = Self::validate_status(input)?;
        Ok(self
            .statuses
            .add(DeliveryStatus::new(status_type, name, description))
            .await?)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        input: StatusInput,
    ) -> Result<DeliveryStatus, AppError> {
        let (status_type, name, description) = Self::validate_status(input)?;
        let mut status = self.get_status(id).await?;
        status.status_type = status_type;
        status.name = name;
        status.description = description;
        Ok(self.statuses.update(status).await?)
    }

    /// Refused with a conflict while any live delivery references the row.
    pub async fn delete_status(&self, id: Uuid) -> Result<(), AppError> {
        match self.deliveries.delete_status_guarded(id).await? {
            StatusDeleteOutcome::Deleted => Ok(()),
            StatusDeleteOutcome::NotFound => Err(AppError::not_found("delivery status")),
            StatusDeleteOutcome::InUse => Err(AppError::Conflict(
                "delivery status is referenced by active deliveries".into(),
            )),
        }
    }

    fn validate_status(
        input: StatusInput,
    ) -> Result<(DeliveryStatusType, String, String), AppError> {
        let status_type: DeliveryStatusType =
            input.status_type.parse().map_err(AppError::Validation)?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("status name cannot be empty"));
        }
        Ok((status_type, name, input.description.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::{AuthUser, Customer, Role};
    use crate::domain::order::{NewOrderItem, Order};
    use crate::repository::memory::MemoryStore;
    use crate::repository::{OrderStore, UserStore};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<MemoryStore>,
        svc: DeliveryService,
        order_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let svc = DeliveryService::new(store.clone(), store.clone(), store.clone());

        for (status_type, name) in [
            (DeliveryStatusType::Pending, "Awaiting dispatch"),
            (DeliveryStatusType::InTransit, "On the road"),
            (DeliveryStatusType::Delivered, "Installed"),
            (DeliveryStatusType::Failed, "Attempt failed"),
        ] {
            Repository::<DeliveryStatus>::add(
                store.as_ref(),
                DeliveryStatus::new(status_type, name.into(), String::new()),
            )
            .await
            .unwrap();
        }

        let user = AuthUser::new(
            "zeynep".into(),
            "zeynep@example.com".into(),
            "hash".into(),
            Role::Customer,
        );
        let customer = Customer::new(user.id, "C111222".into());
        let customer_id = customer.id;
        store.create_with_customer(user, customer).await.unwrap();

        let (order, items) = Order::new(
            customer_id,
            "34 Basalt Road".into(),
            vec![NewOrderItem {
                product_id: Uuid::new_v4(),
                quantity: dec!(1),
                unit_price: dec!(90),
            }],
        )
        .unwrap();
        let order_id = order.id;
        store.create_order(order, items).await.unwrap();

        Fixture {
            store,
            svc,
            order_id,
        }
    }

    fn create_input(order_id: Uuid) -> CreateDeliveryInput {
        CreateDeliveryInput {
            order_id,
            scheduled_date: None,
            installer_name: Some("Kaya Installations".into()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn new_delivery_starts_pending() {
        let fx = fixture().await;
        let delivery = fx.svc.create(create_input(fx.order_id)).await.unwrap();

        let pending = fx
            .store
            .find_status_by_type(DeliveryStatusType::Pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.delivery_status_id, pending.id);
        assert!(delivery.actual_date.is_none());

        assert!(matches!(
            fx.svc.create(create_input(Uuid::new_v4())).await,
            Err(AppError::NotFound { kind: "order" })
        ));
    }

    #[tokio::test]
    async fn reaching_delivered_stamps_the_actual_date() {
        let fx = fixture().await;
        let delivery = fx.svc.create(create_input(fx.order_id)).await.unwrap();

        let delivery = fx
            .svc
            .change_status(delivery.id, DeliveryStatusType::InTransit)
            .await
            .unwrap();
        assert!(delivery.actual_date.is_none());

        let delivery = fx
            .svc
            .change_status_by_name(delivery.id, "delivered")
            .await
            .unwrap();
        assert!(delivery.actual_date.is_some());

        assert!(matches!(
            fx.svc.change_status_by_name(delivery.id, "beamed-up").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_patches_only_supplied_fields() {
        let fx = fixture().await;
        let delivery = fx.svc.create(create_input(fx.order_id)).await.unwrap();

        let updated = fx
            .svc
            .update(
                delivery.id,
                UpdateDeliveryInput {
                    scheduled_date: Some(Utc::now()),
                    installer_name: None,
                    notes: Some("call ahead".into()),
                },
            )
            .await
            .unwrap();

        assert!(updated.scheduled_date.is_some());
        assert_eq!(updated.installer_name.as_deref(), Some("Kaya Installations"));
        assert_eq!(updated.notes.as_deref(), Some("call ahead"));
    }

    #[tokio::test]
    async fn referenced_status_cannot_be_deleted() {
        let fx = fixture().await;
        let delivery = fx.svc.create(create_input(fx.order_id)).await.unwrap();

        let result = fx.svc.delete_status(delivery.delivery_status_id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // once the delivery is gone the status row can go too
        fx.svc.delete(delivery.id).await.unwrap();
        fx.svc
            .delete_status(delivery.delivery_status_id)
            .await
            .unwrap();

        assert!(matches!(
            fx.svc.delete_status(Uuid::new_v4()).await,
            Err(AppError::NotFound { kind: "delivery status" })
        ));
    }

    #[tokio::test]
    async fn status_rows_are_admin_editable() {
        let fx = fixture().await;
        let status = fx
            .svc
            .create_status(StatusInput {
                status_type: "in_transit".into(),
                name: "Leaving the quarry".into(),
                description: None,
            })
            .await
            .unwrap();
        assert_eq!(status.status_type, DeliveryStatusType::InTransit);

        let updated = fx
            .svc
            .update_status(
                status.id,
                StatusInput {
                    status_type: "failed".into(),
                    name: "Stuck at customs".into(),
                    description: Some("second attempt pending".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status_type, DeliveryStatusType::Failed);
        assert_eq!(updated.name, "Stuck at customs");

        assert!(matches!(
            fx.svc
                .create_status(StatusInput {
                    status_type: "pending".into(),
                    name: "   ".into(),
                    description: None,
                })
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deliveries_list_by_order() {
        let fx = fixture().await;
        fx.svc.create(create_input(fx.order_id)).await.unwrap();
        fx.svc.create(create_input(fx.order_id)).await.unwrap();

        let deliveries = fx.svc.list_by_order(fx.order_id).await.unwrap();
        assert_eq!(deliveries.len(), 2);
        assert!(fx
            .svc
            .list_by_order(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }
}
