use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::impl_entity;

// ============================================================================
// Delivery Tracking
// ============================================================================
//
// A delivery belongs to one order and points at a DeliveryStatus row. The
// status rows are admin-editable records (free-text name and description)
// keyed by an enumerated type, so a delivery's stage is changed by resolving
// the row for the requested type and moving the foreign key.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatusType {
    Pending,
    InTransit,
    Delivered,
    Failed,
}

impl DeliveryStatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatusType::Pending => "Pending",
            DeliveryStatusType::InTransit => "InTransit",
            DeliveryStatusType::Delivered => "Delivered",
            DeliveryStatusType::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(DeliveryStatusType::Pending),
            "intransit" | "in-transit" | "in_transit" => Ok(DeliveryStatusType::InTransit),
            "delivered" => Ok(DeliveryStatusType::Delivered),
            "failed" => Ok(DeliveryStatusType::Failed),
            other => Err(format!("unknown delivery status type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub id: Uuid,
    pub status_type: DeliveryStatusType,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DeliveryStatus {
    pub fn new(status_type: DeliveryStatusType, name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status_type,
            name,
            description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub delivery_status_id: Uuid,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub actual_date: Option<DateTime<Utc>>,
    pub installer_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Delivery {
    pub fn new(order_id: Uuid, delivery_status_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            delivery_status_id,
            scheduled_date: None,
            actual_date: None,
            installer_name: None,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

impl_entity!(DeliveryStatus, "delivery status");
impl_entity!(Delivery, "delivery");
