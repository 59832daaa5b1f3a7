use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::impl_entity;

// ============================================================================
// Catalog Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Stone slab product. Prices are per square metre; thickness is the cut
/// range offered, in millimetres.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub unit_price: Decimal,
    pub thickness_min_mm: Decimal,
    pub thickness_max_mm: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(
        category_id: Uuid,
        title: String,
        description: String,
        unit_price: Decimal,
        thickness_min_mm: Decimal,
        thickness_max_mm: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            category_id,
            title,
            description,
            unit_price,
            thickness_min_mm,
            thickness_max_mm,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

impl_entity!(Category, "category");
impl_entity!(Product, "product");
