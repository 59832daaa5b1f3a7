use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::impl_entity;

// ============================================================================
// Identity & Customer Records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Customer => "Customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Login identity. Password hashes are argon2 PHC strings and never leave
/// the service layer.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn new(username: String, email: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Retail customer, linked 1:1 to a login identity and 1:1 to a basket.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub identity_card: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn new(user_id: Uuid, identity_card: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            identity_card,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

impl_entity!(AuthUser, "user");
impl_entity!(Customer, "customer");
