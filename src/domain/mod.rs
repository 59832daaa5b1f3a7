use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod basket;
pub mod catalog;
pub mod customer;
pub mod delivery;
pub mod order;
pub mod payment;

// ============================================================================
// Entity Contract - Identity, Audit Stamps, Soft Delete
// ============================================================================
//
// Every persisted record carries the same identity and audit shape. Reads at
// the repository boundary exclude soft-deleted rows; nothing is physically
// removed outside the migration path.
//
// ============================================================================

pub trait Entity: Clone + Send + Sync + 'static {
    /// Short noun used in log fields and not-found errors ("order", "basket").
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    /// Bump `updated_at`; called by repositories on every update.
    fn touch(&mut self, now: DateTime<Utc>);

    /// Flip the soft-delete flag. Does not cascade.
    fn mark_deleted(&mut self, now: DateTime<Utc>);

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

macro_rules! impl_entity {
    ($ty:ty, $kind:literal) => {
        impl crate::domain::Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> uuid::Uuid {
                self.id
            }

            fn deleted_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
                self.deleted_at
            }

            fn touch(&mut self, now: chrono::DateTime<chrono::Utc>) {
                self.updated_at = now;
            }

            fn mark_deleted(&mut self, now: chrono::DateTime<chrono::Utc>) {
                self.deleted_at = Some(now);
                self.updated_at = now;
            }
        }
    };
}

pub(crate) use impl_entity;
