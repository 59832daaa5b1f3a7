use sqlx::postgres::PgPool;

mod baskets;
mod catalog;
mod deliveries;
mod identity;
mod orders;
mod payments;

// ============================================================================
// Postgres Store
// ============================================================================
//
// One store over one pool, implementing every repository trait. Single
// statements ride the statement's own transaction; compound mutations
// (order creation with basket clear, registration, the referenced-status
// delete guard, clamped decrements) open an explicit transaction so the
// whole effect commits or rolls back together.
//
// ============================================================================

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
