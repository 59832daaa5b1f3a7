use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::customer::Customer;
use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::error::AppError;
use crate::metrics::Metrics;
use crate::repository::{PaymentStore, Repository};
use crate::services::crud::EntityMapper;

// ============================================================================
// Payment Service
// ============================================================================
//
// Payments are recorded as Pending and settled by explicit status moves.
// Each move is legal from exactly one current status; anything else is a
// conflict, never a silent overwrite.
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentInput {
    pub customer_id: Uuid,
    pub payment_method_id: Uuid,
    pub amount: Decimal,
}

pub struct PaymentService {
    payments: Arc<dyn PaymentStore>,
    customers: Arc<dyn Repository<Customer>>,
    methods: Arc<dyn Repository<PaymentMethod>>,
    metrics: Arc<Metrics>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        customers: Arc<dyn Repository<Customer>>,
        methods: Arc<dyn Repository<PaymentMethod>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            payments,
            customers,
            methods,
            metrics,
        }
    }

    pub async fn record(&self, input: RecordPaymentInput) -> Result<Payment, AppError> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::validation("payment amount must be positive"));
        }
        self.customers
            .get(input.customer_id)
            .await?
            .ok_or(AppError::not_found("customer"))?;
        self.methods
            .get(input.payment_method_id)
            .await?
            .ok_or(AppError::not_found("payment method"))?;

        let payment = self
            .payments
            .add(Payment::new(
                input.customer_id,
                input.payment_method_id,
                input.amount,
            ))
            .await?;
        self.metrics.payments_recorded.inc();
        tracing::info!(
            payment_id = %payment.id,
            customer_id = %payment.customer_id,
            amount = %payment.amount,
            "payment recorded"
        );
        Ok(payment)
    }

    pub async fn get(&self, id: Uuid) -> Result<Payment, AppError> {
        self.payments
            .get(id)
            .await?
            .ok_or(AppError::not_found("payment"))
    }

    pub async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>, AppError> {
        Ok(self.payments.list_by_customer(customer_id).await?)
    }

    pub async fn mark_completed(&self, id: Uuid) -> Result<Payment, AppError> {
        self.settle(id, PaymentStatus::Pending, |payment| {
            payment.status = PaymentStatus::Completed;
            payment.paid_at = Some(chrono::Utc::now());
        })
        .await
    }

    pub async fn mark_failed(&self, id: Uuid) -> Result<Payment, AppError> {
        self.settle(id, PaymentStatus::Pending, |payment| {
            payment.status = PaymentStatus::Failed;
        })
        .await
    }

    pub async fn mark_cancelled(&self, id: Uuid) -> Result<Payment, AppError> {
        self.settle(id, PaymentStatus::Pending, |payment| {
            payment.status = PaymentStatus::Cancelled;
        })
        .await
    }

    /// Only a completed payment can be refunded.
    pub async fn mark_refunded(&self, id: Uuid) -> Result<Payment, AppError> {
        self.settle(id, PaymentStatus::Completed, |payment| {
            payment.status = PaymentStatus::Refunded;
            payment.refunded_at = Some(chrono::Utc::now());
        })
        .await
    }

    async fn settle<F>(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        apply: F,
    ) -> Result<Payment, AppError>
    where
        F: FnOnce(&mut Payment),
    {
        let mut payment = self.get(id).await?;
        if payment.status != expected {
            return Err(AppError::Conflict(format!(
                "payment is {}, expected {}",
                payment.status, expected
            )));
        }
        apply(&mut payment);
        let payment = self.payments.update(payment).await?;
        tracing::info!(payment_id = %id, status = %payment.status, "payment settled");
        Ok(payment)
    }
}

// ============================================================================
// Payment Method Mapper (generic CRUD)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodInput {
    pub name: String,
}

pub struct PaymentMethodMapper;

impl EntityMapper for PaymentMethodMapper {
    type Entity = PaymentMethod;
    type Create = PaymentMethodInput;
    type Update = PaymentMethodInput;

    fn build(input: Self::Create) -> Result<Self::Entity, AppError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("payment method name cannot be empty"));
        }
        Ok(PaymentMethod::new(name))
    }

    fn apply(entity: &mut Self::Entity, input: Self::Update) -> Result<(), AppError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("payment method name cannot be empty"));
        }
        entity.name = name;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::{AuthUser, Role};
    use crate::repository::memory::MemoryStore;
    use crate::repository::UserStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        svc: PaymentService,
        customer_id: Uuid,
        method_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let svc = PaymentService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(Metrics::new().unwrap()),
        );

        let user = AuthUser::new(
            "ayse".into(),
            "ayse@example.com".into(),
            "hash".into(),
            Role::Customer,
        );
        let customer = Customer::new(user.id, "D333444".into());
        let customer_id = customer.id;
        store.create_with_customer(user, customer).await.unwrap();

        let method = PaymentMethod::new("Bank transfer".into());
        let method_id = method.id;
        Repository::<PaymentMethod>::add(store.as_ref(), method)
            .await
            .unwrap();

        Fixture {
            svc,
            customer_id,
            method_id,
        }
    }

    async fn record(fx: &Fixture) -> Payment {
        fx.svc
            .record(RecordPaymentInput {
                customer_id: fx.customer_id,
                payment_method_id: fx.method_id,
                amount: dec!(450),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn recorded_payment_starts_pending() {
        let fx = fixture().await;
        let payment = record(&fx).await;
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.paid_at.is_none());

        let listed = fx.svc.list_by_customer(fx.customer_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn record_validates_amount_customer_and_method() {
        let fx = fixture().await;
        assert!(matches!(
            fx.svc
                .record(RecordPaymentInput {
                    customer_id: fx.customer_id,
                    payment_method_id: fx.method_id,
                    amount: dec!(0),
                })
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            fx.svc
                .record(RecordPaymentInput {
                    customer_id: Uuid::new_v4(),
                    payment_method_id: fx.method_id,
                    amount: dec!(10),
                })
                .await,
            Err(AppError::NotFound { kind: "customer" })
        ));
        assert!(matches!(
            fx.svc
                .record(RecordPaymentInput {
                    customer_id: fx.customer_id,
                    payment_method_id: Uuid::new_v4(),
                    amount: dec!(10),
                })
                .await,
            Err(AppError::NotFound { kind: "payment method" })
        ));
    }

    #[tokio::test]
    async fn completed_then_refunded_sets_both_timestamps() {
        let fx = fixture().await;
        let payment = record(&fx).await;

        let payment = fx.svc.mark_completed(payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.paid_at.is_some());

        let payment = fx.svc.mark_refunded(payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
        assert!(payment.refunded_at.is_some());
    }

    #[tokio::test]
    async fn settlement_from_the_wrong_status_is_a_conflict() {
        let fx = fixture().await;
        let payment = record(&fx).await;

        // refund requires a completed payment
        assert!(matches!(
            fx.svc.mark_refunded(payment.id).await,
            Err(AppError::Conflict(_))
        ));

        fx.svc.mark_cancelled(payment.id).await.unwrap();
        for result in [
            fx.svc.mark_completed(payment.id).await,
            fx.svc.mark_failed(payment.id).await,
            fx.svc.mark_cancelled(payment.id).await,
        ] {
            assert!(matches!(result, Err(AppError::Conflict(_))));
        }
    }

    #[tokio::test]
    async fn method_mapper_rejects_blank_names() {
        assert!(matches!(
            PaymentMethodMapper::build(PaymentMethodInput { name: "  ".into() }),
            Err(AppError::Validation(_))
        ));
        let method =
            PaymentMethodMapper::build(PaymentMethodInput { name: " Cash ".into() }).unwrap();
        assert_eq!(method.name, "Cash");
    }
}
