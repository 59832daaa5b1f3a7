use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::payment::{PaymentMethodInput, RecordPaymentInput};

use super::auth::{AdminAuth, Auth};
use super::AppState;

// ============================================================================
// Payment Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub payment_method_id: Uuid,
    pub amount: Decimal,
}

pub async fn list_methods(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.payment_methods.list().await?))
}

pub async fn record_payment(
    auth: Auth,
    state: web::Data<AppState>,
    input: web::Json<RecordPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let payment = state
        .payments
        .record(RecordPaymentInput {
            customer_id: auth.customer_id()?,
            payment_method_id: input.payment_method_id,
            amount: input.amount,
        })
        .await?;
    Ok(HttpResponse::Created().json(payment))
}

pub async fn list_own_payments(
    auth: Auth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.payments.list_by_customer(auth.customer_id()?).await?))
}

// ------------------------------------------------------------------
// Admin
// ------------------------------------------------------------------

pub async fn complete_payment(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.payments.mark_completed(path.into_inner()).await?))
}

pub async fn fail_payment(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.payments.mark_failed(path.into_inner()).await?))
}

pub async fn refund_payment(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.payments.mark_refunded(path.into_inner()).await?))
}

pub async fn cancel_payment(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.payments.mark_cancelled(path.into_inner()).await?))
}

pub async fn create_method(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    input: web::Json<PaymentMethodInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Created().json(state.payment_methods.create(input.into_inner()).await?))
}

pub async fn update_method(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<PaymentMethodInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(
        state
            .payment_methods
            .update(path.into_inner(), input.into_inner())
            .await?,
    ))
}

pub async fn delete_method(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.payment_methods.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
