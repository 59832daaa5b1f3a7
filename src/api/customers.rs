use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

use super::auth::{AdminAuth, Auth};
use super::AppState;

// ============================================================================
// Customer Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub identity_card: String,
}

pub async fn me(auth: Auth, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.customers.profile(auth.customer_id()?).await?))
}

pub async fn update_me(
    auth: Auth,
    state: web::Data<AppState>,
    input: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let customer = state
        .customers
        .update_identity_card(auth.customer_id()?, input.into_inner().identity_card)
        .await?;
    Ok(HttpResponse::Ok().json(customer))
}

// ------------------------------------------------------------------
// Admin
// ------------------------------------------------------------------

pub async fn list_customers(
    _auth: AdminAuth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.customers.list().await?))
}

pub async fn get_customer(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.customers.profile(path.into_inner()).await?))
}
