use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::delivery::{CreateDeliveryInput, StatusInput, UpdateDeliveryInput};

use super::auth::AdminAuth;
use super::AppState;

// ============================================================================
// Delivery Handlers (admin only)
// ============================================================================

pub async fn list_deliveries(
    _auth: AdminAuth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.deliveries.list().await?))
}

pub async fn create_delivery(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    input: web::Json<CreateDeliveryInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Created().json(state.deliveries.create(input.into_inner()).await?))
}

pub async fn get_delivery(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.deliveries.get(path.into_inner()).await?))
}

pub async fn update_delivery(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<UpdateDeliveryInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(
        state
            .deliveries
            .update(path.into_inner(), input.into_inner())
            .await?,
    ))
}

pub async fn delete_delivery(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.deliveries.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn set_delivery_status(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse, AppError> {
    let (id, name) = path.into_inner();
    Ok(HttpResponse::Ok().json(state.deliveries.change_status_by_name(id, &name).await?))
}

// ------------------------------------------------------------------
// Status Rows
// ------------------------------------------------------------------

pub async fn list_statuses(
    _auth: AdminAuth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.deliveries.list_statuses().await?))
}

pub async fn get_status(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.deliveries.get_status(path.into_inner()).await?))
}

pub async fn create_status(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    input: web::Json<StatusInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Created().json(state.deliveries.create_status(input.into_inner()).await?))
}

pub async fn update_status(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<StatusInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(
        state
            .deliveries
            .update_status(path.into_inner(), input.into_inner())
            .await?,
    ))
}

/// Refused with 409 while a live delivery still references the row.
pub async fn delete_status(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.deliveries.delete_status(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
