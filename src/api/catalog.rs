use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::catalog::{CategoryInput, ProductInput};

use super::auth::AdminAuth;
use super::AppState;

// ============================================================================
// Catalog Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
}

pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.categories.list().await?))
}

pub async fn get_category(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.categories.get(path.into_inner()).await?))
}

pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.catalog.list_products(query.category_id).await?))
}

pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.catalog.get_product(path.into_inner()).await?))
}

// ------------------------------------------------------------------
// Admin
// ------------------------------------------------------------------

pub async fn create_category(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    input: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Created().json(state.categories.create(input.into_inner()).await?))
}

pub async fn update_category(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(
        state
            .categories
            .update(path.into_inner(), input.into_inner())
            .await?,
    ))
}

pub async fn delete_category(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.categories.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn create_product(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    input: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Created().json(state.catalog.create_product(input.into_inner()).await?))
}

pub async fn update_product(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(
        state
            .catalog
            .update_product(path.into_inner(), input.into_inner())
            .await?,
    ))
}

pub async fn delete_product(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.catalog.delete_product(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
