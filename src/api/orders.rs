use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::order::OrderStatus;
use crate::error::AppError;
use crate::services::order::{CreateOrderInput, OrderItemInput};

use super::auth::{AdminAuth, Auth};
use super::AppState;

// ============================================================================
// Order Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_address: String,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

// ------------------------------------------------------------------
// Customer
// ------------------------------------------------------------------

pub async fn create_order(
    auth: Auth,
    state: web::Data<AppState>,
    input: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();
    let order = state
        .orders
        .create_order(CreateOrderInput {
            customer_id: auth.customer_id()?,
            shipping_address: input.shipping_address,
            items: input.items,
        })
        .await?;
    Ok(HttpResponse::Created().json(order))
}

pub async fn list_own_orders(
    auth: Auth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let orders = state.orders.list_by_customer(auth.customer_id()?).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// An order belonging to someone else is indistinguishable from a missing
/// one; admins see everything.
pub async fn get_order(
    auth: Auth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let details = state.orders.get_details(path.into_inner()).await?;
    if !auth.is_admin() && Some(details.order.customer_id) != auth.0.customer_id {
        return Err(AppError::not_found("order"));
    }
    Ok(HttpResponse::Ok().json(details))
}

pub async fn cancel_own_order(
    auth: Auth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = state
        .orders
        .cancel_own(auth.customer_id()?, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

// ------------------------------------------------------------------
// Admin
// ------------------------------------------------------------------

pub async fn search_orders(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    query: web::Query<OrderListQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let page = state
        .orders
        .search(
            query.status.as_deref(),
            query.keyword,
            query.page,
            query.page_size,
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_order_admin(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.orders.get_details(path.into_inner()).await?))
}

pub async fn confirm_order(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = state
        .orders
        .change_status(path.into_inner(), OrderStatus::Confirmed)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn mark_processing(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.orders.mark_processing(path.into_inner()).await?))
}

pub async fn mark_shipped(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = state
        .orders
        .change_status(path.into_inner(), OrderStatus::Shipped)
        .await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn mark_delivered(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.orders.mark_delivered(path.into_inner()).await?))
}

pub async fn mark_returned(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.orders.mark_returned(path.into_inner()).await?))
}

pub async fn cancel_order(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.orders.cancel(path.into_inner()).await?))
}

pub async fn set_order_status(
    _auth: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse, AppError> {
    let (id, name) = path.into_inner();
    Ok(HttpResponse::Ok().json(state.orders.change_status_by_name(id, &name).await?))
}
