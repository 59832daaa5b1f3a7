use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::basket::BasketDetails;
use crate::error::AppError;

use super::auth::Auth;
use super::AppState;

// ============================================================================
// Basket Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: Decimal,
}

/// Optional decrement; absent means the whole line goes.
#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub quantity: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct BasketResponse {
    #[serde(flatten)]
    details: BasketDetails,
    total_amount: Decimal,
}

fn respond(details: BasketDetails) -> HttpResponse {
    let total_amount = details.total_amount();
    HttpResponse::Ok().json(BasketResponse {
        details,
        total_amount,
    })
}

pub async fn get_basket(auth: Auth, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let details = state.baskets.get_basket(auth.customer_id()?).await?;
    Ok(respond(details))
}

pub async fn add_item(
    auth: Auth,
    state: web::Data<AppState>,
    input: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let details = state
        .baskets
        .add_item(auth.customer_id()?, input.product_id, input.quantity)
        .await?;
    Ok(respond(details))
}

pub async fn update_item(
    auth: Auth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<QuantityRequest>,
) -> Result<HttpResponse, AppError> {
    let details = state
        .baskets
        .update_item(auth.customer_id()?, path.into_inner(), input.quantity)
        .await?;
    Ok(respond(details))
}

pub async fn remove_item(
    auth: Auth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<RemoveQuery>,
) -> Result<HttpResponse, AppError> {
    let customer_id = auth.customer_id()?;
    let product_id = path.into_inner();
    let details = match query.quantity {
        Some(quantity) => {
            state
                .baskets
                .remove_item(customer_id, product_id, quantity)
                .await?
        }
        None => state.baskets.remove_line(customer_id, product_id).await?,
    };
    Ok(respond(details))
}

pub async fn clear_basket(
    auth: Auth,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let details = state.baskets.clear(auth.customer_id()?).await?;
    Ok(respond(details))
}
