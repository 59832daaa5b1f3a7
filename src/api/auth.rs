use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::domain::customer::Role;
use crate::error::AppError;
use crate::services::auth::{Claims, LoginInput, RegisterInput};

use super::AppState;

// ============================================================================
// Route Guards
// ============================================================================
//
// `Auth` verifies the bearer token; `AdminAuth` additionally requires the
// Admin role. Handlers declare the guard they need as an extractor argument.
//
// ============================================================================

pub struct Auth(pub Claims);

pub struct AdminAuth(pub Claims);

impl Auth {
    /// The customer scope of the caller. Admin tokens without a customer
    /// record cannot act as a customer.
    pub fn customer_id(&self) -> Result<Uuid, AppError> {
        self.0.customer_id.ok_or(AppError::Forbidden)
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }
}

fn claims_from(req: &HttpRequest) -> Result<Claims, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not configured".into()))?;
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;
    state.auth.keys().verify(token)
}

impl actix_web::FromRequest for Auth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from(req).map(Auth))
    }
}

impl actix_web::FromRequest for AdminAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from(req).and_then(|claims| {
            if claims.role == Role::Admin {
                Ok(AdminAuth(claims))
            } else {
                Err(AppError::Forbidden)
            }
        }))
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn register(
    state: web::Data<AppState>,
    input: web::Json<RegisterInput>,
) -> Result<HttpResponse, AppError> {
    let token = state.auth.register(input.into_inner()).await?;
    Ok(HttpResponse::Created().json(token))
}

pub async fn login(
    state: web::Data<AppState>,
    input: web::Json<LoginInput>,
) -> Result<HttpResponse, AppError> {
    let token = state.auth.login(input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(token))
}
