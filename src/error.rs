use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::domain::order::{OrderError, OrderStatus};
use crate::repository::RepoError;

// ============================================================================
// Application Error Taxonomy
// ============================================================================
//
// One enum covers the whole request path: validation failures (400), auth
// failures (401/403), missing rows (404), business-rule conflicts such as
// illegal status transitions or deleting a referenced status row (409), and
// storage faults (500). There is no retry layer; every operation fully
// succeeds or fully fails within its request.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("insufficient role")]
    Forbidden,

    #[error("{kind} not found")]
    NotFound { kind: &'static str },

    #[error("cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("{0}")]
    Conflict(String),

    #[error("storage error")]
    Database(#[from] RepoError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &'static str) -> Self {
        AppError::NotFound { kind }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { from, to } => AppError::InvalidTransition { from, to },
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_rest_conventions() {
        assert_eq!(
            AppError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::not_found("order").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Delivered,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Conflict("referenced".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn order_transition_errors_become_conflicts() {
        let err: AppError = OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing,
        }
        .into();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let err: AppError = OrderError::EmptyItems.into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
