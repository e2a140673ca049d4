use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    RoleForbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Phone number already in use")]
    DuplicatePhone,

    #[error("Login already in use")]
    DuplicateLogin,

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Insufficient reservation: {0}")]
    InsufficientReservation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_failure",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::InvalidDateRange(_) => "invalid_date_range",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::RoleForbidden(_) => "role_forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::DuplicatePhone => "duplicate_phone",
            AppError::DuplicateLogin => "duplicate_login",
            AppError::CapacityExceeded(_) => "capacity_exceeded",
            AppError::InsufficientReservation(_) => "insufficient_reservation",
            AppError::Database(_) | AppError::Internal(_) => "internal",
            AppError::Jwt(_) => "unauthorized",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match &self {
            AppError::Validation(msg)
            | AppError::InvalidAmount(msg)
            | AppError::InvalidDateRange(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::RoleForbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::DuplicatePhone | AppError::DuplicateLogin => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::CapacityExceeded(msg) | AppError::InsufficientReservation(msg) => {
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({ "error": message, "kind": kind });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn accounting_violations_map_to_conflict() {
        assert_eq!(
            status_of(AppError::CapacityExceeded("requested 5, available 2".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::InsufficientReservation("requested 4, held 3".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(AppError::DuplicatePhone), StatusCode::CONFLICT);
        assert_eq!(status_of(AppError::DuplicateLogin), StatusCode::CONFLICT);
    }

    #[test]
    fn caller_input_errors_map_to_bad_request() {
        assert_eq!(
            status_of(AppError::InvalidAmount("amount must be positive".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::InvalidDateRange("endDate is required".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Validation("members required".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        assert_eq!(
            status_of(AppError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::RoleForbidden("agents may not sign in".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn internal_errors_hide_detail() {
        let resp = AppError::Internal("pool exhausted".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
