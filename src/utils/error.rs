use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::services::{BalanceError, CheckoutError, ReservationError};
use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(#[from] StoreError),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InsufficientBalance(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "SOLD_OUT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::ExternalServiceError(msg)
            | AppError::InsufficientBalance(msg)
            | AppError::Timeout(msg)
            | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl From<ReservationError> for AppError {
    fn from(error: ReservationError) -> Self {
        match error {
            ReservationError::Validation(msg) => AppError::ValidationError(msg),
            ReservationError::NotFound(id) => AppError::NotFound(format!("Event with id '{}' was not found", id)),
            ReservationError::SoldOut(_) => AppError::Conflict("Ticket sold out".to_string()),
            ReservationError::Storage(e) => AppError::DatabaseError(e),
            ReservationError::Timeout(after) => {
                AppError::Timeout(format!("Purchase did not complete within {} ms", after.as_millis()))
            }
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::InvalidUserId(raw) => AppError::ValidationError(format!("Invalid user id '{}'", raw)),
            CheckoutError::Remote(e) => AppError::ExternalServiceError(e.to_string()),
            CheckoutError::Timeout(after) => {
                AppError::Timeout(format!("Balance check did not complete within {} ms", after.as_millis()))
            }
            CheckoutError::InsufficientBalance { .. } => {
                AppError::InsufficientBalance("Balance is not enough".to_string())
            }
        }
    }
}

impl From<BalanceError> for AppError {
    fn from(error: BalanceError) -> Self {
        match error {
            BalanceError::UserNotFound(_) => AppError::NotFound("user ID not found".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ExternalServiceError(msg)
            | AppError::InsufficientBalance(msg)
            | AppError::Timeout(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}
