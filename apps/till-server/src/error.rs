//! # API Error Type
//!
//! What HTTP clients see when a request fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Handler ── Result<_, ApiError>                                        │
//! │     │                                                                   │
//! │     ├── ValidationError ──► CoreError ──► SettleError ──┐              │
//! │     ├── DbError ────────────────────────► SettleError ──┤              │
//! │     │                                                   ▼              │
//! │     └─────────────────────────────────────────────► ApiError           │
//! │                                                         │              │
//! │                                         status code + {code, message}  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```json
//! {
//!   "code": "CHANGE_INFEASIBLE",
//!   "message": "Cannot make change of 3: 3 left uncovered",
//!   "details": { "balance": 3, "residual": 3, "best_partial": { "2": 1 } }
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use till_core::{CoreError, ValidationError};
use till_db::DbError;
use till_settle::SettleError;

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// A cart line names an unknown product (422)
    UnknownProduct,

    /// Cash paid below the payable amount (422)
    Underpaid,

    /// Tendered notes do not add up to cash paid (400)
    TenderMismatch,

    /// The till cannot cover a movement (409)
    InsufficientStock,

    /// No note combination makes the change (409)
    ChangeInfeasible,

    /// Payable amount moved since the preview (409)
    PriceDrift,

    /// Preview id unknown, spent, or expired (404)
    PreviewNotFound,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound | ErrorCode::PreviewNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::TenderMismatch => StatusCode::BAD_REQUEST,
            ErrorCode::UnknownProduct | ErrorCode::Underpaid => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InsufficientStock | ErrorCode::ChangeInfeasible | ErrorCode::PriceDrift => {
                StatusCode::CONFLICT
            }
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::validation(format!(
                "{} '{}' already exists",
                field, value
            )),
            DbError::InsufficientStock {
                denomination,
                available,
                requested,
            } => CoreError::InsufficientStock {
                denomination,
                available,
                requested,
            }
            .into(),
            DbError::CountOverflow { denomination } => ApiError::validation(format!(
                "count of {} notes would exceed {}",
                denomination,
                u32::MAX
            )),
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::UnknownProduct(id) => ApiError::new(ErrorCode::UnknownProduct, message)
                .with_details(json!({ "product_id": id })),
            CoreError::InvalidQuantity { .. } | CoreError::CartTooLarge { .. } => {
                ApiError::validation(message)
            }
            CoreError::InsufficientStock {
                denomination,
                available,
                requested,
            } => ApiError::new(ErrorCode::InsufficientStock, message).with_details(json!({
                "denomination": denomination,
                "available": available,
                "requested": requested,
            })),
            CoreError::ChangeInfeasible {
                balance,
                residual,
                best_partial,
            } => ApiError::new(ErrorCode::ChangeInfeasible, message).with_details(json!({
                "balance": balance,
                "residual": residual,
                "best_partial": best_partial,
            })),
            CoreError::Underpaid { payable, tendered } => ApiError::new(ErrorCode::Underpaid, message)
                .with_details(json!({ "payable": payable, "tendered": tendered })),
            CoreError::TenderMismatch { .. } => ApiError::new(ErrorCode::TenderMismatch, message),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts coordinator errors to API errors.
impl From<SettleError> for ApiError {
    fn from(err: SettleError) -> Self {
        let message = err.to_string();
        match err {
            SettleError::Core(e) => e.into(),
            SettleError::Db(e) => e.into(),
            SettleError::PriceDrift { previewed, current } => {
                ApiError::new(ErrorCode::PriceDrift, message)
                    .with_details(json!({ "previewed": previewed, "current": current }))
            }
            SettleError::PreviewNotFound(_) => ApiError::new(ErrorCode::PreviewNotFound, message),
            SettleError::InvalidConfig(_) | SettleError::ConfigLoadFailed(_) => {
                tracing::error!(error = %message, "Configuration error while serving");
                ApiError::internal("Server misconfigured")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Startup Errors
// =============================================================================

/// Failures that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] SettleError),

    #[error("database: {0}")]
    Database(#[from] DbError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{Money, NoteCounts};

    #[test]
    fn test_error_codes_serialize_screaming() {
        let err = ApiError::new(ErrorCode::ChangeInfeasible, "no change");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CHANGE_INFEASIBLE");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_change_infeasible_carries_details() {
        let err: ApiError = SettleError::Core(CoreError::ChangeInfeasible {
            balance: 3,
            residual: 3,
            best_partial: NoteCounts::from_pairs([(2, 1)]).unwrap(),
        })
        .into();

        assert_eq!(err.code.status(), StatusCode::CONFLICT);
        let details = err.details.unwrap();
        assert_eq!(details["residual"], 3);
        assert_eq!(details["best_partial"]["2"], 1);
    }

    #[test]
    fn test_db_insufficient_stock_maps_to_conflict() {
        let err: ApiError = DbError::InsufficientStock {
            denomination: 10,
            available: 0,
            requested: 1,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_price_drift_and_underpaid() {
        let err: ApiError = SettleError::PriceDrift {
            previewed: Money::from_major(236),
            current: Money::from_major(238),
        }
        .into();
        assert_eq!(err.code, ErrorCode::PriceDrift);
        assert_eq!(err.details.unwrap()["current"], 23800);

        let err: ApiError = CoreError::Underpaid {
            payable: Money::from_major(236),
            tendered: Money::from_major(200),
        }
        .into();
        assert_eq!(err.code.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
