//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Settlement rule violations                     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till-settle errors                                                    │
//! │  └── SettleError      - Coordinator failures (wraps both above)        │
//! │                                                                         │
//! │  till-server errors                                                    │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SettleError → ApiError → Client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::notes::NoteCounts;

// =============================================================================
// Core Error
// =============================================================================

/// Settlement rule violations.
///
/// Every variant is recoverable: the request is rejected and no state is
/// touched.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cart line names a product the catalog does not know.
    ///
    /// Unknown lines are never skipped; the whole settlement fails.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// A cart line has a quantity below 1 or above the per-line maximum.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: i64 },

    /// The till cannot cover a change movement.
    ///
    /// ## When This Occurs
    /// ```text
    /// Preview: change {10:1} against stock {10:1}  ✓
    ///      │
    ///      ▼  (another terminal commits first and takes the 10)
    /// Commit: stock {10:0}
    ///      │
    ///      ▼
    /// InsufficientStock { denomination: 10, available: 0, requested: 1 }
    /// ```
    #[error("Insufficient stock of {denomination} notes: available {available}, requested {requested}")]
    InsufficientStock {
        denomination: u32,
        available: u32,
        requested: u32,
    },

    /// No combination of available notes makes the exact change.
    #[error("Cannot make change of {balance}: {residual} left uncovered")]
    ChangeInfeasible {
        balance: u64,
        residual: u64,
        /// Largest-first partial the till could hand over, for display only.
        best_partial: NoteCounts,
    },

    /// Cash tendered is below the payable amount.
    #[error("Underpaid: payable {payable}, tendered {tendered}")]
    Underpaid { payable: Money, tendered: Money },

    /// The tendered notes do not add up to the cash paid.
    #[error("Tendered notes total {denominations_total}, but cash paid is {cash_paid}")]
    TenderMismatch {
        cash_paid: Money,
        denominations_total: Money,
    },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any pricing runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            denomination: 10,
            available: 0,
            requested: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock of 10 notes: available 0, requested 1"
        );

        let err = CoreError::Underpaid {
            payable: Money::from_major(236),
            tendered: Money::from_major(200),
        };
        assert_eq!(err.to_string(), "Underpaid: payable 236.00, tendered 200.00");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer_email".to_string(),
        };
        assert_eq!(err.to_string(), "customer_email is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
