//! # Settlement Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Settlement Error Categories                         │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Domain      │  │       Protocol          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Core(..)       │  │  PriceDrift             │ │
//! │  │  ConfigLoad     │  │  (unknown item, │  │  PreviewNotFound        │ │
//! │  │                 │  │   underpaid,    │  │                         │ │
//! │  │                 │  │   no change..)  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │    Storage      │  DbError::InsufficientStock is lifted into        │
//! │  │  Db(..)         │  CoreError::InsufficientStock on the way in.      │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use till_core::{CoreError, Money, ValidationError};
use till_db::DbError;

/// Result type alias for settlement operations.
pub type SettleResult<T> = Result<T, SettleError>;

#[derive(Debug, Error)]
pub enum SettleError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// The payable amount moved between preview and commit.
    #[error("Price changed since preview: previewed {previewed}, now {current}")]
    PriceDrift { previewed: Money, current: Money },

    /// No live preview with this id (never issued, already used, or expired).
    #[error("Preview not found: {0}")]
    PreviewNotFound(String),

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// Settlement rule violation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure.
    #[error("Storage error: {0}")]
    Db(DbError),
}

impl From<DbError> for SettleError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InsufficientStock {
                denomination,
                available,
                requested,
            } => SettleError::Core(CoreError::InsufficientStock {
                denomination,
                available,
                requested,
            }),
            DbError::CountOverflow { denomination } => {
                SettleError::Core(CoreError::Validation(ValidationError::OutOfRange {
                    field: format!("count of {denomination} notes"),
                    min: 0,
                    max: u32::MAX as i64,
                }))
            }
            other => SettleError::Db(other),
        }
    }
}

impl From<ValidationError> for SettleError {
    fn from(err: ValidationError) -> Self {
        SettleError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for SettleError {
    fn from(err: std::io::Error) -> Self {
        SettleError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SettleError {
    fn from(err: toml::de::Error) -> Self {
        SettleError::ConfigLoadFailed(err.to_string())
    }
}

impl SettleError {
    /// True when the caller should preview again and retry.
    ///
    /// These are the failures caused by another settlement or a catalog
    /// update landing between preview and commit.
    pub fn requires_new_preview(&self) -> bool {
        matches!(
            self,
            SettleError::PriceDrift { .. }
                | SettleError::PreviewNotFound(_)
                | SettleError::Core(CoreError::InsufficientStock { .. })
                | SettleError::Core(CoreError::ChangeInfeasible { .. })
        )
    }
}
