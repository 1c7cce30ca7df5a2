//! # till-settle: Settlement Coordinator
//!
//! Drives a cart from preview to committed invoice over two seams: a
//! [`Catalog`] for prices and a [`StockLedger`] for notes.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SettlementRequest                                                     │
//! │       │                                                                 │
//! │       ▼  preview()         catalog lookups + ledger snapshot            │
//! │  SettlementPreview ──────► PreviewBook (server side, by preview_id)     │
//! │       │                                                                 │
//! │       ▼  commit()          commit lock → re-price → re-solve change     │
//! │  StockLedger::try_commit   movement + invoice in one atomic step        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │    Invoice                                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use till_settle::{SettleConfig, SettlementCoordinator};
//! use till_db::Database;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SettleConfig::load(None)?;
//! let db = Arc::new(Database::new(config.db_config()).await?);
//! let coordinator = SettlementCoordinator::from_settings(db.clone(), db, &config.settlement);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod dto;
pub mod error;
pub mod ledger;
pub mod previews;

pub use config::SettleConfig;
pub use coordinator::{SettlementCoordinator, SettlementPreview, SettlementRequest};
pub use error::{SettleError, SettleResult};
pub use ledger::{Catalog, MemoryCatalog, MemoryLedger, StockLedger};
pub use previews::PreviewBook;
