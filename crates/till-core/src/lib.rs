//! # till-core: Pure Settlement Logic
//!
//! Everything needed to turn a cart and a cash tender into a settled
//! invoice, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    till-server (axum)                           │   │
//! │  │    POST /invoices/preview ──► POST /invoices ──► GET /invoices  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               till-settle (SettlementCoordinator)               │   │
//! │  │          preview / commit / abandon, Catalog + StockLedger       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐           │   │
//! │  │   │  money  │  │ pricing │  │ change  │  │  stock  │           │   │
//! │  │   │  notes  │  │ totals  │  │  maker  │  │movement │           │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └─────────┘           │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (SQLite)                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`notes`] - Note denominations and per-denomination counts
//! - [`types`] - Domain types (CatalogEntry, SettledLine, Invoice, ...)
//! - [`pricing`] - Line pricing, totals, rounding policy
//! - [`change`] - Bounded change-making
//! - [`stock`] - Note movements against the till
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{change::make_change, pricing::{aggregate_totals, settle_line}};
//! use till_core::{CartLine, CatalogEntry, Money, NoteCounts, TaxRate};
//!
//! let entry = CatalogEntry {
//!     product_id: "P1".into(),
//!     name: "Notebook".into(),
//!     unit_price: Money::from_major(100),
//!     tax_rate: TaxRate::from_whole_percent(18),
//! };
//! let line = settle_line(&CartLine::new("P1", 2), &entry).unwrap();
//! let totals = aggregate_totals(&[line]);
//! assert_eq!(totals.rounded_net_price, Money::from_major(236));
//!
//! let stock = NoteCounts::from_pairs([(10, 1), (5, 1), (2, 10), (1, 10)]).unwrap();
//! let plan = make_change(250 - 236, &stock);
//! assert_eq!(plan.breakdown.total_value(), 14);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod change;
pub mod error;
pub mod money;
pub mod notes;
pub mod pricing;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use change::ChangePlan;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use notes::{Denomination, NoteCounts};
pub use stock::StockMovement;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum lines in a single cart.
///
/// The coordinator takes its limit from configuration; this is the default.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// Catches a mistyped 1000 for 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum notes of one denomination in a single tender.
pub const MAX_TENDER_NOTES: u32 = 10_000;
