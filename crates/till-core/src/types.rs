//! # Domain Types
//!
//! Core domain types for settling an invoice.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogEntry   │   │    CartLine     │   │   SettledLine   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │──►│  product_id     │──►│  subtotal       │       │
//! │  │  unit_price     │   │  quantity       │   │  tax_payable    │       │
//! │  │  tax_rate       │   └─────────────────┘   │  total_price    │       │
//! │  └─────────────────┘                         └────────┬────────┘       │
//! │                                                       │                 │
//! │                                              ┌────────▼────────┐       │
//! │  ┌─────────────────┐                         │  InvoiceTotals  │       │
//! │  │    Invoice      │◄────────────────────────│  net_price      │       │
//! │  │  (committed)    │                         │  rounded / rem  │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;
use crate::notes::NoteCounts;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so a percentage with two fractional
/// digits (`12.50%`) is an exact integer (`1250`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a rate from a whole percentage (`18` → 18%).
    #[inline]
    pub const fn from_whole_percent(pct: u32) -> Self {
        TaxRate(pct * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Renders as `18.00%`.
impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Catalog Entry
// =============================================================================

/// A priced, taxed product as seen by the settlement engine.
///
/// Owned by the catalog; the engine reads one immutable snapshot per
/// lookup and never writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Business key, unique in the catalog.
    pub product_id: String,

    /// Display name, frozen onto the settled line.
    pub name: String,

    /// Price per unit (≥ 0).
    pub unit_price: Money,

    /// Tax rate, 0% to 100%.
    pub tax_rate: TaxRate,
}

// =============================================================================
// Cart Line
// =============================================================================

/// One requested line: a product and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

// =============================================================================
// Settled Line
// =============================================================================

/// A priced and taxed cart line.
///
/// Uses the snapshot pattern: name, price, and rate are copied from the
/// catalog entry at settlement time.
///
/// ## Invariant
/// `total_price == subtotal + tax_payable`, exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// `unit_price × quantity`.
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    /// Tax on `subtotal`, never compounded.
    pub tax_payable: Money,
    /// `subtotal + tax_payable`.
    pub total_price: Money,
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Invoice-level sums plus the rounding outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub total_without_tax: Money,
    pub total_tax: Money,
    /// `total_without_tax + total_tax`.
    pub net_price: Money,
    /// `net_price` floored to a whole currency unit; what the customer pays.
    pub rounded_net_price: Money,
    /// `net_price - rounded_net_price`, in `[0, 1)`. Kept for reconciliation,
    /// never charged or refunded.
    pub rounding_remainder: Money,
}

// =============================================================================
// Settlement Status
// =============================================================================

/// Where a settlement is in the two-phase flow.
///
/// ```text
/// Draft ──preview──► Previewed ──commit──► Committed
///                        │
///                        └──abandon──► Abandoned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Request received, not yet priced.
    Draft,
    /// Priced and change planned against a snapshot; nothing persisted.
    Previewed,
    /// Stock movement and invoice durably written.
    Committed,
    /// Customer cancelled after preview; no side effects.
    Abandoned,
}

impl SettlementStatus {
    /// True for `Committed` and `Abandoned`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SettlementStatus::Committed | SettlementStatus::Abandoned)
    }
}

impl Default for SettlementStatus {
    fn default() -> Self {
        SettlementStatus::Draft
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A committed settlement.
///
/// Created only by a successful commit and never edited afterwards;
/// corrections are new invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// UUID v4.
    pub id: String,
    pub customer_email: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SettledLine>,
    pub totals: InvoiceTotals,
    /// Cash handed over by the customer.
    pub cash_paid: Money,
    /// The notes that made up `cash_paid` (empty when not tracked).
    pub denominations_tendered: NoteCounts,
    /// `cash_paid - rounded_net_price`; change owed to the customer.
    pub balance_payable: Money,
    /// Notes handed back; sums exactly to `balance_payable`.
    pub change_breakdown: NoteCounts,
    pub status: SettlementStatus,
}

// =============================================================================
// Unit Tests
// =============================================================================
