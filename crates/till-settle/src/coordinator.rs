//! # Settlement Coordinator
//!
//! Two-phase settlement: a side-effect-free preview, then a commit that
//! re-checks everything against live state.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SettlementRequest ──► Draft                                          │
//! │                           │  preview()                                  │
//! │                           │  (price, total, floor, solve change          │
//! │                           │   against a snapshot; writes nothing)        │
//! │                           ▼                                             │
//! │                       Previewed ─────────────► Abandoned                │
//! │                           │       abandon()    (ledger untouched)        │
//! │                           │  commit()                                   │
//! │                           │  ├── re-price from live catalog             │
//! │                           │  ├── |Δ payable| > tolerance → PriceDrift   │
//! │                           │  ├── re-solve change against live till      │
//! │                           │  └── ledger.try_commit(movement, invoice)   │
//! │                           ▼                                             │
//! │                       Committed (Invoice)                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `commit` and `abandon` take the preview by value. A failed commit has
//! still consumed it; the caller previews again.
//!
//! ## Concurrency
//! Previews run freely in parallel. Commits are serialized through one
//! async mutex, and each ledger applies its movement atomically on top of
//! that. A commit never waits for stock: it succeeds or fails immediately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::SettlementSettings;
use crate::error::{SettleError, SettleResult};
use crate::ledger::{Catalog, StockLedger};
use till_core::change::make_change;
use till_core::pricing::{aggregate_totals, settle_line};
use till_core::validation::{
    validate_cart_size, validate_cash_paid, validate_email, validate_product_id, validate_tender,
};
use till_core::{
    CartLine, CoreError, Invoice, InvoiceTotals, Money, NoteCounts, SettledLine, SettlementStatus,
    StockMovement,
};

// =============================================================================
// Request / Preview
// =============================================================================

/// What the cashier submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub customer_email: String,
    pub items: Vec<CartLine>,
    /// Cash handed over, in whole currency units.
    pub cash_paid: i64,
    /// The notes making up `cash_paid`. Empty when not tracked.
    #[serde(default)]
    pub cash_denominations: NoteCounts,
}

/// A priced settlement with its change plan, not yet committed.
///
/// Only [`SettlementCoordinator::preview`] creates one, and there is no
/// `Clone`: each preview is committed or abandoned at most once.
#[derive(Debug)]
pub struct SettlementPreview {
    id: String,
    created_at: DateTime<Utc>,
    request: SettlementRequest,
    items: Vec<SettledLine>,
    totals: InvoiceTotals,
    balance_payable: Money,
    change_denominations: NoteCounts,
    available_stocks: NoteCounts,
    status: SettlementStatus,
}

impl SettlementPreview {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn request(&self) -> &SettlementRequest {
        &self.request
    }

    pub fn items(&self) -> &[SettledLine] {
        &self.items
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn cash_paid(&self) -> Money {
        Money::from_major(self.request.cash_paid)
    }

    /// Change owed to the customer.
    pub fn balance_payable(&self) -> Money {
        self.balance_payable
    }

    pub fn change_denominations(&self) -> &NoteCounts {
        &self.change_denominations
    }

    /// The till after the tender comes in, before change goes out.
    pub fn available_stocks(&self) -> &NoteCounts {
        &self.available_stocks
    }

    pub fn status(&self) -> SettlementStatus {
        self.status
    }
}

/// The priced outcome shared by preview and commit.
struct Quote {
    items: Vec<SettledLine>,
    totals: InvoiceTotals,
    balance_payable: Money,
    change: NoteCounts,
    available: NoteCounts,
}

// =============================================================================
// Coordinator
// =============================================================================

/// Runs the preview → commit protocol over a [`Catalog`] and a [`StockLedger`].
pub struct SettlementCoordinator {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn StockLedger>,
    commit_lock: Mutex<()>,
    price_drift_tolerance: Money,
    max_cart_items: usize,
}

impl SettlementCoordinator {
    /// Creates a coordinator with zero drift tolerance and the default cart
    /// limit.
    pub fn new(catalog: Arc<dyn Catalog>, ledger: Arc<dyn StockLedger>) -> Self {
        SettlementCoordinator {
            catalog,
            ledger,
            commit_lock: Mutex::new(()),
            price_drift_tolerance: Money::zero(),
            max_cart_items: till_core::MAX_CART_ITEMS,
        }
    }

    pub fn from_settings(
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn StockLedger>,
        settings: &SettlementSettings,
    ) -> Self {
        Self::new(catalog, ledger)
            .with_price_drift_tolerance(Money::from_minor(settings.price_drift_tolerance_minor))
            .with_max_cart_items(settings.max_cart_items)
    }

    /// How far the payable amount may move between preview and commit.
    pub fn with_price_drift_tolerance(mut self, tolerance: Money) -> Self {
        self.price_drift_tolerance = tolerance.abs();
        self
    }

    pub fn with_max_cart_items(mut self, max: usize) -> Self {
        self.max_cart_items = max;
        self
    }

    pub fn ledger(&self) -> &Arc<dyn StockLedger> {
        &self.ledger
    }

    // =========================================================================
    // Preview
    // =========================================================================

    /// Prices the request and solves change against a stock snapshot.
    ///
    /// Writes nothing. Two previews of the same request against the same
    /// catalog and stock differ only in `id` and `created_at`.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn preview(&self, request: SettlementRequest) -> SettleResult<SettlementPreview> {
        self.validate(&request)?;

        let stock = self.ledger.snapshot().await?;
        let quote = self.quote(&request, stock).await?;

        let preview = SettlementPreview {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            request,
            items: quote.items,
            totals: quote.totals,
            balance_payable: quote.balance_payable,
            change_denominations: quote.change,
            available_stocks: quote.available,
            status: SettlementStatus::Previewed,
        };

        debug!(
            preview_id = %preview.id,
            payable = %preview.totals.rounded_net_price,
            change = %preview.balance_payable,
            "Settlement previewed"
        );
        Ok(preview)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Commits a preview against live state.
    ///
    /// ## Errors
    /// - `PriceDrift` if the payable amount moved beyond the tolerance
    /// - `ChangeInfeasible` / `InsufficientStock` if the till changed
    /// - `UnknownProduct` if a product left the catalog
    ///
    /// On any error the till and invoice store are unchanged, and the
    /// preview is spent.
    #[instrument(skip(self, preview), fields(preview_id = %preview.id))]
    pub async fn commit(&self, preview: SettlementPreview) -> SettleResult<Invoice> {
        let _guard = self.commit_lock.lock().await;

        let stock = self.ledger.snapshot().await?;
        let (items, totals) = self.price(&preview.request.items).await?;

        let previewed = preview.totals.rounded_net_price;
        let current = totals.rounded_net_price;
        if (current - previewed).abs() > self.price_drift_tolerance {
            info!(%previewed, %current, "Price drift since preview");
            return Err(SettleError::PriceDrift { previewed, current });
        }

        let quote = self.solve(&preview.request, items, totals, stock)?;

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            customer_email: preview.request.customer_email.trim().to_string(),
            created_at: Utc::now(),
            items: quote.items,
            totals: quote.totals,
            cash_paid: Money::from_major(preview.request.cash_paid),
            denominations_tendered: preview.request.cash_denominations.without_zeros(),
            balance_payable: quote.balance_payable,
            change_breakdown: quote.change,
            status: SettlementStatus::Committed,
        };
        let movement = StockMovement::new(
            invoice.denominations_tendered.clone(),
            invoice.change_breakdown.clone(),
        );

        self.ledger.try_commit(&movement, &invoice).await?;

        info!(
            invoice_id = %invoice.id,
            payable = %invoice.totals.rounded_net_price,
            change = %invoice.balance_payable,
            notes_out = invoice.change_breakdown.note_count(),
            "Invoice committed"
        );
        Ok(invoice)
    }

    // =========================================================================
    // Abandon
    // =========================================================================

    /// Drops a preview. The ledger is not touched.
    pub fn abandon(&self, preview: SettlementPreview) -> SettlementStatus {
        debug!(preview_id = %preview.id, "Preview abandoned");
        SettlementStatus::Abandoned
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn validate(&self, request: &SettlementRequest) -> SettleResult<()> {
        validate_email(&request.customer_email)?;

        if request.items.len() > self.max_cart_items {
            return Err(CoreError::CartTooLarge {
                max: self.max_cart_items,
            }
            .into());
        }
        validate_cart_size(request.items.len(), self.max_cart_items)?;

        for line in &request.items {
            validate_product_id(&line.product_id)?;
        }

        validate_cash_paid(request.cash_paid)?;
        validate_tender(&request.cash_denominations)?;

        let tendered = &request.cash_denominations;
        if !tendered.is_empty() && tendered.total_money() != Money::from_major(request.cash_paid) {
            return Err(CoreError::TenderMismatch {
                cash_paid: Money::from_major(request.cash_paid),
                denominations_total: tendered.total_money(),
            }
            .into());
        }

        Ok(())
    }

    async fn quote(&self, request: &SettlementRequest, stock: NoteCounts) -> SettleResult<Quote> {
        let (items, totals) = self.price(&request.items).await?;
        self.solve(request, items, totals, stock)
    }

    /// Prices every line against the live catalog. One unknown product fails
    /// the whole cart.
    async fn price(&self, lines: &[CartLine]) -> SettleResult<(Vec<SettledLine>, InvoiceTotals)> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let entry = self
                .catalog
                .get_catalog_entry(&line.product_id)
                .await?
                .ok_or_else(|| CoreError::UnknownProduct(line.product_id.clone()))?;
            items.push(settle_line(line, &entry)?);
        }

        let totals = aggregate_totals(&items);
        Ok((items, totals))
    }

    fn solve(
        &self,
        request: &SettlementRequest,
        items: Vec<SettledLine>,
        totals: InvoiceTotals,
        stock: NoteCounts,
    ) -> SettleResult<Quote> {
        let tendered = Money::from_major(request.cash_paid);
        let balance = tendered - totals.rounded_net_price;
        if balance.is_negative() {
            return Err(CoreError::Underpaid {
                payable: totals.rounded_net_price,
                tendered,
            }
            .into());
        }

        let mut available = stock;
        available.merge(&request.cash_denominations)?;

        // rounded_net_price is whole units, so the balance is too
        let target = balance.major() as u64;
        let plan = make_change(target, &available);
        if !plan.fully_satisfied {
            return Err(CoreError::ChangeInfeasible {
                balance: plan.balance_payable,
                residual: plan.residual,
                best_partial: plan.best_partial,
            }
            .into());
        }

        Ok(Quote {
            items,
            totals,
            balance_payable: balance,
            change: plan.breakdown,
            available,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MemoryCatalog, MemoryLedger};
    use till_core::{CatalogEntry, TaxRate};

    fn notes(pairs: &[(u32, u32)]) -> NoteCounts {
        NoteCounts::from_pairs(pairs.iter().copied()).unwrap()
    }

    fn coordinator(stock: &[(u32, u32)]) -> SettlementCoordinator {
        let catalog = MemoryCatalog::new([CatalogEntry {
            product_id: "P1".into(),
            name: "Notebook".into(),
            unit_price: Money::from_major(100),
            tax_rate: TaxRate::from_whole_percent(18),
        }]);
        SettlementCoordinator::new(Arc::new(catalog), Arc::new(MemoryLedger::new(notes(stock))))
    }

    fn request(cash_paid: i64, tender: &[(u32, u32)]) -> SettlementRequest {
        SettlementRequest {
            customer_email: "buyer@example.com".into(),
            items: vec![CartLine::new("P1", 2)],
            cash_paid,
            cash_denominations: notes(tender),
        }
    }

    #[tokio::test]
    async fn test_tender_mismatch() {
        let coordinator = coordinator(&[]);
        let err = coordinator
            .preview(request(250, &[(100, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, SettleError::Core(CoreError::TenderMismatch { .. })));
    }

    #[tokio::test]
    async fn test_exact_tender_needs_no_change() {
        let coordinator = coordinator(&[]);
        let preview = coordinator.preview(request(236, &[])).await.unwrap();

        assert!(preview.balance_payable().is_zero());
        assert!(preview.change_denominations().is_empty());
    }

    #[tokio::test]
    async fn test_cart_limit() {
        let coordinator = coordinator(&[]).with_max_cart_items(1);
        let mut req = request(500, &[]);
        req.items.push(CartLine::new("P1", 1));

        let err = coordinator.preview(req).await.unwrap_err();
        assert!(matches!(err, SettleError::Core(CoreError::CartTooLarge { max: 1 })));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let coordinator = coordinator(&[]);
        let mut req = request(0, &[]);
        req.items.clear();

        let err = coordinator.preview(req).await.unwrap_err();
        assert!(matches!(err, SettleError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_tendered_notes_count_as_change() {
        // Till is empty; one of the customer's own 20s comes back as change.
        let coordinator = coordinator(&[]);
        let preview = coordinator
            .preview(request(256, &[(100, 2), (20, 2), (10, 1), (5, 1), (1, 1)]))
            .await
            .unwrap();

        assert_eq!(preview.balance_payable(), Money::from_major(20));
        assert_eq!(preview.change_denominations(), &notes(&[(20, 1)]));
        assert_eq!(preview.available_stocks().count(till_core::Denomination::Twenty), 2);
    }

    #[tokio::test]
    async fn test_oversized_tender_rejected() {
        let coordinator = coordinator(&[(1, 1)]);
        let max = u32::MAX as i64;

        let err = coordinator
            .preview(request(max, &[(1, u32::MAX)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SettleError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_tender_overflowing_till_rejected() {
        // A till restocked to the brim cannot take more 1-notes in.
        let coordinator = coordinator(&[(1, u32::MAX - 100)]);
        let tender = [(100, 2), (1, 150)];

        let err = coordinator.preview(request(350, &tender)).await.unwrap_err();
        assert!(matches!(err, SettleError::Core(CoreError::Validation(_))));
        assert_eq!(
            coordinator.ledger().snapshot().await.unwrap().count(till_core::Denomination::One),
            u32::MAX - 100
        );
    }

    #[tokio::test]
    async fn test_abandon_returns_abandoned() {
        let coordinator = coordinator(&[(10, 1), (2, 10)]);
        let preview = coordinator
            .preview(request(250, &[(100, 2), (50, 1)]))
            .await
            .unwrap();

        assert_eq!(preview.status(), SettlementStatus::Previewed);
        assert_eq!(coordinator.abandon(preview), SettlementStatus::Abandoned);
    }
}
