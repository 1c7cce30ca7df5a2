//! # Catalog and Stock Ledger
//!
//! The two seams the coordinator talks through.
//!
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────────────┐
//! │  SettlementCoordinator   │───────►│  Catalog                          │
//! │                          │        │  get_catalog_entry(product_id)    │
//! │                          │        └──────────────────────────────────┘
//! │                          │        ┌──────────────────────────────────┐
//! │                          │───────►│  StockLedger                      │
//! │                          │        │  snapshot / try_commit / restock  │
//! └──────────────────────────┘        └──────────────────────────────────┘
//!                                         │                  │
//!                              till_db::Database      MemoryLedger
//!                              (one transaction)      (one mutex)
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::SettleResult;
use till_core::{CatalogEntry, Denomination, Invoice, NoteCounts, StockMovement};
use till_db::{Database, DbError};

// =============================================================================
// Traits
// =============================================================================

/// Product lookup, called for every cart line at preview and again at commit.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_catalog_entry(&self, product_id: &str) -> SettleResult<Option<CatalogEntry>>;
}

/// Note stock held by the till, plus the invoices committed against it.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Read-only copy of current counts. Reserves nothing.
    async fn snapshot(&self) -> SettleResult<NoteCounts>;

    /// Applies `movement` and records `invoice`, both or neither.
    ///
    /// Fails with `InsufficientStock` when an outgoing count exceeds what
    /// the till holds once the incoming notes are in.
    async fn try_commit(&self, movement: &StockMovement, invoice: &Invoice) -> SettleResult<()>;

    /// Sets the count of one denomination.
    async fn restock(&self, denomination: Denomination, count: u32) -> SettleResult<()>;

    async fn find_invoice(&self, id: &str) -> SettleResult<Option<Invoice>>;
}

// =============================================================================
// SQLite
// =============================================================================

#[async_trait]
impl Catalog for Database {
    async fn get_catalog_entry(&self, product_id: &str) -> SettleResult<Option<CatalogEntry>> {
        Ok(self.catalog().get(product_id).await?)
    }
}

#[async_trait]
impl StockLedger for Database {
    async fn snapshot(&self) -> SettleResult<NoteCounts> {
        Ok(self.denominations().snapshot().await?)
    }

    async fn try_commit(&self, movement: &StockMovement, invoice: &Invoice) -> SettleResult<()> {
        Ok(self.invoices().commit_settlement(invoice, movement).await?)
    }

    async fn restock(&self, denomination: Denomination, count: u32) -> SettleResult<()> {
        Ok(self.denominations().restock(denomination, count).await?)
    }

    async fn find_invoice(&self, id: &str) -> SettleResult<Option<Invoice>> {
        Ok(self.invoices().get_by_id(id).await?)
    }
}

// =============================================================================
// In-Memory
// =============================================================================

/// Catalog held in a map. For tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<HashMap<String, CatalogEntry>>,
}

impl MemoryCatalog {
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        MemoryCatalog {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|e| (e.product_id.clone(), e))
                    .collect(),
            ),
        }
    }

    /// Inserts or replaces an entry.
    pub async fn upsert(&self, entry: CatalogEntry) {
        self.entries
            .write()
            .await
            .insert(entry.product_id.clone(), entry);
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get_catalog_entry(&self, product_id: &str) -> SettleResult<Option<CatalogEntry>> {
        Ok(self.entries.read().await.get(product_id).cloned())
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    stock: NoteCounts,
    invoices: HashMap<String, Invoice>,
}

/// Ledger held in memory behind one mutex. For tests and embedding.
#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new(stock: NoteCounts) -> Self {
        let mut till = NoteCounts::empty_till();
        for (denomination, count) in stock.iter() {
            till.set(denomination, count);
        }
        MemoryLedger {
            state: Mutex::new(LedgerState {
                stock: till,
                invoices: HashMap::new(),
            }),
        }
    }

    pub async fn invoice_count(&self) -> usize {
        self.state.lock().await.invoices.len()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        MemoryLedger::new(NoteCounts::new())
    }
}

#[async_trait]
impl StockLedger for MemoryLedger {
    async fn snapshot(&self) -> SettleResult<NoteCounts> {
        Ok(self.state.lock().await.stock.clone())
    }

    async fn try_commit(&self, movement: &StockMovement, invoice: &Invoice) -> SettleResult<()> {
        let mut state = self.state.lock().await;

        if state.invoices.contains_key(&invoice.id) {
            return Err(DbError::UniqueViolation {
                field: "id".to_string(),
                value: invoice.id.clone(),
            }
            .into());
        }

        movement.apply_to(&mut state.stock)?;
        state.invoices.insert(invoice.id.clone(), invoice.clone());

        debug!(invoice_id = %invoice.id, "Movement applied to memory ledger");
        Ok(())
    }

    async fn restock(&self, denomination: Denomination, count: u32) -> SettleResult<()> {
        self.state.lock().await.stock.set(denomination, count);
        Ok(())
    }

    async fn find_invoice(&self, id: &str) -> SettleResult<Option<Invoice>> {
        Ok(self.state.lock().await.invoices.get(id).cloned())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettleError;
    use chrono::Utc;
    use std::sync::Arc;
    use till_core::{CoreError, InvoiceTotals, Money, SettlementStatus};

    fn notes(pairs: &[(u32, u32)]) -> NoteCounts {
        NoteCounts::from_pairs(pairs.iter().copied()).unwrap()
    }

    fn invoice(id: &str) -> Invoice {
        Invoice {
            id: id.to_string(),
            customer_email: "buyer@example.com".to_string(),
            created_at: Utc::now(),
            items: vec![],
            totals: InvoiceTotals::default(),
            cash_paid: Money::zero(),
            denominations_tendered: NoteCounts::new(),
            balance_payable: Money::zero(),
            change_breakdown: NoteCounts::new(),
            status: SettlementStatus::Committed,
        }
    }

    #[tokio::test]
    async fn test_memory_ledger_commit() {
        let ledger = MemoryLedger::new(notes(&[(10, 1), (2, 10)]));
        let movement = StockMovement::new(notes(&[(50, 1)]), notes(&[(10, 1), (2, 2)]));

        ledger.try_commit(&movement, &invoice("a")).await.unwrap();

        let stock = ledger.snapshot().await.unwrap();
        assert_eq!(stock.count(Denomination::Fifty), 1);
        assert_eq!(stock.count(Denomination::Ten), 0);
        assert_eq!(stock.count(Denomination::Two), 8);
        assert!(ledger.find_invoice("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_ledger_insufficient_is_atomic() {
        let ledger = MemoryLedger::new(notes(&[(10, 1)]));
        let before = ledger.snapshot().await.unwrap();
        let movement = StockMovement::new(notes(&[(50, 1)]), notes(&[(10, 2)]));

        let err = ledger.try_commit(&movement, &invoice("a")).await.unwrap_err();

        assert!(matches!(
            err,
            SettleError::Core(CoreError::InsufficientStock { denomination: 10, .. })
        ));
        assert_eq!(ledger.snapshot().await.unwrap(), before);
        assert_eq!(ledger.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn test_memory_ledger_duplicate_invoice_leaves_stock() {
        let ledger = MemoryLedger::new(notes(&[(10, 2)]));
        let movement = StockMovement::new(NoteCounts::new(), notes(&[(10, 1)]));

        ledger.try_commit(&movement, &invoice("a")).await.unwrap();
        assert!(ledger.try_commit(&movement, &invoice("a")).await.is_err());
        assert_eq!(ledger.snapshot().await.unwrap().count(Denomination::Ten), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_memory_ledger_concurrent_commits_never_overdraw() {
        // Each movement alone fits; any two together need a second 10-note.
        let ledger = Arc::new(MemoryLedger::new(notes(&[(10, 1), (2, 2)])));
        let movement = StockMovement::new(notes(&[(20, 1)]), notes(&[(10, 1), (2, 1)]));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let movement = movement.clone();
                tokio::spawn(async move {
                    ledger.try_commit(&movement, &invoice(&format!("inv-{i}"))).await
                })
            })
            .collect();

        let mut committed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => committed += 1,
                Err(err) => assert!(matches!(
                    err,
                    SettleError::Core(CoreError::InsufficientStock { denomination: 10, .. })
                )),
            }
        }

        assert_eq!(committed, 1);
        assert_eq!(ledger.invoice_count().await, 1);
        let stock = ledger.snapshot().await.unwrap();
        assert_eq!(stock.count(Denomination::Ten), 0);
        assert_eq!(stock.count(Denomination::Two), 1);
        assert_eq!(stock.count(Denomination::Twenty), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_memory_ledger_concurrent_commits_drain_exactly() {
        let ledger = Arc::new(MemoryLedger::new(notes(&[(2, 5)])));
        let movement = StockMovement::new(NoteCounts::new(), notes(&[(2, 1)]));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let movement = movement.clone();
                tokio::spawn(async move {
                    ledger.try_commit(&movement, &invoice(&format!("inv-{i}"))).await
                })
            })
            .collect();

        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                committed += 1;
            }
        }

        assert_eq!(committed, 5);
        assert_eq!(ledger.snapshot().await.unwrap().count(Denomination::Two), 0);
    }

    #[tokio::test]
    async fn test_memory_ledger_rejects_count_overflow() {
        let ledger = MemoryLedger::new(notes(&[(1, u32::MAX - 1)]));
        let movement = StockMovement::new(notes(&[(1, 5)]), NoteCounts::new());

        let err = ledger.try_commit(&movement, &invoice("a")).await.unwrap_err();

        assert!(matches!(err, SettleError::Core(CoreError::Validation(_))));
        assert_eq!(ledger.snapshot().await.unwrap().count(Denomination::One), u32::MAX - 1);
        assert_eq!(ledger.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn test_memory_catalog_upsert() {
        let catalog = MemoryCatalog::default();
        assert!(catalog.get_catalog_entry("P1").await.unwrap().is_none());

        catalog
            .upsert(CatalogEntry {
                product_id: "P1".into(),
                name: "Notebook".into(),
                unit_price: Money::from_major(100),
                tax_rate: till_core::TaxRate::from_whole_percent(18),
            })
            .await;

        assert!(catalog.get_catalog_entry("P1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_database_ledger_snapshot_lists_every_note() {
        let db = Database::new(till_db::DbConfig::in_memory()).await.unwrap();
        db.restock(Denomination::Ten, 3).await.unwrap();

        let stock = db.snapshot().await.unwrap();
        assert_eq!(stock.iter().count(), 8);
        assert_eq!(stock.count(Denomination::Ten), 3);
    }
}
