//! # Preview Book
//!
//! Holds previews between the two HTTP calls of a settlement.
//!
//! ```text
//! POST /invoices/preview ──► insert(preview) ──► preview_id
//! POST /invoices         ──► take(preview_id) ──► commit
//! DELETE /invoices/preview/{id} ──► take(id) ──► abandon
//! ```
//!
//! `take` removes the entry, so a preview id is used at most once. Entries
//! older than the TTL are dropped on the next insert and never returned.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::coordinator::SettlementPreview;

pub struct PreviewBook {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, SettlementPreview)>>,
}

impl PreviewBook {
    pub fn new(ttl: Duration) -> Self {
        PreviewBook {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores a preview under its id, purging expired entries.
    pub async fn insert(&self, preview: SettlementPreview) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let before = entries.len();
        entries.retain(|_, (at, _)| now.duration_since(*at) < self.ttl);
        if entries.len() < before {
            debug!(expired = before - entries.len(), "Purged expired previews");
        }

        entries.insert(preview.id().to_string(), (now, preview));
    }

    /// Removes and returns a live preview.
    pub async fn take(&self, id: &str) -> Option<SettlementPreview> {
        let (at, preview) = self.entries.lock().await.remove(id)?;
        if at.elapsed() >= self.ttl {
            debug!(preview_id = %id, "Preview expired");
            return None;
        }
        Some(preview)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{SettlementCoordinator, SettlementRequest};
    use crate::ledger::{MemoryCatalog, MemoryLedger};
    use std::sync::Arc;
    use till_core::{CartLine, CatalogEntry, Money, NoteCounts, TaxRate};

    async fn preview() -> SettlementPreview {
        let catalog = MemoryCatalog::new([CatalogEntry {
            product_id: "P1".into(),
            name: "Pen".into(),
            unit_price: Money::from_major(10),
            tax_rate: TaxRate::zero(),
        }]);
        let coordinator =
            SettlementCoordinator::new(Arc::new(catalog), Arc::new(MemoryLedger::default()));
        coordinator
            .preview(SettlementRequest {
                customer_email: "buyer@example.com".into(),
                items: vec![CartLine::new("P1", 1)],
                cash_paid: 10,
                cash_denominations: NoteCounts::new(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let book = PreviewBook::new(Duration::from_secs(60));
        let preview = preview().await;
        let id = preview.id().to_string();

        book.insert(preview).await;
        assert!(book.take(&id).await.is_some());
        assert!(book.take(&id).await.is_none());
        assert!(book.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_preview_is_gone() {
        let book = PreviewBook::new(Duration::ZERO);
        let preview = preview().await;
        let id = preview.id().to_string();

        book.insert(preview).await;
        assert!(book.take(&id).await.is_none());
    }
}
