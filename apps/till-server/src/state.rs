//! # Application State
//!
//! Shared by every handler through axum's `State` extractor.
//!
//! ## Thread Safety
//! The coordinator serializes commits internally and the preview book
//! guards its map with a mutex, so handlers share plain `Arc`s.

use std::sync::Arc;
use std::time::Duration;

use till_settle::config::SettlementSettings;
use till_settle::{Catalog, PreviewBook, SettlementCoordinator, StockLedger};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SettlementCoordinator>,
    pub previews: Arc<PreviewBook>,
}

impl AppState {
    /// Wires a coordinator and preview book over the given seams.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn StockLedger>,
        settings: &SettlementSettings,
    ) -> Self {
        AppState {
            coordinator: Arc::new(SettlementCoordinator::from_settings(catalog, ledger, settings)),
            previews: Arc::new(PreviewBook::new(Duration::from_secs(settings.preview_ttl_secs))),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn StockLedger> {
        self.coordinator.ledger()
    }
}
