//! # Repository Module
//!
//! Database repository implementations for the till.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  SettlementCoordinator                                                 │
//! │       │                                                                 │
//! │       │  db.denominations().snapshot()                                 │
//! │       ▼                                                                 │
//! │  CatalogRepository        get, upsert, count                           │
//! │  DenominationRepository   snapshot, restock                            │
//! │  InvoiceRepository        get_by_id, commit_settlement                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Priced, taxed products
//! - [`denomination::DenominationRepository`] - Note counts in the till
//! - [`invoice::InvoiceRepository`] - Committed invoices

pub mod catalog;
pub mod denomination;
pub mod invoice;
