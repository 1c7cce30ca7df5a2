//! # HTTP Handlers
//!
//! | Route                              | Handler                       |
//! |------------------------------------|-------------------------------|
//! | `POST /invoices/preview`           | [`invoice::preview_invoice`]  |
//! | `POST /invoices`                   | [`invoice::commit_invoice`]   |
//! | `DELETE /invoices/preview/{id}`    | [`invoice::abandon_preview`]  |
//! | `GET /invoices/{id}`               | [`invoice::get_invoice`]      |
//! | `GET /denominations`               | [`denomination::get_stock`]   |
//! | `PUT /denominations/{value}`       | [`denomination::restock`]     |
//! | `GET /health`                      | [`health`]                    |

pub mod denomination;
pub mod invoice;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// Liveness plus a ledger read.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.ledger().snapshot().await?;
    Ok(Json(json!({ "status": "ok" })))
}
