//! # Denomination Handlers
//!
//! Read and set the till's note counts.

use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;
use till_core::{Denomination, NoteCounts};
use till_settle::dto::RestockRequest;

/// Current count of every denomination, keyed by face value.
pub async fn get_stock(State(state): State<AppState>) -> Result<Json<NoteCounts>, ApiError> {
    Ok(Json(state.ledger().snapshot().await?))
}

/// Sets one denomination's count and returns the whole till.
pub async fn restock(
    State(state): State<AppState>,
    Path(value): Path<u32>,
    Json(body): Json<RestockRequest>,
) -> Result<Json<NoteCounts>, ApiError> {
    let denomination = Denomination::try_from(value)?;

    state.ledger().restock(denomination, body.count).await?;
    info!(denomination = value, count = body.count, "Till restocked");

    Ok(Json(state.ledger().snapshot().await?))
}
