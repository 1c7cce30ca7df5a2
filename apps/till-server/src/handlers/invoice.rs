//! # Invoice Handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;
use till_core::validation::validate_uuid;
use till_settle::dto::{CommitRequest, InvoiceResponse, PreviewResponse};
use till_settle::{SettleError, SettlementRequest};

/// Prices a cart and parks the preview until it is committed or abandoned.
pub async fn preview_invoice(
    State(state): State<AppState>,
    Json(request): Json<SettlementRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    debug!(lines = request.items.len(), "preview_invoice");

    let preview = state.coordinator.preview(request).await?;
    let response = PreviewResponse::from(&preview);
    state.previews.insert(preview).await;

    Ok(Json(response))
}

/// Commits a parked preview.
pub async fn commit_invoice(
    State(state): State<AppState>,
    Json(body): Json<CommitRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    debug!(preview_id = %body.preview_id, "commit_invoice");

    let preview = state
        .previews
        .take(&body.preview_id)
        .await
        .ok_or_else(|| SettleError::PreviewNotFound(body.preview_id.clone()))?;

    let invoice = state.coordinator.commit(preview).await?;
    info!(invoice_id = %invoice.id, preview_id = %body.preview_id, "Invoice created");

    // The invoice is already stored; a failed read only drops the till view.
    let mut response = InvoiceResponse::from(&invoice);
    match state.ledger().snapshot().await {
        Ok(till) => response = response.with_available_stocks(till),
        Err(err) => warn!(error = %err, "Could not read till after commit"),
    }
    Ok((StatusCode::CREATED, Json(response)))
}

/// Drops a parked preview without touching the till.
pub async fn abandon_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let preview = state
        .previews
        .take(&id)
        .await
        .ok_or_else(|| SettleError::PreviewNotFound(id.clone()))?;

    let status = state.coordinator.abandon(preview);
    Ok(Json(json!({ "preview_id": id, "status": status })))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    validate_uuid(&id)?;

    let invoice = state
        .ledger()
        .find_invoice(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", &id))?;

    Ok(Json(InvoiceResponse::from(&invoice)))
}
