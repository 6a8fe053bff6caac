//! Axum route handlers for the Results API.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::results::identifier::{decode_result_id, encode_result_id};
use crate::results::store::StoredResult;
use crate::state::AppState;

/// Listings return at most this many entries, newest first.
pub const LIST_LIMIT: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub openid: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub id: String,
    pub openid: String,
    pub filename: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub view_url: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub ok: bool,
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ok: bool,
    pub url: String,
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct ReoptResponse {
    pub ok: bool,
    pub event_id: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /results?openid=...
///
/// Lists the owner's most recent PDFs with their opaque ids and links.
pub async fn handle_list_results(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let records = state.store.list(&query.openid, LIST_LIMIT)?;

    let mut results = Vec::with_capacity(records.len());
    for record in records {
        let id = encode_result_id(&record.openid, &record.filename)?;
        results.push(ResultEntry {
            view_url: format!("{}/results/{id}/view", state.config.public_base_url),
            download_url: format!("{}/results/{id}/download", state.config.public_base_url),
            id,
            openid: record.openid,
            filename: record.filename,
            size: record.size,
            created_at: record.created_at,
        });
    }

    Ok(Json(ListResponse { ok: true, results }))
}

/// GET /results/:result_id/view
///
/// Streams the PDF inline.
pub async fn handle_view_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
) -> Result<Response, AppError> {
    let (openid, filename) = decode_result_id(&result_id)?;
    let record = state.store.resolve(&openid, &filename)?;
    pdf_response(&record, "inline").await
}

/// GET /results/:result_id/download[?token=...]
///
/// Without a token: issues a short-lived signed ticket and returns it
/// together with a ready-to-use URL instead of the file. With a token:
/// verifies it, requires it to name this exact result, and streams the PDF
/// as an attachment.
pub async fn handle_download_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let (openid, filename) = decode_result_id(&result_id)?;
    let record = state.store.resolve(&openid, &filename)?;

    let Some(token) = query.token else {
        let token = state.signer.issue(&result_id);
        let url = format!(
            "{}/results/{result_id}/download?token={token}",
            state.config.public_base_url
        );
        return Ok(Json(TicketResponse {
            ok: true,
            url,
            token,
            expires_in: state.signer.expires_in,
        })
        .into_response());
    };

    let verified = state.signer.validate(&token)?;
    // A ticket only grants the artifact it was issued for.
    if verified != result_id {
        return Err(AppError::InvalidToken(
            "token does not match this result".to_string(),
        ));
    }

    pdf_response(&record, "attachment").await
}

/// POST /results/:result_id/reopt
///
/// Durably enqueues a regeneration request and returns the event id as a
/// receipt; the request does not wait for the worker.
pub async fn handle_reopt_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
) -> Result<Json<ReoptResponse>, AppError> {
    let (openid, filename) = decode_result_id(&result_id)?;
    let record = state.store.resolve(&openid, &filename)?;
    let event_id = state.queue.enqueue(&result_id, &record)?;
    Ok(Json(ReoptResponse { ok: true, event_id }))
}

async fn pdf_response(record: &StoredResult, disposition: &str) -> Result<Response, AppError> {
    // The file can disappear between resolve and read; report it as missing.
    let body = tokio::fs::read(&record.path)
        .await
        .map_err(|_| AppError::NotFound)?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("{disposition}; filename=\"{}\"", record.filename),
        ),
    ];
    Ok((StatusCode::OK, headers, body).into_response())
}
