//! Request handlers.
//!
//! Each handler maps one front-end command onto one orchestrator call.
//! State-changing operations run on their own task, so a client that hangs
//! up mid-request does not abandon a submitted transaction halfway.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::Instrument;

use crate::blobstore::BlobStore;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::ledger::Ledger;

#[derive(Debug, Serialize)]
pub struct ArmedResponse {
    pub session: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RevokedResponse {
    pub document_id: u64,
    pub revoked: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ledger_reachable: bool,
    pub active_sessions: usize,
}

/// `POST /sessions/{session}/upload`
pub async fn arm_session<L, B>(
    State(state): State<AppState<L, B>>,
    Path(session): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    L: Ledger + 'static,
    B: BlobStore + 'static,
{
    state.sessions.arm(&session)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ArmedResponse {
            session,
            status: "armed",
        }),
    ))
}

/// `PUT /sessions/{session}/files/{name}`
pub async fn upload_file<L, B>(
    State(state): State<AppState<L, B>>,
    Path((session, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    L: Ledger + 'static,
    B: BlobStore + 'static,
{
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("file name must not be empty"));
    }
    if body.is_empty() {
        return Err(ApiError::bad_request("file body must not be empty"));
    }

    let (lease, observer) = state.sessions.begin(&session, &name)?;
    tracing::info!(session = %session, name = %name, size = body.len(), "Registering uploaded file");

    let orchestrator = state.orchestrator.clone();
    let wallet = state.wallet.clone();
    let task = tokio::spawn(async move {
        let result = orchestrator
            .register_document_observed(&name, body, &wallet, observer)
            .await;
        drop(lease);
        result
    }
    .in_current_span());

    let registration = task
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal", e.to_string()))??;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// `GET /sessions/{session}`
pub async fn session_status<L, B>(
    State(state): State<AppState<L, B>>,
    Path(session): Path<String>,
) -> impl IntoResponse
where
    L: Ledger + 'static,
    B: BlobStore + 'static,
{
    Json(state.sessions.status(&session))
}

/// `GET /documents/{id}`
pub async fn get_document<L, B>(
    State(state): State<AppState<L, B>>,
    Path(document_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError>
where
    L: Ledger + 'static,
    B: BlobStore + 'static,
{
    let record = state.orchestrator.lookup_document(document_id).await?;
    Ok(Json(record))
}

/// `GET /documents/{id}/content`
pub async fn get_content<L, B>(
    State(state): State<AppState<L, B>>,
    Path(document_id): Path<u64>,
) -> Result<Response, ApiError>
where
    L: Ledger + 'static,
    B: BlobStore + 'static,
{
    let (record, bytes) = state.orchestrator.download_document(document_id).await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        attachment_name(&record.display_name)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `DELETE /documents/{id}`
pub async fn delete_document<L, B>(
    State(state): State<AppState<L, B>>,
    Path(document_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError>
where
    L: Ledger + 'static,
    B: BlobStore + 'static,
{
    let orchestrator = state.orchestrator.clone();
    let wallet = state.wallet.clone();
    tokio::spawn(async move { orchestrator.revoke_by_id(document_id, &wallet).await }.in_current_span())
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal", e.to_string()))??;

    Ok(Json(RevokedResponse {
        document_id,
        revoked: true,
    }))
}

/// `GET /health`
pub async fn health<L, B>(State(state): State<AppState<L, B>>) -> impl IntoResponse
where
    L: Ledger + 'static,
    B: BlobStore + 'static,
{
    let ledger_reachable = state.orchestrator.ledger().chain_id().await.is_ok();
    Json(HealthResponse {
        status: if ledger_reachable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        ledger_reachable,
        active_sessions: state.sessions.len(),
    })
}

/// Display name reduced to characters safe inside a quoted header value.
fn attachment_name(display_name: &str) -> String {
    display_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect()
}
