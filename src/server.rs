//! HTTP boundary that triggers syncs.
//!
//! The ingestion service calls `GET /authSuccess` with the stream binding and
//! the watermark it holds. The request is acknowledged immediately; the user
//! lookup and the sync itself run on a detached task, and their outcome only
//! ever reaches the logs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use crate::contract::UserRepository;
use crate::logger::SyncLogger;
use crate::model::{StreamTarget, UserRecord};
use crate::synchronise::SyncOrchestrator;

pub const ACKNOWLEDGEMENT: &str = "ok, sync request acknowledged";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub repository: Arc<dyn UserRepository>,
    pub logger: Arc<dyn SyncLogger>,
}

#[derive(Debug, Deserialize)]
pub struct AuthSuccessQuery {
    pub username: String,
    pub streamid: String,
    #[serde(default, rename = "latestSyncField")]
    pub latest_sync_field: Option<String>,
}

/// A sync the trigger has accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub username: String,
    pub stream_id: String,
    pub write_token: String,
    /// Overrides the stored watermark when present.
    pub watermark: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("missing Authorization header carrying the stream write token")]
    MissingWriteToken,

    #[error("invalid latestSyncField: {0}")]
    InvalidSyncField(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Parse the watermark handed back by the ingestion service. Blank means none.
pub fn parse_sync_field(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| ApiError::InvalidSyncField(format!("{s}: {e}"))),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/authSuccess", get(auth_success))
        .with_state(state)
}

async fn auth_success(
    State(state): State<AppState>,
    Query(query): Query<AuthSuccessQuery>,
    headers: HeaderMap,
) -> Result<&'static str, ApiError> {
    let write_token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingWriteToken)?;
    let watermark = parse_sync_field(query.latest_sync_field.as_deref())?;

    info!(username = %query.username, stream_id = %query.streamid, "sync requested");
    // Fire and forget: the caller only learns the run was requested.
    drop(trigger_sync(
        &state,
        SyncRequest {
            username: query.username,
            stream_id: query.streamid,
            write_token: write_token.to_string(),
            watermark,
        },
    ));
    Ok(ACKNOWLEDGEMENT)
}

/// Look up the user and run the sync on a detached task.
///
/// On success the record is saved back with the stream binding and the
/// advanced watermark. The handle can be awaited for diagnostics.
pub fn trigger_sync(state: &AppState, request: SyncRequest) -> JoinHandle<()> {
    let state = state.clone();
    let span = tracing::info_span!("sync_request", username = %request.username);
    tokio::spawn(async move { run_requested_sync(state, request).await }.instrument(span))
}

async fn run_requested_sync(state: AppState, request: SyncRequest) {
    let username = request.username.as_str();
    let record = match state.repository.find_by_username(username).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            state.logger.error(username, "sync requested for unknown user");
            return;
        }
        Err(e) => {
            state.logger.error(username, &format!("user lookup failed: {e}"));
            return;
        }
    };

    let target = StreamTarget {
        stream_id: request.stream_id.clone(),
        write_token: request.write_token.clone(),
        watermark: request.watermark.or(record.watermark),
    };

    // Aborted runs are logged by the orchestrator and leave the record untouched.
    let Ok(report) = state.orchestrator.run(&record.user_context(), &target).await else {
        return;
    };

    let updated = UserRecord {
        stream_id: Some(target.stream_id.clone()),
        write_token: Some(target.write_token.clone()),
        watermark: report.next_watermark(target.watermark),
        ..record
    };
    match state.repository.save(updated).await {
        Ok(()) => state.logger.debug(username, "stored stream binding and watermark"),
        Err(e) => state
            .logger
            .error(username, &format!("failed to persist watermark: {e}")),
    }
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening for sync requests");
    axum::serve(listener, router(state)).await
}
