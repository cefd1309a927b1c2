//! Route handlers.
//!
//! Storage calls are synchronous, so every handler hands its work to the
//! blocking pool through [`AppState::run`].

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonvault_ledger::{DeletedEntry, EntryStore, EntryUpdate, LedgerResult, NewEntry};
use jsonvault_store::Storage;
use jsonvault_types::{temporal, Entry, EntryId, HistoryId, HistoryRecord, PageRequest};
use serde::Deserialize;
use serde_json::Value;

use crate::config::Environment;
use crate::error::ServerError;
use crate::response::{Envelope, HealthStatus};

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    entries: EntryStore,
    environment: Environment,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, environment: Environment) -> Self {
        Self {
            entries: EntryStore::new(storage),
            environment,
        }
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    fn reject(&self, error: ServerError) -> ApiError {
        ApiError {
            error,
            expose_detail: self.environment.is_development(),
        }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&EntryStore) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let entries = self.entries.clone();
        match tokio::task::spawn_blocking(move || op(&entries)).await {
            Ok(result) => result.map_err(|e| self.reject(e.into())),
            Err(join) => Err(self.reject(ServerError::Internal(format!(
                "blocking task failed: {join}"
            )))),
        }
    }
}

/// A [`ServerError`] rendered according to the running environment.
#[derive(Debug)]
pub struct ApiError {
    error: ServerError,
    expose_detail: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.error.into_response_with_detail(self.expose_detail)
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Request body for create and update.
#[derive(Debug, Default, Deserialize)]
pub struct EntryBody {
    pub data: Option<Value>,
    pub name: Option<String>,
}

/// `?limit=&offset=`, kept as text so that non-numeric values fall back to
/// the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::from_query(self.limit.as_deref(), self.offset.as_deref())
    }
}

fn body_or_reject(
    state: &AppState,
    body: Result<Json<EntryBody>, JsonRejection>,
) -> ApiResult<EntryBody> {
    body.map(|Json(body)| body).map_err(|rejection| {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        state.reject(ServerError::Rejected {
            status,
            message: rejection.body_text(),
        })
    })
}

/// Ids that do not parse cannot name a row, so they are reported as missing.
fn entry_id(state: &AppState, raw: &str) -> ApiResult<EntryId> {
    raw.parse()
        .map_err(|_| state.reject(ServerError::NotFound("Entry not found".into())))
}

fn history_id(state: &AppState, raw: &str) -> ApiResult<HistoryId> {
    raw.parse()
        .map_err(|_| state.reject(ServerError::NotFound("History record not found".into())))
}

pub async fn create_entry(
    State(state): State<AppState>,
    body: Result<Json<EntryBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Entry>>)> {
    let body = body_or_reject(&state, body)?;
    let input = NewEntry::from_request(body.name, body.data).map_err(|e| state.reject(e.into()))?;
    let entry = state.run(move |entries| entries.create(input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("JSON saved successfully", entry)),
    ))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Envelope<Vec<Entry>>>> {
    let page = query.page();
    let entries = state.run(move |entries| entries.list(page)).await?;
    Ok(Json(Envelope::page(entries, page)))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Envelope<Entry>>> {
    let id = entry_id(&state, &raw)?;
    let entry = state.run(move |entries| entries.get(id)).await?;
    Ok(Json(Envelope::data(entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Result<Json<EntryBody>, JsonRejection>,
) -> ApiResult<Json<Envelope<Entry>>> {
    let body = body_or_reject(&state, body)?;
    let input =
        EntryUpdate::from_request(body.name, body.data).map_err(|e| state.reject(e.into()))?;
    let id = entry_id(&state, &raw)?;
    let entry = state.run(move |entries| entries.update(id, input)).await?;
    Ok(Json(Envelope::with_message("JSON updated successfully", entry)))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Envelope<DeletedEntry>>> {
    let id = entry_id(&state, &raw)?;
    let deleted = state.run(move |entries| entries.delete(id)).await?;
    Ok(Json(Envelope::with_message(
        "JSON entry deleted successfully",
        deleted,
    )))
}

pub async fn entry_history(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Envelope<Vec<HistoryRecord>>>> {
    let page = query.page();
    // an unparseable id names no entry, and an unknown entry has no history
    let Ok(id) = raw.parse::<EntryId>() else {
        return Ok(Json(Envelope::page(Vec::new(), page)));
    };
    let records = state
        .run(move |entries| entries.history().list_by_entry(id, page))
        .await?;
    Ok(Json(Envelope::page(records, page)))
}

pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Envelope<Vec<HistoryRecord>>>> {
    let page = query.page();
    let records = state
        .run(move |entries| entries.history().list_all(page))
        .await?;
    Ok(Json(Envelope::page(records, page)))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Envelope<HistoryRecord>>> {
    let id = history_id(&state, &raw)?;
    let record = state.run(move |entries| entries.history().get(id)).await?;
    Ok(Json(Envelope::data(record)))
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::at(temporal::now()))
}

pub async fn route_not_found(State(state): State<AppState>, uri: Uri) -> ApiError {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    state.reject(ServerError::RouteNotFound(path))
}
