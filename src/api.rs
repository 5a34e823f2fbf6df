use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::classes::ClassRoster;
use crate::models::*;
use crate::parser;
use crate::store::{LogStore, StoreError};

pub struct AppState {
    store: LogStore,
    roster: ClassRoster,
}

pub fn create_router(store: LogStore, roster: ClassRoster) -> Router {
    let state = Arc::new(AppState { store, roster });

    Router::new()
        .route("/api/upload", post(upload_log))
        .route("/api/logs", get(list_logs).post(save_log))
        .route("/api/logs/{id}", get(get_log))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Parse an uploaded log without persisting it and return the report.
async fn upload_log(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<BattleReport>, (StatusCode, String)> {
    let form = read_upload_form(multipart).await?;
    let raw_log = form
        .raw_log
        .ok_or((StatusCode::BAD_REQUEST, "No file uploaded".to_string()))?;

    let report = parse_in_background(raw_log, state.roster.clone()).await?;
    Ok(Json(report))
}

/// Parse an uploaded log, persist the report keyed by siege date and
/// server name, and return the stored entry.
async fn save_log(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<StoredLog>, (StatusCode, String)> {
    let form = read_upload_form(multipart).await?;
    let (raw_log, log_date_str, server_name) = match (form.raw_log, form.log_date, form.server_name)
    {
        (Some(raw), Some(date), Some(server)) if !server.trim().is_empty() => (raw, date, server),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "File, log date, and server name are required".to_string(),
            ))
        }
    };
    let log_date = parse_log_date(&log_date_str).ok_or((
        StatusCode::BAD_REQUEST,
        format!("Invalid log date: {log_date_str}"),
    ))?;

    let report = parse_in_background(raw_log, state.roster.clone()).await?;
    let entry = state
        .store
        .save(log_date, server_name.trim(), report)
        .map_err(store_error_response)?;
    Ok(Json(entry))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    server_name: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ListResponse {
    Entries(Vec<StoredLogInfo>),
    Servers { servers: Vec<ServerGroup> },
}

/// List saved logs for one server, or per-server counts when no server
/// is given.
async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, (StatusCode, String)> {
    let response = match params.server_name {
        Some(server_name) => ListResponse::Entries(
            state
                .store
                .list_for_server(&server_name)
                .map_err(store_error_response)?,
        ),
        None => ListResponse::Servers {
            servers: state.store.server_groups().map_err(store_error_response)?,
        },
    };
    Ok(Json(response))
}

/// Fetch one saved log by id, or by siege date when the path segment
/// parses as a date.
async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StoredLog>, (StatusCode, String)> {
    // Ids become filenames; reject anything that could escape the data dir.
    if id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err((StatusCode::BAD_REQUEST, "Invalid log id".to_string()));
    }

    let entry = match parse_log_date(&id) {
        Some(date) => state.store.find_by_date(date),
        None => state.store.get(&id),
    }
    .map_err(store_error_response)?;
    Ok(Json(entry))
}

#[derive(Default)]
struct UploadForm {
    raw_log: Option<String>,
    log_date: Option<String>,
    server_name: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, (StatusCode, String)> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let text = field
            .text()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Unreadable upload: {e}")))?;
        match name.as_str() {
            "file" => form.raw_log = Some(text),
            "logDate" => form.log_date = Some(text),
            "serverName" => form.server_name = Some(text),
            _ => {}
        }
    }
    Ok(form)
}

/// Run the synchronous parse off the async runtime, then decorate
/// classes from the roster.
async fn parse_in_background(
    raw_log: String,
    roster: ClassRoster,
) -> Result<BattleReport, (StatusCode, String)> {
    tokio::task::spawn_blocking(move || {
        let start = std::time::Instant::now();
        let mut report = parser::parse_siege_log(&raw_log);
        roster.decorate(&mut report);
        tracing::info!(
            players = report.player_results.len(),
            guilds = report.guild_results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "parsed siege log"
        );
        report
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task failed: {e}")))
}

/// Accept a plain date or a full RFC 3339 timestamp, as the frontend
/// sent either.
fn parse_log_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| chrono::DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn store_error_response(err: StoreError) -> (StatusCode, String) {
    match err {
        StoreError::NotFound => (StatusCode::NOT_FOUND, "Log not found".to_string()),
        other => {
            tracing::error!("storage failure: {other}");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}
