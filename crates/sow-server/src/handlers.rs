use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use sow_core::{CalendarError, CalendarSnapshot};
use sow_wire::ErrorBody;
use tracing::{error, warn};

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InstantQuery {
    /// Instant expression; the current time when absent.
    pub at: Option<String>,
}

#[must_use]
pub fn error_status(err: &CalendarError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[must_use]
pub fn error_response(err: &CalendarError) -> Response {
    let status = error_status(err);
    if status.is_server_error() {
        error!(error = %err, "calendar computation failed");
    } else {
        warn!(error = %err, "rejected calendar request");
    }
    (status, Json(ErrorBody::new(err.to_string()))).into_response()
}

/// Form decoding turns the `+` of `?at=+1d` into a space; a leading space
/// before a relative offset is read back as `+`.
fn instant_expr(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let relative = trimmed
        .strip_suffix(['d', 'h', 'm'])
        .is_some_and(|num| !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit()));
    if relative && raw.starts_with(' ') {
        return Some(format!("+{trimmed}"));
    }
    Some(trimmed.to_string())
}

fn snapshot_for(state: &AppState, query: &InstantQuery) -> Result<CalendarSnapshot, CalendarError> {
    let now = Utc::now();
    match query.at.as_deref().and_then(instant_expr) {
        Some(expr) => state.calendar.snapshot_expr(&expr, now),
        None => state.calendar.snapshot(now),
    }
}

pub async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[tracing::instrument(skip(state))]
pub async fn calendar_handler(
    State(state): State<AppState>,
    Query(query): Query<InstantQuery>,
) -> Response {
    match snapshot_for(&state, &query) {
        Ok(snap) => Json(snap.to_payload()).into_response(),
        Err(err) => error_response(&err),
    }
}

#[tracing::instrument(skip(state))]
pub async fn summary_handler(
    State(state): State<AppState>,
    Query(query): Query<InstantQuery>,
) -> Response {
    match snapshot_for(&state, &query) {
        Ok(snap) => Json(snap.to_summary()).into_response(),
        Err(err) => error_response(&err),
    }
}
