//! HTTP surface of the creator calendar: the same payloads the CLI prints
//! with `json`, served CORS-open so browser clients can match the server.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use sow_core::CreatorCalendar;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub const CRATE_NAME: &str = "sow-server";

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub calendar: Arc<CreatorCalendar>,
}

impl AppState {
    pub fn new(calendar: CreatorCalendar) -> Self {
        Self {
            calendar: Arc::new(calendar),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz_handler))
        .route(
            "/v1/calendar",
            get(handlers::calendar_handler).post(handlers::calendar_handler),
        )
        .route(
            "/v1/calendar/summary",
            get(handlers::summary_handler).post(handlers::summary_handler),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
