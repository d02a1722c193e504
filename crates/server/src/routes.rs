use axum::{
    extract::{DefaultBodyLimit, OriginalUri},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::errors;
use crate::state::ServerState;

pub mod posts;

const BODY_LIMIT_BYTES: usize = 16 * 1024;

pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

pub async fn metrics() -> (StatusCode, String) {
    common::metrics::encode_metrics()
}

async fn api_not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<Value>) {
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or_else(|| uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": format!("Route {path} not found")})),
    )
}

/// Build the full application router: `/api` endpoints, health, metrics and the SPA bundle.
pub fn build_router(state: ServerState, cors: CorsLayer, static_dir: &str) -> Router {
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(format!("{static_dir}/index.html")));

    let api = Router::new()
        .route("/fetch-and-store", get(posts::fetch_and_store))
        .route("/posts", get(posts::list).post(posts::create))
        .route("/posts/:id", get(posts::get).put(posts::update).delete(posts::delete))
        .fallback(api_not_found);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api", api)
        .fallback_service(spa)
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CatchPanicLayer::custom(errors::handle_panic))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one span per request: method, uri, version
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // status and latency
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
