use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and whether the content document is loaded.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let content_loaded = state.controller.snapshot().await.content_loaded;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "folio",
        "content_loaded": content_loaded
    }))
}
