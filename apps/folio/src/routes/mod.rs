pub mod health;
pub mod page;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/", get(page::handle_page))
        .route("/api/v1/state", get(page::handle_state))
        // UI events
        .route("/api/v1/lang/:lang", post(page::handle_lang))
        .route("/api/v1/nav/:section", post(page::handle_nav))
        .route("/api/v1/title", post(page::handle_title))
        .route("/api/v1/cv", post(page::handle_cv))
        .route("/api/v1/modal/close", post(page::handle_modal_close))
        .route("/api/v1/keys/:key", post(page::handle_key))
        .route("/api/v1/click/:id", post(page::handle_click))
        .route("/api/v1/transition/:section", post(page::handle_transition))
        .route("/api/v1/forms/:id/submit", post(page::handle_submit))
        .with_state(state)
}
