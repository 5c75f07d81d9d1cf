use crate::controller::Controller;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one live page this process hosts.
    pub controller: Controller,
}
