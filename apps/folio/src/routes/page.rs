use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::contact::SubmitOutcome;
use crate::controller::{ClickOutcome, NavOutcome, PageSnapshot};
use crate::errors::AppError;
use crate::models::Locale;
use crate::navigator::{CloseReason, CvAction};
use crate::state::AppState;

#[derive(Serialize)]
pub struct LocaleResponse {
    pub locale: Locale,
    pub changed: bool,
}

#[derive(Serialize)]
pub struct FlagResponse {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub outcome: SubmitOutcome,
}

#[derive(Deserialize)]
pub struct CloseQuery {
    pub reason: Option<String>,
}

/// GET /
pub async fn handle_page(State(state): State<AppState>) -> Html<String> {
    Html(state.controller.html().await)
}

/// GET /api/v1/state
pub async fn handle_state(State(state): State<AppState>) -> Json<PageSnapshot> {
    Json(state.controller.snapshot().await)
}

/// POST /api/v1/lang/:lang
pub async fn handle_lang(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> Result<Json<LocaleResponse>, AppError> {
    let locale: Locale = lang.parse()?;
    let changed = state.controller.switch_locale(locale).await?;
    Ok(Json(LocaleResponse { locale, changed }))
}

/// POST /api/v1/nav/:section
pub async fn handle_nav(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Json<NavOutcome> {
    Json(state.controller.open_section(&section).await)
}

/// POST /api/v1/title
pub async fn handle_title(State(state): State<AppState>) -> Json<FlagResponse> {
    Json(FlagResponse {
        ok: state.controller.return_home().await,
    })
}

/// POST /api/v1/cv
pub async fn handle_cv(State(state): State<AppState>) -> Json<CvAction> {
    Json(state.controller.download_cv().await)
}

/// POST /api/v1/modal/close?reason=backdrop|button
pub async fn handle_modal_close(
    State(state): State<AppState>,
    Query(query): Query<CloseQuery>,
) -> Result<Json<FlagResponse>, AppError> {
    let reason = match query.reason.as_deref() {
        None | Some("button") => CloseReason::Button,
        Some("backdrop") => CloseReason::Backdrop,
        Some(other) => {
            return Err(AppError::Validation(format!("unknown close reason '{other}'")));
        }
    };
    Ok(Json(FlagResponse {
        ok: state.controller.close_modal(reason).await,
    }))
}

/// POST /api/v1/keys/:key
pub async fn handle_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<FlagResponse> {
    Json(FlagResponse {
        ok: state.controller.key(&key).await,
    })
}

/// POST /api/v1/click/:id
pub async fn handle_click(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClickOutcome>, AppError> {
    Ok(Json(state.controller.click(&id).await?))
}

/// POST /api/v1/transition/:section
pub async fn handle_transition(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Json<FlagResponse> {
    Json(FlagResponse {
        ok: state.controller.transition_finished(&section),
    })
}

/// POST /api/v1/forms/:id/submit
/// Body: a JSON object of field name → value applied before submitting.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(fields): Json<HashMap<String, String>>,
) -> Result<Json<SubmitResponse>, AppError> {
    let fields: Vec<(String, String)> = fields.into_iter().collect();
    let outcome = state.controller.submit_form(&id, &fields).await?;
    Ok(Json(SubmitResponse { outcome }))
}
