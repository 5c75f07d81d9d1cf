use serde::Serialize;

use crate::models::content::Locale;

/// Where the section navigator currently is. The CV modal is tracked
/// separately because it can sit on top of any phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum NavPhase {
    Hero,
    Loading { section: String },
    SectionVisible { section: String },
    Transitioning { from: String, to: String },
}

impl NavPhase {
    /// The section whose fetch is pending, if any.
    pub fn pending_section(&self) -> Option<&str> {
        match self {
            NavPhase::Loading { section } => Some(section),
            NavPhase::Transitioning { to, .. } => Some(to),
            _ => None,
        }
    }
}

/// Transient view state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub current_lang: Locale,
    pub is_loading: bool,
    pub active_section: Option<String>,
}

impl ViewState {
    pub fn new(current_lang: Locale) -> Self {
        Self {
            current_lang,
            is_loading: false,
            active_section: None,
        }
    }
}
