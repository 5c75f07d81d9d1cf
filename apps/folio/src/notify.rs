//! Transient toast notifications.

use serde::Serialize;
use uuid::Uuid;

use crate::dom::{Document, El, NodeId};
use crate::models::Locale;

pub const TOAST_ROOT_ID: &str = "toast-root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    fn class(self) -> &'static str {
        match self {
            ToastKind::Success => "toast-success",
            ToastKind::Error => "toast-error",
        }
    }
}

/// User-facing notices the page can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    ContactSent,
    ContactFailed,
    SectionFailed,
}

impl Notice {
    pub fn kind(self) -> ToastKind {
        match self {
            Notice::ContactSent => ToastKind::Success,
            Notice::ContactFailed | Notice::SectionFailed => ToastKind::Error,
        }
    }

    pub fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Notice::ContactSent, Locale::Es) => "¡Gracias por tu mensaje!",
            (Notice::ContactSent, Locale::En) => "Thanks for your message!",
            (Notice::ContactFailed, Locale::Es) => {
                "Hubo un error al enviar el mensaje. Inténtalo de nuevo."
            }
            (Notice::ContactFailed, Locale::En) => {
                "There was an error sending your message. Please try again."
            }
            (Notice::SectionFailed, Locale::Es) => {
                "No se pudo cargar la sección. Inténtalo de nuevo."
            }
            (Notice::SectionFailed, Locale::En) => "Could not load the section. Please try again.",
        }
    }
}

/// Appends a toast under `#toast-root`, creating the root on demand.
pub fn show_toast(doc: &mut Document, notice: Notice, locale: Locale) -> NodeId {
    let root = match doc.get_element_by_id(TOAST_ROOT_ID) {
        Some(root) => root,
        None => {
            let body = doc.body();
            doc.append_view(
                body,
                &El::new("div")
                    .id(TOAST_ROOT_ID)
                    .class("toast-root")
                    .attr("aria-live", "polite")
                    .build(),
            )
        }
    };
    let kind = notice.kind();
    doc.append_view(
        root,
        &El::new("div")
            .id(&format!("toast-{}", Uuid::new_v4()))
            .class("toast")
            .class(kind.class())
            .attr("role", if kind == ToastKind::Error { "alert" } else { "status" })
            .text(notice.text(locale))
            .build(),
    )
}

pub fn dismiss_toast(doc: &mut Document, toast: NodeId) {
    doc.remove(toast);
}

/// `(kind, text)` of every toast currently shown.
pub fn visible_toasts(doc: &Document) -> Vec<(ToastKind, String)> {
    let Some(root) = doc.get_element_by_id(TOAST_ROOT_ID) else {
        return Vec::new();
    };
    doc.element_children(root)
        .into_iter()
        .map(|t| {
            let kind = if doc.has_class(t, ToastKind::Error.class()) {
                ToastKind::Error
            } else {
                ToastKind::Success
            };
            (kind, doc.text_content(t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_root_created_once() {
        let mut doc = Document::new();
        let first = show_toast(&mut doc, Notice::ContactSent, Locale::Es);
        show_toast(&mut doc, Notice::SectionFailed, Locale::En);
        assert_eq!(doc.find_by_class(doc.root(), "toast-root").len(), 1);
        assert_eq!(
            visible_toasts(&doc),
            vec![
                (ToastKind::Success, "¡Gracias por tu mensaje!".to_string()),
                (ToastKind::Error, "Could not load the section. Please try again.".to_string()),
            ]
        );
        dismiss_toast(&mut doc, first);
        assert_eq!(visible_toasts(&doc).len(), 1);
    }
}
