//! CV-download modal. Sits on top of whatever the navigator is showing and
//! never touches the collapse/section state.

use crate::dom::{Document, El};
use crate::models::{CvLinks, Locale};

pub const MODAL_ID: &str = "cv-download-modal";
pub const MODAL_OPEN_CLASS: &str = "modal-open";
const SAVED_ARIA: &str = "data-modal-saved-aria-hidden";

/// How the modal was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Button,
    Backdrop,
    EscapeKey,
}

fn labels(locale: Locale) -> (&'static str, &'static str) {
    match locale {
        Locale::Es => ("Descargar CV", "Cerrar"),
        Locale::En => ("Download CV", "Close"),
    }
}

fn language_name(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "Español",
        Locale::En => "English",
    }
}

pub fn is_open(doc: &Document) -> bool {
    doc.get_element_by_id(MODAL_ID).is_some()
}

/// Shows the modal with one download link per configured CV. Opening an
/// already open modal is a no-op.
pub fn open(doc: &mut Document, links: &CvLinks, locale: Locale) {
    if is_open(doc) {
        return;
    }
    let (title, close) = labels(locale);
    let modal = El::new("div")
        .id(MODAL_ID)
        .class("modal")
        .attr("role", "dialog")
        .attr("aria-modal", "true")
        .attr("aria-labelledby", "cv-modal-title")
        .child(
            El::new("div")
                .id("cv-modal-backdrop")
                .class("modal-backdrop")
                .attr("data-modal-close", "backdrop"),
        )
        .child(
            El::new("div")
                .class("modal-panel")
                .child(El::new("h2").id("cv-modal-title").text(title))
                .children(links.configured().into_iter().map(|(l, url)| {
                    El::new("a")
                        .class("modal-download")
                        .attr("href", url)
                        .attr("download", "")
                        .attr("data-cv-locale", l.code())
                        .text(language_name(l))
                }))
                .child(
                    El::new("button")
                        .id("cv-modal-close")
                        .class("modal-close")
                        .attr("type", "button")
                        .attr("data-modal-close", "button")
                        .attr("aria-label", close)
                        .text("×"),
                ),
        )
        .build();
    let body = doc.body();
    doc.append_view(body, &modal);
    doc.add_class(body, MODAL_OPEN_CLASS);

    for region in chrome(doc) {
        if let Some(previous) = doc.attr(region, "aria-hidden").map(str::to_string) {
            doc.set_attr(region, SAVED_ARIA, &previous);
        }
        doc.set_attr(region, "aria-hidden", "true");
        doc.set_attr(region, "inert", "");
    }
}

/// Removes the modal and restores header/nav accessibility attributes.
/// Returns false when no modal was open.
pub fn close(doc: &mut Document) -> bool {
    let Some(modal) = doc.get_element_by_id(MODAL_ID) else {
        return false;
    };
    doc.remove(modal);
    let body = doc.body();
    doc.remove_class(body, MODAL_OPEN_CLASS);

    for region in chrome(doc) {
        match doc.attr(region, SAVED_ARIA).map(str::to_string) {
            Some(previous) => {
                doc.set_attr(region, "aria-hidden", &previous);
                doc.remove_attr(region, SAVED_ARIA);
            }
            None => doc.remove_attr(region, "aria-hidden"),
        }
        doc.remove_attr(region, "inert");
    }
    true
}

fn chrome(doc: &Document) -> Vec<crate::dom::NodeId> {
    doc.find_all(doc.root(), |d, id| matches!(d.tag(id), Some("header") | Some("nav")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both() -> CvLinks {
        CvLinks {
            es: Some("cv/es.pdf".into()),
            en: Some("cv/en.pdf".into()),
        }
    }

    #[test]
    fn test_open_then_close_restores_chrome() {
        let mut doc = Document::from_html(
            r#"<body><header aria-hidden="false"></header><nav></nav></body>"#,
        )
        .unwrap();
        let header = doc.find_by_tag(doc.root(), "header")[0];
        let nav = doc.find_by_tag(doc.root(), "nav")[0];

        open(&mut doc, &both(), Locale::En);
        assert!(is_open(&doc));
        assert!(doc.has_class(doc.body(), MODAL_OPEN_CLASS));
        assert_eq!(doc.attr(header, "aria-hidden"), Some("true"));
        assert_eq!(doc.attr(nav, "aria-hidden"), Some("true"));
        assert_eq!(doc.find_by_class(doc.root(), "modal-download").len(), 2);

        assert!(close(&mut doc));
        assert!(!is_open(&doc));
        assert!(!doc.has_class(doc.body(), MODAL_OPEN_CLASS));
        assert_eq!(doc.attr(header, "aria-hidden"), Some("false"));
        assert_eq!(doc.attr(nav, "aria-hidden"), None);
        assert!(!doc.has_attr(nav, "inert"));
        assert!(!close(&mut doc));
    }

    #[test]
    fn test_open_twice_keeps_single_modal() {
        let mut doc = Document::new();
        open(&mut doc, &both(), Locale::Es);
        open(&mut doc, &both(), Locale::Es);
        assert_eq!(doc.find_by_class(doc.root(), "modal").len(), 1);
    }
}
