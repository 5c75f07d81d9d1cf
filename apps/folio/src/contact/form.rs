//! Form Handler: intercepts contact form submission.
//!
//! `attach` is idempotent per form element via a marker attribute. The
//! submission itself is split so the page lock is not held across the POST:
//! `prepare` serializes fields, the caller awaits the submitter, `finish`
//! applies the outcome.

use serde::Serialize;
use tracing::{info, warn};

use crate::dom::{Document, NodeId};
use crate::models::Locale;
use crate::notify::{show_toast, Notice};
use crate::source::SubmitError;

pub const CONTACT_FORM_ID: &str = "contact-form";
pub const BOUND_ATTR: &str = "data-submit-bound";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Sent,
    Failed,
    /// The form was never attached; the submission is not intercepted.
    NotIntercepted,
}

/// Marks the form as intercepted. Returns false if it already was.
pub fn attach(doc: &mut Document, form: NodeId) -> bool {
    if doc.tag(form) != Some("form") || is_attached(doc, form) {
        return false;
    }
    doc.set_attr(form, BOUND_ATTR, "true");
    true
}

pub fn is_attached(doc: &Document, form: NodeId) -> bool {
    doc.attr(form, BOUND_ATTR) == Some("true")
}

/// Attaches every `<form>` under `scope`; returns how many were newly bound.
pub fn attach_all(doc: &mut Document, scope: NodeId) -> usize {
    doc.find_by_tag(scope, "form")
        .into_iter()
        .filter(|&form| attach(doc, form))
        .count()
}

fn fields(doc: &Document, form: NodeId) -> Vec<NodeId> {
    doc.find_all(form, |d, id| {
        matches!(d.tag(id), Some("input") | Some("textarea") | Some("select"))
            && d.attr(id, "name").map(|n| !n.is_empty()).unwrap_or(false)
    })
}

fn input_type(doc: &Document, id: NodeId) -> String {
    doc.attr(id, "type").unwrap_or("text").to_ascii_lowercase()
}

/// Named field values in document order, the way a browser builds form data.
pub fn serialize_form(doc: &Document, form: NodeId) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for field in fields(doc, form) {
        if doc.has_attr(field, "disabled") {
            continue;
        }
        let name = doc.attr(field, "name").unwrap_or_default().to_string();
        let value = match doc.tag(field) {
            Some("textarea") => doc.text_content(field),
            Some("select") => {
                let options = doc.find_by_tag(field, "option");
                let chosen = options
                    .iter()
                    .copied()
                    .find(|&o| doc.has_attr(o, "selected"))
                    .or_else(|| options.first().copied());
                match chosen {
                    Some(option) => doc
                        .attr(option, "value")
                        .map(str::to_string)
                        .unwrap_or_else(|| doc.text_content(option)),
                    None => continue,
                }
            }
            _ => match input_type(doc, field).as_str() {
                "submit" | "button" | "reset" | "image" | "file" => continue,
                "checkbox" | "radio" => {
                    if !doc.has_attr(field, "checked") {
                        continue;
                    }
                    doc.attr(field, "value").unwrap_or("on").to_string()
                }
                _ => doc.attr(field, "value").unwrap_or_default().to_string(),
            },
        };
        out.push((name, value));
    }
    out
}

/// Sets the live value of the named field. Returns false if no such field.
pub fn set_field(doc: &mut Document, form: NodeId, name: &str, value: &str) -> bool {
    let Some(field) = fields(doc, form)
        .into_iter()
        .find(|&f| doc.attr(f, "name") == Some(name))
    else {
        return false;
    };
    match doc.tag(field) {
        Some("textarea") => doc.set_text(field, value),
        Some("select") => {
            for option in doc.find_by_tag(field, "option") {
                let matches = doc.attr(option, "value").map(str::to_string)
                    .unwrap_or_else(|| doc.text_content(option))
                    == value;
                if matches {
                    doc.set_attr(option, "selected", "");
                } else {
                    doc.remove_attr(option, "selected");
                }
            }
        }
        _ => match input_type(doc, field).as_str() {
            "checkbox" | "radio" => {
                if value.is_empty() || value == "false" {
                    doc.remove_attr(field, "checked");
                } else {
                    doc.set_attr(field, "checked", "");
                }
            }
            _ => doc.set_attr(field, "value", value),
        },
    }
    true
}

/// Clears every field.
pub fn reset_form(doc: &mut Document, form: NodeId) {
    for field in fields(doc, form) {
        match doc.tag(field) {
            Some("textarea") => doc.clear_children(field),
            Some("select") => {
                for option in doc.find_by_tag(field, "option") {
                    doc.remove_attr(option, "selected");
                }
            }
            _ => match input_type(doc, field).as_str() {
                "submit" | "button" | "reset" | "image" => {}
                "checkbox" | "radio" => doc.remove_attr(field, "checked"),
                _ => doc.remove_attr(field, "value"),
            },
        }
    }
}

/// Serialized fields if the form intercepts submissions, `None` otherwise.
pub fn prepare(doc: &Document, form: NodeId) -> Option<Vec<(String, String)>> {
    if !is_attached(doc, form) {
        warn!("Submit on a form without a handler; not intercepted");
        return None;
    }
    Some(serialize_form(doc, form))
}

/// Applies the submission result: success clears the form, failure keeps
/// the user's input. Both raise a toast.
pub fn finish(
    doc: &mut Document,
    form: NodeId,
    result: &Result<(), SubmitError>,
    locale: Locale,
) -> SubmitOutcome {
    match result {
        Ok(()) => {
            info!("Contact form delivered");
            reset_form(doc, form);
            show_toast(doc, Notice::ContactSent, locale);
            SubmitOutcome::Sent
        }
        Err(e) => {
            warn!("Contact form submission failed: {e}");
            show_toast(doc, Notice::ContactFailed, locale);
            SubmitOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{visible_toasts, ToastKind};

    const FORM: &str = r#"<body><form id="contact-form" action="https://formspree.io/f/x">
        <input type="text" name="name" value="Ana">
        <input type="email" name="email" value="ana@example.com">
        <input type="checkbox" name="newsletter" checked>
        <input type="checkbox" name="terms">
        <select name="topic"><option value="job">Job</option><option value="hi" selected>Hi</option></select>
        <textarea name="message">Hola!</textarea>
        <input type="submit" value="Send">
    </form></body>"#;

    fn page() -> (Document, NodeId) {
        let doc = Document::from_html(FORM).unwrap();
        let form = doc.get_element_by_id(CONTACT_FORM_ID).unwrap();
        (doc, form)
    }

    #[test]
    fn test_attach_is_idempotent() {
        let (mut doc, form) = page();
        assert!(attach(&mut doc, form));
        assert!(!attach(&mut doc, form));
        let root = doc.root();
        assert_eq!(attach_all(&mut doc, root), 0);
    }

    #[test]
    fn test_serialize_matches_browser_form_data() {
        let (doc, form) = page();
        assert_eq!(
            serialize_form(&doc, form),
            vec![
                ("name".to_string(), "Ana".to_string()),
                ("email".to_string(), "ana@example.com".to_string()),
                ("newsletter".to_string(), "on".to_string()),
                ("topic".to_string(), "hi".to_string()),
                ("message".to_string(), "Hola!".to_string()),
            ]
        );
    }

    #[test]
    fn test_unattached_form_is_not_intercepted() {
        let (doc, form) = page();
        assert_eq!(prepare(&doc, form), None);
    }

    #[test]
    fn test_failure_keeps_input_and_shows_error() {
        let (mut doc, form) = page();
        attach(&mut doc, form);
        let before = prepare(&doc, form).unwrap();
        let outcome = finish(&mut doc, form, &Err(SubmitError::Rejected(500)), Locale::Es);
        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(serialize_form(&doc, form), before);
        assert_eq!(visible_toasts(&doc)[0].0, ToastKind::Error);
    }

    #[test]
    fn test_success_clears_fields_and_shows_confirmation() {
        let (mut doc, form) = page();
        attach(&mut doc, form);
        let outcome = finish(&mut doc, form, &Ok(()), Locale::En);
        assert_eq!(outcome, SubmitOutcome::Sent);
        assert_eq!(
            serialize_form(&doc, form),
            vec![
                ("name".to_string(), String::new()),
                ("email".to_string(), String::new()),
                ("topic".to_string(), "job".to_string()),
                ("message".to_string(), String::new()),
            ]
        );
        assert_eq!(
            visible_toasts(&doc),
            vec![(ToastKind::Success, "Thanks for your message!".to_string())]
        );
    }

    #[test]
    fn test_set_field_updates_each_kind() {
        let (mut doc, form) = page();
        assert!(set_field(&mut doc, form, "message", "New text"));
        assert!(set_field(&mut doc, form, "topic", "job"));
        assert!(set_field(&mut doc, form, "terms", "on"));
        assert!(!set_field(&mut doc, form, "nope", "x"));
        let data = serialize_form(&doc, form);
        assert!(data.contains(&("message".to_string(), "New text".to_string())));
        assert!(data.contains(&("topic".to_string(), "job".to_string())));
        assert!(data.contains(&("terms".to_string(), "on".to_string())));
    }
}
