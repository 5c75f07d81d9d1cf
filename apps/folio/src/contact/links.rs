//! Contact Link Binder: wires the fixed contact anchors to the content
//! document's contact fields.
//!
//! Binding marks each anchor (`data-contact`, `data-contact-bound`) and sets
//! its `href`. Clicks are resolved by walking up from the clicked node, so
//! anchors that arrived with a swapped fragment and were never bound still
//! work through the delegated path.

use serde::Serialize;
use tracing::debug;

use crate::dom::view::safe_url;
use crate::dom::{Document, Effect, NodeId};
use crate::models::ContactInfo;

/// Section the about-me email anchor redirects to.
pub const CONTACT_SECTION: &str = "contacto";

const BOUND_ATTR: &str = "data-contact-bound";
const CHANNEL_ATTR: &str = "data-contact";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Linkedin,
    Github,
    AboutEmail,
}

impl Channel {
    fn code(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Linkedin => "linkedin",
            Channel::Github => "github",
            Channel::AboutEmail => "about-email",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "email" => Some(Channel::Email),
            "linkedin" => Some(Channel::Linkedin),
            "github" => Some(Channel::Github),
            "about-email" => Some(Channel::AboutEmail),
            _ => None,
        }
    }
}

const ANCHORS: &[(&str, Channel)] = &[
    ("contact-email", Channel::Email),
    ("footer-email", Channel::Email),
    ("contact-linkedin", Channel::Linkedin),
    ("footer-linkedin", Channel::Linkedin),
    ("contact-github", Channel::Github),
    ("footer-github", Channel::Github),
    ("about-email", Channel::AboutEmail),
];

/// What a contact click does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum LinkAction {
    Mailto(String),
    OpenExternal(String),
    OpenSection(String),
}

fn action_for(channel: Channel, info: &ContactInfo) -> Option<LinkAction> {
    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    match channel {
        Channel::Email => present(&info.email).map(|e| LinkAction::Mailto(format!("mailto:{e}"))),
        Channel::Linkedin => {
            present(&info.linkedin).map(|u| LinkAction::OpenExternal(safe_url(&u)))
        }
        Channel::Github => present(&info.github).map(|u| LinkAction::OpenExternal(safe_url(&u))),
        Channel::AboutEmail => Some(LinkAction::OpenSection(CONTACT_SECTION.to_string())),
    }
}

/// Binds every known contact anchor present in the page. Returns the number
/// of anchors bound. Anchors whose contact field is missing are left alone.
pub fn bind_contact_links(doc: &mut Document, info: &ContactInfo) -> usize {
    let mut bound = 0;
    for &(element_id, channel) in ANCHORS {
        let Some(anchor) = doc.get_element_by_id(element_id) else {
            continue;
        };
        let Some(action) = action_for(channel, info) else {
            continue;
        };
        doc.set_attr(anchor, CHANNEL_ATTR, channel.code());
        match &action {
            LinkAction::Mailto(url) => doc.set_attr(anchor, "href", url),
            LinkAction::OpenExternal(url) => {
                doc.set_attr(anchor, "href", url);
                doc.set_attr(anchor, "target", "_blank");
                doc.set_attr(anchor, "rel", "noopener noreferrer");
            }
            LinkAction::OpenSection(section) => {
                doc.set_attr(anchor, "href", &format!("#{section}"))
            }
        }
        doc.set_attr(anchor, BOUND_ATTR, "true");
        bound += 1;
    }
    bound
}

fn channel_of(doc: &Document, id: NodeId) -> Option<Channel> {
    if let Some(channel) = doc.attr(id, CHANNEL_ATTR).and_then(Channel::from_code) {
        return Some(channel);
    }
    let element_id = doc.attr(id, "id")?;
    ANCHORS
        .iter()
        .find(|(known, _)| *known == element_id)
        .map(|&(_, channel)| channel)
}

/// Resolves a click on `node` (or any descendant of a contact anchor).
pub fn resolve_click(doc: &Document, node: NodeId, info: &ContactInfo) -> Option<LinkAction> {
    for candidate in doc.ancestors(node) {
        if let Some(channel) = channel_of(doc, candidate) {
            let delegated = !doc.has_attr(candidate, BOUND_ATTR);
            debug!(
                "Contact click on {} ({})",
                channel.code(),
                if delegated { "delegated" } else { "bound" }
            );
            return action_for(channel, info);
        }
    }
    None
}

/// Records the browser effect of a mailto/external action. Section
/// redirects are returned for the navigator to handle.
pub fn perform(doc: &mut Document, action: &LinkAction) -> Option<String> {
    match action {
        LinkAction::Mailto(url) => {
            doc.push_effect(Effect::Navigate { url: url.clone() });
            None
        }
        LinkAction::OpenExternal(url) => {
            doc.push_effect(Effect::OpenWindow {
                url: url.clone(),
                target: "_blank".to_string(),
            });
            None
        }
        LinkAction::OpenSection(section) => Some(section.clone()),
    }
}
