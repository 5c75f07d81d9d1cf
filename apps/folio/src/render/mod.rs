//! Locale Renderer: rewrites every text-bearing region for one locale.
//!
//! Rendering is a pure function of (page, content snapshot, locale): running
//! it twice produces the same tree. Any block whose data is missing is left
//! as it was; nothing here returns an error.

pub mod tech;
pub mod theme;
pub mod views;

use tracing::debug;

use crate::dom::{Document, NodeId, RenderTarget};
use crate::models::{ContentDocument, Locale};

pub const GLITCH_CLASS: &str = "glitch";
pub const HIDDEN_CLASS: &str = "hidden";
pub const SELECTED_CLASS: &str = "selected";

pub const PERSONAL_INFO_ID: &str = "personal-info-content";
pub const EXPERIENCE_ID: &str = "experience-content";
pub const PROJECTS_ID: &str = "projects-content";
pub const HERO_PHOTO_ID: &str = "hero-photo";

fn hero_id(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "hero-text-es",
        Locale::En => "hero-text-en",
    }
}

fn label_class(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "label-es",
        Locale::En => "label-en",
    }
}

pub fn lang_button_id(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "lang-es",
        Locale::En => "lang-en",
    }
}

pub fn cv_link_id(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "download-cv-es",
        Locale::En => "download-cv-en",
    }
}

/// What a render pass touched.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderReport {
    /// Nodes that received the glitch class and need it removed later.
    pub glitched: Vec<NodeId>,
    /// `[data-key]` nodes whose text was replaced.
    pub rewritten: usize,
}

impl RenderReport {
    fn merge(&mut self, other: RenderReport) {
        self.glitched.extend(other.glitched);
        self.rewritten += other.rewritten;
    }
}

/// Full-page render for `locale`.
pub fn render(
    doc: &mut Document,
    content: Option<&ContentDocument>,
    locale: Locale,
    animate: bool,
) -> RenderReport {
    let mut report = RenderReport::default();

    let root = doc.root();
    doc.set_attr(root, "lang", locale.code());

    for candidate in Locale::ALL {
        if let Some(hero) = doc.get_element_by_id(hero_id(candidate)) {
            let visible = candidate == locale;
            doc.toggle_class(hero, HIDDEN_CLASS, !visible);
            if visible && animate {
                for child in doc.element_children(hero) {
                    glitch(doc, child, &mut report);
                }
            }
        }

        let visible = candidate == locale;
        for label in doc.find_by_class(root, label_class(candidate)) {
            doc.toggle_class(label, HIDDEN_CLASS, !visible);
            if visible && animate {
                glitch(doc, label, &mut report);
            }
        }
    }

    report.merge(render_scope(doc, content, locale, root, animate));
    update_lang_buttons(doc, locale);

    debug!(
        "Rendered locale {locale}: {} keyed nodes, {} glitched",
        report.rewritten,
        report.glitched.len()
    );
    report
}

/// Renders only the subtree under `scope`, without animation. Used for
/// freshly injected section fragments.
pub fn render_subtree(
    doc: &mut Document,
    content: Option<&ContentDocument>,
    locale: Locale,
    scope: NodeId,
) -> RenderReport {
    render_scope(doc, content, locale, scope, false)
}

fn render_scope(
    doc: &mut Document,
    content: Option<&ContentDocument>,
    locale: Locale,
    scope: NodeId,
    animate: bool,
) -> RenderReport {
    let mut report = RenderReport::default();
    let Some(content) = content else {
        return report;
    };

    if let Some(section) = content.locale(locale) {
        let changed =
            doc.render_locale_text(scope, &|key| section.text(key).map(str::to_string));
        report.rewritten = changed.len();
        if animate {
            for id in changed {
                glitch(doc, id, &mut report);
            }
        }

        if find_in(doc, scope, PERSONAL_INFO_ID).is_some() {
            let education = section.education();
            let blocks = views::personal_info(
                locale,
                section.bio().as_deref(),
                education.as_ref(),
                &section.skills(),
            );
            if !blocks.is_empty() {
                doc.render_section(PERSONAL_INFO_ID, &blocks);
            }
        }

        if find_in(doc, scope, EXPERIENCE_ID).is_some() {
            if let Some(items) = section.experience() {
                doc.render_section(EXPERIENCE_ID, &views::experience_cards(&items));
            }
        }

        if find_in(doc, scope, PROJECTS_ID).is_some() {
            if let Some(projects) = section.projects() {
                let grid = if projects.is_empty() {
                    Vec::new()
                } else {
                    let cta = section
                        .text("project_cta")
                        .unwrap_or_else(|| views::project_cta_label(locale));
                    vec![views::project_grid(&projects, cta)]
                };
                doc.render_section(PROJECTS_ID, &grid);
            }
        }
    }

    let cv_links = content.cv_links();
    for candidate in Locale::ALL {
        if let (Some(anchor), Some(url)) =
            (find_in(doc, scope, cv_link_id(candidate)), cv_links.get(candidate))
        {
            doc.set_attr(anchor, "href", &crate::dom::view::safe_url(url));
            doc.set_attr(anchor, "download", "");
        }
    }

    if let Some(photo) = find_in(doc, scope, HERO_PHOTO_ID) {
        match content.hero_photo_for(locale) {
            Some(src) => {
                doc.set_attr(photo, "src", &crate::dom::view::safe_url(src));
                doc.remove_class(photo, HIDDEN_CLASS);
            }
            None => doc.add_class(photo, HIDDEN_CLASS),
        }
    }

    report
}

/// Exactly one language button ends up selected.
pub fn update_lang_buttons(doc: &mut Document, locale: Locale) {
    for candidate in Locale::ALL {
        if let Some(button) = doc.get_element_by_id(lang_button_id(candidate)) {
            let selected = candidate == locale;
            doc.toggle_class(button, SELECTED_CLASS, selected);
            doc.set_attr(button, "aria-pressed", if selected { "true" } else { "false" });
        }
    }
}

/// Removes the glitch class from nodes that still exist.
pub fn clear_glitch(doc: &mut Document, nodes: &[NodeId]) {
    for &id in nodes {
        doc.remove_class(id, GLITCH_CLASS);
    }
}

fn glitch(doc: &mut Document, id: NodeId, report: &mut RenderReport) {
    doc.add_class(id, GLITCH_CLASS);
    if !report.glitched.contains(&id) {
        report.glitched.push(id);
    }
}

fn find_in(doc: &Document, scope: NodeId, element_id: &str) -> Option<NodeId> {
    doc.find_first(scope, |d, id| d.attr(id, "id") == Some(element_id))
}
