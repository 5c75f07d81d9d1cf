//! Section Navigator: the view state machine.
//!
//! Phases: `Hero` → `Loading` → `SectionVisible`, with `Transitioning` when
//! swapping one visible section for another. The CV modal is orthogonal.
//!
//! The navigator only mutates the page synchronously. Every suspension point
//! (fragment fetch, transition waits, deferred return-home steps) is driven
//! by the caller between calls, which is what lets `is_loading` act as the
//! single mutual-exclusion guard for fragment loads.

pub mod modal;
pub mod timing;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dom::{Document, Effect, El, NodeId, ParseError};
use crate::models::{CvLinks, Locale, NavPhase, ViewState};
use crate::notify::{show_toast, Notice};

pub use modal::CloseReason;
pub use timing::Timings;

pub const SECTION_CONTAINER_ID: &str = "section-container";
pub const CONTENT_SECTION_CLASS: &str = "content-section";
pub const COLLAPSED_CLASS: &str = "collapsed";
pub const NAV_LINK_CLASS: &str = "nav-link";
pub const ACTIVE_CLASS: &str = "active";
pub const DISABLED_CLASS: &str = "disabled";
pub const VISIBLE_CLASS: &str = "section-visible";
pub const LEAVING_CLASS: &str = "section-leaving";
pub const OUT_CLASS: &str = "section-out";
/// Nav target that triggers the CV download instead of a section load.
pub const CV_NAV_TARGET: &str = "descargaCV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// A fragment fetch is already in flight.
    Busy,
    /// The requested section is already on screen.
    AlreadyVisible,
    /// The name cannot map to a fragment path.
    InvalidSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CvAction {
    Download { url: String },
    ModalOpened,
    Unavailable,
}

/// What the caller must do after a nav click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand {
    Ignored(IgnoreReason),
    /// Fetch `path`; if `hide` is set, first wait for that node's hide transition.
    Fetch {
        section: String,
        path: String,
        hide: Option<NodeId>,
    },
    Cv(CvAction),
}

#[derive(Debug, Clone)]
pub struct Navigator {
    state: ViewState,
    phase: NavPhase,
    /// Bumped whenever a navigation starts; deferred steps carry the value
    /// they were scheduled under and are dropped if it moved on.
    epoch: u64,
    partials_dir: String,
}

fn valid_section_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Navigator {
    pub fn new(locale: Locale, partials_dir: &str) -> Self {
        Self {
            state: ViewState::new(locale),
            phase: NavPhase::Hero,
            epoch: 0,
            partials_dir: partials_dir.trim_matches('/').to_string(),
        }
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }

    pub fn phase(&self) -> &NavPhase {
        &self.phase
    }

    pub fn locale(&self) -> Locale {
        self.state.current_lang
    }

    /// Returns false when `locale` is already current.
    pub fn set_locale(&mut self, locale: Locale) -> bool {
        if self.state.current_lang == locale {
            return false;
        }
        self.state.current_lang = locale;
        true
    }

    pub fn fragment_path(&self, section: &str) -> String {
        if self.partials_dir.is_empty() {
            format!("{section}.html")
        } else {
            format!("{}/{section}.html", self.partials_dir)
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Navigation
    // ────────────────────────────────────────────────────────────────────────

    pub fn click_nav(&mut self, doc: &mut Document, name: &str, cv_links: &CvLinks) -> NavCommand {
        let name = name.trim_start_matches('#');
        if name == CV_NAV_TARGET {
            return NavCommand::Cv(self.click_download_cv(doc, cv_links));
        }
        if self.state.is_loading {
            debug!("Nav to '{name}' ignored: fetch in flight");
            return NavCommand::Ignored(IgnoreReason::Busy);
        }
        if !valid_section_name(name) {
            warn!("Nav to invalid section name {name:?}");
            return NavCommand::Ignored(IgnoreReason::InvalidSection);
        }
        if matches!(&self.phase, NavPhase::SectionVisible { section } if section == name) {
            return NavCommand::Ignored(IgnoreReason::AlreadyVisible);
        }

        self.epoch += 1;
        self.state.is_loading = true;
        set_nav_enabled(doc, false);
        let body = doc.body();
        doc.add_class(body, COLLAPSED_CLASS);

        let hide = match std::mem::replace(&mut self.phase, NavPhase::Hero) {
            NavPhase::SectionVisible { section: from } => {
                let current = current_section_root(doc);
                if let Some(root) = current {
                    doc.remove_class(root, VISIBLE_CLASS);
                    doc.add_class(root, LEAVING_CLASS);
                }
                self.phase = NavPhase::Transitioning {
                    from,
                    to: name.to_string(),
                };
                current
            }
            _ => {
                self.phase = NavPhase::Loading {
                    section: name.to_string(),
                };
                None
            }
        };

        info!("Loading section '{name}'");
        NavCommand::Fetch {
            section: name.to_string(),
            path: self.fragment_path(name),
            hide,
        }
    }

    /// Injects a fetched fragment. `prepare` runs on the new section root
    /// before it is revealed (locale render, link binding, form attach).
    /// On a parse error the page is left untouched and the caller reports the
    /// failure through [`Navigator::fragment_failed`].
    pub fn fragment_loaded<F>(
        &mut self,
        doc: &mut Document,
        section: &str,
        html: &str,
        prepare: F,
    ) -> Result<NodeId, ParseError>
    where
        F: FnOnce(&mut Document, NodeId),
    {
        if self.phase.pending_section() != Some(section) {
            warn!("Fragment for '{section}' arrived outside a pending load; dropped");
            return Err(ParseError {
                position: 0,
                message: format!("no pending load for section '{section}'"),
            });
        }

        // Parsed off-tree first so a bad fragment leaves the current section alone.
        let holder = doc.create_element("template");
        let top = match doc.append_html(holder, html) {
            Ok(top) => top,
            Err(e) => {
                doc.remove(holder);
                return Err(e);
            }
        };

        let container = ensure_container(doc);
        doc.clear_children(container);
        doc.remove_class(container, OUT_CLASS);
        doc.remove_class(container, crate::render::HIDDEN_CLASS);
        for &id in &top {
            doc.append_child(container, id);
        }
        doc.remove(holder);

        let root = match doc.find_first(container, |d, id| {
            id != container && d.has_class(id, CONTENT_SECTION_CLASS)
        }) {
            Some(root) => root,
            None => {
                let elements: Vec<NodeId> =
                    top.iter().copied().filter(|&id| doc.tag(id).is_some()).collect();
                if elements.len() == 1 && top.iter().all(|&id| {
                    doc.tag(id).is_some() || doc.text_content(id).trim().is_empty()
                }) {
                    doc.add_class(elements[0], CONTENT_SECTION_CLASS);
                    elements[0]
                } else {
                    let wrapper = doc.append_view(
                        container,
                        &El::new("section").class(CONTENT_SECTION_CLASS).build(),
                    );
                    for id in top {
                        doc.append_child(wrapper, id);
                    }
                    wrapper
                }
            }
        };
        doc.set_attr(root, "data-section", section);

        prepare(doc, root);

        doc.add_class(root, VISIBLE_CLASS);
        let target = doc
            .attr(root, "id")
            .map(|id| format!("#{id}"))
            .unwrap_or_else(|| format!("[data-section={section}]"));
        doc.push_effect(Effect::ScrollIntoView { target });

        mark_active_link(doc, Some(section));
        set_nav_enabled(doc, true);
        self.state.is_loading = false;
        self.state.active_section = Some(section.to_string());
        self.phase = NavPhase::SectionVisible {
            section: section.to_string(),
        };
        info!("Section '{section}' visible");
        Ok(root)
    }

    /// Fetch failed: error toast, nav re-enabled, previous stable phase kept.
    /// The collapsed/expanded state is not touched. Returns the toast node.
    pub fn fragment_failed(&mut self, doc: &mut Document, section: &str) -> NodeId {
        warn!("Section '{section}' failed to load");
        let toast = show_toast(doc, Notice::SectionFailed, self.state.current_lang);
        set_nav_enabled(doc, true);
        self.state.is_loading = false;

        self.phase = match std::mem::replace(&mut self.phase, NavPhase::Hero) {
            NavPhase::Transitioning { from, .. } => {
                if let Some(root) = current_section_root(doc) {
                    doc.remove_class(root, LEAVING_CLASS);
                    doc.add_class(root, VISIBLE_CLASS);
                }
                NavPhase::SectionVisible { section: from }
            }
            NavPhase::Loading { .. } => NavPhase::Hero,
            other => other,
        };
        toast
    }

    // ────────────────────────────────────────────────────────────────────────
    // Return to hero
    // ────────────────────────────────────────────────────────────────────────

    /// Starts the return to the hero view. Returns the ticket to pass to the
    /// two deferred steps, or `None` while a fragment load is in flight.
    pub fn click_page_title(&mut self, doc: &mut Document) -> Option<u64> {
        if self.state.is_loading {
            debug!("Page title click ignored: fetch in flight");
            return None;
        }
        self.epoch += 1;
        let body = doc.body();
        doc.remove_class(body, COLLAPSED_CLASS);
        if let Some(container) = doc.get_element_by_id(SECTION_CONTAINER_ID) {
            doc.add_class(container, OUT_CLASS);
        }
        mark_active_link(doc, None);
        self.state.active_section = None;
        self.phase = NavPhase::Hero;
        Some(self.epoch)
    }

    /// First deferred step: hide the overlay. Skipped if navigation moved on.
    pub fn finish_home_fade(&mut self, doc: &mut Document, ticket: u64) -> bool {
        if ticket != self.epoch {
            return false;
        }
        if let Some(container) = doc.get_element_by_id(SECTION_CONTAINER_ID) {
            doc.add_class(container, crate::render::HIDDEN_CLASS);
        }
        true
    }

    /// Second deferred step: drop the injected subtree.
    pub fn finish_home_clear(&mut self, doc: &mut Document, ticket: u64) -> bool {
        if ticket != self.epoch {
            return false;
        }
        if let Some(container) = doc.get_element_by_id(SECTION_CONTAINER_ID) {
            doc.clear_children(container);
            doc.remove_class(container, OUT_CLASS);
        }
        true
    }

    // ────────────────────────────────────────────────────────────────────────
    // CV download & modal
    // ────────────────────────────────────────────────────────────────────────

    /// One CV configured → direct download; both → modal. Collapse and
    /// section state are untouched either way.
    pub fn click_download_cv(&mut self, doc: &mut Document, cv_links: &CvLinks) -> CvAction {
        let configured = cv_links.configured();
        match configured.as_slice() {
            [] => {
                warn!("CV download requested but no CV link is configured");
                CvAction::Unavailable
            }
            [(_, url)] => {
                let url = crate::dom::view::safe_url(url);
                doc.push_effect(Effect::Download { url: url.clone() });
                CvAction::Download { url }
            }
            _ => {
                modal::open(doc, cv_links, self.state.current_lang);
                CvAction::ModalOpened
            }
        }
    }

    pub fn close_modal(&mut self, doc: &mut Document, reason: CloseReason) -> bool {
        let closed = modal::close(doc);
        if closed {
            debug!("CV modal closed ({reason:?})");
        }
        closed
    }

    /// Keyboard handling: Escape closes the modal.
    pub fn key_pressed(&mut self, doc: &mut Document, key: &str) -> bool {
        key == "Escape" && self.close_modal(doc, CloseReason::EscapeKey)
    }
}

fn current_section_root(doc: &Document) -> Option<NodeId> {
    let container = doc.get_element_by_id(SECTION_CONTAINER_ID)?;
    doc.find_first(container, |d, id| {
        id != container && d.has_class(id, CONTENT_SECTION_CLASS)
    })
}

fn ensure_container(doc: &mut Document) -> NodeId {
    if let Some(container) = doc.get_element_by_id(SECTION_CONTAINER_ID) {
        return container;
    }
    let parent = doc
        .find_by_tag(doc.root(), "main")
        .first()
        .copied()
        .unwrap_or_else(|| doc.body());
    doc.append_view(
        parent,
        &El::new("div").id(SECTION_CONTAINER_ID).class("section-container").build(),
    )
}

fn nav_links(doc: &Document) -> Vec<NodeId> {
    doc.find_by_class(doc.root(), NAV_LINK_CLASS)
}

/// Section name a nav link points at (`href="#name"`).
pub fn nav_target(doc: &Document, link: NodeId) -> Option<String> {
    doc.attr(link, "href")?
        .strip_prefix('#')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn set_nav_enabled(doc: &mut Document, enabled: bool) {
    for link in nav_links(doc) {
        doc.toggle_class(link, DISABLED_CLASS, !enabled);
        if enabled {
            doc.remove_attr(link, "aria-disabled");
        } else {
            doc.set_attr(link, "aria-disabled", "true");
        }
    }
}

fn mark_active_link(doc: &mut Document, section: Option<&str>) {
    for link in nav_links(doc) {
        let active = section.is_some() && nav_target(doc, link).as_deref() == section;
        doc.toggle_class(link, ACTIVE_CLASS, active);
        if active {
            doc.set_attr(link, "aria-current", "page");
        } else {
            doc.remove_attr(link, "aria-current");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHELL: &str = r##"<body>
        <header><h1 id="page-title">Ana</h1>
        <nav>
            <a class="nav-link" href="#about">About</a>
            <a class="nav-link" href="#experience">Experience</a>
            <a class="nav-link" href="#descargaCV">CV</a>
        </nav></header>
        <main><div id="section-container"></div></main>
    </body>"##;

    const FRAGMENT: &str =
        r#"<section id="experience" class="content-section"><h2>Experience</h2></section>"#;

    fn setup() -> (Navigator, Document) {
        (
            Navigator::new(Locale::Es, "partials"),
            Document::from_html(SHELL).unwrap(),
        )
    }

    fn links() -> CvLinks {
        CvLinks::default()
    }

    fn open(nav: &mut Navigator, doc: &mut Document, section: &str, html: &str) -> NodeId {
        match nav.click_nav(doc, section, &links()) {
            NavCommand::Fetch { section, .. } => {
                nav.fragment_loaded(doc, &section, html, |_, _| {}).unwrap()
            }
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_click_from_hero_collapses_and_disables_nav() {
        let (mut nav, mut doc) = setup();
        let cmd = nav.click_nav(&mut doc, "experience", &links());
        assert_eq!(
            cmd,
            NavCommand::Fetch {
                section: "experience".into(),
                path: "partials/experience.html".into(),
                hide: None,
            }
        );
        assert!(nav.view_state().is_loading);
        assert!(doc.has_class(doc.body(), COLLAPSED_CLASS));
        assert!(nav_links(&doc).iter().all(|&l| doc.attr(l, "aria-disabled") == Some("true")));
        assert_eq!(nav.phase(), &NavPhase::Loading { section: "experience".into() });
    }

    #[test]
    fn test_second_click_while_loading_is_noop() {
        let (mut nav, mut doc) = setup();
        nav.click_nav(&mut doc, "experience", &links());
        let before = nav.phase().clone();
        assert_eq!(
            nav.click_nav(&mut doc, "about", &links()),
            NavCommand::Ignored(IgnoreReason::Busy)
        );
        assert_eq!(nav.phase(), &before);
    }

    #[test]
    fn test_fragment_loaded_reveals_and_activates_link() {
        let (mut nav, mut doc) = setup();
        let mut prepared = None;
        nav.click_nav(&mut doc, "experience", &links());
        let root = nav
            .fragment_loaded(&mut doc, "experience", FRAGMENT, |_, root| prepared = Some(root))
            .unwrap();
        assert_eq!(prepared, Some(root));
        assert!(doc.has_class(root, VISIBLE_CLASS));
        assert!(!nav.view_state().is_loading);
        assert_eq!(nav.view_state().active_section.as_deref(), Some("experience"));
        let active: Vec<_> = nav_links(&doc)
            .into_iter()
            .filter(|&l| doc.has_class(l, ACTIVE_CLASS))
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(nav_target(&doc, active[0]).as_deref(), Some("experience"));
        assert!(nav_links(&doc).iter().all(|&l| !doc.has_attr(l, "aria-disabled")));
        assert_eq!(
            doc.effects().last(),
            Some(&Effect::ScrollIntoView { target: "#experience".into() })
        );
    }

    #[test]
    fn test_fragment_without_section_root_is_wrapped() {
        let (mut nav, mut doc) = setup();
        nav.click_nav(&mut doc, "about", &links());
        let root = nav
            .fragment_loaded(&mut doc, "about", "<h2>About</h2><p>text</p>", |_, _| {})
            .unwrap();
        assert_eq!(doc.tag(root), Some("section"));
        assert!(doc.has_class(root, CONTENT_SECTION_CLASS));
        assert_eq!(doc.element_children(root).len(), 2);
    }

    #[test]
    fn test_hand_written_fragment_loads() {
        let (mut nav, mut doc) = setup();
        let html = r#"<section id="about" class="content-section">
            <h2>Sobre m&iacute;</h2>
            <p>R&D team, Tom & Jerry &copy; 2024</p>
            <script>if (a && b < c) { init(); }</script>
        </section>"#;
        let root = open(&mut nav, &mut doc, "about", html);
        assert_eq!(nav.view_state().active_section.as_deref(), Some("about"));
        let children = doc.element_children(root);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.text_content(children[0]), "Sobre mí");
        assert_eq!(doc.text_content(children[1]), "R&D team, Tom & Jerry © 2024");
        assert_eq!(doc.text_content(children[2]), "if (a && b < c) { init(); }");
    }

    #[test]
    fn test_fetch_error_from_hero_keeps_collapse_and_reenables_nav() {
        let (mut nav, mut doc) = setup();
        nav.click_nav(&mut doc, "experience", &links());
        nav.fragment_failed(&mut doc, "experience");
        assert_eq!(nav.phase(), &NavPhase::Hero);
        assert!(!nav.view_state().is_loading);
        assert!(doc.has_class(doc.body(), COLLAPSED_CLASS));
        assert!(nav_links(&doc).iter().all(|&l| !doc.has_class(l, DISABLED_CLASS)));
        assert_eq!(doc.find_by_class(doc.root(), "toast-error").len(), 1);
    }

    #[test]
    fn test_switching_sections_transitions_and_restores_on_failure() {
        let (mut nav, mut doc) = setup();
        let first = open(&mut nav, &mut doc, "experience", FRAGMENT);

        let cmd = nav.click_nav(&mut doc, "about", &links());
        assert_eq!(
            cmd,
            NavCommand::Fetch {
                section: "about".into(),
                path: "partials/about.html".into(),
                hide: Some(first),
            }
        );
        assert!(doc.has_class(first, LEAVING_CLASS));
        assert_eq!(
            nav.phase(),
            &NavPhase::Transitioning { from: "experience".into(), to: "about".into() }
        );

        nav.fragment_failed(&mut doc, "about");
        assert_eq!(nav.phase(), &NavPhase::SectionVisible { section: "experience".into() });
        assert!(doc.has_class(first, VISIBLE_CLASS));
        assert!(!doc.has_class(first, LEAVING_CLASS));
    }

    #[test]
    fn test_same_section_click_is_ignored() {
        let (mut nav, mut doc) = setup();
        open(&mut nav, &mut doc, "experience", FRAGMENT);
        assert_eq!(
            nav.click_nav(&mut doc, "#experience", &links()),
            NavCommand::Ignored(IgnoreReason::AlreadyVisible)
        );
    }

    #[test]
    fn test_invalid_section_names_are_rejected() {
        let (mut nav, mut doc) = setup();
        for name in ["../secrets", "a/b", "", "x y"] {
            assert_eq!(
                nav.click_nav(&mut doc, name, &links()),
                NavCommand::Ignored(IgnoreReason::InvalidSection)
            );
        }
        assert!(!nav.view_state().is_loading);
    }

    #[test]
    fn test_return_home_steps_and_stale_ticket() {
        let (mut nav, mut doc) = setup();
        open(&mut nav, &mut doc, "experience", FRAGMENT);

        let ticket = nav.click_page_title(&mut doc).unwrap();
        assert!(!doc.has_class(doc.body(), COLLAPSED_CLASS));
        assert_eq!(nav.phase(), &NavPhase::Hero);
        assert!(nav.finish_home_fade(&mut doc, ticket));
        assert!(nav.finish_home_clear(&mut doc, ticket));
        let container = doc.get_element_by_id(SECTION_CONTAINER_ID).unwrap();
        assert!(doc.children(container).is_empty());

        let stale = nav.click_page_title(&mut doc).unwrap();
        nav.click_nav(&mut doc, "about", &links());
        assert!(!nav.finish_home_fade(&mut doc, stale));
        assert!(!nav.finish_home_clear(&mut doc, stale));
    }

    #[test]
    fn test_cv_with_both_links_opens_modal_without_state_change() {
        let (mut nav, mut doc) = setup();
        let both = CvLinks {
            es: Some("cv/es.pdf".into()),
            en: Some("cv/en.pdf".into()),
        };
        assert_eq!(
            nav.click_nav(&mut doc, "descargaCV", &both),
            NavCommand::Cv(CvAction::ModalOpened)
        );
        assert!(modal::is_open(&doc));
        assert!(doc.effects().is_empty());
        assert_eq!(nav.phase(), &NavPhase::Hero);
        assert!(!doc.has_class(doc.body(), COLLAPSED_CLASS));

        assert!(nav.key_pressed(&mut doc, "Escape"));
        assert!(!modal::is_open(&doc));
    }

    #[test]
    fn test_cv_with_one_link_downloads_without_modal() {
        let (mut nav, mut doc) = setup();
        let one = CvLinks {
            es: None,
            en: Some("cv/en.pdf".into()),
        };
        assert_eq!(
            nav.click_download_cv(&mut doc, &one),
            CvAction::Download { url: "cv/en.pdf".into() }
        );
        assert!(!modal::is_open(&doc));
        assert_eq!(doc.effects(), &[Effect::Download { url: "cv/en.pdf".into() }]);
    }

    #[test]
    fn test_reopen_after_return_home_renders_same_section() {
        let (mut nav, mut doc) = setup();
        let container = doc.get_element_by_id(SECTION_CONTAINER_ID).unwrap();
        open(&mut nav, &mut doc, "experience", FRAGMENT);
        let first = doc.inner_html(container);

        let ticket = nav.click_page_title(&mut doc).unwrap();
        nav.finish_home_fade(&mut doc, ticket);
        nav.finish_home_clear(&mut doc, ticket);
        open(&mut nav, &mut doc, "experience", FRAGMENT);
        assert_eq!(doc.inner_html(container), first);
    }
}
