//! Page controller: owns the live page and drives every UI event through it.
//!
//! The page sits behind a `tokio::sync::Mutex`. No operation holds the lock
//! across a fetch, a form POST or a timer: it locks, decides, releases,
//! awaits, then re-locks to apply. The navigator's `is_loading` flag is what
//! keeps a second section load from starting in that window.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::contact::form::{self, SubmitOutcome};
use crate::contact::links::{self, LinkAction};
use crate::dom::{Document, Effect, NodeId};
use crate::models::{ContentDocument, CvLinks, Locale, NavPhase, ViewState};
use crate::navigator::modal::{self, CloseReason};
use crate::navigator::timing::{wait_for_transition, TransitionEnd};
use crate::navigator::{
    nav_target, CvAction, IgnoreReason, NavCommand, Navigator, Timings, NAV_LINK_CLASS,
};
use crate::notify::{visible_toasts, ToastKind, TOAST_ROOT_ID};
use crate::render::{self, cv_link_id, lang_button_id, RenderReport};
use crate::source::{AssetSource, FormSubmitter};
use crate::store::{fetch_content, ContentError, ContentStore, PAGE_TITLE_ID};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("content has not been loaded")]
    NotLoaded,

    #[error("no element with id '{0}'")]
    UnknownElement(String),

    #[error("element '{0}' is not a form")]
    NotAForm(String),
}

/// Everything the live page is made of.
#[derive(Debug)]
pub struct Page {
    pub doc: Document,
    pub store: ContentStore,
    pub nav: Navigator,
    /// Bumped on every animated locale switch; a pending glitch clear only
    /// runs if no newer switch happened since it was scheduled.
    glitch_round: u64,
}

impl Page {
    fn content(&self) -> Option<Arc<ContentDocument>> {
        self.store.get()
    }

    fn cv_links(&self) -> CvLinks {
        self.content().map(|c| c.cv_links()).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct PageOptions {
    pub content_path: String,
    pub partials_dir: String,
    pub initial_locale: Locale,
    pub timings: Timings,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            content_path: "data.json".to_string(),
            partials_dir: "partials".to_string(),
            initial_locale: Locale::default(),
            timings: Timings::default(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum NavOutcome {
    Ignored { reason: IgnoreReason },
    Shown { section: String },
    Failed { section: String, error: String },
    Cv { action: CvAction },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ClickOutcome {
    ModalClosed,
    Download { url: String },
    Contact { action: LinkAction, section: Option<NavOutcome> },
    Nav { outcome: NavOutcome },
    Home { started: bool },
    Locale { changed: bool },
    Nothing,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub view_state: ViewState,
    pub phase: NavPhase,
    pub modal_open: bool,
    pub content_loaded: bool,
    pub toasts: Vec<(ToastKind, String)>,
    pub effects: Vec<Effect>,
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

struct Shared {
    page: Mutex<Page>,
    assets: Arc<dyn AssetSource>,
    submitter: Arc<dyn FormSubmitter>,
    content_path: String,
    timings: Timings,
    /// Pending transition-finished signals, keyed by section name.
    signals: std::sync::Mutex<HashMap<String, oneshot::Sender<()>>>,
}

#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    pub fn new(
        doc: Document,
        assets: Arc<dyn AssetSource>,
        submitter: Arc<dyn FormSubmitter>,
        options: PageOptions,
    ) -> Self {
        let page = Page {
            doc,
            store: ContentStore::default(),
            nav: Navigator::new(options.initial_locale, &options.partials_dir),
            glitch_round: 0,
        };
        Self {
            shared: Arc::new(Shared {
                page: Mutex::new(page),
                assets,
                submitter,
                content_path: options.content_path,
                timings: options.timings,
                signals: std::sync::Mutex::new(HashMap::new()),
            }),
        }
    }

    async fn lock(&self) -> MutexGuard<'_, Page> {
        self.shared.page.lock().await
    }

    pub async fn html(&self) -> String {
        self.lock().await.doc.to_html()
    }

    pub async fn snapshot(&self) -> PageSnapshot {
        let page = self.lock().await;
        PageSnapshot {
            view_state: page.nav.view_state().clone(),
            phase: page.nav.phase().clone(),
            modal_open: modal::is_open(&page.doc),
            content_loaded: page.store.is_loaded(),
            toasts: visible_toasts(&page.doc),
            effects: page.doc.effects().to_vec(),
        }
    }

    /// Runs `f` against the page under the lock.
    #[cfg(test)]
    pub async fn with_page<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
        let mut page = self.lock().await;
        f(&mut page)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Content
    // ────────────────────────────────────────────────────────────────────────

    /// Loads the content document once and renders the initial locale
    /// without animation. Returns false if content was already loaded.
    pub async fn load_content(&self) -> Result<bool, ContentError> {
        if self.lock().await.store.is_loaded() {
            return Ok(false);
        }
        let document = fetch_content(self.shared.assets.as_ref(), &self.shared.content_path).await?;

        let mut page = self.lock().await;
        let Page { doc, store, nav, .. } = &mut *page;
        let initial = document.default_locale().unwrap_or(nav.locale());
        if !store.install(document, doc) {
            return Ok(false);
        }
        nav.set_locale(initial);
        let content = store.get();
        if let Some(info) = content.as_ref().and_then(|c| c.contact_info.as_ref()) {
            links::bind_contact_links(doc, info);
        }
        let root = doc.root();
        form::attach_all(doc, root);
        render::render(doc, content.as_deref(), initial, false);
        info!("Content installed, rendered locale {initial}");
        Ok(true)
    }

    /// Re-renders the whole page in `locale` with the glitch animation.
    /// Returns false when `locale` was already current.
    pub async fn switch_locale(&self, locale: Locale) -> Result<bool, ControllerError> {
        let (report, round) = {
            let mut page = self.lock().await;
            let content = page.content().ok_or(ControllerError::NotLoaded)?;
            if !page.nav.set_locale(locale) {
                return Ok(false);
            }
            page.glitch_round += 1;
            let stale = page.doc.find_by_class(page.doc.root(), render::GLITCH_CLASS);
            render::clear_glitch(&mut page.doc, &stale);
            let report = render::render(&mut page.doc, Some(content.as_ref()), locale, true);
            (report, page.glitch_round)
        };
        info!("Locale switched to {locale}");
        self.schedule_glitch_clear(report, round);
        Ok(true)
    }

    fn schedule_glitch_clear(&self, report: RenderReport, round: u64) {
        if report.glitched.is_empty() {
            return;
        }
        let this = self.clone();
        let delay = self.shared.timings.glitch;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut page = this.lock().await;
            if page.glitch_round != round {
                debug!("Glitch clear superseded by a later locale switch");
                return;
            }
            render::clear_glitch(&mut page.doc, &report.glitched);
        });
    }

    fn schedule_toast_dismiss(&self, toast: NodeId) {
        let this = self.clone();
        let delay = self.shared.timings.toast;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut page = this.lock().await;
            crate::notify::dismiss_toast(&mut page.doc, toast);
        });
    }

    // ────────────────────────────────────────────────────────────────────────
    // Navigation
    // ────────────────────────────────────────────────────────────────────────

    pub async fn open_section(&self, name: &str) -> NavOutcome {
        let (command, signal) = {
            let mut page = self.lock().await;
            let cv_links = page.cv_links();
            let Page { doc, nav, .. } = &mut *page;
            let command = nav.click_nav(doc, name, &cv_links);
            let signal = match (&command, nav.phase()) {
                (NavCommand::Fetch { hide: Some(_), .. }, NavPhase::Transitioning { from, .. }) => {
                    Some(self.register_signal(from))
                }
                _ => None,
            };
            (command, signal)
        };

        let (section, path, hide) = match command {
            NavCommand::Ignored(reason) => return NavOutcome::Ignored { reason },
            NavCommand::Cv(action) => return NavOutcome::Cv { action },
            NavCommand::Fetch { section, path, hide } => (section, path, hide),
        };

        if hide.is_some() {
            let end = wait_for_transition(signal, self.shared.timings.section_hide_fallback).await;
            if end == TransitionEnd::TimedOut {
                debug!("Hide transition for '{section}' swap used the fallback");
            }
        }

        let fetched = self.shared.assets.fetch_text(&path).await;

        let mut page = self.lock().await;
        let content = page.content();
        let Page { doc, nav, .. } = &mut *page;
        let locale = nav.locale();
        let error = match fetched {
            Ok(html) => {
                let loaded = nav.fragment_loaded(doc, &section, &html, |doc, root| {
                    render::render_subtree(doc, content.as_deref(), locale, root);
                    if let Some(info) = content.as_ref().and_then(|c| c.contact_info.as_ref()) {
                        links::bind_contact_links(doc, info);
                    }
                    form::attach_all(doc, root);
                });
                match loaded {
                    Ok(_) => return NavOutcome::Shown { section },
                    Err(e) => e.to_string(),
                }
            }
            Err(e) => e.to_string(),
        };
        warn!("Could not load section '{section}': {error}");
        let toast = nav.fragment_failed(doc, &section);
        drop(page);
        self.schedule_toast_dismiss(toast);
        NavOutcome::Failed { section, error }
    }

    fn register_signal(&self, section: &str) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut signals) = self.shared.signals.lock() {
            signals.insert(section.to_string(), tx);
        }
        rx
    }

    /// Delivers a transition-finished signal for `section`. Returns false if
    /// nothing was waiting on it.
    pub fn transition_finished(&self, section: &str) -> bool {
        let sender = match self.shared.signals.lock() {
            Ok(mut signals) => signals.remove(section),
            Err(_) => None,
        };
        sender.map(|tx| tx.send(()).is_ok()).unwrap_or(false)
    }

    /// Page-title click. The fade and clear steps run later and are dropped
    /// if another navigation starts first.
    pub async fn return_home(&self) -> bool {
        let ticket = {
            let mut page = self.lock().await;
            let Page { doc, nav, .. } = &mut *page;
            nav.click_page_title(doc)
        };
        let Some(ticket) = ticket else {
            return false;
        };
        let this = self.clone();
        let Timings { home_fade, home_clear, .. } = self.shared.timings;
        tokio::spawn(async move {
            tokio::time::sleep(home_fade).await;
            {
                let mut page = this.lock().await;
                let Page { doc, nav, .. } = &mut *page;
                if !nav.finish_home_fade(doc, ticket) {
                    debug!("Return home superseded before fade");
                    return;
                }
            }
            tokio::time::sleep(home_clear).await;
            let mut page = this.lock().await;
            let Page { doc, nav, .. } = &mut *page;
            if !nav.finish_home_clear(doc, ticket) {
                debug!("Return home superseded before clear");
            }
        });
        true
    }

    pub async fn download_cv(&self) -> CvAction {
        let mut page = self.lock().await;
        let cv_links = page.cv_links();
        let Page { doc, nav, .. } = &mut *page;
        nav.click_download_cv(doc, &cv_links)
    }

    pub async fn close_modal(&self, reason: CloseReason) -> bool {
        let mut page = self.lock().await;
        let Page { doc, nav, .. } = &mut *page;
        nav.close_modal(doc, reason)
    }

    pub async fn key(&self, key: &str) -> bool {
        let mut page = self.lock().await;
        let Page { doc, nav, .. } = &mut *page;
        nav.key_pressed(doc, key)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Clicks
    // ────────────────────────────────────────────────────────────────────────

    /// Dispatches a click on the element with `element_id`, the way the
    /// page's delegated handlers would.
    pub async fn click(&self, element_id: &str) -> Result<ClickOutcome, ControllerError> {
        enum Next {
            Done(ClickOutcome),
            Section(LinkAction, String),
            Nav(String),
            Home,
            Locale(Locale),
        }

        let next = {
            let mut page = self.lock().await;
            let content = page.content();
            let Page { doc, nav, .. } = &mut *page;
            let node = doc
                .get_element_by_id(element_id)
                .ok_or_else(|| ControllerError::UnknownElement(element_id.to_string()))?;
            let chain = doc.ancestors(node);

            if let Some(&closer) = chain.iter().find(|&&id| doc.has_attr(id, "data-modal-close")) {
                let reason = match doc.attr(closer, "data-modal-close") {
                    Some("backdrop") => CloseReason::Backdrop,
                    _ => CloseReason::Button,
                };
                nav.close_modal(doc, reason);
                Next::Done(ClickOutcome::ModalClosed)
            } else if let Some(url) = download_href(doc, &chain) {
                doc.push_effect(Effect::Download { url: url.clone() });
                if chain.iter().any(|&id| doc.has_attr(id, "data-cv-locale")) {
                    nav.close_modal(doc, CloseReason::Button);
                }
                Next::Done(ClickOutcome::Download { url })
            } else if let Some(action) = content
                .as_ref()
                .and_then(|c| c.contact_info.as_ref())
                .and_then(|info| links::resolve_click(doc, node, info))
            {
                match links::perform(doc, &action) {
                    Some(section) => Next::Section(action, section),
                    None => Next::Done(ClickOutcome::Contact { action, section: None }),
                }
            } else if let Some(target) = chain
                .iter()
                .find(|&&id| doc.has_class(id, NAV_LINK_CLASS))
                .and_then(|&link| nav_target(doc, link))
            {
                Next::Nav(target)
            } else if chain.iter().any(|&id| doc.attr(id, "id") == Some(PAGE_TITLE_ID)) {
                Next::Home
            } else if let Some(locale) = Locale::ALL.into_iter().find(|&l| {
                chain.iter().any(|&id| doc.attr(id, "id") == Some(lang_button_id(l)))
            }) {
                Next::Locale(locale)
            } else {
                Next::Done(ClickOutcome::Nothing)
            }
        };

        Ok(match next {
            Next::Done(outcome) => outcome,
            Next::Section(action, section) => {
                let outcome = self.open_section(&section).await;
                ClickOutcome::Contact { action, section: Some(outcome) }
            }
            Next::Nav(target) => ClickOutcome::Nav {
                outcome: self.open_section(&target).await,
            },
            Next::Home => ClickOutcome::Home {
                started: self.return_home().await,
            },
            Next::Locale(locale) => ClickOutcome::Locale {
                changed: self.switch_locale(locale).await?,
            },
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Forms
    // ────────────────────────────────────────────────────────────────────────

    /// Fills the form with `fields` and submits it. The POST runs without the
    /// page lock held.
    pub async fn submit_form(
        &self,
        form_id: &str,
        fields: &[(String, String)],
    ) -> Result<SubmitOutcome, ControllerError> {
        let (form, data) = {
            let mut page = self.lock().await;
            let doc = &mut page.doc;
            let form = doc
                .get_element_by_id(form_id)
                .ok_or_else(|| ControllerError::UnknownElement(form_id.to_string()))?;
            if doc.tag(form) != Some("form") {
                return Err(ControllerError::NotAForm(form_id.to_string()));
            }
            for (name, value) in fields {
                if !form::set_field(doc, form, name, value) {
                    debug!("Form '{form_id}' has no field '{name}'");
                }
            }
            match form::prepare(doc, form) {
                Some(data) => (form, data),
                None => return Ok(SubmitOutcome::NotIntercepted),
            }
        };

        let result = self.shared.submitter.submit(&data).await;

        let mut page = self.lock().await;
        let locale = page.nav.locale();
        let outcome = form::finish(&mut page.doc, form, &result, locale);
        let toast = latest_toast(&page.doc);
        drop(page);
        if let Some(toast) = toast {
            self.schedule_toast_dismiss(toast);
        }
        Ok(outcome)
    }
}

/// `href` of a CV download anchor in the click chain (modal links or the
/// static per-locale CV links).
fn download_href(doc: &Document, chain: &[NodeId]) -> Option<String> {
    chain
        .iter()
        .copied()
        .find(|&id| {
            doc.has_attr(id, "data-cv-locale")
                || Locale::ALL
                    .iter()
                    .any(|&l| doc.attr(id, "id") == Some(cv_link_id(l)))
        })
        .and_then(|id| doc.attr(id, "href"))
        .filter(|href| !href.is_empty() && *href != "#")
        .map(str::to_string)
}

fn latest_toast(doc: &Document) -> Option<NodeId> {
    let root = doc.get_element_by_id(TOAST_ROOT_ID)?;
    doc.element_children(root).last().copied()
}
