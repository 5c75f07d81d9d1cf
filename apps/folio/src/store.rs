//! Content Store: one fetch of the content document per session, plus the
//! document-level side effects it drives (title, meta tags, favicon, theme).

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::dom::{Document, El, NodeId};
use crate::models::ContentDocument;
use crate::render::theme::apply_theme_colors;
use crate::source::{AssetSource, SourceError};

pub const PAGE_TITLE_ID: &str = "page-title";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("could not fetch content: {0}")]
    Fetch(#[from] SourceError),

    #[error("content is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Appends a cache-busting `v` query parameter.
pub fn cache_busted(path: &str, stamp: i64) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}v={stamp}")
}

/// Fetches and strictly parses the content document.
pub async fn fetch_content(
    source: &dyn AssetSource,
    path: &str,
) -> Result<ContentDocument, ContentError> {
    let url = cache_busted(path, Utc::now().timestamp_millis());
    let text = source.fetch_text(&url).await?;
    let document = ContentDocument::from_json(&text)?;
    debug!(
        "Content loaded: es={}, en={}",
        document.es.is_some(),
        document.en.is_some()
    );
    Ok(document)
}

/// Holds the loaded snapshot. The snapshot is shared read-only; nothing
/// writes back into it.
#[derive(Debug, Default)]
pub struct ContentStore {
    document: Option<Arc<ContentDocument>>,
    effects_applied: bool,
}

impl ContentStore {
    pub fn get(&self) -> Option<Arc<ContentDocument>> {
        self.document.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Installs the snapshot and applies the document effects. A second
    /// install is ignored so the session keeps one immutable snapshot.
    pub fn install(&mut self, document: ContentDocument, page: &mut Document) -> bool {
        if self.document.is_some() {
            return false;
        }
        let document = Arc::new(document);
        self.document = Some(document.clone());
        if !self.effects_applied {
            apply_document_effects(&document, page);
            self.effects_applied = true;
        }
        true
    }
}

fn apply_document_effects(content: &ContentDocument, page: &mut Document) {
    if let Some(title) = content.page_title.as_deref().filter(|t| !t.is_empty()) {
        let node = head_child(page, |d, id| d.tag(id) == Some("title"), || El::new("title"));
        page.set_text(node, title);
    }

    if let Some(seo) = &content.seo {
        if let Some(description) = seo.description.as_deref() {
            set_meta(page, "description", description);
        }
        if let Some(keywords) = &seo.keywords {
            set_meta(page, "keywords", &keywords.joined());
        }
    }

    let branding = content.branding.clone().unwrap_or_default();
    if let Some(favicon) = branding.favicon.as_deref().filter(|f| !f.is_empty()) {
        let node = head_child(
            page,
            |d, id| {
                d.tag(id) == Some("link")
                    && d.attr(id, "rel")
                        .map(|r| r.split_whitespace().any(|r| r == "icon"))
                        .unwrap_or(false)
            },
            || El::new("link").attr("rel", "icon"),
        );
        page.set_attr(node, "href", &crate::dom::view::safe_url(favicon));
    }
    if let Some(name) = branding.name.as_deref().filter(|n| !n.is_empty()) {
        if let Some(title) = page.get_element_by_id(PAGE_TITLE_ID) {
            page.set_text(title, name);
        }
    }

    if let Some(theme) = content.theme.as_deref().filter(|t| !t.trim().is_empty()) {
        let body = page.body();
        page.add_class(body, &format!("theme-{}", theme.trim()));
    }

    if let Some(palette) = &content.theme_colors {
        let written = apply_theme_colors(palette, page);
        debug!("Applied {written} theme variables");
    }

    info!("Document effects applied");
}

fn set_meta(page: &mut Document, name: &str, content: &str) {
    let node = head_child(
        page,
        |d, id| d.tag(id) == Some("meta") && d.attr(id, "name") == Some(name),
        || El::new("meta").attr("name", name),
    );
    page.set_attr(node, "content", content);
}

/// First `<head>` child matching `pred`, created from `make` when absent.
fn head_child<P, M>(page: &mut Document, pred: P, make: M) -> NodeId
where
    P: Fn(&Document, NodeId) -> bool,
    M: FnOnce() -> El,
{
    let head = page.head();
    match page.find_first(head, pred) {
        Some(id) => id,
        None => page.append_view(head, &make().build()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct StaticSource {
        body: Result<String, u16>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetSource for StaticSource {
        async fn fetch_text(&self, path: &str) -> Result<String, SourceError> {
            self.requested.lock().unwrap().push(path.to_string());
            self.body.clone().map_err(|status| SourceError::Status {
                path: path.to_string(),
                status,
            })
        }
    }

    fn content() -> ContentDocument {
        ContentDocument::from_json(
            &json!({
                "page_title": "Ana · Portfolio",
                "seo": {"description": "Dev portfolio", "keywords": ["rust", "web"]},
                "branding": {"favicon": "img/favicon.png", "name": "Ana"},
                "theme": "dark",
                "theme_colors": {"primary": "#fff"}
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_cache_busted_appends_version() {
        assert_eq!(cache_busted("data.json", 42), "data.json?v=42");
        assert_eq!(cache_busted("data.json?lang=es", 42), "data.json?lang=es&v=42");
    }

    #[tokio::test]
    async fn test_fetch_content_is_cache_busted_and_strict() {
        let source = StaticSource {
            body: Ok("{\"page_title\": \"x\"}".into()),
            requested: Mutex::new(Vec::new()),
        };
        let doc = fetch_content(&source, "data.json").await.unwrap();
        assert_eq!(doc.page_title.as_deref(), Some("x"));
        assert!(source.requested.lock().unwrap()[0].starts_with("data.json?v="));

        let broken = StaticSource {
            body: Ok("<html>oops</html>".into()),
            requested: Mutex::new(Vec::new()),
        };
        assert!(matches!(
            fetch_content(&broken, "data.json").await,
            Err(ContentError::Parse(_))
        ));

        let missing = StaticSource {
            body: Err(404),
            requested: Mutex::new(Vec::new()),
        };
        assert!(matches!(
            fetch_content(&missing, "data.json").await,
            Err(ContentError::Fetch(_))
        ));
    }

    #[test]
    fn test_install_applies_document_effects_once() {
        let mut page = Document::from_html(
            r#"<html><head><title>Loading</title></head><body><h1 id="page-title">x</h1></body></html>"#,
        )
        .unwrap();
        let mut store = ContentStore::default();
        assert!(store.install(content(), &mut page));

        let html = page.to_html();
        assert!(html.contains("<title>Ana · Portfolio</title>"));
        assert!(html.contains(r#"<meta name="description" content="Dev portfolio">"#));
        assert!(html.contains(r#"<meta name="keywords" content="rust, web">"#));
        assert!(html.contains(r#"<link rel="icon" href="img/favicon.png">"#));
        assert!(page.has_class(page.body(), "theme-dark"));
        assert_eq!(
            page.style_property(page.root(), "--blob-1").as_deref(),
            Some("rgba(255,255,255,0.92)")
        );
        let title = page.get_element_by_id(PAGE_TITLE_ID).unwrap();
        assert_eq!(page.text_content(title), "Ana");

        assert!(!store.install(ContentDocument::default(), &mut page));
        assert_eq!(store.get().unwrap().page_title.as_deref(), Some("Ana · Portfolio"));
        assert_eq!(page.find_by_tag(page.head(), "title").len(), 1);
    }
}
