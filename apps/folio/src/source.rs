//! Asset sources and the contact form submitter: the only modules that
//! perform I/O. Everything else goes through these traits so tests can swap
//! in in-memory fakes.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{path} returned status {status}")]
    Status { path: String, status: u16 },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path escapes the site root: {0}")]
    OutsideRoot(String),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint rejected submission with status {0}")]
    Rejected(u16),
}

/// Where the content document, the page shell and section fragments come from.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetches `path` (relative to the site root, may carry a query string) as text.
    async fn fetch_text(&self, path: &str) -> Result<String, SourceError>;
}

/// Delivers a serialized contact form. At most one attempt per call.
#[async_trait]
pub trait FormSubmitter: Send + Sync {
    async fn submit(&self, fields: &[(String, String)]) -> Result<(), SubmitError>;
}

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP
// ────────────────────────────────────────────────────────────────────────────

/// Site served over HTTP(S).
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl AssetSource for HttpSource {
    async fn fetch_text(&self, path: &str) -> Result<String, SourceError> {
        let url = self.url(path);
        debug!("GET {url}");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Local directory
// ────────────────────────────────────────────────────────────────────────────

/// Site read from a local directory. Query strings are ignored.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let without_query = path.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(without_query.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(SourceError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetSource for DirSource {
    async fn fetch_text(&self, path: &str) -> Result<String, SourceError> {
        let full = self.resolve(path)?;
        debug!("Reading {}", full.display());
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|source| SourceError::Io {
                path: path.to_string(),
                source,
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Contact endpoint
// ────────────────────────────────────────────────────────────────────────────

/// Posts multipart form bodies to a fixed endpoint with `Accept: application/json`.
#[derive(Clone)]
pub struct HttpFormSubmitter {
    client: Client,
    endpoint: String,
}

impl HttpFormSubmitter {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl FormSubmitter for HttpFormSubmitter {
    async fn submit(&self, fields: &[(String, String)]) -> Result<(), SubmitError> {
        let form = fields
            .iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            });
        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SubmitError::Rejected(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_http_source_fetches_relative_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/partials/experience.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<section></section>"))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpSource::new(&format!("{}/", server.uri()), TIMEOUT).unwrap();
        let body = source.fetch_text("partials/experience.html").await.unwrap();
        assert_eq!(body, "<section></section>");
    }

    #[tokio::test]
    async fn test_http_source_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), TIMEOUT).unwrap();
        match source.fetch_text("partials/missing.html").await {
            Err(SourceError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_form_submitter_posts_with_json_accept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/f/abc"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let submitter =
            HttpFormSubmitter::new(&format!("{}/f/abc", server.uri()), TIMEOUT).unwrap();
        let fields = vec![("email".to_string(), "me@example.com".to_string())];
        submitter.submit(&fields).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"email\""));
        assert!(body.contains("me@example.com"));
    }

    #[tokio::test]
    async fn test_form_submitter_reports_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let submitter = HttpFormSubmitter::new(&server.uri(), TIMEOUT).unwrap();
        let result = submitter.submit(&[]).await;
        assert!(matches!(result, Err(SubmitError::Rejected(500))));
    }

    #[tokio::test]
    async fn test_dir_source_reads_files_and_ignores_query() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), "{}").unwrap();
        let source = DirSource::new(dir.path());
        assert_eq!(source.fetch_text("data.json?v=123").await.unwrap(), "{}");
        assert!(matches!(
            source.fetch_text("missing.html").await,
            Err(SourceError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_dir_source_rejects_parent_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirSource::new(dir.path());
        assert!(matches!(
            source.fetch_text("../etc/passwd").await,
            Err(SourceError::OutsideRoot(_))
        ));
    }
}
