mod config;
mod contact;
mod controller;
mod dom;
mod errors;
mod models;
mod navigator;
mod notify;
mod render;
mod routes;
mod shell;
mod source;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, SiteRoot};
use crate::controller::{Controller, PageOptions};
use crate::routes::build_router;
use crate::source::{AssetSource, DirSource, HttpFormSubmitter, HttpSource};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting folio v{}", env!("CARGO_PKG_VERSION"));

    let assets: Arc<dyn AssetSource> = match &config.site_root {
        SiteRoot::Http(url) => {
            info!("Serving site assets from {url}");
            Arc::new(HttpSource::new(url, config.http_timeout)?)
        }
        SiteRoot::Dir(dir) => {
            info!("Serving site assets from directory {dir}");
            Arc::new(DirSource::new(dir))
        }
    };
    let submitter = Arc::new(HttpFormSubmitter::new(
        &config.contact_endpoint,
        config.http_timeout,
    )?);
    info!("Contact form endpoint: {}", config.contact_endpoint);

    let shell = shell::load_shell(assets.as_ref(), &config.shell_path).await;
    let controller = Controller::new(
        shell,
        assets,
        submitter,
        PageOptions {
            content_path: config.content_path.clone(),
            partials_dir: config.partials_dir.clone(),
            timings: config.timings,
            ..PageOptions::default()
        },
    );

    // A failed content load leaves the page in its pre-load state; keep serving.
    if let Err(e) = controller.load_content().await {
        warn!("Content not loaded, serving the bare shell: {e}");
    }

    let app = build_router(AppState { controller })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
