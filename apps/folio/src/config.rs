use std::time::Duration;

use anyhow::{Context, Result};

use crate::navigator::Timings;

/// Placeholder endpoint; deployments point `CONTACT_ENDPOINT` at their own form.
pub const DEFAULT_CONTACT_ENDPOINT: &str = "https://formspree.io/f/your-form-id";

/// Where the site's assets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteRoot {
    Http(String),
    Dir(String),
}

impl SiteRoot {
    fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            SiteRoot::Http(value.to_string())
        } else {
            SiteRoot::Dir(value.to_string())
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a number is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub site_root: SiteRoot,
    pub content_path: String,
    pub partials_dir: String,
    pub shell_path: String,
    pub contact_endpoint: String,
    pub http_timeout: Duration,
    pub timings: Timings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let defaults = Timings::default();

        Ok(Config {
            port: or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or("RUST_LOG", "info"),
            site_root: SiteRoot::parse(&require(&get, "SITE_ROOT")?),
            content_path: or("CONTENT_PATH", "data.json"),
            partials_dir: or("PARTIALS_DIR", "partials"),
            shell_path: or("SHELL_PATH", "index.html"),
            contact_endpoint: or("CONTACT_ENDPOINT", DEFAULT_CONTACT_ENDPOINT),
            http_timeout: Duration::from_secs(
                or("HTTP_TIMEOUT_SECS", "15")
                    .parse()
                    .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            timings: Timings {
                section_hide_fallback: millis(
                    &get,
                    "SECTION_HIDE_FALLBACK_MS",
                    defaults.section_hide_fallback,
                )?,
                home_fade: millis(&get, "HOME_FADE_MS", defaults.home_fade)?,
                home_clear: millis(&get, "HOME_CLEAR_MS", defaults.home_clear)?,
                glitch: millis(&get, "GLITCH_MS", defaults.glitch)?,
                toast: millis(&get, "TOAST_MS", defaults.toast)?,
            },
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn millis(get: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Result<Duration> {
    match get(key) {
        Some(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .with_context(|| format!("{key} must be a number of milliseconds")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply() {
        let config = load(&[("SITE_ROOT", "./site")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.site_root, SiteRoot::Dir("./site".into()));
        assert_eq!(config.content_path, "data.json");
        assert_eq!(config.partials_dir, "partials");
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.timings, Timings::default());
    }

    #[test]
    fn test_site_root_is_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("SITE_ROOT", "  ")]).is_err());
    }

    #[test]
    fn test_http_root_and_timing_overrides() {
        let config = load(&[
            ("SITE_ROOT", "https://ana.dev"),
            ("HOME_FADE_MS", "100"),
            ("TOAST_MS", "50"),
        ])
        .unwrap();
        assert_eq!(config.site_root, SiteRoot::Http("https://ana.dev".into()));
        assert_eq!(config.timings.home_fade, Duration::from_millis(100));
        assert_eq!(config.timings.toast, Duration::from_millis(50));
        assert_eq!(config.timings.glitch, Duration::from_millis(600));
    }

    #[test]
    fn test_malformed_numbers_fail() {
        assert!(load(&[("SITE_ROOT", "."), ("PORT", "eighty")]).is_err());
        assert!(load(&[("SITE_ROOT", "."), ("GLITCH_MS", "-1")]).is_err());
    }
}
