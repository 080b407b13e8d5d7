//! Runtime configuration.
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file is loaded first by `main`). Numeric and enum values are taken as raw
//! strings and parsed here so that a malformed value falls back to its default
//! with a warning instead of aborting startup. The only fatal condition is a
//! missing token.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::Level;
use url::Url;

use crate::http_client::DEFAULT_TIMEOUT;
use crate::metrics::LabelPolicy;

pub const DEFAULT_URL: &str = "http://localhost:8000";
pub const DEFAULT_REFRESH_SECS: u64 = 1800;
pub const DEFAULT_METRICS_PORT: u16 = 8001;
pub const DEFAULT_TOKEN_FILE: &str = "./secrets/token";
pub const DEFAULT_VERBOSITY: &str = "INFO";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No Paperless token available (set PAPERLESS_TOKEN or provide {})", .path.display())]
    MissingToken { path: PathBuf },
}

#[derive(Clone, Parser)]
#[command(name = "paperless-metrics")]
#[command(about = "Export Paperless-ngx statistics as Prometheus metrics")]
#[command(version)]
pub struct Cli {
    /// Base URL of the Paperless instance
    #[arg(long, env = "URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Seconds between polls
    #[arg(long, env = "REFRESH_SECS", default_value = "1800")]
    pub refresh_secs: String,

    /// Value for the Host header, when Paperless sits behind a proxy that
    /// routes by name
    #[arg(long, env = "HOST_HEADER", default_value = "")]
    pub host_header: String,

    /// API token
    #[arg(long, env = "PAPERLESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// File containing the API token, read when no token is given directly
    #[arg(long, env = "PAPERLESS_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Port for the /metrics listener
    #[arg(long, env = "METRICS_PORT", default_value = "8001")]
    pub metrics_port: String,

    /// Log level: DEBUG, INFO, WARN or ERROR
    #[arg(long, env = "VERBOSITY", default_value = DEFAULT_VERBOSITY)]
    pub verbosity: String,

    /// Timeout for each request to Paperless, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "2")]
    pub request_timeout_secs: String,

    /// How to treat label values missing from the latest poll: merge or replace
    #[arg(long, env = "LABEL_POLICY", default_value = "merge")]
    pub label_policy: String,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("url", &self.url)
            .field("refresh_secs", &self.refresh_secs)
            .field("host_header", &self.host_header)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_file", &self.token_file)
            .field("metrics_port", &self.metrics_port)
            .field("verbosity", &self.verbosity)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("label_policy", &self.label_policy)
            .finish()
    }
}

/// Map a `VERBOSITY` value to a tracing level. `None` for unknown values.
pub fn parse_verbosity(value: &str) -> Option<Level> {
    match value.trim().to_uppercase().as_str() {
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" => Some(Level::ERROR),
        _ => None,
    }
}

/// Resolved settings.
#[derive(Clone)]
pub struct Settings {
    pub base_url: String,
    pub refresh_interval: Duration,
    pub host_header: String,
    pub token: String,
    pub metrics_port: u16,
    pub request_timeout: Duration,
    pub label_policy: LabelPolicy,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("refresh_interval", &self.refresh_interval)
            .field("host_header", &self.host_header)
            .field("token", &"<redacted>")
            .field("metrics_port", &self.metrics_port)
            .field("request_timeout", &self.request_timeout)
            .field("label_policy", &self.label_policy)
            .finish()
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&cli.url);
        tracing::debug!("Set request url: {}", base_url);

        let refresh_secs = parse_positive("REFRESH_SECS", &cli.refresh_secs, DEFAULT_REFRESH_SECS);
        tracing::debug!("Set refresh seconds: {}", refresh_secs);

        tracing::debug!("Set host header: {:?}", cli.host_header);

        let metrics_port = parse_port(&cli.metrics_port);

        let timeout_secs = parse_positive(
            "REQUEST_TIMEOUT_SECS",
            &cli.request_timeout_secs,
            DEFAULT_TIMEOUT.as_secs(),
        );

        let label_policy = cli.label_policy.parse().unwrap_or_else(|e| {
            tracing::warn!("{}, defaulting to {}", e, LabelPolicy::default());
            LabelPolicy::default()
        });

        let token = resolve_token(cli.token.as_deref(), cli.token_file.as_deref())?;

        Ok(Self {
            base_url,
            refresh_interval: Duration::from_secs(refresh_secs),
            host_header: cli.host_header.trim().to_string(),
            token,
            metrics_port,
            request_timeout: Duration::from_secs(timeout_secs),
            label_policy,
        })
    }
}

fn parse_base_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            raw.trim().trim_end_matches('/').to_string()
        }
        Ok(_) => {
            tracing::warn!("URL {:?} is not an http(s) URL, defaulting to {}", raw, DEFAULT_URL);
            DEFAULT_URL.to_string()
        }
        Err(e) => {
            tracing::warn!("Unable to parse URL {:?} ({}), defaulting to {}", raw, e, DEFAULT_URL);
            DEFAULT_URL.to_string()
        }
    }
}

fn parse_positive(name: &str, raw: &str, default: u64) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => {
            tracing::warn!("Unable to load {} {:?}, defaulting to {}", name, raw, default);
            default
        }
    }
}

fn parse_port(raw: &str) -> u16 {
    raw.trim().parse::<u16>().unwrap_or_else(|_| {
        tracing::warn!(
            "Unable to load METRICS_PORT {:?}, defaulting to {}",
            raw,
            DEFAULT_METRICS_PORT
        );
        DEFAULT_METRICS_PORT
    })
}

/// Pick the API token: a non-empty direct token wins, otherwise the token file
/// (default `./secrets/token`) is read and trimmed.
pub fn resolve_token(direct: Option<&str>, file: Option<&Path>) -> Result<String, ConfigError> {
    if let Some(token) = direct.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    let path = file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));
    tracing::debug!("PAPERLESS_TOKEN not set, reading token from {}", path.display());

    let token = match std::fs::read_to_string(&path) {
        Ok(contents) => contents.trim().to_string(),
        Err(e) => {
            tracing::error!("Unable to read token file {}: {}", path.display(), e);
            String::new()
        }
    };

    if token.is_empty() {
        return Err(ConfigError::MissingToken { path });
    }
    Ok(token)
}
