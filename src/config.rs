use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_SCRAPE_PATH: &str = "/metrics";

/// A single configuration mutator, applied in order by [`MetricsOptions::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsOption {
    /// Override the scrape path. Trimmed and rooted at `/`; empty input is ignored.
    ScrapePath(String),
    /// Replace the allow-list contents.
    AllowIps(Vec<String>),
    /// Toggle allow-list enforcement on the scrape path.
    EnableAllowList(bool),
}

pub fn scrape_path(path: impl Into<String>) -> MetricsOption {
    MetricsOption::ScrapePath(path.into())
}

pub fn allow_ips<I, S>(ips: I) -> MetricsOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    MetricsOption::AllowIps(ips.into_iter().map(Into::into).collect())
}

pub fn enable_allow_list(enabled: bool) -> MetricsOption {
    MetricsOption::EnableAllowList(enabled)
}

/// Effective middleware configuration. Immutable once merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsOptions {
    scrape_path: String,
    allow_list: Vec<String>,
    allow_list_enabled: bool,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            scrape_path: DEFAULT_SCRAPE_PATH.to_string(),
            allow_list: Vec::new(),
            allow_list_enabled: false,
        }
    }
}

impl MetricsOptions {
    /// Apply options left to right on top of the defaults; later options win.
    pub fn merge<I>(options: I) -> Self
    where
        I: IntoIterator<Item = MetricsOption>,
    {
        let mut merged = Self::default();
        for option in options {
            merged.apply(option);
        }
        merged
    }

    fn apply(&mut self, option: MetricsOption) {
        match option {
            MetricsOption::ScrapePath(path) => {
                if let Some(path) = normalize_path(&path) {
                    self.scrape_path = path;
                }
            }
            MetricsOption::AllowIps(ips) => self.allow_list = ips,
            MetricsOption::EnableAllowList(enabled) => self.allow_list_enabled = enabled,
        }
    }

    pub fn scrape_path(&self) -> &str {
        &self.scrape_path
    }

    pub fn allow_list(&self) -> &[String] {
        &self.allow_list
    }

    pub fn allow_list_enabled(&self) -> bool {
        self.allow_list_enabled
    }
}

/// Trim a path and join it against `/`, collapsing empty and `.` segments
/// and resolving `..`. Returns `None` for blank input.
fn normalize_path(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    Some(format!("/{}", segments.join("/")))
}

/// Demo server configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub path: String,
    pub allow_ips: Vec<String>,
    pub allow_list_enabled: bool,
    pub namespace: String,
    pub host_label: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("API_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .context("API_PORT must be a valid port number")?,
            },
            metrics: MetricsConfig {
                path: env::var("METRICS_PATH")
                    .unwrap_or_else(|_| DEFAULT_SCRAPE_PATH.to_string()),
                allow_ips: parse_ip_list(&env::var("METRICS_ALLOW_IPS").unwrap_or_default()),
                allow_list_enabled: env::var("METRICS_ALLOW_LIST_ENABLED")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .context("METRICS_ALLOW_LIST_ENABLED must be true or false")?,
                namespace: env::var("METRICS_NAMESPACE").unwrap_or_else(|_| "http".to_string()),
                host_label: env::var("METRICS_HOST_LABEL")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .context("METRICS_HOST_LABEL must be true or false")?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn metrics_options(&self) -> Vec<MetricsOption> {
        vec![
            scrape_path(self.metrics.path.clone()),
            allow_ips(self.metrics.allow_ips.clone()),
            enable_allow_list(self.metrics.allow_list_enabled),
        ]
    }
}

fn parse_ip_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
