//! Configuration loading.
//!
//! Settings come from an optional TOML file; every field has a default so
//! the file may be omitted entirely. Credentials and the listening port are
//! layered on top from the environment:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `PORT` | `server.port` |
//! | `SERVER_URL` / `NEXT_PUBLIC_SERVER_URL` | `server.public_url` |
//! | `GITHUB_TOKEN` | GitHub bearer token |
//! | `DUCKY_API_KEY` | index service API key |
//! | `OPENAI_API_KEY` | LLM API key |
//! | `BROWSERLESS_API_KEY` | scraping service token |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Base URL the chat client uses to reach a running server.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Raw `PORT` value. Parsed only when a port is actually needed, so a
    /// bad value does not stop commands that never bind.
    #[serde(skip)]
    pub port_env: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            public_url: None,
            port_env: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default = "default_github_raw_url")]
    pub raw_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            raw_url: default_github_raw_url(),
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_github_raw_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_api_url")]
    pub api_url: String,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_rerank")]
    pub rerank: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            api_url: default_index_api_url(),
            top_k: default_top_k(),
            alpha: default_alpha(),
            rerank: default_rerank(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_index_api_url() -> String {
    "https://api.ducky.ai".to_string()
}
fn default_top_k() -> u32 {
    10
}
fn default_alpha() -> f64 {
    1.0
}
fn default_rerank() -> bool {
    true
}
fn default_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

fn default_llm_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.7
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Upper bound on in-flight raw-content requests per repository.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

fn default_fetch_concurrency() -> usize {
    32
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    #[serde(default = "default_scrape_api_url")]
    pub api_url: String,
    #[serde(default = "default_wait_for_ms")]
    pub wait_for_ms: u64,
    #[serde(default = "default_page_top_k")]
    pub top_k: u32,
    #[serde(default = "default_page_max_tokens")]
    pub max_tokens: Option<u32>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            api_url: default_scrape_api_url(),
            wait_for_ms: default_wait_for_ms(),
            top_k: default_page_top_k(),
            max_tokens: default_page_max_tokens(),
        }
    }
}

fn default_scrape_api_url() -> String {
    "https://chrome.browserless.io".to_string()
}
fn default_wait_for_ms() -> u64 {
    2000
}
fn default_page_top_k() -> u32 {
    3
}
fn default_page_max_tokens() -> Option<u32> {
    Some(500)
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HttpConfig {
    /// Per-request timeout for outbound calls. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl HttpConfig {
    /// Builds the `reqwest` client shared by all upstream integrations.
    pub fn client(&self) -> Result<reqwest::Client> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("codescout/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().context("Failed to build HTTP client")
    }
}

/// Credentials read from the environment. Never deserialized from the
/// config file.
#[derive(Clone, Default)]
pub struct Secrets {
    pub github_token: Option<String>,
    pub ducky_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub browserless_api_key: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn state(v: &Option<String>) -> &'static str {
            if v.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Secrets")
            .field("github_token", &state(&self.github_token))
            .field("ducky_api_key", &state(&self.ducky_api_key))
            .field("openai_api_key", &state(&self.openai_api_key))
            .field("browserless_api_key", &state(&self.browserless_api_key))
            .finish()
    }
}

impl ServerConfig {
    /// `PORT` when set, otherwise `server.port`.
    pub fn port(&self) -> Result<Option<u16>> {
        match &self.port_env {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map(Some)
                .with_context(|| format!("PORT is not a valid port number: '{}'", raw)),
            None => Ok(self.port),
        }
    }
}

impl Config {
    /// Layers environment values over the file values. `lookup` is
    /// `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        self.server.port_env = non_empty("PORT");
        if let Some(url) = non_empty("SERVER_URL").or_else(|| non_empty("NEXT_PUBLIC_SERVER_URL")) {
            self.server.public_url = Some(url);
        }

        self.secrets = Secrets {
            github_token: non_empty("GITHUB_TOKEN"),
            ducky_api_key: non_empty("DUCKY_API_KEY"),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            browserless_api_key: non_empty("BROWSERLESS_API_KEY"),
        };
    }

    /// Address the HTTP server binds to. Fails when no port is configured,
    /// so `serve` refuses to start without `PORT`.
    pub fn bind_addr(&self) -> Result<String> {
        let port = self
            .server
            .port()?
            .ok_or_else(|| anyhow::anyhow!("PORT not defined (set PORT or server.port)"))?;
        Ok(format!("{}:{}", self.server.host, port))
    }

    /// Base URL of a running server, used by the chat client.
    pub fn public_url(&self) -> Result<String> {
        if let Some(url) = &self.server.public_url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        match self.server.port()? {
            Some(port) => Ok(format!("http://localhost:{}", port)),
            None => anyhow::bail!("SERVER_URL not defined and no port configured"),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.index.batch_size == 0 {
            anyhow::bail!("index.batch_size must be > 0");
        }
        if self.index.top_k == 0 || self.scrape.top_k == 0 {
            anyhow::bail!("index.top_k and scrape.top_k must be >= 1");
        }
        if !(0.0..=1.0).contains(&self.index.alpha) {
            anyhow::bail!("index.alpha must be in [0.0, 1.0]");
        }
        if self.ingest.fetch_concurrency == 0 {
            anyhow::bail!("ingest.fetch_concurrency must be > 0");
        }
        Ok(())
    }
}

/// Parses configuration text and layers `lookup` over it.
pub fn parse_config<F>(content: &str, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}

/// Loads the config file (when given) and the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?,
        None => String::new(),
    };
    parse_config(&content, |key| std::env::var(key).ok())
}
