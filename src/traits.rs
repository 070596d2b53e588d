//! Seams between the pipeline and the services it talks to.
//!
//! Every upstream the crate depends on sits behind a trait so the ingestion
//! and answer pipelines can run against fakes in tests, or against a
//! different provider in a custom binary.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Services                        │
//! │  ┌──────────┐ ┌────────────┐ ┌──────────┐ ┌────────┐ │
//! │  │ RepoHost │ │IndexService│ │Completion│ │  Page  │ │
//! │  │ (GitHub) │ │  (Ducky)   │ │ (OpenAI) │ │Scraper │ │
//! │  └──────────┘ └────────────┘ └──────────┘ └────────┘ │
//! └──────────────┬───────────────────────────────────────┘
//!                ▼
//!     ingest / gateway / scrape → HTTP routes, CLI
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::ducky::DuckyClient;
use crate::error::Result;
use crate::github::GithubClient;
use crate::llm::{CompletionRequest, OpenAiClient};
use crate::models::{Document, IndexDocument, IndexSummary, RepoRef, RetrieveRequest};
use crate::scrape::BrowserlessClient;

// ═══════════════════════════════════════════════════════════════════════
// RepoHost
// ═══════════════════════════════════════════════════════════════════════

/// A source-code host that can list and serve the files of a branch.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Returns the blob paths of `repo`'s branch, in tree order, without
    /// archives.
    async fn list_files(&self, repo: &RepoRef) -> Result<Vec<String>>;

    /// Fetches one file.
    ///
    /// Infallible by contract: a failed fetch yields a placeholder
    /// [`Document`] with empty content and `metadata.error` set, so one bad
    /// file never aborts a repository scan.
    async fn fetch_file(&self, repo: &RepoRef, path: &str) -> Document;
}

// ═══════════════════════════════════════════════════════════════════════
// IndexService
// ═══════════════════════════════════════════════════════════════════════

/// A managed document index: stores, chunks, and retrieves documents.
#[async_trait]
pub trait IndexService: Send + Sync {
    async fn create_index(&self, index_name: &str) -> Result<Value>;

    async fn list_indexes(&self) -> Result<Vec<IndexSummary>>;

    async fn index_document(&self, document: &IndexDocument) -> Result<Value>;

    /// Submits one batch. Callers are responsible for sizing batches.
    async fn batch_index(&self, documents: &[IndexDocument]) -> Result<()>;

    /// Returns the service's retrieval payload exactly as received.
    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// CompletionProvider
// ═══════════════════════════════════════════════════════════════════════

/// A chat-completion LLM.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the first choice's message text, or `None` when the model
    /// produced no content.
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>>;
}

// ═══════════════════════════════════════════════════════════════════════
// PageScraper
// ═══════════════════════════════════════════════════════════════════════

/// Renders a web page in a headless browser and returns its HTML.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════════════════
// Services
// ═══════════════════════════════════════════════════════════════════════

/// The service bundle handed to every pipeline operation and route handler.
///
/// Cloning is cheap; all members are reference counted.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub repos: Arc<dyn RepoHost>,
    pub index: Arc<dyn IndexService>,
    pub llm: Arc<dyn CompletionProvider>,
    pub scraper: Arc<dyn PageScraper>,
}

impl Services {
    /// Wires the production clients (GitHub, Ducky, OpenAI, Browserless)
    /// over one shared HTTP connection pool.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = config.http.client()?;
        Ok(Self {
            config: Arc::new(config.clone()),
            repos: Arc::new(GithubClient::new(
                http.clone(),
                &config.github,
                config.secrets.github_token.clone(),
            )),
            index: Arc::new(DuckyClient::new(
                http.clone(),
                &config.index.api_url,
                config.secrets.ducky_api_key.clone(),
            )),
            llm: Arc::new(OpenAiClient::new(
                http.clone(),
                &config.llm,
                config.secrets.openai_api_key.clone(),
            )),
            scraper: Arc::new(BrowserlessClient::new(
                http,
                &config.scrape,
                config.secrets.browserless_api_key.clone(),
            )),
        })
    }
}
