//! Ingestion pipeline orchestration.
//!
//! Repository flow: parse URL → list files → fetch contents (bounded
//! concurrency) → create index → submit batches. Fetch failures degrade to
//! placeholder documents, and index-creation and batch failures are logged
//! and skipped, so the caller always gets the fetched document list back.
//!
//! Page flow: derive index name → scrape → reduce to text → create index →
//! index one document. Every step's error propagates.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use crate::error::Result;
use crate::github::parse_repo_url;
use crate::models::{Document, IndexDocument, RepoRef};
use crate::scrape::{derive_index_name, html_to_text};
use crate::traits::{IndexService, RepoHost, Services};

/// Output of [`process_repository`]: `{index_name, result}` on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryIngest {
    pub index_name: String,
    /// Every fetched document, including placeholders, before filtering.
    pub result: Vec<Document>,
    #[serde(skip)]
    pub report: BatchReport,
}

/// Outcome of [`submit_batches`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub submitted: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

pub async fn process_repository(services: &Services, github_url: &str) -> Result<RepositoryIngest> {
    let start = Instant::now();

    let repo = parse_repo_url(github_url)?;
    tracing::info!(owner = %repo.owner, repo = %repo.repo, branch = %repo.branch, "Scanning all files in the repository");

    let paths = services.repos.list_files(&repo).await?;
    tracing::info!(files = paths.len(), "Found files to fetch");

    let documents = fetch_documents(
        services.repos.as_ref(),
        &repo,
        paths,
        services.config.ingest.fetch_concurrency,
    )
    .await;

    let index_name = repo.repo.clone();
    if let Err(e) = services.index.create_index(&index_name).await {
        tracing::error!(index_name = %index_name, error = %e, "error creating index");
    }

    let to_index = prepare_index_documents(&documents, &index_name);
    let report = submit_batches(
        services.index.as_ref(),
        &to_index,
        services.config.index.batch_size,
    )
    .await;

    tracing::info!(
        index_name = %index_name,
        documents = documents.len(),
        submitted = report.submitted,
        failed_batches = report.failed_batches,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "Repository processed"
    );

    Ok(RepositoryIngest {
        index_name,
        result: documents,
        report,
    })
}

/// Fetches every path exactly once with at most `concurrency` requests in
/// flight. Output order matches `paths`.
pub async fn fetch_documents(
    host: &dyn RepoHost,
    repo: &RepoRef,
    paths: Vec<String>,
    concurrency: usize,
) -> Vec<Document> {
    stream::iter(paths)
        .map(|path| async move { host.fetch_file(repo, &path).await })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Drops blank documents and numbers the rest `doc-0`, `doc-1`, ...
pub fn prepare_index_documents(documents: &[Document], index_name: &str) -> Vec<IndexDocument> {
    documents
        .iter()
        .filter(|doc| !doc.is_blank())
        .enumerate()
        .map(|(i, doc)| IndexDocument {
            index_name: index_name.to_string(),
            doc_id: Some(format!("doc-{}", i)),
            content: doc.content.clone(),
            title: Some(doc.title.clone()),
            url: Some(doc.url.clone()),
            metadata: serde_json::to_value(&doc.metadata).ok(),
        })
        .collect()
}

/// Submits `documents` in consecutive batches of `batch_size`, one at a
/// time. A failed batch is logged and the next one still goes out.
pub async fn submit_batches(
    index: &dyn IndexService,
    documents: &[IndexDocument],
    batch_size: usize,
) -> BatchReport {
    let mut report = BatchReport::default();

    for (n, batch) in documents.chunks(batch_size.max(1)).enumerate() {
        let first = n * batch_size.max(1) + 1;
        let last = first + batch.len() - 1;
        report.batches += 1;

        match index.batch_index(batch).await {
            Ok(()) => {
                report.submitted += batch.len();
                tracing::info!("Indexed documents {} to {}", first, last);
            }
            Err(e) => {
                report.failed_batches += 1;
                tracing::error!(error = %e, "Error indexing documents {} to {}", first, last);
            }
        }
    }

    report
}

/// A single page or text to index, as posted to `/document`.
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub index_name: String,
    pub title: String,
    pub content: String,
    pub url: String,
}

/// Creates the index and indexes one document into it.
pub async fn index_page(services: &Services, page: PageDocument) -> Result<Value> {
    services.index.create_index(&page.index_name).await?;
    let document = IndexDocument {
        index_name: page.index_name,
        doc_id: None,
        content: page.content,
        title: Some(page.title),
        url: Some(page.url),
        metadata: None,
    };
    services.index.index_document(&document).await
}

/// Scrapes `url` and indexes its text under an index named after its host.
/// Returns the index name.
pub async fn process_page(services: &Services, url: &str) -> Result<String> {
    let index_name = derive_index_name(url)?;
    let html = services.scraper.fetch_html(url).await?;
    let content = html_to_text(&html);
    tracing::info!(url, index_name = %index_name, chars = content.len(), "Scraped page");

    index_page(
        services,
        PageDocument {
            index_name: index_name.clone(),
            title: index_name.clone(),
            content,
            url: url.to_string(),
        },
    )
    .await?;

    Ok(index_name)
}
