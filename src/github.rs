//! GitHub repository access.
//!
//! Three pieces, leaf to root:
//!
//! 1. [`parse_repo_url`] turns `github.com/<owner>/<repo>[/tree/<branch>]`
//!    into a [`RepoRef`].
//! 2. [`GithubClient::list_files`] lists the blob paths of a branch through
//!    the recursive tree API (bearer-authenticated).
//! 3. [`GithubClient::fetch_file`] downloads one file from the raw-content
//!    host (unauthenticated) and wraps it in a [`Document`].

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::models::{Document, DocumentMetadata, RepoRef};
use crate::traits::RepoHost;

const SERVICE_API: &str = "GitHub API";
const SERVICE_RAW: &str = "GitHub raw content";

fn repo_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"github\.com/([^/]+)/([^/]+)(?:/tree/([^/]+))?")
            .expect("repository URL pattern is valid")
    })
}

/// Extracts owner, repository, and branch from a GitHub URL.
///
/// The branch defaults to `main` when the URL has no `/tree/<branch>`
/// segment. A trailing `.git` on the repository is dropped so clone URLs
/// work too.
pub fn parse_repo_url(url: &str) -> Result<RepoRef> {
    let caps = repo_url_pattern()
        .captures(url)
        .ok_or_else(|| Error::InvalidInput(format!("invalid GitHub repository URL: '{}'", url)))?;

    let owner = caps[1].to_string();
    let repo = caps[2].trim_end_matches(".git").to_string();
    if repo.is_empty() {
        return Err(Error::InvalidInput(format!(
            "invalid GitHub repository URL: '{}'",
            url
        )));
    }
    let branch = caps
        .get(3)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "main".to_string());

    Ok(RepoRef {
        owner,
        repo,
        branch,
    })
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Keeps blob entries, dropping `.zip` archives, in tree order.
fn select_blob_paths(entries: Vec<TreeEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|e| e.kind == "blob" && !e.path.ends_with(".zip"))
        .map(|e| e.path)
        .collect()
}

fn file_metadata(repo: &RepoRef, path: &str, num_lines: usize, error: Option<String>) -> DocumentMetadata {
    let extension = path.rsplit('.').next().unwrap_or(path);
    let filename = path.rsplit('/').next().unwrap_or(path);
    DocumentMetadata {
        suffix: format!(".{}", extension),
        num_lines,
        filename: filename.to_string(),
        repository: repo.web_url(),
        error,
    }
}

/// Wraps fetched file content in a [`Document`].
pub fn file_document(repo: &RepoRef, path: &str, content: String) -> Document {
    let num_lines = content.split('\n').count();
    Document {
        url: repo.blob_url(path),
        title: path.to_string(),
        metadata: file_metadata(repo, path, num_lines, None),
        content,
    }
}

/// Placeholder for a file whose content could not be fetched.
pub fn placeholder_document(repo: &RepoRef, path: &str, error: String) -> Document {
    Document {
        content: String::new(),
        url: repo.blob_url(path),
        title: path.to_string(),
        metadata: file_metadata(repo, path, 0, Some(error)),
    }
}

/// GitHub REST + raw-content client.
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    raw_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(http: reqwest::Client, config: &GithubConfig, token: Option<String>) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            raw_url: config.raw_url.clone(),
            token,
        }
    }

    fn raw_file_url(&self, repo: &RepoRef, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.raw_url)
            .map_err(|e| Error::Config(format!("github.raw_url is not a valid URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("github.raw_url cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend([repo.owner.as_str(), repo.repo.as_str(), repo.branch.as_str()])
            .extend(path.split('/'));
        Ok(url)
    }

    async fn fetch_raw(&self, repo: &RepoRef, path: &str) -> Result<String> {
        let url = self.raw_file_url(repo, path)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(Error::transport(SERVICE_RAW))?;

        if !response.status().is_success() {
            return Err(Error::from_response(SERVICE_RAW, response).await);
        }

        response.text().await.map_err(Error::transport(SERVICE_RAW))
    }
}

#[async_trait]
impl RepoHost for GithubClient {
    async fn list_files(&self, repo: &RepoRef) -> Result<Vec<String>> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_url, repo.owner, repo.repo, repo.branch
        );

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(Error::transport(SERVICE_API))?;
        if !response.status().is_success() {
            return Err(Error::from_response(SERVICE_API, response).await);
        }

        let tree: TreeResponse = response.json().await.map_err(Error::transport(SERVICE_API))?;
        if tree.truncated {
            tracing::warn!(
                owner = %repo.owner,
                repo = %repo.repo,
                "GitHub truncated the file tree; some files will be missing"
            );
        }

        Ok(select_blob_paths(tree.tree))
    }

    async fn fetch_file(&self, repo: &RepoRef, path: &str) -> Document {
        match self.fetch_raw(repo, path).await {
            Ok(content) => file_document(repo, path, content),
            Err(e) => {
                let message = format!("Error fetching content of {}: {}", path, e);
                tracing::warn!(path, error = %e, "Error processing file");
                placeholder_document(repo, path, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoRef {
        RepoRef {
            owner: "octo".into(),
            repo: "demo".into(),
            branch: "main".into(),
        }
    }

    #[test]
    fn test_parse_defaults_branch_to_main() {
        let r = parse_repo_url("https://github.com/octo/demo").unwrap();
        assert_eq!(r, repo());
    }

    #[test]
    fn test_parse_tree_branch() {
        let r = parse_repo_url("https://github.com/octo/demo/tree/develop").unwrap();
        assert_eq!(r.branch, "develop");
        assert_eq!(r.repo, "demo");
    }

    #[test]
    fn test_parse_without_scheme_and_with_trailing_path() {
        let r = parse_repo_url("github.com/octo/demo/blob/main/README.md").unwrap();
        assert_eq!(r.owner, "octo");
        assert_eq!(r.repo, "demo");
        assert_eq!(r.branch, "main");
    }

    #[test]
    fn test_parse_strips_git_suffix() {
        let r = parse_repo_url("https://github.com/octo/demo.git").unwrap();
        assert_eq!(r.repo, "demo");
    }

    #[test]
    fn test_parse_rejects_non_github() {
        for url in [
            "https://gitlab.com/octo/demo",
            "https://github.com/octo",
            "not a url",
            "",
        ] {
            let err = parse_repo_url(url).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{} should be rejected", url);
        }
    }

    #[test]
    fn test_select_blob_paths_filters_trees_and_archives() {
        let entries = vec![
            TreeEntry { path: "src".into(), kind: "tree".into() },
            TreeEntry { path: "src/lib.rs".into(), kind: "blob".into() },
            TreeEntry { path: "vendor/sub".into(), kind: "commit".into() },
            TreeEntry { path: "dist/release.zip".into(), kind: "blob".into() },
            TreeEntry { path: "README.md".into(), kind: "blob".into() },
        ];
        let paths = select_blob_paths(entries);
        assert_eq!(paths, vec!["src/lib.rs", "README.md"]);
    }

    #[test]
    fn test_file_document_metadata() {
        let doc = file_document(&repo(), "src/app/main.tsx", "a\nb\nc".to_string());
        assert_eq!(doc.title, "src/app/main.tsx");
        assert_eq!(doc.url, "https://github.com/octo/demo/blob/main/src/app/main.tsx");
        assert_eq!(doc.metadata.suffix, ".tsx");
        assert_eq!(doc.metadata.num_lines, 3);
        assert_eq!(doc.metadata.filename, "main.tsx");
        assert_eq!(doc.metadata.repository, "https://github.com/octo/demo");
        assert!(doc.metadata.error.is_none());
    }

    #[test]
    fn test_placeholder_document() {
        let doc = placeholder_document(&repo(), "LICENSE", "boom".to_string());
        assert_eq!(doc.content, "");
        assert_eq!(doc.metadata.num_lines, 0);
        assert_eq!(doc.metadata.filename, "LICENSE");
        assert_eq!(doc.metadata.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_raw_file_url_keeps_base_path() {
        let cfg = GithubConfig {
            api_url: "http://localhost:1".into(),
            raw_url: "http://localhost:1/raw/".into(),
        };
        let client = GithubClient::new(reqwest::Client::new(), &cfg, None);
        let url = client.raw_file_url(&repo(), "docs/my notes.md").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1/raw/octo/demo/main/docs/my%20notes.md"
        );
    }
}
