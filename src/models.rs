//! Core data models.
//!
//! These types flow through the ingestion pipeline (repository → documents →
//! index service) and the retrieval path (index service → context → LLM).
//! Field names match the JSON the HTTP API and the upstream services speak.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A repository coordinate parsed from a GitHub URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoRef {
    /// `https://github.com/{owner}/{repo}`
    pub fn web_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }

    /// Browsable URL of a file on this branch.
    pub fn blob_url(&self, path: &str) -> String {
        format!("{}/blob/{}/{}", self.web_url(), self.branch, path)
    }
}

/// One fetched source file, ready for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub url: String,
    pub title: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub suffix: String,
    pub num_lines: usize,
    pub filename: String,
    pub repository: String,
    /// Set only on placeholder documents whose fetch failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Document {
    /// True when the document carries no indexable text.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Wire form of a document submitted to the index service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub index_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// An index as listed by the index service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    #[serde(rename = "indexName", alias = "index_name")]
    pub index_name: String,
}

/// Query sent to the index service's retrieve endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub index_name: String,
    pub query: String,
    pub top_k: u32,
    pub alpha: f64,
    pub rerank: bool,
}

/// The parts of a retrieval payload the answer path reads. The payload
/// itself travels as raw JSON; this view is decoded from it and never
/// written back.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RetrieveResult {
    #[serde(default)]
    pub documents: Vec<RetrievedDocument>,
}

/// A document (or its matching chunks) returned by retrieval.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RetrievedDocument {
    #[serde(default, alias = "docId")]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "contentChunks")]
    pub content_chunks: Vec<String>,
}

impl RetrievedDocument {
    /// Full content when present, otherwise the matched chunks.
    pub fn text(&self) -> String {
        match &self.content {
            Some(content) => content.clone(),
            None => self.content_chunks.join("\n\n"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_json_shape() {
        let doc = Document {
            content: "fn main() {}".to_string(),
            url: "https://github.com/o/r/blob/main/src/main.rs".to_string(),
            title: "src/main.rs".to_string(),
            metadata: DocumentMetadata {
                suffix: ".rs".to_string(),
                num_lines: 1,
                filename: "main.rs".to_string(),
                repository: "https://github.com/o/r".to_string(),
                error: None,
            },
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["metadata"]["num_lines"], 1);
        assert!(value["metadata"].get("error").is_none());
    }

    #[test]
    fn test_retrieve_result_reads_both_casings() {
        let raw = json!({
            "documents": [
                {"doc_id": "doc-1", "title": "README.md", "content_chunks": ["a", "b"], "score": 0.9},
                {"docId": "doc-2", "content": null, "contentChunks": ["c"]},
                {"doc_id": "doc-3", "content_chunks": []}
            ],
            "took_ms": 12
        });
        let parsed = RetrieveResult::deserialize(&raw).unwrap();
        assert_eq!(parsed.documents[0].text(), "a\n\nb");
        assert_eq!(parsed.documents[1].doc_id.as_deref(), Some("doc-2"));
        assert_eq!(parsed.documents[1].text(), "c");
        assert_eq!(parsed.documents[2].text(), "");
    }

    #[test]
    fn test_retrieve_result_without_documents() {
        let parsed = RetrieveResult::deserialize(&json!({"took_ms": 1})).unwrap();
        assert!(parsed.documents.is_empty());
    }

    #[test]
    fn test_index_summary_accepts_both_casings() {
        let a: IndexSummary = serde_json::from_value(json!({"indexName": "x"})).unwrap();
        let b: IndexSummary = serde_json::from_value(json!({"index_name": "x"})).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!({"indexName": "x"}));
    }

    #[test]
    fn test_repo_urls() {
        let repo = RepoRef {
            owner: "o".into(),
            repo: "r".into(),
            branch: "dev".into(),
        };
        assert_eq!(repo.blob_url("a/b.ts"), "https://github.com/o/r/blob/dev/a/b.ts");
    }
}
