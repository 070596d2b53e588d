//! Client for the managed document-index service (Ducky HTTP API).
//!
//! # Endpoints
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | `POST` | `/v1/indexes` | [`IndexService::create_index`] |
//! | `GET`  | `/v1/indexes` | [`IndexService::list_indexes`] |
//! | `POST` | `/v1/documents/index` | [`IndexService::index_document`] |
//! | `POST` | `/v1/documents/batch-index` | [`IndexService::batch_index`] |
//! | `POST` | `/v1/documents/retrieve` | [`IndexService::retrieve`] |
//!
//! Requests authenticate with the `x-api-key` header. No call is retried;
//! a non-success status becomes [`Error::ExternalService`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::models::{IndexDocument, IndexSummary, RetrieveRequest};
use crate::traits::IndexService;

const SERVICE: &str = "index service";

pub struct DuckyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// `GET /v1/indexes` has been seen both as a bare array and wrapped in an
/// object.
#[derive(Deserialize)]
#[serde(untagged)]
enum IndexListResponse {
    Wrapped { indexes: Vec<IndexSummary> },
    Bare(Vec<IndexSummary>),
}

#[derive(Serialize)]
struct BatchIndexBody<'a> {
    documents: &'a [IndexDocument],
}

impl DuckyClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Config("DUCKY_API_KEY not set".to_string()))?;
        Ok(self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-api-key", key))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(Error::transport(SERVICE))?;
        if !response.status().is_success() {
            return Err(Error::from_response(SERVICE, response).await);
        }
        response.json().await.map_err(Error::transport(SERVICE))
    }
}

#[async_trait]
impl IndexService for DuckyClient {
    async fn create_index(&self, index_name: &str) -> Result<Value> {
        let request = self
            .request(reqwest::Method::POST, "/v1/indexes")?
            .json(&json!({ "index_name": index_name }));
        self.send(request).await
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSummary>> {
        let request = self.request(reqwest::Method::GET, "/v1/indexes")?;
        let list: IndexListResponse = self.send(request).await?;
        Ok(match list {
            IndexListResponse::Wrapped { indexes } => indexes,
            IndexListResponse::Bare(indexes) => indexes,
        })
    }

    async fn index_document(&self, document: &IndexDocument) -> Result<Value> {
        let request = self
            .request(reqwest::Method::POST, "/v1/documents/index")?
            .json(document);
        self.send(request).await
    }

    async fn batch_index(&self, documents: &[IndexDocument]) -> Result<()> {
        let request = self
            .request(reqwest::Method::POST, "/v1/documents/batch-index")?
            .json(&BatchIndexBody { documents });
        // The response body carries nothing the pipeline uses.
        let response = request.send().await.map_err(Error::transport(SERVICE))?;
        if !response.status().is_success() {
            return Err(Error::from_response(SERVICE, response).await);
        }
        Ok(())
    }

    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Value> {
        let http_request = self
            .request(reqwest::Method::POST, "/v1/documents/retrieve")?
            .json(request);
        self.send(http_request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_list_accepts_both_shapes() {
        let wrapped: IndexListResponse =
            serde_json::from_value(json!({"indexes": [{"index_name": "a"}]})).unwrap();
        let bare: IndexListResponse =
            serde_json::from_value(json!([{"indexName": "b"}])).unwrap();
        assert!(matches!(wrapped, IndexListResponse::Wrapped { ref indexes } if indexes[0].index_name == "a"));
        assert!(matches!(bare, IndexListResponse::Bare(ref indexes) if indexes[0].index_name == "b"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let client = DuckyClient::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
        let err = client.list_indexes().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
