//! Chat-completion client for OpenAI-compatible APIs.
//!
//! Sends a single `POST {llm.api_url}/chat/completions` with a system turn
//! and a user turn. Requires `OPENAI_API_KEY`.
//!
//! Unlike embedding backfills, answers are interactive: there is no retry
//! loop, and an error status is returned to the caller immediately.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::traits::CompletionProvider;

const SERVICE: &str = "LLM API";

/// One completion: a system prompt and the user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Overrides `llm.max_tokens` for this call.
    pub max_tokens: Option<u32>,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: &LlmConfig, api_key: Option<String>) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key,
        }
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = request.max_tokens.or(self.max_tokens) {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

/// Extracts `choices[0].message.content`, treating blank content as absent.
fn parse_completion(json: &Value) -> Option<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(Error::transport(SERVICE))?;

        let status = response.status();
        if !status.is_success() {
            // OpenAI puts the useful text in `error.message`.
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
            tracing::error!(status = status.as_u16(), %message, "LLM API error");
            return Err(Error::ExternalService {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = response.json().await.map_err(Error::transport(SERVICE))?;
        Ok(parse_completion(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(max_tokens: Option<u32>) -> OpenAiClient {
        let cfg = LlmConfig {
            max_tokens,
            ..LlmConfig::default()
        };
        OpenAiClient::new(reqwest::Client::new(), &cfg, Some("sk-test".into()))
    }

    #[test]
    fn test_request_body() {
        let req = CompletionRequest {
            system: "sys".into(),
            user: "hi".into(),
            max_tokens: None,
        };
        let body = client(None).request_body(&req);
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_max_tokens_override() {
        let req = CompletionRequest {
            system: "sys".into(),
            user: "hi".into(),
            max_tokens: Some(500),
        };
        assert_eq!(client(Some(100)).request_body(&req)["max_tokens"], 500);
    }

    #[test]
    fn test_parse_completion() {
        let ok = json!({"choices": [{"message": {"role": "assistant", "content": "Answer"}}]});
        assert_eq!(parse_completion(&ok).as_deref(), Some("Answer"));

        let empty = json!({"choices": []});
        assert_eq!(parse_completion(&empty), None);

        let blank = json!({"choices": [{"message": {"content": "  "}}]});
        assert_eq!(parse_completion(&blank), None);

        let null = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(parse_completion(&null), None);
    }
}
