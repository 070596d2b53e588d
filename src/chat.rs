//! Chat session state for a client talking to a running server.
//!
//! ```text
//!            send()
//!   Idle ───────────▶ Loading ──ok──▶ Success
//!                        │
//!                        └──err──▶ Error
//! ```
//!
//! The user's message is appended before the request goes out. On failure
//! an apology message is appended in place of the answer and
//! [`ChatSession::error`] is set until the next send. There is no retry or
//! cancellation, and messages are never edited.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{ChatMessage, Role};

pub const APOLOGY: &str =
    "Sorry, I encountered an error while processing your question. Please try again.";
pub const SEND_FAILED: &str = "Failed to get response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Where a chat session sends its questions.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn generate(&self, index_name: &str, question: &str) -> Result<String>;
}

/// Posts questions to `{base_url}/generateResponse`.
pub struct HttpAnswerBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAnswerBackend {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct AnswerBody {
    answer: String,
}

#[async_trait]
impl AnswerBackend for HttpAnswerBackend {
    async fn generate(&self, index_name: &str, question: &str) -> Result<String> {
        const SERVICE: &str = "codescout server";
        let response = self
            .http
            .post(format!("{}/generateResponse", self.base_url))
            .json(&json!({ "index_name": index_name, "question": question }))
            .send()
            .await
            .map_err(Error::transport(SERVICE))?;
        if !response.status().is_success() {
            return Err(Error::from_response(SERVICE, response).await);
        }
        let body: AnswerBody = response.json().await.map_err(Error::transport(SERVICE))?;
        Ok(body.answer)
    }
}

pub struct ChatSession<B> {
    backend: B,
    index_name: String,
    messages: Vec<ChatMessage>,
    status: ChatStatus,
    error: Option<String>,
}

impl<B: AnswerBackend> ChatSession<B> {
    pub fn new(backend: B, index_name: impl Into<String>) -> Self {
        Self {
            backend,
            index_name: index_name.into(),
            messages: Vec::new(),
            status: ChatStatus::Idle,
            error: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn status(&self) -> ChatStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == ChatStatus::Loading
    }

    /// Sends `question` and returns the message appended in reply (the
    /// answer, or the apology on failure).
    pub async fn send(&mut self, question: &str) -> &ChatMessage {
        self.error = None;
        self.push(Role::User, question.to_string());
        self.status = ChatStatus::Loading;

        match self.backend.generate(&self.index_name, question).await {
            Ok(answer) => {
                self.status = ChatStatus::Success;
                self.push(Role::Assistant, answer)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error getting response");
                self.status = ChatStatus::Error;
                self.error = Some(SEND_FAILED.to_string());
                self.push(Role::Assistant, APOLOGY.to_string())
            }
        }
    }

    fn push(&mut self, role: Role, content: String) -> &ChatMessage {
        self.messages.push(ChatMessage {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            created_at: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }
}
