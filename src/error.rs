//! Error taxonomy shared by the ingestion pipeline, the upstream clients,
//! and the HTTP layer.
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | [`Error::InvalidInput`] | A URL or request value is rejected before any network call |
//! | [`Error::ExternalService`] | An upstream API answers with a non-success status |
//! | [`Error::Transport`] | A request could not be sent or its body could not be read |
//! | [`Error::Decode`] | An upstream payload does not have the expected shape |
//! | [`Error::Config`] | An operation needs a credential or setting that is not configured |
//!
//! Per-file fetch failures during repository ingestion never surface as an
//! [`Error`]; they are folded into placeholder documents instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{service} error: {status} {message}")]
    ExternalService {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned an unexpected payload: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps a `reqwest` failure with the name of the upstream it came from.
    pub fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Error::Transport { service, source }
    }

    /// Builds an [`Error::ExternalService`] from a non-success response,
    /// consuming its body as the message when the status has no reason text.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let message = if reason.is_empty() {
            response.text().await.unwrap_or_default()
        } else {
            reason
        };
        Error::ExternalService {
            service,
            status: status.as_u16(),
            message,
        }
    }
}
