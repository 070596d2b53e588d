//! # codescout
//!
//! Chat with a GitHub repository (or a web page) through a managed
//! retrieval index and an LLM.
//!
//! codescout does no ranking, chunking, or generation of its own. It fetches
//! content, hands it to a document-index service, and forwards retrieval
//! results plus the user's question to a chat-completion API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │   GitHub    │──▶│   ingest     │──▶│ index service │
//! │ tree + raw  │   │ fetch+batch  │   │   (Ducky)     │
//! └─────────────┘   └──────────────┘   └───────┬───────┘
//!                                              │ retrieve
//!                   ┌──────────────┐   ┌───────▼───────┐
//!                   │  HTTP / CLI  │◀──│   gateway     │◀── LLM
//!                   └──────────────┘   └───────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`traits`] | Upstream service seams and the [`traits::Services`] bundle |
//! | [`github`] | Repository URL parsing, file tree, raw content |
//! | [`ducky`] | Document-index service client |
//! | [`llm`] | Chat-completion client |
//! | [`scrape`] | Headless-browser scraping and HTML reduction |
//! | [`ingest`] | Repository and page ingestion pipelines |
//! | [`gateway`] | Retrieval and answer generation |
//! | [`server`] | HTTP routes |
//! | [`chat`] | Chat session state machine |
//! | [`logging`] | `tracing` subscriber setup |

pub mod chat;
pub mod config;
pub mod ducky;
pub mod error;
pub mod gateway;
pub mod github;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod models;
pub mod scrape;
pub mod server;
pub mod traits;

pub use error::{Error, Result};
