//! HTTP server.
//!
//! Stateless JSON routes over the ingestion and answer pipelines. Every
//! handler receives the same [`Services`] bundle through Axum's `State`
//! extractor.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/processRepository` | Fetch and index a GitHub repository |
//! | `POST` | `/retrieveDocuments` | Raw retrieval passthrough |
//! | `GET`  | `/listIndexes` | Indexes known to the index service |
//! | `POST` | `/generateResponse` | Retrieve + answer for a repository index |
//! | `POST` | `/scrape` | Scrape a page and return its text |
//! | `POST` | `/document` | Create an index and add one document |
//! | `POST` | `/processUrl` | Scrape a page and index it under its host name |
//! | `POST` | `/chat` | Retrieve + answer for a page index |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Pipeline failures are logged and reported as a 500 with a fixed,
//! route-specific message; upstream details never reach the client. A
//! request body that does not decode counts as such a failure:
//!
//! ```json
//! { "error": { "code": "internal", "message": "Error processing repository." } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser frontends on
//! other ports can call the API.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::Error;
use crate::gateway;
use crate::ingest::{self, PageDocument, RepositoryIngest};
use crate::models::IndexSummary;
use crate::scrape::html_to_text;
use crate::traits::Services;

/// Starts the server with the production upstream clients.
///
/// Binds to `server.host` and `PORT`; fails before binding when no port is
/// configured.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config)?;
    run_server_with_services(services).await
}

/// Starts the server over an arbitrary service bundle (custom providers,
/// test fakes). The bind address still comes from `services.config`.
pub async fn run_server_with_services(services: Services) -> anyhow::Result<()> {
    let bind_addr = services.config.bind_addr()?;
    let app = router(services);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server running on: http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the route table.
pub fn router(services: Services) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/processRepository", post(handle_process_repository))
        .route("/retrieveDocuments", post(handle_retrieve_documents))
        .route("/listIndexes", get(handle_list_indexes))
        .route("/generateResponse", post(handle_generate_response))
        .route("/scrape", post(handle_scrape))
        .route("/document", post(handle_document))
        .route("/processUrl", post(handle_process_url))
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(services)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// A logged failure rendered as a generic 500.
struct AppError {
    message: &'static str,
}

impl AppError {
    /// Logs `err` and hides it behind `message`.
    fn internal(message: &'static str) -> impl FnOnce(Error) -> AppError {
        move |err| {
            tracing::error!(error = %err, "{}", message);
            AppError { message }
        }
    }
}

/// Unwraps a request body, failing with the route's `message` when it is
/// not JSON or does not match `T`.
fn decode<T>(payload: Result<Json<T>, JsonRejection>, message: &'static str) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::InvalidInput(rejection.body_text()))
        .map_err(AppError::internal(message))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "internal".to_string(),
                message: self.message.to_string(),
            },
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /processRepository ============

#[derive(Deserialize)]
struct ProcessRepositoryRequest {
    #[serde(rename = "githubUrl")]
    github_url: String,
}

/// Fetches and indexes a repository. Returns once fetching is complete;
/// the response does not guarantee that every batch was indexed.
async fn handle_process_repository(
    State(services): State<Services>,
    payload: Result<Json<ProcessRepositoryRequest>, JsonRejection>,
) -> Result<Json<RepositoryIngest>, AppError> {
    const FAILED: &str = "Error processing repository.";
    let req = decode(payload, FAILED)?;
    let ingest = ingest::process_repository(&services, &req.github_url)
        .await
        .map_err(AppError::internal(FAILED))?;
    Ok(Json(ingest))
}

// ============ POST /retrieveDocuments ============

#[derive(Deserialize)]
struct RetrieveDocumentsRequest {
    query: String,
    index_name: String,
}

async fn handle_retrieve_documents(
    State(services): State<Services>,
    payload: Result<Json<RetrieveDocumentsRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    const FAILED: &str = "Failed to retrieve documents.";
    let req = decode(payload, FAILED)?;
    let result = gateway::retrieve(&services, &req.query, &req.index_name)
        .await
        .map_err(AppError::internal(FAILED))?;
    Ok(Json(result))
}

// ============ GET /listIndexes ============

#[derive(Serialize)]
struct ListIndexesResponse {
    indexes: Vec<IndexSummary>,
}

async fn handle_list_indexes(
    State(services): State<Services>,
) -> Result<Json<ListIndexesResponse>, AppError> {
    let indexes = services
        .index
        .list_indexes()
        .await
        .map_err(AppError::internal("Failed to list indexes."))?;
    Ok(Json(ListIndexesResponse { indexes }))
}

// ============ POST /generateResponse ============

#[derive(Deserialize)]
struct GenerateResponseRequest {
    question: String,
    index_name: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

async fn handle_generate_response(
    State(services): State<Services>,
    payload: Result<Json<GenerateResponseRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    const FAILED: &str = "Failed to generate response.";
    let req = decode(payload, FAILED)?;
    let answer = gateway::answer(&services, &req.question, &req.index_name)
        .await
        .map_err(AppError::internal(FAILED))?;
    Ok(Json(AnswerResponse { answer }))
}

// ============ POST /scrape ============

#[derive(Deserialize)]
struct UrlRequest {
    url: String,
}

async fn handle_scrape(
    State(services): State<Services>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    const FAILED: &str = "Failed to scrape content from URL. The site may be blocking \
        automated access or the scraping service may be temporarily unavailable.";
    let req = decode(payload, FAILED)?;
    let html = services
        .scraper
        .fetch_html(&req.url)
        .await
        .map_err(AppError::internal(FAILED))?;
    Ok(Json(json!({ "content": html_to_text(&html) })))
}

// ============ POST /document ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRequest {
    index_name: String,
    title: String,
    content: String,
    url: String,
}

async fn handle_document(
    State(services): State<Services>,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    const FAILED: &str = "Failed to process document";
    let req = decode(payload, FAILED)?;
    let page = PageDocument {
        index_name: req.index_name,
        title: req.title,
        content: req.content,
        url: req.url,
    };
    let result = ingest::index_page(&services, page)
        .await
        .map_err(AppError::internal(FAILED))?;
    Ok(Json(result))
}

// ============ POST /processUrl ============

async fn handle_process_url(
    State(services): State<Services>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    const FAILED: &str = "Failed to process the document";
    let req = decode(payload, FAILED)?;
    let index_name = ingest::process_page(&services, &req.url)
        .await
        .map_err(AppError::internal(FAILED))?;
    Ok(Json(json!({ "indexName": index_name })))
}

// ============ POST /chat ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    index_name: String,
    question: String,
}

async fn handle_chat(
    State(services): State<Services>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    const FAILED: &str = "Failed to retrieve document";
    let req = decode(payload, FAILED)?;
    let answer = gateway::answer_page(&services, &req.question, &req.index_name)
        .await
        .map_err(AppError::internal(FAILED))?;
    Ok(Json(AnswerResponse { answer }))
}
