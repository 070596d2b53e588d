//! Retrieval and answer generation.
//!
//! Two flavours share the same shape, retrieve → build context → one LLM
//! call:
//!
//! - **Codebase** ([`answer`]): top-K documents from a repository index,
//!   rendered as titled sections, with the senior-engineer system prompt.
//! - **Page** ([`answer_page`]): a few chunks from a scraped page, joined as
//!   plain paragraphs, with the terms-and-conditions system prompt.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::llm::CompletionRequest;
use crate::models::{RetrieveRequest, RetrieveResult, RetrievedDocument};
use crate::traits::Services;

/// Returned when the model produced no content.
pub const NO_RESPONSE: &str = "No response generated.";

pub const CODEBASE_SYSTEM_PROMPT: &str = r#"You are a senior software engineer and technical documentation assistant. You have full access to a complete and well-structured codebase and are responsible for answering technical questions about it with clarity, precision, and contextual awareness.

When responding:
- Carefully **analyze the codebase** to ground your answers in actual code, architecture, and design patterns.
- Always prefer **real, working code examples** from the codebase. If none exist, generate examples that strictly follow the codebase's conventions and structure.
- Clearly explain the **intent, behavior, and role** of key functions, components, hooks, or modules when relevant.
- If the question is abstract or conceptual, illustrate the answer using **patterns or practices observed in the codebase**.
- If multiple interpretations of the question are possible:
  - Briefly describe each interpretation.
  - Choose the most plausible one based on the context or typical usage in the codebase.
- Never invent or assume behaviors not present or inferable from the codebase.
- If you are uncertain or the codebase lacks the necessary context, explicitly state the limitation.

Formatting requirements (Markdown):
- Use triple backtick code blocks (```tsx, ```js, ```ts, etc.) for all code snippets.
- Use **bold** for emphasis on key terms or warnings.
- Use bullet points or numbered lists for structure and clarity.
- Keep responses concise but complete. Avoid verbosity, but do not omit important details.

Your goal is to help developers quickly understand, debug, extend, or document the system with high technical fidelity."#;

pub const PAGE_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about terms and conditions documents. Use the provided context to answer questions accurately and concisely.";

/// Queries the index with the configured `top_k`, `alpha`, and `rerank`.
/// The payload is returned untouched.
pub async fn retrieve(services: &Services, query: &str, index_name: &str) -> Result<Value> {
    retrieve_top_k(services, query, index_name, services.config.index.top_k).await
}

async fn retrieve_top_k(
    services: &Services,
    query: &str,
    index_name: &str,
    top_k: u32,
) -> Result<Value> {
    let cfg = &services.config.index;
    let request = RetrieveRequest {
        index_name: index_name.to_string(),
        query: query.to_string(),
        top_k,
        alpha: cfg.alpha,
        rerank: cfg.rerank,
    };
    services.index.retrieve(&request).await
}

async fn retrieve_documents(
    services: &Services,
    query: &str,
    index_name: &str,
    top_k: u32,
) -> Result<Vec<RetrievedDocument>> {
    let payload = retrieve_top_k(services, query, index_name, top_k).await?;
    let result = RetrieveResult::deserialize(&payload).map_err(|source| Error::Decode {
        service: "index service",
        source,
    })?;
    tracing::debug!(index_name, hits = result.documents.len(), "retrieved documents");
    Ok(result.documents)
}

/// Renders documents as `### {title}\n\n{content}` sections separated by
/// horizontal rules. Untitled documents are numbered from 1.
pub fn build_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let title = doc
                .title
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Document {}", i + 1));
            format!("### {}\n\n{}", title, doc.text())
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// User turn for the codebase flavour.
pub fn codebase_prompt(context: &str, question: &str) -> String {
    format!(
        "Here is the codebase context:\n\n{}\n\nNow, answer this question based on the codebase:\n\n\"{}\"",
        context, question
    )
}

/// Asks the LLM `question` grounded in `documents`.
pub async fn generate(
    services: &Services,
    question: &str,
    documents: &[RetrievedDocument],
) -> Result<String> {
    let request = CompletionRequest {
        system: CODEBASE_SYSTEM_PROMPT.to_string(),
        user: codebase_prompt(&build_context(documents), question),
        max_tokens: None,
    };
    let answer = services.llm.complete(&request).await?;
    Ok(answer.unwrap_or_else(|| NO_RESPONSE.to_string()))
}

/// Retrieve from `index_name`, then generate.
pub async fn answer(services: &Services, question: &str, index_name: &str) -> Result<String> {
    let top_k = services.config.index.top_k;
    let documents = retrieve_documents(services, question, index_name, top_k).await?;
    generate(services, question, &documents).await
}

/// Joins chunk texts of a page index with blank lines.
pub fn build_page_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(RetrievedDocument::text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Page flavour of [`answer`]: fewer chunks, plain context, page prompt.
pub async fn answer_page(services: &Services, question: &str, index_name: &str) -> Result<String> {
    let cfg = &services.config.scrape;
    let documents = retrieve_documents(services, question, index_name, cfg.top_k).await?;
    let context = build_page_context(&documents);

    let request = CompletionRequest {
        system: PAGE_SYSTEM_PROMPT.to_string(),
        user: format!(
            "Context from the document:\n\n{}\n\nQuestion: {}",
            context, question
        ),
        max_tokens: cfg.max_tokens,
    };
    let answer = services.llm.complete(&request).await?;
    Ok(answer.unwrap_or_else(|| NO_RESPONSE.to_string()))
}
