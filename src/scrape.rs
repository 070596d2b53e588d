//! Web page scraping through a headless-browser service (Browserless).
//!
//! The scraper returns rendered HTML; [`html_to_text`] reduces it to a single
//! line of plain text suitable for indexing, and [`derive_index_name`] names
//! the index after the page's host.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use serde_json::json;
use std::sync::OnceLock;

use crate::config::ScrapeConfig;
use crate::error::{Error, Result};
use crate::traits::PageScraper;

const SERVICE: &str = "scraping service";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Index name for a page: hostname without a leading `www`, labels joined
/// by `-`, anything else non-alphanumeric replaced by `-`, lowercased.
///
/// `https://www.Example.co.uk/terms` → `example-co-uk`
pub fn derive_index_name(url: &str) -> Result<String> {
    let invalid = || Error::InvalidInput("Invalid URL format".to_string());
    let parsed = Url::parse(url).map_err(|_| invalid())?;
    let host = parsed.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;

    let labels: Vec<&str> = host.split('.').collect();
    let labels = match labels.first() {
        Some(&"www") => &labels[1..],
        _ => &labels[..],
    };

    Ok(labels
        .join("-")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect())
}

struct TextPatterns {
    script: Regex,
    style: Regex,
    tag: Regex,
    whitespace: Regex,
}

fn text_patterns() -> &'static TextPatterns {
    static PATTERNS: OnceLock<TextPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| TextPatterns {
        script: Regex::new(r"(?is)<script\b.*?</script\s*>").expect("script pattern is valid"),
        style: Regex::new(r"(?is)<style\b.*?</style\s*>").expect("style pattern is valid"),
        tag: Regex::new(r"<[^>]+>").expect("tag pattern is valid"),
        whitespace: Regex::new(r"\s+").expect("whitespace pattern is valid"),
    })
}

/// Strips scripts, styles, and tags, then collapses whitespace.
pub fn html_to_text(html: &str) -> String {
    let p = text_patterns();
    let text = p.script.replace_all(html, "");
    let text = p.style.replace_all(&text, "");
    let text = p.tag.replace_all(&text, " ");
    let text = p.whitespace.replace_all(&text, " ");
    text.trim().to_string()
}

pub struct BrowserlessClient {
    http: reqwest::Client,
    endpoint: String,
    wait_for_ms: u64,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(http: reqwest::Client, config: &ScrapeConfig, token: Option<String>) -> Self {
        Self {
            http,
            endpoint: format!("{}/content", config.api_url.trim_end_matches('/')),
            wait_for_ms: config.wait_for_ms,
            token,
        }
    }
}

#[async_trait]
impl PageScraper for BrowserlessClient {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| Error::Config("Browserless API key is not configured".to_string()))?;

        let body = json!({
            "url": url,
            "waitFor": self.wait_for_ms,
            "userAgent": USER_AGENT,
            "viewport": { "width": 1920, "height": 1080 },
            "rejectResourceTypes": ["image", "media", "font"],
        });

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("token", token)])
            .header("Cache-Control", "no-cache")
            .json(&body)
            .send()
            .await
            .map_err(Error::transport(SERVICE))?;

        if !response.status().is_success() {
            let err = Error::from_response(SERVICE, response).await;
            tracing::error!(url, error = %err, "Browserless API error");
            return Err(err);
        }

        response.text().await.map_err(Error::transport(SERVICE))
    }
}
