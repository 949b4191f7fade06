use async_trait::async_trait;
use serde_json::Value;
use std::sync::OnceLock;

use super::{BackendError, BackendSlot, SearchBackend, SearchHit};

const MAX_SNIPPET_CHARS: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProvider {
    Tavily,
    Brave,
    Exa,
}

impl SearchProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tavily => "tavily",
            Self::Brave => "brave",
            Self::Exa => "exa",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Tavily => "TAVILY_API_KEY",
            Self::Brave => "BRAVE_API_KEY",
            Self::Exa => "EXA_API_KEY",
        }
    }
}

pub fn parse_provider_token(input: &str) -> Option<SearchProvider> {
    match input.trim().to_ascii_lowercase().as_str() {
        "tavily" => Some(SearchProvider::Tavily),
        "brave" => Some(SearchProvider::Brave),
        "exa" => Some(SearchProvider::Exa),
        _ => None,
    }
}

pub fn all_providers() -> Vec<SearchProvider> {
    vec![
        SearchProvider::Tavily,
        SearchProvider::Brave,
        SearchProvider::Exa,
    ]
}

/// Hosted search API reached over HTTPS.
pub struct ProviderBackend {
    provider: SearchProvider,
    http: reqwest::Client,
    api_key: String,
}

impl ProviderBackend {
    pub fn new(provider: SearchProvider, http: reqwest::Client, api_key: String) -> Self {
        Self {
            provider,
            http,
            api_key,
        }
    }
}

/// Slot for `provider` given an optional API key; a missing or blank key
/// leaves the slot unconfigured.
pub fn provider_slot(
    provider: SearchProvider,
    http: &reqwest::Client,
    api_key: Option<String>,
) -> BackendSlot {
    match api_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => BackendSlot::ready(ProviderBackend::new(provider, http.clone(), key)),
        None => BackendSlot::NotConfigured {
            name: provider.as_str().to_string(),
            reason: format!("{} is not set", provider.api_key_env()),
        },
    }
}

pub(crate) fn slot_from_env(provider: SearchProvider, http: &reqwest::Client) -> BackendSlot {
    let slot = provider_slot(provider, http, std::env::var(provider.api_key_env()).ok());
    if let BackendSlot::NotConfigured { name, reason } = &slot {
        tracing::warn!(backend = %name, reason = %reason, "Search backend not configured; it will be skipped");
    }
    slot
}

#[async_trait]
impl SearchBackend for ProviderBackend {
    fn name(&self) -> &str {
        self.provider.as_str()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, BackendError> {
        let payload = match self.provider {
            SearchProvider::Tavily => request_tavily(&self.http, &self.api_key, query, max_results).await?,
            SearchProvider::Brave => request_brave(&self.http, &self.api_key, query, max_results).await?,
            SearchProvider::Exa => request_exa(&self.http, &self.api_key, query, max_results).await?,
        };
        let mut hits = match self.provider {
            SearchProvider::Tavily => parse_tavily_results(&payload)?,
            SearchProvider::Brave => parse_brave_results(&payload)?,
            SearchProvider::Exa => parse_exa_results(&payload)?,
        };
        hits.truncate(max_results);
        Ok(hits)
    }
}

fn request_error(provider: SearchProvider, message: impl ToString) -> BackendError {
    BackendError::Request {
        backend: provider.as_str().to_string(),
        message: message.to_string(),
    }
}

fn parse_error(provider: SearchProvider, message: impl ToString) -> BackendError {
    BackendError::Parse {
        backend: provider.as_str().to_string(),
        message: message.to_string(),
    }
}

async fn read_json(
    provider: SearchProvider,
    response: reqwest::Response,
) -> Result<Value, BackendError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(300).collect();
        return Err(request_error(provider, format!("status {status}: {body}")));
    }
    response
        .json()
        .await
        .map_err(|e| parse_error(provider, e))
}

async fn request_tavily(
    http: &reqwest::Client,
    api_key: &str,
    query: &str,
    max_results: usize,
) -> Result<Value, BackendError> {
    let body = serde_json::json!({
        "query": query,
        "search_depth": "basic",
        "max_results": max_results,
        "include_answer": false,
        "include_raw_content": false
    });

    let response = http
        .post("https://api.tavily.com/search")
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error(SearchProvider::Tavily, e))?;
    read_json(SearchProvider::Tavily, response).await
}

async fn request_brave(
    http: &reqwest::Client,
    api_key: &str,
    query: &str,
    max_results: usize,
) -> Result<Value, BackendError> {
    let count = max_results.to_string();
    let response = http
        .get("https://api.search.brave.com/res/v1/web/search")
        .header("Accept", "application/json")
        .header("X-Subscription-Token", api_key)
        .query(&[("q", query), ("count", count.as_str())])
        .send()
        .await
        .map_err(|e| request_error(SearchProvider::Brave, e))?;
    read_json(SearchProvider::Brave, response).await
}

async fn request_exa(
    http: &reqwest::Client,
    api_key: &str,
    query: &str,
    max_results: usize,
) -> Result<Value, BackendError> {
    let body = serde_json::json!({
        "query": query,
        "numResults": max_results,
        "type": "auto",
        "contents": { "text": { "maxCharacters": MAX_SNIPPET_CHARS } }
    });

    let response = http
        .post("https://api.exa.ai/search")
        .header("x-api-key", api_key)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error(SearchProvider::Exa, e))?;
    read_json(SearchProvider::Exa, response).await
}

fn str_field<'a>(row: &'a Value, key: &str) -> Option<&'a str> {
    row.get(key).and_then(|v| v.as_str())
}

fn build_hit(url: &str, title: Option<&str>, snippet: Option<&str>) -> Option<SearchHit> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    Some(SearchHit {
        title: strip_markup(title.unwrap_or("Untitled"), 300),
        url: url.to_string(),
        snippet: strip_markup(snippet.unwrap_or_default(), MAX_SNIPPET_CHARS),
    })
}

pub(crate) fn parse_tavily_results(payload: &Value) -> Result<Vec<SearchHit>, BackendError> {
    let results = payload
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| parse_error(SearchProvider::Tavily, "missing results array"))?;

    Ok(results
        .iter()
        .filter_map(|row| {
            build_hit(
                str_field(row, "url").unwrap_or_default(),
                str_field(row, "title"),
                str_field(row, "content"),
            )
        })
        .collect())
}

pub(crate) fn parse_brave_results(payload: &Value) -> Result<Vec<SearchHit>, BackendError> {
    // Brave omits `web` entirely when a query has no web results.
    let Some(web) = payload.get("web") else {
        return Ok(Vec::new());
    };
    let results = web
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| parse_error(SearchProvider::Brave, "missing web.results array"))?;

    Ok(results
        .iter()
        .filter_map(|row| {
            build_hit(
                str_field(row, "url").unwrap_or_default(),
                str_field(row, "title"),
                str_field(row, "description"),
            )
        })
        .collect())
}

pub(crate) fn parse_exa_results(payload: &Value) -> Result<Vec<SearchHit>, BackendError> {
    let results = payload
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| parse_error(SearchProvider::Exa, "missing results array"))?;

    Ok(results
        .iter()
        .filter_map(|row| {
            let snippet = str_field(row, "text").or_else(|| {
                row.get("highlights")
                    .and_then(|v| v.as_array())
                    .and_then(|arr| arr.first())
                    .and_then(|v| v.as_str())
            });
            build_hit(
                str_field(row, "url").unwrap_or_default(),
                str_field(row, "title"),
                snippet,
            )
        })
        .collect())
}

/// Collapse whitespace and drop HTML tags (Brave wraps matches in `<strong>`).
pub(crate) fn strip_markup(text: &str, max_chars: usize) -> String {
    static TAG: OnceLock<Option<regex::Regex>> = OnceLock::new();
    let without_tags = match TAG.get_or_init(|| regex::Regex::new(r"(?s)<[^>]+>").ok()) {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    };

    without_tags
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_provider_token_is_case_insensitive() {
        assert_eq!(parse_provider_token(" Tavily "), Some(SearchProvider::Tavily));
        assert_eq!(parse_provider_token("EXA"), Some(SearchProvider::Exa));
        assert_eq!(parse_provider_token("bing"), None);
    }

    #[test]
    fn missing_api_key_leaves_slot_unconfigured() {
        let http = reqwest::Client::new();
        let slot = provider_slot(SearchProvider::Brave, &http, None);
        assert!(!slot.is_ready());
        assert_eq!(slot.name(), "brave");

        let blank = provider_slot(SearchProvider::Exa, &http, Some("  ".to_string()));
        assert!(!blank.is_ready());

        let ready = provider_slot(SearchProvider::Tavily, &http, Some("tvly-key".to_string()));
        assert!(ready.is_ready());
        assert_eq!(ready.name(), "tavily");
    }

    #[test]
    fn tavily_rows_without_url_are_skipped() {
        let payload = json!({
            "results": [
                {"title": "Rust async book", "url": "https://rust-lang.github.io/async-book/", "content": "Async  programming\nin Rust"},
                {"title": "No link", "url": "  ", "content": "dropped"}
            ]
        });
        let hits = parse_tavily_results(&payload).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].snippet, "Async programming in Rust");
    }

    #[test]
    fn brave_descriptions_lose_highlight_markup() {
        let payload = json!({
            "web": {"results": [
                {"title": "Tokio", "url": "https://tokio.rs", "description": "An <strong>async</strong> runtime"}
            ]}
        });
        let hits = parse_brave_results(&payload).unwrap();
        assert_eq!(hits[0].snippet, "An async runtime");

        assert!(parse_brave_results(&json!({})).unwrap().is_empty());
        assert!(parse_brave_results(&json!({"web": {}})).is_err());
    }

    #[test]
    fn exa_falls_back_to_highlights() {
        let payload = json!({
            "results": [
                {"url": "https://example.com/a", "highlights": ["first highlight"]}
            ]
        });
        let hits = parse_exa_results(&payload).unwrap();
        assert_eq!(hits[0].title, "Untitled");
        assert_eq!(hits[0].snippet, "first highlight");

        assert!(matches!(
            parse_exa_results(&json!({"data": []})),
            Err(BackendError::Parse { .. })
        ));
    }
}
