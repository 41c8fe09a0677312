//! Web search clients for forecast evidence gathering

use crate::cache::{CacheKey, CacheStore};
use crate::error::{Result, SourceError};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 50;

/// One organic search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title
    pub title: String,
    /// Result URL
    pub link: String,
    /// Snippet text, when the provider returned one
    #[serde(default)]
    pub snippet: Option<String>,
    /// Publication date string, when the provider returned one
    #[serde(default)]
    pub date: Option<String>,
}

/// Seam to the web-search backend.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Run a query and return up to `top_n` organic hits.
    async fn search(&self, query: &str, top_n: usize) -> Result<Vec<SearchHit>>;
}

/// Serper.dev search client with rate limiting
pub struct SerperClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl SerperClient {
    /// Create a new Serper client with rate limiting
    ///
    /// # Arguments
    /// * `api_key` - Serper API key
    /// * `rate_limit` - Requests per minute
    /// * `timeout` - Per-request timeout; a timed-out call surfaces as a
    ///   transport failure like any other
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let quota = Quota::per_minute(
            NonZeroU32::new(rate_limit)
                .unwrap_or_else(|| NonZeroU32::new(DEFAULT_RATE_LIMIT_PER_MINUTE).unwrap()),
        );
        let rate_limiter = Arc::new(RateLimiter::direct(quota));
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            rate_limiter,
        })
    }

    /// Create a client from the `SERPER_API_KEY` environment variable
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("SERPER_API_KEY").map_err(|_| {
            SourceError::ApiError("SERPER_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key, DEFAULT_RATE_LIMIT_PER_MINUTE, timeout)
    }

    async fn raw_search(&self, query: &str, top_n: usize) -> Result<Value> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .post(SERPER_SEARCH_URL)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "q": query, "num": top_n }))
            .send()
            .await
            .map_err(|e| SourceError::ApiError(format!("Serper request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError(format!(
                "Serper API error {status}: {body}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::ApiError(format!("Failed to parse Serper response: {e}")))
    }
}

#[async_trait]
impl WebSearchProvider for SerperClient {
    async fn search(&self, query: &str, top_n: usize) -> Result<Vec<SearchHit>> {
        let payload = self.raw_search(query, top_n).await?;
        Ok(hits_from_payload(&payload, top_n))
    }
}

/// Extract organic hits from a Serper response body. Entries without a
/// title or link are skipped.
fn hits_from_payload(payload: &Value, top_n: usize) -> Vec<SearchHit> {
    payload["organic"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| {
                    Some(SearchHit {
                        title: r["title"].as_str()?.to_string(),
                        link: r["link"].as_str()?.to_string(),
                        snippet: r["snippet"].as_str().map(String::from),
                        date: r["date"].as_str().map(String::from),
                    })
                })
                .take(top_n)
                .collect()
        })
        .unwrap_or_default()
}

/// Cache-through wrapper around any [`WebSearchProvider`].
///
/// At most one upstream call per (query, calendar day, lookback window);
/// repeated same-day queries are served from the [`CacheStore`].
pub struct CachedSearch<W> {
    inner: W,
    store: CacheStore,
    lookback_days: u32,
}

impl<W: WebSearchProvider> CachedSearch<W> {
    pub fn new(inner: W, store: CacheStore, lookback_days: u32) -> Self {
        Self {
            inner,
            store,
            lookback_days,
        }
    }
}

#[async_trait]
impl<W: WebSearchProvider> WebSearchProvider for CachedSearch<W> {
    async fn search(&self, query: &str, top_n: usize) -> Result<Vec<SearchHit>> {
        let key = CacheKey::today(query, self.lookback_days);

        if let Some(payload) = self.store.get(&key) {
            debug!(query, "serving search results from cache");
            let hits: Vec<SearchHit> = serde_json::from_value(payload)?;
            return Ok(hits.into_iter().take(top_n).collect());
        }

        let hits = self.inner.search(query, top_n).await?;
        self.store.put(&key, serde_json::to_value(&hits)?)?;
        info!(query, count = hits.len(), "search results fetched and cached");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WebSearchProvider for CountingProvider {
        async fn search(&self, _query: &str, _top_n: usize) -> Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![SearchHit {
                title: "Crude oil Q1 outlook".to_string(),
                link: "https://example.com/outlook".to_string(),
                snippet: Some("Analysts expect firm prices".to_string()),
                date: None,
            }])
        }
    }

    #[test]
    fn test_serper_client_builds_with_request_timeout() {
        let client = SerperClient::new("test-key", 50, Duration::from_secs(5)).unwrap();
        assert_eq!(client.api_key, "test-key");

        // Zero rate limit falls back to the default quota
        assert!(SerperClient::new("test-key", 0, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_hits_from_payload_skips_partial_entries() {
        let payload = json!({
            "organic": [
                { "title": "A", "link": "https://a", "snippet": "sa" },
                { "title": "no link here" },
                { "title": "B", "link": "https://b", "date": "2 days ago" },
            ]
        });

        let hits = hits_from_payload(&payload, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "A");
        assert_eq!(hits[1].date.as_deref(), Some("2 days ago"));
    }

    #[test]
    fn test_hits_from_payload_honors_top_n() {
        let payload = json!({
            "organic": [
                { "title": "A", "link": "https://a" },
                { "title": "B", "link": "https://b" },
                { "title": "C", "link": "https://c" },
            ]
        });
        assert_eq!(hits_from_payload(&payload, 2).len(), 2);
    }

    #[test]
    fn test_hits_from_payload_missing_organic() {
        assert!(hits_from_payload(&json!({}), 3).is_empty());
    }

    #[tokio::test]
    async fn test_cached_search_hits_upstream_once_per_day() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        let cached = CachedSearch::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            store,
            7,
        );

        let first = cached.search("crude oil price forecast", 3).await.unwrap();
        let second = cached.search("crude oil price forecast", 3).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_search_distinct_queries_are_separate() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        let cached = CachedSearch::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            store,
            7,
        );

        cached.search("sugar outlook", 3).await.unwrap();
        cached.search("usd thb forecast", 3).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }
}
