//! Configuration for pipeline runs

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One tracked market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Stable key used in file names and the index ("crude_oil")
    pub key: String,
    /// Quote symbol ("CL=F")
    pub symbol: String,
    /// English display name
    pub name: String,
    /// Thai display name
    pub name_th: String,
    /// Price unit ("USD/barrel")
    pub unit: String,
    /// Web search queries used to gather forecast evidence
    pub search_queries: Vec<String>,
}

/// The default market set: crude oil, sugar, USD/THB.
pub fn default_markets() -> Vec<MarketConfig> {
    vec![
        MarketConfig {
            key: "crude_oil".to_string(),
            symbol: "CL=F".to_string(),
            name: "Crude Oil".to_string(),
            name_th: "น้ำมันดิบ".to_string(),
            unit: "USD/barrel".to_string(),
            search_queries: vec![
                "crude oil price forecast next quarters".to_string(),
                "WTI crude oil forecast".to_string(),
                "EIA crude oil price outlook".to_string(),
            ],
        },
        MarketConfig {
            key: "sugar".to_string(),
            symbol: "SB=F".to_string(),
            name: "Sugar".to_string(),
            name_th: "น้ำตาล".to_string(),
            unit: "USD/lb".to_string(),
            search_queries: vec![
                "sugar price forecast".to_string(),
                "sugar market outlook next quarters".to_string(),
            ],
        },
        MarketConfig {
            key: "usd_thb".to_string(),
            symbol: "THB=X".to_string(),
            name: "USD/THB".to_string(),
            name_th: "อัตราแลกเปลี่ยน ดอลลาร์/บาท".to_string(),
            unit: "THB".to_string(),
            search_queries: vec![
                "USD THB forecast".to_string(),
                "Thai Baht exchange rate outlook".to_string(),
            ],
        },
    ]
}

/// Configuration for a pipeline batch
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Markets to process
    pub markets: Vec<MarketConfig>,

    /// Model identifier passed to the LLM provider
    pub model: String,

    /// Token budget per completion
    pub max_tokens: usize,

    /// Sampling temperature, `None` for provider default
    pub temperature: Option<f32>,

    /// Price history window in days
    pub history_window_days: u32,

    /// Maximum raw articles sent to the scorer
    pub news_batch_limit: usize,

    /// Organic hits kept per search query
    pub search_top_n: usize,

    /// Attempts for the collect stage
    pub max_retries: u32,

    /// Initial backoff duration for collect retries
    pub retry_backoff_base: Duration,

    /// Request timeout for external calls
    pub request_timeout: Duration,

    /// Upper bound on a rendered report body
    pub max_report_bytes: usize,

    /// Markets processed concurrently
    pub concurrency_limit: usize,

    /// Directory for the search cache
    pub cache_dir: PathBuf,

    /// Directory for persisted artifacts
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            markets: default_markets(),
            model: "gpt-4.1-mini".to_string(),
            max_tokens: 4096,
            temperature: None,
            history_window_days: 30,
            news_batch_limit: 10,
            search_top_n: 3,
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(120),
            max_report_bytes: 512 * 1024,
            concurrency_limit: 2,
            cache_dir: PathBuf::from("cache"),
            output_dir: PathBuf::from("data"),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.markets.is_empty() {
            return Err(PipelineError::Config(
                "at least one market must be configured".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(PipelineError::Config(
                "max_retries must be greater than 0".to_string(),
            ));
        }
        if self.concurrency_limit == 0 {
            return Err(PipelineError::Config(
                "concurrency_limit must be greater than 0".to_string(),
            ));
        }
        if self.max_report_bytes == 0 {
            return Err(PipelineError::Config(
                "max_report_bytes must be greater than 0".to_string(),
            ));
        }
        for market in &self.markets {
            if market.search_queries.is_empty() {
                return Err(PipelineError::Config(format!(
                    "market {} has no search queries",
                    market.key
                )));
            }
        }
        Ok(())
    }

    /// Get retry backoff duration for attempt number
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff_base * 2_u32.pow(attempt)
    }
}

/// Builder for PipelineConfig
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    markets: Option<Vec<MarketConfig>>,
    model: Option<String>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    history_window_days: Option<u32>,
    news_batch_limit: Option<usize>,
    search_top_n: Option<usize>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    request_timeout: Option<Duration>,
    max_report_bytes: Option<usize>,
    concurrency_limit: Option<usize>,
    cache_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    /// Set the market list
    pub fn markets(mut self, markets: Vec<MarketConfig>) -> Self {
        self.markets = Some(markets);
        self
    }

    /// Set the model identifier
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the completion token budget
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the history window in days
    pub fn history_window_days(mut self, days: u32) -> Self {
        self.history_window_days = Some(days);
        self
    }

    /// Set the raw-article limit per scoring batch
    pub fn news_batch_limit(mut self, limit: usize) -> Self {
        self.news_batch_limit = Some(limit);
        self
    }

    /// Set hits kept per search query
    pub fn search_top_n(mut self, top_n: usize) -> Self {
        self.search_top_n = Some(top_n);
        self
    }

    /// Set collect-stage retry attempts
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the initial retry backoff
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set the external request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the report body size cap
    pub fn max_report_bytes(mut self, bytes: usize) -> Self {
        self.max_report_bytes = Some(bytes);
        self
    }

    /// Set the market concurrency limit
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    /// Set the search cache directory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the artifact output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PipelineConfig> {
        let defaults = PipelineConfig::default();

        let config = PipelineConfig {
            markets: self.markets.unwrap_or(defaults.markets),
            model: self.model.unwrap_or(defaults.model),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.or(defaults.temperature),
            history_window_days: self
                .history_window_days
                .unwrap_or(defaults.history_window_days),
            news_batch_limit: self.news_batch_limit.unwrap_or(defaults.news_batch_limit),
            search_top_n: self.search_top_n.unwrap_or(defaults.search_top_n),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_report_bytes: self.max_report_bytes.unwrap_or(defaults.max_report_bytes),
            concurrency_limit: self.concurrency_limit.unwrap_or(defaults.concurrency_limit),
            cache_dir: self.cache_dir.unwrap_or(defaults.cache_dir),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
        };

        config.validate()?;
        Ok(config)
    }
}
