//! Market intelligence pipeline
//!
//! Turns market data and news into per-market intelligence artifacts in
//! five stages:
//!
//! 1. Collect price history and raw news (`pulse-sources`)
//! 2. Score news impact per region with an LLM
//! 3. Extract quarterly price forecasts from web search evidence
//! 4. Synthesize per-audience recommendations and the popup bundle
//! 5. Render the full narrative report
//!
//! The [`PipelineOrchestrator`] runs every configured market through the
//! stages concurrently (bounded), persists `{market}_data.json` files plus
//! the `all_markets.json` index, and reports per-market outcomes. Stage
//! failures degrade a market's artifact; only missing market data fails
//! a market, and only bad configuration fails the batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_llm::OpenAIProvider;
//! use pulse_pipeline::{PipelineConfig, PipelineOrchestrator};
//! use pulse_sources::{CacheStore, CachedSearch, SerperClient, YahooMarketData};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::default();
//!     let model = Arc::new(OpenAIProvider::from_env()?);
//!     let cache = CacheStore::new(&config.cache_dir)?;
//!     let search = Arc::new(CachedSearch::new(
//!         SerperClient::from_env(config.request_timeout)?,
//!         cache,
//!         7,
//!     ));
//!
//!     let orchestrator =
//!         PipelineOrchestrator::new(config, model, YahooMarketData::new(), search)?;
//!     let summary = orchestrator.run_batch().await?;
//!     println!("failed markets: {}", summary.failed_count());
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod forecast;
pub mod orchestrator;
pub mod personas;
pub mod prompts;
pub mod report;
pub mod scorer;
mod stage;

pub use artifact::ArtifactStore;
pub use config::{default_markets, MarketConfig, PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, Result};
pub use forecast::{upcoming_quarters, ForecastExtractor, FORECAST_QUARTERS};
pub use orchestrator::{
    BatchSummary, MarketRunReport, MarketStatus, PipelineOrchestrator, Stage, StageEvent,
    StageStatus,
};
pub use personas::PersonaInsightSynthesizer;
pub use prompts::DateContext;
pub use report::ReportRenderer;
pub use scorer::NewsImpactScorer;
pub use stage::StageOutput;
