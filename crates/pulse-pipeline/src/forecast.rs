//! Quarterly forecast extraction stage
//!
//! Gathers search evidence for the market's configured queries, then asks
//! the model for one forecast per upcoming quarter. Whatever comes back,
//! the stage output is exactly four points: excess is truncated, gaps are
//! filled with flagged estimates, and total failure yields four
//! placeholder points instead of aborting the run.

use crate::config::{MarketConfig, PipelineConfig};
use crate::prompts::{self, DateContext};
use crate::stage::{structured_with_retry, StageOutput};
use chrono::{Datelike, NaiveDate};
use pulse_llm::{CompletionRequest, LanguageModel};
use pulse_models::ForecastPoint;
use pulse_sources::{SearchHit, WebSearchProvider};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// A run always covers this many quarter horizons.
pub const FORECAST_QUARTERS: usize = 4;

const PLACEHOLDER_SOURCE: &str = "no data (placeholder)";

/// Model-facing output shape for the extraction call.
#[derive(Debug, Deserialize)]
struct ForecastListWire {
    forecasts: Vec<ForecastWire>,
}

/// Quarter labels and dates from the model are ignored; the extractor
/// forces points onto its own quarter grid.
#[derive(Debug, Deserialize)]
struct ForecastWire {
    price_forecast: String,
    #[serde(default)]
    source: String,
    #[serde(rename = "actionRecommendation", default)]
    action_recommendation: Option<String>,
}

/// The next `FORECAST_QUARTERS` quarters from `today`, inclusive of the
/// current one, as (label, mid-quarter target date) pairs.
pub fn upcoming_quarters(today: NaiveDate) -> Vec<(String, NaiveDate)> {
    let mut year = today.year();
    let mut quarter = today.month0() / 3 + 1;

    (0..FORECAST_QUARTERS)
        .map(|_| {
            let label = format!("Q{}/{:02}", quarter, year % 100);
            // Mid-quarter: the 15th of the quarter's middle month
            let month = (quarter - 1) * 3 + 2;
            let date = NaiveDate::from_ymd_opt(year, month, 15)
                .unwrap_or(today);
            quarter += 1;
            if quarter > 4 {
                quarter = 1;
                year += 1;
            }
            (label, date)
        })
        .collect()
}

/// Extracts quarterly forecasts from web search evidence.
pub struct ForecastExtractor {
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn WebSearchProvider>,
    config: Arc<PipelineConfig>,
}

impl ForecastExtractor {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn WebSearchProvider>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            model,
            search,
            config,
        }
    }

    /// Produce exactly four forecast points for one market.
    pub async fn extract(
        &self,
        market: &MarketConfig,
        ctx: &DateContext,
    ) -> StageOutput<Vec<ForecastPoint>> {
        let quarters = upcoming_quarters(ctx.today);
        let hits = self.gather_evidence(market).await;

        let mut request = CompletionRequest::builder(&self.config.model)
            .system(prompts::forecast_system())
            .prompt(prompts::forecast_prompt(market, ctx, &quarters, &hits))
            .max_tokens(self.config.max_tokens)
            .json_mode(true);
        if let Some(t) = self.config.temperature {
            request = request.temperature(t);
        }

        match structured_with_retry::<ForecastListWire>(
            "forecasting",
            self.model.as_ref(),
            request.build(),
        )
        .await
        {
            Ok(wire) => {
                let points = normalize(wire, &quarters);
                info!(market = %market.key, evidence = hits.len(), "forecast extraction complete");
                StageOutput::ok(points)
            }
            Err(e) => {
                warn!(market = %market.key, error = %e, "forecast extraction failed, using placeholders");
                StageOutput::fallback(placeholder_points(&quarters))
            }
        }
    }

    /// Run every configured query through the (cached) search provider.
    /// A failed query only loses its evidence.
    async fn gather_evidence(&self, market: &MarketConfig) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        for query in &market.search_queries {
            match self.search.search(query, self.config.search_top_n).await {
                Ok(batch) => hits.extend(batch),
                Err(e) => {
                    warn!(market = %market.key, query, error = %e, "search query failed, skipping");
                }
            }
        }
        hits
    }
}

/// Force the model output onto the quarter grid: one point per quarter,
/// in order, with gaps filled by flagged estimates.
fn normalize(wire: ForecastListWire, quarters: &[(String, NaiveDate)]) -> Vec<ForecastPoint> {
    let mut provided = wire.forecasts.into_iter();

    quarters
        .iter()
        .map(|(label, date)| match provided.next() {
            Some(p) if !p.price_forecast.trim().is_empty() => ForecastPoint {
                quarter: label.clone(),
                date: date.to_string(),
                price_forecast: p.price_forecast,
                source: if p.source.trim().is_empty() {
                    "unattributed".to_string()
                } else {
                    p.source
                },
                action_recommendation: p
                    .action_recommendation
                    .filter(|a| !a.trim().is_empty()),
                estimated: false,
            },
            _ => estimate_point(label, *date),
        })
        .collect()
}

fn estimate_point(label: &str, date: NaiveDate) -> ForecastPoint {
    ForecastPoint {
        quarter: label.to_string(),
        date: date.to_string(),
        price_forecast: "n/a".to_string(),
        source: PLACEHOLDER_SOURCE.to_string(),
        action_recommendation: None,
        estimated: true,
    }
}

/// Four placeholder points for a failed extraction.
fn placeholder_points(quarters: &[(String, NaiveDate)]) -> Vec<ForecastPoint> {
    quarters
        .iter()
        .map(|(label, date)| estimate_point(label, *date))
        .collect()
}
