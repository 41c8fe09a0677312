//! News impact scoring stage
//!
//! One structured model call scores a batch of raw articles per region.
//! The stage never fails a run: transport or schema trouble after the
//! single retry degrades the run to an empty news list.

use crate::config::{MarketConfig, PipelineConfig};
use crate::prompts::{self, DateContext};
use crate::stage::{structured_with_retry, StageOutput};
use pulse_llm::{CompletionRequest, LanguageModel};
use pulse_models::{NewsItem, Region, RegionImpact};
use pulse_sources::RawArticle;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model-facing output shape for the scoring call.
#[derive(Debug, Deserialize)]
struct ScoredBatchWire {
    news: Vec<ScoredItemWire>,
}

#[derive(Debug, Deserialize)]
struct ScoredItemWire {
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(rename = "publishedDate", default)]
    published_date: String,
    #[serde(rename = "imageUrl", default)]
    image_url: String,
    #[serde(default)]
    link: String,
    scores: Vec<ScoreWire>,
}

#[derive(Debug, Deserialize)]
struct ScoreWire {
    region: String,
    score: i64,
    reason: String,
}

/// Scores raw articles into [`NewsItem`]s.
pub struct NewsImpactScorer {
    model: Arc<dyn LanguageModel>,
    config: Arc<PipelineConfig>,
}

impl NewsImpactScorer {
    pub fn new(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self { model, config }
    }

    /// Score up to `news_batch_limit` articles for one market.
    ///
    /// Zero raw articles short-circuits without a model call. Items that
    /// come back without exactly one in-range score per region are
    /// dropped individually.
    pub async fn score(
        &self,
        market: &MarketConfig,
        ctx: &DateContext,
        articles: &[RawArticle],
    ) -> StageOutput<Vec<NewsItem>> {
        if articles.is_empty() {
            debug!(market = %market.key, "no raw news, skipping scoring call");
            return StageOutput::ok(Vec::new());
        }

        let batch = &articles[..articles.len().min(self.config.news_batch_limit)];

        let mut request = CompletionRequest::builder(&self.config.model)
            .system(prompts::scoring_system(market))
            .prompt(prompts::scoring_prompt(market, ctx, batch))
            .max_tokens(self.config.max_tokens)
            .json_mode(true);
        if let Some(t) = self.config.temperature {
            request = request.temperature(t);
        }

        let wire: ScoredBatchWire =
            match structured_with_retry("scoring", self.model.as_ref(), request.build()).await {
                Ok(wire) => wire,
                Err(e) => {
                    warn!(market = %market.key, error = %e, "scoring failed, degrading to empty news");
                    return StageOutput::fallback(Vec::new());
                }
            };

        let total = wire.news.len();
        let news = accept_items(wire, ctx);
        info!(
            market = %market.key,
            scored = news.len(),
            dropped = total - news.len(),
            "news scoring complete"
        );
        StageOutput::ok(news)
    }
}

/// Validate model output item by item; survivors get stable re-derived IDs.
fn accept_items(wire: ScoredBatchWire, ctx: &DateContext) -> Vec<NewsItem> {
    let mut accepted = Vec::new();
    for item in wire.news {
        let Some(scores) = convert_scores(&item.scores) else {
            debug!(title = %item.title, "dropping news item with invalid scores");
            continue;
        };

        let ordinal = accepted.len() + 1;
        let date_part = item
            .published_date
            .get(..10)
            .map_or_else(|| ctx.today.to_string(), str::to_string);

        let candidate = NewsItem {
            news_id: format!("{date_part}-{ordinal}"),
            title: item.title,
            summary: item.summary,
            published_date: item.published_date,
            image_url: item.image_url,
            link: item.link,
            scores,
        };
        if candidate.is_complete() {
            accepted.push(candidate);
        } else {
            debug!(news_id = %candidate.news_id, "dropping news item missing a region");
        }
    }
    accepted
}

/// Convert wire scores, requiring every entry to be a known region with a
/// score in [0, 100]. Returns `None` when any entry is out of contract.
fn convert_scores(wire: &[ScoreWire]) -> Option<Vec<RegionImpact>> {
    wire.iter()
        .map(|s| {
            let region = parse_region(&s.region)?;
            let score = u8::try_from(s.score).ok().filter(|v| *v <= 100)?;
            Some(RegionImpact {
                region,
                score,
                reason: s.reason.clone(),
            })
        })
        .collect()
}

fn parse_region(raw: &str) -> Option<Region> {
    match raw.to_ascii_lowercase().as_str() {
        "global" => Some(Region::Global),
        "asia" => Some(Region::Asia),
        // Older prompt wording used the country name for the local region
        "local" | "thailand" => Some(Region::Local),
        _ => None,
    }
}
