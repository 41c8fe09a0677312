//! Persona recommendation synthesis and popup assembly
//!
//! One structured model call per persona, each backed by a small cached
//! research search. The deterministic parts of the popup (key metrics,
//! regional aggregates, top news) are computed here from the run's own
//! data, never asked of the model.

use crate::config::{MarketConfig, PipelineConfig};
use crate::prompts::{self, DateContext};
use crate::stage::{structured_with_retry, StageOutput};
use pulse_llm::{CompletionRequest, LanguageModel};
use pulse_models::{
    ForecastPoint, ImpactLevel, KeyMetric, MarketSnapshot, NewsItem, OpportunityLevel, Persona,
    PersonaRecommendation, PopupBundle, Region, RegionalImpactSummary, RiskLevel, TopNews, Trend,
};
use pulse_sources::{SearchHit, WebSearchProvider};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// News items quoted in each persona prompt.
const TOP_NEWS_FOR_PROMPT: usize = 5;

/// Model-facing output shape for one persona call.
#[derive(Debug, Deserialize)]
struct PersonaWire {
    market_situation: String,
    power_insight: String,
    action_recommendation: String,
    risk_assessment: RiskLevel,
    opportunity_level: OpportunityLevel,
}

/// Produces one recommendation per persona plus the popup bundle.
pub struct PersonaInsightSynthesizer {
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn WebSearchProvider>,
    config: Arc<PipelineConfig>,
}

impl PersonaInsightSynthesizer {
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

    /// One recommendation per persona, in `Persona::ALL` order.
    ///
    /// A persona whose call fails or comes back incomplete (after the
    /// single retry) gets the fixed fallback; the stage is marked
    /// degraded but the output is always exactly three entries.
    pub async fn synthesize(
        &self,
        market: &MarketConfig,
        ctx: &DateContext,
        snapshot: &MarketSnapshot,
        news: &[NewsItem],
        forecasts: &[ForecastPoint],
    ) -> StageOutput<Vec<PersonaRecommendation>> {
        let top_news = top_by_impact(news, TOP_NEWS_FOR_PROMPT);
        let mut recommendations = Vec::with_capacity(Persona::ALL.len());
        let mut any_fallback = false;

        for persona in Persona::ALL {
            let research = self.research(market, persona).await;
            let rec = self
                .recommend(market, ctx, persona, snapshot, forecasts, &top_news, &research)
                .await;
            if rec.is_none() {
                any_fallback = true;
            }
            recommendations.push(rec.unwrap_or_else(|| PersonaRecommendation::fallback(persona)));
        }

        info!(
            market = %market.key,
            degraded = any_fallback,
            "persona synthesis complete"
        );
        if any_fallback {
            StageOutput::fallback(recommendations)
        } else {
            StageOutput::ok(recommendations)
        }
    }

    async fn recommend(
        &self,
        market: &MarketConfig,
        ctx: &DateContext,
        persona: Persona,
        snapshot: &MarketSnapshot,
        forecasts: &[ForecastPoint],
        top_news: &[NewsItem],
        research: &[SearchHit],
    ) -> Option<PersonaRecommendation> {
        let mut request = CompletionRequest::builder(&self.config.model)
            .system(prompts::persona_system(market))
            .prompt(prompts::persona_prompt(
                market, ctx, persona, snapshot, forecasts, top_news, research,
            ))
            .max_tokens(self.config.max_tokens)
            .json_mode(true);
        if let Some(t) = self.config.temperature {
            request = request.temperature(t);
        }

        let wire = match structured_with_retry::<PersonaWire>(
            "synthesizing",
            self.model.as_ref(),
            request.build(),
        )
        .await
        {
            Ok(wire) => wire,
            Err(e) => {
                warn!(market = %market.key, ?persona, error = %e, "persona call failed, using fallback");
                return None;
            }
        };

        let rec = PersonaRecommendation {
            persona,
            persona_name_th: persona.name_th().to_string(),
            market_situation: wire.market_situation,
            power_insight: wire.power_insight,
            action_recommendation: wire.action_recommendation,
            risk_assessment: wire.risk_assessment,
            opportunity_level: wire.opportunity_level,
        };
        if rec.is_complete() {
            Some(rec)
        } else {
            warn!(market = %market.key, ?persona, "incomplete persona response, using fallback");
            None
        }
    }

    /// Persona-specific research query through the cached search provider.
    /// A failure only loses the snippets.
    async fn research(&self, market: &MarketConfig, persona: Persona) -> Vec<SearchHit> {
        let angle = match persona {
            Persona::Sme => "small business cost impact",
            Persona::SupplyChain => "procurement hedging strategy",
            Persona::Investor => "investment outlook",
        };
        let query = format!("{} {angle} Thailand", market.name);

        match self.search.search(&query, self.config.search_top_n).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(market = %market.key, ?persona, error = %e, "persona research failed");
                Vec::new()
            }
        }
    }
}

/// Assemble the popup bundle from the run's finished pieces. The caller
/// supplies the regional summaries it already computed for the report.
pub fn assemble_popup(
    market: &MarketConfig,
    snapshot: &MarketSnapshot,
    news: &[NewsItem],
    forecasts: &[ForecastPoint],
    regional: Vec<RegionalImpactSummary>,
    recommendations: Vec<PersonaRecommendation>,
) -> PopupBundle {
    PopupBundle {
        key_metrics: key_metrics(snapshot),
        quick_summary: quick_summary(market, snapshot),
        regional_impacts: regional,
        recommendations,
        top_news: top_news(news),
        price_forecasts: forecasts.to_vec(),
    }
}

/// Headline metrics straight off the snapshot.
fn key_metrics(snapshot: &MarketSnapshot) -> Vec<KeyMetric> {
    let direction = snapshot.direction();
    vec![
        KeyMetric {
            label: "ราคาปัจจุบัน".to_string(),
            value: format!("{:.2} {}", snapshot.current_price, snapshot.unit),
            trend: direction,
        },
        KeyMetric {
            label: "เปลี่ยนแปลง".to_string(),
            value: format!("{:+.2}%", snapshot.price_change_pct),
            trend: direction,
        },
        KeyMetric {
            label: "ช่วง 30 วัน".to_string(),
            value: format!("{:.2} - {:.2}", snapshot.low_30d, snapshot.high_30d),
            trend: trend_of(snapshot.change_30d_pct),
        },
    ]
}

fn quick_summary(market: &MarketConfig, snapshot: &MarketSnapshot) -> String {
    format!(
        "ราคา{}อยู่ที่ {:.2} {} ({:+.2}% จากวันก่อนหน้า, {:+.2}% ในรอบ 30 วัน)",
        market.name_th,
        snapshot.current_price,
        snapshot.unit,
        snapshot.price_change_pct,
        snapshot.change_30d_pct,
    )
}

/// Aggregate per-region news impact: mean score, level from the fixed
/// thresholds, trend from the 1-period price direction, key factors from
/// the region's highest-scoring rationales.
pub fn regional_summaries(news: &[NewsItem], snapshot: &MarketSnapshot) -> Vec<RegionalImpactSummary> {
    let trend = snapshot.direction();

    Region::ALL
        .iter()
        .map(|&region| {
            let mut scored: Vec<(u8, &str)> = news
                .iter()
                .filter_map(|item| {
                    item.scores
                        .iter()
                        .find(|s| s.region == region)
                        .map(|s| (s.score, s.reason.as_str()))
                })
                .collect();
            scored.sort_by(|a, b| b.0.cmp(&a.0));

            let impact_score = if scored.is_empty() {
                0
            } else {
                let sum: u32 = scored.iter().map(|(s, _)| u32::from(*s)).sum();
                (sum / scored.len() as u32) as u8
            };

            let key_factors: Vec<String> = scored
                .iter()
                .take(3)
                .map(|(_, reason)| (*reason).to_string())
                .collect();

            RegionalImpactSummary {
                region,
                region_name_th: region.name_th().to_string(),
                impact_score,
                impact_level: ImpactLevel::from_score(impact_score),
                trend,
                summary: format!(
                    "คะแนนผลกระทบเฉลี่ย {impact_score} จากข่าว {} รายการ",
                    scored.len()
                ),
                key_factors,
            }
        })
        .collect()
}

/// The single highest-impact news item, if the run scored any.
fn top_news(news: &[NewsItem]) -> Option<TopNews> {
    news.iter()
        .max_by_key(|item| item.max_score())
        .map(|item| TopNews {
            title: item.title.clone(),
            summary: item.summary.clone(),
            impact_score: item.max_score(),
            published_date: item.published_date.clone(),
            image_url: item.image_url.clone(),
            link: item.link.clone(),
        })
}

fn top_by_impact(news: &[NewsItem], limit: usize) -> Vec<NewsItem> {
    let mut sorted = news.to_vec();
    sorted.sort_by(|a, b| b.max_score().cmp(&a.max_score()));
    sorted.truncate(limit);
    sorted
}

fn trend_of(pct: f64) -> Trend {
    if pct > 0.0 {
        Trend::Up
    } else if pct < 0.0 {
        Trend::Down
    } else {
        Trend::Neutral
    }
}
