//! Narrative report rendering stage

use crate::config::{MarketConfig, PipelineConfig};
use crate::prompts::{self, DateContext};
use crate::stage::{structured_with_retry, StageOutput};
use pulse_llm::{CompletionRequest, LanguageModel};
use pulse_models::{
    ForecastPoint, MarketSnapshot, NewsItem, PersonaRecommendation, RegionalImpactSummary,
    ReportDocument,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Renders the full HTML report for one market.
///
/// The output is a `{ "html": ... }` envelope, never raw text. A body
/// over `max_report_bytes`, or a second consecutive failure, yields the
/// minimal placeholder document instead of failing the run.
pub struct ReportRenderer {
    model: Arc<dyn LanguageModel>,
    config: Arc<PipelineConfig>,
}

impl ReportRenderer {
    pub fn new(model: Arc<dyn LanguageModel>, config: Arc<PipelineConfig>) -> Self {
        Self { model, config }
    }

    pub async fn render(
        &self,
        market: &MarketConfig,
        ctx: &DateContext,
        snapshot: &MarketSnapshot,
        news: &[NewsItem],
        forecasts: &[ForecastPoint],
        recommendations: &[PersonaRecommendation],
        regional: &[RegionalImpactSummary],
    ) -> StageOutput<ReportDocument> {
        let recommendations_json =
            serde_json::to_string(recommendations).unwrap_or_else(|_| "[]".to_string());
        let regional_json = serde_json::to_string(regional).unwrap_or_else(|_| "[]".to_string());

        let mut request = CompletionRequest::builder(&self.config.model)
            .system(prompts::report_system(market))
            .prompt(prompts::report_prompt(
                market,
                ctx,
                snapshot,
                forecasts,
                news,
                &recommendations_json,
                &regional_json,
            ))
            .max_tokens(self.config.max_tokens)
            .json_mode(true);
        if let Some(t) = self.config.temperature {
            request = request.temperature(t);
        }

        let document = match structured_with_retry::<ReportDocument>(
            "rendering",
            self.model.as_ref(),
            request.build(),
        )
        .await
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!(market = %market.key, error = %e, "report rendering failed, using placeholder");
                return StageOutput::fallback(ReportDocument::placeholder(&market.name_th));
            }
        };

        if document.html.trim().is_empty() {
            warn!(market = %market.key, "empty report body, using placeholder");
            return StageOutput::fallback(ReportDocument::placeholder(&market.name_th));
        }

        if document.html.len() > self.config.max_report_bytes {
            warn!(
                market = %market.key,
                bytes = document.html.len(),
                limit = self.config.max_report_bytes,
                "report body over size limit, using placeholder"
            );
            return StageOutput::fallback(ReportDocument::placeholder(&market.name_th));
        }

        info!(market = %market.key, bytes = document.html.len(), "report rendered");
        StageOutput::ok(document)
    }
}
