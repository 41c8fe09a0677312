//! Pipeline orchestration
//!
//! Drives each market through collect, score, forecast, synthesize,
//! render, persist. Markets are independent: one market's failure never
//! stops the batch, and non-fatal stage trouble degrades the market's
//! artifact instead of failing it. Only an exhausted collect retry (or a
//! fatal config error, caught at construction) is terminal.

use crate::artifact::ArtifactStore;
use crate::config::{MarketConfig, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::forecast::ForecastExtractor;
use crate::personas::{assemble_popup, regional_summaries, PersonaInsightSynthesizer};
use crate::prompts::DateContext;
use crate::report::ReportRenderer;
use crate::scorer::NewsImpactScorer;
use futures::stream::{self, StreamExt};
use pulse_llm::LanguageModel;
use pulse_models::{CombinedArtifact, ForecastList, NewsBatch};
use pulse_sources::{MarketDataCollector, MarketDataProvider, MarketObservation, WebSearchProvider};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Pipeline stages, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collecting,
    Scoring,
    Forecasting,
    Synthesizing,
    Rendering,
    Persisting,
}

/// Outcome of one stage for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Ok,
    /// The stage's fallback output was used
    Degraded,
    Failed,
}

/// One recorded stage transition, decoupled from the logging sink.
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub market: String,
    pub stage: Stage,
    pub status: StageStatus,
    /// Error kind for degraded/failed stages
    pub error_kind: Option<String>,
}

/// Final status of one market's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStatus {
    Ok,
    Degraded,
    Failed,
}

/// Everything recorded about one market's run.
#[derive(Debug, Clone)]
pub struct MarketRunReport {
    pub market: String,
    pub status: MarketStatus,
    /// Error kind of the terminal failure, when failed
    pub error_kind: Option<String>,
    pub events: Vec<StageEvent>,
}

/// Per-batch result summary.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub reports: Vec<MarketRunReport>,
}

impl BatchSummary {
    pub fn failed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == MarketStatus::Failed)
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}

/// Event recorder for one market's run.
struct RunLog {
    market: String,
    events: Vec<StageEvent>,
}

impl RunLog {
    fn new(market: &str) -> Self {
        Self {
            market: market.to_string(),
            events: Vec::new(),
        }
    }

    fn record(&mut self, stage: Stage, status: StageStatus, error_kind: Option<String>) {
        self.events.push(StageEvent {
            market: self.market.clone(),
            stage,
            status,
            error_kind,
        });
    }

    fn stage(&mut self, stage: Stage, fallback_used: bool) {
        let status = if fallback_used {
            StageStatus::Degraded
        } else {
            StageStatus::Ok
        };
        self.record(stage, status, None);
    }

    fn finish(self, status: MarketStatus, error_kind: Option<String>) -> MarketRunReport {
        MarketRunReport {
            market: self.market,
            status,
            error_kind,
            events: self.events,
        }
    }

    fn any_degraded(&self) -> bool {
        self.events
            .iter()
            .any(|e| e.status == StageStatus::Degraded)
    }
}

/// Drives markets through the full pipeline.
pub struct PipelineOrchestrator<P> {
    config: Arc<PipelineConfig>,
    collector: MarketDataCollector<P>,
    scorer: NewsImpactScorer,
    forecaster: ForecastExtractor,
    synthesizer: PersonaInsightSynthesizer,
    renderer: ReportRenderer,
    store: ArtifactStore,
}

impl<P: MarketDataProvider> PipelineOrchestrator<P> {
    /// Build an orchestrator. Config problems surface here, before any
    /// market runs.
    pub fn new(
        config: PipelineConfig,
        model: Arc<dyn LanguageModel>,
        market_data: P,
        search: Arc<dyn WebSearchProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let store = ArtifactStore::new(&config.output_dir)?;

        Ok(Self {
            collector: MarketDataCollector::new(market_data),
            scorer: NewsImpactScorer::new(Arc::clone(&model), Arc::clone(&config)),
            forecaster: ForecastExtractor::new(
                Arc::clone(&model),
                Arc::clone(&search),
                Arc::clone(&config),
            ),
            synthesizer: PersonaInsightSynthesizer::new(
                Arc::clone(&model),
                search,
                Arc::clone(&config),
            ),
            renderer: ReportRenderer::new(model, Arc::clone(&config)),
            store,
            config,
        })
    }

    /// Process every configured market and persist the batch index.
    pub async fn run_batch(&self) -> Result<BatchSummary> {
        let ctx = DateContext::now();
        info!(markets = self.config.markets.len(), "starting batch run");

        let results: Vec<(MarketRunReport, Option<CombinedArtifact>)> =
            stream::iter(self.config.markets.iter())
                .map(|market| self.run_market(market, &ctx))
                .buffer_unordered(self.config.concurrency_limit)
                .collect()
                .await;

        let mut reports = Vec::with_capacity(results.len());
        let mut artifacts = Vec::new();
        for (report, artifact) in results {
            reports.push(report);
            artifacts.extend(artifact);
        }
        // Restore config order after concurrent completion
        reports.sort_by_key(|r| {
            self.config
                .markets
                .iter()
                .position(|m| m.key == r.market)
                .unwrap_or(usize::MAX)
        });

        self.store.save_index(&artifacts)?;

        let summary = BatchSummary { reports };
        info!(
            total = summary.reports.len(),
            failed = summary.failed_count(),
            "batch run finished"
        );
        Ok(summary)
    }

    /// Run one market end to end.
    async fn run_market(
        &self,
        market: &MarketConfig,
        ctx: &DateContext,
    ) -> (MarketRunReport, Option<CombinedArtifact>) {
        let mut log = RunLog::new(&market.key);
        info!(market = %market.key, symbol = %market.symbol, "market run started");

        let observation = match self.collect_with_retry(market).await {
            Ok(obs) => {
                log.stage(Stage::Collecting, false);
                obs
            }
            Err(e) => {
                error!(market = %market.key, error = %e, "collect failed, market run aborted");
                let kind = e.kind().to_string();
                log.record(Stage::Collecting, StageStatus::Failed, Some(kind.clone()));
                return (log.finish(MarketStatus::Failed, Some(kind)), None);
            }
        };

        // Scoring and forecasting both depend only on the collected data
        let (scored, forecasted) = tokio::join!(
            self.scorer.score(market, ctx, &observation.raw_news),
            self.forecaster.extract(market, ctx),
        );
        log.stage(Stage::Scoring, scored.fallback_used);
        log.stage(Stage::Forecasting, forecasted.fallback_used);

        let news = scored.value;
        let forecasts = forecasted.value;
        let snapshot = &observation.snapshot;

        let synthesized = self
            .synthesizer
            .synthesize(market, ctx, snapshot, &news, &forecasts)
            .await;
        log.stage(Stage::Synthesizing, synthesized.fallback_used);

        let regional = regional_summaries(&news, snapshot);
        let rendered = self
            .renderer
            .render(
                market,
                ctx,
                snapshot,
                &news,
                &forecasts,
                &synthesized.value,
                &regional,
            )
            .await;
        log.stage(Stage::Rendering, rendered.fallback_used);

        let popup = assemble_popup(
            market,
            snapshot,
            &news,
            &forecasts,
            regional,
            synthesized.value,
        );
        let artifact = CombinedArtifact {
            market: market.key.clone(),
            market_name: market.name.clone(),
            market_name_th: market.name_th.clone(),
            symbol: market.symbol.clone(),
            unit: market.unit.clone(),
            generated_at: chrono::Utc::now(),
            news: NewsBatch { news },
            forecasts: ForecastList { forecasts },
            popup,
            report: rendered.value,
        };

        if let Err(e) = self.store.save_market(&artifact) {
            error!(market = %market.key, error = %e, "artifact persistence failed");
            let kind = e.kind().to_string();
            log.record(Stage::Persisting, StageStatus::Failed, Some(kind.clone()));
            return (log.finish(MarketStatus::Failed, Some(kind)), None);
        }
        log.stage(Stage::Persisting, false);

        let status = if log.any_degraded() {
            MarketStatus::Degraded
        } else {
            MarketStatus::Ok
        };
        info!(market = %market.key, ?status, "market run complete");
        (log.finish(status, None), Some(artifact))
    }

    /// Bounded collect retry with exponential backoff.
    async fn collect_with_retry(&self, market: &MarketConfig) -> Result<MarketObservation> {
        let mut last_err = None;
        for attempt in 0..self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_backoff(attempt - 1)).await;
            }
            match self
                .collector
                .collect(&market.symbol, &market.unit, self.config.history_window_days)
                .await
            {
                Ok(obs) => return Ok(obs),
                Err(e) => {
                    warn!(
                        market = %market.key,
                        attempt = attempt + 1,
                        error = %e,
                        "collect attempt failed"
                    );
                    last_err = Some(PipelineError::from_source("collect", e));
                }
            }
        }
        // max_retries >= 1 is enforced by config validation
        Err(last_err.unwrap_or_else(|| PipelineError::Config("no collect attempts ran".to_string())))
    }
}
