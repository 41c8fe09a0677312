//! End-to-end pipeline runs against fake providers

use async_trait::async_trait;
use chrono::Utc;
use pulse_llm::{CompletionRequest, LLMError, LanguageModel};
use pulse_models::CombinedArtifact;
use pulse_pipeline::{
    MarketConfig, MarketStatus, PipelineConfig, PipelineOrchestrator, StageStatus,
};
use pulse_sources::{
    Candle, MarketDataProvider, RawArticle, SearchHit, SourceError, WebSearchProvider,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Answers every stage with a minimal valid payload, routing on the
/// system prompt the way a scripted test double can.
struct RoutedModel;

#[async_trait]
impl LanguageModel for RoutedModel {
    async fn complete(&self, request: CompletionRequest) -> pulse_llm::Result<String> {
        let system = request.system.unwrap_or_default();
        if system.contains("score impacts") {
            Ok(r#"{"news": [{
                "title": "OPEC cuts output",
                "summary": "โอเปกลดกำลังการผลิต",
                "publishedDate": "2025-10-05T08:00:00Z",
                "imageUrl": "",
                "link": "https://example.com/1",
                "scores": [
                    {"region": "global", "score": 90, "reason": "supply"},
                    {"region": "asia", "score": 70, "reason": "imports"},
                    {"region": "local", "score": 55, "reason": "fuel costs"}
                ]
            }]}"#
                .to_string())
        } else if system.contains("Extract price forecasts") {
            Ok(r#"{"forecasts": [
                {"quarter": "Q4/25", "date": "2025-11-15", "price_forecast": "$68-72",
                 "source": "EIA", "actionRecommendation": "ล็อคราคา 30%"},
                {"quarter": "Q1/26", "date": "2026-02-15", "price_forecast": "$70",
                 "source": "Reuters", "actionRecommendation": "รอจังหวะ"},
                {"quarter": "Q2/26", "date": "2026-05-15", "price_forecast": "$71",
                 "source": "Bloomberg", "actionRecommendation": "hedge 50%"},
                {"quarter": "Q3/26", "date": "2026-08-15", "price_forecast": "$69",
                 "source": "EIA", "actionRecommendation": "ทยอยซื้อ"}
            ]}"#
                .to_string())
        } else if system.contains("one concrete recommendation") {
            Ok(r#"{
                "market_situation": "ตลาดทรงตัว",
                "power_insight": "ต้นทุนมีแนวโน้มเพิ่ม 2%",
                "action_recommendation": "ล็อคราคาภายในสัปดาห์นี้",
                "risk_assessment": "medium",
                "opportunity_level": "high"
            }"#
            .to_string())
        } else {
            Ok(r#"{"html": "<h1>รายงานตลาด</h1><p>รายละเอียด</p>"}"#.to_string())
        }
    }

    fn name(&self) -> &'static str {
        "routed"
    }
}

/// Fails every call, forcing every generative stage onto its fallback.
struct DownModel;

#[async_trait]
impl LanguageModel for DownModel {
    async fn complete(&self, _request: CompletionRequest) -> pulse_llm::Result<String> {
        Err(LLMError::RequestFailed("provider down".to_string()))
    }

    fn name(&self) -> &'static str {
        "down"
    }
}

fn fixed_window() -> Vec<Candle> {
    (0..30)
        .map(|i| Candle {
            timestamp: Utc::now(),
            open: 70.0 + f64::from(i) * 0.1,
            high: 71.0 + f64::from(i) * 0.1,
            low: 69.0 + f64::from(i) * 0.1,
            close: 70.5 + f64::from(i) * 0.1,
            volume: 1000,
        })
        .collect()
}

/// Serves a fixed window for every symbol except `BAD=F`.
struct FakeMarketData;

#[async_trait]
impl MarketDataProvider for FakeMarketData {
    async fn history(
        &self,
        symbol: &str,
        _window_days: u32,
    ) -> pulse_sources::Result<Vec<Candle>> {
        if symbol == "BAD=F" {
            return Err(SourceError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "empty history window".to_string(),
            });
        }
        Ok(fixed_window())
    }

    async fn news(&self, _symbol: &str) -> pulse_sources::Result<Vec<RawArticle>> {
        Ok(vec![RawArticle {
            title: Some("OPEC cuts output".to_string()),
            summary: Some("Production cut announced".to_string()),
            ..RawArticle::default()
        }])
    }
}

/// Valid price history, but the provider has no articles for the symbol.
struct QuietMarketData;

#[async_trait]
impl MarketDataProvider for QuietMarketData {
    async fn history(
        &self,
        _symbol: &str,
        _window_days: u32,
    ) -> pulse_sources::Result<Vec<Candle>> {
        Ok(fixed_window())
    }

    async fn news(&self, _symbol: &str) -> pulse_sources::Result<Vec<RawArticle>> {
        Ok(Vec::new())
    }
}

struct FakeSearch;

#[async_trait]
impl WebSearchProvider for FakeSearch {
    async fn search(
        &self,
        _query: &str,
        _top_n: usize,
    ) -> pulse_sources::Result<Vec<SearchHit>> {
        Ok(vec![SearchHit {
            title: "Oil price outlook".to_string(),
            link: "https://example.com/outlook".to_string(),
            snippet: Some("Forecasts point to firm prices".to_string()),
            date: None,
        }])
    }
}

fn market(key: &str, symbol: &str) -> MarketConfig {
    MarketConfig {
        key: key.to_string(),
        symbol: symbol.to_string(),
        name: "Crude Oil".to_string(),
        name_th: "น้ำมันดิบ".to_string(),
        unit: "USD/barrel".to_string(),
        search_queries: vec!["crude oil forecast".to_string()],
    }
}

fn config(output: &TempDir, markets: Vec<MarketConfig>) -> PipelineConfig {
    PipelineConfig::builder()
        .markets(markets)
        .output_dir(output.path())
        .retry_backoff_base(std::time::Duration::from_millis(1))
        .build()
        .unwrap()
}

fn load_artifact(dir: &TempDir, key: &str) -> CombinedArtifact {
    let raw = std::fs::read_to_string(dir.path().join(format!("{key}_data.json"))).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_full_batch_persists_artifacts_and_index() {
    let out = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(
        config(&out, vec![market("crude_oil", "CL=F"), market("sugar", "SB=F")]),
        Arc::new(RoutedModel),
        FakeMarketData,
        Arc::new(FakeSearch),
    )
    .unwrap();

    let summary = orchestrator.run_batch().await.unwrap();
    assert_eq!(summary.reports.len(), 2);
    assert!(!summary.has_failures());
    assert!(summary
        .reports
        .iter()
        .all(|r| r.status == MarketStatus::Ok));

    let artifact = load_artifact(&out, "crude_oil");
    assert_eq!(artifact.market, "crude_oil");
    assert_eq!(artifact.forecasts.forecasts.len(), 4);
    assert_eq!(artifact.popup.recommendations.len(), 3);
    assert_eq!(artifact.popup.regional_impacts.len(), 3);
    assert_eq!(artifact.news.news.len(), 1);
    assert!(artifact.popup.top_news.is_some());

    let index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("all_markets.json")).unwrap())
            .unwrap();
    assert_eq!(index["markets"].as_array().unwrap().len(), 2);
    assert!(index["data"]["sugar"].is_object());
}

#[tokio::test]
async fn test_unavailable_market_fails_alone() {
    let out = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(
        config(&out, vec![market("crude_oil", "CL=F"), market("broken", "BAD=F")]),
        Arc::new(RoutedModel),
        FakeMarketData,
        Arc::new(FakeSearch),
    )
    .unwrap();

    let summary = orchestrator.run_batch().await.unwrap();
    assert_eq!(summary.failed_count(), 1);

    let failed = summary
        .reports
        .iter()
        .find(|r| r.market == "broken")
        .unwrap();
    assert_eq!(failed.status, MarketStatus::Failed);
    assert_eq!(failed.error_kind.as_deref(), Some("data_unavailable"));
    assert!(!out.path().join("broken_data.json").exists());

    // The healthy market is unaffected
    assert!(out.path().join("crude_oil_data.json").exists());
    let index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("all_markets.json")).unwrap())
            .unwrap();
    assert_eq!(index["markets"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_no_news_day_still_produces_full_artifact() {
    let out = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(
        config(&out, vec![market("crude_oil", "CL=F")]),
        Arc::new(RoutedModel),
        QuietMarketData,
        Arc::new(FakeSearch),
    )
    .unwrap();

    let summary = orchestrator.run_batch().await.unwrap();
    // Nothing to score is not a degradation
    assert_eq!(summary.reports[0].status, MarketStatus::Ok);

    let artifact = load_artifact(&out, "crude_oil");
    assert!(artifact.news.news.is_empty());
    assert!(artifact.popup.top_news.is_none());
    assert_eq!(artifact.forecasts.forecasts.len(), 4);
    assert_eq!(artifact.popup.recommendations.len(), 3);
    assert_eq!(artifact.popup.regional_impacts.len(), 3);
    assert!(artifact
        .popup
        .regional_impacts
        .iter()
        .all(|s| s.impact_score == 0 && s.key_factors.is_empty()));
}

#[tokio::test]
async fn test_llm_outage_degrades_but_persists() {
    let out = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(
        config(&out, vec![market("crude_oil", "CL=F")]),
        Arc::new(DownModel),
        FakeMarketData,
        Arc::new(FakeSearch),
    )
    .unwrap();

    let summary = orchestrator.run_batch().await.unwrap();
    let report = &summary.reports[0];
    assert_eq!(report.status, MarketStatus::Degraded);
    assert!(report
        .events
        .iter()
        .any(|e| e.status == StageStatus::Degraded));

    let artifact = load_artifact(&out, "crude_oil");
    // Scoring degraded to empty, forecasts to flagged placeholders,
    // personas to fixed fallbacks, report to the placeholder body
    assert!(artifact.news.news.is_empty());
    assert_eq!(artifact.forecasts.forecasts.len(), 4);
    assert!(artifact.forecasts.forecasts.iter().all(|f| f.estimated));
    assert_eq!(artifact.popup.recommendations.len(), 3);
    assert!(artifact.report.html.contains("ไม่สามารถสร้างรายงาน"));
}

#[test]
fn test_bad_config_rejected_before_any_market() {
    let out = TempDir::new().unwrap();
    let bad = PipelineConfig {
        markets: vec![],
        output_dir: out.path().to_path_buf(),
        ..PipelineConfig::default()
    };

    let result = PipelineOrchestrator::new(
        bad,
        Arc::new(RoutedModel),
        FakeMarketData,
        Arc::new(FakeSearch),
    );
    assert!(result.is_err());
}
