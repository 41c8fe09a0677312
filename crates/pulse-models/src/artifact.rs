//! The combined artifact: the unit of persistence and external consumption

use crate::forecast::ForecastPoint;
use crate::news::NewsItem;
use crate::popup::PopupBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// News section of the artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsBatch {
    pub news: Vec<NewsItem>,
}

/// Forecast section of the artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastList {
    pub forecasts: Vec<ForecastPoint>,
}

/// Rendered report envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub html: String,
}

impl ReportDocument {
    /// Minimal placeholder used when report generation fails or the
    /// generated body exceeds the configured size limit.
    pub fn placeholder(market_name_th: &str) -> Self {
        Self {
            html: format!(
                "<div class='p-8'><h1 class='text-2xl font-bold mb-4'>รายงานตลาด{market_name_th}</h1>\
                 <p>ไม่สามารถสร้างรายงานฉบับเต็มได้ในรอบนี้ กรุณาตรวจสอบอีกครั้งภายหลัง</p></div>"
            ),
        }
    }
}

/// Full pipeline output for one market.
///
/// Top-level field names are stable and consumed by presentation layers:
/// `market, marketName, marketNameTh, symbol, unit, generatedAt, news,
/// forecasts, popup, report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedArtifact {
    pub market: String,
    #[serde(rename = "marketName")]
    pub market_name: String,
    #[serde(rename = "marketNameTh")]
    pub market_name_th: String,
    pub symbol: String,
    pub unit: String,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    pub news: NewsBatch,
    pub forecasts: ForecastList,
    pub popup: PopupBundle,
    pub report: ReportDocument,
}

/// Index file listing all artifacts produced in one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchIndex {
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    pub markets: Vec<String>,
    /// market key -> artifact, ordered for stable output
    pub data: BTreeMap<String, CombinedArtifact>,
}
