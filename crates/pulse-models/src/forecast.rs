//! Quarterly price forecasts

use serde::{Deserialize, Serialize};

/// One quarterly forecast. A completed run always carries exactly four,
/// one per quarter horizon from the run date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Quarter label, e.g. "Q3/25"
    pub quarter: String,
    /// Mid-quarter target date, e.g. "2025-08-15"
    pub date: String,
    /// Free-form price range text, e.g. "$72-75 per barrel"
    pub price_forecast: String,
    /// Attribution for where the forecast came from
    pub source: String,
    /// Short localized action advice for the quarter
    #[serde(rename = "actionRecommendation", skip_serializing_if = "Option::is_none")]
    pub action_recommendation: Option<String>,
    /// True when the point is an estimate rather than a sourced forecast
    /// (insufficient search signal, or the extraction call failed)
    #[serde(default)]
    pub estimated: bool,
}
