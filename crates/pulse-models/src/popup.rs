//! Popup bundle: key metrics, regional summaries and persona recommendations
//!
//! These shapes mirror what the detail modal in the presentation layer
//! consumes, so the snake_case field names here are load-bearing.

use crate::forecast::ForecastPoint;
use crate::news::Region;
use serde::{Deserialize, Serialize};

/// Direction indicator used by metrics and regional summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// Qualitative level derived from an aggregate impact score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
}

impl ImpactLevel {
    /// Fixed thresholds: >=80 very high, 60-79 high, 40-59 moderate, <40 low.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => ImpactLevel::VeryHigh,
            60..=79 => ImpactLevel::High,
            40..=59 => ImpactLevel::Moderate,
            _ => ImpactLevel::Low,
        }
    }
}

/// Aggregate impact of the run's news on one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionalImpactSummary {
    pub region: Region,
    pub region_name_th: String,
    /// 0..=100 aggregate of the region's news scores
    pub impact_score: u8,
    pub impact_level: ImpactLevel,
    pub trend: Trend,
    pub summary: String,
    /// 2-3 key factors, drawn from the highest-impact news rationales
    pub key_factors: Vec<String>,
}

/// Fixed recommendation audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Sme,
    SupplyChain,
    Investor,
}

impl Persona {
    /// All personas; a run yields exactly one recommendation per entry.
    pub const ALL: [Persona; 3] = [Persona::Sme, Persona::SupplyChain, Persona::Investor];

    pub fn name_th(self) -> &'static str {
        match self {
            Persona::Sme => "ธุรกิจ SME",
            Persona::SupplyChain => "ผู้จัดการซัพพลายเชน",
            Persona::Investor => "นักลงทุน",
        }
    }

    /// Audience description used in prompts.
    pub fn audience(self) -> &'static str {
        match self {
            Persona::Sme => "a small/medium business owner exposed to this market's input costs",
            Persona::SupplyChain => "a supply-chain manager planning procurement and logistics",
            Persona::Investor => "a retail investor considering positions related to this market",
        }
    }
}

/// Qualitative risk for a persona recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Qualitative opportunity for a persona recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityLevel {
    Low,
    Medium,
    High,
}

/// One persona's recommendation for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaRecommendation {
    pub persona: Persona,
    pub persona_name_th: String,
    /// What the market is doing, framed for this audience
    pub market_situation: String,
    /// Quantified insight with concrete numbers from the run's data
    pub power_insight: String,
    /// What to do and by when
    pub action_recommendation: String,
    pub risk_assessment: RiskLevel,
    pub opportunity_level: OpportunityLevel,
}

impl PersonaRecommendation {
    /// Structural contract: all narrative fields non-empty.
    pub fn is_complete(&self) -> bool {
        !self.market_situation.trim().is_empty()
            && !self.power_insight.trim().is_empty()
            && !self.action_recommendation.trim().is_empty()
    }

    /// Fixed fallback used when the model response for a persona is
    /// malformed or incomplete.
    pub fn fallback(persona: Persona) -> Self {
        Self {
            persona,
            persona_name_th: persona.name_th().to_string(),
            market_situation: "ข้อมูลไม่เพียงพอสำหรับการวิเคราะห์ในรอบนี้".to_string(),
            power_insight: "insufficient data — review manually".to_string(),
            action_recommendation: "ตรวจสอบข้อมูลตลาดด้วยตนเองก่อนตัดสินใจ".to_string(),
            risk_assessment: RiskLevel::Medium,
            opportunity_level: OpportunityLevel::Low,
        }
    }
}

/// Headline metric shown at the top of the popup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMetric {
    pub label: String,
    pub value: String,
    pub trend: Trend,
}

/// The single highest-impact news item of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopNews {
    pub title: String,
    pub summary: String,
    pub impact_score: u8,
    pub published_date: String,
    pub image_url: String,
    pub link: String,
}

/// Everything the detail modal needs in one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupBundle {
    pub key_metrics: Vec<KeyMetric>,
    pub quick_summary: String,
    pub regional_impacts: Vec<RegionalImpactSummary>,
    pub recommendations: Vec<PersonaRecommendation>,
    /// Absent when the run had no news at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_news: Option<TopNews>,
    pub price_forecasts: Vec<ForecastPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_level_thresholds() {
        assert_eq!(ImpactLevel::from_score(100), ImpactLevel::VeryHigh);
        assert_eq!(ImpactLevel::from_score(80), ImpactLevel::VeryHigh);
        assert_eq!(ImpactLevel::from_score(79), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_score(60), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_score(59), ImpactLevel::Moderate);
        assert_eq!(ImpactLevel::from_score(40), ImpactLevel::Moderate);
        assert_eq!(ImpactLevel::from_score(39), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_score(0), ImpactLevel::Low);
    }

    #[test]
    fn test_persona_serialization() {
        assert_eq!(
            serde_json::to_string(&Persona::SupplyChain).unwrap(),
            "\"supply_chain\""
        );
        assert_eq!(serde_json::to_string(&Persona::Sme).unwrap(), "\"sme\"");
    }

    #[test]
    fn test_fallback_recommendation_is_complete() {
        for persona in Persona::ALL {
            let rec = PersonaRecommendation::fallback(persona);
            assert!(rec.is_complete());
            assert_eq!(rec.persona, persona);
            assert_eq!(rec.risk_assessment, RiskLevel::Medium);
            assert_eq!(rec.opportunity_level, OpportunityLevel::Low);
        }
    }

    #[test]
    fn test_incomplete_recommendation_detected() {
        let mut rec = PersonaRecommendation::fallback(Persona::Investor);
        rec.power_insight = "   ".to_string();
        assert!(!rec.is_complete());
    }

    #[test]
    fn test_top_news_omitted_when_absent() {
        let bundle = PopupBundle {
            key_metrics: vec![],
            quick_summary: String::new(),
            regional_impacts: vec![],
            recommendations: vec![],
            top_news: None,
            price_forecasts: vec![],
        };
        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json.get("top_news").is_none());
    }
}
