//! Scored news items and their per-region impact

use serde::{Deserialize, Serialize};

/// Geography an impact score applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Worldwide market impact
    Global,
    /// Asian markets (Japan, Korea, China, India)
    Asia,
    /// The local market the report is produced for
    Local,
}

impl Region {
    /// All regions, in the order the scorer expects them.
    pub const ALL: [Region; 3] = [Region::Global, Region::Asia, Region::Local];

    /// Localized display name.
    pub fn name_th(self) -> &'static str {
        match self {
            Region::Global => "ทั่วโลก",
            Region::Asia => "เอเชีย",
            Region::Local => "ในประเทศ",
        }
    }
}

/// Impact of one news item on one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionImpact {
    pub region: Region,
    /// 0..=100, clamped on receipt from the model
    pub score: u8,
    /// One-sentence rationale
    pub reason: String,
}

impl RegionImpact {
    /// Whether the score is inside the documented range.
    pub fn is_valid(&self) -> bool {
        self.score <= 100
    }
}

/// One news article after scoring, never mutated afterward.
///
/// Field names match what the presentation layer reads from the persisted
/// artifact (the original generator emitted camelCase here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    /// Derived from publish date + ordinal, e.g. "2025-10-06-3"
    #[serde(rename = "newsId")]
    pub news_id: String,
    pub title: String,
    /// One-line localized summary
    pub summary: String,
    #[serde(rename = "publishedDate")]
    pub published_date: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub link: String,
    /// Exactly one entry per region
    pub scores: Vec<RegionImpact>,
}

impl NewsItem {
    /// Impact score for a region, if the item carries one.
    pub fn score_for(&self, region: Region) -> Option<u8> {
        self.scores
            .iter()
            .find(|s| s.region == region)
            .map(|s| s.score)
    }

    /// Highest regional score, 0 when unscored. Used to rank items.
    pub fn max_score(&self) -> u8 {
        self.scores.iter().map(|s| s.score).max().unwrap_or(0)
    }

    /// Structural validity: one in-range score per region, nothing else.
    pub fn is_complete(&self) -> bool {
        self.scores.len() == Region::ALL.len()
            && Region::ALL
                .iter()
                .all(|r| self.scores.iter().any(|s| s.region == *r && s.is_valid()))
    }
}
