//! Data model for the market-pulse intelligence pipeline
//!
//! Every type that crosses a stage boundary lives here: the market snapshot
//! produced by the collector, scored news items, quarterly forecasts, the
//! popup bundle consumed by the presentation layer, and the combined artifact
//! that gets persisted once per market.
//!
//! Serialized field names are part of the external contract (the presentation
//! layer reads the persisted JSON directly), so the serde renames in this
//! crate must not change without coordinating with consumers.

pub mod artifact;
pub mod forecast;
pub mod market;
pub mod news;
pub mod popup;

pub use artifact::{BatchIndex, CombinedArtifact, ForecastList, NewsBatch, ReportDocument};
pub use forecast::ForecastPoint;
pub use market::MarketSnapshot;
pub use news::{NewsItem, Region, RegionImpact};
pub use popup::{
    ImpactLevel, KeyMetric, OpportunityLevel, Persona, PersonaRecommendation, PopupBundle,
    RegionalImpactSummary, RiskLevel, TopNews, Trend,
};
