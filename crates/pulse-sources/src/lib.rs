//! External data collaborators for the market intelligence pipeline
//!
//! This crate groups everything that talks to the outside world:
//!
//! - Market data and news fetching (Yahoo Finance)
//! - Web search for forecast evidence (Serper)
//! - A durable, date-scoped cache so repeated same-day runs do not
//!   re-hit the search provider
//!
//! Each collaborator is behind a trait ([`MarketDataProvider`],
//! [`WebSearchProvider`]) so the pipeline can run against fakes in tests.

pub mod cache;
pub mod error;
pub mod market;
pub mod search;

pub use cache::{write_atomic, CacheKey, CacheStore};
pub use error::{Result, SourceError};
pub use market::{
    Candle, MarketDataCollector, MarketDataProvider, MarketObservation, RawArticle,
    YahooMarketData,
};
pub use search::{CachedSearch, SearchHit, SerperClient, WebSearchProvider};
