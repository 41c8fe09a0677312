//! Market data collection
//!
//! [`MarketDataProvider`] is the seam to the quote/news provider;
//! [`MarketDataCollector`] turns a provider's history window into the
//! immutable [`MarketSnapshot`] the rest of the pipeline consumes.

use crate::error::{Result, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_models::MarketSnapshot;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

/// One OHLCV bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Provider-native news record. No schema guarantee beyond these fields
/// being optionally present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub provider: Option<String>,
}

/// Seam to the market-data backend.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Price/volume history for the last `window_days` days.
    ///
    /// Fails with [`SourceError::DataUnavailable`] when the provider
    /// returns an empty window.
    async fn history(&self, symbol: &str, window_days: u32) -> Result<Vec<Candle>>;

    /// Recent news for the symbol, uninterpreted.
    async fn news(&self, symbol: &str) -> Result<Vec<RawArticle>>;
}

/// Yahoo Finance backed provider.
pub struct YahooMarketData {}

impl YahooMarketData {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for YahooMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooMarketData {
    async fn history(&self, symbol: &str, window_days: u32) -> Result<Vec<Candle>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| SourceError::YahooFinanceError(e.to_string()))?;

        let end = Utc::now();
        let start = end - chrono::Duration::days(i64::from(window_days));
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| SourceError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| SourceError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| SourceError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| SourceError::YahooFinanceError(e.to_string()))?;

        if quotes.is_empty() {
            return Err(SourceError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "empty history window".to_string(),
            });
        }

        Ok(quotes
            .iter()
            .map(|q| Candle {
                timestamp: DateTime::from_timestamp(q.timestamp as i64, 0)
                    .unwrap_or_else(Utc::now),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect())
    }

    async fn news(&self, symbol: &str) -> Result<Vec<RawArticle>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| SourceError::YahooFinanceError(e.to_string()))?;

        let result = provider
            .search_ticker(symbol)
            .await
            .map_err(|e| SourceError::YahooFinanceError(e.to_string()))?;

        Ok(result
            .news
            .into_iter()
            .map(|item| RawArticle {
                title: Some(item.title),
                summary: None,
                published_at: DateTime::from_timestamp(item.provider_publish_time as i64, 0),
                link: Some(item.link),
                image_url: None,
                provider: Some(item.publisher),
            })
            .collect())
    }
}

/// Collector output: the snapshot plus whatever news the provider had.
#[derive(Debug, Clone)]
pub struct MarketObservation {
    pub snapshot: MarketSnapshot,
    pub raw_news: Vec<RawArticle>,
}

/// Builds snapshots from a provider's history window.
///
/// No retry happens here; the orchestrator wraps `collect` in its bounded
/// retry with exponential backoff.
pub struct MarketDataCollector<P> {
    provider: P,
}

impl<P: MarketDataProvider> MarketDataCollector<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Fetch one market's history window and raw news.
    ///
    /// Empty history is run-fatal ([`SourceError::DataUnavailable`]);
    /// a news failure only degrades to an empty list.
    pub async fn collect(
        &self,
        symbol: &str,
        unit: &str,
        window_days: u32,
    ) -> Result<MarketObservation> {
        let candles = self.provider.history(symbol, window_days).await?;
        let snapshot = snapshot_from_candles(symbol, unit, &candles)?;

        let raw_news = match self.provider.news(symbol).await {
            Ok(news) => news,
            Err(e) => {
                warn!(symbol, error = %e, "news fetch failed, continuing with empty news");
                Vec::new()
            }
        };

        debug!(
            symbol,
            price = snapshot.current_price,
            news_count = raw_news.len(),
            "market observation collected"
        );

        Ok(MarketObservation { snapshot, raw_news })
    }
}

/// Derive the snapshot from a non-empty, chronologically ordered window.
fn snapshot_from_candles(symbol: &str, unit: &str, candles: &[Candle]) -> Result<MarketSnapshot> {
    let last = candles.last().ok_or_else(|| SourceError::DataUnavailable {
        symbol: symbol.to_string(),
        reason: "empty history window".to_string(),
    })?;

    let prev_close = if candles.len() > 1 {
        candles[candles.len() - 2].close
    } else {
        last.close
    };

    let price_change = last.close - prev_close;
    let price_change_pct = if prev_close == 0.0 {
        0.0
    } else {
        price_change / prev_close * 100.0
    };

    let high_30d = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low_30d = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    let first_close = candles[0].close;
    let change_30d_pct = if first_close == 0.0 {
        0.0
    } else {
        (last.close - first_close) / first_close * 100.0
    };

    Ok(MarketSnapshot {
        symbol: symbol.to_string(),
        unit: unit.to_string(),
        current_price: last.close,
        price_change,
        price_change_pct,
        high_30d,
        low_30d,
        change_30d_pct,
        captured_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64, high: f64, low: f64) -> Candle {
        Candle {
            timestamp: Utc::now(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    struct FakeProvider {
        candles: Vec<Candle>,
        news_fails: bool,
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        async fn history(&self, symbol: &str, _window_days: u32) -> Result<Vec<Candle>> {
            if self.candles.is_empty() {
                return Err(SourceError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: "empty history window".to_string(),
                });
            }
            Ok(self.candles.clone())
        }

        async fn news(&self, _symbol: &str) -> Result<Vec<RawArticle>> {
            if self.news_fails {
                return Err(SourceError::ApiError("news endpoint down".to_string()));
            }
            Ok(vec![RawArticle {
                title: Some("headline".to_string()),
                ..RawArticle::default()
            }])
        }
    }

    #[test]
    fn test_snapshot_math() {
        let candles = vec![
            candle(70.0, 71.0, 69.0),
            candle(72.0, 73.5, 70.5),
            candle(71.0, 72.2, 70.0),
        ];
        let snap = snapshot_from_candles("CL=F", "USD/barrel", &candles).unwrap();

        assert_eq!(snap.current_price, 71.0);
        assert_eq!(snap.price_change, -1.0);
        assert!((snap.price_change_pct - (-1.0 / 72.0 * 100.0)).abs() < 1e-9);
        assert_eq!(snap.high_30d, 73.5);
        assert_eq!(snap.low_30d, 69.0);
        assert!((snap.change_30d_pct - (1.0 / 70.0 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_single_candle_has_zero_change() {
        let snap = snapshot_from_candles("SB=F", "USD/lb", &[candle(0.18, 0.19, 0.17)]).unwrap();
        assert_eq!(snap.price_change, 0.0);
        assert_eq!(snap.price_change_pct, 0.0);
    }

    #[tokio::test]
    async fn test_collect_with_failing_news_degrades_to_empty() {
        let collector = MarketDataCollector::new(FakeProvider {
            candles: vec![candle(70.0, 71.0, 69.0)],
            news_fails: true,
        });

        let obs = collector.collect("CL=F", "USD/barrel", 30).await.unwrap();
        assert!(obs.raw_news.is_empty());
        assert_eq!(obs.snapshot.current_price, 70.0);
    }

    #[tokio::test]
    async fn test_collect_empty_history_is_data_unavailable() {
        let collector = MarketDataCollector::new(FakeProvider {
            candles: vec![],
            news_fails: false,
        });

        let err = collector.collect("BAD=F", "USD", 30).await.unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable { .. }));
    }
}
