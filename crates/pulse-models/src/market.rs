//! Market snapshot produced by the data collector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of one market, immutable for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Provider symbol (e.g. "CL=F")
    pub symbol: String,
    /// Quote unit (e.g. "USD/barrel")
    pub unit: String,
    /// Latest close
    pub current_price: f64,
    /// Absolute change versus the previous close
    pub price_change: f64,
    /// Percent change versus the previous close
    pub price_change_pct: f64,
    /// Highest close over the lookback window
    pub high_30d: f64,
    /// Lowest close over the lookback window
    pub low_30d: f64,
    /// Percent change from the first to the last close of the window
    pub change_30d_pct: f64,
    /// When this snapshot was captured
    pub captured_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Direction of the most recent 1-period move.
    pub fn direction(&self) -> crate::popup::Trend {
        if self.price_change > 0.0 {
            crate::popup::Trend::Up
        } else if self.price_change < 0.0 {
            crate::popup::Trend::Down
        } else {
            crate::popup::Trend::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::popup::Trend;

    fn snapshot(change: f64) -> MarketSnapshot {
        MarketSnapshot {
            symbol: "CL=F".to_string(),
            unit: "USD/barrel".to_string(),
            current_price: 72.4,
            price_change: change,
            price_change_pct: change / 72.4 * 100.0,
            high_30d: 75.0,
            low_30d: 68.1,
            change_30d_pct: 1.9,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_direction_from_price_change() {
        assert_eq!(snapshot(0.8).direction(), Trend::Up);
        assert_eq!(snapshot(-1.2).direction(), Trend::Down);
        assert_eq!(snapshot(0.0).direction(), Trend::Neutral);
    }
}
