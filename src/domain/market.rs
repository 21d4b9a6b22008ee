use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Minimum number of price points required before any classification runs
pub const MIN_PRICE_POINTS: usize = 3;

/// A window of market data handed over by the feed loop or the API layer.
///
/// Prices arrive as decimals from the data boundary and are converted to f64
/// at the statistics boundary. The three series must be the same length;
/// a snapshot violating that is treated as malformed, not as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub symbol: String,
    pub prices: Vec<Decimal>,
    pub volumes: Vec<f64>,
    pub timestamps: Vec<i64>, // Seconds since epoch
    #[serde(default)]
    pub technical_indicators: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub chart_analysis: Option<String>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, prices: Vec<Decimal>, volumes: Vec<f64>, timestamps: Vec<i64>) -> Self {
        Self {
            symbol: symbol.into(),
            prices,
            volumes,
            timestamps,
            technical_indicators: None,
            chart_analysis: None,
        }
    }

    pub fn with_indicators(mut self, indicators: HashMap<String, f64>) -> Self {
        self.technical_indicators = Some(indicators);
        self
    }

    pub fn with_chart_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.chart_analysis = Some(analysis.into());
        self
    }

    /// Parse the loosely typed JSON bag the API layer sends.
    ///
    /// Returns `None` for anything that does not deserialize; the caller
    /// degrades to "no patterns" rather than surfacing a parse error.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    pub fn is_well_formed(&self) -> bool {
        self.prices.len() >= MIN_PRICE_POINTS
            && self.prices.len() == self.volumes.len()
            && self.prices.len() == self.timestamps.len()
    }

    /// Price series as f64 for the statistics boundary.
    ///
    /// Returns `None` when the snapshot is malformed or any price fails the
    /// decimal-to-float conversion, so classification can bail out cleanly.
    pub fn price_series(&self) -> Option<Vec<f64>> {
        if !self.is_well_formed() {
            return None;
        }
        let prices: Vec<f64> = self.prices.iter().filter_map(|p| p.to_f64()).collect();
        if prices.len() != self.prices.len() || prices.iter().any(|p| !p.is_finite()) {
            return None;
        }
        Some(prices)
    }

    /// Median spacing between consecutive timestamps, in seconds.
    ///
    /// Used to project a pattern's time horizon. Degenerate spacing (empty,
    /// unordered, or zero) yields `None` and the caller falls back to a
    /// configured default.
    pub fn median_timestep_secs(&self) -> Option<i64> {
        if self.timestamps.len() < 2 {
            return None;
        }
        let mut steps: Vec<i64> = self
            .timestamps
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|s| *s > 0)
            .collect();
        if steps.is_empty() {
            return None;
        }
        steps.sort_unstable();
        Some(steps[steps.len() / 2])
    }
}
