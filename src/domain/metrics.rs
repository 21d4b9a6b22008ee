use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Realized performance of a strategy, computed by an external reporting
/// collaborator (backtester or live-trading report generator).
///
/// The engine never computes P&L itself; it only compares these numbers
/// against a strategy's targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPerformanceMetrics {
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub volatility_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64, // Realized peak-to-trough, 0.08 = 8%
    pub win_rate: f64,         // 0.0 to 1.0
    pub profit_factor: f64,
    pub total_trades: usize,
    pub as_of: DateTime<Utc>,
}

impl MarketPerformanceMetrics {
    /// Neutral placeholder used before the first external report arrives
    pub fn flat(as_of: DateTime<Utc>) -> Self {
        Self {
            total_return_pct: 0.0,
            annualized_return_pct: 0.0,
            volatility_pct: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown_pct: 0.0,
            win_rate: 0.0,
            profit_factor: 0.0,
            total_trades: 0,
            as_of,
        }
    }
}
