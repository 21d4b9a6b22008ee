//! Rule-based market pattern classification
//!
//! Pure functions over a caller-supplied snapshot: no shared state, no
//! locking, and no errors — malformed input degrades to an empty result.
//! Detection order is fixed (trend, volatility, mean-reversion) and at most
//! one pattern of each type is emitted per call, so callers can treat
//! index 0 as the dominant pattern and tests stay reproducible.

use crate::config::ClassifierConfig;
use crate::domain::market::MarketSnapshot;
use crate::domain::pattern::{
    DetectedPattern, Direction, ExpectedOutcome, MarketContext, PatternType,
};
use chrono::Utc;
use statrs::statistics::{Data, Distribution};
use std::collections::HashMap;

pub struct PatternClassifier {
    config: ClassifierConfig,
}

impl PatternClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify a snapshot into zero or more patterns.
    ///
    /// Never fails: snapshots with fewer than 3 points, mismatched series
    /// lengths, or non-finite prices produce an empty result.
    pub fn detect(&self, snapshot: &MarketSnapshot) -> Vec<DetectedPattern> {
        let Some(prices) = snapshot.price_series() else {
            tracing::debug!(symbol = %snapshot.symbol, "malformed snapshot, skipping classification");
            return Vec::new();
        };

        let horizon_secs = snapshot
            .median_timestep_secs()
            .map(|step| step.saturating_mul(prices.len() as i64))
            .unwrap_or(self.config.default_horizon_secs);

        let mut patterns = Vec::new();

        let trend = self.detect_trend(&prices, horizon_secs);
        let has_trend = trend.is_some();
        if let Some(pattern) = trend {
            patterns.push(pattern);
        }
        if let Some(pattern) = self.detect_volatility_spike(&prices, horizon_secs) {
            patterns.push(pattern);
        }
        // Mean reversion only makes sense in the absence of a strong trend
        if !has_trend {
            if let Some(pattern) = self.detect_range(&prices, horizon_secs) {
                patterns.push(pattern);
            }
        }

        let context = MarketContext {
            indicators: snapshot.technical_indicators.clone().unwrap_or_default(),
            chart_analysis: snapshot.chart_analysis.clone(),
        };
        for pattern in &mut patterns {
            let correction = indicator_correction(
                pattern,
                &context.indicators,
                self.config.indicator_correction_limit,
            );
            pattern.confidence = (pattern.confidence + correction).clamp(0.0, 1.0);
            pattern.expected_outcome.probability = pattern.confidence;
            pattern.context = context.clone();
        }

        patterns
    }

    fn detect_trend(&self, prices: &[f64], horizon_secs: i64) -> Option<DetectedPattern> {
        let (slope, r_squared) = linear_fit(prices)?;
        let mean = Data::new(prices.to_vec()).mean()?;
        if mean <= 0.0 {
            return None;
        }

        let normalized_slope = slope / mean;
        if normalized_slope.abs() <= self.config.trend_slope_threshold {
            return None;
        }

        let first = *prices.first()?;
        let last = *prices.last()?;
        if first <= 0.0 {
            return None;
        }
        let cumulative_change = (last - first) / first;

        let direction = if normalized_slope > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };
        let name = match direction {
            Direction::Up => "uptrend",
            _ => "downtrend",
        };

        Some(DetectedPattern {
            pattern_type: PatternType::Trend,
            name: name.to_string(),
            confidence: r_squared.clamp(0.0, 1.0),
            // 1% per step reads as maximum strength
            strength: (normalized_slope.abs() * 100.0).clamp(0.0, 1.0),
            expected_outcome: ExpectedOutcome {
                direction,
                magnitude: cumulative_change.abs(),
                probability: r_squared.clamp(0.0, 1.0),
                time_horizon_secs: horizon_secs,
            },
            context: MarketContext::default(),
            detected_at: Utc::now(),
        })
    }

    fn detect_volatility_spike(&self, prices: &[f64], horizon_secs: i64) -> Option<DetectedPattern> {
        let returns = period_returns(prices);
        if returns.len() < 6 {
            return None;
        }

        // Earlier two thirds form the baseline the recent slice is compared against
        let split = returns.len() * 2 / 3;
        let baseline = &returns[..split];
        let recent = &returns[split..];
        if baseline.len() < 2 || recent.len() < 2 {
            return None;
        }

        let baseline_std = Data::new(baseline.to_vec()).std_dev()?;
        let recent_std = Data::new(recent.to_vec()).std_dev()?;
        let ratio = recent_std / baseline_std.max(1e-9);
        if ratio <= self.config.volatility_spike_multiplier {
            return None;
        }

        let excess = ratio - self.config.volatility_spike_multiplier;
        Some(DetectedPattern {
            pattern_type: PatternType::VolatilitySpike,
            name: "volatility_spike".to_string(),
            confidence: (0.5 + excess * 0.15).min(0.95),
            strength: (excess / self.config.volatility_spike_multiplier).clamp(0.0, 1.0),
            expected_outcome: ExpectedOutcome {
                direction: Direction::Sideways,
                magnitude: recent_std,
                probability: (0.5 + excess * 0.15).min(0.95),
                time_horizon_secs: horizon_secs,
            },
            context: MarketContext::default(),
            detected_at: Utc::now(),
        })
    }

    fn detect_range(&self, prices: &[f64], horizon_secs: i64) -> Option<DetectedPattern> {
        let mean = Data::new(prices.to_vec()).mean()?;
        if mean <= 0.0 {
            return None;
        }

        let max_deviation = prices
            .iter()
            .map(|p| (p - mean).abs())
            .fold(0.0_f64, f64::max);
        let bound = self.config.range_deviation_threshold * mean;
        if max_deviation >= bound {
            return None;
        }

        // Oscillation requirement: the series must actually cross its mean,
        // otherwise a short drifting window would read as range-bound
        if mean_crossings(prices, mean) < 2 {
            return None;
        }

        Some(DetectedPattern {
            pattern_type: PatternType::MeanReversion,
            name: "range_bound".to_string(),
            confidence: 0.6,
            strength: (1.0 - max_deviation / bound).clamp(0.0, 1.0),
            expected_outcome: ExpectedOutcome {
                direction: Direction::Sideways,
                magnitude: max_deviation / mean,
                probability: 0.6,
                time_horizon_secs: horizon_secs,
            },
            context: MarketContext::default(),
            detected_at: Utc::now(),
        })
    }
}

/// Least-squares fit of values against their index.
///
/// Returns `(slope, r_squared)`; `None` when the series is too short or the
/// fit is degenerate.
fn linear_fit(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;

    let x_sum: f64 = (0..n).map(|i| i as f64).sum();
    let y_sum: f64 = values.iter().sum();
    let xy_sum: f64 = values.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();
    let x2_sum: f64 = (0..n).map(|i| (i * i) as f64).sum();

    let denominator = nf * x2_sum - x_sum * x_sum;
    if denominator.abs() < f64::EPSILON {
        return None;
    }
    let slope = (nf * xy_sum - x_sum * y_sum) / denominator;
    let intercept = (y_sum - slope * x_sum) / nf;

    let mean_y = y_sum / nf;
    let mut ss_residual = 0.0;
    let mut ss_total = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let fitted = intercept + slope * i as f64;
        ss_residual += (y - fitted).powi(2);
        ss_total += (y - mean_y).powi(2);
    }

    let r_squared = if ss_total <= f64::EPSILON {
        // Constant series: the fit is exact when residuals vanish
        if ss_residual <= f64::EPSILON { 1.0 } else { 0.0 }
    } else {
        (1.0 - ss_residual / ss_total).clamp(0.0, 1.0)
    };

    Some((slope, r_squared))
}

/// Period-over-period fractional returns, skipping non-positive denominators
fn period_returns(prices: &[f64]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(prices.len().saturating_sub(1));
    for window in prices.windows(2) {
        if window[0] > 0.0 {
            returns.push((window[1] - window[0]) / window[0]);
        }
    }
    returns
}

/// Number of times the series crosses its mean (sign changes of p - mean)
fn mean_crossings(prices: &[f64], mean: f64) -> usize {
    let mut crossings = 0;
    let mut last_sign = 0i8;
    for price in prices {
        let sign = if *price > mean {
            1
        } else if *price < mean {
            -1
        } else {
            continue;
        };
        if last_sign != 0 && sign != last_sign {
            crossings += 1;
        }
        last_sign = sign;
    }
    crossings
}

/// Bounded confidence correction from externally supplied indicators.
///
/// RSI and MACD readings that agree with the pattern's direction raise
/// confidence, disagreement lowers it; the total is clamped to the
/// configured limit either way.
fn indicator_correction(
    pattern: &DetectedPattern,
    indicators: &HashMap<String, f64>,
    limit: f64,
) -> f64 {
    if indicators.is_empty() || limit <= 0.0 {
        return 0.0;
    }

    let mut correction = 0.0;

    if let Some(&rsi) = indicators.get("rsi") {
        let bias = ((rsi - 50.0) / 50.0).clamp(-1.0, 1.0);
        let agreement = match pattern.direction() {
            Direction::Up => bias,
            Direction::Down => -bias,
            Direction::Sideways => 1.0 - 2.0 * bias.abs(), // Neutral RSI supports a sideways read
        };
        correction += agreement * limit * 0.5;
    }

    if let Some(&macd) = indicators.get("macd") {
        let sign = if macd > 0.0 {
            1.0
        } else if macd < 0.0 {
            -1.0
        } else {
            0.0
        };
        let agreement = match pattern.direction() {
            Direction::Up => sign,
            Direction::Down => -sign,
            Direction::Sideways => {
                if sign == 0.0 {
                    1.0
                } else {
                    -0.5
                }
            }
        };
        correction += agreement * limit * 0.5;
    }

    correction.clamp(-limit, limit)
}
