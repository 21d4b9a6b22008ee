//! Adaptation decision logic
//!
//! Evaluates the two triggers (performance gap, pattern alignment) for one
//! strategy at a time and applies the bounded parameter mutation. All
//! arithmetic is guarded: a non-finite step result leaves the parameter
//! untouched and the audit record notes the fallback, because a partial,
//! explainable adaptation beats a crashed controller on a live feed.

use crate::config::AdaptationConfig;
use crate::domain::adaptation::{AdaptationRecord, AdaptationType};
use crate::domain::pattern::{DetectedPattern, Direction, PatternType};
use crate::domain::strategy::{AdaptiveStrategy, StrategyType};

pub struct AdaptationController {
    config: AdaptationConfig,
}

/// Why a strategy is considered underperforming, with a severity in [0, 1]
struct PerformanceGap {
    reason: String,
    severity: f64,
}

impl AdaptationController {
    pub fn new(config: AdaptationConfig) -> Self {
        Self { config }
    }

    /// Evaluate both triggers for one strategy and mutate it if either fires.
    ///
    /// Underperformance takes precedence over reinforcement: a strategy that
    /// is losing does not get its risk increased, however aligned the market
    /// looks. Returns the audit record of an accepted mutation.
    pub fn adapt(
        &self,
        strategy: &mut AdaptiveStrategy,
        patterns: &[DetectedPattern],
    ) -> Option<AdaptationRecord> {
        if !strategy.is_active {
            return None;
        }

        let record = if let Some(gap) = self.performance_gap(strategy) {
            self.reduce_risk(strategy, gap)
        } else if let Some(pattern) = self.aligned_pattern(strategy, patterns) {
            self.reinforce(strategy, pattern)
        } else {
            return None;
        };

        strategy.adaptation_count += 1;
        strategy.adaptation_history.push(record.id);
        Some(record)
    }

    /// First breached performance target, in fixed evaluation order
    fn performance_gap(&self, strategy: &AdaptiveStrategy) -> Option<PerformanceGap> {
        let metrics = strategy.performance.as_ref()?;
        let targets = &strategy.targets;

        if metrics.sharpe_ratio < targets.min_sharpe_ratio {
            let shortfall = relative_shortfall(targets.min_sharpe_ratio, metrics.sharpe_ratio);
            return Some(PerformanceGap {
                reason: format!(
                    "sharpe_below_target: {:.2} < {:.2}",
                    metrics.sharpe_ratio, targets.min_sharpe_ratio
                ),
                severity: shortfall,
            });
        }
        if metrics.max_drawdown_pct > targets.max_drawdown_pct {
            let excess = relative_shortfall(metrics.max_drawdown_pct, targets.max_drawdown_pct);
            return Some(PerformanceGap {
                reason: format!(
                    "drawdown_above_target: {:.2} > {:.2}",
                    metrics.max_drawdown_pct, targets.max_drawdown_pct
                ),
                severity: excess,
            });
        }
        if metrics.win_rate < targets.min_win_rate {
            let shortfall = relative_shortfall(targets.min_win_rate, metrics.win_rate);
            return Some(PerformanceGap {
                reason: format!(
                    "win_rate_below_target: {:.2} < {:.2}",
                    metrics.win_rate, targets.min_win_rate
                ),
                severity: shortfall,
            });
        }
        None
    }

    /// First pattern (in detection order) that clears the confidence floor
    /// and is consistent with the strategy family
    fn aligned_pattern<'a>(
        &self,
        strategy: &AdaptiveStrategy,
        patterns: &'a [DetectedPattern],
    ) -> Option<&'a DetectedPattern> {
        patterns.iter().find(|p| {
            p.confidence >= self.config.alignment_confidence_floor
                && pattern_aligns(strategy.strategy_type, p)
        })
    }

    /// Shrink risk-increasing parameters and tighten protective ones
    fn reduce_risk(&self, strategy: &mut AdaptiveStrategy, gap: PerformanceGap) -> AdaptationRecord {
        let step = self.config.risk_step;
        let params = &mut strategy.current_parameters;
        let mut fallback = false;

        let size_before = params.position_size();
        let leverage_before = params.leverage();
        let stop_before = params.stop_loss_pct();
        let threshold_before = params.entry_threshold();

        if let Some(size) = size_before {
            match finite(size * (1.0 - step)) {
                Some(next) => params.set_position_size(next),
                None => fallback = true,
            }
        }
        if let Some(leverage) = leverage_before {
            match finite(leverage * (1.0 - step)) {
                Some(next) => params.set_leverage(next),
                None => fallback = true,
            }
        }
        if let Some(stop) = stop_before {
            match finite(stop * (1.0 - step)) {
                Some(next) => params.set_stop_loss_pct(next),
                None => fallback = true,
            }
        }
        if let Some(threshold) = threshold_before {
            // Stricter entries while underperforming
            match finite(threshold + (1.0 - threshold) * step) {
                Some(next) => params.set_entry_threshold(next),
                None => fallback = true,
            }
        }

        params.clamp_to_limits(&strategy.risk_limits);

        let description = describe_changes(
            &[
                ("position_size", size_before, params.position_size()),
                ("leverage", leverage_before, params.leverage()),
                ("stop_loss_pct", stop_before, params.stop_loss_pct()),
                ("entry_threshold", threshold_before, params.entry_threshold()),
            ],
            "risk reduced",
        );

        let mut reason = gap.reason;
        if fallback {
            reason.push_str(" (non-finite step skipped, parameter left unchanged)");
            tracing::warn!(strategy = %strategy.name, "non-finite step during risk reduction");
        }

        AdaptationRecord::new(
            AdaptationType::RiskReduction,
            strategy.id,
            description,
            reason,
            (0.5 + gap.severity * 0.5).min(1.0),
        )
    }

    /// Grow position-size-like parameters toward the pattern's conviction
    fn reinforce(
        &self,
        strategy: &mut AdaptiveStrategy,
        pattern: &DetectedPattern,
    ) -> AdaptationRecord {
        let params = &mut strategy.current_parameters;
        let mut fallback = false;

        let size_before = params.position_size();
        let threshold_before = params.entry_threshold();

        if let Some(size) = size_before {
            match finite(size * (1.0 + self.config.reinforce_step)) {
                Some(next) => params.set_position_size(next),
                None => fallback = true,
            }
        }
        if let Some(threshold) = threshold_before {
            // Pull the entry gate toward the observed pattern confidence
            let blended =
                threshold + (pattern.confidence - threshold) * self.config.threshold_blend;
            match finite(blended) {
                Some(next) => params.set_entry_threshold(next),
                None => fallback = true,
            }
        }

        params.clamp_to_limits(&strategy.risk_limits);

        let description = describe_changes(
            &[
                ("position_size", size_before, params.position_size()),
                ("entry_threshold", threshold_before, params.entry_threshold()),
            ],
            "reinforced",
        );

        let mut reason = format!(
            "pattern_aligned: {}/{} confidence={:.2}",
            pattern.pattern_type,
            pattern.direction(),
            pattern.confidence
        );
        if fallback {
            reason.push_str(" (non-finite step skipped, parameter left unchanged)");
            tracing::warn!(strategy = %strategy.name, "non-finite step during reinforcement");
        }

        AdaptationRecord::new(
            AdaptationType::Reinforcement,
            strategy.id,
            description,
            reason,
            pattern.confidence,
        )
    }
}

/// Which pattern families are consistent with which strategy families.
///
/// Exhaustive on purpose: adding a strategy or pattern type forces this
/// decision at compile time.
fn pattern_aligns(strategy_type: StrategyType, pattern: &DetectedPattern) -> bool {
    match strategy_type {
        StrategyType::TrendFollowing | StrategyType::Momentum => {
            pattern.pattern_type == PatternType::Trend
                && matches!(pattern.direction(), Direction::Up | Direction::Down)
        }
        StrategyType::MeanReversion => matches!(
            pattern.pattern_type,
            PatternType::MeanReversion | PatternType::Range
        ),
        StrategyType::Breakout => pattern.pattern_type == PatternType::VolatilitySpike,
        // Open-ended parameter sets carry no alignment semantics
        StrategyType::Custom => false,
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn relative_shortfall(target: f64, actual: f64) -> f64 {
    if target.abs() < f64::EPSILON {
        return 0.0;
    }
    ((target - actual) / target.abs()).clamp(0.0, 1.0)
}

fn describe_changes(changes: &[(&str, Option<f64>, Option<f64>)], prefix: &str) -> String {
    let parts: Vec<String> = changes
        .iter()
        .filter_map(|(name, before, after)| match (before, after) {
            (Some(b), Some(a)) => Some(format!("{} {:.4} -> {:.4}", name, b, a)),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        format!("{}: no tunable parameters", prefix)
    } else {
        format!("{}: {}", prefix, parts.join(", "))
    }
}
