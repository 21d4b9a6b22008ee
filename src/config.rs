use anyhow::{Context, Result};
use std::env;

/// Thresholds steering the pattern classifier.
///
/// Defaults are tuned for per-bar fractional moves; every value can be
/// overridden through the environment so deployments can retune without a
/// rebuild.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub trend_slope_threshold: f64,       // Normalized slope per step (0.003 = 0.3%)
    pub volatility_spike_multiplier: f64, // Recent stdev vs baseline stdev
    pub range_deviation_threshold: f64,   // Max deviation from mean, as fraction of mean
    pub indicator_correction_limit: f64,  // Max confidence adjustment from supplied indicators
    pub default_horizon_secs: i64,        // Fallback when timestamps are degenerate
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            trend_slope_threshold: 0.003, // 0.3% per step
            volatility_spike_multiplier: 2.0,
            range_deviation_threshold: 0.02, // 2% of mean
            indicator_correction_limit: 0.1,
            default_horizon_secs: 3600,
        }
    }
}

/// Step sizes and gates for the adaptation controller
#[derive(Debug, Clone)]
pub struct AdaptationConfig {
    pub risk_step: f64,                  // Fractional shrink when underperforming (0.10 = -10%)
    pub reinforce_step: f64,             // Fractional grow when pattern-aligned (0.10 = +10%)
    pub alignment_confidence_floor: f64, // Minimum pattern confidence to reinforce
    pub threshold_blend: f64,            // Pull of entry threshold toward pattern confidence
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            risk_step: 0.10,
            reinforce_step: 0.10,
            alignment_confidence_floor: 0.6,
            threshold_blend: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    pub adaptation: AdaptationConfig,
    pub pattern_cache_cap: usize, // Rolling window of recent patterns kept for query
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            adaptation: AdaptationConfig::default(),
            pattern_cache_cap: 256,
        }
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("{} must be a number, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

fn env_i64(key: &str, default: i64) -> Result<i64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("{} must be an integer, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let classifier = ClassifierConfig {
            trend_slope_threshold: env_f64(
                "TREND_SLOPE_THRESHOLD",
                defaults.classifier.trend_slope_threshold,
            )?,
            volatility_spike_multiplier: env_f64(
                "VOLATILITY_SPIKE_MULTIPLIER",
                defaults.classifier.volatility_spike_multiplier,
            )?,
            range_deviation_threshold: env_f64(
                "RANGE_DEVIATION_THRESHOLD",
                defaults.classifier.range_deviation_threshold,
            )?,
            indicator_correction_limit: env_f64(
                "INDICATOR_CORRECTION_LIMIT",
                defaults.classifier.indicator_correction_limit,
            )?,
            default_horizon_secs: env_i64(
                "DEFAULT_HORIZON_SECS",
                defaults.classifier.default_horizon_secs,
            )?,
        };

        let adaptation = AdaptationConfig {
            risk_step: env_f64("ADAPTATION_RISK_STEP", defaults.adaptation.risk_step)?,
            reinforce_step: env_f64(
                "ADAPTATION_REINFORCE_STEP",
                defaults.adaptation.reinforce_step,
            )?,
            alignment_confidence_floor: env_f64(
                "ALIGNMENT_CONFIDENCE_FLOOR",
                defaults.adaptation.alignment_confidence_floor,
            )?,
            threshold_blend: env_f64(
                "ADAPTATION_THRESHOLD_BLEND",
                defaults.adaptation.threshold_blend,
            )?,
        };

        let pattern_cache_cap = env_i64("PATTERN_CACHE_CAP", defaults.pattern_cache_cap as i64)?
            .try_into()
            .context("PATTERN_CACHE_CAP must be non-negative")?;

        let config = Self {
            classifier,
            adaptation,
            pattern_cache_cap,
        };
        config
            .validate()
            .map_err(|reason| anyhow::anyhow!("Invalid engine config: {}", reason))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classifier.trend_slope_threshold <= 0.0 {
            return Err(format!(
                "trend_slope_threshold must be positive, got {}",
                self.classifier.trend_slope_threshold
            ));
        }
        if self.classifier.volatility_spike_multiplier <= 1.0 {
            return Err(format!(
                "volatility_spike_multiplier must exceed 1.0, got {}",
                self.classifier.volatility_spike_multiplier
            ));
        }
        if self.classifier.range_deviation_threshold <= 0.0 {
            return Err(format!(
                "range_deviation_threshold must be positive, got {}",
                self.classifier.range_deviation_threshold
            ));
        }
        if !(0.0..=0.5).contains(&self.classifier.indicator_correction_limit) {
            return Err(format!(
                "indicator_correction_limit must be in [0, 0.5], got {}",
                self.classifier.indicator_correction_limit
            ));
        }
        if self.classifier.default_horizon_secs <= 0 {
            return Err(format!(
                "default_horizon_secs must be positive, got {}",
                self.classifier.default_horizon_secs
            ));
        }
        if !(0.0..1.0).contains(&self.adaptation.risk_step) || self.adaptation.risk_step == 0.0 {
            return Err(format!(
                "risk_step must be in (0, 1), got {}",
                self.adaptation.risk_step
            ));
        }
        if self.adaptation.reinforce_step <= 0.0 {
            return Err(format!(
                "reinforce_step must be positive, got {}",
                self.adaptation.reinforce_step
            ));
        }
        if !(0.0..=1.0).contains(&self.adaptation.alignment_confidence_floor) {
            return Err(format!(
                "alignment_confidence_floor must be in [0, 1], got {}",
                self.adaptation.alignment_confidence_floor
            ));
        }
        if !(0.0..=1.0).contains(&self.adaptation.threshold_blend) {
            return Err(format!(
                "threshold_blend must be in [0, 1], got {}",
                self.adaptation.threshold_blend
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_multiplier() {
        let mut config = EngineConfig::default();
        config.classifier.volatility_spike_multiplier = 0.8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_step() {
        let mut config = EngineConfig::default();
        config.adaptation.risk_step = 1.5;
        assert!(config.validate().is_err());
    }
}
