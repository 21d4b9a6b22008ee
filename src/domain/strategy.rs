use crate::domain::errors::EngineError;
use crate::domain::metrics::MarketPerformanceMetrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Closed set of strategy families the controller knows how to steer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    TrendFollowing,
    MeanReversion,
    Momentum,
    Breakout,
    Custom,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyType::TrendFollowing => write!(f, "trend_following"),
            StrategyType::MeanReversion => write!(f, "mean_reversion"),
            StrategyType::Momentum => write!(f, "momentum"),
            StrategyType::Breakout => write!(f, "breakout"),
            StrategyType::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for StrategyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trend_following" => Ok(StrategyType::TrendFollowing),
            "mean_reversion" => Ok(StrategyType::MeanReversion),
            "momentum" => Ok(StrategyType::Momentum),
            "breakout" => Ok(StrategyType::Breakout),
            "custom" => Ok(StrategyType::Custom),
            _ => anyhow::bail!(
                "Invalid strategy type: {}. Valid: trend_following, mean_reversion, momentum, breakout, custom",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendFollowingParams {
    pub position_size: f64,    // Fraction of equity per position (0.05 = 5%)
    pub leverage: f64,
    pub entry_threshold: f64,  // Minimum signal confidence to enter, 0..1
    pub stop_loss_pct: f64,    // Stop distance from entry (0.03 = 3%)
    pub take_profit_ratio: f64, // Reward:risk multiple
    pub fast_window: usize,
    pub slow_window: usize,
}

impl Default for TrendFollowingParams {
    fn default() -> Self {
        Self {
            position_size: 0.05,
            leverage: 1.0,
            entry_threshold: 0.5,
            stop_loss_pct: 0.03,
            take_profit_ratio: 2.0,
            fast_window: 10,
            slow_window: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReversionParams {
    pub position_size: f64,
    pub leverage: f64,
    pub entry_threshold: f64,
    pub stop_loss_pct: f64,
    pub take_profit_ratio: f64,
    pub lookback_period: usize,
    pub band_width: f64, // Entry band in standard deviations (2.0 = 2 sigma)
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        Self {
            position_size: 0.05,
            leverage: 1.0,
            entry_threshold: 0.5,
            stop_loss_pct: 0.02,
            take_profit_ratio: 1.5,
            lookback_period: 20,
            band_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumParams {
    pub position_size: f64,
    pub leverage: f64,
    pub entry_threshold: f64,
    pub stop_loss_pct: f64,
    pub take_profit_ratio: f64,
    pub momentum_window: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            position_size: 0.05,
            leverage: 1.0,
            entry_threshold: 0.55,
            stop_loss_pct: 0.04,
            take_profit_ratio: 2.5,
            momentum_window: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutParams {
    pub position_size: f64,
    pub leverage: f64,
    pub entry_threshold: f64,
    pub stop_loss_pct: f64,
    pub take_profit_ratio: f64,
    pub channel_period: usize,
    pub volume_multiplier: f64, // Volume surge required to confirm a break
}

impl Default for BreakoutParams {
    fn default() -> Self {
        Self {
            position_size: 0.04,
            leverage: 1.0,
            entry_threshold: 0.6,
            stop_loss_pct: 0.05,
            take_profit_ratio: 3.0,
            channel_period: 20,
            volume_multiplier: 1.5,
        }
    }
}

/// Numeric parameters of a strategy, one fixed struct per strategy family.
///
/// The controller mutates these through the typed accessors below, so a new
/// strategy family is a compile-time-checked addition rather than a new set
/// of dictionary keys. `Custom` remains for genuinely open-ended parameter
/// sets; the accessors fall back to well-known keys there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum StrategyParameters {
    TrendFollowing(TrendFollowingParams),
    MeanReversion(MeanReversionParams),
    Momentum(MomentumParams),
    Breakout(BreakoutParams),
    Custom(HashMap<String, f64>),
}

impl StrategyParameters {
    pub fn strategy_type(&self) -> StrategyType {
        match self {
            StrategyParameters::TrendFollowing(_) => StrategyType::TrendFollowing,
            StrategyParameters::MeanReversion(_) => StrategyType::MeanReversion,
            StrategyParameters::Momentum(_) => StrategyType::Momentum,
            StrategyParameters::Breakout(_) => StrategyType::Breakout,
            StrategyParameters::Custom(_) => StrategyType::Custom,
        }
    }

    pub fn position_size(&self) -> Option<f64> {
        match self {
            StrategyParameters::TrendFollowing(p) => Some(p.position_size),
            StrategyParameters::MeanReversion(p) => Some(p.position_size),
            StrategyParameters::Momentum(p) => Some(p.position_size),
            StrategyParameters::Breakout(p) => Some(p.position_size),
            StrategyParameters::Custom(map) => map.get("position_size").copied(),
        }
    }

    pub fn set_position_size(&mut self, value: f64) {
        match self {
            StrategyParameters::TrendFollowing(p) => p.position_size = value,
            StrategyParameters::MeanReversion(p) => p.position_size = value,
            StrategyParameters::Momentum(p) => p.position_size = value,
            StrategyParameters::Breakout(p) => p.position_size = value,
            StrategyParameters::Custom(map) => {
                // Only retune keys the owner declared; never invent parameters
                if map.contains_key("position_size") {
                    map.insert("position_size".to_string(), value);
                }
            }
        }
    }

    pub fn leverage(&self) -> Option<f64> {
        match self {
            StrategyParameters::TrendFollowing(p) => Some(p.leverage),
            StrategyParameters::MeanReversion(p) => Some(p.leverage),
            StrategyParameters::Momentum(p) => Some(p.leverage),
            StrategyParameters::Breakout(p) => Some(p.leverage),
            StrategyParameters::Custom(map) => map.get("leverage").copied(),
        }
    }

    pub fn set_leverage(&mut self, value: f64) {
        match self {
            StrategyParameters::TrendFollowing(p) => p.leverage = value,
            StrategyParameters::MeanReversion(p) => p.leverage = value,
            StrategyParameters::Momentum(p) => p.leverage = value,
            StrategyParameters::Breakout(p) => p.leverage = value,
            StrategyParameters::Custom(map) => {
                if map.contains_key("leverage") {
                    map.insert("leverage".to_string(), value);
                }
            }
        }
    }

    pub fn entry_threshold(&self) -> Option<f64> {
        match self {
            StrategyParameters::TrendFollowing(p) => Some(p.entry_threshold),
            StrategyParameters::MeanReversion(p) => Some(p.entry_threshold),
            StrategyParameters::Momentum(p) => Some(p.entry_threshold),
            StrategyParameters::Breakout(p) => Some(p.entry_threshold),
            StrategyParameters::Custom(map) => map.get("entry_threshold").copied(),
        }
    }

    pub fn set_entry_threshold(&mut self, value: f64) {
        match self {
            StrategyParameters::TrendFollowing(p) => p.entry_threshold = value,
            StrategyParameters::MeanReversion(p) => p.entry_threshold = value,
            StrategyParameters::Momentum(p) => p.entry_threshold = value,
            StrategyParameters::Breakout(p) => p.entry_threshold = value,
            StrategyParameters::Custom(map) => {
                if map.contains_key("entry_threshold") {
                    map.insert("entry_threshold".to_string(), value);
                }
            }
        }
    }

    pub fn stop_loss_pct(&self) -> Option<f64> {
        match self {
            StrategyParameters::TrendFollowing(p) => Some(p.stop_loss_pct),
            StrategyParameters::MeanReversion(p) => Some(p.stop_loss_pct),
            StrategyParameters::Momentum(p) => Some(p.stop_loss_pct),
            StrategyParameters::Breakout(p) => Some(p.stop_loss_pct),
            StrategyParameters::Custom(map) => map.get("stop_loss_pct").copied(),
        }
    }

    pub fn set_stop_loss_pct(&mut self, value: f64) {
        match self {
            StrategyParameters::TrendFollowing(p) => p.stop_loss_pct = value,
            StrategyParameters::MeanReversion(p) => p.stop_loss_pct = value,
            StrategyParameters::Momentum(p) => p.stop_loss_pct = value,
            StrategyParameters::Breakout(p) => p.stop_loss_pct = value,
            StrategyParameters::Custom(map) => {
                if map.contains_key("stop_loss_pct") {
                    map.insert("stop_loss_pct".to_string(), value);
                }
            }
        }
    }

    /// Re-apply hard risk bounds after any mutation. A breached bound is
    /// silently clamped, never rejected: this is routine enforcement.
    pub fn clamp_to_limits(&mut self, limits: &RiskLimits) {
        if let Some(size) = self.position_size() {
            self.set_position_size(size.clamp(0.0, limits.max_position_size));
        }
        if let Some(lev) = self.leverage() {
            self.set_leverage(lev.clamp(0.0, limits.max_leverage));
        }
        if let Some(threshold) = self.entry_threshold() {
            self.set_entry_threshold(threshold.clamp(0.0, 1.0));
        }
        if let Some(stop) = self.stop_loss_pct() {
            self.set_stop_loss_pct(stop.clamp(0.0, limits.stop_loss_pct));
        }
    }

    /// True when every governed parameter sits inside its bound
    pub fn within_limits(&self, limits: &RiskLimits) -> bool {
        self.position_size().is_none_or(|v| v <= limits.max_position_size)
            && self.leverage().is_none_or(|v| v <= limits.max_leverage)
            && self.stop_loss_pct().is_none_or(|v| v <= limits.stop_loss_pct)
    }
}

/// Hard ceilings and floors a strategy's parameters must never exceed,
/// regardless of adaptation pressure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub max_position_size: f64,   // Fraction of equity (0.1 = 10%)
    pub max_leverage: f64,
    pub stop_loss_pct: f64,       // Widest stop distance allowed
    pub take_profit_ratio: f64,   // Minimum reward:risk
    pub max_daily_loss_pct: f64,
    pub var_limit: f64,           // One-day VaR as fraction of equity
    pub concentration_limit: f64, // Max fraction in a single instrument
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_position_size <= 0.0 || self.max_position_size > 1.0 {
            return Err(format!("Invalid max_position_size: {}", self.max_position_size));
        }
        if self.max_leverage <= 0.0 {
            return Err(format!("Invalid max_leverage: {}", self.max_leverage));
        }
        if self.stop_loss_pct <= 0.0 || self.stop_loss_pct > 1.0 {
            return Err(format!("Invalid stop_loss_pct: {}", self.stop_loss_pct));
        }
        if self.max_daily_loss_pct <= 0.0 || self.max_daily_loss_pct > 0.5 {
            return Err(format!("Invalid max_daily_loss_pct: {}", self.max_daily_loss_pct));
        }
        if self.concentration_limit <= 0.0 || self.concentration_limit > 1.0 {
            return Err(format!("Invalid concentration_limit: {}", self.concentration_limit));
        }
        Ok(())
    }
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: 0.10, // 10% of equity
            max_leverage: 2.0,
            stop_loss_pct: 0.05,
            take_profit_ratio: 1.5,
            max_daily_loss_pct: 0.02, // 2%
            var_limit: 0.05,
            concentration_limit: 0.25,
        }
    }
}

/// Thresholds the controller compares live telemetry against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTargets {
    pub target_return_pct: f64,
    pub max_drawdown_pct: f64, // Tolerated drawdown before the controller reacts
    pub min_sharpe_ratio: f64,
    pub min_win_rate: f64,
    pub max_volatility_pct: f64,
    pub target_profit_factor: f64,
    pub evaluation_period_days: u32,
}

impl Default for PerformanceTargets {
    fn default() -> Self {
        Self {
            target_return_pct: 0.15,
            max_drawdown_pct: 0.10,
            min_sharpe_ratio: 1.0,
            min_win_rate: 0.45,
            max_volatility_pct: 0.25,
            target_profit_factor: 1.5,
            evaluation_period_days: 30,
        }
    }
}

/// Registration request for a new adaptive strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: StrategyParameters,
    #[serde(default)]
    pub targets: PerformanceTargets,
    #[serde(default)]
    pub risk_limits: RiskLimits,
}

/// A registered strategy with its mutable parameter set.
///
/// Exclusively owned by the engine's registry: created at registration,
/// mutated only by the controller, deactivated (never deleted) via status
/// update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveStrategy {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub strategy_type: StrategyType,
    pub base_parameters: StrategyParameters, // Immutable baseline
    pub current_parameters: StrategyParameters,
    pub targets: PerformanceTargets,
    pub risk_limits: RiskLimits,
    pub performance: Option<MarketPerformanceMetrics>,
    pub adaptation_count: u64,
    pub adaptation_history: Vec<Uuid>, // Record ids, oldest first
    pub is_active: bool,
}

impl AdaptiveStrategy {
    /// Build a registry entry from a registration request.
    ///
    /// Assigns a fresh id, copies the baseline into the live parameter set
    /// and clamps it against the declared limits so a strategy never starts
    /// life outside its own bounds.
    pub fn from_spec(spec: StrategySpec) -> Result<Self, EngineError> {
        if spec.name.trim().is_empty() {
            return Err(EngineError::InvalidStrategy {
                reason: "name must not be empty".to_string(),
            });
        }
        if let Err(reason) = spec.risk_limits.validate() {
            return Err(EngineError::InvalidStrategy { reason });
        }

        let strategy_type = spec.parameters.strategy_type();
        let mut current_parameters = spec.parameters.clone();
        current_parameters.clamp_to_limits(&spec.risk_limits);

        Ok(Self {
            id: Uuid::new_v4(),
            name: spec.name,
            description: spec.description,
            strategy_type,
            base_parameters: spec.parameters,
            current_parameters,
            targets: spec.targets,
            risk_limits: spec.risk_limits,
            performance: None,
            adaptation_count: 0,
            adaptation_history: Vec::new(),
            is_active: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_spec_defaults() {
        let spec = StrategySpec {
            name: "btc-trend".to_string(),
            description: String::new(),
            parameters: StrategyParameters::TrendFollowing(TrendFollowingParams::default()),
            targets: PerformanceTargets::default(),
            risk_limits: RiskLimits::default(),
        };

        let strategy = AdaptiveStrategy::from_spec(spec).unwrap();
        assert!(strategy.is_active);
        assert_eq!(strategy.adaptation_count, 0);
        assert_eq!(strategy.strategy_type, StrategyType::TrendFollowing);
        assert_eq!(strategy.base_parameters, strategy.current_parameters);
    }

    #[test]
    fn test_from_spec_rejects_empty_name() {
        let spec = StrategySpec {
            name: "   ".to_string(),
            description: String::new(),
            parameters: StrategyParameters::Momentum(MomentumParams::default()),
            targets: PerformanceTargets::default(),
            risk_limits: RiskLimits::default(),
        };
        assert!(AdaptiveStrategy::from_spec(spec).is_err());
    }

    #[test]
    fn test_from_spec_rejects_bad_limits() {
        let spec = StrategySpec {
            name: "broken".to_string(),
            description: String::new(),
            parameters: StrategyParameters::Momentum(MomentumParams::default()),
            targets: PerformanceTargets::default(),
            risk_limits: RiskLimits {
                max_position_size: 0.0, // Invalid
                ..RiskLimits::default()
            },
        };
        assert!(AdaptiveStrategy::from_spec(spec).is_err());
    }

    #[test]
    fn test_registration_clamps_oversized_baseline() {
        let spec = StrategySpec {
            name: "oversized".to_string(),
            description: String::new(),
            parameters: StrategyParameters::TrendFollowing(TrendFollowingParams {
                position_size: 0.50, // Above the 10% cap below
                ..TrendFollowingParams::default()
            }),
            targets: PerformanceTargets::default(),
            risk_limits: RiskLimits::default(),
        };

        let strategy = AdaptiveStrategy::from_spec(spec).unwrap();
        assert_eq!(strategy.current_parameters.position_size(), Some(0.10));
        // Baseline keeps the requested value for later reference
        assert_eq!(strategy.base_parameters.position_size(), Some(0.50));
    }

    #[test]
    fn test_clamp_to_limits_bounds_every_governed_field() {
        let limits = RiskLimits::default();
        let mut params = StrategyParameters::Breakout(BreakoutParams {
            position_size: 0.9,
            leverage: 10.0,
            entry_threshold: 1.7,
            stop_loss_pct: 0.5,
            ..BreakoutParams::default()
        });

        params.clamp_to_limits(&limits);
        assert!(params.within_limits(&limits));
        assert_eq!(params.position_size(), Some(limits.max_position_size));
        assert_eq!(params.leverage(), Some(limits.max_leverage));
        assert_eq!(params.entry_threshold(), Some(1.0));
        assert_eq!(params.stop_loss_pct(), Some(limits.stop_loss_pct));
    }

    #[test]
    fn test_custom_parameters_only_touch_declared_keys() {
        let mut map = HashMap::new();
        map.insert("position_size".to_string(), 0.2);
        let mut params = StrategyParameters::Custom(map);

        params.set_stop_loss_pct(0.01); // Not declared, must not appear
        params.set_position_size(0.08);

        assert_eq!(params.stop_loss_pct(), None);
        assert_eq!(params.position_size(), Some(0.08));
    }

    #[test]
    fn test_parameters_serde_tagging() {
        let params = StrategyParameters::MeanReversion(MeanReversionParams::default());
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["type"], "mean_reversion");
        assert!(json["params"]["band_width"].is_number());

        let back: StrategyParameters = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
