use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Classified shape of a price/volume window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Trend,
    MeanReversion,
    VolatilitySpike,
    Range,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::Trend => write!(f, "trend"),
            PatternType::MeanReversion => write!(f, "mean_reversion"),
            PatternType::VolatilitySpike => write!(f, "volatility_spike"),
            PatternType::Range => write!(f, "range"),
        }
    }
}

impl std::str::FromStr for PatternType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trend" => Ok(PatternType::Trend),
            "mean_reversion" => Ok(PatternType::MeanReversion),
            "volatility_spike" => Ok(PatternType::VolatilitySpike),
            "range" => Ok(PatternType::Range),
            _ => anyhow::bail!(
                "Invalid pattern type: {}. Valid: trend, mean_reversion, volatility_spike, range",
                s
            ),
        }
    }
}

/// Projected price direction over the pattern's horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Sideways,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Sideways => write!(f, "sideways"),
        }
    }
}

/// Projection attached to a detected pattern. Derived, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    pub direction: Direction,
    pub magnitude: f64, // Fractional price move (0.05 = 5%)
    pub probability: f64,
    pub time_horizon_secs: i64,
}

/// Indicator bag that produced a pattern, carried verbatim for explainability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketContext {
    pub indicators: HashMap<String, f64>,
    pub chart_analysis: Option<String>,
}

/// One classified pattern emitted by the classifier. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub pattern_type: PatternType,
    pub name: String,
    pub confidence: f64, // 0.0 to 1.0
    pub strength: f64,   // 0.0 to 1.0
    pub expected_outcome: ExpectedOutcome,
    pub context: MarketContext,
    pub detected_at: DateTime<Utc>,
}

impl DetectedPattern {
    pub fn direction(&self) -> Direction {
        self.expected_outcome.direction
    }
}

/// Criteria for querying the recent pattern cache. Empty filter matches all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternFilter {
    pub pattern_type: Option<PatternType>,
    pub direction: Option<Direction>,
    pub min_confidence: Option<f64>,
    pub since: Option<DateTime<Utc>>,
}

impl PatternFilter {
    pub fn matches(&self, pattern: &DetectedPattern) -> bool {
        if let Some(pt) = self.pattern_type {
            if pattern.pattern_type != pt {
                return false;
            }
        }
        if let Some(dir) = self.direction {
            if pattern.direction() != dir {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if pattern.confidence < min {
                return false;
            }
        }
        if let Some(since) = self.since {
            if pattern.detected_at < since {
                return false;
            }
        }
        true
    }
}
