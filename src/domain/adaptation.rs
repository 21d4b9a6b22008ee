use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Category of a recorded parameter adaptation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationType {
    ParameterTune,
    RiskReduction,
    Reinforcement,
}

impl fmt::Display for AdaptationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptationType::ParameterTune => write!(f, "parameter_tune"),
            AdaptationType::RiskReduction => write!(f, "risk_reduction"),
            AdaptationType::Reinforcement => write!(f, "reinforcement"),
        }
    }
}

/// Immutable audit entry describing one accepted adaptation and its trigger.
///
/// Append-only: once written it is never mutated or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationRecord {
    pub id: Uuid,
    pub adaptation_type: AdaptationType,
    pub strategy_id: Uuid,
    pub description: String,
    pub trigger_reason: String, // e.g. "pattern_aligned: trend/up confidence=0.85"
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl AdaptationRecord {
    pub fn new(
        adaptation_type: AdaptationType,
        strategy_id: Uuid,
        description: String,
        trigger_reason: String,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            adaptation_type,
            strategy_id,
            description,
            trigger_reason,
            confidence: confidence.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }
}
