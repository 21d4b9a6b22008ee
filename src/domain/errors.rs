use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the adaptation engine.
///
/// The taxonomy is deliberately narrow: malformed market input is not an
/// error (classification degrades to an empty result), and numeric faults
/// inside a clamp computation never propagate past the controller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Strategy not found: {id}")]
    StrategyNotFound { id: Uuid },

    #[error("Invalid strategy registration: {reason}")]
    InvalidStrategy { reason: String },

    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },
}
