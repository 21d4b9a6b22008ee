// Adaptation event log domain
pub mod adaptation;

// Domain-specific error types
pub mod errors;

// Market data snapshots
pub mod market;

// Externally supplied performance telemetry
pub mod metrics;

// Detected market patterns
pub mod pattern;

// Adaptive strategy registry types
pub mod strategy;
