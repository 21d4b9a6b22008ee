// Append-only adaptation log and pattern cache
pub mod audit;

// Statistical pattern classification
pub mod classifier;

// Adaptation decision logic
pub mod controller;

// Engine facade owning the locked registry
pub mod engine;
