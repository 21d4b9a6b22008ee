//! Engine facade: one explicitly constructed instance owning the strategy
//! registry and the audit store behind a single coarse-grained lock.
//!
//! Classification is pure and runs outside the lock; only registry and log
//! mutation is taken under it. Lifecycle is tied to the owning service —
//! constructed at start, no teardown (the engine holds no external
//! resources).

use crate::application::audit::AuditStore;
use crate::application::classifier::PatternClassifier;
use crate::application::controller::AdaptationController;
use crate::config::EngineConfig;
use crate::domain::adaptation::AdaptationRecord;
use crate::domain::errors::EngineError;
use crate::domain::market::MarketSnapshot;
use crate::domain::metrics::MarketPerformanceMetrics;
use crate::domain::pattern::{DetectedPattern, PatternFilter};
use crate::domain::strategy::{AdaptiveStrategy, StrategySpec};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

struct EngineState {
    strategies: Vec<AdaptiveStrategy>, // Registration order, iterated in order
    audit: AuditStore,
}

pub struct AdaptationEngine {
    classifier: PatternClassifier,
    controller: AdaptationController,
    state: Mutex<EngineState>,
}

impl std::fmt::Debug for AdaptationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptationEngine")
            .field("state", &"<Mutex>")
            .finish()
    }
}

impl AdaptationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            classifier: PatternClassifier::new(config.classifier),
            controller: AdaptationController::new(config.adaptation),
            state: Mutex::new(EngineState {
                strategies: Vec::new(),
                audit: AuditStore::new(config.pattern_cache_cap),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("engine state lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Register a strategy: assigns a fresh id, copies the baseline into the
    /// live parameters and activates it
    pub fn add_adaptive_strategy(&self, spec: StrategySpec) -> Result<Uuid, EngineError> {
        let strategy = AdaptiveStrategy::from_spec(spec)?;
        let id = strategy.id;
        tracing::info!(strategy = %strategy.name, %id, strategy_type = %strategy.strategy_type, "strategy registered");
        self.lock_state().strategies.push(strategy);
        Ok(id)
    }

    /// Classify a snapshot, cache the detected patterns, and run one
    /// adaptation pass. This is the call the market-data feed loop makes.
    pub fn process_snapshot(&self, snapshot: &MarketSnapshot) -> Vec<DetectedPattern> {
        // Pure classification over caller-supplied data, outside the lock
        let patterns = self.classifier.detect(snapshot);
        tracing::debug!(symbol = %snapshot.symbol, patterns = patterns.len(), "snapshot classified");

        let mut state = self.lock_state();
        state.audit.record_patterns(&patterns);
        Self::adapt_locked(&mut state, &self.controller, &patterns);

        patterns
    }

    /// Run one adaptation pass over every registered strategy with
    /// externally supplied patterns. Returns the records accepted this call.
    pub fn adapt_strategies(&self, patterns: &[DetectedPattern]) -> Vec<AdaptationRecord> {
        let mut state = self.lock_state();
        Self::adapt_locked(&mut state, &self.controller, patterns)
    }

    fn adapt_locked(
        state: &mut EngineState,
        controller: &AdaptationController,
        patterns: &[DetectedPattern],
    ) -> Vec<AdaptationRecord> {
        let EngineState { strategies, audit } = state;
        let mut accepted = Vec::new();
        for strategy in strategies.iter_mut() {
            // One strategy's outcome never aborts the rest of the pass
            if let Some(record) = controller.adapt(strategy, patterns) {
                tracing::info!(
                    strategy = %strategy.name,
                    kind = %record.adaptation_type,
                    reason = %record.trigger_reason,
                    "adaptation accepted"
                );
                audit.append(record.clone());
                accepted.push(record);
            }
        }
        accepted
    }

    /// Push an externally computed performance report for one strategy
    pub fn set_performance_metrics(
        &self,
        id: Uuid,
        metrics: MarketPerformanceMetrics,
    ) -> Result<(), EngineError> {
        let mut state = self.lock_state();
        match state.strategies.iter_mut().find(|s| s.id == id) {
            Some(strategy) => {
                strategy.performance = Some(metrics);
                Ok(())
            }
            None => Err(EngineError::StrategyNotFound { id }),
        }
    }

    /// Activate or deactivate a strategy. Deactivation is the only removal
    /// semantics the engine has; registry entries are never deleted.
    pub fn update_strategy_status(&self, id: Uuid, active: bool) -> Result<(), EngineError> {
        let mut state = self.lock_state();
        match state.strategies.iter_mut().find(|s| s.id == id) {
            Some(strategy) => {
                if strategy.is_active != active {
                    tracing::info!(strategy = %strategy.name, active, "strategy status changed");
                }
                strategy.is_active = active;
                Ok(())
            }
            None => Err(EngineError::StrategyNotFound { id }),
        }
    }

    pub fn get_adaptive_strategies(&self) -> Vec<AdaptiveStrategy> {
        self.lock_state().strategies.clone()
    }

    pub fn get_strategy(&self, id: Uuid) -> Option<AdaptiveStrategy> {
        self.lock_state()
            .strategies
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn get_detected_patterns(&self, filter: &PatternFilter) -> Vec<DetectedPattern> {
        self.lock_state().audit.patterns_matching(filter)
    }

    /// Most-recent-first adaptation log; `limit == 0` returns everything
    pub fn get_adaptation_history(&self, limit: usize) -> Vec<AdaptationRecord> {
        self.lock_state().audit.history(limit)
    }
}

impl Default for AdaptationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
