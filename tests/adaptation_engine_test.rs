use adaptrade::application::engine::AdaptationEngine;
use adaptrade::domain::adaptation::AdaptationType;
use adaptrade::domain::errors::EngineError;
use adaptrade::domain::market::MarketSnapshot;
use adaptrade::domain::metrics::MarketPerformanceMetrics;
use adaptrade::domain::pattern::{
    DetectedPattern, Direction, ExpectedOutcome, MarketContext, PatternFilter, PatternType,
};
use adaptrade::domain::strategy::{
    MeanReversionParams, PerformanceTargets, RiskLimits, StrategyParameters, StrategySpec,
    TrendFollowingParams,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use uuid::Uuid;

// --- Helpers ---

fn trend_spec(name: &str) -> StrategySpec {
    StrategySpec {
        name: name.to_string(),
        description: "test trend follower".to_string(),
        parameters: StrategyParameters::TrendFollowing(TrendFollowingParams {
            position_size: 0.05,
            ..TrendFollowingParams::default()
        }),
        targets: PerformanceTargets {
            min_sharpe_ratio: 1.0,
            ..PerformanceTargets::default()
        },
        risk_limits: RiskLimits {
            max_position_size: 0.1,
            ..RiskLimits::default()
        },
    }
}

fn reversion_spec(name: &str) -> StrategySpec {
    StrategySpec {
        name: name.to_string(),
        description: "test mean reverter".to_string(),
        parameters: StrategyParameters::MeanReversion(MeanReversionParams::default()),
        targets: PerformanceTargets::default(),
        risk_limits: RiskLimits::default(),
    }
}

fn trend_up_pattern(confidence: f64) -> DetectedPattern {
    DetectedPattern {
        pattern_type: PatternType::Trend,
        name: "uptrend".to_string(),
        confidence,
        strength: 0.8,
        expected_outcome: ExpectedOutcome {
            direction: Direction::Up,
            magnitude: 0.04,
            probability: confidence,
            time_horizon_secs: 3600,
        },
        context: MarketContext::default(),
        detected_at: Utc::now(),
    }
}

fn rising_snapshot(points: usize) -> MarketSnapshot {
    MarketSnapshot::new(
        "BTC/USD",
        (0..points)
            .map(|i| Decimal::from_f64(100.0 + i as f64).unwrap())
            .collect(),
        vec![1500.0; points],
        (0..points as i64).map(|i| i * 60).collect(),
    )
}

// --- Scenarios ---

#[test]
fn test_adapt_with_no_patterns_and_no_metrics_is_noop() {
    let engine = AdaptationEngine::default();
    let id = engine.add_adaptive_strategy(trend_spec("idle")).unwrap();
    let before = engine.get_strategy(id).unwrap();

    let accepted = engine.adapt_strategies(&[]);
    let accepted_again = engine.adapt_strategies(&[]);

    assert!(accepted.is_empty());
    assert!(accepted_again.is_empty());
    let after = engine.get_strategy(id).unwrap();
    assert_eq!(after.adaptation_count, before.adaptation_count);
    assert_eq!(after.current_parameters, before.current_parameters);
    assert!(after.adaptation_history.is_empty());
    assert!(engine.get_adaptation_history(0).is_empty());
}

#[test]
fn test_aligned_trend_pattern_grows_position_size() {
    let engine = AdaptationEngine::default();
    let id = engine.add_adaptive_strategy(trend_spec("growth")).unwrap();

    let accepted = engine.adapt_strategies(&[trend_up_pattern(0.85)]);

    assert_eq!(accepted.len(), 1);
    let strategy = engine.get_strategy(id).unwrap();
    let size = strategy.current_parameters.position_size().unwrap();
    assert!(size > 0.05, "position size must grow, got {}", size);
    assert!(size <= 0.1, "growth must respect max_position_size, got {}", size);
    assert_eq!(strategy.adaptation_count, 1);
    assert_eq!(strategy.adaptation_history.len(), 1);

    let records = engine.get_adaptation_history(0);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].adaptation_type, AdaptationType::Reinforcement);
    assert!(
        records[0].trigger_reason.contains("pattern_aligned"),
        "reason should mention alignment, got '{}'",
        records[0].trigger_reason
    );
    assert_eq!(records[0].id, strategy.adaptation_history[0]);
}

#[test]
fn test_sharpe_breach_triggers_risk_reduction_without_patterns() {
    let engine = AdaptationEngine::default();
    let id = engine.add_adaptive_strategy(trend_spec("struggling")).unwrap();
    engine
        .set_performance_metrics(
            id,
            MarketPerformanceMetrics {
                sharpe_ratio: 0.4,
                ..MarketPerformanceMetrics::flat(Utc::now())
            },
        )
        .unwrap();

    let accepted = engine.adapt_strategies(&[]);

    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].adaptation_type, AdaptationType::RiskReduction);
    assert!(accepted[0].trigger_reason.contains("sharpe_below_target"));
    let strategy = engine.get_strategy(id).unwrap();
    assert!(strategy.current_parameters.position_size().unwrap() < 0.05);
}

#[test]
fn test_metrics_push_for_unknown_id_changes_nothing() {
    let engine = AdaptationEngine::default();
    let id = engine.add_adaptive_strategy(trend_spec("bystander")).unwrap();

    let missing = Uuid::new_v4();
    let err = engine
        .set_performance_metrics(missing, MarketPerformanceMetrics::flat(Utc::now()))
        .unwrap_err();

    assert!(matches!(err, EngineError::StrategyNotFound { id } if id == missing));
    let strategy = engine.get_strategy(id).unwrap();
    assert!(strategy.performance.is_none());
    assert_eq!(strategy.adaptation_count, 0);
}

#[test]
fn test_history_is_reverse_chronological_with_limits() {
    let engine = AdaptationEngine::default();
    engine.add_adaptive_strategy(trend_spec("busy")).unwrap();

    for confidence in [0.7, 0.8, 0.9] {
        let accepted = engine.adapt_strategies(&[trend_up_pattern(confidence)]);
        assert_eq!(accepted.len(), 1);
    }

    let all = engine.get_adaptation_history(0);
    assert_eq!(all.len(), 3);
    // Newest first: the 0.9-confidence run was the last one
    assert!(all[0].trigger_reason.contains("0.90"));
    assert!(all[2].trigger_reason.contains("0.70"));
    for pair in all.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }

    assert_eq!(engine.get_adaptation_history(2).len(), 2);
    assert_eq!(engine.get_adaptation_history(10).len(), 3);
}

#[test]
fn test_process_snapshot_classifies_caches_and_adapts() {
    let engine = AdaptationEngine::default();
    let trend_id = engine.add_adaptive_strategy(trend_spec("follower")).unwrap();
    let reversion_id = engine
        .add_adaptive_strategy(reversion_spec("reverter"))
        .unwrap();

    let patterns = engine.process_snapshot(&rising_snapshot(30));

    assert!(!patterns.is_empty());
    assert_eq!(patterns[0].pattern_type, PatternType::Trend);
    assert_eq!(patterns[0].direction(), Direction::Up);

    // Pattern cache serves the classified trend back out
    let cached = engine.get_detected_patterns(&PatternFilter {
        pattern_type: Some(PatternType::Trend),
        ..Default::default()
    });
    assert!(!cached.is_empty());

    // The aligned trend follower adapted; the mean reverter did not
    let follower = engine.get_strategy(trend_id).unwrap();
    assert_eq!(follower.adaptation_count, 1);
    let reverter = engine.get_strategy(reversion_id).unwrap();
    assert_eq!(reverter.adaptation_count, 0);
}

#[test]
fn test_malformed_snapshot_yields_no_patterns_and_no_adaptation() {
    let engine = AdaptationEngine::default();
    engine.add_adaptive_strategy(trend_spec("untouched")).unwrap();

    let mut snapshot = rising_snapshot(10);
    snapshot.timestamps.pop(); // Length mismatch

    let patterns = engine.process_snapshot(&snapshot);
    assert!(patterns.is_empty());
    assert!(engine.get_adaptation_history(0).is_empty());
}

#[test]
fn test_parameters_stay_within_limits_under_sustained_pressure() {
    let engine = AdaptationEngine::default();
    let id = engine.add_adaptive_strategy(trend_spec("pressured")).unwrap();

    // Keep reinforcing: growth must saturate at the cap, never exceed it
    for _ in 0..50 {
        engine.adapt_strategies(&[trend_up_pattern(0.9)]);
        let strategy = engine.get_strategy(id).unwrap();
        assert!(
            strategy
                .current_parameters
                .within_limits(&strategy.risk_limits),
            "parameters escaped risk limits"
        );
    }
    let strategy = engine.get_strategy(id).unwrap();
    assert_eq!(
        strategy.current_parameters.position_size().unwrap(),
        strategy.risk_limits.max_position_size
    );

    // Now sustained underperformance: shrink, still bounded
    engine
        .set_performance_metrics(
            id,
            MarketPerformanceMetrics {
                sharpe_ratio: -0.5,
                ..MarketPerformanceMetrics::flat(Utc::now())
            },
        )
        .unwrap();
    for _ in 0..50 {
        engine.adapt_strategies(&[]);
        let strategy = engine.get_strategy(id).unwrap();
        assert!(strategy
            .current_parameters
            .within_limits(&strategy.risk_limits));
        assert!(strategy.current_parameters.position_size().unwrap() >= 0.0);
    }
}

#[test]
fn test_deactivated_strategy_is_left_alone() {
    let engine = AdaptationEngine::default();
    let id = engine.add_adaptive_strategy(trend_spec("paused")).unwrap();

    engine.update_strategy_status(id, false).unwrap();
    assert!(engine.adapt_strategies(&[trend_up_pattern(0.9)]).is_empty());
    assert_eq!(engine.get_strategy(id).unwrap().adaptation_count, 0);

    engine.update_strategy_status(id, true).unwrap();
    assert_eq!(engine.adapt_strategies(&[trend_up_pattern(0.9)]).len(), 1);
}

#[test]
fn test_one_strategy_fault_does_not_block_the_rest() {
    let engine = AdaptationEngine::default();

    // A custom strategy with a poisoned parameter value
    let mut map = std::collections::HashMap::new();
    map.insert("position_size".to_string(), f64::NAN);
    let broken_id = engine
        .add_adaptive_strategy(StrategySpec {
            name: "broken".to_string(),
            description: String::new(),
            parameters: StrategyParameters::Custom(map),
            targets: PerformanceTargets::default(),
            risk_limits: RiskLimits::default(),
        })
        .unwrap();
    engine
        .set_performance_metrics(
            broken_id,
            MarketPerformanceMetrics {
                sharpe_ratio: 0.1,
                ..MarketPerformanceMetrics::flat(Utc::now())
            },
        )
        .unwrap();

    let healthy_id = engine.add_adaptive_strategy(trend_spec("healthy")).unwrap();

    let accepted = engine.adapt_strategies(&[trend_up_pattern(0.9)]);

    // Both strategies processed: the broken one records its fallback, the
    // healthy one reinforces normally
    assert_eq!(accepted.len(), 2);
    assert!(accepted
        .iter()
        .any(|r| r.strategy_id == broken_id && r.trigger_reason.contains("non-finite")));
    assert!(accepted
        .iter()
        .any(|r| r.strategy_id == healthy_id
            && r.adaptation_type == AdaptationType::Reinforcement));
}
