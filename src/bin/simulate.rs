//! Drive the adaptation engine over a synthetic feed: a trending phase,
//! a ranging phase, and a volatile phase, with a mid-run performance report
//! pushed in to demonstrate risk reduction.

use adaptrade::application::engine::AdaptationEngine;
use adaptrade::config::EngineConfig;
use adaptrade::domain::market::MarketSnapshot;
use adaptrade::domain::metrics::MarketPerformanceMetrics;
use adaptrade::domain::pattern::PatternFilter;
use adaptrade::domain::strategy::{
    MeanReversionParams, PerformanceTargets, RiskLimits, StrategyParameters, StrategySpec,
    TrendFollowingParams,
};
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "simulate",
    about = "Run the market pattern adaptation engine over synthetic phases"
)]
struct Args {
    /// Bars generated per market phase
    #[arg(long, default_value_t = 120)]
    steps: usize,

    /// RNG seed for reproducible runs
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Symbol label stamped on generated snapshots
    #[arg(long, default_value = "SIM/USD")]
    symbol: String,

    /// Rolling window width handed to the classifier
    #[arg(long, default_value_t = 40)]
    window: usize,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Trending,
    Ranging,
    Volatile,
}

fn generate_phase(rng: &mut StdRng, phase: Phase, start_price: f64, steps: usize) -> Vec<f64> {
    let mut prices = Vec::with_capacity(steps);
    let mut price = start_price;
    for i in 0..steps {
        price = match phase {
            Phase::Trending => price * (1.0 + 0.004 + rng.random_range(-0.001..0.001)),
            Phase::Ranging => {
                start_price + (i as f64 * 0.6).sin() * start_price * 0.008
                    + rng.random_range(-0.2..0.2)
            }
            Phase::Volatile => price * (1.0 + rng.random_range(-0.05..0.05)),
        };
        prices.push(price.max(0.01));
    }
    prices
}

fn snapshot_for_window(symbol: &str, prices: &[f64], volumes: &[f64], start_ts: i64) -> MarketSnapshot {
    MarketSnapshot::new(
        symbol,
        prices
            .iter()
            .map(|p| Decimal::from_f64(*p).unwrap_or_default())
            .collect(),
        volumes.to_vec(),
        (0..prices.len() as i64).map(|i| start_ts + i * 60).collect(),
    )
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_env()?;
    let engine = AdaptationEngine::new(config);

    let trend_id = engine.add_adaptive_strategy(StrategySpec {
        name: "sim-trend-follower".to_string(),
        description: "Trend follower driven by classified trends".to_string(),
        parameters: StrategyParameters::TrendFollowing(TrendFollowingParams::default()),
        targets: PerformanceTargets::default(),
        risk_limits: RiskLimits::default(),
    })?;
    let reversion_id = engine.add_adaptive_strategy(StrategySpec {
        name: "sim-mean-reverter".to_string(),
        description: "Mean reverter driven by range classifications".to_string(),
        parameters: StrategyParameters::MeanReversion(MeanReversionParams::default()),
        targets: PerformanceTargets::default(),
        risk_limits: RiskLimits::default(),
    })?;
    info!(%trend_id, %reversion_id, "strategies registered");

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut prices = Vec::new();
    for phase in [Phase::Trending, Phase::Ranging, Phase::Volatile] {
        let start = prices.last().copied().unwrap_or(100.0);
        let segment = generate_phase(&mut rng, phase, start, args.steps);
        info!(?phase, bars = segment.len(), "generated market phase");
        prices.extend(segment);
    }
    let volumes: Vec<f64> = prices
        .iter()
        .map(|_| 1000.0 + rng.random_range(-200.0..200.0))
        .collect();

    let base_ts = 1_700_000_000i64;
    let mut total_patterns = 0usize;
    for end in (args.window..=prices.len()).step_by(5) {
        let window_start = end - args.window;
        let snapshot = snapshot_for_window(
            &args.symbol,
            &prices[window_start..end],
            &volumes[window_start..end],
            base_ts + window_start as i64 * 60,
        );
        total_patterns += engine.process_snapshot(&snapshot).len();

        // One poor performance report midway, to show the risk-reduction path
        if end == args.window + args.steps {
            engine.set_performance_metrics(
                reversion_id,
                MarketPerformanceMetrics {
                    sharpe_ratio: 0.3,
                    max_drawdown_pct: 0.12,
                    win_rate: 0.38,
                    ..MarketPerformanceMetrics::flat(Utc::now())
                },
            )?;
            info!("pushed underperforming report for the mean reverter");
        }
    }

    let history = engine.get_adaptation_history(0);
    info!(
        total_patterns,
        cached_patterns = engine.get_detected_patterns(&PatternFilter::default()).len(),
        adaptations = history.len(),
        "simulation finished"
    );
    for strategy in engine.get_adaptive_strategies() {
        info!(
            name = %strategy.name,
            adaptations = strategy.adaptation_count,
            position_size = ?strategy.current_parameters.position_size(),
            "final strategy state"
        );
    }
    for record in history.iter().take(5) {
        info!(kind = %record.adaptation_type, reason = %record.trigger_reason, "recent adaptation");
    }

    Ok(())
}
