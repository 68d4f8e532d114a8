//! End-to-end hedging simulations: surface fitting, hedging and attribution

use approx::assert_relative_eq;
use chrono::NaiveDate;

use delta_hedge::prelude::*;
use delta_hedge::strategies::{self, CondorStrikes};

fn synthetic(days: usize) -> Vec<MarketSnapshot> {
    let config = SyntheticConfig {
        days,
        initial_spot: 100.0,
        annual_vol: 0.3,
        ..SyntheticConfig::default()
    };
    generate_market(&config).unwrap()
}

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(n)
}

fn flat_engine(position: Position, vol: f64, config: HedgeConfig) -> HedgingEngine {
    HedgingEngine::new(position, SurfaceSource::fixed(FlatSurface::new(vol).unwrap()), config).unwrap()
}

#[test]
fn identical_inputs_give_identical_steps() {
    let market = synthetic(15);
    let position = strategies::long_straddle("SYN", 100.0, day(45), 2.0).unwrap();

    let run_once = || {
        let fitter = SurfaceFitter::new(FitterConfig::svi().with_parallel(true));
        let engine = HedgingEngine::new(position.clone(), SurfaceSource::refit(fitter), HedgeConfig::default()).unwrap();
        engine.run(&market).unwrap()
    };

    let (first, second) = (run_once(), run_once());
    for step in &first.steps {
        let report = step.fit_report.as_ref().unwrap();
        assert!(!report.has_fallback(), "{}: {:?}", step.date, report.fallbacks().collect::<Vec<_>>());
    }
    assert_eq!(
        serde_json::to_string(&first.steps).unwrap(),
        serde_json::to_string(&second.steps).unwrap()
    );
}

#[test]
fn attribution_closes_on_every_step() {
    let market = synthetic(20);
    let position = strategies::short_straddle("SYN", 100.0, day(60), 1.0).unwrap();
    let fitter = SurfaceFitter::default();
    let (source, _) = SurfaceSource::fit_once(&fitter, &market[0]).unwrap();

    let run = HedgingEngine::new(position, source, HedgeConfig::default())
        .unwrap()
        .run(&market)
        .unwrap();
    let attribution = run.attribution().unwrap();

    assert_eq!(attribution.steps.len(), market.len() - 1);
    for (record, step) in attribution.steps.iter().zip(run.steps[1..].iter()) {
        let sum = record.delta_pnl + record.gamma_pnl + record.theta_pnl + record.vega_pnl + record.residual;
        assert_relative_eq!(sum, step.gross_pnl, epsilon = 1e-9);
        assert_relative_eq!(record.gross_pnl - record.transaction_cost, step.step_pnl, epsilon = 1e-12);
    }

    // Static surface queried at shrinking tau still moves leg vols
    assert!(attribution.steps.iter().any(|s| s.vega_pnl != 0.0));

    assert_eq!(attribution.total_pnl, run.total_pnl());
    assert_relative_eq!(attribution.total_cost, run.total_cost());
    assert_relative_eq!(
        attribution.totals.gross_pnl - attribution.total_cost,
        attribution.total_pnl,
        epsilon = 1e-8
    );
}

#[test]
fn flat_spot_path_accrues_only_theta() {
    let snapshots: Vec<MarketSnapshot> = (0..10).map(|i| MarketSnapshot::new(day(i), 100.0, 0.0)).collect();
    let call = OptionContract::new("SYN", 100.0, day(60), OptionType::Call);
    let position = Position::single(call, 1.0).unwrap();
    let config = HedgeConfig {
        delta_band: 1.0,
        ..HedgeConfig::default()
    };

    let run = flat_engine(position, 0.2, config).run(&snapshots).unwrap();
    assert!(run.steps[0].rebalanced());
    for step in &run.steps[1..] {
        assert_eq!(step.transaction_cost, 0.0);
    }
    assert_eq!(run.total_cost(), run.steps[0].transaction_cost);

    let attribution = run.attribution().unwrap();
    for record in &attribution.steps {
        assert_eq!(record.delta_pnl, 0.0);
        assert_eq!(record.gamma_pnl, 0.0);
        assert_eq!(record.vega_pnl, 0.0);
        assert!(record.theta_pnl < 0.0);
        assert!(record.residual.abs() <= 0.01 * record.theta_pnl.abs());
    }
}

#[test]
fn daily_hedging_lowers_step_pnl_variance() {
    let call = OptionContract::new("SYN", 100.0, day(90), OptionType::Call);
    let position = Position::single(call, 1.0).unwrap();

    for seed in [1, 7, 42, 99, 2024] {
        let market = generate_market(&SyntheticConfig {
            days: 40,
            initial_spot: 100.0,
            annual_vol: 0.3,
            seed,
            ..SyntheticConfig::default()
        })
        .unwrap();

        let hedged = flat_engine(position.clone(), 0.3, HedgeConfig::frictionless())
            .run(&market)
            .unwrap()
            .summary();
        let initial_only = flat_engine(position.clone(), 0.3, HedgeConfig::unhedged().with_cost_rate(0.0))
            .run(&market)
            .unwrap()
            .summary();

        assert_eq!(initial_only.rebalances, 1);
        assert!(
            hedged.std_step_pnl < initial_only.std_step_pnl,
            "seed {}: hedged sd {} vs initial hedge only sd {}",
            seed,
            hedged.std_step_pnl,
            initial_only.std_step_pnl
        );
    }
}

#[test]
fn residual_grows_with_spot_move() {
    let call = OptionContract::new("SYN", 100.0, day(60), OptionType::Call);
    let position = Position::single(call, 1.0).unwrap();
    let engine = flat_engine(position, 0.2, HedgeConfig::frictionless());

    let residual_for = |mv: f64| {
        let snapshots = vec![MarketSnapshot::new(day(0), 100.0, 0.0), MarketSnapshot::new(day(1), 100.0 + mv, 0.0)];
        let attribution = engine.run(&snapshots).unwrap().attribution().unwrap();
        attribution.steps[0].residual.abs()
    };

    let small = residual_for(2.0);
    let medium = residual_for(8.0);
    let large = residual_for(32.0);
    assert!(small < medium, "{} vs {}", small, medium);
    assert!(medium < large, "{} vs {}", medium, large);
}

#[test]
fn expired_leg_stops_simulation_with_partial_history() {
    let market = synthetic(12);
    let position = strategies::long_call("SYN", 100.0, day(7), 1.0).unwrap();
    let fitter = SurfaceFitter::default();
    let (source, _) = SurfaceSource::fit_once(&fitter, &market[0]).unwrap();

    let failure = HedgingEngine::new(position, source, HedgeConfig::default())
        .unwrap()
        .run(&market)
        .unwrap_err();

    // Days 0..=7 are simulated, day 8 is past expiry
    assert_eq!(failure.steps.len(), 8);
    assert_eq!(failure.steps[7].legs[0].tau, 0.0);
    assert!(matches!(failure.error, HedgeError::ExpiredOption { .. }));
}

#[test]
fn static_and_refit_surfaces_share_the_engine_interface() {
    let market = synthetic(10);
    let position = strategies::bull_call_spread("SYN", 100.0, 105.0, day(45), 1.0).unwrap();
    let fitter = SurfaceFitter::new(FitterConfig::svi());

    let (fixed, report) = SurfaceSource::fit_once(&fitter, &market[0]).unwrap();
    assert!(!report.has_fallback());
    let fixed_run = HedgingEngine::new(position.clone(), fixed, HedgeConfig::default())
        .unwrap()
        .run(&market)
        .unwrap();
    let refit_run = HedgingEngine::new(position, SurfaceSource::refit(fitter), HedgeConfig::default())
        .unwrap()
        .run(&market)
        .unwrap();

    assert_eq!(fixed_run.steps.len(), market.len());
    assert_eq!(refit_run.steps.len(), market.len());
    assert!(fixed_run.steps.iter().all(|s| s.fit_report.is_none()));
    for step in &refit_run.steps {
        let report = step.fit_report.as_ref().unwrap();
        assert!(!report.has_fallback(), "{}", step.date);
        assert!(report.slices.iter().all(|s| matches!(s.outcome, SliceOutcome::Svi { .. })));
    }

    // Both price off the same day-0 surface on the first step
    assert_relative_eq!(fixed_run.steps[0].option_value, refit_run.steps[0].option_value, epsilon = 1e-9);
}

#[test]
fn iron_condor_hedges_to_target() {
    let market = synthetic(10);
    let strikes = CondorStrikes {
        put_wing: 90.0,
        put_short: 95.0,
        call_short: 105.0,
        call_wing: 110.0,
    };
    let position = strategies::iron_condor("SYN", strikes, day(30), 3.0).unwrap();
    let fitter = SurfaceFitter::default();
    let (source, _) = SurfaceSource::fit_once(&fitter, &market[0]).unwrap();

    let run = HedgingEngine::new(position, source, HedgeConfig::frictionless())
        .unwrap()
        .run(&market)
        .unwrap();
    for step in &run.steps {
        assert_relative_eq!(step.delta_after(), 0.0, epsilon = 1e-9);
    }
    assert_eq!(run.total_cost(), 0.0);

    let summary = run.summary();
    assert_eq!(summary.steps, market.len());
    assert!(summary.max_drawdown >= 0.0);
}

#[test]
fn snapshot_file_round_trip_feeds_engine() {
    let market = synthetic(5);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.json");
    save_snapshots(&path, &market).unwrap();
    let loaded = load_snapshots(&path).unwrap();
    assert_eq!(loaded.len(), market.len());

    let position = strategies::long_put("SYN", 95.0, day(30), 1.0).unwrap();
    let run = flat_engine(position, 0.2, HedgeConfig::default()).run(&loaded).unwrap();
    assert_eq!(run.steps.len(), 5);
}
