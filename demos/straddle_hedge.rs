//! Example: Delta-hedge a long straddle on a synthetic market
//!
//! Compares a surface fitted once on the first day with one refitted from
//! every day's chain, and a flat-vol surface with and without rebalancing,
//! then prints the Greek attribution of each run.
//!
//! Run with: cargo run --example straddle_hedge

use delta_hedge::prelude::*;
use delta_hedge::strategies;

fn report(label: &str, run: &SimulationRun) -> HedgeResult<()> {
    let summary = run.summary();
    let attribution = run.attribution()?;
    let t = &attribution.totals;

    println!("--- {} ---", label);
    println!(
        "P&L {:>9.2} | cost {:>7.2} | rebalances {} | max drawdown {:.2}",
        summary.total_pnl, summary.total_cost, summary.rebalances, summary.max_drawdown
    );
    println!(
        "delta {:>8.2} gamma {:>8.2} theta {:>8.2} vega {:>8.2} residual {:>8.2} ({:.1}% explained)\n",
        t.delta_pnl,
        t.gamma_pnl,
        t.theta_pnl,
        t.vega_pnl,
        t.residual,
        attribution.pct_explained * 100.0
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let market = generate_market(&SyntheticConfig {
        days: 40,
        annual_vol: 0.25,
        ..SyntheticConfig::default()
    })?;
    let first = &market[0];
    let expiry = first.date + chrono::Duration::days(60);
    let strike = first.spot.round();

    println!("=== Long {} straddle, expiry {} ===\n", strike, expiry);

    let position = strategies::long_straddle("SYN", strike, expiry, 1.0)?;

    let fitter = SurfaceFitter::new(FitterConfig::svi());
    let (static_source, fit) = SurfaceSource::fit_once(&fitter, first)?;
    for slice in &fit.slices {
        println!("  {} tau {:.3}: {:?}", slice.expiry, slice.tau, slice.outcome);
    }
    println!();

    let fixed = HedgingEngine::new(position.clone(), static_source, HedgeConfig::default())?.run(&market)?;
    report("Static SVI surface", &fixed)?;

    let refit = HedgingEngine::new(position.clone(), SurfaceSource::refit(fitter), HedgeConfig::default())?.run(&market)?;
    report("Daily SVI refit", &refit)?;

    let initial_only = HedgingEngine::new(
        position.clone(),
        SurfaceSource::fixed(FlatSurface::new(0.19)?),
        HedgeConfig::unhedged(),
    )?
    .run(&market)?;
    report("Flat 19% vol, initial hedge only", &initial_only)?;

    let weekly = HedgingEngine::new(
        position,
        SurfaceSource::fixed(FlatSurface::new(0.19)?),
        HedgeConfig::weekly(),
    )?
    .run(&market)?;
    report("Flat 19% vol, weekly rebalance", &weekly)?;

    Ok(())
}
