//! Delta-Hedge Backtester CLI
//!
//! # Hedge a long straddle on a synthetic market
//! delta-hedge simulate --days 60 --strategy long-straddle
//!
//! # Hedge against stored snapshots, refitting an SVI surface every day
//! delta-hedge run --data market.json --strategy short-put --mode svi --refit
//!
//! # Keep a generated market in a snapshot store, then replay it
//! delta-hedge simulate --days 60 --store data --series spy60
//! delta-hedge run --store data --series spy60 --mode polynomial --grid
//!
//! Set RUST_LOG=delta_hedge=debug for per-step logs.

use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use delta_hedge::prelude::*;
use delta_hedge::strategies::{self, CondorStrikes};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "delta-hedge")]
#[command(about = "Delta-hedging backtester with surface fitting and P&L attribution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hedge a strategy on a seeded synthetic market
    Simulate {
        /// Number of daily snapshots
        #[arg(long, default_value_t = 30)]
        days: usize,

        /// RNG seed for the spot path
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Realized volatility of the spot path
        #[arg(long, default_value_t = 0.18)]
        path_vol: f64,

        /// Write the generated snapshots to this JSON file
        #[arg(long)]
        save_market: Option<PathBuf>,

        /// Also keep the generated snapshots in this store directory
        #[arg(long, requires = "series")]
        store: Option<PathBuf>,

        /// Series name inside the store
        #[arg(long, requires = "store")]
        series: Option<String>,

        #[command(flatten)]
        setup: Setup,
    },

    /// Hedge a strategy on stored snapshots
    Run {
        /// Snapshot series (JSON file)
        #[arg(short, long, conflicts_with = "store", required_unless_present = "store")]
        data: Option<PathBuf>,

        /// Snapshot store directory
        #[arg(long, requires = "series")]
        store: Option<PathBuf>,

        /// Series name inside the store
        #[arg(long, requires = "store")]
        series: Option<String>,

        #[command(flatten)]
        setup: Setup,
    },
}

#[derive(clap::Args)]
struct Setup {
    #[arg(long, value_enum, default_value_t = StrategyKind::LongStraddle)]
    strategy: StrategyKind,

    /// Center strike (defaults to the first spot, rounded)
    #[arg(long)]
    strike: Option<f64>,

    /// Distance between strikes of multi-strike strategies (defaults to 5% of spot)
    #[arg(long)]
    width: Option<f64>,

    /// Expiry in days after the first snapshot
    #[arg(long, default_value_t = 45)]
    expiry_days: i64,

    /// Explicit expiry date (overrides --expiry-days)
    #[arg(long)]
    expiry: Option<NaiveDate>,

    #[arg(long, default_value_t = 1.0)]
    contracts: f64,

    /// Surface fit per expiry slice
    #[arg(long, value_enum, default_value_t = SurfaceMode::Interpolation)]
    mode: SurfaceMode,

    /// Polynomial degree for --mode polynomial
    #[arg(long, default_value_t = 2)]
    degree: usize,

    /// Print the first day's fitted implied-vol grid
    #[arg(long)]
    grid: bool,

    /// Rebuild the surface from every snapshot instead of the first one
    #[arg(long)]
    refit: bool,

    /// Use a constant volatility instead of fitting the chain
    #[arg(long)]
    flat_vol: Option<f64>,

    /// Hedge configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write steps, attribution and summary to this JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyKind {
    LongCall,
    LongPut,
    ShortCall,
    ShortPut,
    LongStraddle,
    ShortStraddle,
    LongStrangle,
    BullCallSpread,
    BearPutSpread,
    IronCondor,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SurfaceMode {
    Interpolation,
    Svi,
    Polynomial,
}

#[derive(Serialize)]
struct Report<'a> {
    summary: &'a HedgeSummary,
    attribution: &'a AttributionResult,
    steps: &'a [SimulationStep],
}

fn build_position(setup: &Setup, first: &MarketSnapshot) -> HedgeResult<Position> {
    let underlying = "SYN";
    let k = setup.strike.unwrap_or_else(|| first.spot.round());
    let w = setup.width.unwrap_or_else(|| (first.spot * 0.05).round().max(1.0));
    let expiry = setup
        .expiry
        .unwrap_or_else(|| first.date + chrono::Duration::days(setup.expiry_days));
    let n = setup.contracts;

    match setup.strategy {
        StrategyKind::LongCall => strategies::long_call(underlying, k, expiry, n),
        StrategyKind::LongPut => strategies::long_put(underlying, k, expiry, n),
        StrategyKind::ShortCall => strategies::short_call(underlying, k, expiry, n),
        StrategyKind::ShortPut => strategies::short_put(underlying, k, expiry, n),
        StrategyKind::LongStraddle => strategies::long_straddle(underlying, k, expiry, n),
        StrategyKind::ShortStraddle => strategies::short_straddle(underlying, k, expiry, n),
        StrategyKind::LongStrangle => strategies::long_strangle(underlying, k - w, k + w, expiry, n),
        StrategyKind::BullCallSpread => strategies::bull_call_spread(underlying, k, k + w, expiry, n),
        StrategyKind::BearPutSpread => strategies::bear_put_spread(underlying, k - w, k, expiry, n),
        StrategyKind::IronCondor => {
            let strikes = CondorStrikes {
                put_wing: k - 2.0 * w,
                put_short: k - w,
                call_short: k + w,
                call_wing: k + 2.0 * w,
            };
            strategies::iron_condor(underlying, strikes, expiry, n)
        }
    }
}

fn surface_source(setup: &Setup, first: &MarketSnapshot) -> HedgeResult<SurfaceSource> {
    if let Some(vol) = setup.flat_vol {
        return Ok(SurfaceSource::fixed(FlatSurface::new(vol)?));
    }

    let config = match setup.mode {
        SurfaceMode::Interpolation => FitterConfig::interpolation(),
        SurfaceMode::Svi => FitterConfig::svi(),
        SurfaceMode::Polynomial => FitterConfig::polynomial(setup.degree),
    }
    .with_parallel(true);
    let fitter = SurfaceFitter::new(config);

    if setup.grid {
        let (surface, _) = fitter.fit(first)?;
        print_grid(&surface, first.spot)?;
    }

    if setup.refit {
        return Ok(SurfaceSource::refit(fitter));
    }

    let (source, report) = SurfaceSource::fit_once(&fitter, first)?;
    println!(
        "Fitted {} slices on {} ({} fallbacks, {} rejected quotes, {} in-the-money twins unused)",
        report.slices.len(),
        report.date,
        report.fallbacks().count(),
        report.rejected_quotes,
        report.superseded_quotes
    );
    Ok(source)
}

/// Implied vols on a moneyness by expiry grid around `spot`
fn print_grid(surface: &dyn VolSurface, spot: f64) -> HedgeResult<()> {
    let moneyness = [0.85, 0.9, 0.95, 1.0, 1.05, 1.1, 1.15];
    let days = [7.0, 14.0, 30.0, 60.0, 90.0];
    let strikes: Vec<f64> = moneyness.iter().map(|m| m * spot).collect();
    let taus: Vec<f64> = days.iter().map(|d| d / 365.0).collect();
    let grid = surface.sample_grid(&strikes, &taus)?;

    print!("{:>8}", "K/S");
    for d in &days {
        print!("{:>8}", format!("{}d", d));
    }
    println!();
    for (i, m) in moneyness.iter().enumerate() {
        print!("{:>8.2}", m);
        for j in 0..taus.len() {
            print!("{:>8.4}", grid[[i, j]]);
        }
        println!();
    }
    Ok(())
}

fn run_backtest(snapshots: &[MarketSnapshot], setup: &Setup) -> Result<(), Box<dyn Error>> {
    let first = snapshots.first().ok_or("no snapshots to hedge over")?;

    let config = match &setup.config {
        Some(path) => HedgeConfig::from_json_file(path)?,
        None => HedgeConfig::default(),
    };
    let position = build_position(setup, first)?;
    let source = surface_source(setup, first)?;

    println!("{}", SEPARATOR);
    println!("Strategy: {:?}, {} legs, expiry {}", setup.strategy, position.legs().len(), position.first_expiry());
    println!(
        "Snapshots: {} ({} to {})",
        snapshots.len(),
        first.date,
        snapshots[snapshots.len() - 1].date
    );
    println!("Cost rate: {} | Rebalance: {:?}", config.cost_rate, config.rebalance);
    println!("{}", SEPARATOR);

    let engine = HedgingEngine::new(position, source, config)?;
    let run = match engine.run(snapshots) {
        Ok(run) => run,
        Err(failure) => {
            eprintln!("{}", failure);
            if let Some(last) = failure.steps.last() {
                eprintln!("Last completed step: {} (cumulative P&L {:.2})", last.date, last.cumulative_pnl);
            }
            return Err(Box::new(failure));
        }
    };

    let summary = run.summary();
    let attribution = run.attribution()?;

    println!("\nSummary:");
    println!("  Total P&L:        {:>12.2}", summary.total_pnl);
    println!("  Transaction cost: {:>12.2}", summary.total_cost);
    println!("  Rebalances:       {:>12}", summary.rebalances);
    println!("  Step P&L mean:    {:>12.4}", summary.mean_step_pnl);
    println!("  Step P&L std:     {:>12.4}", summary.std_step_pnl);
    println!("  Sharpe:           {:>12.3}", summary.sharpe);
    println!("  Max drawdown:     {:>12.2}", summary.max_drawdown);

    let totals = &attribution.totals;
    println!("\nAttribution:");
    println!("  Delta:    {:>12.2}", totals.delta_pnl);
    println!("  Gamma:    {:>12.2}", totals.gamma_pnl);
    println!("  Theta:    {:>12.2}", totals.theta_pnl);
    println!("  Vega:     {:>12.2}", totals.vega_pnl);
    println!("  Residual: {:>12.2}", totals.residual);
    println!("  Explained: {:.1}%", attribution.pct_explained * 100.0);

    if let Some(path) = &setup.output {
        let report = Report {
            summary: &summary,
            attribution: &attribution,
            steps: &run.steps,
        };
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("\nWrote report to {}", path.display());
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("delta_hedge=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            days,
            seed,
            path_vol,
            save_market,
            store,
            series,
            setup,
        } => {
            let config = SyntheticConfig {
                days,
                seed,
                annual_vol: path_vol,
                ..SyntheticConfig::default()
            };
            let snapshots = generate_market(&config)?;
            if let Some(path) = save_market {
                save_snapshots(&path, &snapshots)?;
            }
            if let (Some(dir), Some(name)) = (store, series) {
                SnapshotStore::new(dir)?.save(&name, &snapshots)?;
            }
            run_backtest(&snapshots, &setup)
        }
        Commands::Run {
            data,
            store,
            series,
            setup,
        } => {
            let snapshots = match (data, store, series) {
                (Some(path), _, _) => load_snapshots(&path)?,
                (None, Some(dir), Some(name)) => {
                    let store = SnapshotStore::new(&dir)?;
                    match store.load(&name)? {
                        Some(snapshots) => snapshots,
                        None => {
                            let known = store.list()?.join(", ");
                            return Err(format!("no series '{}' in {} (stored: {})", name, dir.display(), known).into());
                        }
                    }
                }
                _ => return Err("pass --data FILE or --store DIR --series NAME".into()),
            };
            run_backtest(&snapshots, &setup)
        }
    }
}
