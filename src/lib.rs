//! # Delta Hedge - Delta-Hedging Backtester
//!
//! Backtests delta-hedged option strategies under Black-Scholes with a
//! fitted implied-volatility surface.
//!
//! ## Overview
//!
//! The pipeline has three stages:
//! - **Surface fitting**: implied vols from an options chain, interpolated
//!   per expiry slice with a cubic spline, or fitted with raw SVI or a
//!   polynomial in log-moneyness
//! - **Hedging simulation**: day-by-day Greeks and share rebalancing to a
//!   target delta, with linear transaction costs
//! - **P&L attribution**: Taylor decomposition of each step's P&L into
//!   delta, gamma, theta and vega terms plus a residual
//!
//! ## Usage
//!
//! ```rust,no_run
//! use delta_hedge::prelude::*;
//!
//! let market = generate_market(&SyntheticConfig::default()).unwrap();
//! let first = &market[0];
//!
//! // Long ATM straddle expiring in 45 days
//! let expiry = first.date + chrono::Duration::days(45);
//! let position = delta_hedge::strategies::long_straddle("SYN", 470.0, expiry, 1.0).unwrap();
//!
//! // Fit an SVI surface on the first day and keep it for the whole run
//! let fitter = SurfaceFitter::new(FitterConfig::svi());
//! let (source, _report) = SurfaceSource::fit_once(&fitter, first).unwrap();
//!
//! let engine = HedgingEngine::new(position, source, HedgeConfig::default()).unwrap();
//! let run = engine.run(&market).unwrap();
//! let attribution = run.attribution().unwrap();
//! println!("P&L {:.2}, gamma {:.2}", run.total_pnl(), attribution.totals.gamma_pnl);
//! ```
//!
//! ## Conventions
//!
//! - Time is ACT/365 year fractions
//! - Greeks are raw derivatives: theta per year, vega per unit volatility
//! - No dividends; the forward is S·e^(r·τ)
//!
//! ## What This Does NOT Do
//!
//! - Execute orders or connect to live markets
//! - Stochastic volatility (Heston, SABR)
//! - Model financing of the hedge or partial fills

pub mod backtest;
pub mod calibration;
pub mod core;
pub mod data;
pub mod models;
pub mod strategies;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        ChainQuote, ExtrapolationPolicy, FlatSurface, Greeks, HedgeError, HedgeResult,
        MarketSnapshot, OptionContract, OptionType, Position, PositionLeg, VolSurface,
    };

    // Models
    pub use crate::models::{
        fit_polynomial,
        fit_svi,
        greeks as bs_greeks,
        implied_volatility,
        norm_cdf,
        norm_pdf,
        price as bs_price,
        CubicSpline,
        PolynomialSmile,
        SviParams,
    };

    // Calibration
    pub use crate::calibration::{
        FitMode, FitReport, FitterConfig, SliceOutcome, SlicedSurface, SurfaceFitter,
    };

    // Backtest
    pub use crate::backtest::{
        AttributionResult, HedgeConfig, HedgeSummary, HedgingEngine, PnlAttribution,
        RebalanceFrequency, SimulationFailure, SimulationRun, SimulationStep, StepAttribution,
        SurfaceSource,
    };

    // Data
    pub use crate::data::{generate_market, load_snapshots, save_snapshots, SnapshotStore, SyntheticConfig};
}

// Re-export main types at crate root
pub use crate::core::{HedgeError, HedgeResult};
pub use crate::backtest::{HedgeConfig, HedgingEngine};
