//! Delta-Hedging Engine
//!
//! Walks a chronological series of market snapshots. At each snapshot:
//! 1. Recompute time to expiry for every leg
//! 2. Query the volatility surface at each leg's (strike, tau)
//! 3. Price and compute Greeks with Black-Scholes
//! 4. Rebalance the share hedge to the target delta
//! 5. Charge transaction cost and mark the step's P&L
//!
//! Rebalancing is instantaneous and exact at the snapshot's spot; the only
//! friction is the linear cost on traded notional.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::attribution::{AttributionResult, PnlAttribution};
use super::config::HedgeConfig;
use super::summary::HedgeSummary;
use crate::calibration::{FitReport, SurfaceFitter};
use crate::core::{
    Greeks, HedgeError, HedgeResult, MarketSnapshot, OptionType, Position, VolSurface,
};
use crate::models::black_scholes;

/// Where the engine gets its volatility surface from
#[derive(Debug)]
pub enum SurfaceSource {
    /// One surface for the whole simulation
    Static(Box<dyn VolSurface>),
    /// Rebuild the surface from each snapshot's options chain
    Refit(SurfaceFitter),
}

impl SurfaceSource {
    pub fn fixed(surface: impl VolSurface + 'static) -> Self {
        SurfaceSource::Static(Box::new(surface))
    }

    /// Fit once on a snapshot and keep that surface for the whole run
    pub fn fit_once(fitter: &SurfaceFitter, snapshot: &MarketSnapshot) -> HedgeResult<(Self, FitReport)> {
        let (surface, report) = fitter.fit(snapshot)?;
        Ok((SurfaceSource::Static(Box::new(surface)), report))
    }

    pub fn refit(fitter: SurfaceFitter) -> Self {
        SurfaceSource::Refit(fitter)
    }
}

/// State of one option leg at a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegState {
    pub strike: f64,
    pub option_type: OptionType,
    pub expiry: NaiveDate,
    /// Signed contracts
    pub quantity: f64,
    /// Time to expiry (years)
    pub tau: f64,
    /// Surface vol used for pricing
    pub vol: f64,
    /// Per-share option price
    pub price: f64,
    /// Leg value: quantity × multiplier × price
    pub value: f64,
    /// Greeks scaled by quantity × multiplier
    pub greeks: Greeks,
}

/// Record of one simulated step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStep {
    pub index: usize,
    pub date: NaiveDate,
    pub spot: f64,
    pub legs: Vec<LegState>,
    /// Option-only Greeks summed over legs (hedge excluded)
    pub greeks: Greeks,
    /// Option value summed over legs
    pub option_value: f64,
    /// Portfolio delta before this step's trade (options + hedge)
    pub delta_before: f64,
    /// Shares bought (+) or sold (-) this step
    pub shares_traded: f64,
    /// Shares held after the trade
    pub hedge_shares: f64,
    /// Option value plus hedge value after the trade
    pub portfolio_value: f64,
    pub transaction_cost: f64,
    /// Mark-to-market P&L before transaction cost
    pub gross_pnl: f64,
    /// gross_pnl - transaction_cost
    pub step_pnl: f64,
    pub cumulative_pnl: f64,
    pub cumulative_cost: f64,
    /// Surface fit diagnostics when the surface was rebuilt this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_report: Option<FitReport>,
}

impl SimulationStep {
    /// Portfolio delta after the trade (options + hedge)
    pub fn delta_after(&self) -> f64 {
        self.greeks.delta + self.hedge_shares
    }

    pub fn rebalanced(&self) -> bool {
        self.shares_traded != 0.0
    }
}

/// Completed simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRun {
    pub steps: Vec<SimulationStep>,
    /// Position with the final hedge
    pub position: Position,
}

impl SimulationRun {
    pub fn total_pnl(&self) -> f64 {
        self.steps.last().map(|s| s.cumulative_pnl).unwrap_or(0.0)
    }

    pub fn total_cost(&self) -> f64 {
        self.steps.last().map(|s| s.cumulative_cost).unwrap_or(0.0)
    }

    pub fn summary(&self) -> HedgeSummary {
        HedgeSummary::from_steps(&self.steps)
    }

    pub fn attribution(&self) -> HedgeResult<AttributionResult> {
        PnlAttribution::attribute(&self.steps)
    }
}

/// Simulation aborted at a step; holds every step completed before it
#[derive(Error, Debug)]
#[error("simulation aborted after {} steps: {}", .steps.len(), .error)]
pub struct SimulationFailure {
    pub steps: Vec<SimulationStep>,
    #[source]
    pub error: HedgeError,
}

/// Carried between steps
#[derive(Debug)]
struct HedgeState {
    position: Position,
    last_date: Option<NaiveDate>,
    last_spot: f64,
    last_leg_values: Vec<f64>,
    cumulative_pnl: f64,
    cumulative_cost: f64,
}

/// Delta-hedging simulator
#[derive(Debug)]
pub struct HedgingEngine {
    config: HedgeConfig,
    source: SurfaceSource,
    position: Position,
}

impl HedgingEngine {
    pub fn new(position: Position, source: SurfaceSource, config: HedgeConfig) -> HedgeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            position,
        })
    }

    pub fn config(&self) -> &HedgeConfig {
        &self.config
    }

    /// Position as constructed, before any hedging
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Simulate over the snapshots. Each call starts from the constructed
    /// position, so repeated runs are independent.
    pub fn run(&self, snapshots: &[MarketSnapshot]) -> Result<SimulationRun, SimulationFailure> {
        tracing::info!(
            "Hedging {} ({} legs) over {} snapshots",
            self.position.underlying(),
            self.position.legs().len(),
            snapshots.len()
        );

        let mut state = HedgeState {
            position: self.position.clone(),
            last_date: None,
            last_spot: 0.0,
            last_leg_values: Vec::new(),
            cumulative_pnl: 0.0,
            cumulative_cost: 0.0,
        };
        let mut steps = Vec::with_capacity(snapshots.len());

        for (index, snapshot) in snapshots.iter().enumerate() {
            match self.step(&mut state, index, snapshot) {
                Ok(step) => steps.push(step),
                Err(error) => {
                    tracing::warn!("Simulation aborted at {}: {}", snapshot.date, error);
                    return Err(SimulationFailure { steps, error });
                }
            }
        }

        tracing::info!(
            "Simulation finished: P&L {:.2}, costs {:.2}",
            state.cumulative_pnl,
            state.cumulative_cost
        );

        Ok(SimulationRun {
            steps,
            position: state.position,
        })
    }

    fn leg_states(&self, snapshot: &MarketSnapshot, position: &Position, surface: &dyn VolSurface) -> HedgeResult<Vec<LegState>> {
        position
            .legs()
            .iter()
            .map(|leg| {
                let contract = &leg.contract;
                if contract.is_expired(snapshot.date) {
                    return Err(HedgeError::ExpiredOption {
                        underlying: contract.underlying.clone(),
                        strike: contract.strike,
                        expiry: contract.expiry,
                        date: snapshot.date,
                    });
                }
                let tau = contract.time_to_expiry(snapshot.date).max(0.0);
                let vol = surface.vol(contract.strike, tau)?;
                let price = black_scholes::price(
                    snapshot.spot,
                    contract.strike,
                    snapshot.rate,
                    vol,
                    tau,
                    contract.option_type,
                )?;
                let greeks = black_scholes::greeks(
                    snapshot.spot,
                    contract.strike,
                    snapshot.rate,
                    vol,
                    tau,
                    contract.option_type,
                )?;
                let exposure = leg.exposure();

                Ok(LegState {
                    strike: contract.strike,
                    option_type: contract.option_type,
                    expiry: contract.expiry,
                    quantity: leg.quantity,
                    tau,
                    vol,
                    price,
                    value: exposure * price,
                    greeks: greeks.scale(exposure),
                })
            })
            .collect()
    }

    fn step(&self, state: &mut HedgeState, index: usize, snapshot: &MarketSnapshot) -> HedgeResult<SimulationStep> {
        if let Some(last) = state.last_date {
            if snapshot.date <= last {
                return Err(HedgeError::invalid_input(format!(
                    "snapshot {} is not after {}",
                    snapshot.date, last
                )));
            }
        }
        snapshot.validate()?;

        let (legs, fit_report) = match &self.source {
            SurfaceSource::Static(surface) => (self.leg_states(snapshot, &state.position, surface.as_ref())?, None),
            SurfaceSource::Refit(fitter) => {
                let (surface, report) = fitter.fit(snapshot)?;
                (self.leg_states(snapshot, &state.position, &surface)?, Some(report))
            }
        };

        let greeks: Greeks = legs.iter().map(|l| l.greeks).sum();
        let option_value: f64 = legs.iter().map(|l| l.value).sum();
        let hedge_before = state.position.hedge_shares();
        let delta_before = greeks.delta + hedge_before;

        let gap = self.config.target_delta - delta_before;
        let shares_traded = if self.config.rebalance.is_due(index) && gap.abs() > self.config.delta_band {
            gap
        } else {
            0.0
        };
        let transaction_cost = shares_traded.abs() * snapshot.spot * self.config.cost_rate;

        let gross_pnl = match state.last_date {
            None => 0.0,
            Some(_) => {
                let option_pnl: f64 = legs
                    .iter()
                    .zip(state.last_leg_values.iter())
                    .map(|(leg, last)| leg.value - last)
                    .sum();
                option_pnl + hedge_before * (snapshot.spot - state.last_spot)
            }
        };
        let step_pnl = gross_pnl - transaction_cost;

        let hedge_shares = hedge_before + shares_traded;
        state.position.set_hedge_shares(hedge_shares);
        state.cumulative_pnl += step_pnl;
        state.cumulative_cost += transaction_cost;
        state.last_date = Some(snapshot.date);
        state.last_spot = snapshot.spot;
        state.last_leg_values = legs.iter().map(|l| l.value).collect();

        tracing::debug!(
            "{} spot {:.2} delta {:.2} traded {:.2} pnl {:.2}",
            snapshot.date,
            snapshot.spot,
            delta_before,
            shares_traded,
            step_pnl
        );

        Ok(SimulationStep {
            index,
            date: snapshot.date,
            spot: snapshot.spot,
            legs,
            greeks,
            option_value,
            delta_before,
            shares_traded,
            hedge_shares,
            portfolio_value: option_value + hedge_shares * snapshot.spot,
            transaction_cost,
            gross_pnl,
            step_pnl,
            cumulative_pnl: state.cumulative_pnl,
            cumulative_cost: state.cumulative_cost,
            fit_report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::RebalanceFrequency;
    use crate::core::{FlatSurface, OptionContract};
    use approx::assert_relative_eq;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn snapshots(spots: &[f64]) -> Vec<MarketSnapshot> {
        spots
            .iter()
            .enumerate()
            .map(|(i, &s)| MarketSnapshot::new(day(i as i64), s, 0.02))
            .collect()
    }

    fn long_call(expiry_days: i64) -> Position {
        let call = OptionContract::new("SPY", 100.0, day(expiry_days), OptionType::Call);
        Position::single(call, 1.0).unwrap()
    }

    fn engine(position: Position, config: HedgeConfig) -> HedgingEngine {
        let surface = FlatSurface::new(0.2).unwrap();
        HedgingEngine::new(position, SurfaceSource::fixed(surface), config).unwrap()
    }

    #[test]
    fn test_initial_hedge_neutralises_delta() {
        let run = engine(long_call(90), HedgeConfig::default())
            .run(&snapshots(&[100.0]))
            .unwrap();
        let step = &run.steps[0];

        assert_eq!(step.gross_pnl, 0.0);
        assert_relative_eq!(step.delta_after(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(step.shares_traded, -step.greeks.delta, epsilon = 1e-12);
        assert_relative_eq!(
            step.transaction_cost,
            step.shares_traded.abs() * 100.0 * 0.0005,
            epsilon = 1e-12
        );
        assert_relative_eq!(step.cumulative_pnl, -step.transaction_cost, epsilon = 1e-12);
        assert_relative_eq!(run.position.hedge_shares(), step.hedge_shares);
    }

    #[test]
    fn test_step_pnl_marks_options_and_hedge() {
        let run = engine(long_call(90), HedgeConfig::frictionless())
            .run(&snapshots(&[100.0, 103.0, 99.0]))
            .unwrap();

        for pair in run.steps.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            let expected = (cur.option_value - prev.option_value) + prev.hedge_shares * (cur.spot - prev.spot);
            assert_relative_eq!(cur.gross_pnl, expected, epsilon = 1e-9);
            assert_eq!(cur.step_pnl, cur.gross_pnl);
        }
        let total: f64 = run.steps.iter().map(|s| s.step_pnl).sum();
        assert_relative_eq!(run.total_pnl(), total, epsilon = 1e-9);
    }

    #[test]
    fn test_never_rebalances_after_initial_hedge() {
        let config = HedgeConfig {
            rebalance: RebalanceFrequency::Never,
            ..HedgeConfig::default()
        };
        let run = engine(long_call(90), config)
            .run(&snapshots(&[100.0, 105.0, 95.0, 101.0]))
            .unwrap();

        assert!(run.steps[0].rebalanced());
        assert!(run.steps[1..].iter().all(|s| !s.rebalanced()));
        assert_relative_eq!(run.total_cost(), run.steps[0].transaction_cost);
    }

    #[test]
    fn test_delta_band_suppresses_small_trades() {
        let config = HedgeConfig {
            delta_band: 10.0,
            ..HedgeConfig::default()
        };
        let run = engine(long_call(90), config)
            .run(&snapshots(&[100.0, 100.1, 100.2, 110.0]))
            .unwrap();

        assert!(run.steps[0].rebalanced());
        assert!(!run.steps[1].rebalanced());
        assert!(!run.steps[2].rebalanced());
        assert!(run.steps[3].rebalanced());
    }

    #[test]
    fn test_target_delta() {
        let config = HedgeConfig {
            target_delta: 25.0,
            ..HedgeConfig::frictionless()
        };
        let run = engine(long_call(90), config).run(&snapshots(&[100.0, 102.0])).unwrap();
        for step in &run.steps {
            assert_relative_eq!(step.delta_after(), 25.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_expired_leg_aborts_with_partial_steps() {
        let failure = engine(long_call(2), HedgeConfig::default())
            .run(&snapshots(&[100.0, 101.0, 102.0, 103.0, 104.0]))
            .unwrap_err();

        // Expiry day itself is priced at intrinsic; the day after fails
        assert_eq!(failure.steps.len(), 3);
        assert_eq!(failure.steps[2].legs[0].tau, 0.0);
        assert_relative_eq!(failure.steps[2].legs[0].price, 2.0, epsilon = 1e-12);
        match failure.error {
            HedgeError::ExpiredOption { strike, expiry, date, .. } => {
                assert_eq!(strike, 100.0);
                assert_eq!(expiry, day(2));
                assert_eq!(date, day(3));
            }
            other => panic!("expected expired option, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_order_snapshots_rejected() {
        let mut series = snapshots(&[100.0, 101.0, 102.0]);
        series[2].date = series[1].date;
        let failure = engine(long_call(90), HedgeConfig::default()).run(&series).unwrap_err();
        assert_eq!(failure.steps.len(), 2);
        assert!(matches!(failure.error, HedgeError::InvalidInput(_)));
    }

    #[test]
    fn test_runs_are_independent() {
        let engine = engine(long_call(90), HedgeConfig::default());
        let series = snapshots(&[100.0, 101.0, 99.5]);
        let first = engine.run(&series).unwrap();
        let second = engine.run(&series).unwrap();
        assert_eq!(first.steps, second.steps);
        assert_eq!(engine.position().hedge_shares(), 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let surface = FlatSurface::new(0.2).unwrap();
        let result = HedgingEngine::new(
            long_call(30),
            SurfaceSource::fixed(surface),
            HedgeConfig::default().with_cost_rate(-1.0),
        );
        assert!(result.is_err());
    }
}
