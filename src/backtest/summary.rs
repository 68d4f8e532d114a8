//! Simulation summary statistics

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::hedger::SimulationStep;

/// Trading days per year used to annualise the Sharpe ratio
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate statistics of a hedging simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HedgeSummary {
    pub steps: usize,
    pub rebalances: usize,
    pub total_pnl: f64,
    pub total_cost: f64,
    /// Mean net P&L per step
    pub mean_step_pnl: f64,
    /// Sample standard deviation of net step P&L
    pub std_step_pnl: f64,
    /// Annualised mean / std of step P&L (0 when undefined)
    pub sharpe: f64,
    /// Largest peak-to-trough fall of cumulative P&L (>= 0)
    pub max_drawdown: f64,
    pub final_hedge_shares: f64,
}

impl HedgeSummary {
    pub fn from_steps(steps: &[SimulationStep]) -> Self {
        let Some(last) = steps.last() else {
            return Self::default();
        };

        let pnls: Vec<f64> = steps.iter().map(|s| s.step_pnl).collect();
        let mean = pnls.iter().mean();
        let std = if pnls.len() > 1 { pnls.iter().std_dev() } else { 0.0 };
        let sharpe = if std > 0.0 && std.is_finite() {
            mean / std * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        let mut peak = 0.0_f64;
        let mut max_drawdown = 0.0_f64;
        for step in steps {
            peak = peak.max(step.cumulative_pnl);
            max_drawdown = max_drawdown.max(peak - step.cumulative_pnl);
        }

        Self {
            steps: steps.len(),
            rebalances: steps.iter().filter(|s| s.rebalanced()).count(),
            total_pnl: last.cumulative_pnl,
            total_cost: last.cumulative_cost,
            mean_step_pnl: mean,
            std_step_pnl: std,
            sharpe,
            max_drawdown,
            final_hedge_shares: last.hedge_shares,
        }
    }
}
