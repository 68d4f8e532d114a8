//! P&L Attribution
//!
//! Taylor-expansion decomposition of each step's realized P&L using the
//! portfolio Greeks of the previous step:
//!
//! - delta P&L = Δ_i × ΔS (hedge shares included in Δ)
//! - gamma P&L = ½ Γ_i × ΔS²
//! - theta P&L = Θ_i × elapsed years
//! - vega P&L  = Σ legs ν_i × Δσ_leg
//! - residual  = gross P&L − the four terms above
//!
//! The residual carries the higher-order and cross terms, so it grows with
//! the size of the spot move.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::hedger::SimulationStep;
use crate::core::{year_fraction, HedgeError, HedgeResult};

/// Attribution of one transition i → i+1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAttribution {
    /// Date of step i+1
    pub date: NaiveDate,
    pub spot_move: f64,
    /// Calendar time elapsed (years)
    pub elapsed: f64,
    pub delta_pnl: f64,
    pub gamma_pnl: f64,
    pub theta_pnl: f64,
    pub vega_pnl: f64,
    pub residual: f64,
    /// Realized P&L before transaction cost
    pub gross_pnl: f64,
    pub transaction_cost: f64,
    /// gross_pnl - transaction_cost
    pub net_pnl: f64,
}

impl StepAttribution {
    /// Greek-explained P&L (everything except the residual)
    pub fn explained(&self) -> f64 {
        self.delta_pnl + self.gamma_pnl + self.theta_pnl + self.vega_pnl
    }
}

/// Per-component sums over a simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributionTotals {
    pub delta_pnl: f64,
    pub gamma_pnl: f64,
    pub theta_pnl: f64,
    pub vega_pnl: f64,
    pub residual: f64,
    pub gross_pnl: f64,
}

/// Attribution over a full simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub steps: Vec<StepAttribution>,
    pub totals: AttributionTotals,
    /// All transaction costs, including the initial hedge placement
    pub total_cost: f64,
    /// Final cumulative P&L of the simulation
    pub total_pnl: f64,
    /// 1 - |Σ residual| / |Σ gross|, 0 when nothing was realized
    pub pct_explained: f64,
}

/// Greek-based P&L attribution over simulation steps
pub struct PnlAttribution;

impl PnlAttribution {
    /// Attribute every transition of a step sequence
    pub fn attribute(steps: &[SimulationStep]) -> HedgeResult<AttributionResult> {
        let mut records = Vec::with_capacity(steps.len().saturating_sub(1));
        let mut totals = AttributionTotals::default();

        for pair in steps.windows(2) {
            let record = Self::attribute_step(&pair[0], &pair[1])?;
            totals.delta_pnl += record.delta_pnl;
            totals.gamma_pnl += record.gamma_pnl;
            totals.theta_pnl += record.theta_pnl;
            totals.vega_pnl += record.vega_pnl;
            totals.residual += record.residual;
            totals.gross_pnl += record.gross_pnl;
            records.push(record);
        }

        let total_cost = steps.last().map(|s| s.cumulative_cost).unwrap_or(0.0);
        let total_pnl = steps.last().map(|s| s.cumulative_pnl).unwrap_or(0.0);
        let pct_explained = if totals.gross_pnl.abs() > 0.0 {
            1.0 - totals.residual.abs() / totals.gross_pnl.abs()
        } else {
            0.0
        };

        Ok(AttributionResult {
            steps: records,
            totals,
            total_cost,
            total_pnl,
            pct_explained,
        })
    }

    /// Attribute the move from `prev` to `cur` using `prev`'s Greeks
    pub fn attribute_step(prev: &SimulationStep, cur: &SimulationStep) -> HedgeResult<StepAttribution> {
        if prev.legs.len() != cur.legs.len() {
            return Err(HedgeError::invalid_input(format!(
                "leg count changed between {} and {}",
                prev.date, cur.date
            )));
        }

        let spot_move = cur.spot - prev.spot;
        let elapsed = year_fraction(prev.date, cur.date);

        let delta_pnl = prev.delta_after() * spot_move;
        let gamma_pnl = 0.5 * prev.greeks.gamma * spot_move * spot_move;
        let theta_pnl = prev.greeks.theta * elapsed;
        let vega_pnl: f64 = prev
            .legs
            .iter()
            .zip(cur.legs.iter())
            .map(|(p, c)| p.greeks.vega * (c.vol - p.vol))
            .sum();

        let residual = cur.gross_pnl - (delta_pnl + gamma_pnl + theta_pnl + vega_pnl);

        Ok(StepAttribution {
            date: cur.date,
            spot_move,
            elapsed,
            delta_pnl,
            gamma_pnl,
            theta_pnl,
            vega_pnl,
            residual,
            gross_pnl: cur.gross_pnl,
            transaction_cost: cur.transaction_cost,
            net_pnl: cur.step_pnl,
        })
    }
}
