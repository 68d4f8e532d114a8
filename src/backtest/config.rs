//! Hedging Engine Configuration
//!
//! Passed explicitly to [`HedgingEngine`](super::HedgingEngine); there is no
//! global default state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{HedgeError, HedgeResult};

/// When the hedge is rebalanced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceFrequency {
    /// Every snapshot
    EveryStep,
    /// Every n-th snapshot (step 0 always hedges)
    EveryNSteps(usize),
    /// Only the initial hedge on step 0
    Never,
}

impl RebalanceFrequency {
    /// Is step `index` a scheduled rebalance?
    pub fn is_due(&self, index: usize) -> bool {
        match self {
            RebalanceFrequency::EveryStep => true,
            RebalanceFrequency::EveryNSteps(n) => index % n == 0,
            RebalanceFrequency::Never => index == 0,
        }
    }
}

/// Hedging engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeConfig {
    /// Portfolio delta (in shares) the hedge targets
    #[serde(default)]
    pub target_delta: f64,
    /// Transaction cost as a fraction of traded notional
    #[serde(default = "default_cost_rate")]
    pub cost_rate: f64,
    #[serde(default = "default_rebalance")]
    pub rebalance: RebalanceFrequency,
    /// Skip a scheduled rebalance while |delta - target| is within this band (shares)
    #[serde(default)]
    pub delta_band: f64,
}

fn default_cost_rate() -> f64 {
    0.0005
}

fn default_rebalance() -> RebalanceFrequency {
    RebalanceFrequency::EveryStep
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            target_delta: 0.0,
            cost_rate: default_cost_rate(),
            rebalance: default_rebalance(),
            delta_band: 0.0,
        }
    }
}

impl HedgeConfig {
    /// Daily delta-neutral hedging without transaction costs
    pub fn frictionless() -> Self {
        Self {
            cost_rate: 0.0,
            ..Self::default()
        }
    }

    /// Weekly rebalance (every 5 snapshots)
    pub fn weekly() -> Self {
        Self {
            rebalance: RebalanceFrequency::EveryNSteps(5),
            ..Self::default()
        }
    }

    /// Initial hedge only
    pub fn unhedged() -> Self {
        Self {
            rebalance: RebalanceFrequency::Never,
            ..Self::default()
        }
    }

    pub fn with_cost_rate(mut self, cost_rate: f64) -> Self {
        self.cost_rate = cost_rate;
        self
    }

    pub fn validate(&self) -> HedgeResult<()> {
        if !self.target_delta.is_finite() {
            return Err(HedgeError::invalid_input("target_delta must be finite"));
        }
        if !self.cost_rate.is_finite() || self.cost_rate < 0.0 {
            return Err(HedgeError::invalid_input(format!(
                "cost_rate must be >= 0, got {}",
                self.cost_rate
            )));
        }
        if !self.delta_band.is_finite() || self.delta_band < 0.0 {
            return Err(HedgeError::invalid_input(format!(
                "delta_band must be >= 0, got {}",
                self.delta_band
            )));
        }
        if self.rebalance == RebalanceFrequency::EveryNSteps(0) {
            return Err(HedgeError::invalid_input("rebalance interval must be at least 1"));
        }
        Ok(())
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> HedgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
