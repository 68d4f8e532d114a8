//! Volatility Surface
//!
//! Query interface shared by every fitted surface. The hedging engine only
//! sees this trait, so interpolated, SVI and constant surfaces are
//! interchangeable.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::error::{HedgeError, HedgeResult};

/// What a surface returns outside its quoted strike/expiry range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtrapolationPolicy {
    /// Strikes clamp to the nearest quoted strike of a slice; expiries before
    /// the first or after the last slice reuse that slice's volatility.
    Flat,
    /// The surface is defined everywhere (e.g. a constant vol)
    Unbounded,
}

/// Implied volatility as a function of (strike, time to expiry)
pub trait VolSurface: Send + Sync + std::fmt::Debug {
    /// Implied volatility at (strike, tau). Always positive and finite on success.
    fn vol(&self, strike: f64, tau: f64) -> HedgeResult<f64>;

    /// Declared extrapolation policy
    fn extrapolation(&self) -> ExtrapolationPolicy;

    /// Total variance at (strike, time): σ²T
    fn total_variance(&self, strike: f64, tau: f64) -> HedgeResult<f64> {
        let v = self.vol(strike, tau)?;
        Ok(v * v * tau)
    }

    /// Sample the surface on a grid [strike, tau] -> vol
    fn sample_grid(&self, strikes: &[f64], taus: &[f64]) -> HedgeResult<Array2<f64>> {
        let mut grid = Array2::zeros((strikes.len(), taus.len()));
        for (si, &strike) in strikes.iter().enumerate() {
            for (ti, &tau) in taus.iter().enumerate() {
                grid[[si, ti]] = self.vol(strike, tau)?;
            }
        }
        Ok(grid)
    }
}

/// Constant volatility surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatSurface {
    vol: f64,
}

impl FlatSurface {
    pub fn new(vol: f64) -> HedgeResult<Self> {
        if !vol.is_finite() || vol <= 0.0 {
            return Err(HedgeError::domain(format!("flat vol must be positive, got {}", vol)));
        }
        Ok(Self { vol })
    }
}

impl VolSurface for FlatSurface {
    fn vol(&self, _strike: f64, _tau: f64) -> HedgeResult<f64> {
        Ok(self.vol)
    }

    fn extrapolation(&self) -> ExtrapolationPolicy {
        ExtrapolationPolicy::Unbounded
    }
}
