//! Expiry-Sliced Volatility Surface
//!
//! A surface made of one smile per quoted expiry. Each smile is either a
//! strike-wise spline over implied vol, or an SVI or polynomial fit in
//! log-moneyness.
//! Between slices total variance is interpolated linearly in time.
//!
//! Extrapolation is flat: strikes outside a slice's quoted range clamp to the
//! nearest quoted strike, and times before the first (after the last) slice
//! reuse that slice's volatility.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{ExtrapolationPolicy, HedgeError, HedgeResult, VolSurface};
use crate::models::{CubicSpline, PolynomialSmile, SviParams};

/// Smile representation for one expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SmileSlice {
    /// Spline over (strike, implied vol)
    Spline(CubicSpline),
    /// Raw SVI in log-moneyness ln(K/F)
    Svi {
        params: SviParams,
        /// Forward used to compute log-moneyness at fit time
        forward: f64,
        /// Quoted strike range (min, max)
        strike_range: (f64, f64),
    },
    /// Implied vol polynomial in log-moneyness ln(K/F)
    Polynomial {
        smile: PolynomialSmile,
        forward: f64,
        strike_range: (f64, f64),
    },
}

impl SmileSlice {
    /// Quoted strike range of the slice
    pub fn strike_range(&self) -> (f64, f64) {
        match self {
            SmileSlice::Spline(spline) => spline.domain(),
            SmileSlice::Svi { strike_range, .. } | SmileSlice::Polynomial { strike_range, .. } => {
                *strike_range
            }
        }
    }

    /// Implied vol at a strike, clamped to the quoted range
    fn vol(&self, strike: f64, tau: f64) -> HedgeResult<f64> {
        let (lo, hi) = self.strike_range();
        let strike = strike.clamp(lo, hi);
        let vol = match self {
            SmileSlice::Spline(spline) => spline.eval(strike),
            SmileSlice::Svi { params, forward, .. } => {
                params.implied_vol((strike / forward).ln(), tau)?
            }
            SmileSlice::Polynomial { smile, forward, .. } => smile.eval((strike / forward).ln()),
        };
        if !vol.is_finite() || vol <= 0.0 {
            return Err(HedgeError::fit(format!(
                "slice at tau={:.4} produced non-positive vol {} at strike {}",
                tau, vol, strike
            )));
        }
        Ok(vol)
    }
}

/// One expiry slice of the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSlice {
    pub expiry: NaiveDate,
    /// Time to expiry at fit date (years)
    pub tau: f64,
    pub smile: SmileSlice,
}

impl SurfaceSlice {
    /// Implied vol of this slice at a strike
    pub fn vol(&self, strike: f64) -> HedgeResult<f64> {
        self.smile.vol(strike, self.tau)
    }
}

/// Volatility surface interpolated across expiry slices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlicedSurface {
    /// Fit date
    pub date: NaiveDate,
    slices: Vec<SurfaceSlice>,
}

impl SlicedSurface {
    /// Build from slices; sorted by time to expiry, taus must be distinct
    pub fn new(date: NaiveDate, mut slices: Vec<SurfaceSlice>) -> HedgeResult<Self> {
        if slices.is_empty() {
            return Err(HedgeError::fit("surface needs at least one expiry slice"));
        }
        if slices.iter().any(|s| !s.tau.is_finite() || s.tau <= 0.0) {
            return Err(HedgeError::fit("slice times to expiry must be positive"));
        }
        slices.sort_by(|a, b| a.tau.total_cmp(&b.tau));
        if slices.windows(2).any(|w| w[1].tau <= w[0].tau) {
            return Err(HedgeError::fit("duplicate slice expiry"));
        }
        Ok(Self { date, slices })
    }

    pub fn slices(&self) -> &[SurfaceSlice] {
        &self.slices
    }

    /// Quoted strike hull across all slices
    pub fn strike_range(&self) -> (f64, f64) {
        self.slices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            let (a, b) = s.smile.strike_range();
            (lo.min(a), hi.max(b))
        })
    }

    /// Quoted time-to-expiry range
    pub fn tau_range(&self) -> (f64, f64) {
        (self.slices[0].tau, self.slices[self.slices.len() - 1].tau)
    }
}

impl VolSurface for SlicedSurface {
    fn vol(&self, strike: f64, tau: f64) -> HedgeResult<f64> {
        if !strike.is_finite() || strike <= 0.0 {
            return Err(HedgeError::domain(format!("strike must be positive, got {}", strike)));
        }
        if !tau.is_finite() || tau < 0.0 {
            return Err(HedgeError::domain(format!("time to expiry must be >= 0, got {}", tau)));
        }

        let first = &self.slices[0];
        let last = &self.slices[self.slices.len() - 1];
        if tau <= first.tau {
            return first.vol(strike);
        }
        if tau >= last.tau {
            return last.vol(strike);
        }

        let upper = self.slices.partition_point(|s| s.tau < tau);
        let (s0, s1) = (&self.slices[upper - 1], &self.slices[upper]);
        if s1.tau == tau {
            return s1.vol(strike);
        }

        // Linear in total variance between bracketing slices
        let v0 = s0.vol(strike)?;
        let v1 = s1.vol(strike)?;
        let w0 = v0 * v0 * s0.tau;
        let w1 = v1 * v1 * s1.tau;
        let weight = (tau - s0.tau) / (s1.tau - s0.tau);
        let w = w0 + weight * (w1 - w0);

        Ok((w / tau).sqrt())
    }

    fn extrapolation(&self) -> ExtrapolationPolicy {
        ExtrapolationPolicy::Flat
    }
}
