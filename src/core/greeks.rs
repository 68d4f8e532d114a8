//! Option Greeks
//!
//! First and second order sensitivities. Values are raw partial derivatives:
//! theta per year of calendar time, vega per unit of volatility.

use serde::{Deserialize, Serialize};

use super::option::DAYS_PER_YEAR;

/// Option Greeks (sensitivities)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: dV/dS (sensitivity to spot)
    pub delta: f64,
    /// Gamma: d²V/dS² (sensitivity of delta to spot)
    pub gamma: f64,
    /// Theta: dV/dt, per year
    pub theta: f64,
    /// Vega: dV/dσ, per 1.00 of vol
    pub vega: f64,
    /// Rho: dV/dr, per 1.00 of rate
    pub rho: f64,
}

impl Greeks {
    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64, rho: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
            rho,
        }
    }

    /// Scale Greeks by a factor (quantity × multiplier)
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
            rho: self.rho * factor,
        }
    }

    /// Add two Greeks (for portfolio)
    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
            rho: self.rho + other.rho,
        }
    }

    /// Theta per calendar day
    pub fn theta_per_day(&self) -> f64 {
        self.theta / DAYS_PER_YEAR
    }

    /// Vega per one vol point (1%)
    pub fn vega_per_point(&self) -> f64 {
        self.vega / 100.0
    }
}

impl std::iter::Sum for Greeks {
    fn sum<I: Iterator<Item = Greeks>>(iter: I) -> Self {
        iter.fold(Greeks::default(), |acc, g| acc.add(&g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_and_sum() {
        let g = Greeks::new(0.5, 0.02, -7.3, 39.0, 20.0);
        let short = g.scale(-2.0);
        assert_eq!(short.delta, -1.0);
        assert_eq!(short.vega, -78.0);

        let total: Greeks = vec![g, short].into_iter().sum();
        assert!((total.delta + 0.5).abs() < 1e-12);
        assert!((total.gamma + 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_reporting_units() {
        let g = Greeks::new(0.0, 0.0, -36.5, 25.0, 0.0);
        assert!((g.theta_per_day() + 0.1).abs() < 1e-12);
        assert!((g.vega_per_point() - 0.25).abs() < 1e-12);
    }
}
