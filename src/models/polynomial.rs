//! Polynomial Smile
//!
//! Implied vol as a polynomial in log-moneyness k = ln(K/F):
//!
//! σ(k) = c0 + c1·k + c2·k² + ...
//!
//! Fitted by least squares through the normal equations, with k rescaled to
//! [-1, 1] while solving.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::linalg::solve_dense;
use crate::core::{HedgeError, HedgeResult};

/// Highest supported polynomial degree
pub const MAX_POLY_DEGREE: usize = 6;

/// Grid points used to scan a polynomial for its minimum
const MIN_SCAN_POINTS: usize = 400;

/// Polynomial smile, coefficients in ascending powers of k
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialSmile {
    coefficients: Vec<f64>,
}

impl PolynomialSmile {
    pub fn new(coefficients: Vec<f64>) -> HedgeResult<Self> {
        if coefficients.is_empty() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(HedgeError::fit("polynomial smile needs finite coefficients"));
        }
        Ok(Self { coefficients })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Implied vol at log-moneyness k (Horner)
    pub fn eval(&self, k: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * k + c)
    }

    /// Smallest value on [lo, hi], scanned on a uniform grid
    pub fn min_on(&self, lo: f64, hi: f64) -> f64 {
        (0..=MIN_SCAN_POINTS)
            .map(|i| self.eval(lo + (hi - lo) * i as f64 / MIN_SCAN_POINTS as f64))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Outcome of a polynomial slice fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialFit {
    pub smile: PolynomialSmile,
    /// RMSE in implied vol
    pub rmse: f64,
}

/// Least-squares polynomial of the given degree through (k, vol) points
pub fn fit_polynomial(log_moneyness: &[f64], vols: &[f64], degree: usize) -> HedgeResult<PolynomialFit> {
    if degree > MAX_POLY_DEGREE {
        return Err(HedgeError::invalid_input(format!(
            "polynomial degree {} above the maximum {}",
            degree, MAX_POLY_DEGREE
        )));
    }
    if log_moneyness.len() != vols.len() {
        return Err(HedgeError::fit("polynomial input length mismatch"));
    }
    if log_moneyness.len() <= degree {
        return Err(HedgeError::fit(format!(
            "degree {} polynomial needs at least {} quotes, slice has {}",
            degree,
            degree + 1,
            log_moneyness.len()
        )));
    }
    if log_moneyness.iter().chain(vols.iter()).any(|v| !v.is_finite()) {
        return Err(HedgeError::fit("polynomial inputs must be finite"));
    }

    let scale = log_moneyness.iter().fold(0.0_f64, |acc, k| acc.max(k.abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };

    let n = degree + 1;
    let mut ata = Array2::<f64>::zeros((n, n));
    let mut aty = Array1::<f64>::zeros(n);
    for (&k, &vol) in log_moneyness.iter().zip(vols.iter()) {
        let u = k / scale;
        let powers: Vec<f64> = (0..n).map(|j| u.powi(j as i32)).collect();
        for i in 0..n {
            aty[i] += powers[i] * vol;
            for j in 0..n {
                ata[[i, j]] += powers[i] * powers[j];
            }
        }
    }

    let scaled = solve_dense(ata, aty).ok_or_else(|| {
        HedgeError::fit(format!(
            "degree {} polynomial is not identified by the quoted strikes",
            degree
        ))
    })?;
    let coefficients = scaled
        .iter()
        .enumerate()
        .map(|(j, d)| d / scale.powi(j as i32))
        .collect();
    let smile = PolynomialSmile::new(coefficients)?;

    let sse: f64 = log_moneyness
        .iter()
        .zip(vols.iter())
        .map(|(&k, &vol)| (smile.eval(k) - vol).powi(2))
        .sum();
    let rmse = (sse / vols.len() as f64).sqrt();

    Ok(PolynomialFit { smile, rmse })
}
