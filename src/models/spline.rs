//! Natural Cubic Spline
//!
//! One-dimensional interpolant used for strike-wise smiles. Outside the knot
//! range the spline is flat (clamped to the boundary knot value).
//!
//! A spline with all second derivatives set to zero is exactly piecewise
//! linear, which is how the linear fallback is represented.

use serde::{Deserialize, Serialize};

use crate::core::{HedgeError, HedgeResult};

/// Interpolation kind of a spline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplineKind {
    /// Natural cubic (zero curvature at both ends)
    NaturalCubic,
    /// Piecewise linear between knots
    Linear,
}

/// Interpolating spline through (x, y) knots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots
    m: Vec<f64>,
    kind: SplineKind,
}

fn check_knots(xs: &[f64], ys: &[f64]) -> HedgeResult<()> {
    if xs.is_empty() {
        return Err(HedgeError::fit("spline needs at least one knot"));
    }
    if xs.len() != ys.len() {
        return Err(HedgeError::fit(format!(
            "spline knot length mismatch: {} x vs {} y",
            xs.len(),
            ys.len()
        )));
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return Err(HedgeError::fit("spline knots must be finite"));
    }
    if xs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(HedgeError::fit("spline x knots must be strictly increasing"));
    }
    Ok(())
}

impl CubicSpline {
    /// Natural cubic spline through the knots
    pub fn natural(xs: Vec<f64>, ys: Vec<f64>) -> HedgeResult<Self> {
        check_knots(&xs, &ys)?;
        let n = xs.len();
        let mut m = vec![0.0; n];

        if n >= 3 {
            // Tridiagonal system for interior second derivatives (Thomas algorithm)
            let interior = n - 2;
            let mut diag = vec![0.0; interior];
            let mut upper = vec![0.0; interior];
            let mut rhs = vec![0.0; interior];

            for i in 1..n - 1 {
                let h0 = xs[i] - xs[i - 1];
                let h1 = xs[i + 1] - xs[i];
                diag[i - 1] = 2.0 * (h0 + h1);
                upper[i - 1] = h1;
                rhs[i - 1] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
            }

            // Forward sweep; sub-diagonal entry for row j is h_j = xs[j+1] - xs[j]
            for j in 1..interior {
                let lower = xs[j + 1] - xs[j];
                let w = lower / diag[j - 1];
                diag[j] -= w * upper[j - 1];
                rhs[j] -= w * rhs[j - 1];
            }

            let mut sol = vec![0.0; interior];
            sol[interior - 1] = rhs[interior - 1] / diag[interior - 1];
            for j in (0..interior - 1).rev() {
                sol[j] = (rhs[j] - upper[j] * sol[j + 1]) / diag[j];
            }

            m[1..n - 1].copy_from_slice(&sol);
        }

        Ok(Self {
            xs,
            ys,
            m,
            kind: SplineKind::NaturalCubic,
        })
    }

    /// Piecewise-linear interpolant through the knots
    pub fn linear(xs: Vec<f64>, ys: Vec<f64>) -> HedgeResult<Self> {
        check_knots(&xs, &ys)?;
        let m = vec![0.0; xs.len()];
        Ok(Self {
            xs,
            ys,
            m,
            kind: SplineKind::Linear,
        })
    }

    pub fn kind(&self) -> SplineKind {
        self.kind
    }

    pub fn knots(&self) -> (&[f64], &[f64]) {
        (&self.xs, &self.ys)
    }

    /// Knot range (min x, max x)
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Index of the interval containing x (x already clamped)
    fn interval(&self, x: f64) -> usize {
        let idx = self.xs.partition_point(|&k| k <= x);
        idx.saturating_sub(1).min(self.xs.len() - 2)
    }

    /// Evaluate with flat extrapolation outside the knot range
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }

        let (lo, hi) = self.domain();
        let x = x.clamp(lo, hi);
        let i = self.interval(x);

        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;

        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }

    /// Exact minimum of the interpolant over its knot range
    pub fn min_value(&self) -> f64 {
        let mut min = self.ys.iter().cloned().fold(f64::INFINITY, f64::min);
        if self.xs.len() < 3 || self.kind == SplineKind::Linear {
            return min;
        }

        for i in 0..self.xs.len() - 1 {
            let h = self.xs[i + 1] - self.xs[i];
            let (m0, m1) = (self.m[i], self.m[i + 1]);
            let slope = (self.ys[i + 1] - self.ys[i]) / h;

            // dy/dx as a quadratic in b = (x - x_i) / h
            let qa = 0.5 * h * (m1 - m0);
            let qb = h * m0;
            let qc = slope - h * (2.0 * m0 + m1) / 6.0;

            let mut roots = Vec::with_capacity(2);
            if qa.abs() < 1e-14 {
                if qb.abs() > 1e-14 {
                    roots.push(-qc / qb);
                }
            } else {
                let disc = qb * qb - 4.0 * qa * qc;
                if disc >= 0.0 {
                    let sq = disc.sqrt();
                    roots.push((-qb + sq) / (2.0 * qa));
                    roots.push((-qb - sq) / (2.0 * qa));
                }
            }

            for b in roots.into_iter().filter(|b| *b > 0.0 && *b < 1.0) {
                min = min.min(self.eval(self.xs[i] + b * h));
            }
        }

        min
    }
}
