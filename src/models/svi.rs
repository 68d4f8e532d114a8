//! SVI Smile Parametrization
//!
//! Raw SVI (Gatheral) total implied variance as a function of
//! log-moneyness k = ln(K/F):
//!
//! w(k) = a + b * (ρ(k - m) + sqrt((k - m)² + σ²))
//!
//! Fitting is a bounded Levenberg-Marquardt least squares on total variance
//! with an analytic Jacobian, run from a fixed set of starting points so the
//! result is deterministic.
//!
//! σ is capped: a smile that is closer to a parabola than to a hyperbola
//! otherwise drives σ and b to infinity with ever smaller SSE gains.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::linalg::solve_dense;
use crate::core::{HedgeError, HedgeResult};

const RHO_BOUND: f64 = 0.999;
const SIGMA_FLOOR: f64 = 1e-6;
/// Upper bound on σ, in log-moneyness units
pub const SVI_SIGMA_CAP: f64 = 1.0;
/// How far m may sit outside the quoted log-moneyness range
const M_MARGIN: f64 = 1.0;
const LAMBDA_MAX: f64 = 1e12;
/// Accepted steps over which the relative SSE decrease is measured
const STALL_WINDOW: usize = 5;
/// Fitted minimum total variance is kept at or above this fraction of the
/// smallest observed total variance
const VARIANCE_FLOOR_FRACTION: f64 = 0.1;

/// Raw SVI parameters for one expiry slice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SviParams {
    /// Vertical level of the variance smile
    pub a: f64,
    /// Wing slope (>= 0)
    pub b: f64,
    /// Skew / rotation, |ρ| <= 1
    pub rho: f64,
    /// Horizontal shift
    pub m: f64,
    /// ATM curvature (> 0)
    pub sigma: f64,
}

impl SviParams {
    pub fn new(a: f64, b: f64, rho: f64, m: f64, sigma: f64) -> Self {
        Self { a, b, rho, m, sigma }
    }

    fn from_array(p: &[f64; 5]) -> Self {
        Self::new(p[0], p[1], p[2], p[3], p[4])
    }

    fn to_array(self) -> [f64; 5] {
        [self.a, self.b, self.rho, self.m, self.sigma]
    }

    /// Total implied variance w(k)
    pub fn total_variance(&self, k: f64) -> f64 {
        let km = k - self.m;
        self.a + self.b * (self.rho * km + (km * km + self.sigma * self.sigma).sqrt())
    }

    /// Smallest total variance over all k: a + bσ√(1-ρ²)
    pub fn min_total_variance(&self) -> f64 {
        self.a + self.b * self.sigma * (1.0 - self.rho * self.rho).max(0.0).sqrt()
    }

    /// Implied volatility at log-moneyness k for time to expiry tau
    pub fn implied_vol(&self, k: f64, tau: f64) -> HedgeResult<f64> {
        if tau <= 0.0 {
            return Err(HedgeError::domain("SVI vol needs positive time to expiry"));
        }
        let w = self.total_variance(k);
        if !w.is_finite() || w <= 0.0 {
            return Err(HedgeError::fit(format!(
                "SVI total variance {} at k={} is not positive",
                w, k
            )));
        }
        Ok((w / tau).sqrt())
    }

    /// Reject parameter sets outside the no-arbitrage bounds
    pub fn validate(&self) -> HedgeResult<()> {
        let p = self.to_array();
        if p.iter().any(|v| !v.is_finite()) {
            return Err(HedgeError::fit("SVI parameters must be finite"));
        }
        if self.b < 0.0 {
            return Err(HedgeError::fit(format!("SVI b must be >= 0, got {}", self.b)));
        }
        if self.rho.abs() > 1.0 {
            return Err(HedgeError::fit(format!("SVI |rho| must be <= 1, got {}", self.rho)));
        }
        if self.sigma <= 0.0 {
            return Err(HedgeError::fit(format!("SVI sigma must be > 0, got {}", self.sigma)));
        }
        if self.min_total_variance() < 0.0 {
            return Err(HedgeError::fit(format!(
                "SVI minimum total variance {} is negative",
                self.min_total_variance()
            )));
        }
        Ok(())
    }

    /// Gradient of w(k) with respect to (a, b, ρ, m, σ)
    fn gradient(&self, k: f64) -> [f64; 5] {
        let km = k - self.m;
        let root = (km * km + self.sigma * self.sigma).sqrt();
        [
            1.0,
            self.rho * km + root,
            self.b * km,
            -self.b * (self.rho + km / root),
            self.b * self.sigma / root,
        ]
    }
}

/// Settings for the SVI slice optimizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SviFitConfig {
    /// Minimum quotes required in a slice
    pub min_quotes: usize,
    /// Trial steps allowed per starting point
    pub max_iterations: usize,
    /// Relative SSE decrease over the last few accepted steps below which
    /// the fit has stalled at its minimum
    pub ftol: f64,
    /// Step size (relative to parameter scale) below which the fit is converged
    pub xtol: f64,
    /// Largest cosine between the residual and a free Jacobian column at
    /// which the gradient counts as zero
    pub gtol: f64,
}

impl Default for SviFitConfig {
    fn default() -> Self {
        Self {
            min_quotes: 5,
            max_iterations: 500,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-8,
        }
    }
}

/// Outcome of an SVI slice fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SviFit {
    pub params: SviParams,
    /// RMSE in total variance
    pub rmse: f64,
    /// Trial steps used by the winning start
    pub iterations: usize,
}

fn sse(params: &SviParams, ks: &[f64], ws: &[f64]) -> f64 {
    ks.iter()
        .zip(ws.iter())
        .map(|(&k, &w)| {
            let r = params.total_variance(k) - w;
            r * r
        })
        .sum()
}

/// Feasible set: a box on (b, ρ, m, σ) plus a floor on the minimum total
/// variance, enforced through a
struct Bounds {
    lower: [f64; 5],
    upper: [f64; 5],
    variance_floor: f64,
}

impl Bounds {
    fn for_slice(ks: &[f64], ws: &[f64]) -> Self {
        let k_min = ks.iter().cloned().fold(f64::INFINITY, f64::min);
        let k_max = ks.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let w_min = ws.iter().cloned().fold(f64::INFINITY, f64::min);
        Self {
            lower: [f64::NEG_INFINITY, 0.0, -RHO_BOUND, k_min - M_MARGIN, SIGMA_FLOOR],
            upper: [f64::INFINITY, f64::INFINITY, RHO_BOUND, k_max + M_MARGIN, SVI_SIGMA_CAP],
            variance_floor: VARIANCE_FLOOR_FRACTION * w_min.max(0.0),
        }
    }

    /// Smallest a keeping a + bσ√(1-ρ²) at the variance floor
    fn a_min(&self, p: &[f64; 5]) -> f64 {
        self.variance_floor - p[1] * p[4] * (1.0 - p[2] * p[2]).max(0.0).sqrt()
    }

    fn project(&self, p: &mut [f64; 5]) {
        for i in 0..5 {
            p[i] = p[i].clamp(self.lower[i], self.upper[i]);
        }
        p[0] = p[0].max(self.a_min(p));
    }

    /// Parameters pinned at a bound with the descent direction pointing out
    fn active(&self, p: &[f64; 5], gradient: &Array1<f64>) -> [bool; 5] {
        let mut active = [false; 5];
        for i in 0..5 {
            let lower = if i == 0 { self.a_min(p) } else { self.lower[i] };
            active[i] = (p[i] <= lower && gradient[i] > 0.0)
                || (p[i] >= self.upper[i] && gradient[i] < 0.0);
        }
        active
    }
}

fn normal_equations(params: &SviParams, ks: &[f64], ws: &[f64]) -> (Array2<f64>, Array1<f64>) {
    let mut jtj = Array2::<f64>::zeros((5, 5));
    let mut jtr = Array1::<f64>::zeros(5);
    for (&k, &w) in ks.iter().zip(ws.iter()) {
        let g = params.gradient(k);
        let r = params.total_variance(k) - w;
        for i in 0..5 {
            jtr[i] += g[i] * r;
            for j in 0..5 {
                jtj[[i, j]] += g[i] * g[j];
            }
        }
    }
    (jtj, jtr)
}

/// Largest cosine between the residual vector and a free Jacobian column
fn gradient_cosine(jtj: &Array2<f64>, jtr: &Array1<f64>, active: &[bool; 5], sse: f64) -> f64 {
    let norm_r = sse.sqrt();
    (0..5)
        .filter(|&i| !active[i])
        .map(|i| {
            let norm_j = jtj[[i, i]].sqrt();
            if norm_j == 0.0 || norm_r == 0.0 {
                0.0
            } else {
                jtr[i].abs() / (norm_j * norm_r)
            }
        })
        .fold(0.0, f64::max)
}

/// Run Levenberg-Marquardt from one starting point.
/// Returns (params, sse, iterations) on convergence.
fn levenberg_marquardt(
    start: SviParams,
    bounds: &Bounds,
    ks: &[f64],
    ws: &[f64],
    config: &SviFitConfig,
) -> Option<(SviParams, f64, usize)> {
    let mut p = start.to_array();
    bounds.project(&mut p);
    let mut current = SviParams::from_array(&p);
    let mut current_sse = sse(&current, ks, ws);
    if !current_sse.is_finite() {
        return None;
    }
    let mut lambda = 1e-3;
    let (mut jtj, mut jtr) = normal_equations(&current, ks, ws);
    let mut active = bounds.active(&p, &jtr);
    let mut accepted = vec![current_sse];

    for iter in 0..config.max_iterations {
        if current_sse < 1e-28 || gradient_cosine(&jtj, &jtr, &active, current_sse) <= config.gtol {
            return Some((current, current_sse, iter));
        }

        let mut damped = jtj.clone();
        let mut rhs = jtr.mapv(|v| -v);
        for i in 0..5 {
            if active[i] {
                damped.row_mut(i).fill(0.0);
                damped.column_mut(i).fill(0.0);
                damped[[i, i]] = 1.0;
                rhs[i] = 0.0;
            } else {
                damped[[i, i]] += lambda * (jtj[[i, i]] + 1e-12);
            }
        }

        let step = match solve_dense(damped, rhs) {
            Some(step) => step,
            None => {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    return Some((current, current_sse, iter));
                }
                continue;
            }
        };

        let mut trial = p;
        for i in 0..5 {
            trial[i] += step[i];
        }
        bounds.project(&mut trial);
        let candidate = SviParams::from_array(&trial);
        let candidate_sse = sse(&candidate, ks, ws);

        if candidate_sse.is_finite() && candidate_sse < current_sse {
            let scale = 1.0 + p.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            let moved = trial
                .iter()
                .zip(p.iter())
                .fold(0.0_f64, |acc, (t, o)| acc.max((t - o).abs()));
            let undamped = lambda < 1.0;

            p = trial;
            current = candidate;
            current_sse = candidate_sse;
            (jtj, jtr) = normal_equations(&current, ks, ws);
            active = bounds.active(&p, &jtr);
            lambda = (lambda / 10.0).max(1e-15);
            accepted.push(current_sse);

            if undamped && moved <= config.xtol * scale {
                return Some((current, current_sse, iter + 1));
            }
            if accepted.len() > STALL_WINDOW {
                let before = accepted[accepted.len() - 1 - STALL_WINDOW];
                if before - current_sse <= config.ftol * before {
                    return Some((current, current_sse, iter + 1));
                }
            }
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                // No descent direction left at machine precision
                return Some((current, current_sse, iter + 1));
            }
        }
    }

    None
}

/// Deterministic starting points derived from the observed smile
fn starting_points(ks: &[f64], ws: &[f64]) -> Vec<SviParams> {
    let (min_idx, w_min) = ws
        .iter()
        .cloned()
        .enumerate()
        .fold((0, f64::INFINITY), |acc, (i, w)| if w < acc.1 { (i, w) } else { acc });
    let m0 = ks[min_idx];

    let n = ks.len();
    let left = (ws[0] - ws[min_idx]) / (ks[min_idx] - ks[0]).max(1e-6);
    let right = (ws[n - 1] - ws[min_idx]) / (ks[n - 1] - ks[min_idx]).max(1e-6);
    let b0 = (0.5 * (left.abs() + right.abs())).max(0.01);

    let mut starts = Vec::with_capacity(9);
    for &sigma0 in &[0.1_f64, 0.3, 0.05] {
        for &rho0 in &[0.0_f64, -0.5, 0.5] {
            let a0 = w_min - b0 * sigma0 * (1.0 - rho0 * rho0).sqrt();
            starts.push(SviParams::new(a0, b0, rho0, m0, sigma0));
        }
    }
    starts
}

/// Fit raw SVI to observed (log-moneyness, total variance) points of one slice.
///
/// Fails when the slice has fewer than `config.min_quotes` points, when no
/// starting point converges within the iteration budget, or when the best
/// fit violates the parameter bounds.
pub fn fit_svi(
    log_moneyness: &[f64],
    total_variance: &[f64],
    config: &SviFitConfig,
) -> HedgeResult<SviFit> {
    if log_moneyness.len() != total_variance.len() {
        return Err(HedgeError::fit("SVI input length mismatch"));
    }
    if log_moneyness.len() < config.min_quotes {
        return Err(HedgeError::fit(format!(
            "SVI needs at least {} quotes, slice has {}",
            config.min_quotes,
            log_moneyness.len()
        )));
    }
    if log_moneyness
        .iter()
        .chain(total_variance.iter())
        .any(|v| !v.is_finite())
    {
        return Err(HedgeError::fit("SVI inputs must be finite"));
    }

    let mut order: Vec<usize> = (0..log_moneyness.len()).collect();
    order.sort_by(|&i, &j| log_moneyness[i].total_cmp(&log_moneyness[j]));
    let ks: Vec<f64> = order.iter().map(|&i| log_moneyness[i]).collect();
    let ws: Vec<f64> = order.iter().map(|&i| total_variance[i]).collect();

    let bounds = Bounds::for_slice(&ks, &ws);
    let mut best: Option<(SviParams, f64, usize)> = None;
    for start in starting_points(&ks, &ws) {
        if let Some(result) = levenberg_marquardt(start, &bounds, &ks, &ws, config) {
            if result.0.validate().is_err() {
                continue;
            }
            if best.as_ref().map_or(true, |b| result.1 < b.1) {
                best = Some(result);
            }
        }
    }

    let (params, best_sse, iterations) = best.ok_or_else(|| {
        HedgeError::fit(format!(
            "SVI fit did not converge within {} iterations from any start",
            config.max_iterations
        ))
    })?;

    Ok(SviFit {
        params,
        rmse: (best_sse / ks.len() as f64).sqrt(),
        iterations,
    })
}
