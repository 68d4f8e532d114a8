//! Volatility Surface Fitter
//!
//! Turns one market snapshot's options chain into a [`SlicedSurface`]:
//! 1. Price each quote (mid, else bid/ask midpoint, else last)
//! 2. Keep the out-of-the-money side per (expiry, strike)
//! 3. Solve implied vols, skipping quotes that cannot be inverted
//! 4. Fit each expiry slice by spline interpolation, SVI or a polynomial
//!
//! Slices are independent and can be fitted in parallel; output order is
//! always ascending expiry.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::sliced::{SlicedSurface, SmileSlice, SurfaceSlice};
use crate::core::{HedgeError, HedgeResult, MarketSnapshot, OptionType};
use crate::models::{
    fit_polynomial, fit_svi, implied_volatility, CubicSpline, SplineKind, SviFitConfig, SviParams,
    MAX_POLY_DEGREE,
};

/// How each expiry slice is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMode {
    /// Natural cubic spline over (strike, implied vol)
    Interpolation,
    /// Raw SVI per slice
    Svi,
    /// Least-squares polynomial of implied vol in log-moneyness
    Polynomial { degree: usize },
}

/// Surface fitter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitterConfig {
    pub mode: FitMode,
    /// Degrade a failed SVI or polynomial slice to spline interpolation
    /// instead of failing
    pub allow_fallback: bool,
    /// Fit slices on the rayon thread pool
    pub parallel: bool,
    /// SVI optimizer settings
    pub svi: SviFitConfig,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            mode: FitMode::Interpolation,
            allow_fallback: true,
            parallel: false,
            svi: SviFitConfig::default(),
        }
    }
}

impl FitterConfig {
    /// Spline interpolation per slice
    pub fn interpolation() -> Self {
        Self::default()
    }

    /// SVI per slice with spline fallback
    pub fn svi() -> Self {
        Self {
            mode: FitMode::Svi,
            ..Self::default()
        }
    }

    /// SVI per slice, any slice failure aborts the fit
    pub fn svi_strict() -> Self {
        Self {
            mode: FitMode::Svi,
            allow_fallback: false,
            ..Self::default()
        }
    }

    /// Polynomial smile of the given degree per slice, with spline fallback
    pub fn polynomial(degree: usize) -> Self {
        Self {
            mode: FitMode::Polynomial { degree },
            ..Self::default()
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> HedgeResult<()> {
        if let FitMode::Polynomial { degree } = self.mode {
            if degree > MAX_POLY_DEGREE {
                return Err(HedgeError::invalid_input(format!(
                    "polynomial degree {} above the maximum {}",
                    degree, MAX_POLY_DEGREE
                )));
            }
        }
        if self.svi.min_quotes < 5 {
            return Err(HedgeError::invalid_input("SVI needs at least 5 quotes per slice"));
        }
        Ok(())
    }
}

/// Result of fitting one slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SliceOutcome {
    /// Spline fit as requested
    Interpolated { kind: SplineKind },
    /// SVI fit accepted, RMSE in total variance
    Svi { params: SviParams, rmse: f64 },
    /// Polynomial fit accepted, RMSE in implied vol
    Polynomial { coefficients: Vec<f64>, rmse: f64 },
    /// Requested fit failed, slice degraded to a spline of the given kind
    Fallback { reason: String, kind: SplineKind },
}

/// Per-slice fit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceReport {
    pub expiry: NaiveDate,
    pub tau: f64,
    /// Quotes with a solved implied vol
    pub quotes: usize,
    pub outcome: SliceOutcome,
}

/// Diagnostics of a surface fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub date: NaiveDate,
    pub mode: FitMode,
    pub slices: Vec<SliceReport>,
    /// Quotes without a usable price or with an unsolvable implied vol
    pub rejected_quotes: usize,
    /// Quotes left unused because another quote at the same strike was used
    /// (the in-the-money twin of an out-of-the-money quote)
    pub superseded_quotes: usize,
    /// Quotes at or past expiry
    pub expired_quotes: usize,
}

impl FitReport {
    /// Slices that did not get the requested fit
    pub fn fallbacks(&self) -> impl Iterator<Item = &SliceReport> {
        self.slices
            .iter()
            .filter(|s| matches!(s.outcome, SliceOutcome::Fallback { .. }))
    }

    pub fn has_fallback(&self) -> bool {
        self.fallbacks().next().is_some()
    }
}

/// Implied vols for one expiry, ascending in strike
#[derive(Debug, Clone)]
pub struct SliceQuotes {
    pub expiry: NaiveDate,
    pub tau: f64,
    pub forward: f64,
    pub strikes: Vec<f64>,
    pub vols: Vec<f64>,
}

/// Output of chain preparation
#[derive(Debug, Clone)]
pub struct PreparedChain {
    pub slices: Vec<SliceQuotes>,
    pub rejected_quotes: usize,
    pub superseded_quotes: usize,
    pub expired_quotes: usize,
}

/// Solve implied vols for a snapshot's chain and group them by expiry
pub fn prepare_chain(snapshot: &MarketSnapshot) -> HedgeResult<PreparedChain> {
    snapshot.validate()?;

    let mut expired_quotes = 0;
    let mut rejected_quotes = 0;
    let mut superseded_quotes = 0;
    let mut live: Vec<(NaiveDate, f64, OptionType, f64)> = Vec::with_capacity(snapshot.quotes.len());

    for quote in &snapshot.quotes {
        if snapshot.time_to(quote.expiry) <= 0.0 {
            expired_quotes += 1;
            continue;
        }
        if !quote.strike.is_finite() || quote.strike <= 0.0 {
            rejected_quotes += 1;
            continue;
        }
        match quote.best_price() {
            Some(price) => live.push((quote.expiry, quote.strike, quote.option_type, price)),
            None => rejected_quotes += 1,
        }
    }

    live.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut slices: Vec<SliceQuotes> = Vec::new();
    let mut start = 0;
    while start < live.len() {
        let (expiry, strike, _, _) = live[start];
        let mut end = start + 1;
        while end < live.len() && live[end].0 == expiry && live[end].1 == strike {
            end += 1;
        }
        let group = &live[start..end];
        superseded_quotes += group.len() - 1;
        start = end;

        let tau = snapshot.time_to(expiry);
        let forward = snapshot.forward(tau);
        let otm = if strike >= forward { OptionType::Call } else { OptionType::Put };
        let chosen = group
            .iter()
            .find(|q| q.2 == otm)
            .or_else(|| group.first())
            .copied();
        let Some((_, _, option_type, price)) = chosen else {
            continue;
        };

        match implied_volatility(price, snapshot.spot, strike, snapshot.rate, tau, option_type) {
            Ok(vol) => {
                match slices.last_mut() {
                    Some(slice) if slice.expiry == expiry => {
                        slice.strikes.push(strike);
                        slice.vols.push(vol);
                    }
                    _ => slices.push(SliceQuotes {
                        expiry,
                        tau,
                        forward,
                        strikes: vec![strike],
                        vols: vec![vol],
                    }),
                }
            }
            Err(e) => {
                tracing::debug!("Skipping {} {:?} {} quote: {}", expiry, option_type, strike, e);
                rejected_quotes += 1;
            }
        }
    }

    Ok(PreparedChain {
        slices,
        rejected_quotes,
        superseded_quotes,
        expired_quotes,
    })
}

/// Spline slice, degraded to linear if the cubic dips to a non-positive vol
fn spline_smile(quotes: &SliceQuotes) -> HedgeResult<(CubicSpline, Option<String>)> {
    let spline = CubicSpline::natural(quotes.strikes.clone(), quotes.vols.clone())?;
    let min = spline.min_value();
    if min > 0.0 {
        return Ok((spline, None));
    }
    let reason = format!("cubic spline reaches non-positive vol {:.6}", min);
    let linear = CubicSpline::linear(quotes.strikes.clone(), quotes.vols.clone())?;
    Ok((linear, Some(reason)))
}

fn spline_slice(quotes: &SliceQuotes, prior_reason: Option<String>) -> HedgeResult<(SurfaceSlice, SliceOutcome)> {
    let (spline, reason) = spline_smile(quotes)?;
    let kind = spline.kind();
    let outcome = match (prior_reason, reason) {
        (None, None) => SliceOutcome::Interpolated { kind },
        (Some(a), Some(b)) => SliceOutcome::Fallback {
            reason: format!("{}; {}", a, b),
            kind,
        },
        (Some(r), None) | (None, Some(r)) => SliceOutcome::Fallback { reason: r, kind },
    };
    let slice = SurfaceSlice {
        expiry: quotes.expiry,
        tau: quotes.tau,
        smile: SmileSlice::Spline(spline),
    };
    Ok((slice, outcome))
}

fn svi_slice(quotes: &SliceQuotes, config: &SviFitConfig) -> HedgeResult<(SurfaceSlice, SliceOutcome)> {
    let ks: Vec<f64> = quotes.strikes.iter().map(|k| (k / quotes.forward).ln()).collect();
    let ws: Vec<f64> = quotes.vols.iter().map(|v| v * v * quotes.tau).collect();

    let fit = fit_svi(&ks, &ws, config)?;
    if fit.params.min_total_variance() <= 0.0 {
        return Err(HedgeError::fit(format!(
            "SVI slice {} has non-positive minimum variance {}",
            quotes.expiry,
            fit.params.min_total_variance()
        )));
    }

    let slice = SurfaceSlice {
        expiry: quotes.expiry,
        tau: quotes.tau,
        smile: SmileSlice::Svi {
            params: fit.params,
            forward: quotes.forward,
            strike_range: (quotes.strikes[0], quotes.strikes[quotes.strikes.len() - 1]),
        },
    };
    Ok((
        slice,
        SliceOutcome::Svi {
            params: fit.params,
            rmse: fit.rmse,
        },
    ))
}

fn polynomial_slice(quotes: &SliceQuotes, degree: usize) -> HedgeResult<(SurfaceSlice, SliceOutcome)> {
    let ks: Vec<f64> = quotes.strikes.iter().map(|k| (k / quotes.forward).ln()).collect();
    let fit = fit_polynomial(&ks, &quotes.vols, degree)?;

    let min = fit.smile.min_on(ks[0], ks[ks.len() - 1]);
    if min <= 0.0 {
        return Err(HedgeError::fit(format!(
            "polynomial slice {} reaches non-positive vol {:.6}",
            quotes.expiry, min
        )));
    }

    let outcome = SliceOutcome::Polynomial {
        coefficients: fit.smile.coefficients().to_vec(),
        rmse: fit.rmse,
    };
    let slice = SurfaceSlice {
        expiry: quotes.expiry,
        tau: quotes.tau,
        smile: SmileSlice::Polynomial {
            smile: fit.smile,
            forward: quotes.forward,
            strike_range: (quotes.strikes[0], quotes.strikes[quotes.strikes.len() - 1]),
        },
    };
    Ok((slice, outcome))
}

/// Builds volatility surfaces from options chains
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurfaceFitter {
    config: FitterConfig,
}

impl SurfaceFitter {
    pub fn new(config: FitterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    /// Keep a parametric slice fit, or degrade to a spline when allowed
    fn or_fallback(
        &self,
        quotes: &SliceQuotes,
        fitted: HedgeResult<(SurfaceSlice, SliceOutcome)>,
    ) -> HedgeResult<(SurfaceSlice, SliceOutcome)> {
        match fitted {
            Ok(fitted) => Ok(fitted),
            Err(e) if self.config.allow_fallback => {
                tracing::warn!(
                    "{:?} fit failed for {} ({} quotes), using spline: {}",
                    self.config.mode,
                    quotes.expiry,
                    quotes.strikes.len(),
                    e
                );
                spline_slice(quotes, Some(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn fit_slice(&self, quotes: &SliceQuotes) -> HedgeResult<(SurfaceSlice, SliceReport)> {
        let (slice, outcome) = match self.config.mode {
            FitMode::Interpolation => spline_slice(quotes, None)?,
            FitMode::Svi => self.or_fallback(quotes, svi_slice(quotes, &self.config.svi))?,
            FitMode::Polynomial { degree } => self.or_fallback(quotes, polynomial_slice(quotes, degree))?,
        };

        let report = SliceReport {
            expiry: quotes.expiry,
            tau: quotes.tau,
            quotes: quotes.strikes.len(),
            outcome,
        };
        Ok((slice, report))
    }

    /// Fit a surface to a snapshot's chain
    pub fn fit(&self, snapshot: &MarketSnapshot) -> HedgeResult<(SlicedSurface, FitReport)> {
        self.config.validate()?;
        let prepared = prepare_chain(snapshot)?;
        if prepared.slices.is_empty() {
            return Err(HedgeError::fit(format!(
                "snapshot {} has no usable quotes ({} rejected, {} expired)",
                snapshot.date, prepared.rejected_quotes, prepared.expired_quotes
            )));
        }
        if prepared.rejected_quotes > 0 {
            tracing::warn!(
                "Snapshot {}: skipped {} unusable quotes",
                snapshot.date,
                prepared.rejected_quotes
            );
        }

        let fitted: Vec<HedgeResult<(SurfaceSlice, SliceReport)>> = if self.config.parallel {
            prepared.slices.par_iter().map(|q| self.fit_slice(q)).collect()
        } else {
            prepared.slices.iter().map(|q| self.fit_slice(q)).collect()
        };

        let mut slices = Vec::with_capacity(fitted.len());
        let mut reports = Vec::with_capacity(fitted.len());
        for result in fitted {
            let (slice, report) = result?;
            slices.push(slice);
            reports.push(report);
        }

        let surface = SlicedSurface::new(snapshot.date, slices)?;
        let report = FitReport {
            date: snapshot.date,
            mode: self.config.mode,
            slices: reports,
            rejected_quotes: prepared.rejected_quotes,
            superseded_quotes: prepared.superseded_quotes,
            expired_quotes: prepared.expired_quotes,
        };

        tracing::debug!(
            "Fitted {} slices on {} ({} fallbacks)",
            report.slices.len(),
            snapshot.date,
            report.fallbacks().count()
        );

        Ok((surface, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChainQuote, ExtrapolationPolicy, VolSurface};
    use crate::data::{generate_market, SyntheticConfig};
    use crate::models::price;

    const SPOT: f64 = 100.0;
    const RATE: f64 = 0.03;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    /// Chain priced off `vol_fn(strike, tau)` with the OTM side quoted
    fn chain(expiry_days: &[i64], strikes: &[f64], vol_fn: impl Fn(f64, f64) -> f64) -> MarketSnapshot {
        let snapshot = MarketSnapshot::new(date(), SPOT, RATE);
        let mut quotes = Vec::new();
        for &days in expiry_days {
            let expiry = date() + chrono::Duration::days(days);
            let tau = snapshot.time_to(expiry);
            let forward = snapshot.forward(tau);
            for &k in strikes {
                let option_type = if k >= forward { OptionType::Call } else { OptionType::Put };
                let p = price(SPOT, k, RATE, vol_fn(k, tau), tau, option_type).unwrap();
                quotes.push(ChainQuote::from_mid(k, expiry, option_type, p));
            }
        }
        snapshot.with_quotes(quotes)
    }

    fn strikes() -> Vec<f64> {
        (0..9).map(|i| 80.0 + 5.0 * i as f64).collect()
    }

    fn svi_vol(params: SviParams) -> impl Fn(f64, f64) -> f64 {
        move |k, tau| {
            let forward = SPOT * (RATE * tau).exp();
            (params.total_variance((k / forward).ln()) / tau).sqrt()
        }
    }

    #[test]
    fn test_flat_chain_interpolation() {
        let snapshot = chain(&[30, 91, 182], &strikes(), |_, _| 0.2);
        let (surface, report) = SurfaceFitter::default().fit(&snapshot).unwrap();

        assert_eq!(report.slices.len(), 3);
        assert_eq!(report.rejected_quotes, 0);
        assert!(!report.has_fallback());
        for &k in &[80.0, 97.5, 120.0] {
            for &tau in &[0.05, 0.2, 0.4] {
                assert!((surface.vol(k, tau).unwrap() - 0.2).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_interpolation_recovers_quoted_vols() {
        let smile = |k: f64, tau: f64| 0.2 + 0.1 * ((k / 100.0).ln()).powi(2) / tau.sqrt();
        let snapshot = chain(&[60, 120], &strikes(), smile);
        let (surface, _) = SurfaceFitter::default().fit(&snapshot).unwrap();

        for slice in surface.slices() {
            for &k in &strikes() {
                assert!((slice.vol(k).unwrap() - smile(k, slice.tau)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_surface_boundary_is_flat() {
        let smile = |k: f64, _tau: f64| 0.25 - 0.001 * (k - 100.0);
        let snapshot = chain(&[30, 91], &strikes(), smile);
        let (surface, _) = SurfaceFitter::default().fit(&snapshot).unwrap();
        let (tau_lo, tau_hi) = surface.tau_range();

        assert_eq!(surface.extrapolation(), ExtrapolationPolicy::Flat);
        assert_eq!(surface.vol(10.0, tau_lo).unwrap(), surface.vol(80.0, tau_lo).unwrap());
        assert_eq!(surface.vol(400.0, tau_hi).unwrap(), surface.vol(120.0, tau_hi).unwrap());
        assert_eq!(surface.vol(100.0, 0.0).unwrap(), surface.vol(100.0, tau_lo).unwrap());
        assert_eq!(surface.vol(100.0, 5.0).unwrap(), surface.vol(100.0, tau_hi).unwrap());
    }

    #[test]
    fn test_svi_mode_fits_svi_chain() {
        let params = SviParams::new(0.005, 0.08, -0.3, 0.02, 0.15);
        let snapshot = chain(&[91], &strikes(), |k, tau| {
            let forward = SPOT * (RATE * tau).exp();
            (params.total_variance((k / forward).ln()) / tau).sqrt()
        });
        let (surface, report) = SurfaceFitter::new(FitterConfig::svi()).fit(&snapshot).unwrap();

        assert!(matches!(report.slices[0].outcome, SliceOutcome::Svi { .. }));
        let vol = svi_vol(params);
        let tau = report.slices[0].tau;
        for &k in &strikes() {
            assert!((surface.vol(k, tau).unwrap() - vol(k, tau)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_svi_fallback_is_recorded() {
        // Three strikes per slice is below the SVI minimum
        let snapshot = chain(&[91], &[95.0, 100.0, 105.0], |_, _| 0.2);

        let (surface, report) = SurfaceFitter::new(FitterConfig::svi()).fit(&snapshot).unwrap();
        assert!(report.has_fallback());
        match &report.slices[0].outcome {
            SliceOutcome::Fallback { reason, kind } => {
                assert!(reason.contains("at least 5"));
                assert_eq!(*kind, SplineKind::NaturalCubic);
            }
            other => panic!("expected fallback, got {:?}", other),
        }
        assert!((surface.vol(100.0, 0.25).unwrap() - 0.2).abs() < 1e-6);

        let strict = SurfaceFitter::new(FitterConfig::svi_strict()).fit(&snapshot);
        assert!(matches!(strict, Err(HedgeError::Fit(_))));
    }

    #[test]
    fn test_negative_spline_falls_back_to_linear() {
        let quotes = SliceQuotes {
            expiry: date(),
            tau: 0.5,
            forward: 100.0,
            strikes: vec![0.0, 1.0, 2.0, 3.0],
            vols: vec![1.0, 1.0, 0.001, 0.001],
        };
        let (slice, outcome) = spline_slice(&quotes, None).unwrap();
        assert!(matches!(outcome, SliceOutcome::Fallback { kind: SplineKind::Linear, .. }));
        assert!(slice.vol(2.5).unwrap() > 0.0);
    }

    #[test]
    fn test_unusable_quotes_are_counted() {
        let mut snapshot = chain(&[91], &strikes(), |_, _| 0.2);
        let expiry = date() + chrono::Duration::days(91);
        // Call worth more than spot, a quote without prices, and an expired quote
        snapshot.quotes.push(ChainQuote::from_mid(200.0, expiry, OptionType::Call, 150.0));
        snapshot.quotes.push(ChainQuote {
            strike: 210.0,
            expiry,
            option_type: OptionType::Call,
            bid: None,
            ask: None,
            mid: None,
            last: None,
        });
        snapshot.quotes.push(ChainQuote::from_mid(100.0, date(), OptionType::Call, 1.0));

        let (_, report) = SurfaceFitter::default().fit(&snapshot).unwrap();
        assert_eq!(report.rejected_quotes, 2);
        assert_eq!(report.superseded_quotes, 0);
        assert_eq!(report.expired_quotes, 1);
        assert_eq!(report.slices[0].quotes, strikes().len());
    }

    #[test]
    fn test_prefers_out_of_the_money_side() {
        let snapshot = MarketSnapshot::new(date(), SPOT, 0.0);
        let expiry = date() + chrono::Duration::days(365);
        let call = price(SPOT, 90.0, 0.0, 0.3, 1.0, OptionType::Call).unwrap();
        let put = price(SPOT, 90.0, 0.0, 0.2, 1.0, OptionType::Put).unwrap();
        let snapshot = snapshot.with_quotes(vec![
            ChainQuote::from_mid(90.0, expiry, OptionType::Call, call),
            ChainQuote::from_mid(90.0, expiry, OptionType::Put, put),
        ]);

        let prepared = prepare_chain(&snapshot).unwrap();
        assert_eq!(prepared.slices[0].strikes, vec![90.0]);
        assert!((prepared.slices[0].vols[0] - 0.2).abs() < 1e-8);
    }

    #[test]
    fn test_two_sided_chain_has_no_rejects() {
        let snapshot = MarketSnapshot::new(date(), SPOT, RATE);
        let expiry = date() + chrono::Duration::days(91);
        let tau = snapshot.time_to(expiry);
        let mut quotes = Vec::new();
        for &k in &strikes() {
            for option_type in [OptionType::Call, OptionType::Put] {
                let p = price(SPOT, k, RATE, 0.2, tau, option_type).unwrap();
                quotes.push(ChainQuote::from_bid_ask(k, expiry, option_type, 0.99 * p, 1.01 * p));
            }
        }
        let snapshot = snapshot.with_quotes(quotes);

        let (_, report) = SurfaceFitter::default().fit(&snapshot).unwrap();
        assert_eq!(report.rejected_quotes, 0);
        assert_eq!(report.superseded_quotes, strikes().len());
        assert_eq!(report.slices[0].quotes, strikes().len());
    }

    #[test]
    fn test_polynomial_mode() {
        let smile = |k: f64, tau: f64| {
            let x = (k / (SPOT * (RATE * tau).exp())).ln();
            0.22 - 0.15 * x + 0.6 * x * x
        };
        let snapshot = chain(&[45, 91], &strikes(), smile);
        let (surface, report) = SurfaceFitter::new(FitterConfig::polynomial(2)).fit(&snapshot).unwrap();

        assert_eq!(report.mode, FitMode::Polynomial { degree: 2 });
        for slice_report in &report.slices {
            match &slice_report.outcome {
                SliceOutcome::Polynomial { coefficients, rmse } => {
                    assert_eq!(coefficients.len(), 3);
                    assert!(*rmse < 1e-8, "rmse {}", rmse);
                }
                other => panic!("expected polynomial slice, got {:?}", other),
            }
        }
        for slice in surface.slices() {
            for &k in &strikes() {
                assert!((slice.vol(k).unwrap() - smile(k, slice.tau)).abs() < 1e-8);
            }
        }

        // Too few strikes for the degree falls back to a spline
        let thin = chain(&[91], &[95.0, 105.0], |_, _| 0.2);
        let (_, report) = SurfaceFitter::new(FitterConfig::polynomial(2)).fit(&thin).unwrap();
        assert!(report.has_fallback());

        let too_high = SurfaceFitter::new(FitterConfig::polynomial(MAX_POLY_DEGREE + 1)).fit(&snapshot);
        assert!(matches!(too_high, Err(HedgeError::InvalidInput(_))));
    }

    #[test]
    fn test_svi_fits_synthetic_market() {
        let config = SyntheticConfig {
            days: 5,
            ..SyntheticConfig::default()
        };
        let market = generate_market(&config).unwrap();
        let fitter = SurfaceFitter::new(FitterConfig::svi_strict());

        for snapshot in &market {
            let (_, report) = fitter.fit(snapshot).unwrap();
            assert_eq!(report.rejected_quotes, 0);
            assert!(!report.has_fallback());
            for slice in &report.slices {
                let SliceOutcome::Svi { rmse, .. } = slice.outcome else {
                    panic!("expected SVI slice, got {:?}", slice.outcome);
                };
                assert!(rmse < 1e-3, "{} rmse {}", slice.expiry, rmse);
                // Smooth (unfloored) slices are fitted closely
                if snapshot.date == config.start && slice.tau >= 30.0 / 365.0 {
                    assert!(rmse < 1e-4, "{} rmse {}", slice.expiry, rmse);
                }
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let params = SviParams::new(0.005, 0.08, -0.3, 0.02, 0.15);
        let snapshot = chain(&[30, 91, 182, 365], &strikes(), svi_vol(params));

        let sequential = SurfaceFitter::new(FitterConfig::svi()).fit(&snapshot).unwrap();
        let parallel = SurfaceFitter::new(FitterConfig::svi().with_parallel(true))
            .fit(&snapshot)
            .unwrap();

        assert_eq!(
            serde_json::to_string(&sequential.0).unwrap(),
            serde_json::to_string(&parallel.0).unwrap()
        );
        assert_eq!(sequential.1, parallel.1);
    }

    #[test]
    fn test_empty_chain_is_fit_error() {
        let snapshot = MarketSnapshot::new(date(), SPOT, RATE);
        assert!(matches!(SurfaceFitter::default().fit(&snapshot), Err(HedgeError::Fit(_))));
    }
}
