//! Synthetic market generator
//!
//! Deterministic (seeded) market data for demos and tests:
//! - GBM spot path on calendar days
//! - Daily options chains priced with Black-Scholes off a parametric smile
//!
//! Smile: σ(m, T) = base + skew·m + smile·m² + term·√T, floored, with
//! m = ln(K/S). Bid/ask spread widens away from the money.

use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::core::{
    year_fraction, ChainQuote, HedgeError, HedgeResult, MarketSnapshot, OptionType, DAYS_PER_YEAR,
};
use crate::models::black_scholes;

/// Synthetic market parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// First snapshot date
    pub start: NaiveDate,
    /// Number of daily snapshots
    pub days: usize,
    pub initial_spot: f64,
    /// Realized (path) volatility
    pub annual_vol: f64,
    pub annual_drift: f64,
    pub rate: f64,
    /// Smile level
    pub base_vol: f64,
    /// Slope in log-moneyness
    pub skew: f64,
    /// Curvature in log-moneyness
    pub smile: f64,
    /// Term-structure coefficient on √T
    pub term_slope: f64,
    pub vol_floor: f64,
    /// Listed expiries, in days after `start`
    pub expiry_days: Vec<i64>,
    /// Strikes per expiry
    pub num_strikes: usize,
    /// Strike range as a fraction of spot (±)
    pub strike_width: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or(NaiveDate::MIN),
            days: 30,
            initial_spot: 470.0,
            annual_vol: 0.18,
            annual_drift: 0.08,
            rate: 0.05,
            base_vol: 0.18,
            skew: -0.12,
            smile: 0.08,
            term_slope: 0.02,
            vol_floor: 0.05,
            expiry_days: vec![7, 14, 30, 45, 60, 90],
            num_strikes: 15,
            strike_width: 0.15,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> HedgeResult<()> {
        if self.days == 0 {
            return Err(HedgeError::invalid_input("synthetic market needs at least one day"));
        }
        if !(self.initial_spot > 0.0) || !(self.annual_vol >= 0.0) || !(self.vol_floor > 0.0) {
            return Err(HedgeError::invalid_input(
                "initial spot and vol floor must be positive, path vol >= 0",
            ));
        }
        if self.num_strikes < 2 || !(self.strike_width > 0.0 && self.strike_width < 1.0) {
            return Err(HedgeError::invalid_input(
                "need at least 2 strikes and a strike width in (0, 1)",
            ));
        }
        Ok(())
    }

    /// Smile implied vol at a strike for the given spot and time to expiry
    pub fn smile_vol(&self, spot: f64, strike: f64, tau: f64) -> f64 {
        let m = (strike / spot).ln();
        let vol = self.base_vol + self.skew * m + self.smile * m * m + self.term_slope * tau.sqrt();
        vol.max(self.vol_floor)
    }

    /// Listed expiry dates
    pub fn expiries(&self) -> Vec<NaiveDate> {
        self.expiry_days
            .iter()
            .map(|&d| self.start + chrono::Duration::days(d))
            .collect()
    }
}

/// GBM spot path, one point per calendar day starting at `config.start`
pub fn generate_spot_path(config: &SyntheticConfig) -> Vec<(NaiveDate, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let dt = 1.0 / DAYS_PER_YEAR;
    let drift = (config.annual_drift - 0.5 * config.annual_vol * config.annual_vol) * dt;
    let diffusion = config.annual_vol * dt.sqrt();

    let mut spot = config.initial_spot;
    let mut path = Vec::with_capacity(config.days);
    for day in 0..config.days {
        if day > 0 {
            let z: f64 = Distribution::<f64>::sample(&StandardNormal, &mut rng);
            spot *= (drift + diffusion * z).exp();
        }
        path.push((config.start + chrono::Duration::days(day as i64), spot));
    }
    path
}

/// Call and put quotes for every live listed expiry on `date`
pub fn generate_chain(config: &SyntheticConfig, date: NaiveDate, spot: f64) -> HedgeResult<Vec<ChainQuote>> {
    let mut quotes = Vec::new();
    let low = spot * (1.0 - config.strike_width);
    let step = 2.0 * config.strike_width * spot / (config.num_strikes - 1) as f64;

    for expiry in config.expiries() {
        let tau = year_fraction(date, expiry);
        if tau <= 0.0 {
            continue;
        }
        for i in 0..config.num_strikes {
            let strike = low + step * i as f64;
            let vol = config.smile_vol(spot, strike, tau);
            let m = (strike / spot).ln();
            let spread_pct = 0.02 + 0.03 * m.abs();

            for option_type in [OptionType::Call, OptionType::Put] {
                let price = black_scholes::price(spot, strike, config.rate, vol, tau, option_type)?;
                let spread = price * spread_pct;
                let bid = (price - spread / 2.0).max(0.01);
                let ask = (price + spread / 2.0).max(bid);
                quotes.push(ChainQuote::from_bid_ask(strike, expiry, option_type, bid, ask));
            }
        }
    }
    Ok(quotes)
}

/// Full synthetic market: spot path plus a chain per day
pub fn generate_market(config: &SyntheticConfig) -> HedgeResult<Vec<MarketSnapshot>> {
    config.validate()?;

    let snapshots = generate_spot_path(config)
        .into_iter()
        .map(|(date, spot)| {
            let quotes = generate_chain(config, date, spot)?;
            Ok(MarketSnapshot::new(date, spot, config.rate).with_quotes(quotes))
        })
        .collect::<HedgeResult<Vec<_>>>()?;

    tracing::info!(
        "Generated {} synthetic snapshots from {} (seed {})",
        snapshots.len(),
        config.start,
        config.seed
    );
    Ok(snapshots)
}
