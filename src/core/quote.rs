//! Option quote data
//!
//! Market snapshots: spot, rate and the options chain seen on one date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{HedgeError, HedgeResult};
use super::option::{year_fraction, OptionType};

/// One quoted point of an options chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainQuote {
    /// Strike price
    pub strike: f64,
    /// Expiration date
    pub expiry: NaiveDate,
    /// Option type (Call/Put)
    pub option_type: OptionType,
    /// Bid price
    #[serde(default)]
    pub bid: Option<f64>,
    /// Ask price
    #[serde(default)]
    pub ask: Option<f64>,
    /// Mid price (if provided)
    #[serde(default)]
    pub mid: Option<f64>,
    /// Last traded price
    #[serde(default)]
    pub last: Option<f64>,
}

impl ChainQuote {
    /// Quote with only a mid price
    pub fn from_mid(strike: f64, expiry: NaiveDate, option_type: OptionType, mid: f64) -> Self {
        Self {
            strike,
            expiry,
            option_type,
            bid: None,
            ask: None,
            mid: Some(mid),
            last: None,
        }
    }

    /// Quote with bid and ask
    pub fn from_bid_ask(
        strike: f64,
        expiry: NaiveDate,
        option_type: OptionType,
        bid: f64,
        ask: f64,
    ) -> Self {
        Self {
            strike,
            expiry,
            option_type,
            bid: Some(bid),
            ask: Some(ask),
            mid: None,
            last: None,
        }
    }

    /// Best available price (mid > bid/ask midpoint > last)
    pub fn best_price(&self) -> Option<f64> {
        let midpoint = match (self.bid, self.ask) {
            (Some(b), Some(a)) if a >= b => Some((b + a) / 2.0),
            _ => None,
        };
        self.mid
            .or(midpoint)
            .or(self.last)
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Bid-ask spread
    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some(a - b),
            _ => None,
        }
    }
}

/// Market state on a single simulated day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Snapshot date
    pub date: NaiveDate,
    /// Underlying spot price
    pub spot: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Options chain quotes
    #[serde(default)]
    pub quotes: Vec<ChainQuote>,
}

impl MarketSnapshot {
    pub fn new(date: NaiveDate, spot: f64, rate: f64) -> Self {
        Self {
            date,
            spot,
            rate,
            quotes: Vec::new(),
        }
    }

    /// Attach a chain
    pub fn with_quotes(mut self, quotes: Vec<ChainQuote>) -> Self {
        self.quotes = quotes;
        self
    }

    /// Time to expiry in years from this snapshot's date
    pub fn time_to(&self, expiry: NaiveDate) -> f64 {
        year_fraction(self.date, expiry)
    }

    /// Forward price for a given time to expiry
    pub fn forward(&self, tau: f64) -> f64 {
        self.spot * (self.rate * tau).exp()
    }

    /// Distinct quoted expiries, ascending
    pub fn expiries(&self) -> Vec<NaiveDate> {
        let mut expiries: Vec<NaiveDate> = self.quotes.iter().map(|q| q.expiry).collect();
        expiries.sort();
        expiries.dedup();
        expiries
    }

    /// Check spot and rate are usable
    pub fn validate(&self) -> HedgeResult<()> {
        if !self.spot.is_finite() || self.spot <= 0.0 {
            return Err(HedgeError::invalid_input(format!(
                "snapshot {}: spot must be positive, got {}",
                self.date, self.spot
            )));
        }
        if !self.rate.is_finite() {
            return Err(HedgeError::invalid_input(format!(
                "snapshot {}: rate must be finite",
                self.date
            )));
        }
        Ok(())
    }
}

/// Check a snapshot series is strictly chronological with valid entries
pub fn validate_series(snapshots: &[MarketSnapshot]) -> HedgeResult<()> {
    for snapshot in snapshots {
        snapshot.validate()?;
    }
    for pair in snapshots.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(HedgeError::invalid_input(format!(
                "snapshots out of order: {} follows {}",
                pair[1].date, pair[0].date
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_best_price() {
        let expiry = date(31);
        let q = ChainQuote::from_bid_ask(100.0, expiry, OptionType::Call, 2.0, 2.4);
        assert!((q.best_price().unwrap() - 2.2).abs() < 1e-12);
        assert!((q.spread().unwrap() - 0.4).abs() < 1e-12);

        let q = ChainQuote::from_mid(100.0, expiry, OptionType::Call, 0.0);
        assert!(q.best_price().is_none());

        let mut q = ChainQuote::from_bid_ask(100.0, expiry, OptionType::Put, 2.0, 2.4);
        q.mid = Some(2.3);
        assert_eq!(q.best_price(), Some(2.3));
    }

    #[test]
    fn test_series_ordering() {
        let s1 = MarketSnapshot::new(date(2), 100.0, 0.05);
        let s2 = MarketSnapshot::new(date(3), 101.0, 0.05);
        assert!(validate_series(&[s1.clone(), s2.clone()]).is_ok());
        assert!(validate_series(&[s2.clone(), s1.clone()]).is_err());
        assert!(validate_series(&[s1.clone(), s1]).is_err());
    }

    #[test]
    fn test_expiries_dedup() {
        let snap = MarketSnapshot::new(date(2), 100.0, 0.05).with_quotes(vec![
            ChainQuote::from_mid(100.0, date(31), OptionType::Call, 2.0),
            ChainQuote::from_mid(105.0, date(31), OptionType::Call, 1.0),
            ChainQuote::from_mid(100.0, date(20), OptionType::Put, 1.5),
        ]);
        assert_eq!(snap.expiries(), vec![date(20), date(31)]);
        assert!((snap.time_to(date(31)) - 29.0 / 365.0).abs() < 1e-12);
    }
}
