//! Option contract definitions
//!
//! European vanilla options on a single underlying.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{HedgeError, HedgeResult};

/// Calendar days per year used for every time-to-expiry in the crate (ACT/365)
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Default contract size (shares per contract)
pub const DEFAULT_MULTIPLIER: f64 = 100.0;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

/// Year fraction between two dates (negative when `to` is before `from`)
pub fn year_fraction(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_YEAR
}

/// Option contract specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Underlying symbol (e.g., "SPY")
    pub underlying: String,
    /// Strike price
    pub strike: f64,
    /// Expiration date
    pub expiry: NaiveDate,
    /// Option type (Call/Put)
    pub option_type: OptionType,
    /// Contract multiplier (100 for equity options)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    DEFAULT_MULTIPLIER
}

impl OptionContract {
    /// Create a new European option with the standard 100-share multiplier
    pub fn new(
        underlying: impl Into<String>,
        strike: f64,
        expiry: NaiveDate,
        option_type: OptionType,
    ) -> Self {
        Self {
            underlying: underlying.into(),
            strike,
            expiry,
            option_type,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }

    /// Override the contract multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Check strike and multiplier are usable
    pub fn validate(&self) -> HedgeResult<()> {
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(HedgeError::invalid_input(format!(
                "strike must be positive, got {}",
                self.strike
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(HedgeError::invalid_input(format!(
                "multiplier must be positive, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Time to expiry in years from the given date (negative once expired)
    pub fn time_to_expiry(&self, from: NaiveDate) -> f64 {
        year_fraction(from, self.expiry)
    }

    /// Past expiry at the given date (expiry day itself is still live)
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        as_of > self.expiry
    }
}
