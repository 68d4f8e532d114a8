//! Hedged option positions
//!
//! A position is a fixed set of option legs plus a share hedge in the
//! underlying. Only the hedge changes during a simulation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{HedgeError, HedgeResult};
use super::option::OptionContract;

/// One option leg: a contract and a signed number of contracts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLeg {
    pub contract: OptionContract,
    /// Contracts held; positive = long, negative = short
    pub quantity: f64,
}

impl PositionLeg {
    pub fn new(contract: OptionContract, quantity: f64) -> Self {
        Self { contract, quantity }
    }

    /// Shares of exposure per unit of option value (quantity × multiplier)
    pub fn exposure(&self) -> f64 {
        self.quantity * self.contract.multiplier
    }
}

/// Option legs plus underlying hedge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    legs: Vec<PositionLeg>,
    hedge_shares: f64,
}

/// Unvalidated wire form of [`Position`]
#[derive(Deserialize)]
struct RawPosition {
    legs: Vec<PositionLeg>,
    #[serde(default)]
    hedge_shares: f64,
}

impl TryFrom<RawPosition> for Position {
    type Error = HedgeError;

    fn try_from(raw: RawPosition) -> HedgeResult<Self> {
        Position::new(raw.legs)?.with_hedge(raw.hedge_shares)
    }
}

impl Position {
    /// Build a position, rejecting empty, zero-quantity or mixed-underlying legs
    pub fn new(legs: Vec<PositionLeg>) -> HedgeResult<Self> {
        if legs.is_empty() {
            return Err(HedgeError::invalid_input("position needs at least one leg"));
        }

        for leg in &legs {
            leg.contract.validate()?;
            if !leg.quantity.is_finite() || leg.quantity == 0.0 {
                return Err(HedgeError::invalid_input(format!(
                    "leg {} {:?} has invalid quantity {}",
                    leg.contract.strike, leg.contract.option_type, leg.quantity
                )));
            }
        }

        let underlying = &legs[0].contract.underlying;
        if legs.iter().any(|l| &l.contract.underlying != underlying) {
            return Err(HedgeError::invalid_input(
                "all legs must share one underlying",
            ));
        }

        Ok(Self {
            legs,
            hedge_shares: 0.0,
        })
    }

    /// Single-leg position
    pub fn single(contract: OptionContract, quantity: f64) -> HedgeResult<Self> {
        Self::new(vec![PositionLeg::new(contract, quantity)])
    }

    /// Start with an existing share hedge
    pub fn with_hedge(mut self, shares: f64) -> HedgeResult<Self> {
        if !shares.is_finite() {
            return Err(HedgeError::invalid_input("hedge shares must be finite"));
        }
        self.hedge_shares = shares;
        Ok(self)
    }

    pub fn legs(&self) -> &[PositionLeg] {
        &self.legs
    }

    pub fn hedge_shares(&self) -> f64 {
        self.hedge_shares
    }

    pub(crate) fn set_hedge_shares(&mut self, shares: f64) {
        self.hedge_shares = shares;
    }

    pub fn underlying(&self) -> &str {
        &self.legs[0].contract.underlying
    }

    /// Earliest leg expiry
    pub fn first_expiry(&self) -> NaiveDate {
        self.legs
            .iter()
            .map(|l| l.contract.expiry)
            .min()
            .unwrap_or(NaiveDate::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_position_validation() {
        let call = OptionContract::new("SPY", 100.0, expiry(), OptionType::Call);
        assert!(Position::new(vec![]).is_err());
        assert!(Position::single(call.clone(), 0.0).is_err());
        assert!(Position::single(call.clone(), f64::NAN).is_err());

        let other = OptionContract::new("QQQ", 100.0, expiry(), OptionType::Put);
        let mixed = Position::new(vec![
            PositionLeg::new(call.clone(), 1.0),
            PositionLeg::new(other, 1.0),
        ]);
        assert!(mixed.is_err());

        let pos = Position::single(call, -2.0).unwrap().with_hedge(50.0).unwrap();
        assert_eq!(pos.hedge_shares(), 50.0);
        assert_eq!(pos.legs()[0].exposure(), -200.0);
        assert_eq!(pos.underlying(), "SPY");
    }

    #[test]
    fn test_deserialize_validates() {
        let call = OptionContract::new("SPY", 100.0, expiry(), OptionType::Call);
        let pos = Position::single(call, 2.0).unwrap().with_hedge(-80.0).unwrap();
        let json = serde_json::to_string(&pos).unwrap();
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pos);

        let empty: Result<Position, _> = serde_json::from_str(r#"{"legs": [], "hedge_shares": 0.0}"#);
        let err = empty.unwrap_err().to_string();
        assert!(err.contains("at least one leg"), "{}", err);

        let mut value = serde_json::to_value(&pos).unwrap();
        value["legs"][0]["quantity"] = serde_json::json!(0.0);
        assert!(serde_json::from_value::<Position>(value).is_err());
    }

    #[test]
    fn test_first_expiry() {
        let near = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        let pos = Position::new(vec![
            PositionLeg::new(OptionContract::new("SPY", 100.0, expiry(), OptionType::Call), 1.0),
            PositionLeg::new(OptionContract::new("SPY", 100.0, near, OptionType::Call), -1.0),
        ])
        .unwrap();
        assert_eq!(pos.first_expiry(), near);
    }
}
