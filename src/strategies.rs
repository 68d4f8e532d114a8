//! Strategy builders
//!
//! Factory functions assembling common option structures into validated
//! [`Position`]s with no initial hedge. `contracts` is the number of
//! contracts per long leg and must be positive.

use chrono::NaiveDate;

use crate::core::{HedgeError, HedgeResult, OptionContract, OptionType, Position, PositionLeg};

fn check_contracts(contracts: f64) -> HedgeResult<()> {
    if !contracts.is_finite() || contracts <= 0.0 {
        return Err(HedgeError::invalid_input(format!(
            "contracts must be positive, got {}",
            contracts
        )));
    }
    Ok(())
}

fn check_ascending(strikes: &[f64], strict: bool, name: &str) -> HedgeResult<()> {
    let ordered = strikes
        .windows(2)
        .all(|w| if strict { w[0] < w[1] } else { w[0] <= w[1] });
    if !ordered {
        return Err(HedgeError::invalid_input(format!(
            "{} strikes out of order: {:?}",
            name, strikes
        )));
    }
    Ok(())
}

fn leg(underlying: &str, strike: f64, expiry: NaiveDate, option_type: OptionType, quantity: f64) -> PositionLeg {
    PositionLeg::new(OptionContract::new(underlying, strike, expiry, option_type), quantity)
}

fn single(underlying: &str, strike: f64, expiry: NaiveDate, option_type: OptionType, quantity: f64) -> HedgeResult<Position> {
    Position::new(vec![leg(underlying, strike, expiry, option_type, quantity)])
}

pub fn long_call(underlying: &str, strike: f64, expiry: NaiveDate, contracts: f64) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    single(underlying, strike, expiry, OptionType::Call, contracts)
}

pub fn long_put(underlying: &str, strike: f64, expiry: NaiveDate, contracts: f64) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    single(underlying, strike, expiry, OptionType::Put, contracts)
}

pub fn short_call(underlying: &str, strike: f64, expiry: NaiveDate, contracts: f64) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    single(underlying, strike, expiry, OptionType::Call, -contracts)
}

pub fn short_put(underlying: &str, strike: f64, expiry: NaiveDate, contracts: f64) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    single(underlying, strike, expiry, OptionType::Put, -contracts)
}

/// Long call and long put at the same strike
pub fn long_straddle(underlying: &str, strike: f64, expiry: NaiveDate, contracts: f64) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    Position::new(vec![
        leg(underlying, strike, expiry, OptionType::Call, contracts),
        leg(underlying, strike, expiry, OptionType::Put, contracts),
    ])
}

/// Short call and short put at the same strike
pub fn short_straddle(underlying: &str, strike: f64, expiry: NaiveDate, contracts: f64) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    Position::new(vec![
        leg(underlying, strike, expiry, OptionType::Call, -contracts),
        leg(underlying, strike, expiry, OptionType::Put, -contracts),
    ])
}

/// Long OTM put and long OTM call (put strike below call strike)
pub fn long_strangle(
    underlying: &str,
    put_strike: f64,
    call_strike: f64,
    expiry: NaiveDate,
    contracts: f64,
) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    check_ascending(&[put_strike, call_strike], true, "strangle")?;
    Position::new(vec![
        leg(underlying, call_strike, expiry, OptionType::Call, contracts),
        leg(underlying, put_strike, expiry, OptionType::Put, contracts),
    ])
}

/// Long lower-strike call, short higher-strike call
pub fn bull_call_spread(
    underlying: &str,
    lower_strike: f64,
    upper_strike: f64,
    expiry: NaiveDate,
    contracts: f64,
) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    check_ascending(&[lower_strike, upper_strike], true, "bull call spread")?;
    Position::new(vec![
        leg(underlying, lower_strike, expiry, OptionType::Call, contracts),
        leg(underlying, upper_strike, expiry, OptionType::Call, -contracts),
    ])
}

/// Long higher-strike put, short lower-strike put
pub fn bear_put_spread(
    underlying: &str,
    lower_strike: f64,
    upper_strike: f64,
    expiry: NaiveDate,
    contracts: f64,
) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    check_ascending(&[lower_strike, upper_strike], true, "bear put spread")?;
    Position::new(vec![
        leg(underlying, upper_strike, expiry, OptionType::Put, contracts),
        leg(underlying, lower_strike, expiry, OptionType::Put, -contracts),
    ])
}

/// Strikes of an iron condor, ascending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CondorStrikes {
    /// Long put wing
    pub put_wing: f64,
    /// Short put
    pub put_short: f64,
    /// Short call
    pub call_short: f64,
    /// Long call wing
    pub call_wing: f64,
}

/// Short put spread plus short call spread; profits if spot stays between
/// the short strikes
pub fn iron_condor(underlying: &str, strikes: CondorStrikes, expiry: NaiveDate, contracts: f64) -> HedgeResult<Position> {
    check_contracts(contracts)?;
    check_ascending(&[strikes.put_wing, strikes.put_short], true, "iron condor")?;
    check_ascending(&[strikes.put_short, strikes.call_short], false, "iron condor")?;
    check_ascending(&[strikes.call_short, strikes.call_wing], true, "iron condor")?;
    Position::new(vec![
        leg(underlying, strikes.put_wing, expiry, OptionType::Put, contracts),
        leg(underlying, strikes.put_short, expiry, OptionType::Put, -contracts),
        leg(underlying, strikes.call_short, expiry, OptionType::Call, -contracts),
        leg(underlying, strikes.call_wing, expiry, OptionType::Call, contracts),
    ])
}
