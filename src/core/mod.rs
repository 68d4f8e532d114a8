//! Core data types for the hedging backtester
//!
//! Defines fundamental types:
//! - OptionContract: Strike, expiry, type (call/put)
//! - Greeks: Sensitivity snapshot
//! - MarketSnapshot / ChainQuote: Daily market state and options chain
//! - Position: Option legs plus underlying hedge
//! - VolSurface: Implied volatility query interface

pub mod option;
pub mod quote;
pub mod surface;
pub mod greeks;
pub mod position;
pub mod error;

pub use option::*;
pub use quote::*;
pub use surface::*;
pub use greeks::*;
pub use position::*;
pub use error::*;
