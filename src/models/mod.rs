//! Pricing and Smile Models
//!
//! Implements:
//! - Black-Scholes (pricing, Greeks, implied volatility)
//! - Natural cubic spline (strike-wise smile interpolation)
//! - Raw SVI (parametric smile fit)
//! - Polynomial smile in log-moneyness

mod linalg;

pub mod black_scholes;
pub mod polynomial;
pub mod spline;
pub mod svi;

pub use black_scholes::*;
pub use polynomial::*;
pub use spline::*;
pub use svi::*;
