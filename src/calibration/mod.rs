//! Surface Calibration
//!
//! Fits implied volatility surfaces from options chains, either by
//! strike-wise spline interpolation or per-slice SVI.

pub mod fitter;
pub mod sliced;

pub use fitter::*;
pub use sliced::*;
