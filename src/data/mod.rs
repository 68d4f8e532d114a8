//! Market data
//!
//! Handles:
//! - JSON storage of snapshot series
//! - Seeded synthetic markets (GBM spot, smile-priced chains)

pub mod store;
pub mod synthetic;

pub use store::*;
pub use synthetic::*;
