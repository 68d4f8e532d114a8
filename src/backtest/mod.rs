//! Delta-Hedging Backtest
//!
//! - [`HedgingEngine`]: day-by-day hedge rebalancing over market snapshots
//! - [`PnlAttribution`]: Greek decomposition of the realized P&L
//! - [`HedgeSummary`]: aggregate statistics of a run

pub mod attribution;
pub mod config;
pub mod hedger;
pub mod summary;

pub use attribution::*;
pub use config::*;
pub use hedger::*;
pub use summary::*;
