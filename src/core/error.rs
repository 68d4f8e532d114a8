//! Error types for the hedging backtester

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HedgeError {
    /// Invalid pricing inputs (non-positive spot/strike/vol, negative time)
    #[error("Domain error: {0}")]
    Domain(String),

    /// Root-find or optimizer ran out of iterations, or had no bracket
    #[error("Convergence error: {0}")]
    Convergence(String),

    /// Not enough data, or a surface slice could not be fitted
    #[error("Fit error: {0}")]
    Fit(String),

    #[error("Option {underlying} {strike} expired on {expiry}, simulation is at {date}")]
    ExpiredOption {
        underlying: String,
        strike: f64,
        expiry: NaiveDate,
        date: NaiveDate,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type HedgeResult<T> = Result<T, HedgeError>;

impl HedgeError {
    pub fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }

    pub fn convergence(msg: impl Into<String>) -> Self {
        Self::Convergence(msg.into())
    }

    pub fn fit(msg: impl Into<String>) -> Self {
        Self::Fit(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for HedgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
