//! Black-Scholes Model
//!
//! Provides:
//! - European option pricing
//! - Greeks computation
//! - Implied volatility solver (safeguarded Newton-Raphson inside a bisection bracket)
//!
//! Every entry point validates its inputs and fails with a domain error rather
//! than returning NaN. At expiry (tau = 0) prices collapse to intrinsic value.

use std::sync::OnceLock;

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::core::{Greeks, HedgeError, HedgeResult, OptionType};

/// Lower end of the implied-vol search bracket
pub const IV_VOL_LOWER: f64 = 1e-4;
/// Upper end of the implied-vol search bracket
pub const IV_VOL_UPPER: f64 = 5.0;
/// Relative price gap below which a bracket endpoint is indistinguishable
/// from the market price
pub const IV_PRICE_TOL: f64 = 1e-12;
/// Vol step (or bracket width) at which the solver stops refining
pub const IV_VOL_TOL: f64 = 1e-12;
/// Iteration cap
pub const IV_MAX_ITER: usize = 200;

fn standard_normal() -> &'static Normal {
    static STANDARD: OnceLock<Normal> = OnceLock::new();
    STANDARD.get_or_init(|| match Normal::new(0.0, 1.0) {
        Ok(normal) => normal,
        Err(_) => unreachable!("unit normal parameters are valid"),
    })
}

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    standard_normal().cdf(x)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    standard_normal().pdf(x)
}

/// Black-Scholes d1 parameter
pub fn d1(spot: f64, strike: f64, rate: f64, vol: f64, tau: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * vol * vol) * tau) / (vol * tau.sqrt())
}

/// Black-Scholes d2 parameter
pub fn d2(spot: f64, strike: f64, rate: f64, vol: f64, tau: f64) -> f64 {
    d1(spot, strike, rate, vol, tau) - vol * tau.sqrt()
}

fn validate_inputs(spot: f64, strike: f64, rate: f64, vol: f64, tau: f64) -> HedgeResult<()> {
    if !spot.is_finite() || spot <= 0.0 {
        return Err(HedgeError::domain(format!("spot must be positive, got {}", spot)));
    }
    if !strike.is_finite() || strike <= 0.0 {
        return Err(HedgeError::domain(format!("strike must be positive, got {}", strike)));
    }
    if !vol.is_finite() || vol <= 0.0 {
        return Err(HedgeError::domain(format!("vol must be positive, got {}", vol)));
    }
    if !tau.is_finite() || tau < 0.0 {
        return Err(HedgeError::domain(format!("time to expiry must be >= 0, got {}", tau)));
    }
    if !rate.is_finite() {
        return Err(HedgeError::domain("rate must be finite"));
    }
    Ok(())
}

/// Price with inputs already validated
fn raw_price(spot: f64, strike: f64, rate: f64, vol: f64, tau: f64, option_type: OptionType) -> f64 {
    if tau == 0.0 {
        return option_type.intrinsic(spot, strike);
    }

    let d1 = d1(spot, strike, rate, vol, tau);
    let d2 = d1 - vol * tau.sqrt();
    let df = (-rate * tau).exp();

    match option_type {
        OptionType::Call => spot * norm_cdf(d1) - strike * df * norm_cdf(d2),
        OptionType::Put => strike * df * norm_cdf(-d2) - spot * norm_cdf(-d1),
    }
}

/// Black-Scholes European option price
pub fn price(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    tau: f64,
    option_type: OptionType,
) -> HedgeResult<f64> {
    validate_inputs(spot, strike, rate, vol, tau)?;
    Ok(raw_price(spot, strike, rate, vol, tau, option_type))
}

/// Black-Scholes Greeks (raw derivatives: theta per year, vega per unit vol)
pub fn greeks(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    tau: f64,
    option_type: OptionType,
) -> HedgeResult<Greeks> {
    validate_inputs(spot, strike, rate, vol, tau)?;

    if tau == 0.0 {
        // Delta is the payoff slope; exactly at the money it is 0
        let delta = match option_type {
            OptionType::Call => {
                if spot > strike {
                    1.0
                } else {
                    0.0
                }
            }
            OptionType::Put => {
                if spot < strike {
                    -1.0
                } else {
                    0.0
                }
            }
        };
        return Ok(Greeks::new(delta, 0.0, 0.0, 0.0, 0.0));
    }

    let d1 = d1(spot, strike, rate, vol, tau);
    let d2 = d1 - vol * tau.sqrt();
    let df = (-rate * tau).exp();
    let sqrt_t = tau.sqrt();
    let pdf_d1 = norm_pdf(d1);

    let delta = match option_type {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    };

    // Gamma and vega are the same for call and put
    let gamma = pdf_d1 / (spot * vol * sqrt_t);
    let vega = spot * pdf_d1 * sqrt_t;

    let decay = -spot * pdf_d1 * vol / (2.0 * sqrt_t);
    let theta = match option_type {
        OptionType::Call => decay - rate * strike * df * norm_cdf(d2),
        OptionType::Put => decay + rate * strike * df * norm_cdf(-d2),
    };

    let rho = match option_type {
        OptionType::Call => strike * tau * df * norm_cdf(d2),
        OptionType::Put => -strike * tau * df * norm_cdf(-d2),
    };

    Ok(Greeks::new(delta, gamma, theta, vega, rho))
}

/// Implied volatility from a market price.
///
/// Searches [`IV_VOL_LOWER`, `IV_VOL_UPPER`]. A Newton step is taken only when
/// it lands inside the current bracket and at least halves the previous step,
/// otherwise the bracket is bisected, so the bracket always narrows. Stops
/// once the vol step falls below [`IV_VOL_TOL`].
///
/// Fails with a convergence error when the price is not attainable by any vol
/// in the bracket, or when it cannot be told apart from the price at a bracket
/// end (no vega left to identify the vol).
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    rate: f64,
    tau: f64,
    option_type: OptionType,
) -> HedgeResult<f64> {
    validate_inputs(spot, strike, rate, IV_VOL_LOWER, tau)?;
    if !market_price.is_finite() || market_price <= 0.0 {
        return Err(HedgeError::domain(format!(
            "market price must be positive, got {}",
            market_price
        )));
    }
    if tau == 0.0 {
        return Err(HedgeError::domain("implied vol is undefined at expiry"));
    }

    let df = (-rate * tau).exp();
    let upper_bound = match option_type {
        OptionType::Call => spot,
        OptionType::Put => strike * df,
    };
    if market_price >= upper_bound {
        return Err(HedgeError::convergence(format!(
            "price {:.6} at or above no-arbitrage bound {:.6}",
            market_price, upper_bound
        )));
    }

    let mut low = IV_VOL_LOWER;
    let mut high = IV_VOL_UPPER;
    let price_tol = IV_PRICE_TOL * market_price;
    let f_low = raw_price(spot, strike, rate, low, tau, option_type) - market_price;
    let f_high = raw_price(spot, strike, rate, high, tau, option_type) - market_price;

    if f_low > 0.0 || f_high < 0.0 {
        return Err(HedgeError::convergence(format!(
            "price {:.6e} not attainable for vol in [{}, {}]",
            market_price, IV_VOL_LOWER, IV_VOL_UPPER
        )));
    }
    if f_low >= -price_tol || f_high <= price_tol {
        return Err(HedgeError::convergence(format!(
            "price {:.6e} is indistinguishable from a bracket-end price, vol is not identifiable",
            market_price
        )));
    }

    // Initial guess using Brenner-Subrahmanyam approximation
    let guess = market_price / (0.4 * spot * tau.sqrt());
    let mut vol = if guess > low && guess < high {
        guess
    } else {
        0.5 * (low + high)
    };
    let mut last_step = high - low;

    for _ in 0..IV_MAX_ITER {
        let diff = raw_price(spot, strike, rate, vol, tau, option_type) - market_price;
        if diff == 0.0 {
            return Ok(vol);
        }

        // Price is increasing in vol
        if diff > 0.0 {
            high = vol;
        } else {
            low = vol;
        }

        let vega = spot * norm_pdf(d1(spot, strike, rate, vol, tau)) * tau.sqrt();
        let newton = vol - diff / vega;
        let use_newton = vega > 0.0
            && newton.is_finite()
            && newton > low
            && newton < high
            && (2.0 * diff).abs() <= (last_step * vega).abs();

        let next = if use_newton { newton } else { 0.5 * (low + high) };
        last_step = (next - vol).abs();
        vol = next;

        if last_step < IV_VOL_TOL || high - low < IV_VOL_TOL {
            return Ok(vol);
        }
    }

    Err(HedgeError::convergence(format!(
        "implied vol did not converge in {} iterations",
        IV_MAX_ITER
    )))
}
