//! Example: Black-Scholes pricing, Greeks and implied volatility
//!
//! Run with: cargo run --example basic_pricing

use delta_hedge::prelude::*;

fn main() -> HedgeResult<()> {
    let spot = 500.0;
    let strike = 505.0;
    let tau = 0.25; // 3 months
    let rate = 0.05;
    let vol = 0.20;

    println!("=== Black-Scholes Pricing ===\n");
    println!("Spot:     ${:.2}", spot);
    println!("Strike:   ${:.2}", strike);
    println!("Time:     {:.2} years ({:.0} days)", tau, tau * 365.0);
    println!("Rate:     {:.1}%", rate * 100.0);
    println!("Vol:      {:.1}%\n", vol * 100.0);

    let call_price = bs_price(spot, strike, rate, vol, tau, OptionType::Call)?;
    let put_price = bs_price(spot, strike, rate, vol, tau, OptionType::Put)?;
    println!("Call Price: ${:.4}", call_price);
    println!("Put Price:  ${:.4}", put_price);

    // C - P = S - K*e^(-rT)
    let parity_lhs = call_price - put_price;
    let parity_rhs = spot - strike * (-rate * tau).exp();
    println!("\nPut-Call Parity Check:");
    println!("  C - P = {:.4}", parity_lhs);
    println!("  S - K*e^(-rT) = {:.4}", parity_rhs);
    println!("  Difference: {:.2e}", (parity_lhs - parity_rhs).abs());

    println!("\n=== Greeks (Call) ===\n");
    let greeks = bs_greeks(spot, strike, rate, vol, tau, OptionType::Call)?;
    println!("Delta:  {:.4}", greeks.delta);
    println!("Gamma:  {:.4}", greeks.gamma);
    println!("Theta:  {:.4} (per day: {:.4})", greeks.theta, greeks.theta_per_day());
    println!("Vega:   {:.4} (per vol point: {:.4})", greeks.vega, greeks.vega_per_point());
    println!("Rho:    {:.4}", greeks.rho);

    println!("\n=== At Expiry ===\n");
    let expiring = bs_greeks(spot, strike, rate, vol, 0.0, OptionType::Put)?;
    println!(
        "Put at tau=0: price {:.2}, delta {}, vega {}",
        bs_price(spot, strike, rate, vol, 0.0, OptionType::Put)?,
        expiring.delta,
        expiring.vega
    );

    println!("\n=== Implied Volatility ===\n");
    let market_price = call_price + 0.50;
    match implied_volatility(market_price, spot, strike, rate, tau, OptionType::Call) {
        Ok(iv) => println!("Market price ${:.4} implies vol: {:.2}%", market_price, iv * 100.0),
        Err(e) => println!("Could not solve for IV: {}", e),
    }
    match implied_volatility(spot + 1.0, spot, strike, rate, tau, OptionType::Call) {
        Ok(iv) => println!("Unexpected IV {:.4}", iv),
        Err(e) => println!("Price above spot rejected: {}", e),
    }

    Ok(())
}
