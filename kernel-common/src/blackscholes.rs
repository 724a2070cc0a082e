//! Black-Scholes pricing, Greeks, and implied volatility for European index
//! options. Shared by the market-state cache (chain enrichment) and any
//! strategy that needs a theoretical price rather than a quoted one.

use crate::greeks::Greeks;
use crate::instrument::OptionSide;

const SQRT_2PI: f64 = 2.5066282746310007;

fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

fn d1(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

fn d2(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    d1(spot, strike, rate, vol, time) - vol * time.sqrt()
}

/// Theoretical price of a European option with continuous dividend yield.
#[must_use]
pub fn price(side: OptionSide, spot: f64, strike: f64, rate: f64, vol: f64, time: f64, dividend: f64) -> f64 {
    if time <= 0.0 {
        return match side {
            OptionSide::Call => (spot - strike).max(0.0),
            OptionSide::Put => (strike - spot).max(0.0),
        };
    }
    let adjusted_spot = spot * (-dividend * time).exp();
    let d1v = d1(adjusted_spot, strike, rate, vol, time);
    let d2v = d2(adjusted_spot, strike, rate, vol, time);
    let discount = (-rate * time).exp();
    match side {
        OptionSide::Call => adjusted_spot * norm_cdf(d1v) - strike * discount * norm_cdf(d2v),
        OptionSide::Put => strike * discount * norm_cdf(-d2v) - adjusted_spot * norm_cdf(-d1v),
    }
}

/// First-order Greeks (spec GLOSSARY). Theta is expressed per calendar day.
#[must_use]
pub fn greeks(side: OptionSide, spot: f64, strike: f64, rate: f64, vol: f64, time: f64, dividend: f64) -> Greeks {
    if time <= 0.0 || vol <= 0.0 {
        return Greeks::zero();
    }
    let sqrt_t = time.sqrt();
    let d1v = d1(spot * (-dividend * time).exp(), strike, rate, vol, time);
    let d2v = d2(spot * (-dividend * time).exp(), strike, rate, vol, time);
    let nd1 = norm_cdf(d1v);
    let nd2 = norm_cdf(d2v);
    let npd1 = norm_pdf(d1v);
    let div_decay = (-dividend * time).exp();
    let discount = (-rate * time).exp();

    let delta = match side {
        OptionSide::Call => nd1 * div_decay,
        OptionSide::Put => (nd1 - 1.0) * div_decay,
    };
    let gamma = npd1 * div_decay / (spot * vol * sqrt_t);
    let theta_annual = match side {
        OptionSide::Call => {
            -spot * npd1 * vol * div_decay / (2.0 * sqrt_t) - rate * strike * discount * nd2
                + dividend * spot * div_decay * nd1
        }
        OptionSide::Put => {
            -spot * npd1 * vol * div_decay / (2.0 * sqrt_t) + rate * strike * discount * norm_cdf(-d2v)
                - dividend * spot * div_decay * norm_cdf(-d1v)
        }
    };
    let vega = spot * div_decay * npd1 * sqrt_t / 100.0;

    Greeks {
        delta,
        gamma,
        theta: theta_annual / 365.0,
        vega,
    }
}

/// Implied volatility by Newton-Raphson with a bisection fallback; returns
/// `None` if it fails to converge within the iteration budget.
#[must_use]
pub fn implied_volatility(
    side: OptionSide,
    market_price: f64,
    spot: f64,
    strike: f64,
    rate: f64,
    time: f64,
) -> Option<f64> {
    if market_price <= 0.0 || time <= 0.0 {
        return None;
    }
    let mut vol = 0.3;
    for _ in 0..50 {
        let theoretical = price(side, spot, strike, rate, vol, time, 0.0);
        let vega = greeks(side, spot, strike, rate, vol, time, 0.0).vega * 100.0;
        if vega.abs() < 1e-8 {
            break;
        }
        let diff = theoretical - market_price;
        if diff.abs() < 1e-6 {
            return Some(vol);
        }
        vol -= diff / vega;
        if !vol.is_finite() || vol <= 0.0 {
            vol = 0.01;
        }
        if vol > 5.0 {
            vol = 5.0;
        }
    }
    let final_price = price(side, spot, strike, rate, vol, time, 0.0);
    if (final_price - market_price).abs() / market_price < 0.01 {
        Some(vol)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_price_is_nonnegative_and_bounded_by_spot() {
        let p = price(OptionSide::Call, 25000.0, 25000.0, 0.065, 0.15, 7.0 / 365.0, 0.0);
        assert!(p > 0.0);
        assert!(p < 25000.0);
    }

    #[test]
    fn atm_call_delta_is_near_half() {
        let g = greeks(OptionSide::Call, 25000.0, 25000.0, 0.065, 0.15, 7.0 / 365.0, 0.0);
        assert!((g.delta - 0.5).abs() < 0.15);
    }

    #[test]
    fn implied_vol_round_trips_through_price() {
        let true_vol = 0.18;
        let theoretical = price(OptionSide::Call, 25000.0, 25200.0, 0.065, true_vol, 14.0 / 365.0, 0.0);
        let recovered = implied_volatility(OptionSide::Call, theoretical, 25000.0, 25200.0, 0.065, 14.0 / 365.0)
            .expect("should converge");
        assert!((recovered - true_vol).abs() < 0.01);
    }

    #[test]
    fn expired_option_has_zero_greeks() {
        let g = greeks(OptionSide::Call, 25000.0, 25000.0, 0.065, 0.15, 0.0, 0.0);
        assert!(g.is_all_zero());
    }
}
