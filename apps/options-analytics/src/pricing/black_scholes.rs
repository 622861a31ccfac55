//! Black-Scholes Pricing Kernel
//!
//! Closed-form European option price and Greeks with a continuous dividend
//! yield. Degenerate inputs never fail:
//! - `spot <= 0`, `strike <= 0` or non-finite inputs yield zero price and Greeks
//! - `time_to_expiry <= 0` yields intrinsic value and zero Greeks
//! - `volatility <= 0` yields zero price and Greeks
//!
//! All outputs are rounded to 4 decimal places.

// Black-Scholes uses standard mathematical notation (s, k, t, r, q, sigma)
// Financial formulas use standard notation where mul_add() obscures meaning
#![allow(clippy::many_single_char_names)]
#![allow(clippy::suboptimal_flops)]

use std::f64::consts::PI;

use super::types::{Greeks, GreeksInput, OptionKind};

// Abramowitz & Stegun 26.2.17 coefficients (|error| < 7.5e-8).
const AS_P: f64 = 0.231_641_9;
const AS_B1: f64 = 0.319_381_530;
const AS_B2: f64 = -0.356_563_782;
const AS_B3: f64 = 1.781_477_937;
const AS_B4: f64 = -1.821_255_978;
const AS_B5: f64 = 1.330_274_429;

const DAYS_PER_YEAR: f64 = 365.0;

/// Standard normal PDF.
#[must_use]
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF via the Abramowitz-Stegun polynomial approximation.
#[must_use]
pub fn norm_cdf(x: f64) -> f64 {
    let k = 1.0 / (1.0 + AS_P * x.abs());
    let poly = k * (AS_B1 + k * (AS_B2 + k * (AS_B3 + k * (AS_B4 + k * AS_B5))));
    let tail = norm_pdf(x) * poly;
    if x >= 0.0 { 1.0 - tail } else { tail }
}

/// Round to 4 decimal places.
#[inline]
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Intrinsic value of an option at expiry.
#[must_use]
pub fn intrinsic_value(spot: f64, strike: f64, kind: OptionKind) -> f64 {
    match kind {
        OptionKind::Call => (spot - strike).max(0.0),
        OptionKind::Put => (strike - spot).max(0.0),
    }
}

/// Price and Greeks with the `is_call` flag.
#[must_use]
pub fn price_and_greeks(input: &GreeksInput, is_call: bool) -> Greeks {
    price_and_greeks_for(input, OptionKind::from_is_call(is_call))
}

/// Price and Greeks for a call or put.
#[must_use]
pub fn price_and_greeks_for(input: &GreeksInput, kind: OptionKind) -> Greeks {
    let GreeksInput {
        spot: s,
        strike: k,
        time_to_expiry: t,
        risk_free_rate: r,
        volatility: sigma,
        dividend_yield: q,
    } = *input;

    if !s.is_finite() || !k.is_finite() || s <= 0.0 || k <= 0.0 {
        return Greeks::ZERO;
    }
    if t <= 0.0 {
        return Greeks::expired(round4(intrinsic_value(s, k, kind)));
    }
    if !sigma.is_finite() || sigma <= 0.0 || !r.is_finite() || !q.is_finite() || !t.is_finite() {
        return Greeks::ZERO;
    }

    let sqrt_t = t.sqrt();
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;

    let div_discount = (-q * t).exp();
    let rate_discount = (-r * t).exp();
    let pdf_d1 = norm_pdf(d1);

    // Shared between calls and puts
    let gamma = div_discount * pdf_d1 / (s * sigma * sqrt_t);
    let vega = s * div_discount * pdf_d1 * sqrt_t / 100.0;
    let decay = -s * pdf_d1 * sigma * div_discount / (2.0 * sqrt_t);

    let (price, delta, theta, rho) = match kind {
        OptionKind::Call => {
            let nd1 = norm_cdf(d1);
            let nd2 = norm_cdf(d2);
            let price = s * div_discount * nd1 - k * rate_discount * nd2;
            let theta = decay - r * k * rate_discount * nd2 + q * s * div_discount * nd1;
            let rho = k * t * rate_discount * nd2;
            (price, div_discount * nd1, theta, rho)
        }
        OptionKind::Put => {
            let nd1 = norm_cdf(-d1);
            let nd2 = norm_cdf(-d2);
            let price = k * rate_discount * nd2 - s * div_discount * nd1;
            let theta = decay + r * k * rate_discount * nd2 - q * s * div_discount * nd1;
            let rho = -k * t * rate_discount * nd2;
            (price, -div_discount * nd1, theta, rho)
        }
    };

    Greeks {
        price: round4(price.max(0.0)),
        delta: round4(delta.clamp(-1.0, 1.0)),
        gamma: round4(gamma.max(0.0)),
        theta: round4(theta / DAYS_PER_YEAR),
        vega: round4(vega),
        rho: round4(rho / 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    fn input(s: f64, k: f64, t: f64, r: f64, sigma: f64, q: f64) -> GreeksInput {
        GreeksInput::new(s, k, t, r, sigma, q)
    }

    #[test]
    fn test_norm_cdf() {
        assert!(approx_eq(norm_cdf(0.0), 0.5, 1e-7));
        assert!(approx_eq(norm_cdf(1.96), 0.975, 0.001));
        assert!(approx_eq(norm_cdf(-1.96), 0.025, 0.001));
        assert!(approx_eq(norm_cdf(8.0), 1.0, 1e-7));
        assert!(approx_eq(norm_cdf(-8.0), 0.0, 1e-7));
    }

    #[test]
    fn test_norm_cdf_matches_erf_reference() {
        let mut x = -6.0;
        while x <= 6.0 {
            let reference = 0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2));
            assert!(
                approx_eq(norm_cdf(x), reference, 1e-7),
                "cdf({x}) = {} vs {reference}",
                norm_cdf(x)
            );
            x += 0.05;
        }
    }

    #[test]
    fn test_norm_pdf_peak() {
        assert!(approx_eq(norm_pdf(0.0), 0.398_942_28, 1e-8));
        assert!(approx_eq(norm_pdf(1.0), norm_pdf(-1.0), 1e-15));
    }

    #[test]
    fn test_reference_call() {
        // S=190, K=195, t=30/365, r=5%, sigma=25%
        let g = price_and_greeks(&input(190.0, 195.0, 30.0 / 365.0, 0.05, 0.25, 0.0), true);
        assert!(approx_eq(g.price, 3.6449, 0.001), "price {}", g.price);
        assert!(approx_eq(g.delta, 0.40, 0.01), "delta {}", g.delta);
        assert!(approx_eq(g.gamma, 0.0283, 0.0002));
        assert!(approx_eq(g.theta, -0.0971, 0.0002));
        assert!(approx_eq(g.vega, 0.2096, 0.0002));
        assert!(approx_eq(g.rho, 0.0585, 0.0002));
    }

    #[test]
    fn test_bs_call_atm() {
        let g = price_and_greeks(&input(100.0, 100.0, 1.0, 0.05, 0.20, 0.0), true);
        assert!(approx_eq(g.price, 10.4506, 0.001));
        assert!(approx_eq(g.delta, 0.6368, 0.0002));
    }

    #[test]
    fn test_bs_put_atm() {
        let g = price_and_greeks(&input(100.0, 100.0, 1.0, 0.05, 0.20, 0.0), false);
        assert!(approx_eq(g.price, 5.5735, 0.001));
        assert!(approx_eq(g.delta, -0.3632, 0.0002));
        assert!(approx_eq(g.rho, -0.4189, 0.0002));
    }

    #[test]
    fn test_dividend_yield_put_call_parity() {
        let i = input(100.0, 100.0, 0.5, 0.03, 0.30, 0.01);
        let call = price_and_greeks(&i, true);
        let put = price_and_greeks(&i, false);
        let parity = 100.0 * (-0.01_f64 * 0.5).exp() - 100.0 * (-0.03_f64 * 0.5).exp();
        assert!(approx_eq(call.price - put.price, parity, 0.001));
        assert!(approx_eq(call.delta - put.delta, (-0.01_f64 * 0.5).exp(), 0.0002));
    }

    #[test]
    fn test_expired_returns_intrinsic() {
        let call = price_and_greeks(&input(110.0, 100.0, 0.0, 0.05, 0.25, 0.0), true);
        assert_eq!(call.price, 10.0);
        assert!(call.has_no_sensitivity());

        let put = price_and_greeks(&input(110.0, 100.0, -0.1, 0.05, 0.25, 0.0), false);
        assert_eq!(put.price, 0.0);
        assert!(put.has_no_sensitivity());

        // Volatility is irrelevant once expired
        let itm_put = price_and_greeks(&input(90.0, 100.0, 0.0, 0.05, 0.0, 0.0), false);
        assert_eq!(itm_put.price, 10.0);
    }

    #[test]
    fn test_invalid_inputs_are_neutral() {
        let cases = [
            input(0.0, 100.0, 0.5, 0.05, 0.25, 0.0),
            input(100.0, -5.0, 0.5, 0.05, 0.25, 0.0),
            input(100.0, 100.0, 0.5, 0.05, 0.0, 0.0),
            input(100.0, 100.0, 0.5, 0.05, -0.2, 0.0),
            input(f64::NAN, 100.0, 0.5, 0.05, 0.25, 0.0),
            input(100.0, 100.0, 0.5, 0.05, f64::NAN, 0.0),
        ];
        for case in &cases {
            assert_eq!(price_and_greeks(case, true), Greeks::ZERO, "{case:?}");
            assert_eq!(price_and_greeks(case, false), Greeks::ZERO, "{case:?}");
        }
    }

    #[test]
    fn test_near_expiry_delta_limits() {
        let t = 1e-6;
        let itm_call = price_and_greeks(&input(110.0, 100.0, t, 0.05, 0.25, 0.0), true);
        let otm_call = price_and_greeks(&input(90.0, 100.0, t, 0.05, 0.25, 0.0), true);
        let itm_put = price_and_greeks(&input(90.0, 100.0, t, 0.05, 0.25, 0.0), false);
        let otm_put = price_and_greeks(&input(110.0, 100.0, t, 0.05, 0.25, 0.0), false);

        assert_eq!(itm_call.delta, 1.0);
        assert_eq!(otm_call.delta, 0.0);
        assert_eq!(itm_put.delta, -1.0);
        assert_eq!(otm_put.delta, 0.0);
        assert!(approx_eq(itm_call.price, 10.0, 0.001));
        assert!(approx_eq(itm_put.price, 10.0, 0.001));
        assert_eq!(otm_call.gamma, 0.0);
        assert_eq!(otm_call.vega, 0.0);
    }

    #[test]
    fn test_outputs_are_rounded() {
        let g = price_and_greeks(&input(101.37, 97.13, 0.731, 0.041, 0.337, 0.013), true);
        for value in [g.price, g.delta, g.gamma, g.theta, g.vega, g.rho] {
            assert!(approx_eq(value * 10_000.0, (value * 10_000.0).round(), 1e-6));
        }
    }

    #[test]
    fn test_intrinsic_value() {
        assert_eq!(intrinsic_value(105.0, 100.0, OptionKind::Call), 5.0);
        assert_eq!(intrinsic_value(95.0, 100.0, OptionKind::Call), 0.0);
        assert_eq!(intrinsic_value(95.0, 100.0, OptionKind::Put), 5.0);
    }

    #[test]
    fn test_deterministic() {
        let i = input(123.4, 120.0, 0.33, 0.045, 0.41, 0.005);
        assert_eq!(price_and_greeks(&i, true), price_and_greeks(&i, true));
    }
}
