//! Pricing value objects: option kind, kernel inputs, and per-contract Greeks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    /// Call option (right to buy).
    Call,
    /// Put option (right to sell).
    Put,
}

impl OptionKind {
    /// Map the `is_call` flag used by the kernel entry points.
    #[must_use]
    pub const fn from_is_call(is_call: bool) -> Self {
        if is_call { Self::Call } else { Self::Put }
    }

    /// Check if this is a call.
    #[must_use]
    pub const fn is_call(self) -> bool {
        matches!(self, Self::Call)
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// Inputs to the Black-Scholes kernel.
///
/// Rates and yields are continuously compounded and annualized; time is in years.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GreeksInput {
    /// Underlying spot price.
    pub spot: f64,
    /// Strike price.
    pub strike: f64,
    /// Time to expiry in years.
    pub time_to_expiry: f64,
    /// Risk-free rate.
    pub risk_free_rate: f64,
    /// Volatility (0.25 = 25%).
    pub volatility: f64,
    /// Continuous dividend yield.
    #[serde(default)]
    pub dividend_yield: f64,
}

impl GreeksInput {
    /// Create a new kernel input.
    #[must_use]
    pub const fn new(
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        dividend_yield: f64,
    ) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry,
            risk_free_rate,
            volatility,
            dividend_yield,
        }
    }

    /// Copy of this input with a different volatility.
    #[must_use]
    pub const fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    /// Moneyness as spot / strike (0 when strike is not positive).
    #[must_use]
    pub fn moneyness(&self) -> f64 {
        if self.strike > 0.0 {
            self.spot / self.strike
        } else {
            0.0
        }
    }
}

/// Price and sensitivities for a single contract (per share).
///
/// | Field | Unit |
/// |-------|------|
/// | `price` | currency per share |
/// | `delta` | per 1.0 move in spot |
/// | `gamma` | delta change per 1.0 move in spot |
/// | `theta` | per calendar day (annual / 365) |
/// | `vega` | per 1 volatility point (annual / 100) |
/// | `rho` | per 1 rate point (annual / 100) |
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    /// Theoretical price.
    pub price: f64,
    /// Delta, in [-1, 1].
    pub delta: f64,
    /// Gamma, never negative.
    pub gamma: f64,
    /// Theta (time decay per day).
    pub theta: f64,
    /// Vega (per 1% volatility change).
    pub vega: f64,
    /// Rho (per 1% rate change).
    pub rho: f64,
}

impl Greeks {
    /// Zero Greeks and zero price.
    pub const ZERO: Self = Self {
        price: 0.0,
        delta: 0.0,
        gamma: 0.0,
        theta: 0.0,
        vega: 0.0,
        rho: 0.0,
    };

    /// Expired contract: intrinsic price and no sensitivities.
    #[must_use]
    pub const fn expired(intrinsic: f64) -> Self {
        Self {
            price: intrinsic,
            ..Self::ZERO
        }
    }

    /// Scale every field by a factor (quantity × multiplier).
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            price: self.price * factor,
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
            rho: self.rho * factor,
        }
    }

    /// Whether all sensitivities are zero.
    #[must_use]
    pub fn has_no_sensitivity(&self) -> bool {
        self.delta == 0.0
            && self.gamma == 0.0
            && self.theta == 0.0
            && self.vega == 0.0
            && self.rho == 0.0
    }
}

impl Add for Greeks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            price: self.price + rhs.price,
            delta: self.delta + rhs.delta,
            gamma: self.gamma + rhs.gamma,
            theta: self.theta + rhs.theta,
            vega: self.vega + rhs.vega,
            rho: self.rho + rhs.rho,
        }
    }
}
