//! Pricing model configuration for options and risk calculations.

use serde::{Deserialize, Serialize};

use crate::pricing::GreeksInput;

/// Pricing model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Risk-free rate (annualized).
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Default dividend yield.
    #[serde(default)]
    pub default_dividend_yield: f64,
    /// Volatility used when a position or contract has no usable IV.
    #[serde(default = "default_fallback_volatility")]
    pub fallback_volatility: f64,
    /// Shares per option contract.
    #[serde(default = "default_contract_multiplier")]
    pub contract_multiplier: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            default_dividend_yield: 0.0,
            fallback_volatility: default_fallback_volatility(),
            contract_multiplier: default_contract_multiplier(),
        }
    }
}

impl PricingConfig {
    /// Build a kernel input using the configured rate and dividend yield.
    #[must_use]
    pub const fn input(
        &self,
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        volatility: f64,
    ) -> GreeksInput {
        GreeksInput::new(
            spot,
            strike,
            time_to_expiry,
            self.risk_free_rate,
            volatility,
            self.default_dividend_yield,
        )
    }
}

pub(crate) const fn default_risk_free_rate() -> f64 {
    0.05
}

const fn default_fallback_volatility() -> f64 {
    0.30
}

const fn default_contract_multiplier() -> u32 {
    100
}

pub(crate) const fn default_true() -> bool {
    true
}
