//! Portfolio risk metrics.
//!
//! Deterministic risk checks over a [`PortfolioContext`](crate::portfolio::PortfolioContext),
//! parametrized by a [`RiskTolerance`] profile.
//!
//! # Features
//!
//! - Concentration: Herfindahl index per symbol and sector, limit findings
//!   escalating warning → breach → critical at 1.0×, 1.2× and 1.5× the limit
//! - Correlation: distinct-symbol proxy, or pairwise lookup in a supplied matrix
//! - Liquidity: 0-100 score from volume and open-interest buckets
//! - VaR approximation from net delta and net vega
//! - Leverage from delta notional
//! - Expiration and assignment risk for options near expiry
//!
//! # Example
//!
//! ```rust,ignore
//! use options_analytics::portfolio::PortfolioContext;
//! use options_analytics::risk::RiskMetricsCalculator;
//!
//! let context = PortfolioContext::from_positions(positions, as_of, &config.pricing);
//! let metrics = RiskMetricsCalculator::new(config.risk.clone()).calculate(&context);
//!
//! for alert in &metrics.alerts {
//!     println!("{:?} {:?}: {}", alert.severity, alert.category, alert.message);
//! }
//! ```

mod calculator;
mod concentration;
mod correlation;
mod liquidity;
mod tolerance;
mod types;

pub use calculator::{RiskMetricsCalculator, expiration_risk, value_at_risk};
pub use concentration::{concentration_entries, herfindahl};
pub use correlation::{CorrelationMatrix, assess_correlation, correlation_proxy};
pub use liquidity::{illiquid_symbols, liquidity_score, portfolio_liquidity};
pub use tolerance::{RiskProfile, RiskTolerance};
pub use types::{
    ConcentrationEntry, ConcentrationScope, CorrelatedPair, CorrelationRisk, CorrelationSource,
    ExpirationRisk, PortfolioRiskMetrics, RiskAlert, RiskCategory, RiskSeverity,
};
