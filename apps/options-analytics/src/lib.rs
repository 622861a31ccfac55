// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Options Analytics - Rust Core Library
//!
//! Quantitative analytics for options portfolios.
//!
//! # Components
//!
//! - **Pricing**: Black-Scholes-Merton prices and Greeks, implied volatility
//!   - `pricing`: pricing kernel, Newton-Raphson IV solver with bisection fallback
//!   - `market`: option quotes, contracts and chain snapshots
//!
//! - **Volatility**: surface analytics over a chain
//!   - `volatility`: ATM volatility, smile, skew, term structure, IV rank/percentile
//!
//! - **Portfolio**: position model and aggregation
//!   - `portfolio`: positions, contract multipliers, portfolio Greeks and exposures
//!   - `risk`: concentration, correlation, liquidity, VaR, leverage, expiration risk
//!
//! - **Alerts**: rule-based alerting
//!   - `alerts`: conditions, cooldowns, severity and confidence, per-user delivery
//!
//! - **Ambient**
//!   - `config`: YAML configuration with `${VAR:-default}` interpolation
//!   - `observability`: tracing subscriber setup and metric helpers
//!
//! All computation is synchronous and side-effect free apart from logging
//! and metrics. Market data and portfolio snapshots are supplied by the
//! caller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Rule-based alert engine and per-user alert state.
pub mod alerts;

/// Configuration loading and validation.
pub mod config;

/// Market data snapshots.
pub mod market;

/// Logging and metrics.
pub mod observability;

/// Positions and portfolio aggregation.
pub mod portfolio;

/// Option pricing kernel and implied volatility.
pub mod pricing;

/// Portfolio risk metrics.
pub mod risk;

/// Volatility surface and IV rank.
pub mod volatility;

// =============================================================================
// Re-exports
// =============================================================================

pub use alerts::{Alert, AlertEngine, AlertRule, AlertService, AlertSeverity, AlertType};
pub use config::{Config, ConfigError, load_config, load_config_from_string};
pub use market::{MarketQuote, OptionChain, OptionContract};
pub use portfolio::{GreeksAggregator, PortfolioContext, PortfolioGreeks, Position};
pub use pricing::{Greeks, GreeksInput, IvSolver, OptionKind, price_and_greeks, solve_iv};
pub use risk::{PortfolioRiskMetrics, RiskMetricsCalculator, RiskTolerance};
pub use volatility::{IvRankPercentile, SurfaceBuilder, VolatilitySurface, rank_percentile};
