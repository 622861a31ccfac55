//! Portfolio risk calculation settings.

use serde::{Deserialize, Serialize};

use crate::risk::RiskTolerance;

/// Risk metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Risk-tolerance profile parametrizing every limit check.
    pub tolerance: RiskTolerance,
    /// Assumed underlying move for the VaR approximation (0.10 = 10%).
    pub price_move_pct: f64,
    /// Assumed volatility move for the VaR approximation (0.05 = 5%).
    pub vol_move_pct: f64,
    /// Absolute correlation above which a pair of holdings is flagged.
    pub correlation_threshold: f64,
    /// Days to expiry at or below which a position appears in expiration risk.
    pub expiration_warning_days: i64,
    /// Liquidity score below which a risk alert is raised.
    pub min_liquidity_score: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            tolerance: RiskTolerance::Moderate,
            price_move_pct: 0.10,
            vol_move_pct: 0.05,
            correlation_threshold: 0.7,
            expiration_warning_days: 7,
            min_liquidity_score: 40.0,
        }
    }
}
