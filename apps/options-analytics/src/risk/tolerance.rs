//! Risk-tolerance profiles.
//!
//! | Profile | max portfolio risk | max position size | max sector exposure | max leverage |
//! |---------|--------------------|-------------------|---------------------|--------------|
//! | conservative | 2% | 10% | 30% | 1.0× |
//! | moderate     | 5% | 20% | 40% | 2.0× |
//! | aggressive   | 10% | 30% | 50% | 3.0× |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk-tolerance selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    /// Tight limits.
    Conservative,
    /// Balanced limits.
    #[default]
    Moderate,
    /// Loose limits.
    Aggressive,
}

impl RiskTolerance {
    /// Limits for this profile.
    #[must_use]
    pub const fn profile(self) -> RiskProfile {
        match self {
            Self::Conservative => RiskProfile {
                max_portfolio_risk: 0.02,
                max_position_size: 0.10,
                max_sector_exposure: 0.30,
                max_leverage: 1.0,
            },
            Self::Moderate => RiskProfile {
                max_portfolio_risk: 0.05,
                max_position_size: 0.20,
                max_sector_exposure: 0.40,
                max_leverage: 2.0,
            },
            Self::Aggressive => RiskProfile {
                max_portfolio_risk: 0.10,
                max_position_size: 0.30,
                max_sector_exposure: 0.50,
                max_leverage: 3.0,
            },
        }
    }

    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits applied by every risk check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Maximum VaR as a fraction of portfolio value.
    pub max_portfolio_risk: f64,
    /// Maximum share of portfolio exposure in one symbol.
    pub max_position_size: f64,
    /// Maximum share of portfolio exposure in one sector.
    pub max_sector_exposure: f64,
    /// Maximum delta notional relative to account value.
    pub max_leverage: f64,
}
