//! Risk findings and the metrics report.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RiskTolerance;
use crate::portfolio::PortfolioGreeks;

/// Severity of a risk finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    /// Limit exceeded.
    Warning,
    /// Limit exceeded by at least 20%.
    Breach,
    /// Limit exceeded by at least 50%.
    Critical,
}

impl RiskSeverity {
    /// Severity for an observed/limit ratio; `None` when within the limit.
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Option<Self> {
        if ratio.is_nan() || ratio <= 1.0 {
            None
        } else if ratio >= 1.5 {
            Some(Self::Critical)
        } else if ratio >= 1.2 {
            Some(Self::Breach)
        } else {
            Some(Self::Warning)
        }
    }

    /// Severity of an observed value against a positive limit.
    #[must_use]
    pub fn against_limit(observed: f64, limit: f64) -> Option<Self> {
        if limit > 0.0 {
            Self::from_ratio(observed / limit)
        } else {
            None
        }
    }
}

/// Kind of risk finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// Single symbol holds too much of the portfolio.
    PositionConcentration,
    /// Single sector holds too much of the portfolio.
    SectorConcentration,
    /// Holdings move together.
    Correlation,
    /// Thinly traded contracts.
    Liquidity,
    /// VaR approximation above budget.
    ValueAtRisk,
    /// Delta notional above the leverage limit.
    Leverage,
    /// Options close to expiration.
    Expiration,
    /// Short in-the-money options.
    Assignment,
}

/// A single risk finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    /// Finding kind.
    pub category: RiskCategory,
    /// Severity.
    pub severity: RiskSeverity,
    /// Human-readable message.
    pub message: String,
    /// Symbol, sector or pair the finding refers to.
    pub subject: Option<String>,
    /// Observed value.
    pub observed: f64,
    /// Limit that was exceeded.
    pub limit: f64,
}

/// Whether a concentration entry is a symbol or a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcentrationScope {
    /// Grouped by underlying symbol.
    Symbol,
    /// Grouped by sector.
    Sector,
}

/// Exposure share of one symbol or sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationEntry {
    /// Grouping.
    pub scope: ConcentrationScope,
    /// Symbol or sector name.
    pub name: String,
    /// Absolute exposure in currency.
    pub exposure: f64,
    /// Share of total exposure.
    pub share: f64,
    /// Limit from the risk profile.
    pub limit: f64,
    /// Severity when over the limit.
    pub severity: Option<RiskSeverity>,
}

/// An option position approaching expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationRisk {
    /// Underlying symbol.
    pub symbol: String,
    /// Strike.
    pub strike: Option<Decimal>,
    /// Expiration date.
    pub expiry: NaiveDate,
    /// Calendar days remaining.
    pub days_remaining: i64,
    /// Signed quantity.
    pub quantity: i64,
    /// Whether the option is in the money.
    pub in_the_money: bool,
    /// Short and in the money.
    pub assignment_risk: bool,
}

/// Where a correlation score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationSource {
    /// 1 − distinct symbols / positions.
    Proxy,
    /// Supplied correlation matrix.
    Matrix,
}

/// A pair of holdings above the correlation threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    /// First symbol.
    pub first: String,
    /// Second symbol.
    pub second: String,
    /// Correlation coefficient.
    pub correlation: f64,
}

/// Correlation assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRisk {
    /// Score in [0, 1].
    pub score: f64,
    /// How the score was computed.
    pub source: CorrelationSource,
    /// Pairs over the threshold (matrix source only).
    pub flagged_pairs: Vec<CorrelatedPair>,
}

/// Portfolio risk report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRiskMetrics {
    /// Profile used for the limits.
    pub tolerance: RiskTolerance,
    /// Net Greeks.
    pub greeks: PortfolioGreeks,
    /// Total absolute exposure.
    pub total_exposure: f64,
    /// Herfindahl index over symbol shares.
    pub herfindahl_symbol: f64,
    /// Herfindahl index over sector shares.
    pub herfindahl_sector: f64,
    /// Concentration per symbol and sector, largest share first.
    pub concentration: Vec<ConcentrationEntry>,
    /// Correlation assessment.
    pub correlation: CorrelationRisk,
    /// Average liquidity score (0-100), `None` without activity data.
    pub liquidity: Option<f64>,
    /// VaR approximation.
    pub value_at_risk: f64,
    /// Gross delta notional / account value.
    pub leverage: f64,
    /// Options inside the expiration warning window.
    pub expiration_risk: Vec<ExpirationRisk>,
    /// Findings, most severe first.
    pub alerts: Vec<RiskAlert>,
}

impl PortfolioRiskMetrics {
    /// Most severe finding, if any.
    #[must_use]
    pub fn worst_severity(&self) -> Option<RiskSeverity> {
        self.alerts.iter().map(|a| a.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.9, None ; "under limit")]
    #[test_case(1.0, None ; "at limit")]
    #[test_case(1.1, Some(RiskSeverity::Warning) ; "just over")]
    #[test_case(1.2, Some(RiskSeverity::Breach) ; "breach threshold")]
    #[test_case(1.49, Some(RiskSeverity::Breach) ; "below critical")]
    #[test_case(1.5, Some(RiskSeverity::Critical) ; "critical threshold")]
    #[test_case(f64::NAN, None ; "nan")]
    fn severity_escalation(ratio: f64, expected: Option<RiskSeverity>) {
        assert_eq!(RiskSeverity::from_ratio(ratio), expected);
    }

    #[test]
    fn severity_ordering() {
        assert!(RiskSeverity::Critical > RiskSeverity::Breach);
        assert!(RiskSeverity::Breach > RiskSeverity::Warning);
    }

    #[test]
    fn against_non_positive_limit_is_none() {
        assert_eq!(RiskSeverity::against_limit(5.0, 0.0), None);
        assert_eq!(
            RiskSeverity::against_limit(0.5, 0.4),
            Some(RiskSeverity::Breach)
        );
    }
}
