//! Risk metrics calculator.

use super::concentration::{concentration_entries, herfindahl};
use super::correlation::assess_correlation;
use super::liquidity::{illiquid_symbols, portfolio_liquidity};
use super::types::{
    ConcentrationEntry, ConcentrationScope, CorrelationRisk, CorrelationSource, ExpirationRisk,
    PortfolioRiskMetrics, RiskAlert, RiskCategory, RiskSeverity,
};
use super::RiskProfile;
use crate::config::RiskConfig;
use crate::observability::record_risk_evaluation;
use crate::portfolio::{PortfolioContext, PortfolioGreeks, Position};

/// VaR approximation: `|net delta × price move| + |net vega × vol move|`.
#[must_use]
pub fn value_at_risk(greeks: &PortfolioGreeks, price_move_pct: f64, vol_move_pct: f64) -> f64 {
    (greeks.delta * price_move_pct).abs() + (greeks.vega * vol_move_pct).abs()
}

/// Option positions expiring within `warning_days`, nearest first.
#[must_use]
pub fn expiration_risk(context: &PortfolioContext, warning_days: i64) -> Vec<ExpirationRisk> {
    let mut risks: Vec<ExpirationRisk> = context
        .positions
        .iter()
        .filter(|p| p.position_type.is_option() && !p.is_expired(context.as_of))
        .filter_map(|p| {
            let expiry = p.expiry?;
            let days_remaining = p.days_to_expiry(context.as_of)?;
            (days_remaining <= warning_days).then(|| {
                let in_the_money = p.is_itm();
                ExpirationRisk {
                    symbol: p.symbol.clone(),
                    strike: p.strike,
                    expiry,
                    days_remaining,
                    quantity: p.quantity,
                    in_the_money,
                    assignment_risk: in_the_money && p.is_short(),
                }
            })
        })
        .collect();
    risks.sort_by_key(|r| r.days_remaining);
    risks
}

/// Computes portfolio risk metrics against a tolerance profile.
#[derive(Debug, Clone, Default)]
pub struct RiskMetricsCalculator {
    config: RiskConfig,
}

impl RiskMetricsCalculator {
    /// Create a calculator.
    #[must_use]
    pub const fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Risk configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Evaluate every risk check over the context.
    #[must_use]
    pub fn calculate(&self, context: &PortfolioContext) -> PortfolioRiskMetrics {
        let tolerance = self.config.tolerance;
        let profile = tolerance.profile();
        let mut alerts = Vec::new();

        let mut concentration = concentration_entries(
            ConcentrationScope::Symbol,
            &context.symbol_exposures,
            profile.max_position_size,
        );
        concentration.extend(concentration_entries(
            ConcentrationScope::Sector,
            &context.sector_exposures,
            profile.max_sector_exposure,
        ));
        alerts.extend(concentration.iter().filter_map(concentration_alert));

        let live: Vec<Position> = context
            .positions
            .iter()
            .filter(|p| !p.is_expired(context.as_of))
            .cloned()
            .collect();

        let correlation = assess_correlation(
            &live,
            context.correlation.as_ref(),
            self.config.correlation_threshold,
        );
        alerts.extend(self.correlation_alerts(&correlation));

        let liquidity = portfolio_liquidity(&live);
        if let Some(alert) = self.liquidity_alert(liquidity, &live) {
            alerts.push(alert);
        }

        let value_at_risk = value_at_risk(
            &context.greeks,
            self.config.price_move_pct,
            self.config.vol_move_pct,
        );
        if let Some(alert) = var_alert(value_at_risk, context, &profile) {
            alerts.push(alert);
        }

        let capital = context.capital();
        let leverage = if capital > 0.0 {
            context.gross_dollar_delta / capital
        } else {
            0.0
        };
        if let Some(severity) = RiskSeverity::against_limit(leverage, profile.max_leverage) {
            alerts.push(RiskAlert {
                category: RiskCategory::Leverage,
                severity,
                message: format!(
                    "Leverage {leverage:.2}x exceeds {:.2}x limit",
                    profile.max_leverage
                ),
                subject: None,
                observed: leverage,
                limit: profile.max_leverage,
            });
        }

        let expiration_risk = expiration_risk(context, self.config.expiration_warning_days);
        alerts.extend(expiration_risk.iter().flat_map(|r| self.expiration_alerts(r)));

        // Stable: ties keep check order.
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));

        record_risk_evaluation(tolerance.as_str(), alerts.len());
        tracing::debug!(
            tolerance = %tolerance,
            findings = alerts.len(),
            value_at_risk,
            leverage,
            "Evaluated portfolio risk"
        );

        PortfolioRiskMetrics {
            tolerance,
            greeks: context.greeks,
            total_exposure: context.total_exposure,
            herfindahl_symbol: herfindahl(&context.symbol_exposures),
            herfindahl_sector: herfindahl(&context.sector_exposures),
            concentration,
            correlation,
            liquidity,
            value_at_risk,
            leverage,
            expiration_risk,
            alerts,
        }
    }

    fn correlation_alerts(&self, correlation: &CorrelationRisk) -> Vec<RiskAlert> {
        let threshold = self.config.correlation_threshold;
        match correlation.source {
            CorrelationSource::Matrix => correlation
                .flagged_pairs
                .iter()
                .map(|pair| RiskAlert {
                    category: RiskCategory::Correlation,
                    severity: RiskSeverity::against_limit(pair.correlation.abs(), threshold)
                        .unwrap_or(RiskSeverity::Warning),
                    message: format!(
                        "{} and {} correlation {:.2} exceeds {threshold:.2}",
                        pair.first, pair.second, pair.correlation
                    ),
                    subject: Some(format!("{}/{}", pair.first, pair.second)),
                    observed: pair.correlation,
                    limit: threshold,
                })
                .collect(),
            CorrelationSource::Proxy => RiskSeverity::against_limit(correlation.score, threshold)
                .map(|severity| RiskAlert {
                    category: RiskCategory::Correlation,
                    severity,
                    message: format!(
                        "Holdings concentrated in few underlyings (proxy {:.2})",
                        correlation.score
                    ),
                    subject: None,
                    observed: correlation.score,
                    limit: threshold,
                })
                .into_iter()
                .collect(),
        }
    }

    fn liquidity_alert(&self, liquidity: Option<f64>, live: &[Position]) -> Option<RiskAlert> {
        let score = liquidity?;
        let min = self.config.min_liquidity_score;
        if score >= min {
            return None;
        }
        let severity = if score < min / 2.0 {
            RiskSeverity::Breach
        } else {
            RiskSeverity::Warning
        };
        let thin = illiquid_symbols(live, min);
        Some(RiskAlert {
            category: RiskCategory::Liquidity,
            severity,
            message: format!("Liquidity score {score:.0} below {min:.0}"),
            subject: (!thin.is_empty()).then(|| thin.join(",")),
            observed: score,
            limit: min,
        })
    }

    fn expiration_alerts(&self, risk: &ExpirationRisk) -> Vec<RiskAlert> {
        let days = risk.days_remaining;
        let severity = if days <= 1 {
            RiskSeverity::Critical
        } else if days <= 3 {
            RiskSeverity::Breach
        } else {
            RiskSeverity::Warning
        };
        let mut alerts = vec![RiskAlert {
            category: RiskCategory::Expiration,
            severity,
            message: format!("{} expires in {days} days", risk.symbol),
            subject: Some(risk.symbol.clone()),
            observed: days as f64,
            limit: self.config.expiration_warning_days as f64,
        }];
        if risk.assignment_risk {
            alerts.push(RiskAlert {
                category: RiskCategory::Assignment,
                severity: if days <= 1 {
                    RiskSeverity::Critical
                } else {
                    RiskSeverity::Breach
                },
                message: format!("Short {} is in the money with {days} days left", risk.symbol),
                subject: Some(risk.symbol.clone()),
                observed: days as f64,
                limit: self.config.expiration_warning_days as f64,
            });
        }
        alerts
    }
}

fn concentration_alert(entry: &ConcentrationEntry) -> Option<RiskAlert> {
    let severity = entry.severity?;
    let (category, label) = match entry.scope {
        ConcentrationScope::Symbol => (RiskCategory::PositionConcentration, "Position"),
        ConcentrationScope::Sector => (RiskCategory::SectorConcentration, "Sector"),
    };
    Some(RiskAlert {
        category,
        severity,
        message: format!(
            "{label} {} is {:.1}% of exposure (limit {:.0}%)",
            entry.name,
            entry.share * 100.0,
            entry.limit * 100.0
        ),
        subject: Some(entry.name.clone()),
        observed: entry.share,
        limit: entry.limit,
    })
}

fn var_alert(var: f64, context: &PortfolioContext, profile: &RiskProfile) -> Option<RiskAlert> {
    let limit = context
        .risk_budget
        .as_ref()
        .and_then(|b| b.max_value_at_risk)
        .unwrap_or_else(|| profile.max_portfolio_risk * context.capital());
    let severity = RiskSeverity::against_limit(var, limit)?;
    Some(RiskAlert {
        category: RiskCategory::ValueAtRisk,
        severity,
        message: format!("Value at risk {var:.2} exceeds {limit:.2}"),
        subject: None,
        observed: var,
        limit,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;
    use crate::portfolio::RiskBudget;
    use crate::pricing::{Greeks, OptionKind};
    use crate::risk::{CorrelationMatrix, RiskTolerance};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn stock(symbol: &str, sector: &str, value: i64) -> Position {
        Position::stock(symbol, value, dec!(1), dec!(1)).with_sector(sector)
    }

    fn context(positions: Vec<Position>) -> PortfolioContext {
        PortfolioContext::from_positions(positions, as_of(), &PricingConfig::default())
    }

    fn diversified() -> Vec<Position> {
        vec![
            stock("AAPL", "Technology", 150),
            stock("MSFT", "Technology", 150),
            stock("XOM", "Energy", 150),
            stock("JPM", "Financials", 150),
            stock("JNJ", "Healthcare", 150),
            stock("NEE", "Utilities", 125),
            stock("PG", "Staples", 125),
        ]
    }

    #[test]
    fn value_at_risk_formula() {
        let greeks = PortfolioGreeks {
            delta: -250.0,
            vega: 400.0,
            ..PortfolioGreeks::default()
        };
        assert!((value_at_risk(&greeks, 0.10, 0.05) - 45.0).abs() < 1e-12);
    }

    #[test]
    fn diversified_book_has_no_concentration_findings() {
        let metrics = RiskMetricsCalculator::default().calculate(&context(diversified()));
        assert!(
            metrics
                .alerts
                .iter()
                .all(|a| a.category != RiskCategory::PositionConcentration
                    && a.category != RiskCategory::SectorConcentration)
        );
        assert!(metrics.herfindahl_symbol < 0.2);
        assert_eq!(metrics.correlation.source, CorrelationSource::Proxy);
        assert_eq!(metrics.correlation.score, 0.0);
    }

    #[test]
    fn sector_concentration_escalates() {
        let positions = vec![
            stock("AAPL", "Technology", 350),
            stock("MSFT", "Technology", 350),
            stock("XOM", "Energy", 150),
            stock("JPM", "Financials", 150),
        ];
        let metrics = RiskMetricsCalculator::default().calculate(&context(positions));
        // Technology holds 70% against a 40% moderate limit
        let sector = metrics
            .alerts
            .iter()
            .find(|a| a.category == RiskCategory::SectorConcentration)
            .unwrap();
        assert_eq!(sector.severity, RiskSeverity::Critical);
        assert_eq!(sector.subject.as_deref(), Some("Technology"));
    }

    #[test]
    fn tolerance_changes_limits() {
        let positions = vec![
            stock("AAPL", "Technology", 250),
            stock("MSFT", "Software", 250),
            stock("XOM", "Energy", 250),
            stock("JPM", "Financials", 250),
        ];
        let moderate = RiskMetricsCalculator::default().calculate(&context(positions.clone()));
        let conservative = RiskMetricsCalculator::new(RiskConfig {
            tolerance: RiskTolerance::Conservative,
            ..RiskConfig::default()
        })
        .calculate(&context(positions));

        let count = |m: &PortfolioRiskMetrics| {
            m.alerts
                .iter()
                .filter(|a| a.category == RiskCategory::PositionConcentration)
                .count()
        };
        // 25% per symbol: breach against 20%, critical against 10%
        assert_eq!(count(&moderate), 4);
        assert_eq!(count(&conservative), 4);
        assert!(
            conservative
                .alerts
                .iter()
                .all(|a| a.category != RiskCategory::PositionConcentration
                    || a.severity == RiskSeverity::Critical)
        );
    }

    #[test]
    fn matrix_pairs_are_flagged() {
        let matrix = CorrelationMatrix::from_pairs([("AAPL", "MSFT", 0.9)]);
        let metrics =
            RiskMetricsCalculator::default().calculate(&context(diversified()).with_correlation(matrix));
        let pair = metrics
            .alerts
            .iter()
            .find(|a| a.category == RiskCategory::Correlation)
            .unwrap();
        assert_eq!(pair.severity, RiskSeverity::Breach);
        assert_eq!(metrics.correlation.flagged_pairs.len(), 1);
    }

    #[test]
    fn short_itm_put_near_expiry_has_assignment_risk() {
        let put = Position::option(
            "AAPL",
            OptionKind::Put,
            dec!(200),
            NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(),
            -1,
            dec!(3),
            dec!(12),
            dec!(190),
        )
        .with_greeks_snapshot(Greeks {
            delta: -0.9,
            ..Greeks::ZERO
        });
        let metrics = RiskMetricsCalculator::default().calculate(&context(vec![put]));

        assert_eq!(metrics.expiration_risk.len(), 1);
        let risk = &metrics.expiration_risk[0];
        assert_eq!(risk.days_remaining, 2);
        assert!(risk.in_the_money && risk.assignment_risk);
        assert!(
            metrics
                .alerts
                .iter()
                .any(|a| a.category == RiskCategory::Assignment && a.severity == RiskSeverity::Breach)
        );
    }

    #[test]
    fn leverage_uses_account_value() {
        let positions = vec![Position::stock("SPY", 100, dec!(500), dec!(500))];
        let ctx = context(positions).with_risk_budget(RiskBudget {
            account_value: dec!(10000),
            max_value_at_risk: Some(1_000_000.0),
        });
        let metrics = RiskMetricsCalculator::default().calculate(&ctx);
        assert!((metrics.leverage - 5.0).abs() < 1e-9);
        let leverage = metrics
            .alerts
            .iter()
            .find(|a| a.category == RiskCategory::Leverage)
            .unwrap();
        assert_eq!(leverage.severity, RiskSeverity::Critical);
        assert!(metrics.alerts.iter().all(|a| a.category != RiskCategory::ValueAtRisk));
    }

    #[test]
    fn illiquid_options_raise_liquidity_finding() {
        let thin = Position::option(
            "ABC",
            OptionKind::Call,
            dec!(50),
            NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            1,
            dec!(2),
            dec!(2),
            dec!(50),
        )
        .with_iv(0.4)
        .with_activity(10, 50);
        let metrics = RiskMetricsCalculator::default().calculate(&context(vec![thin]));
        assert_eq!(metrics.liquidity, Some(0.0));
        let alert = metrics
            .alerts
            .iter()
            .find(|a| a.category == RiskCategory::Liquidity)
            .unwrap();
        assert_eq!(alert.severity, RiskSeverity::Breach);
        assert_eq!(alert.subject.as_deref(), Some("ABC"));
    }

    #[test]
    fn alerts_sorted_most_severe_first() {
        let metrics = RiskMetricsCalculator::default()
            .calculate(&context(vec![stock("AAPL", "Technology", 100)]));
        let severities: Vec<_> = metrics.alerts.iter().map(|a| a.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);
        assert_eq!(metrics.worst_severity(), Some(RiskSeverity::Critical));
    }
}
