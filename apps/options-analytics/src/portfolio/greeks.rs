//! Portfolio Greeks aggregation.
//!
//! Per-position Greeks are scaled to portfolio units and summed:
//!
//! | Position | delta | gamma | theta | vega | rho |
//! |----------|-------|-------|-------|------|-----|
//! | option   | Δ × qty × 100 | Γ × qty × 100 | Θ × qty × 100 | ν × qty × 100 | ρ × qty × 100 |
//! | stock    | qty   | 0     | 0     | 0    | 0   |
//!
//! Delta is in share-equivalents, theta in currency per day, vega in
//! currency per volatility point and rho in currency per rate point.
//! Expired positions contribute nothing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Position;
use crate::config::PricingConfig;
use crate::observability::record_greeks_computation;
use crate::pricing::Greeks;

/// Scaled Greeks of a single position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionGreeks {
    /// Position symbol.
    pub symbol: String,
    /// Greeks × quantity × multiplier.
    pub greeks: Greeks,
    /// Delta exposure in currency (delta × underlying price).
    pub dollar_delta: f64,
    /// Whether the fallback volatility was used.
    pub used_fallback_volatility: bool,
}

/// Net Greeks across a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioGreeks {
    /// Net delta in share-equivalents.
    pub delta: f64,
    /// Net gamma.
    pub gamma: f64,
    /// Net theta per day.
    pub theta: f64,
    /// Net vega per volatility point.
    pub vega: f64,
    /// Net rho per rate point.
    pub rho: f64,
    /// Net delta exposure in currency.
    pub dollar_delta: f64,
    /// Positions that contributed.
    pub position_count: usize,
    /// Expired positions that were skipped.
    pub skipped_expired: usize,
    /// Positions priced with the fallback volatility.
    pub fallback_count: usize,
}

impl PortfolioGreeks {
    fn add(&mut self, contribution: &PositionGreeks) {
        self.delta += contribution.greeks.delta;
        self.gamma += contribution.greeks.gamma;
        self.theta += contribution.greeks.theta;
        self.vega += contribution.greeks.vega;
        self.rho += contribution.greeks.rho;
        self.dollar_delta += contribution.dollar_delta;
        self.position_count += 1;
        if contribution.used_fallback_volatility {
            self.fallback_count += 1;
        }
    }

    /// Whether every contributing position had a usable IV.
    #[must_use]
    pub const fn is_data_complete(&self) -> bool {
        self.fallback_count == 0
    }
}

/// Aggregates position Greeks into portfolio totals.
#[derive(Debug, Clone, Default)]
pub struct GreeksAggregator {
    pricing: PricingConfig,
}

impl GreeksAggregator {
    /// Create an aggregator with the given pricing configuration.
    #[must_use]
    pub const fn new(pricing: PricingConfig) -> Self {
        Self { pricing }
    }

    /// Pricing configuration in use.
    #[must_use]
    pub const fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Scaled Greeks of one position, or `None` if it has expired.
    ///
    /// A stored Greeks snapshot on the position is reused; otherwise the
    /// kernel is run.
    #[must_use]
    pub fn contribution(&self, position: &Position, as_of: NaiveDate) -> Option<PositionGreeks> {
        if position.is_expired(as_of) {
            return None;
        }

        let (unit, used_fallback_volatility) = match position.greeks {
            Some(greeks) => (greeks, false),
            None => {
                let priced = position.compute_greeks(&self.pricing, as_of);
                (priced.greeks, priced.used_fallback_volatility)
            }
        };

        let factor = position.quantity as f64 * position.multiplier(&self.pricing);
        let greeks = if position.position_type.is_option() {
            unit.scale(factor)
        } else {
            Greeks {
                price: unit.price * factor,
                delta: factor,
                ..Greeks::ZERO
            }
        };

        Some(PositionGreeks {
            symbol: position.symbol.clone(),
            dollar_delta: greeks.delta * position.underlying_f64(),
            greeks,
            used_fallback_volatility,
        })
    }

    /// Per-position breakdown, skipping expired positions.
    #[must_use]
    pub fn breakdown(&self, positions: &[Position], as_of: NaiveDate) -> Vec<PositionGreeks> {
        positions
            .iter()
            .filter_map(|p| self.contribution(p, as_of))
            .collect()
    }

    /// Net portfolio Greeks.
    #[must_use]
    pub fn aggregate(&self, positions: &[Position], as_of: NaiveDate) -> PortfolioGreeks {
        let mut totals = PortfolioGreeks::default();
        for position in positions {
            match self.contribution(position, as_of) {
                Some(contribution) => totals.add(&contribution),
                None => totals.skipped_expired += 1,
            }
        }

        record_greeks_computation("portfolio", totals.position_count);
        tracing::debug!(
            positions = totals.position_count,
            expired = totals.skipped_expired,
            fallbacks = totals.fallback_count,
            delta = totals.delta,
            "Aggregated portfolio Greeks"
        );

        totals
    }
}

/// Net portfolio Greeks with the default pricing configuration.
#[must_use]
pub fn aggregate(positions: &[Position], as_of: NaiveDate) -> PortfolioGreeks {
    GreeksAggregator::default().aggregate(positions, as_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::OptionKind;
    use rust_decimal_macros::dec;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
    }

    fn put(quantity: i64) -> Position {
        Position::option(
            "AAPL",
            OptionKind::Put,
            dec!(100),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            quantity,
            dec!(3),
            dec!(3),
            dec!(100),
        )
    }

    #[test]
    fn short_put_with_snapshot_greeks() {
        let snapshot = Greeks {
            price: 3.0,
            delta: -0.30,
            gamma: 0.02,
            theta: -0.05,
            vega: 0.10,
            rho: -0.03,
        };
        let positions = vec![put(-1).with_greeks_snapshot(snapshot)];

        let totals = aggregate(&positions, as_of());
        assert!((totals.delta - 30.0).abs() < 1e-9);
        assert!((totals.gamma + 2.0).abs() < 1e-9);
        assert!((totals.theta - 5.0).abs() < 1e-9);
        assert!((totals.vega + 10.0).abs() < 1e-9);
        assert!((totals.rho - 3.0).abs() < 1e-9);
        assert!((totals.dollar_delta - 3000.0).abs() < 1e-9);
        assert_eq!(totals.position_count, 1);
    }

    #[test]
    fn stock_contributes_quantity_as_delta() {
        let positions = vec![Position::stock("MSFT", 250, dec!(400), dec!(410))];
        let totals = aggregate(&positions, as_of());
        assert_eq!(totals.delta, 250.0);
        assert_eq!(totals.gamma, 0.0);
        assert_eq!(totals.vega, 0.0);
        assert_eq!(totals.dollar_delta, 250.0 * 410.0);
    }

    #[test]
    fn expired_positions_are_skipped() {
        let mut expired = put(5).with_iv(0.25);
        expired.expiry = NaiveDate::from_ymd_opt(2024, 12, 20);
        let totals = aggregate(&[expired], as_of());
        assert_eq!(totals.position_count, 0);
        assert_eq!(totals.skipped_expired, 1);
        assert_eq!(totals.delta, 0.0);
    }

    #[test]
    fn missing_iv_counts_as_fallback() {
        let totals = aggregate(&[put(1)], as_of());
        assert_eq!(totals.fallback_count, 1);
        assert!(!totals.is_data_complete());
        assert!(totals.delta < 0.0);
    }

    #[test]
    fn long_and_short_offset() {
        let positions = vec![put(3).with_iv(0.25), put(-3).with_iv(0.25)];
        let totals = aggregate(&positions, as_of());
        assert!(totals.delta.abs() < 1e-9);
        assert!(totals.gamma.abs() < 1e-9);
        assert!(totals.vega.abs() < 1e-9);
        assert_eq!(totals.position_count, 2);
    }

    #[test]
    fn breakdown_matches_totals() {
        let aggregator = GreeksAggregator::default();
        let positions = vec![
            put(-2).with_iv(0.30),
            Position::stock("AAPL", 100, dec!(95), dec!(100)),
        ];
        let parts = aggregator.breakdown(&positions, as_of());
        let totals = aggregator.aggregate(&positions, as_of());
        let summed: f64 = parts.iter().map(|p| p.greeks.delta).sum();
        assert_eq!(parts.len(), 2);
        assert!((summed - totals.delta).abs() < 1e-9);
    }
}
