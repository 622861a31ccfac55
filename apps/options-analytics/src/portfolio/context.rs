//! Portfolio context: positions plus the derived state risk checks read.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{GreeksAggregator, PortfolioGreeks, Position};
use crate::config::PricingConfig;
use crate::risk::CorrelationMatrix;

/// Sector label for positions without one.
pub const UNCLASSIFIED_SECTOR: &str = "Unclassified";

/// Capital the risk limits are measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBudget {
    /// Account value.
    pub account_value: Decimal,
    /// Explicit VaR ceiling, overriding the profile's fraction of account value.
    #[serde(default)]
    pub max_value_at_risk: Option<f64>,
}

/// Portfolio snapshot as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Valuation date.
    pub as_of: NaiveDate,
    /// Holdings.
    pub positions: Vec<Position>,
    /// Risk budget.
    #[serde(default)]
    pub risk_budget: Option<RiskBudget>,
    /// Pairwise correlations between held symbols.
    #[serde(default)]
    pub correlation: Option<CorrelationMatrix>,
}

/// Positions with their aggregate Greeks and exposures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioContext {
    /// Valuation date.
    pub as_of: NaiveDate,
    /// Holdings.
    pub positions: Vec<Position>,
    /// Net Greeks.
    pub greeks: PortfolioGreeks,
    /// Sum of per-position absolute delta notional.
    pub gross_dollar_delta: f64,
    /// Absolute exposure per underlying symbol.
    pub symbol_exposures: BTreeMap<String, f64>,
    /// Absolute exposure per sector.
    pub sector_exposures: BTreeMap<String, f64>,
    /// Sum of absolute position exposures.
    pub total_exposure: f64,
    /// Signed market value of the book.
    pub market_value: Decimal,
    /// Unrealized profit or loss of the book.
    pub unrealized_pnl: Decimal,
    /// Risk budget.
    pub risk_budget: Option<RiskBudget>,
    /// Correlation matrix.
    pub correlation: Option<CorrelationMatrix>,
}

impl PortfolioContext {
    /// Derive the context from a set of positions.
    #[must_use]
    pub fn from_positions(
        positions: Vec<Position>,
        as_of: NaiveDate,
        pricing: &PricingConfig,
    ) -> Self {
        let aggregator = GreeksAggregator::new(pricing.clone());
        let greeks = aggregator.aggregate(&positions, as_of);
        let gross_dollar_delta = aggregator
            .breakdown(&positions, as_of)
            .iter()
            .map(|c| c.dollar_delta.abs())
            .sum();

        let mut symbol_exposures = BTreeMap::new();
        let mut sector_exposures = BTreeMap::new();
        let mut total_exposure = 0.0;
        let mut market_value = Decimal::ZERO;
        let mut unrealized_pnl = Decimal::ZERO;

        for position in positions.iter().filter(|p| !p.is_expired(as_of)) {
            let value = position.market_value(pricing);
            let exposure = value.abs().to_f64().unwrap_or(0.0);
            let sector = position
                .sector
                .clone()
                .unwrap_or_else(|| UNCLASSIFIED_SECTOR.to_string());

            *symbol_exposures
                .entry(position.symbol.clone())
                .or_insert(0.0) += exposure;
            *sector_exposures.entry(sector).or_insert(0.0) += exposure;
            total_exposure += exposure;
            market_value += value;
            unrealized_pnl += position.unrealized_pnl(pricing);
        }

        Self {
            as_of,
            positions,
            greeks,
            gross_dollar_delta,
            symbol_exposures,
            sector_exposures,
            total_exposure,
            market_value,
            unrealized_pnl,
            risk_budget: None,
            correlation: None,
        }
    }

    /// Derive the context from a caller snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: PortfolioSnapshot, pricing: &PricingConfig) -> Self {
        let mut context = Self::from_positions(snapshot.positions, snapshot.as_of, pricing);
        context.risk_budget = snapshot.risk_budget;
        context.correlation = snapshot.correlation;
        context
    }

    /// Attach a risk budget.
    #[must_use]
    pub fn with_risk_budget(mut self, budget: RiskBudget) -> Self {
        self.risk_budget = Some(budget);
        self
    }

    /// Attach a correlation matrix.
    #[must_use]
    pub fn with_correlation(mut self, matrix: CorrelationMatrix) -> Self {
        self.correlation = Some(matrix);
        self
    }

    /// Share of total exposure held in a sector.
    #[must_use]
    pub fn sector_share(&self, sector: &str) -> f64 {
        share(self.sector_exposures.get(sector).copied(), self.total_exposure)
    }

    /// Share of total exposure held in a symbol.
    #[must_use]
    pub fn symbol_share(&self, symbol: &str) -> f64 {
        share(self.symbol_exposures.get(symbol).copied(), self.total_exposure)
    }

    /// Capital the limits are measured against: the budget's account value,
    /// else the book's total exposure.
    #[must_use]
    pub fn capital(&self) -> f64 {
        self.risk_budget
            .as_ref()
            .and_then(|b| b.account_value.to_f64())
            .filter(|v| *v > 0.0)
            .unwrap_or(self.total_exposure)
    }
}

fn share(exposure: Option<f64>, total: f64) -> f64 {
    match exposure {
        Some(e) if total > 0.0 => e / total,
        _ => 0.0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pricing::OptionKind;
    use rust_decimal_macros::dec;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn book() -> Vec<Position> {
        vec![
            Position::stock("AAPL", 100, dec!(170), dec!(180)).with_sector("Technology"),
            Position::stock("XOM", 100, dec!(110), dec!(120)).with_sector("Energy"),
            Position::option(
                "AAPL",
                OptionKind::Call,
                dec!(185),
                NaiveDate::from_ymd_opt(2025, 4, 17).unwrap(),
                2,
                dec!(5),
                dec!(6),
                dec!(180),
            )
            .with_iv(0.3)
            .with_sector("Technology"),
        ]
    }

    #[test]
    fn exposures_by_symbol_and_sector() {
        let context = PortfolioContext::from_positions(book(), as_of(), &PricingConfig::default());

        // 18,000 + 12,000 + 1,200
        assert!((context.total_exposure - 31_200.0).abs() < 1e-9);
        assert!((context.symbol_exposures["AAPL"] - 19_200.0).abs() < 1e-9);
        assert!((context.sector_share("Energy") - 12_000.0 / 31_200.0).abs() < 1e-12);
        assert_eq!(context.sector_share("Utilities"), 0.0);
        assert_eq!(context.market_value, dec!(31200));
        assert_eq!(context.unrealized_pnl, dec!(2200));
        assert_eq!(context.greeks.position_count, 3);
    }

    #[test]
    fn missing_sector_is_unclassified() {
        let positions = vec![Position::stock("SPY", 10, dec!(500), dec!(500))];
        let context = PortfolioContext::from_positions(positions, as_of(), &PricingConfig::default());
        assert_eq!(context.sector_share(UNCLASSIFIED_SECTOR), 1.0);
    }

    #[test]
    fn capital_prefers_risk_budget() {
        let context = PortfolioContext::from_positions(book(), as_of(), &PricingConfig::default());
        assert!((context.capital() - 31_200.0).abs() < 1e-9);

        let context = context.with_risk_budget(RiskBudget {
            account_value: dec!(100000),
            max_value_at_risk: None,
        });
        assert_eq!(context.capital(), 100_000.0);
    }

    #[test]
    fn empty_book_is_neutral() {
        let context = PortfolioContext::from_positions(Vec::new(), as_of(), &PricingConfig::default());
        assert_eq!(context.total_exposure, 0.0);
        assert_eq!(context.symbol_share("AAPL"), 0.0);
        assert_eq!(context.greeks, PortfolioGreeks::default());
    }

    #[test]
    fn snapshot_carries_budget_and_matrix() {
        let json = r#"{
            "as_of": "2025-03-03",
            "positions": [
                {"symbol": "AAPL", "type": "stock", "quantity": 10,
                 "entry_price": "170", "current_price": "180", "underlying_price": "180"}
            ],
            "risk_budget": {"account_value": "50000"},
            "correlation": {"AAPL": {"MSFT": 0.8}}
        }"#;
        let snapshot: PortfolioSnapshot = serde_json::from_str(json).unwrap();
        let context = PortfolioContext::from_snapshot(snapshot, &PricingConfig::default());
        assert_eq!(context.capital(), 50_000.0);
        assert_eq!(context.correlation.unwrap().get("MSFT", "AAPL"), Some(0.8));
    }
}
