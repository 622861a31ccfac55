//! Option contract and option chain snapshots.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::pricing::OptionKind;

const DAYS_PER_YEAR: f64 = 365.0;

/// Immutable snapshot of a listed option contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Contract symbol (OCC or venue format).
    #[serde(default)]
    pub symbol: String,
    /// Underlying symbol.
    #[serde(default)]
    pub underlying: String,
    /// Strike price.
    pub strike: Decimal,
    /// Expiration date.
    pub expiry: NaiveDate,
    /// Call or put.
    #[serde(rename = "type")]
    pub option_type: OptionKind,
    /// Best bid.
    #[serde(default)]
    pub bid: Decimal,
    /// Best ask.
    #[serde(default)]
    pub ask: Decimal,
    /// Last traded price.
    #[serde(default)]
    pub last: Decimal,
    /// Session volume.
    #[serde(default)]
    pub volume: u64,
    /// Open interest.
    #[serde(default)]
    pub open_interest: u64,
    /// Vendor-supplied implied volatility, when available.
    #[serde(default)]
    pub implied_volatility: Option<f64>,
}

impl OptionContract {
    /// Create a contract with an empty quote.
    #[must_use]
    pub fn new(
        underlying: impl Into<String>,
        strike: Decimal,
        expiry: NaiveDate,
        option_type: OptionKind,
    ) -> Self {
        let underlying = underlying.into();
        let symbol = format!(
            "{underlying}{}{}{strike}",
            expiry.format("%y%m%d"),
            if option_type.is_call() { 'C' } else { 'P' }
        );
        Self {
            symbol,
            underlying,
            strike,
            expiry,
            option_type,
            bid: Decimal::ZERO,
            ask: Decimal::ZERO,
            last: Decimal::ZERO,
            volume: 0,
            open_interest: 0,
            implied_volatility: None,
        }
    }

    /// Set bid, ask and last.
    #[must_use]
    pub const fn with_quote(mut self, bid: Decimal, ask: Decimal, last: Decimal) -> Self {
        self.bid = bid;
        self.ask = ask;
        self.last = last;
        self
    }

    /// Set volume and open interest.
    #[must_use]
    pub const fn with_activity(mut self, volume: u64, open_interest: u64) -> Self {
        self.volume = volume;
        self.open_interest = open_interest;
        self
    }

    /// Set the implied volatility.
    #[must_use]
    pub const fn with_iv(mut self, iv: f64) -> Self {
        self.implied_volatility = Some(iv);
        self
    }

    /// Strike as `f64`.
    #[must_use]
    pub fn strike_f64(&self) -> f64 {
        self.strike.to_f64().unwrap_or(0.0)
    }

    /// Check if this is a call.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        self.option_type.is_call()
    }

    /// Usable implied volatility (present, finite and positive).
    #[must_use]
    pub fn usable_iv(&self) -> Option<f64> {
        self.implied_volatility
            .filter(|iv| iv.is_finite() && *iv > 0.0)
    }

    /// Mid price from bid/ask, falling back to last. `None` without any price.
    #[must_use]
    pub fn mid(&self) -> Option<Decimal> {
        if self.bid > Decimal::ZERO && self.ask >= self.bid {
            Some((self.bid + self.ask) / Decimal::TWO)
        } else if self.last > Decimal::ZERO {
            Some(self.last)
        } else {
            None
        }
    }

    /// Calendar days until expiry (negative once expired).
    #[must_use]
    pub fn days_to_expiry(&self, as_of: NaiveDate) -> i64 {
        (self.expiry - as_of).num_days()
    }

    /// Time to expiry in years.
    #[must_use]
    pub fn time_to_expiry(&self, as_of: NaiveDate) -> f64 {
        self.days_to_expiry(as_of) as f64 / DAYS_PER_YEAR
    }

    /// Check if the contract has expired.
    #[must_use]
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expiry < as_of
    }

    /// Moneyness as spot / strike.
    #[must_use]
    pub fn moneyness(&self, spot: f64) -> f64 {
        let strike = self.strike_f64();
        if strike > 0.0 { spot / strike } else { 0.0 }
    }
}

/// Option chain for one underlying at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    /// Underlying symbol.
    pub underlying: String,
    /// Underlying price at snapshot time.
    pub underlying_price: Decimal,
    /// Snapshot date.
    pub as_of: NaiveDate,
    /// Listed contracts.
    pub contracts: Vec<OptionContract>,
}

impl OptionChain {
    /// Distinct expirations, ascending.
    #[must_use]
    pub fn expirations(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.contracts.iter().map(|c| c.expiry).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Contracts for a given expiration.
    pub fn contracts_for(&self, expiry: NaiveDate) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(move |c| c.expiry == expiry)
    }

    /// Underlying price as `f64`.
    #[must_use]
    pub fn spot(&self) -> f64 {
        self.underlying_price.to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn contract_symbol_and_accessors() {
        let c = OptionContract::new("AAPL", dec!(150), date(2025, 1, 17), OptionKind::Call);
        assert_eq!(c.symbol, "AAPL250117C150");
        assert_eq!(c.strike_f64(), 150.0);
        assert!(c.is_call());
        assert!((c.moneyness(165.0) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn contract_mid_and_fallbacks() {
        let base = OptionContract::new("AAPL", dec!(150), date(2025, 1, 17), OptionKind::Put);
        assert_eq!(base.mid(), None);

        let quoted = base.clone().with_quote(dec!(2.00), dec!(2.20), dec!(2.05));
        assert_eq!(quoted.mid(), Some(dec!(2.10)));

        let last_only = base.with_quote(Decimal::ZERO, Decimal::ZERO, dec!(1.95));
        assert_eq!(last_only.mid(), Some(dec!(1.95)));
    }

    #[test]
    fn contract_expiry_math() {
        let c = OptionContract::new("SPY", dec!(500), date(2025, 3, 21), OptionKind::Call);
        let as_of = date(2025, 2, 19);
        assert_eq!(c.days_to_expiry(as_of), 30);
        assert!((c.time_to_expiry(as_of) - 30.0 / 365.0).abs() < 1e-12);
        assert!(!c.is_expired(as_of));
        assert!(c.is_expired(date(2025, 3, 22)));
        assert!(!c.is_expired(date(2025, 3, 21)));
    }

    #[test]
    fn usable_iv_filters_bad_values() {
        let c = OptionContract::new("SPY", dec!(500), date(2025, 3, 21), OptionKind::Call);
        assert_eq!(c.clone().with_iv(0.2).usable_iv(), Some(0.2));
        assert_eq!(c.clone().with_iv(0.0).usable_iv(), None);
        assert_eq!(c.with_iv(f64::NAN).usable_iv(), None);
    }

    #[test]
    fn contract_deserializes_snapshot_shape() {
        let json = r#"{
            "strike": "195",
            "expiry": "2025-02-21",
            "type": "call",
            "bid": "2.50",
            "ask": "2.62",
            "last": "2.55",
            "volume": 1200,
            "open_interest": 8000,
            "implied_volatility": 0.25
        }"#;
        let c: OptionContract = serde_json::from_str(json).unwrap();
        assert_eq!(c.strike, dec!(195));
        assert_eq!(c.option_type, OptionKind::Call);
        assert_eq!(c.open_interest, 8000);
        assert_eq!(c.usable_iv(), Some(0.25));
    }

    #[test]
    fn chain_expirations_sorted_unique() {
        let chain = OptionChain {
            underlying: "SPY".to_string(),
            underlying_price: dec!(500),
            as_of: date(2025, 1, 2),
            contracts: vec![
                OptionContract::new("SPY", dec!(500), date(2025, 2, 21), OptionKind::Call),
                OptionContract::new("SPY", dec!(500), date(2025, 1, 17), OptionKind::Call),
                OptionContract::new("SPY", dec!(510), date(2025, 2, 21), OptionKind::Put),
            ],
        };
        assert_eq!(chain.expirations(), vec![date(2025, 1, 17), date(2025, 2, 21)]);
        assert_eq!(chain.contracts_for(date(2025, 2, 21)).count(), 2);
        assert_eq!(chain.spot(), 500.0);
    }
}
