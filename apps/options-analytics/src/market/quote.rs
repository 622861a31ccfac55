//! Underlying market quote snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Point-in-time quote for an underlying symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Ticker symbol.
    pub symbol: String,
    /// Last traded price.
    pub price: Decimal,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Session high.
    pub high: Decimal,
    /// Session low.
    pub low: Decimal,
    /// Session open.
    pub open: Decimal,
    /// Session volume.
    pub volume: u64,
    /// Quote timestamp.
    pub timestamp: DateTime<Utc>,
}

impl MarketQuote {
    /// Mid price, falling back to the last price when the book is one-sided.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        if self.bid > Decimal::ZERO && self.ask > Decimal::ZERO {
            (self.bid + self.ask) / Decimal::TWO
        } else {
            self.price
        }
    }

    /// Bid-ask spread as a fraction of mid.
    #[must_use]
    pub fn spread_pct(&self) -> f64 {
        let mid = self.mid();
        if mid <= Decimal::ZERO || self.ask < self.bid {
            return 0.0;
        }
        ((self.ask - self.bid) / mid).to_f64().unwrap_or(0.0)
    }

    /// Change from the session open as a fraction.
    #[must_use]
    pub fn change_from_open_pct(&self) -> f64 {
        if self.open <= Decimal::ZERO {
            return 0.0;
        }
        ((self.price - self.open) / self.open).to_f64().unwrap_or(0.0)
    }

    /// Last price as `f64`.
    #[must_use]
    pub fn price_f64(&self) -> f64 {
        self.price.to_f64().unwrap_or(0.0)
    }
}
