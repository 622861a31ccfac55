//! Position value object.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::config::PricingConfig;
use crate::observability::record_data_fallback;
use crate::pricing::{Greeks, OptionKind, price_and_greeks_for};

const DAYS_PER_YEAR: f64 = 365.0;

/// Instrument type of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    /// Long or short call contracts.
    Call,
    /// Long or short put contracts.
    Put,
    /// Shares of the underlying (stock-equivalent delta).
    Stock,
}

impl PositionType {
    /// Option kind for option positions.
    #[must_use]
    pub const fn option_kind(self) -> Option<OptionKind> {
        match self {
            Self::Call => Some(OptionKind::Call),
            Self::Put => Some(OptionKind::Put),
            Self::Stock => None,
        }
    }

    /// Check if this is an option position.
    #[must_use]
    pub const fn is_option(self) -> bool {
        !matches!(self, Self::Stock)
    }
}

/// Greeks computed for a position plus the data-quality flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricedGreeks {
    /// Per-contract (or per-share) Greeks.
    pub greeks: Greeks,
    /// Whether the fallback volatility replaced a missing IV.
    pub used_fallback_volatility: bool,
}

/// A portfolio holding, recreated from every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Underlying symbol.
    pub symbol: String,
    /// Instrument type.
    #[serde(rename = "type")]
    pub position_type: PositionType,
    /// Strike (options only).
    #[serde(default)]
    pub strike: Option<Decimal>,
    /// Expiration (options only).
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    /// Signed quantity in contracts or shares (negative = short).
    pub quantity: i64,
    /// Average entry price per share/contract unit.
    pub entry_price: Decimal,
    /// Current price per share/contract unit.
    pub current_price: Decimal,
    /// Underlying price at snapshot time.
    #[serde(default)]
    pub underlying_price: Decimal,
    /// Current implied volatility.
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    /// Implied volatility at the previous snapshot.
    #[serde(default)]
    pub previous_implied_volatility: Option<f64>,
    /// Sector classification.
    #[serde(default)]
    pub sector: Option<String>,
    /// Contract volume.
    #[serde(default)]
    pub volume: Option<u64>,
    /// Contract open interest.
    #[serde(default)]
    pub open_interest: Option<u64>,
    /// Computed Greeks snapshot.
    #[serde(default)]
    pub greeks: Option<Greeks>,
}

impl Position {
    /// Create an option position.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn option(
        symbol: impl Into<String>,
        kind: OptionKind,
        strike: Decimal,
        expiry: NaiveDate,
        quantity: i64,
        entry_price: Decimal,
        current_price: Decimal,
        underlying_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            position_type: match kind {
                OptionKind::Call => PositionType::Call,
                OptionKind::Put => PositionType::Put,
            },
            strike: Some(strike),
            expiry: Some(expiry),
            quantity,
            entry_price,
            current_price,
            underlying_price,
            implied_volatility: None,
            previous_implied_volatility: None,
            sector: None,
            volume: None,
            open_interest: None,
            greeks: None,
        }
    }

    /// Create a stock position.
    #[must_use]
    pub fn stock(
        symbol: impl Into<String>,
        quantity: i64,
        entry_price: Decimal,
        current_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            position_type: PositionType::Stock,
            strike: None,
            expiry: None,
            quantity,
            entry_price,
            current_price,
            underlying_price: current_price,
            implied_volatility: None,
            previous_implied_volatility: None,
            sector: None,
            volume: None,
            open_interest: None,
            greeks: None,
        }
    }

    /// Set the implied volatility.
    #[must_use]
    pub const fn with_iv(mut self, iv: f64) -> Self {
        self.implied_volatility = Some(iv);
        self
    }

    /// Set the previous implied volatility.
    #[must_use]
    pub const fn with_previous_iv(mut self, iv: f64) -> Self {
        self.previous_implied_volatility = Some(iv);
        self
    }

    /// Set the sector.
    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Set volume and open interest.
    #[must_use]
    pub const fn with_activity(mut self, volume: u64, open_interest: u64) -> Self {
        self.volume = Some(volume);
        self.open_interest = Some(open_interest);
        self
    }

    /// Attach a precomputed Greeks snapshot.
    #[must_use]
    pub const fn with_greeks_snapshot(mut self, greeks: Greeks) -> Self {
        self.greeks = Some(greeks);
        self
    }

    /// Compute and attach the Greeks snapshot.
    #[must_use]
    pub fn with_greeks(mut self, pricing: &PricingConfig, as_of: NaiveDate) -> Self {
        self.greeks = Some(self.compute_greeks(pricing, as_of).greeks);
        self
    }

    /// Check if this is a short position.
    #[must_use]
    pub const fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Shares per unit of quantity.
    #[must_use]
    pub fn multiplier(&self, pricing: &PricingConfig) -> f64 {
        if self.position_type.is_option() {
            f64::from(pricing.contract_multiplier)
        } else {
            1.0
        }
    }

    fn multiplier_decimal(&self, pricing: &PricingConfig) -> Decimal {
        if self.position_type.is_option() {
            Decimal::from(pricing.contract_multiplier)
        } else {
            Decimal::ONE
        }
    }

    /// Signed market value (current price × quantity × multiplier).
    #[must_use]
    pub fn market_value(&self, pricing: &PricingConfig) -> Decimal {
        self.current_price * Decimal::from(self.quantity) * self.multiplier_decimal(pricing)
    }

    /// Unrealized profit or loss.
    #[must_use]
    pub fn unrealized_pnl(&self, pricing: &PricingConfig) -> Decimal {
        (self.current_price - self.entry_price)
            * Decimal::from(self.quantity)
            * self.multiplier_decimal(pricing)
    }

    /// Unrealized profit or loss relative to the entry cost.
    #[must_use]
    pub fn unrealized_pnl_pct(&self) -> f64 {
        if self.entry_price <= Decimal::ZERO {
            return 0.0;
        }
        let change = ((self.current_price - self.entry_price) / self.entry_price)
            .to_f64()
            .unwrap_or(0.0);
        if self.is_short() { -change } else { change }
    }

    /// Strike as `f64` (options only).
    #[must_use]
    pub fn strike_f64(&self) -> Option<f64> {
        self.strike.and_then(|s| s.to_f64())
    }

    /// Underlying price as `f64`.
    #[must_use]
    pub fn underlying_f64(&self) -> f64 {
        self.underlying_price.to_f64().unwrap_or(0.0)
    }

    /// Calendar days to expiry (options only).
    #[must_use]
    pub fn days_to_expiry(&self, as_of: NaiveDate) -> Option<i64> {
        self.expiry.map(|e| (e - as_of).num_days())
    }

    /// Time to expiry in years (options only).
    #[must_use]
    pub fn time_to_expiry(&self, as_of: NaiveDate) -> Option<f64> {
        self.days_to_expiry(as_of).map(|d| d as f64 / DAYS_PER_YEAR)
    }

    /// Check if an option position has expired. Stock never expires.
    #[must_use]
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expiry.is_some_and(|e| e < as_of)
    }

    /// Moneyness as underlying / strike (options only).
    #[must_use]
    pub fn moneyness(&self) -> Option<f64> {
        let strike = self.strike_f64().filter(|s| *s > 0.0)?;
        Some(self.underlying_f64() / strike)
    }

    /// Whether an option position is in the money.
    #[must_use]
    pub fn is_itm(&self) -> bool {
        let (Some(kind), Some(strike)) = (self.position_type.option_kind(), self.strike_f64())
        else {
            return false;
        };
        let spot = self.underlying_f64();
        match kind {
            OptionKind::Call => spot > strike,
            OptionKind::Put => spot < strike,
        }
    }

    /// Change in implied volatility since the previous snapshot.
    #[must_use]
    pub fn iv_change(&self) -> Option<f64> {
        match (self.implied_volatility, self.previous_implied_volatility) {
            (Some(now), Some(before)) if now.is_finite() && before.is_finite() => {
                Some(now - before)
            }
            _ => None,
        }
    }

    /// Compute per-unit Greeks for this position.
    ///
    /// Options are priced with the position's IV, or the configured fallback
    /// volatility when the IV is missing. Stock carries a delta of 1.
    #[must_use]
    pub fn compute_greeks(&self, pricing: &PricingConfig, as_of: NaiveDate) -> PricedGreeks {
        let Some(kind) = self.position_type.option_kind() else {
            return PricedGreeks {
                greeks: Greeks {
                    price: self.current_price.to_f64().unwrap_or(0.0),
                    delta: 1.0,
                    ..Greeks::ZERO
                },
                used_fallback_volatility: false,
            };
        };

        let (volatility, used_fallback_volatility) =
            match self.implied_volatility.filter(|iv| iv.is_finite() && *iv > 0.0) {
                Some(iv) => (iv, false),
                None => {
                    tracing::warn!(
                        symbol = %self.symbol,
                        fallback = pricing.fallback_volatility,
                        "Position has no usable implied volatility, using fallback"
                    );
                    record_data_fallback("implied_volatility");
                    (pricing.fallback_volatility, true)
                }
            };

        let input = pricing.input(
            self.underlying_f64(),
            self.strike_f64().unwrap_or(0.0),
            self.time_to_expiry(as_of).unwrap_or(0.0),
            volatility,
        );

        PricedGreeks {
            greeks: price_and_greeks_for(&input, kind),
            used_fallback_volatility,
        }
    }
}
