//! Alert value objects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::rule::AlertAction;

/// Category of an alert, driving its severity logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Options approaching expiration.
    Expiration,
    /// Portfolio Greeks beyond a threshold.
    GreeksExposure,
    /// Exposure concentrated in a symbol or sector.
    Concentration,
    /// Implied volatility moved sharply.
    VolatilitySpike,
    /// Short options at risk of assignment.
    Assignment,
    /// Underlying or position price moved.
    PriceMovement,
    /// Profit or loss threshold crossed.
    ProfitLoss,
    /// User-defined.
    Custom,
}

impl AlertType {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expiration => "expiration",
            Self::GreeksExposure => "greeks_exposure",
            Self::Concentration => "concentration",
            Self::VolatilitySpike => "volatility_spike",
            Self::Assignment => "assignment",
            Self::PriceMovement => "price_movement",
            Self::ProfitLoss => "profit_loss",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Low,
    /// Needs attention.
    Medium,
    /// Act soon.
    High,
    /// Act now.
    Critical,
}

impl AlertSeverity {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position that satisfied a rule's position conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPosition {
    /// Underlying symbol.
    pub symbol: String,
    /// Strike (options only).
    pub strike: Option<rust_decimal::Decimal>,
    /// Expiration (options only).
    pub expiry: Option<NaiveDate>,
    /// Signed quantity.
    pub quantity: i64,
    /// Calendar days to expiry (options only).
    pub days_to_expiry: Option<i64>,
}

/// Values that made a rule fire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertDetails {
    /// Observed value per portfolio condition field.
    pub observed: BTreeMap<String, f64>,
    /// Positions matching every position condition.
    pub matched_positions: Vec<MatchedPosition>,
}

/// An alert synthesized by the rule engine.
///
/// Immutable except for the read and resolved flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert identifier.
    pub id: Uuid,
    /// Owner.
    pub user_id: String,
    /// Rule that fired.
    pub rule_id: String,
    /// Category.
    pub alert_type: AlertType,
    /// Severity.
    pub severity: AlertSeverity,
    /// Priority copied from the rule.
    pub priority: u32,
    /// Short title.
    pub title: String,
    /// Human-readable message.
    pub message: String,
    /// Values behind the alert.
    pub details: AlertDetails,
    /// Delivery channels requested by the rule.
    pub actions: Vec<AlertAction>,
    /// Confidence in [0.1, 1.0].
    pub confidence: f64,
    /// When the alert fired.
    pub timestamp: DateTime<Utc>,
    /// Acknowledged by the user.
    pub is_read: bool,
    /// Resolved by the user.
    pub is_resolved: bool,
}

impl Alert {
    /// Mark as read.
    pub const fn acknowledge(&mut self) {
        self.is_read = true;
    }

    /// Mark as resolved; resolving also marks as read.
    pub const fn resolve(&mut self) {
        self.is_read = true;
        self.is_resolved = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_by_urgency() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::High > AlertSeverity::Medium);
        assert!(AlertSeverity::Medium > AlertSeverity::Low);
    }

    #[test]
    fn type_labels_match_serde() {
        for t in [
            AlertType::Expiration,
            AlertType::GreeksExposure,
            AlertType::VolatilitySpike,
            AlertType::ProfitLoss,
        ] {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn resolve_marks_read() {
        let mut alert = Alert {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            rule_id: "r1".into(),
            alert_type: AlertType::Custom,
            severity: AlertSeverity::Low,
            priority: 0,
            title: String::new(),
            message: String::new(),
            details: AlertDetails::default(),
            actions: Vec::new(),
            confidence: 0.7,
            timestamp: Utc::now(),
            is_read: false,
            is_resolved: false,
        };
        alert.resolve();
        assert!(alert.is_read && alert.is_resolved);
    }
}
