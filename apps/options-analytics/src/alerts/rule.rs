//! Alert rules and their conditions.
//!
//! Condition fields and operators are closed enums. Anything a rule names
//! that is not listed here deserializes to `Unknown`, and an unknown field
//! or operator never matches, so a malformed rule stays silent.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::alert::{AlertSeverity, AlertType};

const EQ_TOLERANCE: f64 = 1e-9;

/// Metric a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionField {
    /// Net portfolio delta (share-equivalents).
    TotalDelta,
    /// Net portfolio gamma.
    TotalGamma,
    /// Net portfolio theta per day.
    TotalTheta,
    /// Net portfolio vega per volatility point.
    TotalVega,
    /// Net portfolio rho per rate point.
    TotalRho,
    /// Net delta notional.
    DollarDelta,
    /// Signed market value of the book.
    PortfolioValue,
    /// Unrealized profit or loss of the book.
    UnrealizedPnl,
    /// Number of live positions.
    PositionCount,
    /// Largest sector share of exposure.
    MaxSectorExposure,
    /// Largest symbol share of exposure.
    MaxSymbolExposure,
    /// Calendar days to expiry of a position.
    TimeToExpiry,
    /// Spot / strike of a position.
    Moneyness,
    /// Signed quantity of a position.
    Quantity,
    /// Sign of a position's quantity (−1, 0, 1).
    QuantitySign,
    /// Implied volatility of a position.
    ImpliedVolatility,
    /// Change in a position's implied volatility since the last snapshot.
    ImpliedVolChange,
    /// Unrealized profit or loss of a position relative to entry.
    UnrealizedPnlPct,
    /// Scaled delta of a position.
    PositionDelta,
    /// Whether a position is in the money (1) or not (0).
    InTheMoney,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

/// Scope a field is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    /// Evaluated once against portfolio aggregates.
    Portfolio,
    /// Evaluated per position.
    Position,
    /// Never evaluates true.
    Unknown,
}

impl ConditionField {
    /// Scope of this field.
    #[must_use]
    pub const fn scope(self) -> FieldScope {
        match self {
            Self::TotalDelta
            | Self::TotalGamma
            | Self::TotalTheta
            | Self::TotalVega
            | Self::TotalRho
            | Self::DollarDelta
            | Self::PortfolioValue
            | Self::UnrealizedPnl
            | Self::PositionCount
            | Self::MaxSectorExposure
            | Self::MaxSymbolExposure => FieldScope::Portfolio,
            Self::TimeToExpiry
            | Self::Moneyness
            | Self::Quantity
            | Self::QuantitySign
            | Self::ImpliedVolatility
            | Self::ImpliedVolChange
            | Self::UnrealizedPnlPct
            | Self::PositionDelta
            | Self::InTheMoney => FieldScope::Position,
            Self::Unknown => FieldScope::Unknown,
        }
    }

    /// Whether this is one of the portfolio Greeks.
    #[must_use]
    pub const fn is_greek(self) -> bool {
        matches!(
            self,
            Self::TotalDelta
                | Self::TotalGamma
                | Self::TotalTheta
                | Self::TotalVega
                | Self::TotalRho
                | Self::DollarDelta
        )
    }

    /// Serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TotalDelta => "totalDelta",
            Self::TotalGamma => "totalGamma",
            Self::TotalTheta => "totalTheta",
            Self::TotalVega => "totalVega",
            Self::TotalRho => "totalRho",
            Self::DollarDelta => "dollarDelta",
            Self::PortfolioValue => "portfolioValue",
            Self::UnrealizedPnl => "unrealizedPnl",
            Self::PositionCount => "positionCount",
            Self::MaxSectorExposure => "maxSectorExposure",
            Self::MaxSymbolExposure => "maxSymbolExposure",
            Self::TimeToExpiry => "timeToExpiry",
            Self::Moneyness => "moneyness",
            Self::Quantity => "quantity",
            Self::QuantitySign => "quantitySign",
            Self::ImpliedVolatility => "impliedVolatility",
            Self::ImpliedVolChange => "impliedVolChange",
            Self::UnrealizedPnlPct => "unrealizedPnlPct",
            Self::PositionDelta => "positionDelta",
            Self::InTheMoney => "inTheMoney",
            Self::Unknown => "unknown",
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Equal within 1e-9.
    Eq,
    /// Inside an inclusive range.
    Between,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

/// Threshold a condition compares against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    /// Single threshold.
    Single(f64),
    /// Inclusive `[low, high]` range for `between`.
    Range([f64; 2]),
}

/// One `(field, operator, value)` test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Metric read.
    pub field: ConditionField,
    /// Comparison.
    pub operator: ConditionOperator,
    /// Threshold.
    pub value: ConditionValue,
}

impl Condition {
    /// Create a condition.
    #[must_use]
    pub const fn new(field: ConditionField, operator: ConditionOperator, value: ConditionValue) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    /// Single-threshold condition.
    #[must_use]
    pub const fn single(field: ConditionField, operator: ConditionOperator, value: f64) -> Self {
        Self::new(field, operator, ConditionValue::Single(value))
    }

    /// Inclusive range condition.
    #[must_use]
    pub const fn between(field: ConditionField, low: f64, high: f64) -> Self {
        Self::new(field, ConditionOperator::Between, ConditionValue::Range([low, high]))
    }

    /// Whether the field and operator are both known.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.field != ConditionField::Unknown && self.operator != ConditionOperator::Unknown
    }

    /// Compare an observed value. Unknown operators, non-finite values and
    /// operator/value shape mismatches never match.
    #[must_use]
    pub fn matches(&self, observed: f64) -> bool {
        if !observed.is_finite() {
            return false;
        }
        match (self.operator, self.value) {
            (ConditionOperator::Gt, ConditionValue::Single(v)) => observed > v,
            (ConditionOperator::Gte, ConditionValue::Single(v)) => observed >= v,
            (ConditionOperator::Lt, ConditionValue::Single(v)) => observed < v,
            (ConditionOperator::Lte, ConditionValue::Single(v)) => observed <= v,
            (ConditionOperator::Eq, ConditionValue::Single(v)) => (observed - v).abs() <= EQ_TOLERANCE,
            (ConditionOperator::Between, ConditionValue::Range([low, high])) => {
                (low.min(high)..=low.max(high)).contains(&observed)
            }
            _ => false,
        }
    }

    /// Scalar threshold (lower bound for ranges).
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        match self.value {
            ConditionValue::Single(v) => v,
            ConditionValue::Range([low, _]) => low,
        }
    }
}

/// Delivery channel requested by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AlertAction {
    /// In-app notification.
    Notify,
    /// Email.
    Email,
    /// Mobile push.
    Push,
    /// HTTP callback.
    Webhook {
        /// Target URL.
        url: String,
    },
}

const fn default_enabled() -> bool {
    true
}

/// A user's alert rule.
///
/// Only `last_triggered` and `enabled` change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Rule identifier.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Category of the alerts it produces.
    pub alert_type: AlertType,
    /// AND-combined conditions.
    pub conditions: Vec<Condition>,
    /// Requested delivery channels.
    #[serde(default)]
    pub actions: Vec<AlertAction>,
    /// Minutes before the rule may fire again.
    #[serde(default)]
    pub cooldown_minutes: i64,
    /// Higher fires first among equal severities.
    #[serde(default)]
    pub priority: u32,
    /// Fixed severity overriding the type-specific logic.
    #[serde(default)]
    pub severity: Option<AlertSeverity>,
    /// Disabled rules are skipped.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Last time the rule fired.
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

impl AlertRule {
    /// Create an enabled rule that notifies in-app, with no cooldown.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        alert_type: AlertType,
        conditions: Vec<Condition>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            alert_type,
            conditions,
            actions: vec![AlertAction::Notify],
            cooldown_minutes: 0,
            priority: 0,
            severity: None,
            enabled: true,
            last_triggered: None,
        }
    }

    /// Set the cooldown period.
    #[must_use]
    pub const fn with_cooldown_minutes(mut self, minutes: i64) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Fix the severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Set the delivery actions.
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<AlertAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Earliest time the rule may fire again.
    #[must_use]
    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.last_triggered
            .map(|t| t + Duration::minutes(self.cooldown_minutes.max(0)))
    }

    /// Whether the cooldown has elapsed at `now`.
    #[must_use]
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until().is_none_or(|until| now >= until)
    }

    /// Record a fire.
    pub const fn mark_triggered(&mut self, now: DateTime<Utc>) {
        self.last_triggered = Some(now);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ConditionOperator::Gt, 5.0, 6.0, true ; "gt above")]
    #[test_case(ConditionOperator::Gt, 5.0, 5.0, false ; "gt equal")]
    #[test_case(ConditionOperator::Gte, 5.0, 5.0, true ; "gte equal")]
    #[test_case(ConditionOperator::Lt, 5.0, 4.0, true ; "lt below")]
    #[test_case(ConditionOperator::Lt, 5.0, 5.0, false ; "lt equal")]
    #[test_case(ConditionOperator::Lte, 5.0, 5.0, true ; "lte equal")]
    #[test_case(ConditionOperator::Eq, 5.0, 5.0, true ; "eq equal")]
    #[test_case(ConditionOperator::Eq, 5.0, 5.1, false ; "eq different")]
    #[test_case(ConditionOperator::Unknown, 5.0, 6.0, false ; "unknown operator")]
    #[test_case(ConditionOperator::Between, 5.0, 5.0, false ; "between needs range")]
    fn single_operators(operator: ConditionOperator, threshold: f64, observed: f64, expected: bool) {
        let condition = Condition::single(ConditionField::TotalDelta, operator, threshold);
        assert_eq!(condition.matches(observed), expected);
    }

    #[test]
    fn between_is_inclusive_and_order_insensitive() {
        let condition = Condition::between(ConditionField::Moneyness, 0.95, 1.05);
        assert!(condition.matches(0.95));
        assert!(condition.matches(1.05));
        assert!(!condition.matches(1.06));

        let reversed = Condition::between(ConditionField::Moneyness, 1.05, 0.95);
        assert!(reversed.matches(1.0));
    }

    #[test]
    fn non_finite_never_matches() {
        let condition = Condition::single(ConditionField::TotalDelta, ConditionOperator::Lt, 0.0);
        assert!(!condition.matches(f64::NAN));
        assert!(!condition.matches(f64::NEG_INFINITY));
    }

    #[test]
    fn unknown_field_and_operator_deserialize() {
        let json = r#"{"field": "totalDeltaa", "operator": "approx", "value": 1.0}"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(condition.field, ConditionField::Unknown);
        assert_eq!(condition.operator, ConditionOperator::Unknown);
        assert!(!condition.is_known());
    }

    #[test]
    fn range_value_deserializes() {
        let json = r#"{"field": "timeToExpiry", "operator": "between", "value": [0, 7]}"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(condition.value, ConditionValue::Range([0.0, 7.0]));
        assert_eq!(condition.field.scope(), FieldScope::Position);
        assert_eq!(condition.field.as_str(), "timeToExpiry");
    }

    #[test]
    fn cooldown_window() {
        let t0 = DateTime::parse_from_rfc3339("2025-01-02T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut rule = AlertRule::new("r1", "u1", "delta", AlertType::GreeksExposure, Vec::new())
            .with_cooldown_minutes(60);
        assert!(rule.cooldown_elapsed(t0));

        rule.mark_triggered(t0);
        assert!(!rule.cooldown_elapsed(t0 + Duration::minutes(59)));
        assert!(rule.cooldown_elapsed(t0 + Duration::minutes(60)));
    }

    #[test]
    fn rule_deserializes_with_defaults() {
        let json = r#"{
            "id": "r1",
            "user_id": "u1",
            "name": "Expiring soon",
            "alert_type": "expiration",
            "conditions": [{"field": "timeToExpiry", "operator": "lte", "value": 7}],
            "actions": [{"type": "webhook", "url": "https://example.com/hook"}],
            "cooldown_minutes": 60
        }"#;
        let rule: AlertRule = serde_json::from_str(json).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.priority, 0);
        assert!(rule.last_triggered.is_none());
        assert_eq!(
            rule.actions,
            vec![AlertAction::Webhook {
                url: "https://example.com/hook".into()
            }]
        );
    }
}
