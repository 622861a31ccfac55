//! Rule evaluation.
//!
//! Each rule moves idle → evaluate → fire → idle. It fires when it is
//! enabled, its cooldown has elapsed, every portfolio condition holds, and
//! (if it has position conditions) at least one position satisfies all of
//! them. Rules are evaluated in input order; the returned alerts are ranked
//! by severity, then rule priority.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use super::alert::{Alert, AlertDetails, AlertSeverity, AlertType, MatchedPosition};
use super::rule::{AlertRule, Condition, ConditionField, FieldScope};
use crate::config::{AlertsConfig, PricingConfig};
use crate::observability::{record_alert_fired, record_rule_suppressed};
use crate::portfolio::{GreeksAggregator, PortfolioContext, Position};

/// Days remaining at or below which expiration alerts escalate to high.
const EXPIRATION_HIGH_DAYS: i64 = 3;
/// IV change at or above which a volatility spike is high severity.
const VOL_SPIKE_HIGH: f64 = 0.10;

/// Evaluates alert rules against portfolio snapshots.
#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    aggregator: GreeksAggregator,
    config: AlertsConfig,
}

impl AlertEngine {
    /// Create an engine.
    #[must_use]
    pub const fn new(pricing: PricingConfig, config: AlertsConfig) -> Self {
        Self {
            aggregator: GreeksAggregator::new(pricing),
            config,
        }
    }

    /// Evaluate rules in order, recording `last_triggered` on every rule that
    /// fires. The alerts are ranked with [`rank_alerts`].
    pub fn evaluate(
        &self,
        rules: &mut [AlertRule],
        context: &PortfolioContext,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let mut alerts = self.fire(rules, context, now);
        rank_alerts(&mut alerts);
        alerts
    }

    /// Like [`evaluate`](Self::evaluate), but alerts stay in rule order.
    pub(crate) fn fire(
        &self,
        rules: &mut [AlertRule],
        context: &PortfolioContext,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for rule in rules.iter_mut() {
            if !rule.enabled {
                record_rule_suppressed("disabled");
                continue;
            }
            if !rule.cooldown_elapsed(now) {
                tracing::debug!(rule_id = %rule.id, until = ?rule.cooldown_until(), "Rule in cooldown");
                record_rule_suppressed("cooldown");
                continue;
            }
            let Some(details) = self.match_rule(rule, context) else {
                continue;
            };

            let alert = self.synthesize(rule, details, context, now);
            rule.mark_triggered(now);

            tracing::info!(
                rule_id = %rule.id,
                user_id = %rule.user_id,
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                confidence = alert.confidence,
                "Alert fired"
            );
            record_alert_fired(alert.alert_type.as_str(), alert.severity.as_str());
            alerts.push(alert);
        }

        alerts
    }

    /// Details if every condition of the rule holds, else `None`.
    fn match_rule(&self, rule: &AlertRule, context: &PortfolioContext) -> Option<AlertDetails> {
        if rule.conditions.is_empty() {
            tracing::warn!(rule_id = %rule.id, "Rule has no conditions, skipping");
            record_rule_suppressed("empty");
            return None;
        }
        if let Some(bad) = rule.conditions.iter().find(|c| !c.is_known()) {
            tracing::warn!(
                rule_id = %rule.id,
                field = ?bad.field,
                operator = ?bad.operator,
                "Rule references an unknown field or operator, condition is false"
            );
            record_rule_suppressed("unknown_condition");
            return None;
        }

        let mut details = AlertDetails::default();
        let mut position_conditions: Vec<&Condition> = Vec::new();

        for condition in &rule.conditions {
            match condition.field.scope() {
                FieldScope::Portfolio => {
                    let observed = portfolio_value(condition.field, context);
                    if !condition.matches(observed) {
                        return None;
                    }
                    details
                        .observed
                        .insert(condition.field.as_str().to_string(), observed);
                }
                FieldScope::Position => position_conditions.push(condition),
                FieldScope::Unknown => return None,
            }
        }

        if !position_conditions.is_empty() {
            details.matched_positions = context
                .positions
                .iter()
                .filter(|p| !p.is_expired(context.as_of))
                .filter(|p| {
                    position_conditions.iter().all(|c| {
                        self.position_value(c.field, p, context)
                            .is_some_and(|v| c.matches(v))
                    })
                })
                .map(|p| MatchedPosition {
                    symbol: p.symbol.clone(),
                    strike: p.strike,
                    expiry: p.expiry,
                    quantity: p.quantity,
                    days_to_expiry: p.days_to_expiry(context.as_of),
                })
                .collect();
            if details.matched_positions.is_empty() {
                return None;
            }
        }

        Some(details)
    }

    /// Value of a position field, `None` when it does not apply (for
    /// example, days to expiry of stock).
    fn position_value(
        &self,
        field: ConditionField,
        position: &Position,
        context: &PortfolioContext,
    ) -> Option<f64> {
        match field {
            ConditionField::TimeToExpiry => position.days_to_expiry(context.as_of).map(|d| d as f64),
            ConditionField::Moneyness => position.moneyness(),
            ConditionField::Quantity => Some(position.quantity as f64),
            ConditionField::QuantitySign => Some(position.quantity.signum() as f64),
            ConditionField::ImpliedVolatility => position.implied_volatility,
            ConditionField::ImpliedVolChange => position.iv_change(),
            ConditionField::UnrealizedPnlPct => Some(position.unrealized_pnl_pct()),
            ConditionField::PositionDelta => self
                .aggregator
                .contribution(position, context.as_of)
                .map(|c| c.greeks.delta),
            ConditionField::InTheMoney => position
                .position_type
                .is_option()
                .then(|| if position.is_itm() { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn synthesize(
        &self,
        rule: &AlertRule,
        details: AlertDetails,
        context: &PortfolioContext,
        now: DateTime<Utc>,
    ) -> Alert {
        let severity = rule
            .severity
            .unwrap_or_else(|| type_severity(rule, &details, context));
        let confidence = self.confidence(rule.alert_type, context);
        let message = describe(rule, &details);

        Alert {
            id: Uuid::new_v4(),
            user_id: rule.user_id.clone(),
            rule_id: rule.id.clone(),
            alert_type: rule.alert_type,
            severity,
            priority: rule.priority,
            title: rule.name.clone(),
            message,
            details,
            actions: rule.actions.clone(),
            confidence,
            timestamp: now,
            is_read: false,
            is_resolved: false,
        }
    }

    /// Base confidence, +0.1 with complete data or −0.2 when any Greeks
    /// used the fallback volatility, then a rule-type adjustment, clamped to
    /// [0.1, 1.0].
    fn confidence(&self, alert_type: AlertType, context: &PortfolioContext) -> f64 {
        let mut confidence = self.config.base_confidence;
        confidence += if context.greeks.is_data_complete() {
            0.1
        } else {
            -0.2
        };
        confidence += match alert_type {
            AlertType::Expiration => 0.2,
            AlertType::VolatilitySpike => -0.1,
            _ => 0.0,
        };
        confidence.clamp(0.1, 1.0)
    }
}

fn portfolio_value(field: ConditionField, context: &PortfolioContext) -> f64 {
    let greeks = &context.greeks;
    match field {
        ConditionField::TotalDelta => greeks.delta,
        ConditionField::TotalGamma => greeks.gamma,
        ConditionField::TotalTheta => greeks.theta,
        ConditionField::TotalVega => greeks.vega,
        ConditionField::TotalRho => greeks.rho,
        ConditionField::DollarDelta => greeks.dollar_delta,
        ConditionField::PortfolioValue => context.market_value.to_f64().unwrap_or(f64::NAN),
        ConditionField::UnrealizedPnl => context.unrealized_pnl.to_f64().unwrap_or(f64::NAN),
        ConditionField::PositionCount => greeks.position_count as f64,
        ConditionField::MaxSectorExposure => context
            .sector_exposures
            .keys()
            .map(|s| context.sector_share(s))
            .fold(0.0, f64::max),
        ConditionField::MaxSymbolExposure => context
            .symbol_exposures
            .keys()
            .map(|s| context.symbol_share(s))
            .fold(0.0, f64::max),
        _ => f64::NAN,
    }
}

fn type_severity(rule: &AlertRule, details: &AlertDetails, context: &PortfolioContext) -> AlertSeverity {
    let min_days = details
        .matched_positions
        .iter()
        .filter_map(|p| p.days_to_expiry)
        .min();

    match rule.alert_type {
        AlertType::Expiration => match min_days {
            Some(days) if days <= EXPIRATION_HIGH_DAYS => AlertSeverity::High,
            _ => AlertSeverity::Medium,
        },
        AlertType::Assignment => match min_days {
            Some(days) if days <= 1 => AlertSeverity::Critical,
            _ => AlertSeverity::High,
        },
        AlertType::GreeksExposure => greeks_severity(rule, details),
        AlertType::Concentration => AlertSeverity::High,
        AlertType::VolatilitySpike => {
            let spike = context
                .positions
                .iter()
                .filter(|p| {
                    details
                        .matched_positions
                        .iter()
                        .any(|m| m.symbol == p.symbol && m.strike == p.strike && m.expiry == p.expiry)
                })
                .filter_map(Position::iv_change)
                .map(f64::abs)
                .fold(0.0, f64::max);
            if spike >= VOL_SPIKE_HIGH {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            }
        }
        AlertType::ProfitLoss => {
            let loss = details
                .observed
                .get(ConditionField::UnrealizedPnl.as_str())
                .is_some_and(|pnl| *pnl < 0.0);
            if loss {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            }
        }
        AlertType::PriceMovement => AlertSeverity::Medium,
        AlertType::Custom => AlertSeverity::Low,
    }
}

/// Escalates with how far the first Greek breached its threshold:
/// ≥2× critical, ≥1.5× high, otherwise medium.
fn greeks_severity(rule: &AlertRule, details: &AlertDetails) -> AlertSeverity {
    let ratio = rule
        .conditions
        .iter()
        .filter(|c| c.field.is_greek())
        .find_map(|c| {
            let observed = details.observed.get(c.field.as_str())?;
            let threshold = c.threshold();
            (threshold.abs() > f64::EPSILON).then(|| (observed / threshold).abs())
        })
        .unwrap_or(1.0);

    if ratio >= 2.0 {
        AlertSeverity::Critical
    } else if ratio >= 1.5 {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

fn describe(rule: &AlertRule, details: &AlertDetails) -> String {
    let mut parts: Vec<String> = details
        .observed
        .iter()
        .map(|(field, value)| format!("{field}={value:.2}"))
        .collect();
    if !details.matched_positions.is_empty() {
        let symbols: Vec<&str> = details
            .matched_positions
            .iter()
            .map(|p| p.symbol.as_str())
            .collect();
        parts.push(format!("positions: {}", symbols.join(", ")));
    }
    if parts.is_empty() {
        rule.name.clone()
    } else {
        format!("{} ({})", rule.name, parts.join("; "))
    }
}

/// Most severe first, then highest priority; ties keep evaluation order.
pub fn rank_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.priority.cmp(&a.priority))
    });
}
