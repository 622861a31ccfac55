//! Per-user alert state.
//!
//! The service owns each user's rules and retained alerts behind a
//! per-user lock, so evaluations for one user are serialized while
//! different users proceed independently. Fired alerts are retained and
//! published to the user's subscriber, if any.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::alert::Alert;
use super::delivery::{AlertHub, AlertSubscription, SubscriptionToken};
use super::engine::{AlertEngine, rank_alerts};
use super::rule::AlertRule;
use super::store::AlertStore;
use crate::config::{AlertsConfig, PricingConfig};
use crate::portfolio::PortfolioContext;

/// Errors from alert state operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertServiceError {
    /// A rule with this id already exists for the user.
    #[error("rule already exists: {0}")]
    DuplicateRule(String),

    /// No such rule for the user.
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    /// No such alert for the user.
    #[error("alert not found: {0}")]
    AlertNotFound(Uuid),
}

#[derive(Debug)]
struct UserAlerts {
    rules: Vec<AlertRule>,
    store: AlertStore,
}

/// Alert rules, retained alerts and delivery for all users.
#[derive(Debug)]
pub struct AlertService {
    engine: AlertEngine,
    config: AlertsConfig,
    users: Mutex<HashMap<String, Arc<Mutex<UserAlerts>>>>,
    hub: AlertHub,
}

impl Default for AlertService {
    fn default() -> Self {
        Self::new(PricingConfig::default(), AlertsConfig::default())
    }
}

impl AlertService {
    /// Create a service.
    #[must_use]
    pub fn new(pricing: PricingConfig, config: AlertsConfig) -> Self {
        let hub = AlertHub::new(config.subscriber_buffer);
        Self {
            engine: AlertEngine::new(pricing, config.clone()),
            config,
            users: Mutex::new(HashMap::new()),
            hub,
        }
    }

    /// State for a user, created on first use.
    fn user(&self, user_id: &str) -> Arc<Mutex<UserAlerts>> {
        let mut users = self.users.lock();
        Arc::clone(users.entry(user_id.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(UserAlerts {
                rules: Vec::new(),
                store: AlertStore::new(self.config.max_alerts_per_user),
            }))
        }))
    }

    /// State for a known user; never creates an entry.
    fn get_user(&self, user_id: &str) -> Option<Arc<Mutex<UserAlerts>>> {
        self.users.lock().get(user_id).map(Arc::clone)
    }

    /// Register a rule under its owner.
    pub fn add_rule(&self, rule: AlertRule) -> Result<(), AlertServiceError> {
        let user = self.user(&rule.user_id);
        let mut state = user.lock();
        if state.rules.iter().any(|r| r.id == rule.id) {
            return Err(AlertServiceError::DuplicateRule(rule.id));
        }
        tracing::debug!(rule_id = %rule.id, user_id = %rule.user_id, "Alert rule added");
        state.rules.push(rule);
        Ok(())
    }

    /// Remove a rule.
    pub fn remove_rule(&self, user_id: &str, rule_id: &str) -> Result<AlertRule, AlertServiceError> {
        let user = self
            .get_user(user_id)
            .ok_or_else(|| AlertServiceError::RuleNotFound(rule_id.to_string()))?;
        let mut state = user.lock();
        let index = state
            .rules
            .iter()
            .position(|r| r.id == rule_id)
            .ok_or_else(|| AlertServiceError::RuleNotFound(rule_id.to_string()))?;
        Ok(state.rules.remove(index))
    }

    /// Enable or disable a rule.
    pub fn set_rule_enabled(
        &self,
        user_id: &str,
        rule_id: &str,
        enabled: bool,
    ) -> Result<(), AlertServiceError> {
        let user = self
            .get_user(user_id)
            .ok_or_else(|| AlertServiceError::RuleNotFound(rule_id.to_string()))?;
        let mut state = user.lock();
        let rule = state
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| AlertServiceError::RuleNotFound(rule_id.to_string()))?;
        rule.enabled = enabled;
        Ok(())
    }

    /// A user's rules in registration order.
    pub fn rules(&self, user_id: &str) -> Vec<AlertRule> {
        self.get_user(user_id)
            .map(|user| user.lock().rules.clone())
            .unwrap_or_default()
    }

    /// Evaluate a user's rules, retain and publish the resulting alerts.
    ///
    /// Alerts are retained and published in rule order; the returned
    /// vector is ranked by severity then priority.
    pub fn evaluate(
        &self,
        user_id: &str,
        context: &PortfolioContext,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let user = self.user(user_id);
        let mut state = user.lock();
        let UserAlerts { rules, store } = &mut *state;

        let mut alerts = self.engine.fire(rules, context, now);
        for alert in &alerts {
            if let Some(evicted) = store.push(alert.clone()) {
                tracing::debug!(user_id, alert_id = %evicted.id, "Evicted oldest alert");
            }
            self.hub.publish(alert);
        }

        tracing::debug!(
            user_id,
            rules = rules.len(),
            fired = alerts.len(),
            "Alert rules evaluated"
        );
        rank_alerts(&mut alerts);
        alerts
    }

    /// Mark an alert as read.
    pub fn acknowledge(&self, user_id: &str, alert_id: Uuid) -> Result<(), AlertServiceError> {
        let user = self
            .get_user(user_id)
            .ok_or(AlertServiceError::AlertNotFound(alert_id))?;
        let mut state = user.lock();
        state
            .store
            .get_mut(alert_id)
            .ok_or(AlertServiceError::AlertNotFound(alert_id))?
            .acknowledge();
        Ok(())
    }

    /// Mark an alert as resolved.
    pub fn resolve(&self, user_id: &str, alert_id: Uuid) -> Result<(), AlertServiceError> {
        let user = self
            .get_user(user_id)
            .ok_or(AlertServiceError::AlertNotFound(alert_id))?;
        let mut state = user.lock();
        state
            .store
            .get_mut(alert_id)
            .ok_or(AlertServiceError::AlertNotFound(alert_id))?
            .resolve();
        Ok(())
    }

    /// Retained alerts, newest first.
    pub fn alerts(&self, user_id: &str) -> Vec<Alert> {
        self.get_user(user_id)
            .map(|user| user.lock().store.newest_first().cloned().collect())
            .unwrap_or_default()
    }

    /// Retained alerts not yet read.
    pub fn unread_count(&self, user_id: &str) -> usize {
        self.get_user(user_id)
            .map_or(0, |user| user.lock().store.unread_count())
    }

    /// Subscribe to a user's alerts, replacing any existing subscriber.
    pub fn subscribe(&self, user_id: &str) -> AlertSubscription {
        self.hub.subscribe(user_id)
    }

    /// Drop a subscription; stale tokens are ignored.
    pub fn unsubscribe(&self, user_id: &str, token: SubscriptionToken) -> bool {
        self.hub.unsubscribe(user_id, token)
    }

    /// Delivery hub.
    pub const fn hub(&self) -> &AlertHub {
        &self.hub
    }
}
