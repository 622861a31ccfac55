//! Rule-based alerting.
//!
//! Users register [`AlertRule`]s made of AND-combined [`Condition`]s over
//! portfolio aggregates or individual positions. The [`AlertEngine`]
//! evaluates them against a [`PortfolioContext`](crate::portfolio::PortfolioContext)
//! and synthesizes [`Alert`]s; the [`AlertService`] retains them per user and
//! pushes them to subscribers through the [`AlertHub`].

mod alert;
mod delivery;
mod engine;
mod rule;
mod service;
mod store;

pub use alert::{Alert, AlertDetails, AlertSeverity, AlertType, MatchedPosition};
pub use delivery::{AlertHub, AlertSubscription, Delivery, SubscriptionToken};
pub use engine::{AlertEngine, rank_alerts};
pub use rule::{
    AlertAction, AlertRule, Condition, ConditionField, ConditionOperator, ConditionValue,
    FieldScope,
};
pub use service::{AlertService, AlertServiceError};
pub use store::AlertStore;
