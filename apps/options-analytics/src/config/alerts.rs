//! Alert engine settings.

use serde::{Deserialize, Serialize};

/// Alert engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Alerts retained per user; the oldest is evicted first.
    pub max_alerts_per_user: usize,
    /// Confidence assigned before data-quality and rule-type adjustments.
    pub base_confidence: f64,
    /// Buffered alerts per subscriber channel before new ones are dropped.
    pub subscriber_buffer: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            max_alerts_per_user: 100,
            base_confidence: 0.7,
            subscriber_buffer: 256,
        }
    }
}
