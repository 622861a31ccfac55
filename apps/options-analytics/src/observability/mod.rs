//! Observability module for logging and metrics.
//!
//! Logging goes through `tracing`; metrics go through the `metrics` facade so
//! the host application decides which recorder/exporter to install.

mod logging;
mod metrics;

pub use logging::{LoggingError, init_logging};
pub use metrics::{
    record_alert_fired, record_data_fallback, record_greeks_computation, record_iv_solve,
    record_risk_evaluation, record_rule_suppressed,
};
