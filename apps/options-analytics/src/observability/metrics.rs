//! Metrics for the analytics core.
//!
//! All functions record through the `metrics` facade and are no-ops until
//! the host installs a recorder.

use metrics::{counter, histogram};

// ============================================================================
// Pricing Metrics
// ============================================================================

/// Record a batch of Greeks computations.
///
/// # Arguments
///
/// * `source` - Caller (e.g., "portfolio", "surface")
/// * `count` - Number of contracts priced
pub fn record_greeks_computation(source: &'static str, count: usize) {
    counter!("greeks_computations_total", "source" => source).increment(count as u64);
}

/// Record an implied volatility solve.
pub fn record_iv_solve(iterations: u32, converged: bool) {
    histogram!("iv_solver_iterations").record(f64::from(iterations));
    if !converged {
        counter!("iv_solver_non_converged_total").increment(1);
    }
}

/// Record a data-quality fallback (missing IV, missing price, empty history).
pub fn record_data_fallback(field: &'static str) {
    counter!("data_quality_fallbacks_total", "field" => field).increment(1);
}

// ============================================================================
// Risk & Alert Metrics
// ============================================================================

/// Record a portfolio risk evaluation.
pub fn record_risk_evaluation(profile: &'static str, findings: usize) {
    counter!("risk_evaluations_total", "profile" => profile).increment(1);
    histogram!("risk_findings_per_evaluation").record(findings as f64);
}

/// Record a fired alert.
pub fn record_alert_fired(alert_type: &'static str, severity: &'static str) {
    counter!(
        "alerts_fired_total",
        "alert_type" => alert_type,
        "severity" => severity
    )
    .increment(1);
}

/// Record a rule that matched but did not fire.
///
/// # Arguments
///
/// * `reason` - Suppression reason (e.g., "cooldown", "disabled")
pub fn record_rule_suppressed(reason: &'static str) {
    counter!("alert_rules_suppressed_total", "reason" => reason).increment(1);
}
