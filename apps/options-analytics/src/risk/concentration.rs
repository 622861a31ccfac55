//! Concentration by symbol and sector.

use std::collections::BTreeMap;

use super::types::{ConcentrationEntry, ConcentrationScope, RiskSeverity};

/// Herfindahl index: sum of squared exposure shares.
///
/// 1.0 means everything sits in one bucket; 0 for an empty book.
#[must_use]
pub fn herfindahl(exposures: &BTreeMap<String, f64>) -> f64 {
    let total: f64 = exposures.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    exposures.values().map(|e| (e / total).powi(2)).sum()
}

/// Share of each bucket against a limit, largest share first.
#[must_use]
pub fn concentration_entries(
    scope: ConcentrationScope,
    exposures: &BTreeMap<String, f64>,
    limit: f64,
) -> Vec<ConcentrationEntry> {
    let total: f64 = exposures.values().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut entries: Vec<ConcentrationEntry> = exposures
        .iter()
        .map(|(name, exposure)| {
            let share = exposure / total;
            ConcentrationEntry {
                scope,
                name: name.clone(),
                exposure: *exposure,
                share,
                limit,
                severity: RiskSeverity::against_limit(share, limit),
            }
        })
        .collect();
    entries.sort_by(|a, b| b.share.total_cmp(&a.share));
    entries
}
