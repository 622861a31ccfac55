//! Correlation assessment.
//!
//! Without a matrix the score is the share of positions that repeat a
//! symbol already held: `1 − distinct / total`. With a matrix every distinct
//! pair of held symbols is looked up and pairs above the threshold are
//! flagged; the score is the mean absolute correlation of the pairs found.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::types::{CorrelatedPair, CorrelationRisk, CorrelationSource};
use crate::portfolio::Position;

/// Symmetric pairwise correlations keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationMatrix {
    entries: BTreeMap<String, BTreeMap<String, f64>>,
}

impl CorrelationMatrix {
    /// Empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(a, b, correlation)` triples.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S, f64)>,
        S: Into<String>,
    {
        let mut matrix = Self::new();
        for (a, b, value) in pairs {
            matrix.insert(a, b, value);
        }
        matrix
    }

    /// Set the correlation of a pair.
    pub fn insert(&mut self, a: impl Into<String>, b: impl Into<String>, value: f64) {
        let (a, b) = (a.into(), b.into());
        self.entries
            .entry(a.clone())
            .or_default()
            .insert(b.clone(), value);
        self.entries.entry(b).or_default().insert(a, value);
    }

    /// Correlation of a pair in either order. A symbol with itself is 1.
    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        if a == b {
            return Some(1.0);
        }
        self.entries
            .get(a)
            .and_then(|row| row.get(b))
            .or_else(|| self.entries.get(b).and_then(|row| row.get(a)))
            .copied()
            .filter(|v| v.is_finite())
    }

    /// Whether the matrix has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Distinct-symbol proxy: `1 − distinct / total`, 0 for an empty book.
#[must_use]
pub fn correlation_proxy(positions: &[Position]) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    let distinct: BTreeSet<&str> = positions.iter().map(|p| p.symbol.as_str()).collect();
    1.0 - distinct.len() as f64 / positions.len() as f64
}

/// Assess correlation, using the matrix when one is supplied.
#[must_use]
pub fn assess_correlation(
    positions: &[Position],
    matrix: Option<&CorrelationMatrix>,
    threshold: f64,
) -> CorrelationRisk {
    let Some(matrix) = matrix.filter(|m| !m.is_empty()) else {
        return CorrelationRisk {
            score: correlation_proxy(positions),
            source: CorrelationSource::Proxy,
            flagged_pairs: Vec::new(),
        };
    };

    let symbols: Vec<&str> = positions
        .iter()
        .map(|p| p.symbol.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut sum = 0.0;
    let mut found = 0usize;
    let mut flagged_pairs = Vec::new();
    for (i, first) in symbols.iter().enumerate() {
        for second in &symbols[i + 1..] {
            let Some(correlation) = matrix.get(first, second) else {
                continue;
            };
            sum += correlation.abs();
            found += 1;
            if correlation.abs() > threshold {
                flagged_pairs.push(CorrelatedPair {
                    first: (*first).to_string(),
                    second: (*second).to_string(),
                    correlation,
                });
            }
        }
    }

    CorrelationRisk {
        score: if found == 0 { 0.0 } else { sum / found as f64 },
        source: CorrelationSource::Matrix,
        flagged_pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stock(symbol: &str) -> Position {
        Position::stock(symbol, 10, dec!(100), dec!(100))
    }

    #[test]
    fn proxy_counts_repeated_symbols() {
        let positions = vec![stock("AAPL"), stock("AAPL"), stock("MSFT"), stock("NVDA")];
        assert!((correlation_proxy(&positions) - 0.25).abs() < 1e-12);
        assert_eq!(correlation_proxy(&[]), 0.0);
        assert_eq!(correlation_proxy(&[stock("AAPL"), stock("MSFT")]), 0.0);
    }

    #[test]
    fn matrix_lookup_is_symmetric() {
        let matrix = CorrelationMatrix::from_pairs([("AAPL", "MSFT", 0.8)]);
        assert_eq!(matrix.get("MSFT", "AAPL"), Some(0.8));
        assert_eq!(matrix.get("AAPL", "AAPL"), Some(1.0));
        assert_eq!(matrix.get("AAPL", "XOM"), None);
    }

    #[test]
    fn matrix_flags_pairs_over_threshold() {
        let matrix = CorrelationMatrix::from_pairs([
            ("AAPL", "MSFT", 0.82),
            ("AAPL", "XOM", -0.75),
            ("MSFT", "XOM", 0.10),
        ]);
        let positions = vec![stock("AAPL"), stock("MSFT"), stock("XOM")];
        let risk = assess_correlation(&positions, Some(&matrix), 0.7);

        assert_eq!(risk.source, CorrelationSource::Matrix);
        assert_eq!(risk.flagged_pairs.len(), 2);
        assert!(risk.flagged_pairs.iter().any(|p| p.correlation < 0.0));
        assert!((risk.score - (0.82 + 0.75 + 0.10) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_matrix_uses_proxy() {
        let positions = vec![stock("AAPL"), stock("AAPL")];
        let risk = assess_correlation(&positions, Some(&CorrelationMatrix::new()), 0.7);
        assert_eq!(risk.source, CorrelationSource::Proxy);
        assert!((risk.score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn matrix_deserializes_as_nested_map() {
        let json = r#"{"AAPL": {"MSFT": 0.9}}"#;
        let matrix: CorrelationMatrix = serde_json::from_str(json).unwrap();
        assert_eq!(matrix.get("MSFT", "AAPL"), Some(0.9));
    }
}
