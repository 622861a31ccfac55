//! Volatility surface construction and interpolation settings.

use serde::{Deserialize, Serialize};

/// Volatility surface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Largest strike distance, as a fraction of spot, for interpolation neighbors.
    pub max_strike_distance: f64,
    /// Largest expiry distance, in days, for interpolation neighbors.
    pub max_days_distance: i64,
    /// Number of nearest neighbors blended per interpolation query.
    pub max_neighbors: usize,
    /// Absolute skew above which the surface is classified as put or call skewed.
    pub skew_threshold: f64,
    /// IV difference between front and back ATM vol that marks a sloped term structure.
    pub term_slope_threshold: f64,
    /// Absolute delta of the wing contracts used for the skew measure.
    pub target_skew_delta: f64,
    /// Moneyness (spot / strike) below which a smile point counts as the low wing.
    pub low_wing_moneyness: f64,
    /// Moneyness above which a smile point counts as the high wing.
    pub high_wing_moneyness: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            max_strike_distance: 0.25,
            max_days_distance: 90,
            max_neighbors: 4,
            skew_threshold: 0.02,
            term_slope_threshold: 0.01,
            target_skew_delta: 0.25,
            low_wing_moneyness: 0.9,
            high_wing_moneyness: 1.1,
        }
    }
}
