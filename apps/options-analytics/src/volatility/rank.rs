//! IV rank and percentile analytics.

use serde::{Deserialize, Serialize};

use crate::observability::record_data_fallback;

/// Look-back period, in trading days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IvPeriod {
    /// 21 trading days.
    OneMonth,
    /// 63 trading days.
    ThreeMonths,
    /// 126 trading days.
    SixMonths,
    /// 252 trading days.
    #[default]
    OneYear,
}

impl IvPeriod {
    /// Number of trading days in the period.
    #[must_use]
    pub const fn trading_days(self) -> usize {
        match self {
            Self::OneMonth => 21,
            Self::ThreeMonths => 63,
            Self::SixMonths => 126,
            Self::OneYear => 252,
        }
    }
}

/// Percentile band of the current IV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IvClassification {
    /// Below the 10th percentile.
    ExtremelyLow,
    /// 10th to 25th percentile.
    Low,
    /// 25th to 75th percentile.
    Normal,
    /// 75th to 90th percentile.
    High,
    /// 90th percentile and above.
    ExtremelyHigh,
}

impl IvClassification {
    /// Band for a percentile in [0, 100].
    #[must_use]
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile < 10.0 {
            Self::ExtremelyLow
        } else if percentile < 25.0 {
            Self::Low
        } else if percentile < 75.0 {
            Self::Normal
        } else if percentile < 90.0 {
            Self::High
        } else {
            Self::ExtremelyHigh
        }
    }

    /// Premium stance and its confidence for this band.
    #[must_use]
    pub const fn regime(self) -> (PremiumStrategy, f64) {
        match self {
            Self::ExtremelyLow => (PremiumStrategy::BuyPremium, 0.9),
            Self::Low => (PremiumStrategy::BuyPremium, 0.7),
            Self::Normal => (PremiumStrategy::Neutral, 0.5),
            Self::High => (PremiumStrategy::SellPremium, 0.7),
            Self::ExtremelyHigh => (PremiumStrategy::SellPremium, 0.9),
        }
    }
}

/// Premium stance implied by the IV regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumStrategy {
    /// Options are cheap: favor long premium.
    BuyPremium,
    /// Options are rich: favor short premium.
    SellPremium,
    /// No edge either way.
    Neutral,
}

/// Position of the current IV within its history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvRankPercentile {
    /// Current IV.
    pub current_iv: f64,
    /// Look-back period.
    pub period: IvPeriod,
    /// `(current − min) / (max − min) × 100`, clamped to [0, 100].
    pub iv_rank: f64,
    /// Share of history strictly below the current IV, × 100.
    pub iv_percentile: f64,
    /// Percentile band.
    pub classification: IvClassification,
    /// Premium stance.
    pub recommendation: PremiumStrategy,
    /// Confidence in the stance.
    pub confidence: f64,
    /// Mean of the history.
    pub mean: f64,
    /// Population standard deviation of the history.
    pub std_dev: f64,
    /// `(current − mean) / std_dev` (0 when flat).
    pub z_score: f64,
    /// Lowest historical IV.
    pub min: f64,
    /// Highest historical IV.
    pub max: f64,
    /// Observations used.
    pub sample_size: usize,
}

/// Rank and percentile of `current_iv` against the most recent `period`
/// observations of `historical_ivs` (oldest first).
///
/// Non-finite observations are dropped. An empty history or unusable
/// current IV yields a neutral result (rank and percentile 50).
#[must_use]
pub fn rank_percentile(current_iv: f64, historical_ivs: &[f64], period: IvPeriod) -> IvRankPercentile {
    let window_start = historical_ivs.len().saturating_sub(period.trading_days());
    let history: Vec<f64> = historical_ivs[window_start..]
        .iter()
        .copied()
        .filter(|iv| iv.is_finite())
        .collect();

    if history.is_empty() || !current_iv.is_finite() {
        tracing::warn!(
            current_iv,
            observations = history.len(),
            "IV history unavailable, returning neutral rank"
        );
        record_data_fallback("iv_history");
        return neutral(current_iv, period, history.len());
    }

    let n = history.len() as f64;
    let min = history.iter().copied().fold(f64::INFINITY, f64::min);
    let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = history.iter().sum::<f64>() / n;
    let std_dev = (history.iter().map(|iv| (iv - mean).powi(2)).sum::<f64>() / n).sqrt();

    let range = max - min;
    let iv_rank = if range > f64::EPSILON {
        ((current_iv - min) / range * 100.0).clamp(0.0, 100.0)
    } else {
        50.0
    };
    let below = history.iter().filter(|iv| **iv < current_iv).count();
    let iv_percentile = below as f64 / n * 100.0;
    let z_score = if std_dev > f64::EPSILON {
        (current_iv - mean) / std_dev
    } else {
        0.0
    };

    let classification = IvClassification::from_percentile(iv_percentile);
    let (recommendation, confidence) = classification.regime();

    IvRankPercentile {
        current_iv,
        period,
        iv_rank,
        iv_percentile,
        classification,
        recommendation,
        confidence,
        mean,
        std_dev,
        z_score,
        min,
        max,
        sample_size: history.len(),
    }
}

fn neutral(current_iv: f64, period: IvPeriod, sample_size: usize) -> IvRankPercentile {
    let (recommendation, confidence) = IvClassification::Normal.regime();
    IvRankPercentile {
        current_iv,
        period,
        iv_rank: 50.0,
        iv_percentile: 50.0,
        classification: IvClassification::Normal,
        recommendation,
        confidence,
        mean: 0.0,
        std_dev: 0.0,
        z_score: 0.0,
        min: 0.0,
        max: 0.0,
        sample_size,
    }
}
