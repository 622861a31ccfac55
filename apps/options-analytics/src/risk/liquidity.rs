//! Liquidity scoring from volume and open-interest buckets.

use crate::portfolio::Position;

/// Score a single contract on a 0-100 scale.
///
/// Volume adds 30 above 100 and another 20 above 500. Open interest adds 30
/// above 1,000 and another 20 above 5,000.
#[must_use]
pub const fn liquidity_score(volume: u64, open_interest: u64) -> f64 {
    let mut score = 0.0;
    if volume > 100 {
        score += 30.0;
    }
    if volume > 500 {
        score += 20.0;
    }
    if open_interest > 1_000 {
        score += 30.0;
    }
    if open_interest > 5_000 {
        score += 20.0;
    }
    score
}

/// Average score across positions that report volume or open interest.
///
/// Positions with neither field carry no signal and are left out; `None`
/// when no position has activity data.
#[must_use]
pub fn portfolio_liquidity(positions: &[Position]) -> Option<f64> {
    let scores: Vec<f64> = positions
        .iter()
        .filter(|p| p.volume.is_some() || p.open_interest.is_some())
        .map(|p| liquidity_score(p.volume.unwrap_or(0), p.open_interest.unwrap_or(0)))
        .collect();

    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// Symbols of positions scoring below the minimum.
#[must_use]
pub fn illiquid_symbols(positions: &[Position], min_score: f64) -> Vec<String> {
    positions
        .iter()
        .filter(|p| p.volume.is_some() || p.open_interest.is_some())
        .filter(|p| {
            liquidity_score(p.volume.unwrap_or(0), p.open_interest.unwrap_or(0)) < min_score
        })
        .map(|p| p.symbol.clone())
        .collect()
}
