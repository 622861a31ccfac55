//! Volatility surface construction.
//!
//! Builds smile, skew and term structure from a contract lattice and
//! answers point queries by inverse-distance blending of the nearest
//! surface points.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{PricingConfig, SurfaceConfig};
use crate::market::{OptionChain, OptionContract};
use crate::observability::record_data_fallback;
use crate::pricing::{IvSolver, IvSolverConfig, OptionKind, price_and_greeks_for};

const DAYS_PER_YEAR: f64 = 365.0;
const TIE_EPSILON: f64 = 1e-9;

/// Where a point's implied volatility came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IvSource {
    /// Supplied with the contract.
    Quoted,
    /// Solved from the contract's mid price.
    Solved,
}

/// One contract on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    /// Strike.
    pub strike: f64,
    /// Expiration date.
    pub expiry: NaiveDate,
    /// Calendar days to expiry.
    pub days_to_expiry: i64,
    /// Spot / strike.
    pub moneyness: f64,
    /// Implied volatility.
    pub implied_volatility: f64,
    /// Call or put.
    pub option_type: OptionKind,
    /// Origin of the IV.
    pub source: IvSource,
}

/// Smile of the nearest expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Smile {
    /// Expiration date.
    pub expiry: NaiveDate,
    /// Calendar days to expiry.
    pub days_to_expiry: i64,
    /// Points sorted by strike.
    pub points: Vec<SurfacePoint>,
    /// IV change per unit strike between the two wings (0 without both wings).
    pub slope: f64,
    /// Strike with the lowest IV.
    pub min_iv_strike: Option<f64>,
    /// Lowest IV on the smile.
    pub min_iv: Option<f64>,
}

/// Direction of the volatility skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkewDirection {
    /// Downside puts are bid over calls.
    PutSkew,
    /// Upside calls are bid over puts.
    CallSkew,
    /// No meaningful skew.
    #[default]
    Neutral,
}

/// Wing skew relative to ATM volatility.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Skew {
    /// Target-delta put IV − ATM IV.
    pub put_skew: f64,
    /// Target-delta call IV − ATM IV.
    pub call_skew: f64,
    /// `put_skew − call_skew`.
    pub overall_skew: f64,
    /// Classification of `overall_skew`.
    pub direction: SkewDirection,
    /// IV of the put closest to the target delta.
    pub put_iv: Option<f64>,
    /// IV of the call closest to the target delta.
    pub call_iv: Option<f64>,
}

/// Shape of the ATM term structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermShape {
    /// Back months above front months.
    Contango,
    /// Front months above back months.
    Backwardation,
    /// Within the slope threshold.
    #[default]
    Flat,
}

/// ATM volatility of one expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermPoint {
    /// Expiration date.
    pub expiry: NaiveDate,
    /// Calendar days to expiry.
    pub days_to_expiry: i64,
    /// ATM IV for the expiration.
    pub atm_volatility: f64,
}

/// ATM volatility per expiration, ascending by days to expiry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermStructure {
    /// Points sorted by days to expiry.
    pub points: Vec<TermPoint>,
    /// Overall shape.
    pub shape: TermShape,
}

/// Volatility surface for one underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySurface {
    /// Underlying price the surface was built at.
    pub underlying_price: f64,
    /// Valuation date.
    pub as_of: NaiveDate,
    /// IV at the strike nearest the underlying price.
    pub atm_volatility: f64,
    /// Smile of the nearest expiration.
    pub smile: Option<Smile>,
    /// Wing skew.
    pub skew: Skew,
    /// ATM term structure.
    pub term_structure: TermStructure,
    /// Contracts skipped for lack of a usable IV.
    pub skipped_contracts: usize,
    points: Vec<SurfacePoint>,
    #[serde(skip)]
    config: SurfaceConfig,
}

impl VolatilitySurface {
    /// All surface points.
    #[must_use]
    pub fn points(&self) -> &[SurfacePoint] {
        &self.points
    }

    /// Whether the surface has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Interpolated IV at an arbitrary strike and days to expiry.
    ///
    /// Blends up to `max_neighbors` points by `1 / (1 + distance)`, where
    /// distance is `|ΔK| / spot + |Δdays| / 365`. Points outside the
    /// configured strike and days window are ignored; with no neighbors the
    /// ATM volatility is returned.
    #[must_use]
    pub fn interpolate(&self, strike: f64, days_to_expiry: i64) -> f64 {
        if !strike.is_finite() || self.underlying_price <= 0.0 {
            return self.atm_volatility;
        }

        let max_days_distance = u64::try_from(self.config.max_days_distance).unwrap_or(0);
        let mut neighbors: Vec<(f64, f64)> = self
            .points
            .iter()
            .filter_map(|p| {
                let strike_distance = (p.strike - strike).abs() / self.underlying_price;
                let days_distance = p.days_to_expiry.abs_diff(days_to_expiry);
                (strike_distance <= self.config.max_strike_distance
                    && days_distance <= max_days_distance)
                    .then(|| {
                        let distance = strike_distance + days_distance as f64 / DAYS_PER_YEAR;
                        (distance, p.implied_volatility)
                    })
            })
            .collect();

        if neighbors.is_empty() {
            return self.atm_volatility;
        }

        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));
        neighbors.truncate(self.config.max_neighbors.max(1));

        let (weighted, total_weight) = neighbors
            .iter()
            .fold((0.0, 0.0), |(sum, weights), (distance, iv)| {
                let weight = 1.0 / (1.0 + distance);
                (sum + weight * iv, weights + weight)
            });
        weighted / total_weight
    }
}

/// Builds volatility surfaces from contract snapshots.
#[derive(Debug, Clone, Default)]
pub struct SurfaceBuilder {
    config: SurfaceConfig,
    pricing: PricingConfig,
    solver: IvSolver,
}

impl SurfaceBuilder {
    /// Create a builder.
    #[must_use]
    pub const fn new(config: SurfaceConfig, pricing: PricingConfig, solver: IvSolverConfig) -> Self {
        Self {
            config,
            pricing,
            solver: IvSolver::new(solver),
        }
    }

    /// Build a surface from an option chain.
    #[must_use]
    pub fn build_chain(&self, chain: &OptionChain) -> VolatilitySurface {
        self.build(&chain.contracts, chain.spot(), chain.as_of)
    }

    /// Build a surface from contracts at an underlying price.
    #[must_use]
    pub fn build(
        &self,
        contracts: &[OptionContract],
        underlying_price: f64,
        as_of: NaiveDate,
    ) -> VolatilitySurface {
        let mut skipped_contracts = 0;
        let mut points = Vec::with_capacity(contracts.len());

        if underlying_price.is_finite() && underlying_price > 0.0 {
            for contract in contracts {
                match self.point(contract, underlying_price, as_of) {
                    Some(point) => points.push(point),
                    None => skipped_contracts += 1,
                }
            }
        } else {
            tracing::warn!(underlying_price, "Surface requested at non-positive underlying price");
            skipped_contracts = contracts.len();
        }

        let atm_volatility = match nearest_strike_iv(points.iter(), underlying_price) {
            Some(iv) => iv,
            None => {
                tracing::warn!(
                    contracts = contracts.len(),
                    fallback = self.pricing.fallback_volatility,
                    "No usable contracts for ATM volatility, using fallback"
                );
                record_data_fallback("atm_volatility");
                self.pricing.fallback_volatility
            }
        };

        let smile = self.smile(&points);
        let skew = smile
            .as_ref()
            .map(|s| self.skew(s, underlying_price, atm_volatility))
            .unwrap_or_default();
        let term_structure = self.term_structure(&points, underlying_price);

        tracing::debug!(
            points = points.len(),
            skipped = skipped_contracts,
            atm_volatility,
            skew = skew.overall_skew,
            "Built volatility surface"
        );

        VolatilitySurface {
            underlying_price,
            as_of,
            atm_volatility,
            smile,
            skew,
            term_structure,
            skipped_contracts,
            points,
            config: self.config.clone(),
        }
    }

    fn point(
        &self,
        contract: &OptionContract,
        spot: f64,
        as_of: NaiveDate,
    ) -> Option<SurfacePoint> {
        let strike = contract.strike_f64();
        if strike <= 0.0 || contract.is_expired(as_of) {
            return None;
        }

        let (implied_volatility, source) = match contract.usable_iv() {
            Some(iv) => (iv, IvSource::Quoted),
            None => (self.solve_from_mid(contract, spot, as_of)?, IvSource::Solved),
        };

        Some(SurfacePoint {
            strike,
            expiry: contract.expiry,
            days_to_expiry: contract.days_to_expiry(as_of),
            moneyness: spot / strike,
            implied_volatility,
            option_type: contract.option_type,
            source,
        })
    }

    fn solve_from_mid(&self, contract: &OptionContract, spot: f64, as_of: NaiveDate) -> Option<f64> {
        let solved = contract.mid().and_then(|mid| {
            let mid = mid.to_f64()?;
            let input = self.pricing.input(
                spot,
                contract.strike_f64(),
                contract.time_to_expiry(as_of),
                0.0,
            );
            let solution = self.solver.solve_detailed(mid, &input, contract.option_type);
            solution.converged.then_some(solution.volatility)
        });

        if solved.is_none() {
            tracing::warn!(
                symbol = %contract.symbol,
                strike = %contract.strike,
                expiry = %contract.expiry,
                "Contract has no usable IV or quote, skipping"
            );
            record_data_fallback("implied_volatility");
        }
        solved
    }

    fn smile(&self, points: &[SurfacePoint]) -> Option<Smile> {
        let nearest_days = points.iter().map(|p| p.days_to_expiry).min()?;
        let mut smile_points: Vec<SurfacePoint> = points
            .iter()
            .filter(|p| p.days_to_expiry == nearest_days)
            .cloned()
            .collect();
        smile_points.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        let expiry = smile_points.first()?.expiry;
        let slope = self.smile_slope(&smile_points);
        let bottom = smile_points
            .iter()
            .min_by(|a, b| a.implied_volatility.total_cmp(&b.implied_volatility));

        Some(Smile {
            expiry,
            days_to_expiry: nearest_days,
            min_iv_strike: bottom.map(|p| p.strike),
            min_iv: bottom.map(|p| p.implied_volatility),
            slope,
            points: smile_points,
        })
    }

    /// Slope between the wing points nearest the moneyness cutoffs,
    /// ordered by strike.
    fn smile_slope(&self, points: &[SurfacePoint]) -> f64 {
        let below = points
            .iter()
            .filter(|p| p.moneyness < self.config.low_wing_moneyness)
            .max_by(|a, b| a.moneyness.total_cmp(&b.moneyness));
        let above = points
            .iter()
            .filter(|p| p.moneyness > self.config.high_wing_moneyness)
            .min_by(|a, b| a.moneyness.total_cmp(&b.moneyness));

        let (Some(a), Some(b)) = (below, above) else {
            return 0.0;
        };
        let (low, high) = if a.strike < b.strike { (a, b) } else { (b, a) };
        let width = high.strike - low.strike;
        if width.abs() < TIE_EPSILON {
            return 0.0;
        }
        (high.implied_volatility - low.implied_volatility) / width
    }

    fn skew(&self, smile: &Smile, spot: f64, atm_volatility: f64) -> Skew {
        let t = smile.days_to_expiry as f64 / DAYS_PER_YEAR;
        let target = self.config.target_skew_delta;

        let closest = |kind: OptionKind| {
            smile
                .points
                .iter()
                .filter(|p| p.option_type == kind)
                .map(|p| {
                    let input = self.pricing.input(spot, p.strike, t, p.implied_volatility);
                    let delta = price_and_greeks_for(&input, kind).delta;
                    ((delta.abs() - target).abs(), p.implied_volatility)
                })
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, iv)| iv)
        };

        let put_iv = closest(OptionKind::Put);
        let call_iv = closest(OptionKind::Call);
        let put_skew = put_iv.map_or(0.0, |iv| iv - atm_volatility);
        let call_skew = call_iv.map_or(0.0, |iv| iv - atm_volatility);
        let overall_skew = put_skew - call_skew;

        let direction = if overall_skew > self.config.skew_threshold {
            SkewDirection::PutSkew
        } else if overall_skew < -self.config.skew_threshold {
            SkewDirection::CallSkew
        } else {
            SkewDirection::Neutral
        };

        Skew {
            put_skew,
            call_skew,
            overall_skew,
            direction,
            put_iv,
            call_iv,
        }
    }

    fn term_structure(&self, points: &[SurfacePoint], spot: f64) -> TermStructure {
        let mut by_expiry: BTreeMap<NaiveDate, Vec<&SurfacePoint>> = BTreeMap::new();
        for point in points {
            by_expiry.entry(point.expiry).or_default().push(point);
        }

        let mut term: Vec<TermPoint> = by_expiry
            .into_iter()
            .filter_map(|(expiry, group)| {
                let days_to_expiry = group.first()?.days_to_expiry;
                let atm_volatility = nearest_strike_iv(group.into_iter(), spot)?;
                Some(TermPoint {
                    expiry,
                    days_to_expiry,
                    atm_volatility,
                })
            })
            .collect();
        term.sort_by_key(|p| p.days_to_expiry);

        let shape = match (term.first(), term.last()) {
            (Some(front), Some(back)) if term.len() > 1 => {
                let change = back.atm_volatility - front.atm_volatility;
                if change > self.config.term_slope_threshold {
                    TermShape::Contango
                } else if change < -self.config.term_slope_threshold {
                    TermShape::Backwardation
                } else {
                    TermShape::Flat
                }
            }
            _ => TermShape::Flat,
        };

        TermStructure {
            points: term,
            shape,
        }
    }
}

/// IV at the strike nearest `spot`.
///
/// Ties go to the nearest expiration; equally near points there (a call and
/// a put at one strike, or two equidistant strikes) are averaged.
fn nearest_strike_iv<'a>(points: impl Iterator<Item = &'a SurfacePoint>, spot: f64) -> Option<f64> {
    let points: Vec<&SurfacePoint> = points.collect();
    let best_distance = points
        .iter()
        .map(|p| (p.strike - spot).abs())
        .min_by(f64::total_cmp)?;
    let nearest: Vec<&&SurfacePoint> = points
        .iter()
        .filter(|p| ((p.strike - spot).abs() - best_distance).abs() < TIE_EPSILON)
        .collect();
    let front = nearest.iter().map(|p| p.days_to_expiry).min()?;
    let ivs: Vec<f64> = nearest
        .iter()
        .filter(|p| p.days_to_expiry == front)
        .map(|p| p.implied_volatility)
        .collect();
    Some(ivs.iter().sum::<f64>() / ivs.len() as f64)
}

/// Build a surface with default configuration.
#[must_use]
pub fn build_surface(
    contracts: &[OptionContract],
    underlying_price: f64,
    as_of: NaiveDate,
) -> VolatilitySurface {
    SurfaceBuilder::default().build(contracts, underlying_price, as_of)
}
