//! Volatility analytics: surface construction and IV rank.
//!
//! # Example
//!
//! ```rust,ignore
//! use options_analytics::volatility::{IvPeriod, build_surface, rank_percentile};
//!
//! let surface = build_surface(&chain.contracts, chain.spot(), chain.as_of);
//! let iv = surface.interpolate(195.0, 45);
//!
//! let rank = rank_percentile(surface.atm_volatility, &history, IvPeriod::OneYear);
//! println!("IV rank {:.1} ({:?})", rank.iv_rank, rank.classification);
//! ```

mod rank;
mod surface;

pub use rank::{IvClassification, IvPeriod, IvRankPercentile, PremiumStrategy, rank_percentile};
pub use surface::{
    IvSource, Skew, SkewDirection, Smile, SurfaceBuilder, SurfacePoint, TermPoint, TermShape,
    TermStructure, VolatilitySurface, build_surface,
};
