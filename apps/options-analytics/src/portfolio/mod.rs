//! Portfolio positions and Greeks aggregation.
//!
//! Positions are recreated from every snapshot; nothing here caches state
//! between calls.

mod context;
mod greeks;
mod position;

pub use context::{PortfolioContext, PortfolioSnapshot, RiskBudget, UNCLASSIFIED_SECTOR};
pub use greeks::{GreeksAggregator, PortfolioGreeks, PositionGreeks, aggregate};
pub use position::{Position, PositionType, PricedGreeks};
