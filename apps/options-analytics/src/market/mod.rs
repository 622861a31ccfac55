//! Market data snapshots consumed by the analytics core.
//!
//! Snapshots are supplied by the caller; nothing here fetches or caches data.

mod contract;
mod quote;

pub use contract::{OptionChain, OptionContract};
pub use quote::MarketQuote;
