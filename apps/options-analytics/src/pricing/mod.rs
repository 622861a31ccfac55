//! Options pricing and implied volatility.
//!
//! This module provides:
//! - Black-Scholes price and Greeks with continuous dividend yield
//! - Implied volatility computation (Newton-Raphson, optional bisection)
//!
//! # Example
//!
//! ```
//! use options_analytics::pricing::{GreeksInput, price_and_greeks, solve_iv};
//!
//! let input = GreeksInput::new(100.0, 100.0, 0.5, 0.05, 0.25, 0.0);
//! let greeks = price_and_greeks(&input, true);
//! assert!(greeks.delta > 0.5);
//!
//! let iv = solve_iv(greeks.price, &input.with_volatility(0.0), true, 0.001, 100);
//! assert!((iv - 0.25).abs() < 0.001);
//! ```

mod black_scholes;
mod iv;
mod types;

pub use black_scholes::{
    intrinsic_value, norm_cdf, norm_pdf, price_and_greeks, price_and_greeks_for,
};
pub(crate) use black_scholes::round4;
pub use iv::{IvSolution, IvSolver, IvSolverConfig, SolveMethod, solve_iv};
pub use types::{Greeks, GreeksInput, OptionKind};
