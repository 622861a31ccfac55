//! Implied Volatility Solver
//!
//! Newton-Raphson over the pricing kernel, starting at sigma = 0.30:
//! - each step prices the contract and reads vega from the kernel
//! - sigma is clamped to `[min_vol, max_vol]` after every update
//! - stops when the price error is inside tolerance or vega vanishes
//!
//! Non-convergence is not an error: the last estimate is returned and the
//! outcome is reported through [`IvSolution::converged`]. An optional
//! bisection pass can refine estimates for contracts where Newton stalls
//! (deep ITM/OTM, near-zero vega).

#![allow(clippy::suboptimal_flops)]

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::black_scholes::price_and_greeks_for;
use super::types::{GreeksInput, OptionKind};
use crate::observability::record_iv_solve;

/// Vega (per unit volatility) below which Newton steps are abandoned.
const VEGA_EPSILON: f64 = 1e-8;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the IV solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvSolverConfig {
    /// Starting volatility for Newton-Raphson.
    pub initial_guess: f64,
    /// Convergence tolerance (absolute price error).
    pub tolerance: f64,
    /// Maximum Newton-Raphson iterations.
    pub max_iterations: u32,
    /// Minimum volatility bound (e.g., 0.001 = 0.1%).
    pub min_vol: f64,
    /// Maximum volatility bound (e.g., 5.0 = 500%).
    pub max_vol: f64,
    /// Refine non-converged Newton results with bisection.
    pub bisection_fallback: bool,
}

impl Default for IvSolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: 0.30,
            tolerance: 0.001,
            max_iterations: 100,
            min_vol: 0.001,
            max_vol: 5.0,
            bisection_fallback: false,
        }
    }
}

/// Method that produced an IV estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    /// Newton-Raphson iteration.
    NewtonRaphson,
    /// Bisection refinement.
    Bisection,
    /// Inputs were unusable; the initial guess was returned untouched.
    InitialGuess,
}

/// Outcome of an IV solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvSolution {
    /// Best volatility estimate.
    pub volatility: f64,
    /// Iterations performed.
    pub iterations: u32,
    /// Whether the price error reached tolerance.
    pub converged: bool,
    /// Absolute price error at the last evaluated volatility.
    pub price_error: f64,
    /// Method that produced the estimate.
    pub method: SolveMethod,
}

// ============================================================================
// IV Solver
// ============================================================================

/// Implied volatility solver.
#[derive(Debug, Clone, Default)]
pub struct IvSolver {
    config: IvSolverConfig,
}

impl IvSolver {
    /// Create a new IV solver with the given configuration.
    #[must_use]
    pub const fn new(config: IvSolverConfig) -> Self {
        Self { config }
    }

    /// Solver configuration.
    #[must_use]
    pub const fn config(&self) -> &IvSolverConfig {
        &self.config
    }

    /// Best-effort implied volatility for a market price.
    ///
    /// The `volatility` field of `input` is ignored.
    #[must_use]
    pub fn solve(&self, market_price: f64, input: &GreeksInput, kind: OptionKind) -> f64 {
        self.solve_detailed(market_price, input, kind).volatility
    }

    /// Implied volatility with convergence diagnostics.
    #[must_use]
    pub fn solve_detailed(
        &self,
        market_price: f64,
        input: &GreeksInput,
        kind: OptionKind,
    ) -> IvSolution {
        let initial = self
            .config
            .initial_guess
            .clamp(self.config.min_vol, self.config.max_vol);

        if !Self::inputs_usable(market_price, input) {
            tracing::debug!(
                market_price,
                spot = input.spot,
                strike = input.strike,
                time_to_expiry = input.time_to_expiry,
                "IV solve skipped for unusable inputs"
            );
            return IvSolution {
                volatility: initial,
                iterations: 0,
                converged: false,
                price_error: f64::NAN,
                method: SolveMethod::InitialGuess,
            };
        }

        let mut solution = self.newton_raphson(market_price, input, kind, initial);

        if !solution.converged && self.config.bisection_fallback {
            if let Some(refined) = self.bisection(market_price, input, kind) {
                solution = refined;
            }
        }

        if !solution.converged {
            tracing::debug!(
                market_price,
                strike = input.strike,
                volatility = solution.volatility,
                iterations = solution.iterations,
                price_error = solution.price_error,
                "IV solver did not converge, returning best estimate"
            );
        }
        record_iv_solve(solution.iterations, solution.converged);

        solution
    }

    /// Solve IV from Decimal prices (convenience method).
    #[must_use]
    pub fn solve_decimal(
        &self,
        market_price: Decimal,
        input: &GreeksInput,
        kind: OptionKind,
    ) -> Decimal {
        let iv = self.solve(market_price.to_f64().unwrap_or(0.0), input, kind);
        Decimal::from_f64_retain(iv)
            .map(|d| d.round_dp(6))
            .unwrap_or(Decimal::ZERO)
    }

    fn inputs_usable(market_price: f64, input: &GreeksInput) -> bool {
        market_price.is_finite()
            && market_price > 0.0
            && input.spot > 0.0
            && input.strike > 0.0
            && input.time_to_expiry > 0.0
            && input.time_to_expiry.is_finite()
    }

    fn newton_raphson(
        &self,
        market_price: f64,
        input: &GreeksInput,
        kind: OptionKind,
        initial: f64,
    ) -> IvSolution {
        let mut sigma = initial;
        let mut price_error = f64::INFINITY;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;
            let greeks = price_and_greeks_for(&input.with_volatility(sigma), kind);
            let error = greeks.price - market_price;
            price_error = error.abs();

            if price_error < self.config.tolerance {
                return IvSolution {
                    volatility: sigma,
                    iterations,
                    converged: true,
                    price_error,
                    method: SolveMethod::NewtonRaphson,
                };
            }

            // Kernel vega is per volatility point
            let vega = greeks.vega * 100.0;
            if vega.abs() < VEGA_EPSILON {
                break;
            }

            sigma = (sigma - error / vega).clamp(self.config.min_vol, self.config.max_vol);
        }

        IvSolution {
            volatility: sigma,
            iterations,
            converged: false,
            price_error,
            method: SolveMethod::NewtonRaphson,
        }
    }

    /// Bisection over `[min_vol, max_vol]`; `None` when the price is not bracketed.
    fn bisection(
        &self,
        market_price: f64,
        input: &GreeksInput,
        kind: OptionKind,
    ) -> Option<IvSolution> {
        let mut low = self.config.min_vol;
        let mut high = self.config.max_vol;

        let price_at = |sigma: f64| price_and_greeks_for(&input.with_volatility(sigma), kind).price;

        if market_price < price_at(low) || market_price > price_at(high) {
            return None;
        }

        let mut mid = low.midpoint(high);
        let mut price_error = f64::INFINITY;

        for i in 0..self.config.max_iterations {
            mid = low.midpoint(high);
            let error = price_at(mid) - market_price;
            price_error = error.abs();

            if price_error < self.config.tolerance || (high - low) < 1e-10 {
                return Some(IvSolution {
                    volatility: mid,
                    iterations: i + 1,
                    converged: true,
                    price_error,
                    method: SolveMethod::Bisection,
                });
            }

            if error > 0.0 {
                high = mid;
            } else {
                low = mid;
            }
        }

        Some(IvSolution {
            volatility: mid,
            iterations: self.config.max_iterations,
            converged: false,
            price_error,
            method: SolveMethod::Bisection,
        })
    }
}

/// Solve implied volatility with explicit tolerance and iteration cap.
///
/// Returns the last estimate even when Newton-Raphson does not converge.
#[must_use]
pub fn solve_iv(
    market_price: f64,
    input_without_vol: &GreeksInput,
    is_call: bool,
    tolerance: f64,
    max_iter: u32,
) -> f64 {
    IvSolver::new(IvSolverConfig {
        tolerance,
        max_iterations: max_iter,
        ..IvSolverConfig::default()
    })
    .solve(market_price, input_without_vol, OptionKind::from_is_call(is_call))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::price_and_greeks;
    use rust_decimal_macros::dec;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    fn round_trip(s: f64, k: f64, t: f64, r: f64, q: f64, true_iv: f64, is_call: bool) -> f64 {
        let input = GreeksInput::new(s, k, t, r, true_iv, q);
        let market_price = price_and_greeks(&input, is_call).price;
        solve_iv(market_price, &input.with_volatility(0.0), is_call, 0.001, 100)
    }

    #[test]
    fn test_iv_solver_atm_call() {
        let iv = round_trip(100.0, 100.0, 1.0, 0.05, 0.0, 0.25, true);
        assert!(approx_eq(iv, 0.25, 0.001), "iv {iv}");
    }

    #[test]
    fn test_iv_solver_atm_put() {
        let iv = round_trip(100.0, 100.0, 0.5, 0.03, 0.01, 0.30, false);
        assert!(approx_eq(iv, 0.30, 0.001), "iv {iv}");
    }

    #[test]
    fn test_iv_solver_reference_contract() {
        let iv = round_trip(190.0, 195.0, 30.0 / 365.0, 0.05, 0.0, 0.25, true);
        assert!(approx_eq(iv, 0.25, 0.001), "iv {iv}");
    }

    #[test]
    fn test_iv_solver_high_iv() {
        let iv = round_trip(50.0, 50.0, 0.1, 0.05, 0.0, 1.50, true);
        assert!(approx_eq(iv, 1.50, 0.01), "iv {iv}");
    }

    #[test]
    fn test_iv_solver_low_iv() {
        let iv = round_trip(100.0, 100.0, 1.0, 0.02, 0.0, 0.08, true);
        assert!(approx_eq(iv, 0.08, 0.01), "iv {iv}");
    }

    #[test]
    fn test_detailed_reports_convergence() {
        let solver = IvSolver::default();
        let input = GreeksInput::new(100.0, 100.0, 1.0, 0.05, 0.25, 0.0);
        let price = price_and_greeks(&input, true).price;

        let solution = solver.solve_detailed(price, &input, OptionKind::Call);
        assert!(solution.converged);
        assert_eq!(solution.method, SolveMethod::NewtonRaphson);
        assert!(solution.iterations <= 10);
        assert!(solution.price_error < 0.001);
    }

    #[test]
    fn test_invalid_price_returns_initial_guess() {
        let solver = IvSolver::default();
        let input = GreeksInput::new(100.0, 100.0, 1.0, 0.05, 0.0, 0.0);

        let solution = solver.solve_detailed(-1.0, &input, OptionKind::Call);
        assert!(!solution.converged);
        assert_eq!(solution.volatility, 0.30);
        assert_eq!(solution.method, SolveMethod::InitialGuess);
    }

    #[test]
    fn test_expired_contract_returns_initial_guess() {
        let input = GreeksInput::new(100.0, 100.0, 0.0, 0.05, 0.0, 0.0);
        assert_eq!(solve_iv(1.0, &input, true, 0.001, 100), 0.30);
    }

    #[test]
    fn test_near_zero_vega_returns_estimate_without_panicking() {
        // Far OTM, short dated: vega rounds to zero at the starting guess
        let input = GreeksInput::new(100.0, 300.0, 0.02, 0.05, 0.0, 0.0);
        let solution = IvSolver::default().solve_detailed(0.05, &input, OptionKind::Call);
        assert!(!solution.converged);
        assert!(solution.volatility >= 0.001 && solution.volatility <= 5.0);
    }

    #[test]
    fn test_estimate_stays_clamped() {
        // Price above the max-vol theoretical price: Newton pins to the upper bound
        let input = GreeksInput::new(100.0, 100.0, 0.25, 0.05, 0.0, 0.0);
        let iv = solve_iv(99.0, &input, true, 0.001, 100);
        assert!(iv <= 5.0);
        assert!(iv >= 0.001);
    }

    #[test]
    fn test_bisection_fallback_refines_stalled_newton() {
        // Far OTM and short dated: vega at the 0.30 starting guess rounds to zero
        let input = GreeksInput::new(100.0, 130.0, 0.02, 0.05, 1.2, 0.0);
        let price = price_and_greeks(&input, true).price;

        let stalled = IvSolver::default().solve_detailed(price, &input, OptionKind::Call);
        assert!(!stalled.converged);
        assert_eq!(stalled.volatility, 0.30);

        let solver = IvSolver::new(IvSolverConfig {
            bisection_fallback: true,
            ..IvSolverConfig::default()
        });
        let refined = solver.solve_detailed(price, &input, OptionKind::Call);
        assert!(refined.converged);
        assert_eq!(refined.method, SolveMethod::Bisection);
        assert!(approx_eq(refined.volatility, 1.2, 0.01), "iv {}", refined.volatility);
    }

    #[test]
    fn test_solve_decimal() {
        let solver = IvSolver::default();
        let input = GreeksInput::new(100.0, 100.0, 1.0, 0.05, 0.0, 0.0);
        let price = price_and_greeks(&input.with_volatility(0.2), true).price;
        let iv = solver.solve_decimal(Decimal::from_f64_retain(price).unwrap(), &input, OptionKind::Call);
        assert!((iv - dec!(0.2)).abs() < dec!(0.001));
    }
}
