//! Scalar root finding by Newton-Raphson.

use thiserror::Error;

/// Why a root search gave up.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RootError {
    #[error("no convergence after {iterations} iterations (last estimate {last})")]
    NotConverged { iterations: usize, last: f64 },

    #[error("derivative vanished at {at}")]
    FlatDerivative { at: f64 },

    #[error("function is not finite at {at}")]
    NonFinite { at: f64 },
}

/// A converged root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub value: f64,
    pub iterations: usize,
}

/// Newton-Raphson solver.
///
/// Converges when two successive estimates differ by less than the tolerance.
///
/// # Examples
///
/// ```
/// use pv_bess_sim::finance::root::NewtonRaphson;
///
/// let root = NewtonRaphson::new()
///     .with_initial_guess(1.0)
///     .solve(|x| x * x - 2.0, |x| 2.0 * x)
///     .unwrap();
/// assert!((root.value - 2f64.sqrt()).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonRaphson {
    initial_guess: f64,
    tolerance: f64,
    max_iterations: usize,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self {
            initial_guess: 0.10,
            tolerance: 1e-6,
            max_iterations: 50,
        }
    }
}

impl NewtonRaphson {
    /// Starts at 0.10 with tolerance 1e-6 and at most 50 iterations.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_initial_guess(mut self, initial_guess: f64) -> Self {
        self.initial_guess = initial_guess;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Finds a root of `f` given its derivative `df`.
    ///
    /// # Errors
    ///
    /// Returns a `RootError` when the derivative vanishes, an evaluation is
    /// not finite, or the iteration cap is reached.
    pub fn solve<F, D>(&self, f: F, df: D) -> Result<Root, RootError>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        let mut x = self.initial_guess;
        for iteration in 1..=self.max_iterations {
            let (fx, dfx) = (f(x), df(x));
            if !fx.is_finite() || !dfx.is_finite() {
                return Err(RootError::NonFinite { at: x });
            }
            if dfx == 0.0 {
                return Err(RootError::FlatDerivative { at: x });
            }
            let next = x - fx / dfx;
            if !next.is_finite() {
                return Err(RootError::NonFinite { at: x });
            }
            if (next - x).abs() < self.tolerance {
                return Ok(Root {
                    value: next,
                    iterations: iteration,
                });
            }
            x = next;
        }
        Err(RootError::NotConverged {
            iterations: self.max_iterations,
            last: x,
        })
    }
}
