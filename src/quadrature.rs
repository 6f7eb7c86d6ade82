//! Numerical integration of probability densities

use std::fmt;
use std::error::Error;

/// Maximum number of refinement levels.
const REFINEMENT_LIMIT: usize = 30;

/// Number of levels that must elapse before convergence is
/// accepted, to avoid spurious early termination.
const MIN_LEVELS: usize = 5;

/// Target relative change between successive levels.
const TOLERANCE: f64 = 1.0e-5;

/// Error returned when the trapezoidal refinement has not settled
/// within the refinement limit.
pub struct ConvergenceError {
    estimate: f64,
    delta: f64,
    levels: usize,
}

impl fmt::Display for ConvergenceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "integral failed to converge after {} refinement levels: last estimate {:e}, changing by {:e} per level",
            self.levels, self.estimate, self.delta,
        )
    }
}

impl fmt::Debug for ConvergenceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for ConvergenceError {}

impl ConvergenceError {
    /// The estimate at the final refinement level. Not trustworthy,
    /// but possibly useful for diagnostics.
    pub fn last_estimate(&self) -> f64 {
        self.estimate
    }

    /// Absolute change between the final two levels.
    pub fn delta(&self) -> f64 {
        self.delta
    }
}

/// Integrates the probability density `pdf` over `[0, b]` using the
/// extended trapezoidal rule, doubling the number of interior points
/// at each refinement level. The running sum is reused between levels,
/// so only the newly introduced midpoints are evaluated. The density
/// is assumed to vanish at the origin, which means the lower endpoint
/// never contributes.
///
/// Stops when the relative change between successive levels falls
/// below 1.0e-5 (or two consecutive levels are exactly zero), once at
/// least five levels have been applied. Exhausting the refinement
/// limit is an error, not a warning: a partially converged cumulative
/// value would silently corrupt any sampling built on top of it.
pub fn integrate<F: Fn(f64) -> f64>(pdf: F, b: f64) -> Result<f64, ConvergenceError> {
    let mut s = 0.5 * b * pdf(b);
    let mut olds = s;
    let mut delta = f64::INFINITY;

    for level in 2..=REFINEMENT_LIMIT {
        let it = 1_usize << (level - 2);
        let del = b / (it as f64);
        let mut x = 0.5 * del;
        let mut sum = 0.0;
        for _ in 0..it {
            sum += pdf(x);
            x += del;
        }
        s = 0.5 * (s + del * sum);

        if level > MIN_LEVELS {
            delta = (s - olds).abs();
            if delta < TOLERANCE * olds.abs() || (s == 0.0 && olds == 0.0) {
                return Ok(s);
            }
        }
        olds = s;
    }

    Err(ConvergenceError {
        estimate: s,
        delta,
        levels: REFINEMENT_LIMIT,
    })
}
