//! Problem definition trait for nonlinear least squares.
//!
//! A [`Problem`] maps a flat parameter vector to a residual vector. The
//! optimizer in [`crate::lm`] minimizes the sum of squared residuals. Problems
//! that can differentiate themselves override [`Problem::jacobian`]; the rest
//! get forward finite differences scaled by [`Problem::step_sizes`].

use ndarray::{Array1, Array2};

use crate::error::{MogError, Result};

/// Relative finite-difference step used when a problem does not supply its own.
const DEFAULT_EPSILON: f64 = 1e-8;

/// A trait representing a nonlinear least squares problem.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Per-parameter finite-difference steps at `params`.
    ///
    /// The default scales [`DEFAULT_EPSILON`] by the magnitude of each value.
    fn step_sizes(&self, params: &Array1<f64>) -> Array1<f64> {
        params.mapv(|p| {
            if p.abs() > DEFAULT_EPSILON {
                p.abs() * DEFAULT_EPSILON
            } else {
                DEFAULT_EPSILON
            }
        })
    }

    /// Evaluate the Jacobian matrix, `J[i, j] = ∂r_i/∂p_j`.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        forward_difference_jacobian(self, params, &self.step_sizes(params))
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// Forward-difference Jacobian with an explicit step for every parameter.
///
/// # Errors
///
/// [`MogError::DimensionMismatch`] if `steps` does not match `params`, or the
/// problem returns a residual vector of the wrong length.
pub fn forward_difference_jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    steps: &Array1<f64>,
) -> Result<Array2<f64>> {
    let n_params = params.len();
    if steps.len() != n_params {
        return Err(MogError::DimensionMismatch(format!(
            "Expected {} step sizes, got {}",
            n_params,
            steps.len()
        )));
    }

    let n_residuals = problem.residual_count();
    let residuals = problem.eval(params)?;
    if residuals.len() != n_residuals {
        return Err(MogError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            n_residuals,
            residuals.len()
        )));
    }

    let mut jac = Array2::zeros((n_residuals, n_params));
    let mut perturbed = params.clone();
    for j in 0..n_params {
        let h = steps[j];
        if h == 0.0 {
            return Err(MogError::ArgumentError(format!(
                "Step size for parameter {} is zero",
                j
            )));
        }

        perturbed[j] = params[j] + h;
        let shifted = problem.eval(&perturbed)?;
        perturbed[j] = params[j];

        for i in 0..n_residuals {
            jac[[i, j]] = (shifted[i] - residuals[i]) / h;
        }
    }

    Ok(jac)
}
