//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! Solves the Marquardt-scaled normal equations
//! `(JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr` with a Cholesky factorisation. When the
//! damped matrix is not positive definite (a column of `J` is zero, or the
//! problem is badly scaled) the system is retried with identity damping and
//! finally replaced by a scaled gradient-descent step.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::error::{MogError, Result};

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector.
    pub step: Array1<f64>,

    /// Cost reduction predicted by the linearised model.
    pub predicted_reduction: f64,

    /// How the linear system was solved.
    pub method: StepMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMethod {
    Marquardt,
    IdentityDamped,
    GradientDescent,
}

pub struct LmStep;

impl LmStep {
    /// Compute the damped step from the Jacobian and residuals at the current point.
    pub fn calculate_step(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        lambda: f64,
    ) -> Result<StepResult> {
        if jacobian.nrows() != residuals.len() {
            return Err(MogError::DimensionMismatch(format!(
                "Jacobian has {} rows but there are {} residuals",
                jacobian.nrows(),
                residuals.len()
            )));
        }

        let j_t_j = jacobian.t().dot(jacobian);
        let j_t_r = jacobian.t().dot(residuals);
        let n = j_t_j.nrows();

        let a = DMatrix::from_fn(n, n, |i, j| j_t_j[[i, j]]);
        let rhs = DVector::from_fn(n, |i, _| -j_t_r[i]);

        let mut marquardt = a.clone();
        for i in 0..n {
            marquardt[(i, i)] += lambda * a[(i, i)].max(1e-10);
        }

        let (step, method) = if let Some(x) = Self::solve_cholesky(marquardt, &rhs) {
            (x, StepMethod::Marquardt)
        } else {
            let mut damped = a.clone();
            for i in 0..n {
                damped[(i, i)] += lambda.max(1e-10);
            }
            match Self::solve_cholesky(damped, &rhs) {
                Some(x) => (x, StepMethod::IdentityDamped),
                None => (&rhs / (lambda + 1.0), StepMethod::GradientDescent),
            }
        };

        let step = Array1::from_iter(step.iter().copied());
        let predicted_reduction = Self::predicted_reduction(&j_t_j, &j_t_r, &step);

        Ok(StepResult {
            step,
            predicted_reduction,
            method,
        })
    }

    fn solve_cholesky(a: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
        let x = a.cholesky()?.solve(b);
        x.iter().all(|v| v.is_finite()).then_some(x)
    }

    /// `-(2δᵀJᵀr + δᵀJᵀJδ)`, the drop in `|r|²` the linear model predicts.
    fn predicted_reduction(j_t_j: &Array2<f64>, j_t_r: &Array1<f64>, step: &Array1<f64>) -> f64 {
        -(2.0 * step.dot(j_t_r) + step.dot(&j_t_j.dot(step)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_undamped_step_is_gauss_newton() {
        // r = J p - y with J = I, starting at p = 0: the Gauss-Newton step is y
        let jacobian = array![[1.0, 0.0], [0.0, 2.0]];
        let residuals = array![-3.0, -4.0];

        let result = LmStep::calculate_step(&jacobian, &residuals, 0.0).unwrap();
        assert_eq!(result.method, StepMethod::Marquardt);
        assert_relative_eq!(result.step[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.step[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(result.predicted_reduction, 25.0, epsilon = 1e-10);
    }

    #[test]
    fn test_damping_shrinks_step() {
        let jacobian = array![[1.0, 0.0], [0.0, 2.0]];
        let residuals = array![-3.0, -4.0];

        let result = LmStep::calculate_step(&jacobian, &residuals, 1.0).unwrap();
        assert_relative_eq!(result.step[0], 1.5, epsilon = 1e-12);
        assert_relative_eq!(result.step[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_column_falls_back() {
        let jacobian = array![[1.0, 0.0], [1.0, 0.0]];
        let residuals = array![-1.0, -1.0];

        let result = LmStep::calculate_step(&jacobian, &residuals, 1e-3).unwrap();
        assert!(result.step.iter().all(|v| v.is_finite()));
        assert!(result.step[0] > 0.0);
        assert_relative_eq!(result.step[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let jacobian = array![[1.0], [1.0]];
        assert!(LmStep::calculate_step(&jacobian, &array![1.0], 1.0).is_err());
    }
}
