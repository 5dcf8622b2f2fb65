//! Configuration options for the Levenberg-Marquardt algorithm.

use serde::{Deserialize, Serialize};

use crate::error::{MogError, Result};

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmConfig {
    /// Maximum number of iterations. Default: 200
    pub max_iterations: usize,

    /// Tolerance for relative change in cost. Default: 1e-10
    pub ftol: f64,

    /// Tolerance for relative change in parameter values. Default: 1e-10
    pub xtol: f64,

    /// Tolerance for the infinity norm of the gradient `Jᵀr`. Default: 1e-10
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Once exceeded no cost-reducing step exists. Default: 1e12
    pub max_lambda: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
        }
    }
}

impl LmConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.initial_lambda = lambda;
        self
    }

    pub fn with_lambda_factors(mut self, up: f64, down: f64) -> Self {
        self.lambda_up_factor = up;
        self.lambda_down_factor = down;
        self
    }

    pub fn with_lambda_bounds(mut self, min_lambda: f64, max_lambda: f64) -> Self {
        self.min_lambda = min_lambda;
        self.max_lambda = max_lambda;
        self
    }

    /// Check that the damping schedule terminates.
    ///
    /// Lambda must start positive, grow on rejection and stay bounded, or the
    /// rejection loop never exits.
    ///
    /// # Errors
    ///
    /// [`MogError::ArgumentError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, tol) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(tol >= 0.0 && tol.is_finite()) {
                return Err(MogError::ArgumentError(format!(
                    "{} must be non-negative and finite, got {}",
                    name, tol
                )));
            }
        }
        if !(self.min_lambda > 0.0 && self.min_lambda.is_finite()) {
            return Err(MogError::ArgumentError(format!(
                "min_lambda must be positive and finite, got {}",
                self.min_lambda
            )));
        }
        if !(self.max_lambda.is_finite() && self.max_lambda >= self.min_lambda) {
            return Err(MogError::ArgumentError(format!(
                "max_lambda must be finite and at least min_lambda, got {}",
                self.max_lambda
            )));
        }
        if !(self.initial_lambda > 0.0 && self.initial_lambda.is_finite()) {
            return Err(MogError::ArgumentError(format!(
                "initial_lambda must be positive and finite, got {}",
                self.initial_lambda
            )));
        }
        if !(self.lambda_up_factor > 1.0 && self.lambda_up_factor.is_finite()) {
            return Err(MogError::ArgumentError(format!(
                "lambda_up_factor must be greater than one, got {}",
                self.lambda_up_factor
            )));
        }
        if !(self.lambda_down_factor > 0.0 && self.lambda_down_factor <= 1.0) {
            return Err(MogError::ArgumentError(format!(
                "lambda_down_factor must lie in (0, 1], got {}",
                self.lambda_down_factor
            )));
        }
        Ok(())
    }
}
