//! Implementation of the Levenberg-Marquardt algorithm.

use std::fmt;

use log::{debug, trace};
use ndarray::Array1;

use crate::error::{MogError, Result};
use crate::problem::Problem;

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::LmStep;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted steps
    pub iterations: usize,

    /// Number of residual evaluations, excluding those spent on Jacobians
    pub func_evals: usize,

    /// Whether the run ended at a minimum
    pub success: bool,

    /// How the run ended
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,

    /// Damping parameter at termination
    pub lambda: f64,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Lambda: {:.3e}", self.lambda)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Steps that raise the cost, or produce non-finite residuals, are
    /// rejected and the damping is increased. Running out of iterations is
    /// reported through `success = false`, not as an error.
    ///
    /// # Errors
    ///
    /// [`MogError::ArgumentError`] if the configuration fails
    /// [`LmConfig::validate`], [`MogError::DimensionMismatch`] if
    /// `initial_params` does not match the problem, and any error the problem
    /// itself returns.
    pub fn minimize<P: Problem + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        self.config.validate()?;
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(MogError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let criteria = ConvergenceCriteria::from(&self.config);
        let mut params = initial_params;
        let mut lambda = self.config.initial_lambda;

        let mut residuals = problem.eval(&params)?;
        let mut func_evals = 1;
        let mut cost = sum_of_squares(&residuals);
        let mut iterations = 0;

        let mut status = if cost.is_finite() {
            ConvergenceStatus::Running
        } else {
            ConvergenceStatus::NumericalError
        };
        if n_params == 0 && !status.is_terminated() {
            status = ConvergenceStatus::GradientConvergence;
        }

        while !status.is_terminated() {
            let jacobian = problem.jacobian(&params)?;
            let gradient = jacobian.t().dot(&residuals);

            status = criteria.check_gradient(&gradient);
            if status.is_terminated() {
                break;
            }

            // Raise the damping until a step reduces the cost.
            loop {
                let step = LmStep::calculate_step(&jacobian, &residuals, lambda)?;
                let new_params = &params + &step.step;
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;
                let new_cost = sum_of_squares(&new_residuals);

                if new_cost.is_finite() && new_cost < cost {
                    iterations += 1;
                    status =
                        criteria.check_step(&params, &new_params, cost, new_cost, iterations);
                    trace!(
                        "lm iteration {}: cost {:.6e} -> {:.6e}, lambda {:.1e}, {:?}",
                        iterations,
                        cost,
                        new_cost,
                        lambda,
                        step.method
                    );

                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);
                    break;
                }

                lambda *= self.config.lambda_up_factor;
                if lambda > self.config.max_lambda {
                    status = ConvergenceStatus::NoFurtherImprovement;
                    break;
                }
            }
        }

        let success = status.is_converged();
        debug!(
            "lm finished after {} iterations ({} evaluations): cost {:.6e}, {}",
            iterations,
            func_evals,
            cost,
            status.description()
        );

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success,
            status,
            message: status.description().to_string(),
            lambda,
        })
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    /// y = a · exp(-b · x), sampled without noise.
    struct ExponentialDecay {
        x: Array1<f64>,
        y: Array1<f64>,
    }

    impl ExponentialDecay {
        fn new(a: f64, b: f64) -> Self {
            let x = Array1::linspace(0.0, 4.0, 20);
            let y = x.mapv(|xi| a * (-b * xi).exp());
            Self { x, y }
        }
    }

    impl Problem for ExponentialDecay {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            Ok(self
                .x
                .iter()
                .zip(self.y.iter())
                .map(|(&x, &y)| params[0] * (-params[1] * x).exp() - y)
                .collect())
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x.len()
        }
    }

    /// Rosenbrock as residuals, with an analytic Jacobian.
    struct Rosenbrock;

    impl Problem for Rosenbrock {
        fn eval(&self, p: &Array1<f64>) -> Result<Array1<f64>> {
            Ok(array![1.0 - p[0], 10.0 * (p[1] - p[0] * p[0])])
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            2
        }

        fn jacobian(&self, p: &Array1<f64>) -> Result<Array2<f64>> {
            Ok(array![[-1.0, 0.0], [-20.0 * p[0], 10.0]])
        }
    }

    #[test]
    fn test_exponential_decay_fit() {
        let problem = ExponentialDecay::new(2.5, 1.3);
        let result = LevenbergMarquardt::new()
            .minimize(&problem, array![1.0, 0.5])
            .unwrap();

        assert!(result.success, "{}", result);
        assert_relative_eq!(result.params[0], 2.5, epsilon = 1e-6);
        assert_relative_eq!(result.params[1], 1.3, epsilon = 1e-6);
        assert!(result.cost < 1e-12);
    }

    #[test]
    fn test_rosenbrock_from_standard_start() {
        let result = LevenbergMarquardt::new()
            .minimize(&Rosenbrock, array![-1.2, 1.0])
            .unwrap();

        assert!(result.success, "{}", result);
        assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(result.params[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_iteration_limit_is_not_an_error() {
        let result = LevenbergMarquardt::new()
            .with_max_iterations(1)
            .minimize(&Rosenbrock, array![-1.2, 1.0])
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, ConvergenceStatus::MaxIterationsReached);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_cost_never_increases() {
        let problem = ExponentialDecay::new(2.5, 1.3);
        let start = array![1.0, 0.5];
        let initial_cost = problem.eval_cost(&start).unwrap();

        for max_iterations in 1..6 {
            let result = LevenbergMarquardt::new()
                .with_max_iterations(max_iterations)
                .minimize(&problem, start.clone())
                .unwrap();
            assert!(result.cost <= initial_cost);
            assert_relative_eq!(
                result.cost,
                problem.eval_cost(&result.params).unwrap(),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_wrong_parameter_count() {
        let result = LevenbergMarquardt::new().minimize(&Rosenbrock, array![1.0]);
        assert!(matches!(result, Err(MogError::DimensionMismatch(_))));
    }

    #[test]
    fn test_already_at_minimum() {
        let result = LevenbergMarquardt::new()
            .minimize(&Rosenbrock, array![1.0, 1.0])
            .unwrap();

        assert!(result.success);
        assert_eq!(result.status, ConvergenceStatus::GradientConvergence);
        assert_eq!(result.iterations, 0);
    }

    /// Finite only at the origin, so every trial step is rejected.
    struct Cliff;

    impl Problem for Cliff {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            if params[0] == 0.0 {
                Ok(array![-1.0])
            } else {
                Ok(array![f64::NAN])
            }
        }

        fn parameter_count(&self) -> usize {
            1
        }

        fn residual_count(&self) -> usize {
            1
        }

        fn jacobian(&self, _params: &Array1<f64>) -> Result<Array2<f64>> {
            Ok(Array2::ones((1, 1)))
        }
    }

    #[test]
    fn test_rejected_steps_end_at_max_lambda() {
        let result = LevenbergMarquardt::new().minimize(&Cliff, array![0.0]).unwrap();

        assert_eq!(result.status, ConvergenceStatus::NoFurtherImprovement);
        assert_eq!(result.params[0], 0.0);
        assert_eq!(result.iterations, 0);
        assert!(result.lambda > LmConfig::default().max_lambda);
    }

    #[test]
    fn test_non_growing_damping_is_an_error() {
        let config = LmConfig::default().with_lambda_factors(1.0, 0.1);
        let result = LevenbergMarquardt::with_config(config).minimize(&Cliff, array![0.0]);

        assert!(matches!(result, Err(MogError::ArgumentError(_))));
    }
}
