//! Levenberg-Marquardt algorithm implementation.
//!
//! Minimizes `Σ r_i(p)²` for any [`crate::problem::Problem`] over a flat
//! parameter vector. The mixture search uses it on log-parameters; the
//! [`crate::tractor`] layer uses the same step solver for damped updates of a
//! parameter tree.

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod step;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::{LmStep, StepMethod, StepResult};
