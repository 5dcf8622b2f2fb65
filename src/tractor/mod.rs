//! Image models fitted to pixel data.
//!
//! A [`Tractor`] pairs an [`ImageModel`] with an observed image and a
//! per-pixel inverse-variance map. It optimizes whatever parameters of the
//! model's tree are currently thawed, without knowing which sub-tree is a
//! mixture, a position or a flux, and exposes the log-probability contract a
//! sampler needs: propose a vector, get `ln p` back.

pub mod psf;

use log::{debug, trace};
use ndarray::{Array1, Array2};

use crate::error::{MogError, Result};
use crate::lm::LmStep;
use crate::params::Params;

pub use psf::PsfStamp;

/// Number of step halvings tried before a step is given up.
const MAX_HALVINGS: usize = 12;

/// A model that renders itself onto a pixel grid.
pub trait ImageModel {
    fn params(&self) -> &dyn Params;

    fn params_mut(&mut self) -> &mut dyn Params;

    /// Model image with `height` rows and `width` columns.
    fn render(&self, width: usize, height: usize) -> Result<Array2<f64>>;

    /// Log prior of the current parameters; `-inf` marks an invalid state.
    fn log_prior(&self) -> f64 {
        0.0
    }
}

/// Result of one [`Tractor::optimize`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeStep {
    /// Change in log-probability. Zero when no step was taken.
    pub dlnp: f64,
    /// The parameter update applied, already scaled by `alpha`.
    pub step: Array1<f64>,
    /// Fraction of the damped Gauss-Newton step that was taken.
    pub alpha: f64,
}

/// Summary of [`Tractor::optimize_loop`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeSummary {
    pub steps: usize,
    pub total_dlnp: f64,
    /// Whether the last step improved `ln p` by less than the tolerance.
    pub converged: bool,
}

/// Fits an [`ImageModel`] to data with inverse-variance weights.
#[derive(Debug, Clone)]
pub struct Tractor<M> {
    model: M,
    data: Array2<f64>,
    ivar: Array2<f64>,
    sqrt_ivar: Array2<f64>,
}

impl<M: ImageModel> Tractor<M> {
    /// # Errors
    ///
    /// [`MogError::DimensionMismatch`] if `data` and `ivar` differ in shape,
    /// [`MogError::ArgumentError`] if any inverse variance is negative or NaN.
    pub fn new(model: M, data: Array2<f64>, ivar: Array2<f64>) -> Result<Self> {
        if data.dim() != ivar.dim() {
            return Err(MogError::DimensionMismatch(format!(
                "data is {:?} but ivar is {:?}",
                data.dim(),
                ivar.dim()
            )));
        }
        if ivar.iter().any(|&w| !(w >= 0.0)) {
            return Err(MogError::ArgumentError(
                "inverse variances must be non-negative".to_string(),
            ));
        }
        let sqrt_ivar = ivar.mapv(f64::sqrt);
        Ok(Self {
            model,
            data,
            ivar,
            sqrt_ivar,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn ivar(&self) -> &Array2<f64> {
        &self.ivar
    }

    pub fn model_image(&self) -> Result<Array2<f64>> {
        let (height, width) = self.data.dim();
        self.model.render(width, height)
    }

    /// `(model - data) · sqrt(ivar)` per pixel.
    pub fn chi(&self) -> Result<Array2<f64>> {
        let model = self.model_image()?;
        Ok((&model - &self.data) * &self.sqrt_ivar)
    }

    /// `-0.5 · Σ ivar · (model - data)²`.
    pub fn log_likelihood(&self) -> Result<f64> {
        Ok(-0.5 * self.chi()?.mapv(|c| c * c).sum())
    }

    /// Log-probability of the current parameters.
    ///
    /// States the prior rules out, or that cannot be rendered, have `ln p = -inf`.
    pub fn current_log_prob(&self) -> Result<f64> {
        let prior = self.model.log_prior();
        if prior == f64::NEG_INFINITY {
            return Ok(f64::NEG_INFINITY);
        }
        match self.log_likelihood() {
            Ok(lnl) => Ok(lnl + prior),
            Err(MogError::InvalidMixture(_)) => Ok(f64::NEG_INFINITY),
            Err(e) => Err(e),
        }
    }

    /// Set the active parameters to `params` and return `ln p` there.
    ///
    /// # Errors
    ///
    /// [`MogError::ArgumentError`] if `params` has the wrong length.
    pub fn log_prob(&mut self, params: &[f64]) -> Result<f64> {
        self.model.params_mut().set_active(params)?;
        self.current_log_prob()
    }

    /// Forward-difference derivatives of the chi image, one column per active
    /// parameter, using the tree's step sizes.
    pub fn chi_jacobian(&mut self) -> Result<(Array1<f64>, Array2<f64>)> {
        let chi0 = flatten(self.chi()?);
        let steps = self.model.params().step_sizes();
        let p0 = self.model.params().get_active();
        let mut jac = Array2::zeros((chi0.len(), p0.len()));

        for (j, (&p, &h)) in p0.iter().zip(steps.iter()).enumerate() {
            self.model.params_mut().set_one(j, p + h)?;
            let shifted = self.chi();
            self.model.params_mut().set_one(j, p)?;

            let shifted = flatten(shifted?);
            for i in 0..chi0.len() {
                jac[[i, j]] = (shifted[i] - chi0[i]) / h;
            }
        }

        Ok((chi0, jac))
    }

    /// One damped Gauss-Newton update of the active parameters.
    ///
    /// The step solves `(JᵀJ + damp·diag(JᵀJ)) δ = -Jᵀχ`; it is halved until
    /// `ln p` does not decrease. If no fraction helps the parameters are left
    /// untouched and `dlnp = 0`, `alpha = 0` are returned.
    ///
    /// # Errors
    ///
    /// [`MogError::InvalidMixture`] if the starting state cannot be rendered.
    pub fn optimize(&mut self, damp: f64) -> Result<OptimizeStep> {
        let p0 = Array1::from_vec(self.model.params().get_active());
        let no_step = OptimizeStep {
            dlnp: 0.0,
            step: Array1::zeros(p0.len()),
            alpha: 0.0,
        };
        if p0.is_empty() {
            return Ok(no_step);
        }

        let lnp0 = self.current_log_prob()?;
        let (chi, jac) = self.chi_jacobian()?;
        let full = LmStep::calculate_step(&jac, &chi, damp)?.step;

        let mut alpha = 1.0;
        for _ in 0..MAX_HALVINGS {
            let step = &full * alpha;
            let trial = &p0 + &step;
            let lnp = self.log_prob(&trial.to_vec())?;
            trace!("optimize: alpha {} gives ln p {:.6e} (was {:.6e})", alpha, lnp, lnp0);

            if lnp.is_finite() && lnp >= lnp0 {
                return Ok(OptimizeStep {
                    dlnp: lnp - lnp0,
                    step,
                    alpha,
                });
            }
            alpha *= 0.5;
        }

        self.model.params_mut().set_active(&p0.to_vec())?;
        Ok(no_step)
    }

    /// Repeat [`Tractor::optimize`] until `dlnp < dlnp_tol` or `max_steps`.
    pub fn optimize_loop(
        &mut self,
        max_steps: usize,
        dlnp_tol: f64,
        damp: f64,
    ) -> Result<OptimizeSummary> {
        let mut summary = OptimizeSummary {
            steps: 0,
            total_dlnp: 0.0,
            converged: false,
        };

        while summary.steps < max_steps {
            let step = self.optimize(damp)?;
            summary.steps += 1;
            summary.total_dlnp += step.dlnp;
            debug!(
                "optimize step {}: dlnp {:.6e}, alpha {}",
                summary.steps, step.dlnp, step.alpha
            );
            if step.dlnp < dlnp_tol {
                summary.converged = true;
                break;
            }
        }

        Ok(summary)
    }
}

fn flatten(image: Array2<f64>) -> Array1<f64> {
    Array1::from_iter(image.iter().copied())
}
