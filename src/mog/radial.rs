//! Radially-symmetric mixtures evaluated along a 1-D radial slice.
//!
//! The kernel is the *2-D* circular Gaussian, `1/(2πV)·exp(-x²/2V)`, sampled along
//! a radius. It is not the 1-D normal density; with this normalisation the fitted
//! amplitudes are directly the fluxes of the 2-D components.

use std::f64::consts::PI;

use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};

use crate::error::{MogError, Result};

/// Circular 2-D Gaussian of variance `variance` evaluated at radial offset `x - mean`.
///
/// # Examples
///
/// ```
/// use mogfit_rs::mog::not_normal;
/// use std::f64::consts::PI;
///
/// assert!((not_normal(0.0, 0.0, 2.0) - 1.0 / (4.0 * PI)).abs() < 1e-15);
/// ```
pub fn not_normal(x: f64, mean: f64, variance: f64) -> f64 {
    let d = x - mean;
    (-0.5 * d * d / variance).exp() / (2.0 * PI * variance)
}

/// Evaluate a packed mixture `[amp_0..amp_K, var_0..var_K]` at every `x`.
///
/// # Errors
///
/// [`MogError::ArgumentError`] if `packed` has odd length.
pub fn mixture_of_not_normals(x: &Array1<f64>, packed: &[f64]) -> Result<Array1<f64>> {
    let mix = RadialMixture::from_packed(packed)?;
    Ok(mix.evaluate(x))
}

/// Sort components by ascending variance, permuting amplitudes identically.
pub fn canonicalize(amp: &Array1<f64>, var: &Array1<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
    let mut mix = RadialMixture::new(amp.clone(), var.clone())?;
    mix.canonicalize();
    Ok((mix.amp, mix.var))
}

/// K amplitudes and K variances of a radial mixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialMixture {
    amp: Array1<f64>,
    var: Array1<f64>,
}

impl RadialMixture {
    /// # Errors
    ///
    /// [`MogError::ArgumentError`] if the arrays differ in length.
    pub fn new(amp: Array1<f64>, var: Array1<f64>) -> Result<Self> {
        if amp.len() != var.len() {
            return Err(MogError::ArgumentError(format!(
                "Amplitude and variance arrays differ in length: {} vs {}",
                amp.len(),
                var.len()
            )));
        }
        Ok(Self { amp, var })
    }

    pub fn empty() -> Self {
        Self {
            amp: Array1::zeros(0),
            var: Array1::zeros(0),
        }
    }

    /// Split a packed `[amps.., vars..]` vector; K is half its length.
    pub fn from_packed(packed: &[f64]) -> Result<Self> {
        if packed.len() % 2 != 0 {
            return Err(MogError::ArgumentError(format!(
                "Packed mixture vector must have even length, got {}",
                packed.len()
            )));
        }
        let k = packed.len() / 2;
        Ok(Self {
            amp: Array1::from_vec(packed[..k].to_vec()),
            var: Array1::from_vec(packed[k..].to_vec()),
        })
    }

    pub fn to_packed(&self) -> Array1<f64> {
        let mut packed = Array1::zeros(2 * self.k());
        packed.slice_mut(s![..self.k()]).assign(&self.amp);
        packed.slice_mut(s![self.k()..]).assign(&self.var);
        packed
    }

    /// Packed vector of natural logs, the space the fitting engine optimizes in.
    pub fn to_ln_packed(&self) -> Array1<f64> {
        self.to_packed().mapv(f64::ln)
    }

    pub fn from_ln_packed(ln_packed: &[f64]) -> Result<Self> {
        let packed = ln_packed.iter().map(|v| v.exp()).collect::<Vec<_>>();
        Self::from_packed(&packed)
    }

    /// Number of components.
    pub fn k(&self) -> usize {
        self.amp.len()
    }

    pub fn amp(&self) -> &Array1<f64> {
        &self.amp
    }

    pub fn var(&self) -> &Array1<f64> {
        &self.var
    }

    pub fn into_arrays(self) -> (Array1<f64>, Array1<f64>) {
        (self.amp, self.var)
    }

    pub fn min_var(&self) -> Option<f64> {
        self.var.iter().copied().reduce(f64::min)
    }

    /// Insert a component in front of the existing ones.
    pub fn prepend(&mut self, amp: f64, var: f64) {
        let mut new_amp = Vec::with_capacity(self.k() + 1);
        new_amp.push(amp);
        new_amp.extend(self.amp.iter());
        let mut new_var = Vec::with_capacity(self.k() + 1);
        new_var.push(var);
        new_var.extend(self.var.iter());
        self.amp = Array1::from_vec(new_amp);
        self.var = Array1::from_vec(new_var);
    }

    /// Overwrite component `k`.
    pub fn set_component(&mut self, k: usize, amp: f64, var: f64) -> Result<()> {
        if k >= self.k() {
            return Err(MogError::IndexError {
                index: k,
                len: self.k(),
            });
        }
        self.amp[k] = amp;
        self.var[k] = var;
        Ok(())
    }

    pub fn evaluate_at(&self, x: f64) -> f64 {
        self.amp
            .iter()
            .zip(self.var.iter())
            .map(|(&a, &v)| a * not_normal(x, 0.0, v))
            .sum()
    }

    /// `Σ_k amp_k · not_normal(x, 0, var_k)` for every `x`.
    pub fn evaluate(&self, x: &Array1<f64>) -> Array1<f64> {
        x.mapv(|xi| self.evaluate_at(xi))
    }

    /// Every variance strictly positive and every value finite.
    pub fn is_valid(&self) -> bool {
        self.var.iter().all(|&v| v > 0.0 && v.is_finite())
            && self.amp.iter().all(|a| a.is_finite())
    }

    /// Stable sort by ascending variance; amplitudes follow their variances.
    pub fn canonicalize(&mut self) {
        let mut order = (0..self.k()).collect::<Vec<_>>();
        order.sort_by(|&i, &j| self.var[i].total_cmp(&self.var[j]));
        self.amp = order.iter().map(|&i| self.amp[i]).collect();
        self.var = order.iter().map(|&i| self.var[i]).collect();
    }

    pub fn canonical(mut self) -> Self {
        self.canonicalize();
        self
    }
}
