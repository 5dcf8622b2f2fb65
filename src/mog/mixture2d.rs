//! General 2-D mixtures of Gaussians.
//!
//! This is the representation consumed by PSF and galaxy-profile renderers:
//! K amplitudes, K means and K full 2×2 covariances. It implements
//! [`Params`] so it can sit inside a larger parameter tree and be tuned by
//! the same optimizers as everything else.

use std::any::Any;
use std::f64::consts::PI;

use nalgebra::{Matrix2, Vector2};
use ndarray::{Array1, Array2, Array3};

use crate::error::{MogError, Result};
use crate::mog::RadialMixture;
use crate::params::{Liquidity, LiquidityMut, Params};

/// Finite-difference step used for every mixture parameter.
const MOG_STEP_SIZE: f64 = 1e-3;

/// A weighted sum of K general 2-D Gaussians.
///
/// Parameter ordering (all K amplitudes first, then means, then covariances):
/// `amp0..ampK, meanx0, meany0, .., varxx0, varxy0, varyy0, ..`. The symmetric
/// off-diagonal covariance term is a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureOfGaussians {
    amp: Array1<f64>,
    mean: Array2<f64>,
    var: Array3<f64>,
    liquidity: Liquidity,
}

impl MixtureOfGaussians {
    /// # Errors
    ///
    /// [`MogError::ArgumentError`] unless `mean` is K×2 and `var` is K×2×2.
    pub fn new(amp: Array1<f64>, mean: Array2<f64>, var: Array3<f64>) -> Result<Self> {
        let k = amp.len();
        if mean.dim() != (k, 2) {
            return Err(MogError::ArgumentError(format!(
                "Expected means of shape ({}, 2), got {:?}",
                k,
                mean.dim()
            )));
        }
        if var.dim() != (k, 2, 2) {
            return Err(MogError::ArgumentError(format!(
                "Expected covariances of shape ({}, 2, 2), got {:?}",
                k,
                var.dim()
            )));
        }
        Ok(Self {
            liquidity: Liquidity::with_names(&param_names(k)),
            amp,
            mean,
            var,
        })
    }

    /// Zero-mean isotropic mixture with `var_k · I` covariances.
    pub fn isotropic(amp: Array1<f64>, var: &Array1<f64>) -> Result<Self> {
        let k = amp.len();
        if var.len() != k {
            return Err(MogError::ArgumentError(format!(
                "Expected {} variances, got {}",
                k,
                var.len()
            )));
        }
        let mut cov = Array3::zeros((k, 2, 2));
        for (i, &v) in var.iter().enumerate() {
            cov[[i, 0, 0]] = v;
            cov[[i, 1, 1]] = v;
        }
        Self::new(amp, Array2::zeros((k, 2)), cov)
    }

    /// Embed a fitted radial profile as a circular 2-D mixture.
    pub fn from_radial(radial: &RadialMixture) -> Result<Self> {
        Self::isotropic(radial.amp().clone(), radial.var())
    }

    pub fn k(&self) -> usize {
        self.amp.len()
    }

    pub fn amp(&self) -> &Array1<f64> {
        &self.amp
    }

    pub fn mean(&self) -> &Array2<f64> {
        &self.mean
    }

    pub fn var(&self) -> &Array3<f64> {
        &self.var
    }

    fn covariance(&self, k: usize) -> Matrix2<f64> {
        Matrix2::new(
            self.var[[k, 0, 0]],
            self.var[[k, 0, 1]],
            self.var[[k, 1, 0]],
            self.var[[k, 1, 1]],
        )
    }

    /// Every covariance symmetric positive-definite and every value finite.
    pub fn is_valid(&self) -> bool {
        (0..self.k()).all(|k| {
            let c = self.covariance(k);
            c.iter().all(|v| v.is_finite())
                && c[(0, 1)] == c[(1, 0)]
                && c[(0, 0)] > 0.0
                && c.determinant() > 0.0
        }) && self.amp.iter().all(|a| a.is_finite())
            && self.mean.iter().all(|m| m.is_finite())
    }

    /// `-inf` for negative amplitudes or non-positive-definite covariances, else 0.
    pub fn log_prior(&self) -> f64 {
        if self.amp.iter().any(|&a| a < 0.0) || !self.is_valid() {
            f64::NEG_INFINITY
        } else {
            0.0
        }
    }

    /// Mixture density at offset `(dx, dy)`.
    ///
    /// # Errors
    ///
    /// [`MogError::InvalidMixture`] if a covariance is not positive-definite.
    pub fn evaluate(&self, dx: f64, dy: f64) -> Result<f64> {
        let mut total = 0.0;
        for k in 0..self.k() {
            let c = self.covariance(k);
            let det = c.determinant();
            let inv = c
                .try_inverse()
                .filter(|_| det > 0.0)
                .ok_or_else(|| {
                    MogError::InvalidMixture(format!("covariance {} is not positive-definite", k))
                })?;
            let d = Vector2::new(dx - self.mean[[k, 0]], dy - self.mean[[k, 1]]);
            let chi2 = d.dot(&(inv * d));
            total += self.amp[k] * (-0.5 * chi2).exp() / (2.0 * PI * det.sqrt());
        }
        Ok(total)
    }

    /// Render onto a `height`×`width` pixel grid (rows are y) with the mixture
    /// centered at pixel coordinates `(x0, y0)`.
    pub fn render_patch(
        &self,
        x0: f64,
        y0: f64,
        width: usize,
        height: usize,
    ) -> Result<Array2<f64>> {
        if !self.is_valid() {
            return Err(MogError::InvalidMixture(
                "cannot render a mixture with invalid covariances".to_string(),
            ));
        }
        let mut patch = Array2::zeros((height, width));
        for ((iy, ix), value) in patch.indexed_iter_mut() {
            *value = self.evaluate(ix as f64 - x0, iy as f64 - y0)?;
        }
        Ok(patch)
    }

    /// Scale amplitudes to sum to one.
    pub fn normalize(&mut self) -> Result<()> {
        let total = self.amp.sum();
        if total == 0.0 || !total.is_finite() {
            return Err(MogError::InvalidMixture(format!(
                "cannot normalize amplitudes summing to {}",
                total
            )));
        }
        self.amp.mapv_inplace(|a| a / total);
        Ok(())
    }

    /// Sort components by ascending covariance determinant.
    ///
    /// Frozen flags travel with their component; names stay positional, so a
    /// frozen `amp0` that moves to slot 1 is reported as a frozen `amp1`.
    pub fn canonicalize(&mut self) {
        let dets = (0..self.k())
            .map(|k| self.covariance(k).determinant())
            .collect::<Vec<_>>();
        let mut order = (0..self.k()).collect::<Vec<_>>();
        order.sort_by(|&i, &j| dets[i].total_cmp(&dets[j]));

        let amp = order.iter().map(|&i| self.amp[i]).collect::<Array1<_>>();
        let mut mean = Array2::zeros((self.k(), 2));
        let mut var = Array3::zeros((self.k(), 2, 2));
        for (dst, &src) in order.iter().enumerate() {
            mean.row_mut(dst).assign(&self.mean.row(src));
            for a in 0..2 {
                for b in 0..2 {
                    var[[dst, a, b]] = self.var[[src, a, b]];
                }
            }
        }
        self.amp = amp;
        self.mean = mean;
        self.var = var;

        let k = self.k();
        let mut source = vec![0; 6 * k];
        for (dst, &src) in order.iter().enumerate() {
            source[dst] = src;
            for a in 0..2 {
                source[k + 2 * dst + a] = k + 2 * src + a;
            }
            for b in 0..3 {
                source[3 * k + 3 * dst + b] = 3 * k + 3 * src + b;
            }
        }
        self.liquidity.permute_liquid(&source);
    }

    /// Raw parameter values, in the order documented on the type.
    fn raw(&self) -> Vec<f64> {
        let k = self.k();
        let mut raw = Vec::with_capacity(6 * k);
        raw.extend(self.amp.iter());
        for i in 0..k {
            raw.push(self.mean[[i, 0]]);
            raw.push(self.mean[[i, 1]]);
        }
        for i in 0..k {
            raw.push(self.var[[i, 0, 0]]);
            raw.push(self.var[[i, 0, 1]]);
            raw.push(self.var[[i, 1, 1]]);
        }
        raw
    }

    fn set_raw(&mut self, i: usize, value: f64) -> f64 {
        let k = self.k();
        if i < k {
            return std::mem::replace(&mut self.amp[i], value);
        }
        let i = i - k;
        if i < 2 * k {
            return std::mem::replace(&mut self.mean[[i / 2, i % 2]], value);
        }
        let i = i - 2 * k;
        let c = i / 3;
        match i % 3 {
            0 => std::mem::replace(&mut self.var[[c, 0, 0]], value),
            1 => {
                self.var[[c, 1, 0]] = value;
                std::mem::replace(&mut self.var[[c, 0, 1]], value)
            }
            _ => std::mem::replace(&mut self.var[[c, 1, 1]], value),
        }
    }
}

fn param_names(k: usize) -> Vec<String> {
    let mut names = (0..k).map(|i| format!("amp{}", i)).collect::<Vec<_>>();
    for i in 0..k {
        names.push(format!("meanx{}", i));
        names.push(format!("meany{}", i));
    }
    for i in 0..k {
        names.push(format!("varxx{}", i));
        names.push(format!("varxy{}", i));
        names.push(format!("varyy{}", i));
    }
    names
}

impl Params for MixtureOfGaussians {
    fn liquidity(&self) -> &Liquidity {
        &self.liquidity
    }

    fn liquidity_mut(&mut self) -> LiquidityMut<'_> {
        LiquidityMut::new(&mut self.liquidity)
    }

    fn count_active(&self) -> usize {
        self.liquidity.count_liquid()
    }

    fn get_active(&self) -> Vec<f64> {
        self.liquidity.gather(&self.raw())
    }

    fn set_active(&mut self, values: &[f64]) -> Result<()> {
        let mut updates = Vec::with_capacity(values.len());
        self.liquidity.scatter(values, |i, v| updates.push((i, v)))?;
        for (i, v) in updates {
            self.set_raw(i, v);
        }
        Ok(())
    }

    fn set_one(&mut self, index: usize, value: f64) -> Result<f64> {
        let i = self.liquidity.raw_index(index)?;
        Ok(self.set_raw(i, value))
    }

    fn names(&self) -> Vec<String> {
        self.liquidity.liquid_names()
    }

    fn count_all(&self) -> usize {
        6 * self.k()
    }

    fn get_all(&self) -> Vec<f64> {
        self.raw()
    }

    fn step_sizes(&self) -> Vec<f64> {
        vec![MOG_STEP_SIZE; self.count_active()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Params> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn two_component() -> MixtureOfGaussians {
        let mut var = Array3::zeros((2, 2, 2));
        var[[0, 0, 0]] = 4.0;
        var[[0, 1, 1]] = 4.0;
        var[[1, 0, 0]] = 1.0;
        var[[1, 0, 1]] = 0.2;
        var[[1, 1, 0]] = 0.2;
        var[[1, 1, 1]] = 0.5;
        MixtureOfGaussians::new(array![0.3, 0.7], array![[0.0, 0.0], [0.5, -0.5]], var).unwrap()
    }

    #[test]
    fn test_isotropic_peak_matches_radial_kernel() {
        let radial = RadialMixture::new(array![1.0], array![2.0]).unwrap();
        let mog = MixtureOfGaussians::from_radial(&radial).unwrap();

        assert_relative_eq!(
            mog.evaluate(0.0, 0.0).unwrap(),
            radial.evaluate_at(0.0),
            epsilon = 1e-14
        );
        assert_relative_eq!(
            mog.evaluate(1.2, 0.0).unwrap(),
            radial.evaluate_at(1.2),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_rendered_patch_integrates_to_total_amplitude() {
        let mog = two_component();
        let patch = mog.render_patch(25.0, 25.0, 51, 51).unwrap();

        assert_relative_eq!(patch.sum(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_params_names_and_symmetric_offdiagonal() {
        let mut mog = two_component();

        assert_eq!(mog.count_active(), 12);
        assert_eq!(&mog.names()[..3], &["amp0", "amp1", "meanx0"]);
        assert_eq!(mog.names()[11], "varyy1");

        let old = mog.set_one(10, 0.1).unwrap();
        assert_eq!(old, 0.2);
        assert_eq!(mog.var()[[1, 0, 1]], 0.1);
        assert_eq!(mog.var()[[1, 1, 0]], 0.1);

        let active = mog.get_active();
        mog.set_active(&active).unwrap();
        assert_eq!(mog.get_active(), active);
    }

    #[test]
    fn test_freeze_means() {
        let mut mog = two_component();
        mog.freeze_many(&["meanx0", "meany0", "meanx1", "meany1"]).unwrap();

        assert_eq!(mog.count_active(), 8);
        assert_eq!(mog.step_sizes(), vec![1e-3; 8]);
        assert!(!mog.names().iter().any(|n| n.starts_with("mean")));
    }

    #[test]
    fn test_invalid_covariance() {
        let mut mog = two_component();
        mog.set_one(8, -1.0).unwrap();

        assert!(!mog.is_valid());
        assert_eq!(mog.log_prior(), f64::NEG_INFINITY);
        assert!(mog.evaluate(0.0, 0.0).is_err());
        assert!(mog.render_patch(0.0, 0.0, 3, 3).is_err());
    }

    #[test]
    fn test_negative_amplitude_prior() {
        let mut mog = two_component();
        assert_eq!(mog.log_prior(), 0.0);

        mog.set_one(0, -0.1).unwrap();
        assert_eq!(mog.log_prior(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_normalize_and_canonicalize() {
        let mut mog = two_component();
        mog.set_one(1, 2.7).unwrap();
        mog.normalize().unwrap();
        assert_relative_eq!(mog.amp().sum(), 1.0, epsilon = 1e-14);

        mog.canonicalize();
        assert_relative_eq!(mog.amp()[0], 0.9, epsilon = 1e-12);
        assert_eq!(mog.mean()[[0, 0]], 0.5);
        assert_eq!(mog.var()[[1, 0, 0]], 4.0);
    }

    #[test]
    fn test_canonicalize_moves_frozen_flags_with_components() {
        let mut var = Array3::zeros((2, 2, 2));
        var[[0, 0, 0]] = 4.0;
        var[[0, 1, 1]] = 4.0;
        var[[1, 0, 0]] = 1.0;
        var[[1, 1, 1]] = 1.0;
        let mean = array![[1.0, 2.0], [3.0, 4.0]];
        let mut mog = MixtureOfGaussians::new(array![0.3, 0.7], mean, var).unwrap();
        mog.freeze_many(&["amp0", "meany0"]).unwrap();

        mog.canonicalize();

        assert_eq!(mog.amp()[1], 0.3);
        assert_eq!(mog.frozen_names(), vec!["amp1", "meany1"]);
        assert_eq!(&mog.get_active()[..3], &[0.7, 3.0, 4.0]);
        assert_eq!(mog.get_active()[3], 1.0);
    }

    #[test]
    fn test_shape_checks() {
        let mean = Array2::zeros((2, 2));
        assert!(MixtureOfGaussians::new(array![1.0], mean, Array3::zeros((1, 2, 2))).is_err());
        assert!(MixtureOfGaussians::isotropic(array![1.0, 2.0], &array![1.0]).is_err());
    }
}
