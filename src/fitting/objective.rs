//! Badness of a radial mixture against a reference profile.

use ndarray::{Array1, Array2};

use crate::error::{MogError, Result};
use crate::mog::{not_normal, RadialMixture};
use crate::problem::Problem;
use crate::profiles::Profile;

/// Scaled mean squared error between a K-component mixture and a profile.
///
/// As a [`Problem`] the parameters are the natural logs of the packed vector
/// `[amp_0..amp_K, var_0..var_K]`, which keeps every amplitude and variance
/// positive. Residuals are `sqrt(scale / N) · (mix(x_i) - profile(x_i))` so the
/// optimizer's cost equals [`ProfileBadness::badness`].
#[derive(Debug, Clone)]
pub struct ProfileBadness {
    profile: Profile,
    grid: Array1<f64>,
    target: Array1<f64>,
    scale: f64,
    weight: f64,
    k: usize,
}

impl ProfileBadness {
    /// # Errors
    ///
    /// [`MogError::ArgumentError`] if the grid would be empty.
    pub fn new(profile: Profile, max_radius: f64, scale: f64) -> Result<Self> {
        let grid = profile.radial_grid(max_radius);
        if grid.is_empty() {
            return Err(MogError::ArgumentError(format!(
                "Radial grid for {} with max radius {} is empty",
                profile, max_radius
            )));
        }
        let target = profile.eval_array(&grid);
        let weight = (scale / grid.len() as f64).sqrt();
        Ok(Self {
            profile,
            grid,
            target,
            scale,
            weight,
            k: 1,
        })
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn grid(&self) -> &Array1<f64> {
        &self.grid
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    /// Number of components the [`Problem`] view expects.
    pub fn components(&self) -> usize {
        self.k
    }

    pub fn set_components(&mut self, k: usize) {
        self.k = k;
    }

    pub fn badness(&self, mixture: &RadialMixture) -> f64 {
        let model = mixture.evaluate(&self.grid);
        let sq = (&model - &self.target).mapv(|d| d * d);
        self.scale * sq.sum() / self.grid.len() as f64
    }

    /// Badness of a log-space packed vector.
    pub fn badness_ln(&self, ln_packed: &[f64]) -> Result<f64> {
        Ok(self.badness(&RadialMixture::from_ln_packed(ln_packed)?))
    }

    fn check_len(&self, params: &Array1<f64>) -> Result<()> {
        if params.len() != 2 * self.k {
            return Err(MogError::DimensionMismatch(format!(
                "Expected {} log-parameters for K = {}, got {}",
                2 * self.k,
                self.k,
                params.len()
            )));
        }
        Ok(())
    }
}

impl Problem for ProfileBadness {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.check_len(params)?;
        let amp = params.slice(ndarray::s![..self.k]).mapv(f64::exp);
        let var = params.slice(ndarray::s![self.k..]).mapv(f64::exp);

        Ok(Array1::from_shape_fn(self.grid.len(), |i| {
            let x = self.grid[i];
            let model: f64 = amp
                .iter()
                .zip(var.iter())
                .map(|(&a, &v)| a * not_normal(x, 0.0, v))
                .sum();
            self.weight * (model - self.target[i])
        }))
    }

    fn parameter_count(&self) -> usize {
        2 * self.k
    }

    fn residual_count(&self) -> usize {
        self.grid.len()
    }

    /// `∂/∂ln a_k = a_k g_k` and `∂/∂ln V_k = a_k g_k (x²/2V_k - 1)`.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        self.check_len(params)?;
        let k = self.k;
        let mut jac = Array2::zeros((self.grid.len(), 2 * k));

        for c in 0..k {
            let a = params[c].exp();
            let v = params[k + c].exp();
            for (i, &x) in self.grid.iter().enumerate() {
                let ag = self.weight * a * not_normal(x, 0.0, v);
                jac[[i, c]] = ag;
                jac[[i, k + c]] = ag * (0.5 * x * x / v - 1.0);
            }
        }

        Ok(jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::forward_difference_jacobian;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_cost_matches_badness() {
        let mut objective = ProfileBadness::new(Profile::Exp, 8.0, 1e7).unwrap();
        objective.set_components(2);

        let mixture = RadialMixture::new(array![0.5, 3.0], array![0.1, 0.9]).unwrap();
        let ln = mixture.to_ln_packed();

        let cost = objective.eval_cost(&ln).unwrap();
        assert_relative_eq!(cost, objective.badness(&mixture), max_relative = 1e-10);
        assert_relative_eq!(
            objective.badness_ln(ln.as_slice().unwrap()).unwrap(),
            cost,
            max_relative = 1e-10
        );
    }

    #[test]
    fn test_seed_badness_for_exp() {
        let objective = ProfileBadness::new(Profile::Exp, 8.0, 1e7).unwrap();
        let seed = RadialMixture::new(array![0.5], array![0.5]).unwrap();

        assert_eq!(objective.grid().len(), 800);
        assert_relative_eq!(objective.badness(&seed), 432174.0, max_relative = 1e-3);
    }

    #[test]
    fn test_analytic_jacobian_matches_finite_differences() {
        let mut objective = ProfileBadness::new(Profile::Dev, 2.0, 1e7).unwrap();
        objective.set_components(2);
        let params = array![0.2f64.ln(), 1.5f64.ln(), 0.05f64.ln(), 0.7f64.ln()];

        let analytic = objective.jacobian(&params).unwrap();
        let steps = Array1::from_elem(4, 1e-7);
        let numeric = forward_difference_jacobian(&objective, &params, &steps).unwrap();

        for (a, n) in analytic.iter().zip(numeric.iter()) {
            assert_relative_eq!(*a, *n, epsilon = 1e-3, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_wrong_length_and_empty_grid() {
        let objective = ProfileBadness::new(Profile::Exp, 8.0, 1e7).unwrap();
        assert!(objective.eval(&array![0.0, 0.0, 0.0, 0.0]).is_err());
        assert!(ProfileBadness::new(Profile::Exp, 0.0, 1e7).is_err());
    }
}
