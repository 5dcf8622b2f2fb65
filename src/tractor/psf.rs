//! A point source rendered through a mixture-of-Gaussians PSF.

use ndarray::Array2;

use crate::error::Result;
use crate::mog::MixtureOfGaussians;
use crate::params::{MultiParams, ParamList, Params, ScalarParam};

use super::ImageModel;

/// Finite-difference step for the position, in pixels.
const POSITION_STEP: f64 = 1e-3;

/// `flux · psf(x - pos)` on a stamp.
///
/// The parameter tree has three named children, in this order:
/// `psf` (the mixture), `pos` (`x`, `y` in pixel coordinates) and `flux`.
/// Fitting a PSF to an empirical stamp usually freezes the mixture means and
/// amplitudes, which are degenerate with `pos` and `flux`:
///
/// ```
/// use mogfit_rs::mog::MixtureOfGaussians;
/// use mogfit_rs::params::Params;
/// use mogfit_rs::tractor::{ImageModel, PsfStamp};
/// use ndarray::array;
///
/// let psf = MixtureOfGaussians::isotropic(array![1.0], &array![2.0])?;
/// let mut stamp = PsfStamp::new(psf, 7.0, 7.0, 100.0)?;
/// stamp.psf_mut()?.freeze_many(&["amp0", "meanx0", "meany0"])?;
///
/// assert_eq!(
///     stamp.params().names(),
///     vec!["psf.varxx0", "psf.varxy0", "psf.varyy0", "pos.x", "pos.y", "flux.flux"]
/// );
/// # Ok::<(), mogfit_rs::MogError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PsfStamp {
    tree: MultiParams,
}

impl PsfStamp {
    pub fn new(psf: MixtureOfGaussians, x: f64, y: f64, flux: f64) -> Result<Self> {
        let pos = ParamList::named(&[("x", x), ("y", y)])
            .with_step_sizes(vec![POSITION_STEP, POSITION_STEP])?;
        let flux = ScalarParam::named("flux", flux).with_step_size(1e-3 * flux.abs().max(1.0));

        let tree = MultiParams::new()
            .with_child("psf", psf)?
            .with_child("pos", pos)?
            .with_child("flux", flux)?;
        Ok(Self { tree })
    }

    pub fn psf(&self) -> Result<&MixtureOfGaussians> {
        self.tree.child_as::<MixtureOfGaussians>("psf")
    }

    pub fn psf_mut(&mut self) -> Result<&mut MixtureOfGaussians> {
        self.tree.child_as_mut::<MixtureOfGaussians>("psf")
    }

    pub fn position(&self) -> Result<(f64, f64)> {
        let pos = self.tree.child_as::<ParamList>("pos")?;
        Ok((pos.value("x")?, pos.value("y")?))
    }

    pub fn flux(&self) -> Result<f64> {
        Ok(self.tree.child_as::<ScalarParam>("flux")?.value())
    }
}

impl ImageModel for PsfStamp {
    fn params(&self) -> &dyn Params {
        &self.tree
    }

    fn params_mut(&mut self) -> &mut dyn Params {
        &mut self.tree
    }

    fn render(&self, width: usize, height: usize) -> Result<Array2<f64>> {
        let (x, y) = self.position()?;
        let patch = self.psf()?.render_patch(x, y, width, height)?;
        Ok(patch * self.flux()?)
    }

    fn log_prior(&self) -> f64 {
        self.psf()
            .map_or(f64::NEG_INFINITY, MixtureOfGaussians::log_prior)
    }
}
