//! Mixture-of-Gaussians models.
//!
//! - [`radial`]: the 1-D radial-slice representation fitted to galaxy profiles
//!   (amplitude and variance arrays, packed-vector evaluation, canonical ordering).
//! - [`mixture2d`]: general 2-D mixtures with full covariances, usable as a
//!   parameter sub-tree inside image models.

pub mod mixture2d;
pub mod radial;

pub use mixture2d::MixtureOfGaussians;
pub use radial::{canonicalize, mixture_of_not_normals, not_normal, RadialMixture};
