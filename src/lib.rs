//! # mogfit-rs
//!
//! `mogfit-rs` approximates galaxy radial profiles with mixtures of Gaussians
//! and fits parametric image models to pixel data.
//!
//! The library provides:
//! - A parameter-tree abstraction with active/frozen bookkeeping and
//!   hierarchical composition ([`params`])
//! - Radial and general 2-D mixture-of-Gaussians models ([`mog`])
//! - The exponential and de Vaucouleurs reference profiles ([`profiles`])
//! - A restart-based search for the mixture that best matches a profile at
//!   each component count ([`fitting`])
//! - A Levenberg-Marquardt optimizer over flat parameter vectors ([`lm`])
//! - Image models optimized against inverse-variance weighted data, with a
//!   log-probability interface for samplers ([`tractor`])
//!
//! ## Basic Usage
//!
//! ```
//! use mogfit_rs::fitting::{MixtureSearch, MixtureSearchConfig};
//! use mogfit_rs::profiles::Profile;
//!
//! let config = MixtureSearchConfig::default().with_max_components(2);
//! let mut search = MixtureSearch::new(Profile::Exp, config)?;
//! let outcome = search.run_seeded(3)?;
//!
//! let last = outcome.last().unwrap();
//! assert_eq!(last.fit.k(), 2);
//! assert!(last.best_badness <= outcome.records[0].badness);
//! # Ok::<(), mogfit_rs::MogError>(())
//! ```
//!
//! The crate emits diagnostics through the [`log`] facade and never installs
//! a logger itself.

pub mod error;
pub mod fitting;
pub mod lm;
pub mod mog;
pub mod params;
pub mod problem;
pub mod profiles;
pub mod tractor;

pub use error::{MogError, Result};
pub use fitting::{MixtureFit, MixtureSearch, MixtureSearchConfig, MixtureTable};
pub use lm::{LevenbergMarquardt, LmConfig, LmResult};
pub use mog::{MixtureOfGaussians, RadialMixture};
pub use params::{MultiParams, ParamList, Params, ScalarParam};
pub use problem::Problem;
pub use profiles::Profile;
pub use tractor::{ImageModel, Tractor};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
