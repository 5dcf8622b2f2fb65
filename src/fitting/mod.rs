//! Mixture-of-Gaussians approximations of galaxy radial profiles.
//!
//! [`MixtureSearch`] grows a [`crate::mog::RadialMixture`] one component at a
//! time, minimizing [`ProfileBadness`] with restarts, until the badness drops
//! below a floor or the component budget runs out. Results can be collected
//! into a [`MixtureTable`] and persisted as JSON.
//!
//! ```no_run
//! use mogfit_rs::fitting::{MixtureSearch, MixtureSearchConfig};
//! use mogfit_rs::profiles::Profile;
//!
//! let mut search = MixtureSearch::new(Profile::Exp, MixtureSearchConfig::default())?;
//! let outcome = search.run_seeded(1)?;
//! outcome.into_table().save_json("exp_mixtures.json")?;
//! # Ok::<(), mogfit_rs::MogError>(())
//! ```

pub mod config;
pub mod objective;
pub mod search;
pub mod table;

pub use config::MixtureSearchConfig;
pub use objective::ProfileBadness;
pub use search::{fit_profiles_parallel, KRecord, MixtureSearch, SearchOutcome};
pub use table::{MixtureFit, MixtureTable};
