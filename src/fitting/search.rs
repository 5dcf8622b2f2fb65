//! Restart-based search over the number of mixture components.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::lm::LevenbergMarquardt;
use crate::mog::RadialMixture;
use crate::profiles::Profile;

use super::config::MixtureSearchConfig;
use super::objective::ProfileBadness;
use super::table::{MixtureFit, MixtureTable};

/// Badness the first acceptance is measured against.
const INITIAL_OLD_BADNESS: f64 = 0.5e30;

/// Outcome of the attempt loop for one K.
#[derive(Debug, Clone, PartialEq)]
pub struct KRecord {
    pub k: usize,
    /// Badness of the mixture kept for this K.
    pub badness: f64,
    /// Lowest badness seen for any K up to and including this one.
    pub best_badness: f64,
    /// Whether an attempt met the improvement threshold.
    pub accepted: bool,
    /// Attempts actually run.
    pub attempts: usize,
    /// The kept mixture, ascending by variance.
    pub fit: RadialMixture,
}

/// Every K tried for one profile.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub profile: Profile,
    pub records: Vec<KRecord>,
    /// Whether the badness floor was reached before running out of K.
    pub converged: bool,
}

impl SearchOutcome {
    /// The record for the largest K tried.
    pub fn last(&self) -> Option<&KRecord> {
        self.records.last()
    }

    pub fn record(&self, k: usize) -> Option<&KRecord> {
        self.records.iter().find(|r| r.k == k)
    }

    pub fn fits(&self) -> impl Iterator<Item = MixtureFit> + '_ {
        self.records
            .iter()
            .map(move |r| MixtureFit::new(self.profile, &r.fit, r.badness))
    }

    pub fn into_table(self) -> MixtureTable {
        self.fits().collect()
    }
}

/// Greedy K search for one profile.
///
/// For each K a new component is seeded at half the smallest existing
/// variance (with amplitude equal to that variance) and prepended. The mixture
/// is then re-optimized from that start up to `attempts_per_component · K`
/// times, perturbing the seeded component after each attempt that fails to
/// halve the last accepted badness.
#[derive(Debug, Clone)]
pub struct MixtureSearch {
    config: MixtureSearchConfig,
    objective: ProfileBadness,
    optimizer: LevenbergMarquardt,
}

impl MixtureSearch {
    /// # Errors
    ///
    /// [`crate::MogError::ArgumentError`] if the configuration is invalid.
    pub fn new(profile: Profile, config: MixtureSearchConfig) -> Result<Self> {
        config.validate()?;
        let objective = ProfileBadness::new(profile, config.max_radius, config.scale)?;
        let optimizer = LevenbergMarquardt::with_config(config.lm.clone());
        Ok(Self {
            config,
            objective,
            optimizer,
        })
    }

    pub fn profile(&self) -> Profile {
        self.objective.profile()
    }

    pub fn config(&self) -> &MixtureSearchConfig {
        &self.config
    }

    pub fn objective(&self) -> &ProfileBadness {
        &self.objective
    }

    /// Optimize `start` once in log space.
    ///
    /// Returns `None` for a failed attempt: optimizer error, non-finite
    /// badness, or a variance that is not strictly positive.
    pub fn optimize(&mut self, start: &RadialMixture) -> Option<(RadialMixture, f64)> {
        self.objective.set_components(start.k());

        let result = match self.optimizer.minimize(&self.objective, start.to_ln_packed()) {
            Ok(result) => result,
            Err(e) => {
                debug!("{} K={}: optimizer error: {}", self.profile(), start.k(), e);
                return None;
            }
        };

        let fitted = RadialMixture::from_ln_packed(result.params.as_slice()?).ok()?;
        if !fitted.is_valid() {
            debug!("{} K={}: invalid mixture after optimization", self.profile(), start.k());
            return None;
        }

        let badness = self.objective.badness(&fitted);
        if !badness.is_finite() {
            debug!("{} K={}: non-finite badness", self.profile(), start.k());
            return None;
        }
        Some((fitted, badness))
    }

    /// Run the search with the given random source for perturbations.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<SearchOutcome> {
        self.run_with(rng, |search, start| search.optimize(start))
    }

    /// The search loop, with each attempt delegated to `attempt`.
    fn run_with<R, F>(&mut self, rng: &mut R, mut attempt: F) -> Result<SearchOutcome>
    where
        R: Rng + ?Sized,
        F: FnMut(&mut Self, &RadialMixture) -> Option<(RadialMixture, f64)>,
    {
        let profile = self.profile();
        let mut current = RadialMixture::empty();
        let mut old_badness = INITIAL_OLD_BADNESS;
        let mut best_badness = f64::INFINITY;
        let mut records = Vec::new();
        let mut converged = false;

        for k in 1..=self.config.max_components {
            let seed = 0.5 * current.min_var().map_or(1.0, |v| v.min(1.0));
            current.prepend(seed, seed);

            let mut start = current.clone();
            let mut accepted = None;
            let mut best_attempt: Option<(RadialMixture, f64)> = None;
            let max_attempts = self.config.attempts_per_component * k;
            let mut attempts = 0;

            while attempts < max_attempts {
                attempts += 1;

                if let Some((fit, badness)) = attempt(self, &start) {
                    if badness < self.config.improvement_factor * old_badness {
                        accepted = Some((fit, badness));
                        break;
                    }
                    debug!(
                        "{} K={} attempt {}: badness {:.6e} not enough improvement",
                        profile, k, attempts, badness
                    );
                    if best_attempt.as_ref().map_or(true, |(_, b)| badness < *b) {
                        best_attempt = Some((fit, badness));
                    }
                }

                let j = rng.gen_range(0..k);
                let var = 0.5 * start.var()[j];
                start.set_component(0, var, var)?;
            }

            let was_accepted = accepted.is_some();
            let (fit, badness) = match accepted.or(best_attempt) {
                Some(found) => found,
                None => {
                    warn!("{} K={}: every attempt failed, keeping the seeded start", profile, k);
                    let badness = self.objective.badness(&current);
                    (current.clone(), badness)
                }
            };
            if was_accepted {
                old_badness = badness;
            }

            let fit = fit.canonical();
            best_badness = best_badness.min(badness);
            info!(
                "{} K={}: badness {:.6e} (best {:.6e}) after {} attempts{}",
                profile,
                k,
                badness,
                best_badness,
                attempts,
                if was_accepted { "" } else { ", not accepted" }
            );

            current = fit.clone();
            records.push(KRecord {
                k,
                badness,
                best_badness,
                accepted: was_accepted,
                attempts,
                fit,
            });

            if best_badness < self.config.badness_floor {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                "{}: badness floor {} not reached with {} components (best {:.6e})",
                profile, self.config.badness_floor, self.config.max_components, best_badness
            );
        }

        Ok(SearchOutcome {
            profile,
            records,
            converged,
        })
    }

    /// [`MixtureSearch::run`] with a `ChaCha8Rng` seeded from `seed`.
    pub fn run_seeded(&mut self, seed: u64) -> Result<SearchOutcome> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.run(&mut rng)
    }
}

/// Independent searches for several profiles.
///
/// Profile `i` is seeded with `seed + i`, so the result does not depend on
/// scheduling. Runs on the rayon pool when the `parallel` feature is enabled.
pub fn fit_profiles_parallel(
    profiles: &[Profile],
    config: &MixtureSearchConfig,
    seed: u64,
) -> Result<Vec<SearchOutcome>> {
    let run_one = |(i, &profile): (usize, &Profile)| -> Result<SearchOutcome> {
        let mut search = MixtureSearch::new(profile, config.clone())?;
        search.run_seeded(seed.wrapping_add(i as u64))
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        profiles.par_iter().enumerate().map(run_one).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        profiles.iter().enumerate().map(run_one).collect()
    }
}
