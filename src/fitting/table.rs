//! Persisted mixture fits keyed by profile and component count.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MogError, Result};
use crate::mog::RadialMixture;
use crate::profiles::Profile;

/// One fitted mixture: K amplitudes and K variances, ascending by variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureFit {
    pub profile: Profile,
    pub k: usize,
    pub amp: Vec<f64>,
    pub var: Vec<f64>,
    pub badness: f64,
}

impl MixtureFit {
    /// Build from a mixture, canonicalising it first.
    pub fn new(profile: Profile, mixture: &RadialMixture, badness: f64) -> Self {
        let canonical = mixture.clone().canonical();
        let (amp, var) = canonical.into_arrays();
        Self {
            profile,
            k: amp.len(),
            amp: amp.to_vec(),
            var: var.to_vec(),
            badness,
        }
    }

    /// # Errors
    ///
    /// [`MogError::ArgumentError`] if the stored arrays differ in length.
    pub fn mixture(&self) -> Result<RadialMixture> {
        RadialMixture::new(self.amp.clone().into(), self.var.clone().into())
    }
}

/// Collection of fits, at most one per `(profile, K)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixtureTable {
    fits: Vec<MixtureFit>,
}

impl MixtureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fit, replacing any existing one for the same profile and K.
    pub fn insert(&mut self, fit: MixtureFit) -> Option<MixtureFit> {
        match self
            .fits
            .iter_mut()
            .find(|f| f.profile == fit.profile && f.k == fit.k)
        {
            Some(slot) => Some(std::mem::replace(slot, fit)),
            None => {
                self.fits.push(fit);
                None
            }
        }
    }

    pub fn get(&self, profile: Profile, k: usize) -> Option<&MixtureFit> {
        self.fits.iter().find(|f| f.profile == profile && f.k == k)
    }

    /// Lowest-badness fit stored for `profile`.
    pub fn best(&self, profile: Profile) -> Option<&MixtureFit> {
        self.fits
            .iter()
            .filter(|f| f.profile == profile)
            .min_by(|a, b| a.badness.total_cmp(&b.badness))
    }

    pub fn len(&self) -> usize {
        self.fits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MixtureFit> {
        self.fits.iter()
    }

    /// Available K values per profile.
    pub fn components(&self) -> BTreeMap<Profile, Vec<usize>> {
        let mut out: BTreeMap<Profile, Vec<usize>> = BTreeMap::new();
        for fit in &self.fits {
            out.entry(fit.profile).or_default().push(fit.k);
        }
        for ks in out.values_mut() {
            ks.sort_unstable();
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// [`MogError::JsonError`] on malformed input and
    /// [`MogError::ArgumentError`] if a stored fit has mismatched arrays.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        for fit in &table.fits {
            if fit.amp.len() != fit.k || fit.var.len() != fit.k {
                return Err(MogError::ArgumentError(format!(
                    "Stored {} fit claims K = {} but has {} amplitudes and {} variances",
                    fit.profile,
                    fit.k,
                    fit.amp.len(),
                    fit.var.len()
                )));
            }
        }
        Ok(table)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

impl FromIterator<MixtureFit> for MixtureTable {
    fn from_iter<I: IntoIterator<Item = MixtureFit>>(iter: I) -> Self {
        let mut table = Self::new();
        for fit in iter {
            table.insert(fit);
        }
        table
    }
}

impl Extend<MixtureFit> for MixtureTable {
    fn extend<I: IntoIterator<Item = MixtureFit>>(&mut self, iter: I) {
        for fit in iter {
            self.insert(fit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    fn ramp(k: usize, base: f64) -> Array1<f64> {
        Array1::from_shape_fn(k, |i| base * (k - i) as f64)
    }

    fn fit(profile: Profile, k: usize, badness: f64) -> MixtureFit {
        let mixture = RadialMixture::new(ramp(k, 1.0), ramp(k, 0.1)).unwrap();
        MixtureFit::new(profile, &mixture, badness)
    }

    #[test]
    fn test_fit_is_canonical() {
        let mix = RadialMixture::new(array![1.0, 2.0], array![0.9, 0.2]).unwrap();
        let fit = MixtureFit::new(Profile::Exp, &mix, 3.0);

        assert_eq!(fit.k, 2);
        assert_eq!(fit.var, vec![0.2, 0.9]);
        assert_eq!(fit.amp, vec![2.0, 1.0]);
        assert_eq!(fit.mixture().unwrap().k(), 2);
    }

    #[test]
    fn test_insert_replaces_and_lookup() {
        let mut table = MixtureTable::new();
        assert!(table.insert(fit(Profile::Exp, 1, 100.0)).is_none());
        table.insert(fit(Profile::Exp, 2, 10.0));
        table.insert(fit(Profile::Dev, 1, 500.0));

        let old = table.insert(fit(Profile::Exp, 2, 5.0)).unwrap();
        assert_eq!(old.badness, 10.0);
        assert_eq!(table.len(), 3);

        assert_eq!(table.get(Profile::Exp, 2).unwrap().badness, 5.0);
        assert!(table.get(Profile::Dev, 2).is_none());
        assert_eq!(table.best(Profile::Exp).unwrap().k, 2);
        assert_eq!(table.components()[&Profile::Exp], vec![1, 2]);
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let table: MixtureTable = vec![fit(Profile::Exp, 3, 1.5), fit(Profile::Dev, 2, 7.0)]
            .into_iter()
            .collect();

        let path = std::env::temp_dir().join("mogfit_table_round_trip.json");
        table.save_json(&path).unwrap();
        let loaded = MixtureTable::load_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, table);
        assert!(table.to_json().unwrap().contains("\"profile\": \"exp\""));
    }

    #[test]
    fn test_inconsistent_json_is_rejected() {
        let json = serde_json::json!({
            "fits": [{"profile": "dev", "k": 2, "amp": [1.0], "var": [1.0, 2.0], "badness": 1.0}]
        });
        assert!(matches!(
            MixtureTable::from_json(&json.to_string()),
            Err(MogError::ArgumentError(_))
        ));
        assert!(matches!(
            MixtureTable::from_json("not json"),
            Err(MogError::JsonError(_))
        ));
    }
}
