//! Configuration for the mixture search.

use serde::{Deserialize, Serialize};

use crate::error::{MogError, Result};
use crate::lm::LmConfig;

/// Knobs of the restart-based K search.
///
/// The defaults reproduce the reference tables: radius 8, objective scaled by
/// 1e7, up to 20 components, 3K attempts per K, acceptance on halving the
/// badness and a stopping floor of 0.1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureSearchConfig {
    /// Upper bound (exclusive) of the radial grid.
    pub max_radius: f64,

    /// Multiplier on the mean squared error.
    pub scale: f64,

    /// Largest K tried.
    pub max_components: usize,

    /// Attempts per K are `attempts_per_component · K`.
    pub attempts_per_component: usize,

    /// An attempt is accepted when its badness drops below this fraction of
    /// the last accepted badness.
    pub improvement_factor: f64,

    /// The search stops once the best badness is below this value.
    pub badness_floor: f64,

    /// Inner optimizer settings.
    pub lm: LmConfig,
}

impl Default for MixtureSearchConfig {
    fn default() -> Self {
        Self {
            max_radius: 8.0,
            scale: 1e7,
            max_components: 20,
            attempts_per_component: 3,
            improvement_factor: 0.5,
            badness_floor: 0.1,
            lm: LmConfig::default(),
        }
    }
}

impl MixtureSearchConfig {
    pub fn with_max_radius(mut self, max_radius: f64) -> Self {
        self.max_radius = max_radius;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_max_components(mut self, max_components: usize) -> Self {
        self.max_components = max_components;
        self
    }

    pub fn with_attempts_per_component(mut self, attempts: usize) -> Self {
        self.attempts_per_component = attempts;
        self
    }

    pub fn with_improvement_factor(mut self, factor: f64) -> Self {
        self.improvement_factor = factor;
        self
    }

    pub fn with_badness_floor(mut self, floor: f64) -> Self {
        self.badness_floor = floor;
        self
    }

    pub fn with_lm_config(mut self, lm: LmConfig) -> Self {
        self.lm = lm;
        self
    }

    /// # Errors
    ///
    /// [`MogError::ArgumentError`] naming the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_radius > 0.0 && self.max_radius.is_finite()) {
            return Err(MogError::ArgumentError(format!(
                "max_radius must be positive and finite, got {}",
                self.max_radius
            )));
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(MogError::ArgumentError(format!(
                "scale must be positive and finite, got {}",
                self.scale
            )));
        }
        if self.max_components == 0 {
            return Err(MogError::ArgumentError(
                "max_components must be at least 1".to_string(),
            ));
        }
        if self.attempts_per_component == 0 {
            return Err(MogError::ArgumentError(
                "attempts_per_component must be at least 1".to_string(),
            ));
        }
        if !(self.improvement_factor > 0.0 && self.improvement_factor <= 1.0) {
            return Err(MogError::ArgumentError(format!(
                "improvement_factor must lie in (0, 1], got {}",
                self.improvement_factor
            )));
        }
        self.lm.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MixtureSearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_components, 20);
        assert_eq!(config.attempts_per_component, 3);
    }

    #[test]
    fn test_invalid_fields() {
        let base = MixtureSearchConfig::default();
        assert!(base.clone().with_max_radius(0.0).validate().is_err());
        assert!(base.clone().with_scale(f64::NAN).validate().is_err());
        assert!(base.clone().with_max_components(0).validate().is_err());
        assert!(base.clone().with_attempts_per_component(0).validate().is_err());
        assert!(base.clone().with_improvement_factor(1.5).validate().is_err());

        let stalled = LmConfig::default().with_lambda_factors(1.0, 0.1);
        assert!(base.with_lm_config(stalled).validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = MixtureSearchConfig::default().with_max_components(4);
        let json = serde_json::to_string(&config).unwrap();
        let back: MixtureSearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
