//! Reference radial profiles that mixtures are fitted to.

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::MogError;

/// A closed-form galaxy radial profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Exponential disk, `exp(-x)`.
    Exp,
    /// de Vaucouleurs law, `exp(-x^0.25)`.
    Dev,
}

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Exp, Profile::Dev];

    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Profile::Exp => (-x).exp(),
            Profile::Dev => (-x.powf(0.25)).exp(),
        }
    }

    pub fn eval_array(&self, x: &Array1<f64>) -> Array1<f64> {
        x.mapv(|xi| self.eval(xi))
    }

    /// Radial sampling step used when fitting this profile.
    ///
    /// de Vaucouleurs is far more sharply peaked at the center, so it is
    /// sampled ten times more finely.
    pub fn grid_step(&self) -> f64 {
        match self {
            Profile::Exp => 0.01,
            Profile::Dev => 0.001,
        }
    }

    /// Sample points `0, step, 2·step, ..` strictly below `max_radius`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mogfit_rs::profiles::Profile;
    ///
    /// assert_eq!(Profile::Exp.radial_grid(8.0).len(), 800);
    /// assert_eq!(Profile::Dev.radial_grid(8.0).len(), 8000);
    /// ```
    pub fn radial_grid(&self, max_radius: f64) -> Array1<f64> {
        let step = self.grid_step();
        let n = (max_radius / step).ceil().max(0.0) as usize;
        Array1::from_shape_fn(n, |i| i as f64 * step)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Exp => "exp",
            Profile::Dev => "dev",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = MogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exp" => Ok(Profile::Exp),
            "dev" => Ok(Profile::Dev),
            other => Err(MogError::KeyError(format!("unknown profile '{}'", other))),
        }
    }
}
