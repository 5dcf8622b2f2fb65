//! A single real-valued parameter.

use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::params::{Liquidity, LiquidityMut, Params};

/// A [`Params`] leaf holding exactly one value.
///
/// Useful for fluxes, sky levels and other one-number calibration terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarParam {
    value: f64,
    step_size: f64,
    liquidity: Liquidity,
}

impl ScalarParam {
    /// Create a scalar named `"value"`.
    pub fn new(value: f64) -> Self {
        Self::named("value", value)
    }

    /// Create a scalar whose single slot is bound to `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mogfit_rs::params::{Params, ScalarParam};
    ///
    /// let mut flux = ScalarParam::named("flux", 42.0);
    /// assert_eq!(flux.names(), vec!["flux"]);
    ///
    /// flux.freeze("flux").unwrap();
    /// assert_eq!(flux.count_active(), 0);
    /// ```
    pub fn named(name: &str, value: f64) -> Self {
        Self {
            value,
            step_size: 1.0,
            liquidity: Liquidity::with_names(&[name]),
        }
    }

    /// Set the finite-difference step size reported by [`Params::step_sizes`].
    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value regardless of the frozen state.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn name(&self) -> &str {
        self.liquidity.name_of(0).unwrap_or("value")
    }
}

impl fmt::Display for ScalarParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.value)
    }
}

impl Params for ScalarParam {
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
        self.liquidity.gather(&[self.value])
    }

    fn set_active(&mut self, values: &[f64]) -> Result<()> {
        let mut value = self.value;
        self.liquidity.scatter(values, |_, v| value = v)?;
        self.value = value;
        Ok(())
    }

    fn set_one(&mut self, index: usize, value: f64) -> Result<f64> {
        self.liquidity.raw_index(index)?;
        Ok(std::mem::replace(&mut self.value, value))
    }

    fn names(&self) -> Vec<String> {
        self.liquidity.liquid_names()
    }

    fn count_all(&self) -> usize {
        1
    }

    fn get_all(&self) -> Vec<f64> {
        vec![self.value]
    }

    fn step_sizes(&self) -> Vec<f64> {
        self.liquidity.gather(&[self.step_size])
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
