//! A named vector of parameters.

use std::any::Any;
use std::fmt;

use crate::error::{MogError, Result};
use crate::params::{Liquidity, LiquidityMut, Params};

/// A [`Params`] leaf holding values in a list.
///
/// Slots may be bound to names, which drive freeze/thaw and the flattened
/// parameter names; unnamed slots are reported as `param<i>` with `i` the raw
/// slot index.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamList {
    values: Vec<f64>,
    step_sizes: Vec<f64>,
    liquidity: Liquidity,
}

impl ParamList {
    /// Create an unnamed list.
    pub fn new(values: Vec<f64>) -> Self {
        let n = values.len();
        Self {
            values,
            step_sizes: vec![1.0; n],
            liquidity: Liquidity::new(n),
        }
    }

    /// Create a list from `(name, value)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use mogfit_rs::params::{ParamList, Params};
    ///
    /// let mut pos = ParamList::named(&[("x", 1.5), ("y", -2.0)]);
    /// pos.freeze("x").unwrap();
    ///
    /// assert_eq!(pos.get_active(), vec![-2.0]);
    /// assert_eq!(pos.names(), vec!["y"]);
    /// ```
    pub fn named(pairs: &[(&str, f64)]) -> Self {
        let names = pairs.iter().map(|(n, _)| *n).collect::<Vec<_>>();
        let values = pairs.iter().map(|(_, v)| *v).collect::<Vec<_>>();
        Self {
            step_sizes: vec![1.0; values.len()],
            values,
            liquidity: Liquidity::with_names(&names),
        }
    }

    /// Replace the per-slot finite-difference step sizes.
    pub fn with_step_sizes(mut self, step_sizes: Vec<f64>) -> Result<Self> {
        if step_sizes.len() != self.values.len() {
            return Err(MogError::ArgumentError(format!(
                "Expected {} step sizes, got {}",
                self.values.len(),
                step_sizes.len()
            )));
        }
        self.step_sizes = step_sizes;
        Ok(self)
    }

    /// Every value, frozen or not.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, name: &str) -> Result<f64> {
        let i = self.liquidity.index_of(name)?;
        Ok(self.values[i])
    }

    /// Set a value by name regardless of its frozen state; returns the old value.
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<f64> {
        let i = self.liquidity.index_of(name)?;
        Ok(std::mem::replace(&mut self.values[i], value))
    }
}

impl fmt::Display for ParamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| match self.liquidity.name_of(i) {
                Some(name) => format!("{}={}", name, v),
                None => format!("{}", v),
            })
            .collect::<Vec<_>>();
        write!(f, "ParamList: {}", parts.join(", "))
    }
}

impl Params for ParamList {
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
        self.liquidity.gather(&self.values)
    }

    fn set_active(&mut self, values: &[f64]) -> Result<()> {
        let slots = &mut self.values;
        self.liquidity.scatter(values, |i, v| slots[i] = v)
    }

    fn set_one(&mut self, index: usize, value: f64) -> Result<f64> {
        let i = self.liquidity.raw_index(index)?;
        Ok(std::mem::replace(&mut self.values[i], value))
    }

    fn names(&self) -> Vec<String> {
        self.liquidity.liquid_names()
    }

    fn count_all(&self) -> usize {
        self.values.len()
    }

    fn get_all(&self) -> Vec<f64> {
        self.values.clone()
    }

    fn step_sizes(&self) -> Vec<f64> {
        self.liquidity.gather(&self.step_sizes)
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
