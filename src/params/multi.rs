//! Hierarchical composition of parameter trees.

use std::any::Any;
use std::fmt;

use crate::error::{MogError, Result};
use crate::params::{Liquidity, LiquidityMut, Params};

/// A [`Params`] composite holding an ordered list of child trees.
///
/// The active mask works at the level of whole children: freezing a child
/// hides all of its parameters, while the child's own mask still applies when
/// it is liquid. Flattened names are `child.param`, where `child` is the bound
/// child name or `param<i>`. Cloning copies every child.
#[derive(Clone, Default)]
pub struct MultiParams {
    subs: Vec<Box<dyn Params>>,
    liquidity: Liquidity,
}

impl MultiParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unnamed child.
    pub fn push<P: Params + 'static>(&mut self, sub: P) -> usize {
        self.subs.push(Box::new(sub));
        self.liquidity.push(None)
    }

    /// Append a child bound to `name`.
    ///
    /// # Errors
    ///
    /// [`MogError::ArgumentError`] if a child with that name already exists.
    pub fn push_named<P: Params + 'static>(&mut self, name: &str, sub: P) -> Result<usize> {
        if self.liquidity.index_of(name).is_ok() {
            return Err(MogError::ArgumentError(format!(
                "A child named '{}' already exists",
                name
            )));
        }
        self.subs.push(Box::new(sub));
        Ok(self.liquidity.push(Some(name)))
    }

    /// Builder form of [`MultiParams::push_named`].
    pub fn with_child<P: Params + 'static>(mut self, name: &str, sub: P) -> Result<Self> {
        self.push_named(name, sub)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn child(&self, name: &str) -> Result<&dyn Params> {
        let i = self.liquidity.index_of(name)?;
        Ok(&*self.subs[i])
    }

    pub fn child_mut(&mut self, name: &str) -> Result<&mut dyn Params> {
        let i = self.liquidity.index_of(name)?;
        Ok(&mut *self.subs[i])
    }

    /// Borrow the named child as its concrete type.
    ///
    /// # Errors
    ///
    /// [`MogError::KeyError`] if the name is unbound, [`MogError::ArgumentError`]
    /// if the child is not a `T`.
    pub fn child_as<T: 'static>(&self, name: &str) -> Result<&T> {
        self.child(name)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| MogError::ArgumentError(format!("Child '{}' has another type", name)))
    }

    pub fn child_as_mut<T: 'static>(&mut self, name: &str) -> Result<&mut T> {
        self.child_mut(name)?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| MogError::ArgumentError(format!("Child '{}' has another type", name)))
    }

    fn active_subs(&self) -> impl Iterator<Item = (usize, &dyn Params)> + '_ {
        self.liquidity
            .liquid_indices()
            .map(move |i| (i, &*self.subs[i]))
    }
}

impl fmt::Debug for MultiParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (i, sub) in self.subs.iter().enumerate() {
            list.entry(&self.liquidity.display_name(i), &sub.get_all());
        }
        list.finish()
    }
}

impl Params for MultiParams {
    fn liquidity(&self) -> &Liquidity {
        &self.liquidity
    }

    fn liquidity_mut(&mut self) -> LiquidityMut<'_> {
        LiquidityMut::new(&mut self.liquidity)
    }

    fn count_active(&self) -> usize {
        self.active_subs().map(|(_, s)| s.count_active()).sum()
    }

    fn get_active(&self) -> Vec<f64> {
        self.active_subs().flat_map(|(_, s)| s.get_active()).collect()
    }

    fn set_active(&mut self, values: &[f64]) -> Result<()> {
        let n = self.count_active();
        if values.len() != n {
            return Err(MogError::ArgumentError(format!(
                "Expected {} active values, got {}",
                n,
                values.len()
            )));
        }
        let active = self.liquidity.liquid_indices().collect::<Vec<_>>();
        let mut offset = 0;
        for i in active {
            let sub = &mut self.subs[i];
            let k = sub.count_active();
            sub.set_active(&values[offset..offset + k])?;
            offset += k;
        }
        Ok(())
    }

    fn set_one(&mut self, index: usize, value: f64) -> Result<f64> {
        let active = self.liquidity.liquid_indices().collect::<Vec<_>>();
        let mut offset = 0;
        for i in active {
            let k = self.subs[i].count_active();
            if index < offset + k {
                return self.subs[i].set_one(index - offset, value);
            }
            offset += k;
        }
        Err(MogError::IndexError { index, len: offset })
    }

    fn names(&self) -> Vec<String> {
        self.active_subs()
            .flat_map(|(i, s)| {
                let prefix = self.liquidity.display_name(i);
                s.names()
                    .into_iter()
                    .map(move |n| format!("{}.{}", prefix, n))
            })
            .collect()
    }

    fn count_all(&self) -> usize {
        self.subs.iter().map(|s| s.count_all()).sum()
    }

    fn get_all(&self) -> Vec<f64> {
        self.subs.iter().flat_map(|s| s.get_all()).collect()
    }

    fn step_sizes(&self) -> Vec<f64> {
        self.active_subs().flat_map(|(_, s)| s.step_sizes()).collect()
    }

    fn freeze_all_recursive(&mut self) {
        self.liquidity.freeze_all();
        for sub in self.subs.iter_mut() {
            sub.freeze_all_recursive();
        }
    }

    fn thaw_all_recursive(&mut self) {
        self.liquidity.thaw_all();
        for sub in self.subs.iter_mut() {
            sub.thaw_all_recursive();
        }
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
