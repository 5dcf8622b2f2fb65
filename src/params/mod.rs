//! # Parameter Trees
//!
//! This module provides the parameter-vector abstraction that every optimizer in
//! the crate works over. A model (a source, a PSF, a calibration term, or a
//! whole image model) exposes its tunable numbers through the [`Params`] trait,
//! and the optimizer only ever sees a flat `Vec<f64>` of the *active* ones.
//!
//! ## Key Features
//!
//! - **Active / frozen bookkeeping**: every slot (or child) carries a liquid flag;
//!   frozen entries disappear from the flattened vector
//! - **Named parameters**: an explicit name→index table backs freeze/thaw by name
//! - **Hierarchical composition**: [`MultiParams`] holds ordered sub-trees and
//!   flattens them depth-first, synthesizing dotted names (`psf.amp0`)
//!
//! ## Core Components
//!
//! - [`Params`]: the common contract for leaves and composites
//! - [`Liquidity`]: the name table + active mask shared by every implementation
//! - [`ScalarParam`]: a single named value
//! - [`ParamList`]: a named vector of values
//! - [`MultiParams`]: an ordered collection of child trees
//!
//! ## Example Usage
//!
//! ```rust
//! use mogfit_rs::params::{MultiParams, ParamList, Params, ScalarParam};
//!
//! let mut source = MultiParams::new();
//! source.push_named("pos", ParamList::named(&[("x", 10.0), ("y", 12.0)])).unwrap();
//! source.push_named("flux", ScalarParam::named("flux", 100.0)).unwrap();
//!
//! assert_eq!(source.names(), vec!["pos.x", "pos.y", "flux.flux"]);
//!
//! // Hold the position fixed and fit only the flux
//! source.freeze("pos").unwrap();
//! assert_eq!(source.get_active(), vec![100.0]);
//!
//! source.set_active(&[250.0]).unwrap();
//! source.thaw_all();
//! assert_eq!(source.get_active(), vec![10.0, 12.0, 250.0]);
//! ```

pub mod list;
pub mod liquidity;
pub mod multi;
pub mod scalar;

#[cfg(test)]
mod tests;

use std::any::Any;

use crate::error::Result;

pub use list::ParamList;
pub use liquidity::{Liquidity, LiquidityMut};
pub use multi::MultiParams;
pub use scalar::ScalarParam;

/// A named, orderable, partially-activatable vector of real-valued parameters.
///
/// Leaves own scalar slots, composites own child trees; both expose the same
/// flattened view of their *active* parameters. `count_active`, `get_active`,
/// `set_active` and `names` always agree in length.
pub trait Params {
    /// The name table and active mask over this node's slots (leaf) or children
    /// (composite).
    fn liquidity(&self) -> &Liquidity;

    /// Mutable access to the active mask. The name table itself is fixed by
    /// the node that owns the slots.
    fn liquidity_mut(&mut self) -> LiquidityMut<'_>;

    /// Number of currently liquid scalar parameters, recursively.
    fn count_active(&self) -> usize;

    /// Copy of the active parameter values, depth-first in declaration order.
    fn get_active(&self) -> Vec<f64>;

    /// Assign the active parameter values, in the same order as [`Params::get_active`].
    ///
    /// # Errors
    ///
    /// [`MogError::ArgumentError`](crate::MogError::ArgumentError) if
    /// `values.len() != self.count_active()`. Nothing is written in that case.
    fn set_active(&mut self, values: &[f64]) -> Result<()>;

    /// Set the `index`-th active parameter and return its previous value.
    ///
    /// # Errors
    ///
    /// [`MogError::IndexError`](crate::MogError::IndexError) if `index` is out of range.
    fn set_one(&mut self, index: usize, value: f64) -> Result<f64>;

    /// One name per active parameter.
    fn names(&self) -> Vec<String>;

    /// Total number of scalar parameters, ignoring the active mask.
    fn count_all(&self) -> usize;

    /// Every parameter value, ignoring the active mask.
    fn get_all(&self) -> Vec<f64>;

    /// Finite-difference step size per active parameter.
    fn step_sizes(&self) -> Vec<f64> {
        vec![1.0; self.count_active()]
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Deep copy behind a trait object, so composites can be cloned.
    fn box_clone(&self) -> Box<dyn Params>;

    /// Freeze the slot or child bound to `name`.
    fn freeze(&mut self, name: &str) -> Result<()> {
        self.liquidity_mut().freeze(name)
    }

    /// Thaw the slot or child bound to `name`.
    fn thaw(&mut self, name: &str) -> Result<()> {
        self.liquidity_mut().thaw(name)
    }

    fn freeze_many(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            self.liquidity().index_of(name)?;
        }
        for name in names {
            self.freeze(name)?;
        }
        Ok(())
    }

    fn thaw_many(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            self.liquidity().index_of(name)?;
        }
        for name in names {
            self.thaw(name)?;
        }
        Ok(())
    }

    fn freeze_all(&mut self) {
        self.liquidity_mut().freeze_all();
    }

    fn thaw_all(&mut self) {
        self.liquidity_mut().thaw_all();
    }

    /// Freeze everything at this level, then thaw the named entries.
    ///
    /// Unknown names are rejected before the mask is touched.
    fn freeze_all_except(&mut self, names: &[&str]) -> Result<()> {
        self.liquidity_mut().freeze_all_except(names)
    }

    /// Freeze this node and, for composites, every descendant.
    fn freeze_all_recursive(&mut self) {
        self.freeze_all();
    }

    /// Thaw this node and, for composites, every descendant.
    fn thaw_all_recursive(&mut self) {
        self.thaw_all();
    }

    fn is_frozen(&self, name: &str) -> Result<bool> {
        let i = self.liquidity().index_of(name)?;
        Ok(!self.liquidity().is_liquid(i))
    }

    /// Bound names whose entries are currently frozen.
    fn frozen_names(&self) -> Vec<String> {
        self.liquidity().bound_names(false)
    }

    /// Bound names whose entries are currently liquid.
    fn thawed_names(&self) -> Vec<String> {
        self.liquidity().bound_names(true)
    }
}

impl Clone for Box<dyn Params> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
