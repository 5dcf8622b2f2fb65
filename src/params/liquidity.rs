//! Name bindings and the active ("liquid") mask.
//!
//! Every [`Params`](super::Params) implementation owns one [`Liquidity`], sized
//! to its slots (leaves) or children (composites). The gather/scatter helpers
//! keep the flattened ordering identical across `get`, `set`, `count` and
//! `names`.

use std::collections::HashMap;
use std::ops::Deref;

use crate::error::{MogError, Result};

/// Name→index table plus one liquid flag per entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Liquidity {
    liquid: Vec<bool>,
    names: Vec<Option<String>>,
    index: HashMap<String, usize>,
}

impl Liquidity {
    /// `len` unnamed entries, all liquid.
    pub fn new(len: usize) -> Self {
        Self {
            liquid: vec![true; len],
            names: vec![None; len],
            index: HashMap::new(),
        }
    }

    /// One liquid entry per name, bound in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use mogfit_rs::params::Liquidity;
    ///
    /// let liq = Liquidity::with_names(&["x", "y"]);
    /// assert_eq!(liq.index_of("y").unwrap(), 1);
    /// assert_eq!(liq.count_liquid(), 2);
    /// ```
    pub fn with_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut liq = Self::new(0);
        for name in names {
            liq.push(Some(name.as_ref()));
        }
        liq
    }

    /// Append a liquid entry, optionally bound to `name`.
    ///
    /// A name that is already bound is rebound to the new entry. Only the
    /// owner of the slots may grow the table, so this is not public.
    ///
    /// ```compile_fail
    /// use mogfit_rs::params::Liquidity;
    ///
    /// let mut liq = Liquidity::new(1);
    /// liq.push(Some("z"));
    /// ```
    pub(crate) fn push(&mut self, name: Option<&str>) -> usize {
        let i = self.liquid.len();
        self.liquid.push(true);
        self.names.push(name.map(str::to_string));
        if let Some(name) = name {
            if let Some(old) = self.index.insert(name.to_string(), i) {
                self.names[old] = None;
            }
        }
        i
    }

    pub fn len(&self) -> usize {
        self.liquid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.liquid.is_empty()
    }

    /// Raw index bound to `name`.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| MogError::KeyError(name.to_string()))
    }

    pub fn name_of(&self, i: usize) -> Option<&str> {
        self.names.get(i).and_then(|n| n.as_deref())
    }

    /// Name used in flattened parameter names: the bound name, else `param<i>`.
    pub fn display_name(&self, i: usize) -> String {
        match self.name_of(i) {
            Some(name) => name.to_string(),
            None => format!("param{}", i),
        }
    }

    pub fn is_liquid(&self, i: usize) -> bool {
        self.liquid.get(i).copied().unwrap_or(false)
    }

    pub fn set_liquid(&mut self, i: usize, liquid: bool) -> Result<()> {
        let len = self.liquid.len();
        match self.liquid.get_mut(i) {
            Some(flag) => {
                *flag = liquid;
                Ok(())
            }
            None => Err(MogError::IndexError { index: i, len }),
        }
    }

    pub fn freeze(&mut self, name: &str) -> Result<()> {
        let i = self.index_of(name)?;
        self.liquid[i] = false;
        Ok(())
    }

    pub fn thaw(&mut self, name: &str) -> Result<()> {
        let i = self.index_of(name)?;
        self.liquid[i] = true;
        Ok(())
    }

    pub fn freeze_all(&mut self) {
        self.liquid.iter_mut().for_each(|v| *v = false);
    }

    pub fn thaw_all(&mut self) {
        self.liquid.iter_mut().for_each(|v| *v = true);
    }

    pub fn freeze_all_except(&mut self, names: &[&str]) -> Result<()> {
        let keep = names
            .iter()
            .map(|n| self.index_of(n))
            .collect::<Result<Vec<_>>>()?;
        self.freeze_all();
        for i in keep {
            self.liquid[i] = true;
        }
        Ok(())
    }

    pub fn count_liquid(&self) -> usize {
        self.liquid.iter().filter(|&&v| v).count()
    }

    /// Raw indices of the liquid entries, in order.
    pub fn liquid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.liquid
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v)
            .map(|(i, _)| i)
    }

    /// Raw index of the `j`-th liquid entry.
    pub fn raw_index(&self, j: usize) -> Result<usize> {
        self.liquid_indices()
            .nth(j)
            .ok_or(MogError::IndexError {
                index: j,
                len: self.count_liquid(),
            })
    }

    /// Liquid entries of a raw per-slot array.
    pub fn gather(&self, raw: &[f64]) -> Vec<f64> {
        self.liquid_indices().map(|i| raw[i]).collect()
    }

    /// Write `values` into the liquid slots through `set`.
    ///
    /// The length is checked before anything is written.
    pub fn scatter<F>(&self, values: &[f64], mut set: F) -> Result<()>
    where
        F: FnMut(usize, f64),
    {
        let n = self.count_liquid();
        if values.len() != n {
            return Err(MogError::ArgumentError(format!(
                "Expected {} active values, got {}",
                n,
                values.len()
            )));
        }
        for (i, &v) in self.liquid_indices().zip(values) {
            set(i, v);
        }
        Ok(())
    }

    /// Flattened names of the liquid slots of a leaf.
    ///
    /// Unnamed slots are `param<j>`, with `j` counting liquid slots only.
    pub fn liquid_names(&self) -> Vec<String> {
        self.liquid_indices()
            .enumerate()
            .map(|(j, i)| match self.name_of(i) {
                Some(name) => name.to_string(),
                None => format!("param{}", j),
            })
            .collect()
    }

    /// Reorder the liquid flags so that entry `i` takes the flag of `source[i]`.
    ///
    /// Names stay bound to positions; `source` must be a permutation.
    pub(crate) fn permute_liquid(&mut self, source: &[usize]) {
        debug_assert_eq!(source.len(), self.liquid.len());
        self.liquid = source.iter().map(|&i| self.liquid[i]).collect();
    }

    /// Bound names whose liquid flag equals `liquid`, in index order.
    pub fn bound_names(&self, liquid: bool) -> Vec<String> {
        self.names
            .iter()
            .zip(&self.liquid)
            .filter(|&(_, &l)| l == liquid)
            .filter_map(|(n, _)| n.clone())
            .collect()
    }
}

/// Mutable access to a node's liquid flags.
///
/// Returned by [`Params::liquidity_mut`](super::Params::liquidity_mut). It can
/// freeze and thaw entries but cannot resize or replace the table, which
/// stays sized to the node's slots.
///
/// ```compile_fail
/// use mogfit_rs::params::{Liquidity, ParamList, Params};
///
/// let mut pos = ParamList::named(&[("x", 1.0)]);
/// *pos.liquidity_mut() = Liquidity::new(3);
/// ```
#[derive(Debug)]
pub struct LiquidityMut<'a> {
    inner: &'a mut Liquidity,
}

impl<'a> LiquidityMut<'a> {
    pub(crate) fn new(inner: &'a mut Liquidity) -> Self {
        Self { inner }
    }

    pub fn set_liquid(&mut self, i: usize, liquid: bool) -> Result<()> {
        self.inner.set_liquid(i, liquid)
    }

    pub fn freeze(&mut self, name: &str) -> Result<()> {
        self.inner.freeze(name)
    }

    pub fn thaw(&mut self, name: &str) -> Result<()> {
        self.inner.thaw(name)
    }

    pub fn freeze_all(&mut self) {
        self.inner.freeze_all();
    }

    pub fn thaw_all(&mut self) {
        self.inner.thaw_all();
    }

    pub fn freeze_all_except(&mut self, names: &[&str]) -> Result<()> {
        self.inner.freeze_all_except(names)
    }
}

impl Deref for LiquidityMut<'_> {
    type Target = Liquidity;

    fn deref(&self) -> &Liquidity {
        self.inner
    }
}
