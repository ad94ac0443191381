//! NodeSet: a [`NodeMap`] with unit values.
//!
//! New elements are linked at the head of their chain and the table grows
//! once the load would exceed 0.85.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};

use crate::config::TableConfig;
use crate::error::{CapacityError, InsertError};
use crate::hash::DefaultHashBuilder;
use crate::node_map::{self, BucketStats, NodeMap, Placement};

#[cfg(feature = "profile")]
use crate::profile::HashProfile;

/// Separate-chaining hash set with stable element addresses.
pub struct NodeSet<T, S = DefaultHashBuilder> {
    map: NodeMap<T, (), S>,
}

impl<T> NodeSet<T>
where
    T: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_config(TableConfig::node_set(), Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(
            TableConfig::node_set().with_capacity(capacity),
            Default::default(),
        )
    }
}

impl<T> Default for NodeSet<T>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> NodeSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config(TableConfig::node_set(), hasher)
    }

    pub fn with_config(config: TableConfig, hasher: S) -> Self {
        Self {
            map: NodeMap::with_placement(config, hasher, Placement::Head),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Add `value`; an element already present is reported as
    /// [`InsertError::DuplicateKey`] and the set is unchanged.
    pub fn insert(&mut self, value: T) -> Result<(), InsertError> {
        self.map.insert(value, ()).map(|_| ())
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains(q)
    }

    /// The stored element equal to `q`.
    pub fn find<Q>(&self, q: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.find_key(q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.remove(q).map(|(t, ())| t)
    }

    /// # Panics
    /// If `new_capacity` is zero.
    pub fn rehash(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        self.map.rehash(new_capacity)
    }

    pub fn clear(&mut self) {
        self.map.clear()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            it: self.map.iter(),
        }
    }

    pub fn bucket_stats(&self) -> BucketStats {
        self.map.bucket_stats()
    }

    #[cfg(feature = "profile")]
    pub fn profile(&self) -> HashProfile {
        self.map.profile()
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.map.assert_invariants()
    }
}

impl<T: fmt::Debug, S> fmt::Debug for NodeSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.map.iter().map(|(t, ())| t))
            .finish()
    }
}

/// Iterator over the elements of a [`NodeSet`] in arena order.
pub struct Iter<'a, T> {
    it: node_map::Iter<'a, T, ()>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(t, ())| t)
    }
}

impl<'a, T, S> IntoIterator for &'a NodeSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
