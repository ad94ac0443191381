//! RobinHoodMap: open addressing with fibonacci hashing, Robin-Hood
//! displacement on insert and backward-shift deletion.
//!
//! Every occupied slot records its probe distance from its home slot. Insert
//! lets a "poorer" entry (longer distance) take the slot of a "richer" one and
//! carries the evicted entry on. That makes two facts hold at all times:
//! - the slots between an entry's home and its position are all occupied;
//! - a lookup can stop as soon as it meets a slot whose distance is smaller
//!   than its own, since the key would have displaced that entry.
//!
//! Removal shifts the following run of displaced entries back one slot until
//! it reaches an empty slot or an entry sitting at its home.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;

use tracing::{debug, trace};

use crate::config::TableConfig;
use crate::error::{try_alloc_slots, CapacityError, InsertError};
use crate::hash::{fibonacci_index, make_hash, DefaultHashBuilder};
use crate::reentrancy::DebugReentrancy;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    dist: u32,
}

/// Slot array plus occupancy. Knows nothing about hashing user keys: every
/// entry carries its hash, so moving entries never calls back into `K`.
struct Slots<K, V> {
    slots: Box<[Option<Entry<K, V>>]>,
    len: usize,
}

impl<K, V> Slots<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    fn find<Q>(&self, hash: u64, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        if self.len == 0 {
            return None;
        }
        let mask = self.mask();
        let mut idx = fibonacci_index(hash, self.capacity());
        let mut dist = 0u32;
        loop {
            match &self.slots[idx] {
                None => return None,
                Some(e) if e.dist < dist => return None,
                Some(e) if e.hash == hash && e.key.borrow() == q => return Some(idx),
                Some(_) => {}
            }
            dist += 1;
            idx = (idx + 1) & mask;
        }
    }

    /// Robin-Hood placement. The caller guarantees a free slot exists and the
    /// key is absent.
    fn place(&mut self, mut entry: Entry<K, V>) {
        let mask = self.mask();
        let mut idx = fibonacci_index(entry.hash, self.capacity());
        entry.dist = 0;
        loop {
            let slot = &mut self.slots[idx];
            match slot {
                None => {
                    *slot = Some(entry);
                    self.len += 1;
                    return;
                }
                Some(resident) => {
                    if resident.dist < entry.dist {
                        mem::swap(resident, &mut entry);
                    }
                }
            }
            entry.dist += 1;
            idx = (idx + 1) & mask;
        }
    }

    /// Take the entry at `idx` and close the gap by shifting the following
    /// displaced run back one slot.
    fn remove_at(&mut self, idx: usize) -> Option<Entry<K, V>> {
        let removed = self.slots[idx].take()?;
        self.len -= 1;
        let mask = self.mask();
        let mut hole = idx;
        loop {
            let next = (hole + 1) & mask;
            match self.slots[next].take() {
                Some(mut e) if e.dist > 0 => {
                    e.dist -= 1;
                    self.slots[hole] = Some(e);
                    hole = next;
                }
                other => {
                    self.slots[next] = other;
                    break;
                }
            }
        }
        Some(removed)
    }

    /// # Panics
    /// If `new_capacity` is not a power of two.
    fn rehash(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        assert!(
            new_capacity.is_power_of_two(),
            "RobinHoodMap capacity must be a power of two, got {new_capacity}"
        );
        if new_capacity < self.len {
            return Err(CapacityError::TooSmall {
                requested: new_capacity,
                len: self.len,
            });
        }
        let fresh = try_alloc_slots(new_capacity, || None)?;
        let old = mem::replace(&mut self.slots, fresh);
        self.len = 0;
        for entry in old.into_vec().into_iter().flatten() {
            self.place(entry);
        }
        Ok(())
    }

    /// Grow ahead of one more insert if it would cross the load threshold.
    fn reserve_one(&mut self, config: &mut TableConfig) -> Result<(), CapacityError> {
        let needed = self.len + 1;
        let capacity = self.capacity();
        if needed <= config.max_len_for(capacity) {
            return Ok(());
        }
        let new_capacity = config.grown_capacity(capacity, needed)?;
        debug!(
            old_capacity = capacity,
            new_capacity,
            len = self.len,
            "robin-hood map growing"
        );
        self.rehash(new_capacity)?;
        *config = config.with_capacity(new_capacity);
        Ok(())
    }

    fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.len = 0;
    }
}

/// Open-addressing map with Robin-Hood probing and automatic growth.
pub struct RobinHoodMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    table: Slots<K, V>,
    config: TableConfig,
    reentrancy: DebugReentrancy,
}

impl<K, V> RobinHoodMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_config(TableConfig::robin_hood(), Default::default())
    }

    /// # Panics
    /// If `capacity` is nonzero and not a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(
            TableConfig::robin_hood().with_capacity(capacity),
            Default::default(),
        )
    }
}

impl<K, V> Default for RobinHoodMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> RobinHoodMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config(TableConfig::robin_hood(), hasher)
    }

    /// # Panics
    /// If the capacity is nonzero and not a power of two, or the load factor
    /// is outside `(0, 1]`.
    pub fn with_config(config: TableConfig, hasher: S) -> Self {
        let capacity = config.effective_capacity();
        assert!(
            capacity.is_power_of_two(),
            "RobinHoodMap capacity must be a power of two, got {capacity}"
        );
        config.validate_load_factor();
        Self {
            hasher,
            table: Slots::new(capacity),
            config: config.with_capacity(capacity),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len
    }
    pub fn is_empty(&self) -> bool {
        self.table.len == 0
    }
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }
    pub fn max_load_factor(&self) -> f32 {
        self.config.max_load_factor
    }
    pub fn load_factor(&self) -> f32 {
        self.table.len as f32 / self.table.capacity() as f32
    }

    pub fn find<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        let idx = self.table.find(hash, q)?;
        self.table.slots[idx].as_ref().map(|e| &e.value)
    }

    pub fn find_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        let idx = self.table.find(hash, q)?;
        self.table.slots[idx].as_mut().map(|e| &mut e.value)
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        self.table.find(hash, q).is_some()
    }

    /// Copy of the value stored under `q`.
    pub fn get<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.find(q).cloned()
    }

    /// Distance of `q`'s slot from its home slot.
    pub fn probe_distance<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        let idx = self.table.find(hash, q)?;
        self.table.slots[idx].as_ref().map(|e| e.dist as usize)
    }

    /// Insert a new key. A present key leaves the map untouched, including
    /// its capacity.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), InsertError> {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, &key);
        if self.table.find(hash, &key).is_some() {
            return Err(InsertError::DuplicateKey);
        }
        self.table.reserve_one(&mut self.config)?;
        self.table.place(Entry {
            key,
            value,
            hash,
            dist: 0,
        });
        Ok(())
    }

    /// Insert or overwrite; returns the previous value.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>, InsertError> {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, &key);
        if let Some(idx) = self.table.find(hash, &key) {
            if let Some(e) = self.table.slots[idx].as_mut() {
                return Ok(Some(mem::replace(&mut e.value, value)));
            }
        }
        self.table.reserve_one(&mut self.config)?;
        self.table.place(Entry {
            key,
            value,
            hash,
            dist: 0,
        });
        Ok(None)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        let idx = self.table.find(hash, q)?;
        let e = self.table.remove_at(idx)?;
        Some((e.key, e.value))
    }

    /// Move every entry into a table of `new_capacity` slots.
    ///
    /// # Panics
    /// If `new_capacity` is not a power of two.
    pub fn rehash(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        let _g = self.reentrancy.enter();
        trace!(
            old_capacity = self.table.capacity(),
            new_capacity,
            len = self.table.len,
            "robin-hood map rehash"
        );
        self.table.rehash(new_capacity)?;
        self.config = self.config.with_capacity(new_capacity);
        Ok(())
    }

    /// Drop every entry, keeping the capacity.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.table.clear();
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.table.slots.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.table.slots.iter_mut(),
        }
    }

    /// Check the displacement invariants slot by slot.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let cap = self.table.capacity();
        let mask = cap - 1;
        let mut live = 0;
        for (i, slot) in self.table.slots.iter().enumerate() {
            let Some(e) = slot else { continue };
            live += 1;
            let d = e.dist as usize;
            assert!(d < cap, "distance {d} out of range at slot {i}");
            assert_eq!(
                (i + cap - d) & mask,
                fibonacci_index(e.hash, cap),
                "slot {i} does not point back to its home"
            );
            for back in 1..=d {
                assert!(
                    self.table.slots[(i + cap - back) & mask].is_some(),
                    "gap inside the probe path of slot {i}"
                );
            }
            if let Some(next) = &self.table.slots[(i + 1) & mask] {
                assert!(next.dist <= e.dist + 1, "richer entry shadows slot {i}");
            }
        }
        assert_eq!(live, self.table.len);
    }
}

impl<K, V, S> fmt::Debug for RobinHoodMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.table
                    .slots
                    .iter()
                    .flatten()
                    .map(|e| (&e.key, &e.value)),
            )
            .finish()
    }
}

/// Iterator over `(&K, &V)` in slot order.
pub struct Iter<'a, K, V> {
    it: core::slice::Iter<'a, Option<Entry<K, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.by_ref().flatten().next().map(|e| (&e.key, &e.value))
    }
}

/// Iterator over `(&K, &mut V)` in slot order.
pub struct IterMut<'a, K, V> {
    it: core::slice::IterMut<'a, Option<Entry<K, V>>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .by_ref()
            .flatten()
            .next()
            .map(|e| (&e.key, &mut e.value))
    }
}

impl<'a, K, V, S> IntoIterator for &'a RobinHoodMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut RobinHoodMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::BuildIdentityHasher;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    fn identity_map<V>(capacity: usize) -> RobinHoodMap<u64, V, BuildIdentityHasher> {
        RobinHoodMap::with_config(
            TableConfig::robin_hood().with_capacity(capacity),
            BuildIdentityHasher,
        )
    }

    /// Keys whose fibonacci home slot in a table of `capacity` is `home`.
    fn keys_homed_at(home: usize, capacity: usize, n: usize) -> Vec<u64> {
        (0u64..)
            .filter(|&k| fibonacci_index(k, capacity) == home)
            .take(n)
            .collect()
    }

    /// Invariant: duplicate keys are rejected and the stored value is kept.
    #[test]
    fn duplicate_insert_rejected() {
        let mut m: RobinHoodMap<String, i32> = RobinHoodMap::new();
        m.insert("dup".to_string(), 1).unwrap();
        assert!(matches!(
            m.insert("dup".to_string(), 2),
            Err(InsertError::DuplicateKey)
        ));
        assert_eq!(m.find("dup"), Some(&1));
        assert_eq!(m.len(), 1);
    }

    /// Invariant: a duplicate insert at the growth threshold does not grow.
    #[test]
    fn duplicate_at_threshold_does_not_grow() {
        let mut m = identity_map(8);
        for k in 0..6 {
            m.insert(k, ()).unwrap();
        }
        assert_eq!(m.capacity(), 8);
        assert!(m.insert(0, ()).is_err());
        assert_eq!(m.capacity(), 8);
    }

    #[test]
    fn find_get_contains_parity() {
        let mut m: RobinHoodMap<String, i32> = RobinHoodMap::new();
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            m.insert((*k).to_string(), i as i32).unwrap();
        }
        for k in ["a", "b", "c"] {
            assert!(m.contains(k));
            assert_eq!(m.find(k).copied(), m.get(k));
        }
        for k in ["x", "y"] {
            assert!(!m.contains(k));
            assert!(m.find(k).is_none());
            assert!(m.get(k).is_none());
        }
    }

    #[test]
    fn thousand_identity_keys_from_capacity_32() {
        let mut m = identity_map(32);
        for k in 1..=1000u64 {
            m.insert(k, k * 10).unwrap();
        }
        assert_eq!(m.len(), 1000);
        assert!(m.capacity().is_power_of_two());
        assert!(m.capacity() as f64 >= 1000.0 / 0.85);
        for k in 1..=1000u64 {
            assert_eq!(m.find(&k), Some(&(k * 10)));
        }
        assert!(m.find(&0).is_none());
        m.assert_invariants();
    }

    /// Regression: removal must keep shifting until the displaced run ends,
    /// not stop after the first neighbour.
    #[test]
    fn remove_shifts_whole_displaced_run() {
        let cap = 16;
        let mut m = identity_map(cap);
        let run = keys_homed_at(3, cap, 4);
        for &k in &run {
            m.insert(k, k).unwrap();
        }
        for (i, &k) in run.iter().enumerate() {
            assert_eq!(m.probe_distance(&k), Some(i));
        }
        m.remove(&run[0]).unwrap();
        m.assert_invariants();
        for (i, &k) in run[1..].iter().enumerate() {
            assert_eq!(m.probe_distance(&k), Some(i), "key {k} not shifted back");
            assert_eq!(m.find(&k), Some(&k));
        }
    }

    #[test]
    fn insert_steals_from_richer_entries() {
        let cap = 16;
        let mut m = identity_map(cap);
        let at3 = keys_homed_at(3, cap, 3);
        let at4 = keys_homed_at(4, cap, 1);
        // at4[0] sits at home; the third key homed at 3 pushes past it.
        m.insert(at3[0], ()).unwrap();
        m.insert(at4[0], ()).unwrap();
        m.insert(at3[1], ()).unwrap();
        m.insert(at3[2], ()).unwrap();
        assert_eq!(m.probe_distance(&at3[2]), Some(2));
        assert_eq!(m.probe_distance(&at4[0]), Some(2));
        m.assert_invariants();
    }

    #[test]
    fn rehash_preserves_values() {
        let mut m = identity_map(64);
        for k in 0..40u64 {
            m.insert(k, k + 1).unwrap();
        }
        let cap = m.capacity();
        m.rehash(cap * 2).unwrap();
        assert_eq!(m.capacity(), cap * 2);
        for k in 0..40u64 {
            assert_eq!(m.find(&k), Some(&(k + 1)));
        }
        m.assert_invariants();
    }

    #[test]
    fn rehash_too_small_is_reported() {
        let mut m = identity_map(64);
        for k in 0..40u64 {
            m.insert(k, ()).unwrap();
        }
        match m.rehash(32) {
            Err(CapacityError::TooSmall { requested, len }) => {
                assert_eq!((requested, len), (32, 40));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(m.capacity(), 64);
        assert_eq!(m.len(), 40);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_capacity_panics() {
        let _ = RobinHoodMap::<u64, ()>::with_capacity(24);
    }

    #[test]
    fn zero_capacity_selects_default() {
        let m = RobinHoodMap::<u64, ()>::with_capacity(0);
        assert_eq!(m.capacity(), TableConfig::DEFAULT_CAPACITY);
    }

    #[test]
    fn set_overwrites_and_inserts() {
        let mut m: RobinHoodMap<&'static str, i32> = RobinHoodMap::new();
        assert_eq!(m.set("k", 1).unwrap(), None);
        assert_eq!(m.set("k", 2).unwrap(), Some(1));
        assert_eq!(m.find("k"), Some(&2));
        *m.find_mut("k").unwrap() += 1;
        assert_eq!(m.get("k"), Some(3));
    }

    #[test]
    fn colliding_hashes_are_resolved_by_eq() {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ConstHasher
            }
        }
        impl core::hash::Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            }
        }

        let mut m: RobinHoodMap<String, usize, ConstBuildHasher> =
            RobinHoodMap::with_hasher(ConstBuildHasher);
        for i in 0..300 {
            m.insert(format!("k{i}"), i).unwrap();
        }
        for i in (0..300).step_by(3) {
            assert_eq!(m.remove(&format!("k{i}")), Some((format!("k{i}"), i)));
        }
        for i in 0..300 {
            assert_eq!(m.contains(&format!("k{i}")), i % 3 != 0);
        }
        m.assert_invariants();
    }

    #[test]
    fn iteration_yields_each_entry_once() {
        let mut m = identity_map(32);
        for k in 0..20u64 {
            m.insert(k, 0).unwrap();
        }
        let seen: BTreeSet<u64> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(seen, (0..20).collect());
        for (_, v) in m.iter_mut() {
            *v += 7;
        }
        assert!((&m).into_iter().all(|(_, v)| *v == 7));
    }

    #[test]
    fn remove_and_clear_drop_payloads() {
        let drops = Rc::new(Cell::new(0));
        struct Tracked(Rc<Cell<usize>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut m = identity_map(32);
        for k in 0..10u64 {
            m.insert(k, Tracked(drops.clone())).unwrap();
        }
        drop(m.remove(&3));
        assert_eq!(drops.get(), 1);
        m.clear();
        assert_eq!(drops.get(), 10);
        assert!(m.is_empty());

        m.insert(1, Tracked(drops.clone())).unwrap();
        drop(m);
        assert_eq!(drops.get(), 11);
    }

    #[test]
    fn debug_lists_entries() {
        let mut m = identity_map(8);
        m.insert(5, "five").unwrap();
        assert_eq!(format!("{m:?}"), r#"{5: "five"}"#);
    }
}
