//! NodeMap: separate chaining over a node arena.
//!
//! Each node is boxed and its box is owned by a `SlotMap`; buckets and
//! `next` links are arena keys. Growing the arena moves only the boxes, and
//! a rehash only rewrites links and bucket heads, so a node keeps its
//! address until it is removed. A [`Handle`] names its entry for as long.
//!
//! Each node keeps its full hash, so relinking during rehash never calls
//! `K: Hash`.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use crate::config::TableConfig;
use crate::error::{try_alloc_slots, CapacityError, InsertError};
use crate::hash::{make_hash, DefaultHashBuilder};
use crate::profile::Profile;
use crate::reentrancy::DebugReentrancy;

#[cfg(feature = "profile")]
use crate::profile::HashProfile;

new_key_type! {
    struct NodeKey;
}

/// Largest node count the arena can index.
const MAX_NODES: usize = (u32::MAX - 1) as usize;

/// Stable name for one entry of a [`NodeMap`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(NodeKey);

impl Handle {
    pub fn key<'a, K, V, S>(&self, map: &'a NodeMap<K, V, S>) -> Option<&'a K> {
        map.chains.nodes.get(self.0).map(|n| &n.key)
    }

    pub fn value<'a, K, V, S>(&self, map: &'a NodeMap<K, V, S>) -> Option<&'a V> {
        map.chains.nodes.get(self.0).map(|n| &n.value)
    }

    pub fn value_mut<'a, K, V, S>(&self, map: &'a mut NodeMap<K, V, S>) -> Option<&'a mut V> {
        map.chains.nodes.get_mut(self.0).map(|n| &mut n.value)
    }
}

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,
    next: Option<NodeKey>,
}

/// Where a new node joins its bucket chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    Head,
    Tail,
}

/// Chain length summary across all buckets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BucketStats {
    pub buckets: usize,
    pub len: usize,
    pub max_chain: usize,
    pub empty_buckets: usize,
    pub avg_chain: f64,
    pub avg_nonempty_chain: f64,
}

struct Chains<K, V> {
    buckets: Box<[Option<NodeKey>]>,
    nodes: SlotMap<NodeKey, Box<Node<K, V>>>,
}

impl<K, V> Chains<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            buckets: vec![None; capacity].into_boxed_slice(),
            nodes: SlotMap::with_key(),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Walk the chain for `hash`; returns the match and the number of nodes
    /// visited.
    fn find<Q>(&self, hash: u64, q: &Q) -> (Option<NodeKey>, usize)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cur = self.buckets[self.bucket_of(hash)];
        let mut probes = 0;
        while let Some(k) = cur {
            let node = &self.nodes[k];
            probes += 1;
            if node.hash == hash && node.key.borrow() == q {
                return (Some(k), probes);
            }
            cur = node.next;
        }
        (None, probes)
    }

    fn link(&mut self, node: Node<K, V>, placement: Placement) -> Result<NodeKey, CapacityError> {
        if self.nodes.len() >= MAX_NODES {
            return Err(CapacityError::Overflow);
        }
        self.nodes.try_reserve(1)?;
        let b = self.bucket_of(node.hash);
        let head = self.buckets[b];
        let k = self.nodes.insert(Box::new(node));
        match (placement, head) {
            (Placement::Tail, Some(mut last)) => {
                while let Some(next) = self.nodes[last].next {
                    last = next;
                }
                self.nodes[last].next = Some(k);
            }
            (Placement::Head, Some(_)) => {
                self.nodes[k].next = head;
                self.buckets[b] = Some(k);
            }
            (_, None) => self.buckets[b] = Some(k),
        }
        Ok(k)
    }

    /// Detach `target` from its chain and free its node.
    fn unlink(&mut self, target: NodeKey) -> Option<Node<K, V>> {
        let node = self.nodes.get(target)?;
        let (hash, next) = (node.hash, node.next);
        let b = self.bucket_of(hash);
        if self.buckets[b] == Some(target) {
            self.buckets[b] = next;
        } else {
            let mut cur = self.buckets[b];
            while let Some(k) = cur {
                if self.nodes[k].next == Some(target) {
                    self.nodes[k].next = next;
                    break;
                }
                cur = self.nodes[k].next;
            }
        }
        self.nodes.remove(target).map(|node| *node)
    }

    /// Relink every node into `new_capacity` buckets. Node storage is not
    /// touched.
    fn rehash(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        let mut heads = try_alloc_slots(new_capacity, || None)?;
        for (k, node) in self.nodes.iter_mut() {
            let b = (node.hash % new_capacity as u64) as usize;
            node.next = heads[b];
            heads[b] = Some(k);
        }
        self.buckets = heads;
        Ok(())
    }

    /// Grow ahead of one more insert if it would cross the load threshold.
    fn reserve_one(&mut self, config: &mut TableConfig) -> Result<(), CapacityError> {
        let needed = self.nodes.len() + 1;
        let capacity = self.capacity();
        if needed <= config.max_len_for(capacity) {
            return Ok(());
        }
        let new_capacity = config.grown_capacity(capacity, needed)?;
        debug!(
            old_capacity = capacity,
            new_capacity,
            len = self.nodes.len(),
            "node table growing"
        );
        self.rehash(new_capacity)?;
        *config = config.with_capacity(new_capacity);
        Ok(())
    }

    fn chain_len(&self, bucket: usize) -> usize {
        let mut n = 0;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            n += 1;
            cur = self.nodes[k].next;
        }
        n
    }

    fn stats(&self) -> BucketStats {
        let buckets = self.capacity();
        let (mut max_chain, mut empty_buckets, mut total) = (0, 0, 0);
        for b in 0..buckets {
            let n = self.chain_len(b);
            total += n;
            max_chain = max_chain.max(n);
            if n == 0 {
                empty_buckets += 1;
            }
        }
        let nonempty = buckets - empty_buckets;
        BucketStats {
            buckets,
            len: total,
            max_chain,
            empty_buckets,
            avg_chain: total as f64 / buckets as f64,
            avg_nonempty_chain: if nonempty == 0 {
                0.0
            } else {
                total as f64 / nonempty as f64
            },
        }
    }

    fn clear(&mut self) {
        self.nodes.clear();
        for b in self.buckets.iter_mut() {
            *b = None;
        }
    }
}

fn assert_valid_capacity(capacity: usize) {
    assert!(capacity > 0, "node table capacity must be nonzero");
}

/// Separate-chaining hash map with pointer-stable entries.
pub struct NodeMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    chains: Chains<K, V>,
    config: TableConfig,
    placement: Placement,
    profile: Profile,
    reentrancy: DebugReentrancy,
}

impl<K, V> NodeMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_config(TableConfig::node_map(), Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(
            TableConfig::node_map().with_capacity(capacity),
            Default::default(),
        )
    }
}

impl<K, V> Default for NodeMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> NodeMap<K, V, S> {
    pub fn len(&self) -> usize {
        self.chains.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.chains.nodes.is_empty()
    }
    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.chains.capacity()
    }
    pub fn max_load_factor(&self) -> f32 {
        self.config.max_load_factor
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.chains.nodes.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.chains.nodes.iter_mut(),
        }
    }
}

impl<K, V, S> NodeMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config(TableConfig::node_map(), hasher)
    }

    /// # Panics
    /// If the load factor is outside `(0, 1]`.
    pub fn with_config(config: TableConfig, hasher: S) -> Self {
        Self::with_placement(config, hasher, Placement::Tail)
    }

    pub(crate) fn with_placement(config: TableConfig, hasher: S, placement: Placement) -> Self {
        let capacity = config.effective_capacity();
        config.validate_load_factor();
        Self {
            hasher,
            chains: Chains::new(capacity),
            config: config.with_capacity(capacity),
            placement,
            profile: Profile::new(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    fn lookup<Q>(&self, q: &Q) -> Option<NodeKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = make_hash(&self.hasher, q);
        self.profile.hash(hash);
        let (found, probes) = self.chains.find(hash, q);
        self.profile.probe(probes);
        found
    }

    pub fn find<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let k = self.lookup(q)?;
        self.chains.nodes.get(k).map(|n| &n.value)
    }

    pub fn find_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let k = self.lookup(q)?;
        self.chains.nodes.get_mut(k).map(|n| &mut n.value)
    }

    /// Stored key equal to `q`.
    pub fn find_key<Q>(&self, q: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let k = self.lookup(q)?;
        self.chains.nodes.get(k).map(|n| &n.key)
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.lookup(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.find(q).cloned()
    }

    pub fn handle<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.lookup(q).map(Handle)
    }

    /// Insert a new key. A present key leaves the map untouched.
    pub fn insert(&mut self, key: K, value: V) -> Result<Handle, InsertError> {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, &key);
        self.profile.hash(hash);
        let (found, probes) = self.chains.find(hash, &key);
        self.profile.probe(probes);
        if found.is_some() {
            return Err(InsertError::DuplicateKey);
        }
        self.chains.reserve_one(&mut self.config)?;
        let node = Node {
            key,
            value,
            hash,
            next: None,
        };
        Ok(Handle(self.chains.link(node, self.placement)?))
    }

    /// Insert or overwrite; returns the previous value.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>, InsertError> {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, &key);
        self.profile.hash(hash);
        if let (Some(k), _) = self.chains.find(hash, &key) {
            return Ok(Some(mem::replace(&mut self.chains.nodes[k].value, value)));
        }
        self.chains.reserve_one(&mut self.config)?;
        let node = Node {
            key,
            value,
            hash,
            next: None,
        };
        self.chains.link(node, self.placement)?;
        Ok(None)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let k = self.lookup(q)?;
        let node = self.chains.unlink(k)?;
        self.profile.erase();
        Some((node.key, node.value))
    }

    /// Remove the entry `h` names. A stale handle returns `None`.
    pub fn remove_handle(&mut self, h: Handle) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let node = self.chains.unlink(h.0)?;
        self.profile.erase();
        Some((node.key, node.value))
    }

    /// Relink every entry into `new_capacity` buckets. Entries keep their
    /// addresses and handles.
    ///
    /// # Panics
    /// If `new_capacity` is zero.
    pub fn rehash(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        let _g = self.reentrancy.enter();
        assert_valid_capacity(new_capacity);
        trace!(
            old_capacity = self.chains.capacity(),
            new_capacity,
            len = self.chains.nodes.len(),
            "node table rehash"
        );
        self.chains.rehash(new_capacity)?;
        self.config = self.config.with_capacity(new_capacity);
        Ok(())
    }

    /// Drop every entry, keeping the bucket count.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.chains.clear();
    }

    pub fn bucket_stats(&self) -> BucketStats {
        let _g = self.reentrancy.enter();
        self.chains.stats()
    }

    #[cfg(feature = "profile")]
    pub fn profile(&self) -> HashProfile {
        self.profile.snapshot()
    }

    /// Every node sits in the bucket its hash selects, exactly once.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut seen = std::collections::HashSet::new();
        for b in 0..self.chains.capacity() {
            let mut cur = self.chains.buckets[b];
            while let Some(k) = cur {
                let node = &self.chains.nodes[k];
                assert_eq!(self.chains.bucket_of(node.hash), b, "node in wrong bucket");
                assert!(seen.insert(k), "node linked twice");
                cur = node.next;
            }
        }
        assert_eq!(seen.len(), self.chains.nodes.len(), "unlinked nodes");
    }

    /// Keys of one bucket in chain order.
    #[cfg(test)]
    pub(crate) fn chain_keys(&self, bucket: usize) -> Vec<&K> {
        let mut out = Vec::new();
        let mut cur = self.chains.buckets[bucket];
        while let Some(k) = cur {
            out.push(&self.chains.nodes[k].key);
            cur = self.chains.nodes[k].next;
        }
        out
    }
}

impl<K, V, S> fmt::Debug for NodeMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.chains.nodes.values().map(|n| (&n.key, &n.value)))
            .finish()
    }
}

/// Iterator over `(&K, &V)` in arena order.
pub struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, NodeKey, Box<Node<K, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| (&n.key, &n.value))
    }
}

/// Iterator over `(&K, &mut V)` in arena order.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, NodeKey, Box<Node<K, V>>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| {
            let n = &mut **n;
            (&n.key, &mut n.value)
        })
    }
}

impl<'a, K, V, S> IntoIterator for &'a NodeMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut NodeMap<K, V, S> {
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
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn identity_map<V>(capacity: usize) -> NodeMap<u64, V, BuildIdentityHasher> {
        NodeMap::with_config(
            TableConfig::node_map().with_capacity(capacity),
            BuildIdentityHasher,
        )
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut m: NodeMap<String, i32> = NodeMap::new();
        let h = m.insert("dup".to_string(), 1).unwrap();
        assert!(m.insert("dup".to_string(), 2).unwrap_err().is_duplicate_key());
        assert_eq!(h.value(&m), Some(&1));
        assert_eq!(m.len(), 1);
    }

    /// Invariant: new nodes join the tail of their bucket chain.
    #[test]
    fn chains_append_at_tail() {
        let mut m = identity_map(10);
        for k in [3u64, 13, 23] {
            m.insert(k, ()).unwrap();
        }
        assert_eq!(m.chain_keys(3), vec![&3, &13, &23]);
        m.remove(&13).unwrap();
        assert_eq!(m.chain_keys(3), vec![&3, &23]);
        m.remove(&3).unwrap();
        assert_eq!(m.chain_keys(3), vec![&23]);
        m.assert_invariants();
    }

    #[test]
    fn grows_when_load_exceeds_threshold() {
        let mut m = identity_map(10);
        for k in 0..8u64 {
            m.insert(k, k).unwrap();
        }
        assert_eq!(m.capacity(), 10);
        m.insert(8, 8).unwrap();
        assert_eq!(m.capacity(), 20);
        for k in 0..9u64 {
            assert_eq!(m.find(&k), Some(&k));
        }
        m.assert_invariants();
    }

    /// Invariant: rehash relinks nodes without moving them.
    #[test]
    fn rehash_keeps_value_addresses() {
        let mut m = identity_map(8);
        for k in 0..6u64 {
            m.insert(k, k * 100).unwrap();
        }
        let before: Vec<*const u64> = (0..6u64).map(|k| m.find(&k).unwrap() as *const u64).collect();
        let handles: Vec<Handle> = (0..6u64).map(|k| m.handle(&k).unwrap()).collect();
        m.rehash(64).unwrap();
        assert_eq!(m.capacity(), 64);
        for k in 0..6u64 {
            assert_eq!(m.find(&k).unwrap() as *const u64, before[k as usize]);
            assert_eq!(handles[k as usize].value(&m), Some(&(k * 100)));
        }
        m.rehash(3).unwrap();
        for k in 0..6u64 {
            assert_eq!(m.find(&k), Some(&(k * 100)));
        }
        m.assert_invariants();
    }

    /// Invariant: growing the node arena leaves existing nodes in place.
    #[test]
    fn arena_growth_keeps_addresses() {
        let mut m: NodeMap<u32, u64> = NodeMap::new();
        m.insert(0, 7).unwrap();
        let value = m.find(&0).unwrap() as *const u64;
        let key = m.find_key(&0).unwrap() as *const u32;
        for k in 1..2000u32 {
            m.insert(k, k as u64).unwrap();
        }
        assert_eq!(m.find(&0).unwrap() as *const u64, value);
        assert_eq!(m.find_key(&0).unwrap() as *const u32, key);
        assert_eq!(m.find(&0), Some(&7));
    }

    #[test]
    fn stale_handle_does_not_resolve() {
        let mut m = identity_map(8);
        let h = m.insert(1, "one").unwrap();
        assert_eq!(m.remove_handle(h), Some((1, "one")));
        assert!(m.remove_handle(h).is_none());
        let h2 = m.insert(1, "uno").unwrap();
        assert_ne!(h, h2);
        assert!(h.value(&m).is_none());
        assert_eq!(h2.key(&m), Some(&1));
    }

    #[test]
    fn handle_value_mut_updates_entry() {
        let mut m: NodeMap<&'static str, i32> = NodeMap::new();
        let h = m.insert("k", 10).unwrap();
        *h.value_mut(&mut m).unwrap() += 5;
        assert_eq!(m.find("k"), Some(&15));
        assert_eq!(m.handle("k"), Some(h));
    }

    #[test]
    fn set_and_get() {
        let mut m: NodeMap<String, i32> = NodeMap::new();
        assert_eq!(m.set("a".into(), 1).unwrap(), None);
        assert_eq!(m.set("a".into(), 2).unwrap(), Some(1));
        assert_eq!(m.get("a"), Some(2));
        *m.find_mut("a").unwrap() = 3;
        assert_eq!(m.find_key("a").map(String::as_str), Some("a"));
        assert_eq!(m.get("a"), Some(3));
    }

    #[test]
    fn bucket_stats_summarise_chains() {
        let mut m = identity_map(4);
        for k in [0u64, 4, 8, 1] {
            m.set(k, ()).unwrap();
        }
        // Growth kicks in at the 4th key: 4 buckets admit 3 entries at 0.8.
        assert_eq!(m.capacity(), 8);
        let s = m.bucket_stats();
        assert_eq!(s.buckets, 8);
        assert_eq!(s.len, 4);
        assert_eq!(s.max_chain, 2);
        assert_eq!(s.empty_buckets, 5);
        assert!((s.avg_chain - 0.5).abs() < 1e-9);
        assert!((s.avg_nonempty_chain - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn iteration_matches_model() {
        let mut m = identity_map(16);
        let mut model = BTreeMap::new();
        for k in (0..50u64).map(|i| i * 7 % 31) {
            if m.insert(k, k + 1).is_ok() {
                model.insert(k, k + 1);
            }
        }
        for (_, v) in m.iter_mut() {
            *v *= 2;
        }
        for (_, v) in &mut m {
            *v += 1;
        }
        let got: BTreeMap<u64, u64> = (&m).into_iter().map(|(k, v)| (*k, *v - 1)).collect();
        let want: BTreeMap<u64, u64> = model.into_iter().map(|(k, v)| (k, v * 2)).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn clear_and_drop_release_payloads() {
        struct Tracked(Rc<Cell<usize>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }
        let drops = Rc::new(Cell::new(0));
        let mut m = identity_map(8);
        for k in 0..5u64 {
            m.insert(k, Tracked(drops.clone())).unwrap();
        }
        drop(m.remove(&0));
        assert_eq!(drops.get(), 1);
        m.clear();
        assert_eq!(drops.get(), 5);
        assert!(m.is_empty());
        m.insert(9, Tracked(drops.clone())).unwrap();
        drop(m);
        assert_eq!(drops.get(), 6);
    }

    #[test]
    #[should_panic(expected = "nonzero")]
    fn zero_rehash_panics() {
        let mut m = identity_map::<()>(8);
        let _ = m.rehash(0);
    }

    #[cfg(feature = "profile")]
    #[test]
    fn profile_counts_erases_and_probes() {
        let mut m = identity_map(4);
        for k in [1u64, 5, 9] {
            m.insert(k, ()).unwrap();
        }
        m.remove(&5);
        let p = m.profile();
        assert_eq!(p.num_erases, 1);
        assert!(p.max_probe >= 2);
        assert_eq!(p.hash_or & 1, 1);
    }
}
