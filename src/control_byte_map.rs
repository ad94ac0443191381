//! ControlByteMap: open addressing with a parallel array of one-byte
//! control tags, probed eight at a time.
//!
//! Each hash splits in two. H2, the low 7 bits, goes into the control byte
//! with the top bit set to mark the slot live. H1, the remaining bits, picks
//! the starting slot. Probing loads a whole group of control bytes into a
//! `u64` and matches tags with bit tricks, so the key and value slots are only
//! touched for real candidates.
//!
//! Control byte encodings:
//! - `0x80 | h2`: live
//! - `0x00`: empty, never used since the last rehash; ends a probe
//! - `0x7F`: tombstone, a removed entry; probes continue through it
//!
//! The table does not grow by itself. `insert` on a table with no empty or
//! tombstone slot fails with [`InsertError::TableFull`]; `rehash` resizes and
//! also purges tombstones.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;

use tracing::{trace, warn};

use crate::config::TableConfig;
use crate::error::{try_alloc_slots, CapacityError, InsertError};
use crate::hash::{fibonacci_index, make_hash, DefaultHashBuilder};
use crate::reentrancy::DebugReentrancy;

pub const EMPTY: u8 = 0x00;
pub const TOMBSTONE: u8 = 0x7F;
const LIVE_BIT: u8 = 0x80;

/// Control bytes scanned per probe step.
pub const GROUP_WIDTH: usize = 8;

const LO_BITS: u64 = 0x0101_0101_0101_0101;
const HI_BITS: u64 = 0x8080_8080_8080_8080;

/// Control byte stored for a live entry with this hash.
#[inline]
pub fn control_tag(hash: u64) -> u8 {
    (hash & 0x7F) as u8 | LIVE_BIT
}

#[inline]
fn start_slot(hash: u64, capacity: usize) -> usize {
    fibonacci_index(hash >> 7, capacity)
}

/// Eight control bytes, byte `i` in bits `8i..8i+8`.
#[derive(Copy, Clone)]
struct Group(u64);

impl Group {
    #[inline]
    fn load(ctrl: &[u8], pos: usize) -> Self {
        let mut buf = [0u8; GROUP_WIDTH];
        buf.copy_from_slice(&ctrl[pos..pos + GROUP_WIDTH]);
        Group(u64::from_le_bytes(buf))
    }

    /// Bytes equal to `b`. A byte right above a true match may also be
    /// flagged, so candidates must be rechecked; the lowest flag is exact.
    #[inline]
    fn match_byte(self, b: u8) -> BitMask {
        let x = self.0 ^ (LO_BITS * b as u64);
        BitMask(x.wrapping_sub(LO_BITS) & !x & HI_BITS)
    }

    #[inline]
    fn match_empty(self) -> BitMask {
        self.match_byte(EMPTY)
    }

    /// Empty or tombstone: the live bit is clear.
    #[inline]
    fn match_vacant(self) -> BitMask {
        BitMask(!self.0 & HI_BITS)
    }
}

/// Set of byte offsets within a group, one flag bit per byte.
struct BitMask(u64);

impl BitMask {
    #[inline]
    fn any(&self) -> bool {
        self.0 != 0
    }

    #[inline]
    fn lowest(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize / 8)
        }
    }
}

impl Iterator for BitMask {
    type Item = usize;
    #[inline]
    fn next(&mut self) -> Option<usize> {
        let bit = self.lowest()?;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

struct Bucket<K, V> {
    key: K,
    value: V,
    hash: u64,
}

/// Control bytes and slots. `ctrl` carries `GROUP_WIDTH` extra bytes that
/// mirror the first group, so a group load never wraps.
struct RawTable<K, V> {
    ctrl: Box<[u8]>,
    slots: Box<[Option<Bucket<K, V>>]>,
    len: usize,
    tombstones: usize,
}

impl<K, V> RawTable<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            ctrl: vec![EMPTY; capacity + GROUP_WIDTH].into_boxed_slice(),
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
            tombstones: 0,
        }
    }

    fn try_new(capacity: usize) -> Result<Self, CapacityError> {
        let ctrl_len = capacity
            .checked_add(GROUP_WIDTH)
            .ok_or(CapacityError::Overflow)?;
        Ok(Self {
            ctrl: try_alloc_slots(ctrl_len, || EMPTY)?,
            slots: try_alloc_slots(capacity, || None)?,
            len: 0,
            tombstones: 0,
        })
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn set_ctrl(&mut self, idx: usize, byte: u8) {
        self.ctrl[idx] = byte;
        if idx < GROUP_WIDTH {
            let cap = self.capacity();
            self.ctrl[cap + idx] = byte;
        }
    }

    fn find<Q>(&self, hash: u64, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        if self.len == 0 {
            return None;
        }
        let cap = self.capacity();
        let mask = cap - 1;
        let tag = control_tag(hash);
        let mut pos = start_slot(hash, cap);
        for _ in 0..cap / GROUP_WIDTH {
            let group = Group::load(&self.ctrl, pos);
            for bit in group.match_byte(tag) {
                let idx = (pos + bit) & mask;
                if self.ctrl[idx] != tag {
                    continue;
                }
                if let Some(b) = &self.slots[idx] {
                    if b.hash == hash && b.key.borrow() == q {
                        return Some(idx);
                    }
                }
            }
            if group.match_empty().any() {
                return None;
            }
            pos = (pos + GROUP_WIDTH) & mask;
        }
        None
    }

    /// First empty or tombstone slot on the probe path of `hash`.
    fn find_vacant(&self, hash: u64) -> Option<usize> {
        let cap = self.capacity();
        let mask = cap - 1;
        let mut pos = start_slot(hash, cap);
        for _ in 0..cap / GROUP_WIDTH {
            if let Some(bit) = Group::load(&self.ctrl, pos).match_vacant().lowest() {
                return Some((pos + bit) & mask);
            }
            pos = (pos + GROUP_WIDTH) & mask;
        }
        None
    }

    /// Claim a vacant slot for an absent key.
    fn claim(&mut self, bucket: Bucket<K, V>) -> Result<usize, Bucket<K, V>> {
        let Some(idx) = self.find_vacant(bucket.hash) else {
            return Err(bucket);
        };
        if self.ctrl[idx] == TOMBSTONE {
            self.tombstones -= 1;
        }
        self.set_ctrl(idx, control_tag(bucket.hash));
        self.slots[idx] = Some(bucket);
        self.len += 1;
        Ok(idx)
    }

    fn insert_new(&mut self, bucket: Bucket<K, V>) -> Result<(), InsertError> {
        match self.claim(bucket) {
            Ok(_) => Ok(()),
            Err(_rejected) => {
                warn!(
                    capacity = self.capacity(),
                    tombstones = self.tombstones,
                    "control-byte map full"
                );
                Err(InsertError::TableFull)
            }
        }
    }

    fn remove_at(&mut self, idx: usize) -> Option<Bucket<K, V>> {
        let bucket = self.slots[idx].take()?;
        self.set_ctrl(idx, TOMBSTONE);
        self.tombstones += 1;
        self.len -= 1;
        Some(bucket)
    }

    fn clear(&mut self) {
        self.ctrl.fill(EMPTY);
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.len = 0;
        self.tombstones = 0;
    }
}

/// Fixed-capacity open-addressing map probed through control bytes.
pub struct ControlByteMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    table: RawTable<K, V>,
    config: TableConfig,
    reentrancy: DebugReentrancy,
}

impl<K, V> ControlByteMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_config(TableConfig::control_byte(), Default::default())
    }

    /// # Panics
    /// If `capacity` is nonzero and not a power of two of at least
    /// [`GROUP_WIDTH`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(
            TableConfig::control_byte().with_capacity(capacity),
            Default::default(),
        )
    }
}

impl<K, V> Default for ControlByteMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

fn assert_valid_capacity(capacity: usize) {
    assert!(
        capacity.is_power_of_two() && capacity >= GROUP_WIDTH,
        "ControlByteMap capacity must be a power of two of at least {GROUP_WIDTH}, got {capacity}"
    );
}

impl<K, V, S> ControlByteMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config(TableConfig::control_byte(), hasher)
    }

    /// The table never grows on its own; `max_load_factor` is kept for
    /// [`ControlByteMap::max_load_factor`] only.
    ///
    /// # Panics
    /// If the capacity is nonzero and not a power of two of at least
    /// [`GROUP_WIDTH`], or the load factor is outside `(0, 1]`.
    pub fn with_config(config: TableConfig, hasher: S) -> Self {
        let capacity = config.effective_capacity();
        assert_valid_capacity(capacity);
        config.validate_load_factor();
        Self {
            hasher,
            table: RawTable::new(capacity),
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
    /// Slots holding a tombstone, reclaimable by insert or rehash.
    pub fn tombstones(&self) -> usize {
        self.table.tombstones
    }
    pub fn load_factor(&self) -> f32 {
        self.table.len as f32 / self.table.capacity() as f32
    }
    pub fn max_load_factor(&self) -> f32 {
        self.config.max_load_factor
    }

    pub fn find<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        let idx = self.table.find(hash, q)?;
        self.table.slots[idx].as_ref().map(|b| &b.value)
    }

    pub fn find_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        let idx = self.table.find(hash, q)?;
        self.table.slots[idx].as_mut().map(|b| &mut b.value)
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

    pub fn get<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.find(q).cloned()
    }

    /// Control byte of the slot holding `q`.
    pub fn control_byte<Q>(&self, q: &Q) -> Option<u8>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        self.table.find(hash, q).map(|idx| self.table.ctrl[idx])
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<(), InsertError> {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, &key);
        if self.table.find(hash, &key).is_some() {
            return Err(InsertError::DuplicateKey);
        }
        self.table.insert_new(Bucket { key, value, hash })
    }

    /// Insert or overwrite; returns the previous value.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>, InsertError> {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, &key);
        if let Some(idx) = self.table.find(hash, &key) {
            if let Some(b) = self.table.slots[idx].as_mut() {
                return Ok(Some(mem::replace(&mut b.value, value)));
            }
        }
        self.table
            .insert_new(Bucket { key, value, hash })
            .map(|()| None)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = make_hash(&self.hasher, q);
        let idx = self.table.find(hash, q)?;
        let b = self.table.remove_at(idx)?;
        Some((b.key, b.value))
    }

    /// Rebuild into `new_capacity` slots, dropping all tombstones.
    ///
    /// # Panics
    /// If `new_capacity` is not a power of two of at least [`GROUP_WIDTH`].
    pub fn rehash(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        let _g = self.reentrancy.enter();
        assert_valid_capacity(new_capacity);
        if new_capacity < self.table.len {
            return Err(CapacityError::TooSmall {
                requested: new_capacity,
                len: self.table.len,
            });
        }
        trace!(
            old_capacity = self.table.capacity(),
            new_capacity,
            len = self.table.len,
            tombstones = self.table.tombstones,
            "control-byte map rehash"
        );
        let old = mem::replace(&mut self.table, RawTable::try_new(new_capacity)?);
        for bucket in old.slots.into_vec().into_iter().flatten() {
            // Capacity was checked against len, so a vacant slot always exists.
            if self.table.claim(bucket).is_err() {
                unreachable!("rehash target ran out of slots");
            }
        }
        self.config = self.config.with_capacity(new_capacity);
        Ok(())
    }

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

    /// Check control bytes against slot contents and counters.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let cap = self.table.capacity();
        let (mut live, mut dead) = (0, 0);
        for (i, slot) in self.table.slots.iter().enumerate() {
            let c = self.table.ctrl[i];
            match slot {
                Some(b) => {
                    assert_eq!(c, control_tag(b.hash), "slot {i} tag mismatch");
                    live += 1;
                }
                None => {
                    assert!(c == EMPTY || c == TOMBSTONE, "slot {i} live byte on empty slot");
                    if c == TOMBSTONE {
                        dead += 1;
                    }
                }
            }
        }
        for i in 0..GROUP_WIDTH {
            assert_eq!(self.table.ctrl[cap + i], self.table.ctrl[i], "mirror byte {i}");
        }
        assert_eq!(live, self.table.len);
        assert_eq!(dead, self.table.tombstones);
    }
}

impl<K, V, S> fmt::Debug for ControlByteMap<K, V, S>
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
                    .map(|b| (&b.key, &b.value)),
            )
            .finish()
    }
}

impl<'a, K, V, S> IntoIterator for &'a ControlByteMap<K, V, S>
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

impl<'a, K, V, S> IntoIterator for &'a mut ControlByteMap<K, V, S>
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

/// Iterator over `(&K, &V)` in slot order.
pub struct Iter<'a, K, V> {
    it: core::slice::Iter<'a, Option<Bucket<K, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.by_ref().flatten().next().map(|b| (&b.key, &b.value))
    }
}

/// Iterator over `(&K, &mut V)` in slot order.
pub struct IterMut<'a, K, V> {
    it: core::slice::IterMut<'a, Option<Bucket<K, V>>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .by_ref()
            .flatten()
            .next()
            .map(|b| (&b.key, &mut b.value))
    }
}
