//! Hashing helpers: the default hasher, an identity hasher and the
//! fibonacci hash-to-index mapping used by the open-addressing tables.

use core::hash::{BuildHasher, Hash, Hasher};

/// Default hasher for every table.
pub type DefaultHashBuilder = hashbrown::hash_map::DefaultHashBuilder;

/// 2^64 divided by the golden ratio.
pub(crate) const FIB_CONST: u64 = 11_400_714_819_323_198_485;

/// Map `hash` to a slot of a power-of-two `capacity` by fibonacci hashing.
///
/// Takes the top `log2(capacity)` bits of `hash * FIB_CONST`, which is
/// `>> (clz(capacity) + 1)` on a 64-bit word.
#[inline]
pub(crate) fn fibonacci_index(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    let shift = (capacity as u64).leading_zeros() + 1;
    hash.wrapping_mul(FIB_CONST).checked_shr(shift).unwrap_or(0) as usize
}

#[inline]
pub(crate) fn make_hash<Q, S>(hasher: &S, q: &Q) -> u64
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    hasher.hash_one(q)
}

/// Hasher that returns integer keys unchanged.
///
/// A single integer write hashes to itself. Further writes and byte writes
/// fold in FNV-1a style, so composite and string keys still spread.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher {
    state: u64,
}

impl IdentityHasher {
    #[inline]
    fn mix(&mut self, v: u64) {
        self.state = self.state.wrapping_mul(0x0100_0000_01b3) ^ v;
    }
}

impl Hasher for IdentityHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut h = if self.state == 0 {
            0xcbf2_9ce4_8422_2325
        } else {
            self.state
        };
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        self.state = h;
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.mix(i as u64);
    }
    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.mix(i as u64);
    }
    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.mix(i as u64);
    }
    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.mix(i);
    }
    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.mix(i as u64);
    }
    #[inline]
    fn write_i8(&mut self, i: i8) {
        self.mix(i as u64);
    }
    #[inline]
    fn write_i16(&mut self, i: i16) {
        self.mix(i as u64);
    }
    #[inline]
    fn write_i32(&mut self, i: i32) {
        self.mix(i as u64);
    }
    #[inline]
    fn write_i64(&mut self, i: i64) {
        self.mix(i as u64);
    }
    #[inline]
    fn write_isize(&mut self, i: isize) {
        self.mix(i as u64);
    }
}

/// [`BuildHasher`] for [`IdentityHasher`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildIdentityHasher;

impl BuildHasher for BuildIdentityHasher {
    type Hasher = IdentityHasher;

    #[inline]
    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher::default()
    }
}
