//! Hash-quality counters for the chaining tables.
//!
//! With the `profile` feature, tables keep a running OR and AND of every hash
//! they compute, the number of erases and the longest chain walk. A good hash
//! function drives `hash_or` toward all ones and `hash_and` toward zero; stuck
//! bits show up immediately. Without the feature every hook is a no-op.

#[cfg(feature = "profile")]
use core::cell::Cell;

#[derive(Debug)]
pub(crate) struct Profile {
    #[cfg(feature = "profile")]
    hash_or: Cell<u64>,
    #[cfg(feature = "profile")]
    hash_and: Cell<u64>,
    #[cfg(feature = "profile")]
    erases: Cell<usize>,
    #[cfg(feature = "profile")]
    max_probe: Cell<usize>,
}

impl Profile {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(feature = "profile")]
            hash_or: Cell::new(0),
            #[cfg(feature = "profile")]
            hash_and: Cell::new(u64::MAX),
            #[cfg(feature = "profile")]
            erases: Cell::new(0),
            #[cfg(feature = "profile")]
            max_probe: Cell::new(0),
        }
    }

    #[inline]
    pub(crate) fn hash(&self, _hash: u64) {
        #[cfg(feature = "profile")]
        {
            self.hash_or.set(self.hash_or.get() | _hash);
            self.hash_and.set(self.hash_and.get() & _hash);
        }
    }

    #[inline]
    pub(crate) fn probe(&self, _len: usize) {
        #[cfg(feature = "profile")]
        {
            if _len > self.max_probe.get() {
                self.max_probe.set(_len);
            }
        }
    }

    #[inline]
    pub(crate) fn erase(&self) {
        #[cfg(feature = "profile")]
        {
            self.erases.set(self.erases.get() + 1);
        }
    }

    #[cfg(feature = "profile")]
    pub(crate) fn snapshot(&self) -> HashProfile {
        HashProfile {
            hash_or: self.hash_or.get(),
            hash_and: self.hash_and.get(),
            num_erases: self.erases.get(),
            max_probe: self.max_probe.get(),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters collected since the table was created.
#[cfg(feature = "profile")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashProfile {
    pub hash_or: u64,
    pub hash_and: u64,
    pub num_erases: usize,
    pub max_probe: usize,
}
