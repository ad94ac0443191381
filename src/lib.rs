//! probe-containers: single-threaded generic hash tables and an ordered
//! tree, each tuned around one probing or linking strategy.
//!
//! Internal Design:
//!
//! Summary
//! - Containers:
//!   - RobinHoodMap<K, V, S>: open addressing with linear probing and
//!     Robin-Hood displacement; slots are chosen by fibonacci hashing and
//!     removal closes gaps by backward shifting, so no tombstones exist.
//!   - ControlByteMap<K, V, S>: open addressing over a parallel array of
//!     one-byte control tags, matched eight at a time with SWAR word
//!     operations. Fixed capacity; removal leaves tombstones that a later
//!     insert or an explicit rehash reclaims.
//!   - NodeMap<K, V, S> / NodeSet<T, S>: separate chaining with nodes held
//!     in a slotmap arena. Rehashing relinks nodes without moving them, so
//!     references and `Handle`s stay valid.
//!   - RedBlackTree<T, C>: ordered set of unique values under a
//!     `Comparator`, with parent-linked nodes in a slotmap arena.
//!
//! Constraints
//! - Single-threaded; no interior synchronisation.
//! - Unique keys: inserting a present key fails with
//!   `InsertError::DuplicateKey` and leaves the container unchanged. `set`
//!   is the overwrite path.
//! - Every hash entry stores its full `u64` hash. Growth and rehash reuse
//!   it and never call `K: Hash` again.
//! - Misuse of a documented precondition (non power-of-two capacity,
//!   zero bucket count, load factor outside `(0, 1]`) panics. Running out
//!   of room or memory is a `CapacityError`.
//!
//! Growth
//! - RobinHoodMap and NodeMap/NodeSet grow before an insert that would push
//!   `len / capacity` past their `TableConfig::max_load_factor` (0.85, 0.8
//!   and 0.85 by default), doubling until the threshold fits.
//! - ControlByteMap never grows; a full table reports
//!   `InsertError::TableFull`.
//!
//! Reentrancy policy
//! - Containers call into user code (`Hash`, `Eq`, comparators, visitors)
//!   while their structure may be mid-update. Each public method opens a
//!   debug-only `DebugReentrancy` section; nested entry into the same
//!   container panics in debug builds and costs nothing in release.
//!
//! Cleanup
//! - Keys and values are owned. Removal hands them back to the caller and
//!   `clear`/drop release the rest through `Drop`.
//!
//! Observability
//! - Growth logs at `debug`, explicit rehash at `trace` and a full
//!   ControlByteMap at `warn`, all through `tracing`.
//! - With the `profile` feature the chaining tables also record hash bit
//!   coverage, erase counts and the longest chain walk (`HashProfile`).

mod config;
mod control_byte_map;
mod error;
mod hash;
mod node_map;
mod node_set;
mod profile;
mod red_black_tree;
mod reentrancy;
mod robin_hood_map;
mod tables_proptest;

// Public surface
pub use config::TableConfig;
pub use control_byte_map::{control_tag, ControlByteMap, EMPTY, GROUP_WIDTH, TOMBSTONE};
pub use error::{CapacityError, InsertError};
pub use hash::{BuildIdentityHasher, DefaultHashBuilder, IdentityHasher};
pub use node_map::{BucketStats, Handle, NodeMap};
pub use node_set::NodeSet;
pub use red_black_tree::{Comparator, Natural, RedBlackTree};
pub use robin_hood_map::RobinHoodMap;

#[cfg(feature = "profile")]
pub use profile::HashProfile;

/// Iterator types.
pub mod iter {
    pub use crate::control_byte_map::{Iter as ControlByteIter, IterMut as ControlByteIterMut};
    pub use crate::node_map::{Iter as NodeIter, IterMut as NodeIterMut};
    pub use crate::node_set::Iter as NodeSetIter;
    pub use crate::red_black_tree::Iter as TreeIter;
    pub use crate::robin_hood_map::{Iter as RobinHoodIter, IterMut as RobinHoodIterMut};
}
