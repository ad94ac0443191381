//! Debug-only reentrancy guard.
//!
//! Every container calls into user code while its internals may be
//! mid-update: `Hash`/`Eq` while probing, the comparator while descending,
//! visitors while walking. Nothing stops that code from reaching back into
//! the same container through a raw pointer. In debug builds the guard turns
//! that into a panic. In release builds it is a zero-sized no-op.

#[cfg(debug_assertions)]
use core::cell::Cell;
#[cfg(not(debug_assertions))]
use core::marker::PhantomData;

/// Per-container nesting counter. Public entry points open a section with
/// `let _g = self.reentrancy.enter();`.
#[derive(Debug, Default)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
        }
    }

    /// Open a guarded section.
    ///
    /// # Panics
    /// In debug builds, if a section of the same container is already open.
    #[inline]
    pub fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let d = self.depth.get();
            assert!(d == 0, "reentrant call into container during an operation");
            self.depth.set(d + 1);
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard { _z: PhantomData }
        }
    }
}

impl Clone for DebugReentrancy {
    // A cloned container starts outside any section.
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Closes the section on drop.
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let d = self.owner.depth.get();
            debug_assert!(d > 0);
            self.owner.depth.set(d - 1);
        }
    }
}
