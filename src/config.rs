//! Per-instance sizing and growth configuration.

use crate::error::CapacityError;

/// Initial capacity and growth threshold for a hash table.
///
/// Each table type has a preset matching its growth policy. A capacity of
/// zero selects [`TableConfig::DEFAULT_CAPACITY`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TableConfig {
    pub capacity: usize,
    pub max_load_factor: f32,
}

impl TableConfig {
    pub const DEFAULT_CAPACITY: usize = 32;

    /// Robin-Hood map: grows at 85% occupancy.
    pub const fn robin_hood() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            max_load_factor: 0.85,
        }
    }

    /// Control-byte map: never grows on its own. The threshold is validated
    /// and reported by `max_load_factor()` but never triggers growth.
    pub const fn control_byte() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            max_load_factor: 1.0,
        }
    }

    /// Node map: grows once the load would exceed 0.8.
    pub const fn node_map() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            max_load_factor: 0.8,
        }
    }

    /// Node set: grows once the load would exceed 0.85.
    pub const fn node_set() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            max_load_factor: 0.85,
        }
    }

    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub const fn with_max_load_factor(mut self, max_load_factor: f32) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    /// Capacity with the zero-means-default rule applied.
    pub(crate) fn effective_capacity(&self) -> usize {
        if self.capacity == 0 {
            Self::DEFAULT_CAPACITY
        } else {
            self.capacity
        }
    }

    /// Panics on a load factor outside `(0, 1]`.
    pub(crate) fn validate_load_factor(&self) {
        assert!(
            self.max_load_factor > 0.0 && self.max_load_factor <= 1.0,
            "max_load_factor must be in (0, 1], got {}",
            self.max_load_factor
        );
    }

    /// Largest element count that stays at or below the load threshold.
    pub(crate) fn max_len_for(&self, capacity: usize) -> usize {
        (self.max_load_factor as f64 * capacity as f64) as usize
    }

    /// Smallest doubling of `capacity` whose threshold admits `len` elements.
    pub(crate) fn grown_capacity(&self, capacity: usize, len: usize) -> Result<usize, CapacityError> {
        let mut cap = capacity.max(1);
        loop {
            cap = cap.checked_mul(2).ok_or(CapacityError::Overflow)?;
            if self.max_len_for(cap) >= len {
                return Ok(cap);
            }
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::robin_hood()
    }
}
