//! Error types shared by every container.
//!
//! Missing keys are not errors; lookups and removals report them through
//! `Option`. Errors cover a rejected insert and failed growth.

use std::collections::TryReserveError;

use derive_more::{Display, Error, From, IsVariant};

/// Why a table could not change capacity.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error, From, IsVariant)]
pub enum CapacityError {
    #[display("capacity overflow")]
    Overflow,
    #[display("capacity {requested} cannot hold {len} elements")]
    TooSmall { requested: usize, len: usize },
    #[display("allocation failed: {_0}")]
    #[from]
    Alloc(#[error(source)] TryReserveError),
}

/// Why an insert left the container unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error, From, IsVariant)]
pub enum InsertError {
    #[display("key already present")]
    DuplicateKey,
    #[display("no empty or deleted slot left")]
    TableFull,
    #[display("growth failed: {_0}")]
    #[from]
    Capacity(#[error(source)] CapacityError),
}

/// Allocate `len` slots filled by `fill`, reporting allocator failure instead of aborting.
pub(crate) fn try_alloc_slots<T>(
    len: usize,
    mut fill: impl FnMut() -> T,
) -> Result<Box<[T]>, CapacityError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.extend(std::iter::repeat_with(&mut fill).take(len));
    Ok(v.into_boxed_slice())
}
