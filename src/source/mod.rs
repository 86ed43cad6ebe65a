//! Raw memory providers.
//!
//! The allocator never returns memory to a source: regions are carved once
//! and reused through block bookkeeping for the rest of the process.

use std::ptr::NonNull;

use crate::error::Result;

pub mod arena;
pub mod brk;

pub use arena::{DEFAULT_ARENA_SIZE, MmapArena};
pub use brk::BreakSource;

/// Supplies raw, non-overlapping memory regions on demand.
///
/// # Safety
///
/// A successful `request_region(size)` must return a pointer that is aligned
/// to the machine word size, valid for reads and writes of `size` bytes for
/// as long as the source lives, and disjoint from every region returned
/// before. The allocator writes headers into these bytes without further
/// checks.
pub unsafe trait MemorySource {
  /// Returns `size` fresh bytes. `size` must be at least one.
  fn request_region(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>>;
}
