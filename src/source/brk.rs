//! Legacy memory source that grows the program break with `sbrk(2)`.
//!
//! ```text
//!   High Address ┌─────────────────────┐
//!                │       Stack         │ ↓ grows down
//!                │         ▲           │
//!                │         │           │
//!                │       Heap          │ ↑ grows up (sbrk)
//!                ├─────────────────────┤ ← Program Break
//!                │        Data         │
//!   Low Address  └─────────────────────┘
//! ```
//!
//! The break is shared with anything else in the process that calls `sbrk`
//! or `brk`, the platform allocator included, so consecutive regions are not
//! guaranteed to be adjacent.

use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};
use log::{debug, warn};

use super::MemorySource;
use crate::{
  align::{WORD, align_up},
  error::{AllocError, Result},
};

fn failed(addr: *mut c_void) -> bool {
  addr == usize::MAX as *mut c_void
}

/// Memory source backed by the process break.
pub struct BreakSource {
  start: Option<NonNull<u8>>,
  end: Option<NonNull<u8>>,
}

// The break is process-wide; the source only remembers where it moved it.
unsafe impl Send for BreakSource {}

impl Default for BreakSource {
  fn default() -> Self {
    Self::new()
  }
}

impl BreakSource {
  pub const fn new() -> Self {
    Self {
      start: None,
      end: None,
    }
  }

  /// Current program break, as reported by `sbrk(0)`.
  pub fn current_break(&self) -> *mut u8 {
    unsafe { sbrk(0) }.cast()
  }

  /// Moves the break back to where it was before the first region, but only
  /// if nothing else has moved it since this source last did. Returns whether
  /// the break was rolled back.
  ///
  /// Meant for isolating test scenarios, not for releasing memory.
  ///
  /// # Safety
  ///
  /// Every region handed out by this source becomes invalid. No other thread
  /// may move the break concurrently.
  pub unsafe fn rollback(&mut self) -> bool {
    let (Some(start), Some(end)) = (self.start, self.end) else {
      return false;
    };
    if self.current_break() != end.as_ptr() {
      warn!("program break moved by someone else, not rolling back");
      return false;
    }

    let decrement = start.as_ptr() as isize - end.as_ptr() as isize;
    if failed(unsafe { sbrk(decrement as intptr_t) }) {
      return false;
    }
    debug!("rolled the program break back to {start:p}");

    self.start = None;
    self.end = None;
    true
  }
}

unsafe impl MemorySource for BreakSource {
  fn request_region(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    let size = match align_up(size) {
      Some(aligned) if aligned > 0 => aligned,
      _ => return Err(AllocError::InvalidSize { requested: size }),
    };

    // The break may move between calls, so reserve room to align any start.
    let increment = size
      .checked_add(WORD - 1)
      .filter(|&increment| increment <= isize::MAX as usize)
      .ok_or(AllocError::InvalidSize { requested: size })?;

    let previous = unsafe { sbrk(increment as intptr_t) };
    if failed(previous) {
      warn!("sbrk({increment}) failed");
      return Err(AllocError::OutOfMemory { requested: size });
    }

    let previous = previous.cast::<u8>();
    let padding = align_up(previous.addr())
      .map(|aligned| aligned - previous.addr())
      .ok_or(AllocError::OutOfMemory { requested: size })?;
    let region = NonNull::new(unsafe { previous.add(padding) })
      .ok_or(AllocError::OutOfMemory { requested: size })?;
    let end = unsafe { previous.add(increment) };

    if self.start.is_none() {
      self.start = NonNull::new(previous);
    }
    self.end = NonNull::new(end);

    debug!(
      "sbrk({increment}): region = {region:p}, program break = {:?}",
      self.current_break()
    );
    Ok(region)
  }
}
