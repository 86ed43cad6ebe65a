//! Bump-pointer arena over anonymous memory mappings.
//!
//! ```text
//!   window 1 (capacity bytes)                window 2 (mapped on exhaustion)
//!   ┌─────┬─────┬─────┬──────────────┐       ┌─────┬──────────────────────┐
//!   │ R1  │ R2  │ R3  │  abandoned   │       │ R4  │       free           │
//!   └─────┴─────┴─────┴──────────────┘       └─────┴──────────────────────┘
//!                                                  ▲
//!                                                  bump cursor
//! ```
//!
//! Windows are not contiguous with each other; a region never spans two.

use std::ptr::{self, NonNull};

use log::{debug, warn};

use super::MemorySource;
use crate::{
  align::align_up,
  error::{AllocError, Result},
};

/// Capacity of one arena window: 4 MiB.
pub const DEFAULT_ARENA_SIZE: usize = 4 * 1024 * 1024;

struct Window {
  base: NonNull<u8>,
  used: usize,
  capacity: usize,
}

impl Window {
  fn map(capacity: usize) -> Result<Self> {
    let addr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        capacity,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if addr == libc::MAP_FAILED {
      warn!("mmap of a {capacity} byte arena window failed");
      return Err(AllocError::OutOfMemory {
        requested: capacity,
      });
    }

    let base = NonNull::new(addr.cast::<u8>()).ok_or(AllocError::OutOfMemory {
      requested: capacity,
    })?;
    debug!("mapped arena window at {base:p}, capacity = {capacity}");

    Ok(Self {
      base,
      used: 0,
      capacity,
    })
  }

  fn remaining(&self) -> usize {
    self.capacity - self.used
  }

  fn bump(
    &mut self,
    size: usize,
  ) -> NonNull<u8> {
    let region = unsafe { self.base.add(self.used) };
    self.used += size;
    region
  }
}

/// Memory source handing out regions from fixed-size mmap windows.
///
/// When a request does not fit in the current window a new window of the
/// same capacity is mapped and the old tail is abandoned.
pub struct MmapArena {
  capacity: usize,
  window_limit: Option<usize>,
  windows_mapped: usize,
  window: Option<Window>,
}

// The arena exclusively owns its mappings.
unsafe impl Send for MmapArena {}

impl Default for MmapArena {
  fn default() -> Self {
    Self::new()
  }
}

impl MmapArena {
  /// An arena with [`DEFAULT_ARENA_SIZE`] windows. Nothing is mapped until
  /// the first request.
  pub const fn new() -> Self {
    Self::with_capacity(DEFAULT_ARENA_SIZE)
  }

  pub const fn with_capacity(capacity: usize) -> Self {
    Self {
      capacity,
      window_limit: None,
      windows_mapped: 0,
      window: None,
    }
  }

  /// Caps the number of windows ever mapped. Requests past the cap fail with
  /// [`AllocError::OutOfMemory`].
  pub const fn with_window_limit(
    mut self,
    limit: usize,
  ) -> Self {
    self.window_limit = Some(limit);
    self
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn windows_mapped(&self) -> usize {
    self.windows_mapped
  }
}

unsafe impl MemorySource for MmapArena {
  fn request_region(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    let size = match align_up(size) {
      Some(aligned) if aligned > 0 => aligned,
      _ => return Err(AllocError::InvalidSize { requested: size }),
    };
    if size > self.capacity {
      warn!(
        "request of {size} bytes exceeds the arena capacity of {}",
        self.capacity
      );
      return Err(AllocError::OutOfMemory { requested: size });
    }

    if let Some(window) = self.window.as_mut() {
      if window.remaining() >= size {
        return Ok(window.bump(size));
      }
      debug!(
        "abandoning {} bytes at the tail of window {:p}",
        window.remaining(),
        window.base
      );
    }

    if self
      .window_limit
      .is_some_and(|limit| self.windows_mapped >= limit)
    {
      warn!("arena exhausted after {} windows", self.windows_mapped);
      return Err(AllocError::OutOfMemory { requested: size });
    }

    let window = self.window.insert(Window::map(self.capacity)?);
    self.windows_mapped += 1;

    Ok(window.bump(size))
  }
}
