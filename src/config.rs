use crate::{search::SearchMode, source::DEFAULT_ARENA_SIZE};

/// Settings for an [`Allocator`](crate::Allocator) backed by an mmap arena.
///
/// Every method is `const`, so a configured allocator can live in a
/// `static`:
///
/// ```rust
/// use fitalloc::{Allocator, Config, SearchMode};
///
/// static ALLOCATOR: Allocator = Allocator::with_config(
///     Config::new()
///         .with_mode(SearchMode::BestFit)
///         .with_arena_size(1 << 20),
/// );
///
/// let ptr = ALLOCATOR.allocate(24).unwrap();
/// unsafe { ALLOCATOR.free(ptr) };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  pub mode: SearchMode,
  pub arena_size: usize,
  pub window_limit: Option<usize>,
}

impl Default for Config {
  fn default() -> Self {
    Self::new()
  }
}

impl Config {
  /// First fit over unbounded [`DEFAULT_ARENA_SIZE`] windows.
  pub const fn new() -> Self {
    Self {
      mode: SearchMode::FirstFit,
      arena_size: DEFAULT_ARENA_SIZE,
      window_limit: None,
    }
  }

  pub const fn with_mode(
    mut self,
    mode: SearchMode,
  ) -> Self {
    self.mode = mode;
    self
  }

  /// Capacity of each arena window. Requests larger than this fail.
  pub const fn with_arena_size(
    mut self,
    arena_size: usize,
  ) -> Self {
    self.arena_size = arena_size;
    self
  }

  /// Maximum number of arena windows ever mapped.
  pub const fn with_window_limit(
    mut self,
    window_limit: usize,
  ) -> Self {
    self.window_limit = Some(window_limit);
    self
  }
}
