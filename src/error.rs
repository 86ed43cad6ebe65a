use thiserror::Error;

/// Errors reported by the allocator and its memory sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The memory source could not provide a region, even after growing.
  #[error("out of memory: no region of {requested} bytes available")]
  OutOfMemory { requested: usize },

  /// The request is zero, or its aligned or total size overflows `usize`.
  #[error("invalid allocation size: {requested} bytes")]
  InvalidSize { requested: usize },

  /// A search mode name that is not one of the four strategies.
  #[error("unknown search mode")]
  UnknownMode,
}

pub type Result<T, E = AllocError> = core::result::Result<T, E>;
