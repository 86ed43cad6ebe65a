use std::mem;

/// Machine word size in bytes. Every block size is a multiple of it.
pub const WORD: usize = mem::size_of::<usize>();

/// Rounds `value` up to the next multiple of the machine word size.
///
/// Returns `None` when the rounded value does not fit in a `usize`.
///
/// # Examples
///
/// ```rust
/// use fitalloc::align::align_up;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align_up(13), Some(16)), // 64 bit machine.
///     4 => assert_eq!(align_up(11), Some(12)), // 32 bit machine.
///     _ => {},
/// };
/// assert_eq!(align_up(usize::MAX), None);
/// ```
pub const fn align_up(value: usize) -> Option<usize> {
  match value.checked_add(WORD - 1) {
    Some(bumped) => Some(bumped & !(WORD - 1)),
    None => None,
  }
}

/// Whether `value` is a multiple of the machine word size.
pub const fn is_aligned(value: usize) -> bool {
  value & (WORD - 1) == 0
}
