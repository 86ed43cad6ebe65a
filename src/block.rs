//! Block header layout and header/payload address translation.
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Header             │         Payload                │
//!   │  size | used | next   │     size bytes, word aligned   │
//!   └───────────────────────┴────────────────────────────────┘
//!   ▲                       ▲                                ▲
//!   Block::addr()           Block::payload()                 next header (same window)
//! ```
//!
//! All raw pointer dereferences of headers live in this module.

use std::{fmt, mem, ptr, ptr::NonNull};

use crate::{
  align::{WORD, align_up},
  error::{AllocError, Result},
};

#[repr(C)]
struct Header {
  size: usize,
  used: bool,
  next: *mut Header,
}

/// Bytes occupied by a header in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

const _: () = assert!(HEADER_SIZE % WORD == 0);
const _: () = assert!(mem::align_of::<Header>() <= WORD);

/// Constant byte cost of a block header.
pub const fn header_overhead() -> usize {
  HEADER_SIZE
}

/// Aligns a caller's request, rejecting zero and overflowing sizes.
pub fn aligned_size(requested: usize) -> Result<usize> {
  match align_up(requested) {
    Some(aligned) if aligned > 0 => Ok(aligned),
    _ => Err(AllocError::InvalidSize { requested }),
  }
}

/// Bytes to request from the memory source for a payload of `aligned` bytes.
pub fn total_region_size(aligned: usize) -> Result<usize> {
  aligned
    .checked_add(header_overhead())
    .ok_or(AllocError::InvalidSize { requested: aligned })
}

/// Handle to a block header living in allocator-owned memory.
///
/// A `Block` can only be built through the unsafe constructors, whose callers
/// promise the header is valid, word aligned and not accessed concurrently.
/// Every accessor relies on that promise. Header writes stay inside the
/// crate, so code holding a `Block` can only read it:
///
/// ```compile_fail
/// use fitalloc::{Heap, MmapArena, SearchMode};
///
/// let mut heap = Heap::new(MmapArena::new(), SearchMode::FirstFit);
/// let payload = heap.allocate(8).unwrap().payload();
/// let block = heap.chain().head().unwrap();
/// block.set_size(64);
/// # let _ = payload;
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Block(NonNull<Header>);

impl Block {
  /// Writes a fresh used header with no successor at `addr`.
  ///
  /// # Safety
  ///
  /// `addr` must be word aligned and valid for writes of
  /// `HEADER_SIZE + size` bytes that nothing else uses.
  pub unsafe fn init(
    addr: NonNull<u8>,
    size: usize,
  ) -> Self {
    let header = addr.cast::<Header>();
    unsafe {
      header.write(Header {
        size,
        used: true,
        next: ptr::null_mut(),
      });
    }
    Self(header)
  }

  /// Recovers the block owning a payload pointer.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Block::payload`] on a block that
  /// is still part of allocator-managed memory.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
    Self(unsafe { payload.sub(HEADER_SIZE) }.cast())
  }

  /// Address of the header.
  pub fn addr(self) -> usize {
    self.0.as_ptr() as usize
  }

  /// Start of the user payload, immediately after the header.
  pub fn payload(self) -> NonNull<u8> {
    unsafe { self.0.cast::<u8>().add(HEADER_SIZE) }
  }

  /// Address one past the end of the payload.
  pub fn end(self) -> usize {
    self.payload().as_ptr() as usize + self.size()
  }

  pub fn size(self) -> usize {
    unsafe { (*self.0.as_ptr()).size }
  }

  pub(crate) fn set_size(
    self,
    size: usize,
  ) {
    unsafe { (*self.0.as_ptr()).size = size }
  }

  pub fn is_used(self) -> bool {
    unsafe { (*self.0.as_ptr()).used }
  }

  pub(crate) fn set_used(
    self,
    used: bool,
  ) {
    unsafe { (*self.0.as_ptr()).used = used }
  }

  pub fn next(self) -> Option<Block> {
    NonNull::new(unsafe { (*self.0.as_ptr()).next }).map(Block)
  }

  pub(crate) fn set_next(
    self,
    next: Option<Block>,
  ) {
    let next = next.map_or(ptr::null_mut(), |block| block.0.as_ptr());
    unsafe { (*self.0.as_ptr()).next = next }
  }

  /// Writes a new free header at `payload + offset`, inside this block.
  ///
  /// # Safety
  ///
  /// `offset + HEADER_SIZE + size` must not exceed this block's size, and
  /// the bytes must not belong to a live payload.
  pub(crate) unsafe fn carve(
    self,
    offset: usize,
    size: usize,
  ) -> Block {
    let block = unsafe { Block::init(self.payload().add(offset), size) };
    block.set_used(false);
    block
  }

  /// Copies the header into a plain value.
  pub fn info(self) -> BlockInfo {
    BlockInfo {
      header: self.addr(),
      payload: self.payload().as_ptr() as usize,
      size: self.size(),
      used: self.is_used(),
      next: self.next().map(Block::addr),
    }
  }
}

impl fmt::Debug for Block {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_tuple("Block").field(&self.0).finish()
  }
}

/// Read-only snapshot of a block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub header: usize,
  pub payload: usize,
  pub size: usize,
  pub used: bool,
  pub next: Option<usize>,
}

impl fmt::Display for BlockInfo {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "header: {:#x}, payload: {:#x}, size: {}, used: {}",
      self.header, self.payload, self.size, self.used
    )
  }
}
