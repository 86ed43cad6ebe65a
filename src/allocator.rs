//! Thread-safe allocator facade.

use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
};

use log::{debug, trace};
use parking_lot::{Mutex, const_mutex};

use crate::{
  align::WORD,
  block::{Block, BlockInfo},
  bucket::SizeClass,
  config::Config,
  error::Result,
  heap::Heap,
  search::SearchMode,
  source::{MemorySource, MmapArena},
};

/// A heap allocator serialized by one lock.
///
/// The lock is held for the whole of every `allocate` and `free`, calls into
/// the memory source included. It is not reentrant: callbacks passed to the
/// inspection methods, and the installed logger, must not allocate from the
/// same allocator.
///
/// ```rust
/// use fitalloc::Allocator;
///
/// let allocator = Allocator::new();
///
/// let ptr = allocator.allocate(3).unwrap();
/// unsafe {
///     ptr.as_ptr().write(42);
///     assert_eq!(allocator.block_info(ptr).size, std::mem::size_of::<usize>());
///     allocator.free(ptr);
/// }
/// ```
pub struct Allocator<S = MmapArena> {
  heap: Mutex<Heap<S>>,
}

impl Default for Allocator<MmapArena> {
  fn default() -> Self {
    Self::new()
  }
}

impl Allocator<MmapArena> {
  /// First fit over a lazily mapped arena of default-sized windows.
  pub const fn new() -> Self {
    Self::with_config(Config::new())
  }

  pub const fn with_config(config: Config) -> Self {
    let mut arena = MmapArena::with_capacity(config.arena_size);
    if let Some(limit) = config.window_limit {
      arena = arena.with_window_limit(limit);
    }
    Self::with_source(arena, config.mode)
  }
}

impl<S> Allocator<S> {
  pub const fn with_source(
    source: S,
    mode: SearchMode,
  ) -> Self {
    Self {
      heap: const_mutex(Heap::new(source, mode)),
    }
  }

  /// Strategy used by allocations right now.
  pub fn mode(&self) -> SearchMode {
    self.heap.lock().mode()
  }

  /// Selects the strategy that takes effect at the next [`reset`](Self::reset).
  pub fn select_mode(
    &self,
    mode: SearchMode,
  ) {
    self.heap.lock().select_mode(mode);
  }

  /// Drops all bookkeeping without reclaiming memory. Pointers allocated
  /// before the reset must not be freed afterwards.
  ///
  /// Meant for isolating test scenarios.
  pub fn reset(&self) {
    self.heap.lock().reset();
  }

  /// [`select_mode`](Self::select_mode) followed by [`reset`](Self::reset),
  /// under one lock.
  pub fn reset_with(
    &self,
    mode: SearchMode,
  ) {
    let mut heap = self.heap.lock();
    heap.select_mode(mode);
    heap.reset();
  }

  /// Snapshot of the header in front of `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must come from [`allocate`](Self::allocate) on this allocator
  /// after the last reset. It may have been freed since.
  pub unsafe fn block_info(
    &self,
    payload: NonNull<u8>,
  ) -> BlockInfo {
    let _heap = self.heap.lock();
    unsafe { Block::from_payload(payload) }.info()
  }

  /// Visits every block of the shared chain in address order.
  pub fn for_each_block(
    &self,
    mut f: impl FnMut(BlockInfo),
  ) {
    let heap = self.heap.lock();
    heap.chain().iter().for_each(|block| f(block.info()));
  }

  /// Visits every block of the size class `size` maps to.
  pub fn for_each_bucket_block(
    &self,
    size: usize,
    mut f: impl FnMut(BlockInfo),
  ) {
    let heap = self.heap.lock();
    let bucket = heap.buckets().get(SizeClass::of(size));
    bucket.chain().iter().for_each(|block| f(block.info()));
  }

  /// Logs every block, the shared chain first and then each size class.
  pub fn dump(&self) {
    let heap = self.heap.lock();
    debug!("heap ({}):", heap.mode());
    for (index, block) in heap.chain().iter().enumerate() {
      debug!("  block {index}: {}", block.info());
    }
    for class in SizeClass::all() {
      for (index, block) in heap.buckets().get(class).chain().iter().enumerate() {
        debug!("  class {class}, block {index}: {}", block.info());
      }
    }
  }
}

impl<S: MemorySource> Allocator<S> {
  /// Returns a word-aligned pointer to at least `size` usable bytes.
  pub fn allocate(
    &self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    let (allocation, info) = {
      let mut heap = self.heap.lock();
      let allocation = heap.allocate(size)?;
      (allocation, allocation.info())
    };

    trace!(
      "allocate({size}): {} block of {} bytes, payload = {:#x}",
      if allocation.reused { "reused" } else { "fresh" },
      info.size,
      info.payload,
    );
    Ok(allocation.payload())
  }

  /// Releases a pointer returned by [`allocate`](Self::allocate).
  ///
  /// # Safety
  ///
  /// `payload` must come from `allocate` on this allocator, after the last
  /// reset, and must not have been freed already. Violations are not
  /// detected.
  pub unsafe fn free(
    &self,
    payload: NonNull<u8>,
  ) {
    unsafe { self.heap.lock().free(payload) };
    trace!("free({payload:p})");
  }
}

unsafe impl<S: MemorySource + Send> GlobalAlloc for Allocator<S> {
  /// Payloads are only word aligned; stricter layouts get a null pointer.
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > WORD {
      return ptr::null_mut();
    }
    self
      .allocate(layout.size())
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    if let Some(payload) = NonNull::new(ptr) {
      unsafe { self.free(payload) };
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, thread};

  use super::*;
  use crate::{block::header_overhead, error::AllocError};

  fn allocator(mode: SearchMode) -> Allocator {
    Allocator::with_config(Config::new().with_mode(mode).with_arena_size(64 * 1024))
  }

  #[test]
  fn test_alloc() {
    let allocator = allocator(SearchMode::FirstFit);

    unsafe {
      let first_addr = allocator.allocate(8).unwrap().cast::<u64>();
      first_addr.write(3);
      assert_eq!(first_addr.read(), 3);

      let size: usize = 6;
      let second_addr = allocator.allocate(size * 2).unwrap().cast::<u16>();
      for i in 0..size {
        second_addr.add(i).write((i + 1) as u16);
      }

      assert_eq!(first_addr.read(), 3);
      for i in 0..size {
        assert_eq!((i + 1) as u16, second_addr.add(i).read());
      }

      allocator.free(first_addr.cast());

      let third_addr = allocator.allocate(4).unwrap();
      assert_eq!(first_addr.cast::<u8>(), third_addr);

      allocator.free(third_addr);
      allocator.free(second_addr.cast());
    }
  }

  #[test]
  fn test_block_info_and_walk() {
    let allocator = allocator(SearchMode::FirstFit);
    let first = allocator.allocate(3).unwrap();
    let second = allocator.allocate(8).unwrap();

    let info = unsafe { allocator.block_info(first) };
    assert_eq!(info.size, WORD);
    assert!(info.used);
    assert_eq!(info.payload, first.as_ptr() as usize);
    assert_eq!(info.header + header_overhead(), info.payload);

    let second_info = unsafe { allocator.block_info(second) };
    assert_eq!(info.next, Some(second_info.header));

    unsafe { allocator.free(second) };
    assert!(!unsafe { allocator.block_info(second) }.used);

    let mut seen = Vec::new();
    allocator.for_each_block(|info| seen.push(info));
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], unsafe { allocator.block_info(first) });
    assert!(!seen[1].used);

    allocator.dump();
  }

  #[test]
  fn test_reset_with_mode() {
    let allocator = allocator(SearchMode::FirstFit);
    allocator.allocate(8).unwrap();

    allocator.select_mode(SearchMode::Segregated);
    assert_eq!(allocator.mode(), SearchMode::FirstFit);
    allocator.reset();
    assert_eq!(allocator.mode(), SearchMode::Segregated);

    let mut count = 0;
    allocator.for_each_block(|_| count += 1);
    assert_eq!(count, 0);

    let small = allocator.allocate(8).unwrap();
    allocator.allocate(16).unwrap();
    unsafe { allocator.free(small) };
    assert_eq!(allocator.allocate(8).unwrap(), small);

    let mut eights = Vec::new();
    allocator.for_each_bucket_block(8, |info| eights.push(info.payload));
    assert_eq!(eights, vec![small.as_ptr() as usize]);

    allocator.reset_with(SearchMode::BestFit);
    assert_eq!(allocator.mode(), SearchMode::BestFit);
  }

  #[test]
  fn test_errors() {
    let allocator = Allocator::with_config(Config::new().with_arena_size(4096).with_window_limit(1));

    assert_eq!(
      allocator.allocate(0),
      Err(AllocError::InvalidSize { requested: 0 })
    );
    assert!(matches!(
      allocator.allocate(usize::MAX),
      Err(AllocError::InvalidSize { .. })
    ));
    assert!(matches!(
      allocator.allocate(4096),
      Err(AllocError::OutOfMemory { .. })
    ));
  }

  #[test]
  fn test_global_alloc() {
    let allocator = allocator(SearchMode::BestFit);

    unsafe {
      let layout = Layout::new::<[u64; 4]>();
      let ptr = allocator.alloc(layout);
      assert!(!ptr.is_null());
      assert_eq!(ptr as usize % layout.align(), 0);
      ptr.cast::<[u64; 4]>().write([1, 2, 3, 4]);
      assert_eq!(ptr.cast::<[u64; 4]>().read(), [1, 2, 3, 4]);
      allocator.dealloc(ptr, layout);

      let overaligned = Layout::from_size_align(64, 4096).unwrap();
      assert!(allocator.alloc(overaligned).is_null());

      let zeroed = allocator.alloc_zeroed(Layout::new::<[u8; 40]>());
      assert!(std::slice::from_raw_parts(zeroed, 40).iter().all(|&b| b == 0));
      allocator.dealloc(zeroed, Layout::new::<[u8; 40]>());
    }
  }

  #[test]
  fn test_concurrent_allocations() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 200;

    for mode in SearchMode::ALL {
      let allocator = Arc::new(allocator(mode));

      let handles: Vec<_> = (0..THREADS)
        .map(|id| {
          let allocator = Arc::clone(&allocator);
          thread::spawn(move || {
            let tag = id as u8 + 1;
            let mut held = Vec::new();
            for round in 0..ROUNDS {
              let size = 8 + (round * 7 + id * 13) % 120;
              let ptr = allocator.allocate(size).unwrap();
              unsafe { ptr::write_bytes(ptr.as_ptr(), tag, size) };
              held.push((ptr.as_ptr() as usize, size));

              if round % 3 == 2 {
                let (addr, size) = held.remove(0);
                let bytes = unsafe { std::slice::from_raw_parts(addr as *const u8, size) };
                assert!(bytes.iter().all(|&b| b == tag));
                unsafe { allocator.free(NonNull::new(addr as *mut u8).unwrap()) };
              }
            }
            for (addr, size) in held {
              let bytes = unsafe { std::slice::from_raw_parts(addr as *const u8, size) };
              assert!(bytes.iter().all(|&b| b == tag));
              unsafe { allocator.free(NonNull::new(addr as *mut u8).unwrap()) };
            }
          })
        })
        .collect();

      for handle in handles {
        handle.join().unwrap();
      }
    }
  }
}
