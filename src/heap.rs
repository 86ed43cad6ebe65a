//! Allocator state and the allocate/free algorithms, without locking.

use std::ptr::NonNull;

use log::debug;

use crate::{
  block::{Block, BlockInfo, aligned_size, total_region_size},
  bucket::{Buckets, SizeClass},
  chain::Chain,
  error::Result,
  search::{self, Cursors, SearchMode},
  source::MemorySource,
  split,
};

/// Outcome of a successful allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
  pub(crate) block: Block,
  /// `true` when an existing free block was reused, `false` when the block
  /// was carved from fresh memory.
  pub reused: bool,
}

impl Allocation {
  pub fn payload(&self) -> NonNull<u8> {
    self.block.payload()
  }

  /// Header snapshot taken right after the allocation.
  pub fn info(&self) -> BlockInfo {
    self.block.info()
  }
}

/// Every piece of allocator bookkeeping, owned in one place.
///
/// A `Heap` is not synchronized; [`Allocator`](crate::Allocator) wraps it in
/// a lock. Using it directly is fine from a single thread.
pub struct Heap<S> {
  source: S,
  mode: SearchMode,
  pending_mode: SearchMode,
  chain: Chain,
  cursors: Cursors,
  buckets: Buckets,
}

// Blocks point into memory owned by the source, which moves with the heap.
unsafe impl<S: Send> Send for Heap<S> {}

impl<S> Heap<S> {
  pub const fn new(
    source: S,
    mode: SearchMode,
  ) -> Self {
    Self {
      source,
      mode,
      pending_mode: mode,
      chain: Chain::new(),
      cursors: Cursors::new(),
      buckets: Buckets::new(),
    }
  }

  /// Strategy used by allocations right now.
  pub fn mode(&self) -> SearchMode {
    self.mode
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Chain used by first, next and best fit.
  pub fn chain(&self) -> &Chain {
    &self.chain
  }

  pub fn cursors(&self) -> &Cursors {
    &self.cursors
  }

  pub fn buckets(&self) -> &Buckets {
    &self.buckets
  }

  /// Records the strategy to use after the next [`reset`](Self::reset).
  ///
  /// Strategies keep incompatible bookkeeping, so switching in place is not
  /// supported.
  pub fn select_mode(
    &mut self,
    mode: SearchMode,
  ) {
    self.pending_mode = mode;
  }

  /// Forgets every block and cursor and activates the selected strategy.
  ///
  /// Memory already carved is not reclaimed and will never be handed out
  /// again. Blocks allocated before the reset must not be freed after it.
  /// Intended for isolating test scenarios.
  pub fn reset(&mut self) {
    debug!("heap reset: {} -> {}", self.mode, self.pending_mode);
    self.mode = self.pending_mode;
    self.chain.clear();
    self.cursors = Cursors::new();
    self.buckets.clear();
  }

  fn find_free(
    &mut self,
    size: usize,
  ) -> Option<Block> {
    match self.mode {
      SearchMode::FirstFit => search::first_fit(&self.chain, size),
      SearchMode::NextFit => search::next_fit(&self.chain, &mut self.cursors.next_fit, size),
      SearchMode::BestFit => {
        let block = search::best_fit(&self.chain, &mut self.cursors.best_fit, size)?;
        if let Some(remainder) = split::split(block, size) {
          self.chain.retarget_top(block, remainder);
        }
        Some(block)
      }
      SearchMode::Segregated => {
        let bucket = self.buckets.get_mut(SizeClass::of(size));
        let block = search::best_fit(&bucket.chain, &mut bucket.cursor, size)?;
        if let Some(remainder) = split::split(block, size) {
          bucket.chain.retarget_top(block, remainder);
        }
        Some(block)
      }
    }
  }
}

impl<S: MemorySource> Heap<S> {
  /// Hands out a block with room for at least `requested` bytes.
  pub fn allocate(
    &mut self,
    requested: usize,
  ) -> Result<Allocation> {
    let size = aligned_size(requested)?;

    if let Some(block) = self.find_free(size) {
      block.set_used(true);
      return Ok(Allocation {
        block,
        reused: true,
      });
    }

    let region = self.source.request_region(total_region_size(size)?)?;
    // The source guarantees the region is fresh, aligned and large enough.
    let block = unsafe { Block::init(region, size) };

    match self.mode {
      SearchMode::Segregated => self.buckets.append(SizeClass::of(size), block),
      _ => self.chain.append(block),
    }

    Ok(Allocation {
      block,
      reused: false,
    })
  }

  /// Returns a block to the free pool, merging it with a free successor
  /// outside segregated mode.
  ///
  /// # Safety
  ///
  /// `payload` must come from [`allocate`](Self::allocate) on this heap,
  /// after the last reset, and must not have been freed already.
  pub unsafe fn free(
    &mut self,
    payload: NonNull<u8>,
  ) -> Block {
    let block = unsafe { Block::from_payload(payload) };

    // Merged blocks could end up in the wrong size class.
    if self.mode != SearchMode::Segregated {
      if let Some(absorbed) = split::coalesce(block) {
        self.chain.retarget_top(absorbed, block);
        self.cursors.retarget(absorbed, block);
      }
    }

    block.set_used(false);
    block
  }
}
