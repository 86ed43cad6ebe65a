//! Block surgery: splitting a free block and merging it with its successor.

use crate::{
  align::WORD,
  block::{Block, header_overhead},
};

/// Whether a free `block` can host `size` bytes plus a remainder holding a
/// header and at least one word of payload.
pub fn can_split(
  block: Block,
  size: usize,
) -> bool {
  !block.is_used()
    && block
      .size()
      .checked_sub(size)
      .is_some_and(|spare| spare >= header_overhead() + WORD)
}

/// Carves `block` into a `size`-byte prefix and a free remainder.
///
/// Returns the remainder, or `None` when the block must be granted whole.
/// The prefix keeps its header and stays free; the caller marks it used.
pub fn split(
  block: Block,
  size: usize,
) -> Option<Block> {
  if !can_split(block, size) {
    return None;
  }

  let remainder_size = block.size() - size - header_overhead();
  // The remainder lies inside the free block's own payload.
  let remainder = unsafe { block.carve(size, remainder_size) };
  remainder.set_next(block.next());

  block.set_size(size);
  block.set_next(Some(remainder));

  Some(remainder)
}

/// Whether `block` has a free successor starting right after its payload.
///
/// Blocks carved from different arena windows are never adjacent even when
/// they are linked, so adjacency is checked and not assumed.
pub fn can_coalesce(block: Block) -> bool {
  block
    .next()
    .is_some_and(|next| !next.is_used() && next.addr() == block.end())
}

/// Absorbs the successor of `block`, one hop only.
///
/// Returns the absorbed block, whose header is abandoned, or `None` when the
/// successor cannot be merged. Free runs longer than two blocks only merge
/// fully when they are freed back to front, since there is no backward link.
pub fn coalesce(block: Block) -> Option<Block> {
  if !can_coalesce(block) {
    return None;
  }

  let absorbed = block.next()?;
  block.set_size(block.size() + absorbed.size() + header_overhead());
  block.set_next(absorbed.next());

  Some(absorbed)
}
