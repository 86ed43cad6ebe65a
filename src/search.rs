//! Free-block search strategies.

use std::{fmt, str::FromStr};

use crate::{
  block::Block,
  chain::{Blocks, Chain},
  error::AllocError,
};

/// Policy used to pick the free block that satisfies a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchMode {
  /// First free block from the head of the chain.
  #[default]
  FirstFit,
  /// First free block from where the previous search stopped. Does not wrap.
  NextFit,
  /// Tightest free block in the chain, split when oversized.
  BestFit,
  /// Best fit restricted to the chain of the request's size class.
  Segregated,
}

impl SearchMode {
  pub const ALL: [SearchMode; 4] = [
    SearchMode::FirstFit,
    SearchMode::NextFit,
    SearchMode::BestFit,
    SearchMode::Segregated,
  ];

  pub fn name(self) -> &'static str {
    match self {
      SearchMode::FirstFit => "first-fit",
      SearchMode::NextFit => "next-fit",
      SearchMode::BestFit => "best-fit",
      SearchMode::Segregated => "segregated",
    }
  }
}

impl fmt::Display for SearchMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for SearchMode {
  type Err = AllocError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    SearchMode::ALL
      .into_iter()
      .find(|mode| mode.name().eq_ignore_ascii_case(s.trim()))
      .ok_or(AllocError::UnknownMode)
  }
}

/// Resume points for the heap chain. Next fit and best fit never share one.
#[derive(Debug, Default)]
pub struct Cursors {
  pub(crate) next_fit: Option<Block>,
  pub(crate) best_fit: Option<Block>,
}

impl Cursors {
  pub const fn new() -> Self {
    Self {
      next_fit: None,
      best_fit: None,
    }
  }

  pub fn next_fit(&self) -> Option<Block> {
    self.next_fit
  }

  pub fn best_fit(&self) -> Option<Block> {
    self.best_fit
  }

  /// Points any cursor naming `from` at `to` instead.
  pub(crate) fn retarget(
    &mut self,
    from: Block,
    to: Block,
  ) {
    for cursor in [&mut self.next_fit, &mut self.best_fit] {
      if *cursor == Some(from) {
        *cursor = Some(to);
      }
    }
  }
}

fn fits(
  block: Block,
  size: usize,
) -> bool {
  !block.is_used() && block.size() >= size
}

/// First free block from the head with room for `size` bytes.
pub fn first_fit(
  chain: &Chain,
  size: usize,
) -> Option<Block> {
  chain.iter().find(|&block| fits(block, size))
}

/// First free block at or after the cursor; moves the cursor onto it.
///
/// Blocks before the cursor are not revisited: when nothing between the
/// cursor and the tail fits, the search fails.
pub fn next_fit(
  chain: &Chain,
  cursor: &mut Option<Block>,
  size: usize,
) -> Option<Block> {
  let start = cursor.or(chain.head());
  let found = Blocks::from(start).find(|&block| fits(block, size))?;
  *cursor = Some(found);
  Some(found)
}

/// Tightest free block for `size` bytes.
///
/// Scans from the cursor to the tail, then from the head back up to the
/// cursor, stopping early on an exact fit. The cursor follows every fitting
/// free block visited.
pub fn best_fit(
  chain: &Chain,
  cursor: &mut Option<Block>,
  size: usize,
) -> Option<Block> {
  let start = cursor.or(chain.head());
  let wrapped = chain.iter().take_while(|&block| Some(block) != start);
  let visit = Blocks::from(start).chain(wrapped);

  let mut found: Option<Block> = None;
  for block in visit {
    if !fits(block, size) {
      continue;
    }

    *cursor = Some(block);
    if block.size() == size {
      return Some(block);
    }
    if found.is_none_or(|best| block.size() < best.size()) {
      found = Some(block);
    }
  }

  found
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::{HEADER_SIZE, tests::Scratch};

  /// Builds a chain from `(size, used)` pairs laid out back to back.
  fn build(
    scratch: &mut Scratch,
    layout: &[(usize, bool)],
  ) -> (Chain, Vec<Block>) {
    let mut chain = Chain::new();
    let mut blocks = Vec::new();
    let mut offset = 0;
    for &(size, used) in layout {
      let block = unsafe { Block::init(scratch.at(offset), size) };
      block.set_used(used);
      chain.append(block);
      blocks.push(block);
      offset += HEADER_SIZE + size;
    }
    (chain, blocks)
  }

  #[test]
  fn test_mode_names() {
    for mode in SearchMode::ALL {
      assert_eq!(mode.to_string().parse::<SearchMode>(), Ok(mode));
    }
    assert_eq!(" Best-Fit ".parse::<SearchMode>(), Ok(SearchMode::BestFit));
    assert_eq!(
      "worst-fit".parse::<SearchMode>(),
      Err(AllocError::UnknownMode)
    );
    assert_eq!(SearchMode::default(), SearchMode::FirstFit);
  }

  #[test]
  fn test_first_fit() {
    let mut scratch = Scratch::new(1024);
    let (chain, blocks) = build(
      &mut scratch,
      &[(8, false), (32, true), (16, false), (32, false)],
    );

    assert_eq!(first_fit(&chain, 8), Some(blocks[0]));
    assert_eq!(first_fit(&chain, 16), Some(blocks[2]));
    assert_eq!(first_fit(&chain, 24), Some(blocks[3]));
    assert_eq!(first_fit(&chain, 40), None);
    assert_eq!(first_fit(&Chain::new(), 8), None);
  }

  #[test]
  fn test_next_fit_resumes_without_wrapping() {
    let mut scratch = Scratch::new(1024);
    let (chain, blocks) = build(
      &mut scratch,
      &[(16, false), (8, true), (16, false), (8, true)],
    );
    let mut cursor = None;

    assert_eq!(next_fit(&chain, &mut cursor, 16), Some(blocks[0]));
    assert_eq!(cursor, Some(blocks[0]));

    blocks[0].set_used(true);
    assert_eq!(next_fit(&chain, &mut cursor, 16), Some(blocks[2]));
    assert_eq!(cursor, Some(blocks[2]));

    // The first block fits again, but it lies behind the cursor.
    blocks[0].set_used(false);
    blocks[2].set_used(true);
    assert_eq!(next_fit(&chain, &mut cursor, 16), None);
    assert_eq!(cursor, Some(blocks[2]));
  }

  #[test]
  fn test_best_fit_prefers_tightest() {
    let mut scratch = Scratch::new(1024);
    let (chain, blocks) = build(
      &mut scratch,
      &[(64, false), (8, true), (32, false), (48, false)],
    );
    let mut cursor = None;

    assert_eq!(best_fit(&chain, &mut cursor, 24), Some(blocks[2]));
    assert_eq!(cursor, Some(blocks[3]));
  }

  #[test]
  fn test_best_fit_stops_on_exact() {
    let mut scratch = Scratch::new(1024);
    let (chain, blocks) = build(
      &mut scratch,
      &[(8, true), (64, false), (8, true), (16, false)],
    );
    let mut cursor = None;

    assert_eq!(best_fit(&chain, &mut cursor, 16), Some(blocks[3]));
    assert_eq!(cursor, Some(blocks[3]));
  }

  #[test]
  fn test_best_fit_wraps_behind_cursor() {
    let mut scratch = Scratch::new(1024);
    let (chain, blocks) = build(
      &mut scratch,
      &[(16, false), (8, true), (64, false), (8, true)],
    );
    let mut cursor = Some(blocks[2]);

    // The tighter block sits before the cursor.
    assert_eq!(best_fit(&chain, &mut cursor, 16), Some(blocks[0]));
    assert_eq!(cursor, Some(blocks[0]));

    blocks[0].set_used(true);
    assert_eq!(best_fit(&chain, &mut cursor, 16), Some(blocks[2]));
    assert_eq!(best_fit(&chain, &mut cursor, 128), None);
  }

  #[test]
  fn test_cursor_retarget() {
    let mut scratch = Scratch::new(1024);
    let (_, blocks) = build(&mut scratch, &[(8, false), (8, false)]);
    let mut cursors = Cursors::new();
    cursors.next_fit = Some(blocks[1]);
    cursors.best_fit = Some(blocks[0]);

    cursors.retarget(blocks[1], blocks[0]);
    assert_eq!(cursors.next_fit(), Some(blocks[0]));
    assert_eq!(cursors.best_fit(), Some(blocks[0]));

    // Cursors on other blocks stay put.
    cursors.retarget(blocks[1], blocks[1]);
    assert_eq!(cursors.next_fit(), Some(blocks[0]));
  }
}
