//! Size classes and the per-class chains used by segregated fit.
//!
//! ```text
//!   class   0      1      2      3      4       5
//!   sizes  ..=8  ..=16  ..=32  ..=64  ..=128  129..
//!           │      │      │      │      │       │
//!           ▼      ▼      ▼      ▼      ▼       ▼
//!         chain  chain  chain  chain  chain   chain
//! ```
//!
//! A block joins the chain of the class its requested size maps to when it
//! is first carved, and stays there for its whole life.

use std::{fmt, ops::RangeInclusive};

use crate::{block::Block, chain::Chain};

/// Upper bounds of every class except the last, which takes all larger sizes.
const CLASS_LIMITS: [usize; CLASS_COUNT - 1] = [8, 16, 32, 64, 128];

/// Number of size classes, the catch-all class included.
pub const CLASS_COUNT: usize = 6;

/// Index into the bucket table. Only [`SizeClass::of`] builds one, so the
/// index is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeClass(usize);

impl SizeClass {
  /// Maps any size to its class. Sizes above the largest explicit bound fall
  /// into the catch-all class.
  pub fn of(size: usize) -> Self {
    let index = CLASS_LIMITS
      .iter()
      .position(|&limit| size <= limit)
      .unwrap_or(CLASS_COUNT - 1);
    Self(index)
  }

  /// Every class, smallest first.
  pub fn all() -> impl Iterator<Item = SizeClass> {
    (0..CLASS_COUNT).map(SizeClass)
  }

  pub fn index(self) -> usize {
    self.0
  }

  /// Inclusive range of sizes mapping to this class.
  pub fn range(self) -> RangeInclusive<usize> {
    let low = match self.0 {
      0 => 0,
      index => CLASS_LIMITS[index - 1] + 1,
    };
    let high = CLASS_LIMITS.get(self.0).copied().unwrap_or(usize::MAX);
    low..=high
  }
}

impl fmt::Display for SizeClass {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match CLASS_LIMITS.get(self.0) {
      Some(limit) => write!(f, "<= {limit} bytes"),
      None => write!(f, "> {} bytes", CLASS_LIMITS[CLASS_COUNT - 2]),
    }
  }
}

/// One size class: its private chain and best-fit cursor.
#[derive(Debug, Default)]
pub struct Bucket {
  pub(crate) chain: Chain,
  pub(crate) cursor: Option<Block>,
}

impl Bucket {
  const EMPTY: Bucket = Bucket {
    chain: Chain::new(),
    cursor: None,
  };

  pub fn chain(&self) -> &Chain {
    &self.chain
  }

  pub fn cursor(&self) -> Option<Block> {
    self.cursor
  }
}

/// The bucket table.
#[derive(Debug)]
pub struct Buckets {
  buckets: [Bucket; CLASS_COUNT],
}

impl Default for Buckets {
  fn default() -> Self {
    Self::new()
  }
}

impl Buckets {
  pub const fn new() -> Self {
    Self {
      buckets: [Bucket::EMPTY; CLASS_COUNT],
    }
  }

  pub fn get(
    &self,
    class: SizeClass,
  ) -> &Bucket {
    &self.buckets[class.index()]
  }

  pub(crate) fn get_mut(
    &mut self,
    class: SizeClass,
  ) -> &mut Bucket {
    &mut self.buckets[class.index()]
  }

  /// Appends a freshly carved block to the chain of its class.
  pub(crate) fn append(
    &mut self,
    class: SizeClass,
    block: Block,
  ) {
    self.get_mut(class).chain.append(block);
  }

  /// Drops every chain and cursor.
  pub fn clear(&mut self) {
    for bucket in &mut self.buckets {
      bucket.chain.clear();
      bucket.cursor = None;
    }
  }
}
