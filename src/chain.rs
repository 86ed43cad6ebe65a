use crate::block::Block;

/// A singly linked chain of blocks in allocation order.
///
/// `head` is the first block ever appended, `top` the last one, so appending
/// a block carved from fresh memory is O(1).
#[derive(Debug, Default)]
pub struct Chain {
  head: Option<Block>,
  top: Option<Block>,
}

impl Chain {
  pub const fn new() -> Self {
    Self {
      head: None,
      top: None,
    }
  }

  pub fn head(&self) -> Option<Block> {
    self.head
  }

  pub fn top(&self) -> Option<Block> {
    self.top
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Links `block` after the current top.
  pub(crate) fn append(
    &mut self,
    block: Block,
  ) {
    match self.top {
      Some(top) => top.set_next(Some(block)),
      None => self.head = Some(block),
    }
    self.top = Some(block);
  }

  /// Forgets every block without touching the memory behind them.
  pub fn clear(&mut self) {
    self.head = None;
    self.top = None;
  }

  /// Moves `top` from `from` to `to`.
  ///
  /// Called when a split puts a remainder after the top block, or when
  /// coalescing abandons the header `top` pointed at.
  pub(crate) fn retarget_top(
    &mut self,
    from: Block,
    to: Block,
  ) {
    if self.top == Some(from) {
      self.top = Some(to);
    }
  }

  pub fn iter(&self) -> Blocks {
    Blocks::from(self.head)
  }
}

/// Iterator following `next` links from a starting block.
pub struct Blocks {
  current: Option<Block>,
}

impl From<Option<Block>> for Blocks {
  fn from(current: Option<Block>) -> Self {
    Self { current }
  }
}

impl Iterator for Blocks {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    let block = self.current?;
    self.current = block.next();
    Some(block)
  }
}
