//! # fitalloc - A Free-List Heap Allocator
//!
//! This crate provides a user-space heap allocator that carves variably-sized
//! blocks out of raw memory, recycles freed blocks through one of four search
//! strategies, and serializes everything behind a single lock.
//!
//! ## Overview
//!
//! Every block carries a small header in front of its payload. Blocks are
//! linked in the order they were carved, which within one arena window is
//! also address order:
//!
//! ```text
//!   Heap Chain:
//!
//!   head                                                     top
//!    │                                                        │
//!    ▼                                                        ▼
//!   ┌────────┬─────────┐  ┌────────┬──────┐  ┌────────┬──────────────┐
//!   │ header │ 8 used  │─▶│ header │ 16   │─▶│ header │   64 used    │─▶ null
//!   └────────┴─────────┘  │        │ free │  └────────┴──────────────┘
//!                         └────────┴──────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   fitalloc
//!   ├── align      - Word alignment helpers
//!   ├── block      - Block header layout, header <-> payload translation
//!   ├── chain      - Head/top bookkeeping of a block chain
//!   ├── split      - Block splitting and forward coalescing
//!   ├── bucket     - Size classes for segregated fit
//!   ├── search     - First, next, best and segregated fit
//!   ├── heap       - Unlocked allocator state
//!   ├── allocator  - Locked facade and GlobalAlloc implementation
//!   ├── config     - Const configuration
//!   ├── source     - Memory sources (mmap arena, program break)
//!   └── error      - AllocError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use fitalloc::{Allocator, Config, SearchMode};
//!
//! let allocator = Allocator::with_config(Config::new().with_mode(SearchMode::BestFit));
//!
//! let ptr = allocator.allocate(64).unwrap();
//! unsafe {
//!     ptr.as_ptr().write_bytes(0xAB, 64);
//!     allocator.free(ptr);
//! }
//!
//! // The freed block is split to serve a smaller request.
//! let smaller = allocator.allocate(16).unwrap();
//! assert_eq!(smaller, ptr);
//! ```
//!
//! ## Search Strategies
//!
//! | Mode         | Scans                                  | Splits |
//! |--------------|----------------------------------------|--------|
//! | `FirstFit`   | whole chain from the head              | no     |
//! | `NextFit`    | from the last hit to the tail, no wrap | no     |
//! | `BestFit`    | whole chain, from the last hit         | yes    |
//! | `Segregated` | the chain of the request's size class  | yes    |
//!
//! The mode is fixed until [`Allocator::reset`], which drops all bookkeeping.
//!
//! ## Limitations
//!
//! - **No release to the OS**: memory obtained from a source is kept forever
//! - **Forward coalescing only**: a freed block merges with its successor,
//!   one hop per free, and never in segregated mode
//! - **Word alignment only**: stricter [`Layout`](std::alloc::Layout)s fail
//! - **Unix-only**: the sources rely on `mmap(2)` and `sbrk(2)` via `libc`
//!
//! ## Safety
//!
//! [`Allocator::free`] trusts its argument: freeing a foreign pointer or
//! freeing twice is undefined behavior and is not detected.

pub mod align;
pub mod allocator;
pub mod block;
pub mod bucket;
pub mod chain;
pub mod config;
pub mod error;
pub mod heap;
pub mod search;
pub mod source;
pub mod split;

pub use allocator::Allocator;
pub use block::{BlockInfo, header_overhead};
pub use bucket::SizeClass;
pub use config::Config;
pub use error::{AllocError, Result};
pub use heap::Heap;
pub use search::SearchMode;
pub use source::{BreakSource, MemorySource, MmapArena};
