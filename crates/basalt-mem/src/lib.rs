//! # BASALT Memory Management
//!
//! The two memory sources a DMA target can come from, and the
//! translation between user-level offsets and physical addresses.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Address Translator                        │
//! │        (user offset, length) → physical target address        │
//! └───────────────┬───────────────────────────┬───────────────────┘
//!                 │                           │
//!     ┌───────────┴───────────┐   ┌───────────┴───────────┐
//!     │     PinnedRegion      │   │       PagePool        │
//!     │  (user/huge pages,    │   │  (driver-owned ring   │
//!     │   per-page table)     │   │   of 1024 4K pages)   │
//!     └───────────────────────┘   └───────────────────────┘
//! ```
//!
//! A translation that crossed a page boundary would hand the engine a
//! physical address unrelated to the caller's buffer; the translator is
//! therefore the most safety-critical check in the driver.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod pin;
pub mod pool;
pub mod translate;

// Re-exports
pub use pin::PinnedRegion;
pub use pool::{PagePool, PageRun};
pub use translate::resolve_target;
