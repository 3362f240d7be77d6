//! # BASALT Core
//!
//! Foundational types, error handling, and platform seams for the BASALT
//! FPGA DMA control driver.
//!
//! This crate has no hardware dependencies. It provides:
//!
//! - Strong typing for physical addresses and sizes
//! - The unified driver error taxonomy
//! - The single-operation gate that serializes hardware access
//! - The trait seams the platform layer implements (page pinning,
//!   bus mapping, time)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      basalt-core                            │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │   Traits    │  │   Types     │  │  Error / OpGate     │  │
//! │  │ (PagePinner,│  │ (PhysAddr,  │  │                     │  │
//! │  │  BusMapper) │  │  ByteSize)  │  │                     │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod error;
pub mod sync;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use error::{Error, Result};
pub use sync::{CancelSignal, OpGate, OpGuard};
pub use traits::*;
pub use types::*;
