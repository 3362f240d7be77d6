//! # BASALT DMA Protocol
//!
//! Descriptor submission and completion for the FPGA DMA engine.
//!
//! ## Submission Flow
//!
//! ```text
//! Idle → Programmed → Armed → Polling → { Completed | TimedOut }
//! ```
//!
//! 1. The target address and length are written into a descriptor slot
//! 2. The direction word is programmed (enable still clear)
//! 3. The ring tail is advanced to the slot
//! 4. The control word is rewritten with enable set, arming the engine
//! 5. The enable bit is polled until the engine clears it, bounded by
//!    the hardware-domain timeout
//!
//! The write order is mandatory: arming before the slot is programmed
//! is undefined hardware behavior. Elapsed-time status comes from the
//! engine's own counters, which is why completion is a synchronous poll
//! rather than an interrupt.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod descriptor;
pub mod engine;

// Re-exports
pub use config::EngineCommonConfig;
pub use descriptor::{DescriptorStatus, TransferDirection, TransferPhase, TransferRequest};
pub use engine::{DmaEngine, POLL_TIMEOUT_UNITS, WINDOW_SIZE_MAX, WINDOW_SIZE_MIN};
