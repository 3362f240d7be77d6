//! # BASALT HAL
//!
//! Hardware access layer for the FPGA DMA core: mapped BAR windows with
//! bounds-checked, sized volatile accessors, and the explicit register
//! offset map of the DMA block.
//!
//! The register layout is deliberately expressed as an offset/width
//! table with masked accessors rather than a structure overlaid on
//! device memory; bit-field overlays over MMIO are compiler-fragile and
//! a misread register here can wedge the engine.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "std")]
extern crate std;

pub mod bar;
pub mod regs;

// Re-exports
pub use bar::{BarIndex, BarRegion, BarSet};
pub use regs::EngineControl;
