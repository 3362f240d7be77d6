//! # BASALT
//!
//! Host-side control path for a PCIe-attached FPGA DMA accelerator.
//!
//! The facade crate: [`Device`] owns everything the card needs on the
//! host side — the mapped BAR windows, the DMA protocol state, the
//! circular page pool, the optional pinned region, and the
//! single-operation gate that serializes all of it.
//!
//! ## Control Flow
//!
//! ```text
//! caller ──▶ gate ──▶ translator ──▶ descriptor protocol ──▶ registers
//!                        │
//!            pinned region or page pool
//! ```
//!
//! A caller acquires the gate, the translator resolves the target
//! address against the pinned region or the pool window, and the
//! protocol performs the hardware transaction through the register
//! layer. At most one control operation is in flight per card.
//!
//! ## Example
//!
//! ```ignore
//! use basalt::{Device, DeviceResources};
//!
//! let device = Device::attach(resources)?;
//! device.set_window_size(32)?;
//! device.register_buffer(buf_base, buf_len, huge_page_size)?;
//! device.write_descriptor(&request)?;
//! let status = device.read_descriptor(request.index)?;
//! // detach (drop) drains, unregisters, and releases in order
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod device;
pub mod lifecycle;

#[cfg(test)]
mod testutil;

// Re-exports: the whole control surface in one place
pub use basalt_core::{
    CancelSignal, Error, PagePinner, PhysAddr, Result, TimeSource, MAX_NUM_DMA_DESCRIPTORS,
    MAX_PAGES, PAGE_SIZE,
};
pub use basalt_dma::{
    DescriptorStatus, EngineCommonConfig, TransferDirection, TransferPhase, TransferRequest,
};
pub use basalt_hal::{BarIndex, BarRegion, BarSet};
pub use basalt_mem::PageRun;
pub use device::Device;
pub use lifecycle::DeviceResources;
