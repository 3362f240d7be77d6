//! # DMA Register Map
//!
//! Explicit offset/width table for the DMA block in BAR0.
//!
//! The hardware presents the block as a packed structure; overlaying a
//! language-level struct on device memory is layout-fragile, so the map
//! is expressed as byte offsets with masked accessors instead. All
//! offsets are in bytes from the BAR0 base.
//!
//! ```text
//! BAR0 + 0x1000                 dma_engine[0]
//! BAR0 + 0x1000 + 0x20000      dma_engine[1]     (provisioned, unused)
//! BAR0 + 0x1000 + 2*0x20000    common block
//! ```

use basalt_core::{MAX_NUM_DMA_DESCRIPTORS, MAX_NUM_DMA_ENGINES, MAX_PAGES};
use static_assertions::const_assert;

// =============================================================================
// BLOCK LAYOUT
// =============================================================================

/// Byte offset of the DMA block in BAR0 (0x200 64-bit words).
pub const DMA_BLOCK_BASE: u64 = 0x1000;

/// Byte stride between engine register blocks (0x4000 64-bit words).
pub const ENGINE_STRIDE: u64 = 0x2_0000;

/// Byte offset of the common block within BAR0.
pub const COMMON_BLOCK: u64 = DMA_BLOCK_BASE + (MAX_NUM_DMA_ENGINES as u64) * ENGINE_STRIDE;

// =============================================================================
// ENGINE BLOCK
// =============================================================================

/// Engine register offsets, relative to the engine base.
pub mod engine {
    /// Control word: enable, reset, and direction bits (low byte)
    pub const CTRL: u64 = 0x00;
    /// Ring tail (`complete_until_descriptor`), 16 bits
    pub const RING_TAIL: u64 = 0x08;
    /// Read: time consumed by the previous operation.
    /// Write: maximum timeout for a device-to-host operation.
    pub const TOTAL_TIME: u64 = 0x10;
    /// Read: total bytes moved. Write: read-request window size.
    pub const TOTAL_BYTES: u64 = 0x18;
    /// Start of the descriptor array
    pub const DESC_BASE: u64 = 0x20;
}

/// Descriptor slot offsets, relative to the slot base.
pub mod desc {
    /// Byte stride between descriptor slots
    pub const STRIDE: u64 = 64;

    /// Target address of the operation
    pub const ADDRESS: u64 = 0x00;
    /// Length of the operation in bytes
    pub const LENGTH: u64 = 0x08;
    /// Per-descriptor flags (bit 0: generate interrupt)
    pub const FLAGS: u64 = 0x10;
    /// Status: operation latency, pre-scaled by 4
    pub const LATENCY: u64 = 0x18;
    /// Status: time attending request TLPs, pre-scaled by 4
    pub const TIME_AT_REQ: u64 = 0x20;
    /// Status: time attending completion TLPs, pre-scaled by 4
    pub const TIME_AT_COMP: u64 = 0x28;
    /// Status: bytes in request TLPs, pre-scaled by 4
    pub const BYTES_AT_REQ: u64 = 0x30;
    /// Status: bytes in completion TLPs, pre-scaled by 4
    pub const BYTES_AT_COMP: u64 = 0x38;
}

/// Base offset of an engine's register block within BAR0.
#[inline]
pub const fn engine_base(engine: usize) -> u64 {
    DMA_BLOCK_BASE + (engine as u64) * ENGINE_STRIDE
}

/// Base offset of a descriptor slot within BAR0.
#[inline]
pub const fn descriptor_base(engine: usize, index: usize) -> u64 {
    engine_base(engine) + self::engine::DESC_BASE + (index as u64) * desc::STRIDE
}

// =============================================================================
// ENGINE CONTROL BITS
// =============================================================================

bitflags::bitflags! {
    /// Low byte of the engine control word.
    ///
    /// The direction bits are programmed first without `ENABLE`; the
    /// engine is then armed by rewriting the byte with `ENABLE` set.
    /// Completion is the engine clearing `ENABLE` on its own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EngineControl: u8 {
        /// Engine runs the programmed descriptors while set
        const ENABLE = 1 << 0;
        /// Engine reset
        const RESET = 1 << 1;
        /// Device-to-host operation (card writes host memory)
        const DEV_TO_HOST = 1 << 2;
        /// Host-to-device operation (card reads host memory)
        const HOST_TO_DEV = 1 << 3;
    }
}

// =============================================================================
// COMMON BLOCK FIELDS
// =============================================================================

/// Field positions within the common block word.
pub mod common {
    /// Max payload in use by the core: bits 0..=2, `2^v * 128` bytes
    pub const MAX_PAYLOAD_LO: u8 = 0;
    /// Upper bit of the max payload field
    pub const MAX_PAYLOAD_HI: u8 = 2;
    /// Max read request in use by the core: bits 3..=5, `2^v * 128` bytes
    pub const MAX_READ_REQUEST_LO: u8 = 3;
    /// Upper bit of the max read request field
    pub const MAX_READ_REQUEST_HI: u8 = 5;
    /// Global interrupt enable bit
    pub const IRQ_ENABLE: u8 = 6;
    /// User-visible reset bit
    pub const USER_RESET: u8 = 7;
    /// Completion bitmask, one bit per engine: bits 8..=23
    pub const ENGINE_FINISHED_LO: u8 = 8;
    /// Upper bit of the completion bitmask
    pub const ENGINE_FINISHED_HI: u8 = 23;
}

/// Extract a bit field from a register value.
#[inline]
pub const fn extract_field(value: u64, low_bit: u8, high_bit: u8) -> u64 {
    let mask = ((1u64 << (high_bit - low_bit + 1)) - 1) << low_bit;
    (value & mask) >> low_bit
}

/// Insert a bit field into a register value.
#[inline]
pub const fn insert_field(value: u64, field: u64, low_bit: u8, high_bit: u8) -> u64 {
    let mask = ((1u64 << (high_bit - low_bit + 1)) - 1) << low_bit;
    (value & !mask) | ((field << low_bit) & mask)
}

// =============================================================================
// LAYOUT INVARIANTS
// =============================================================================

// The descriptor array must fit inside the engine stride.
const_assert!(
    self::engine::DESC_BASE + (MAX_NUM_DMA_DESCRIPTORS as u64) * desc::STRIDE <= ENGINE_STRIDE
);
// Status fields are 64-bit words; the stride must keep them aligned.
const_assert!(desc::STRIDE % 8 == 0);
// The pool cursor arithmetic relies on a power-of-two page count.
const_assert!(MAX_PAGES.is_power_of_two());
