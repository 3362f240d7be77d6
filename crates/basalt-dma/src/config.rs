//! # Engine Common Configuration
//!
//! The DMA core's negotiated transfer parameters, read once at attach
//! from the common block.
//!
//! The payload and read-request sizes bound how much one descriptor can
//! move per TLP; a transfer larger than the negotiated size is split
//! into multiple TLPs by the core, and the caller splits anything that
//! exceeds a descriptor's reach into multiple descriptors.

use basalt_core::{ByteSize, Result};
use basalt_hal::bar::{BarIndex, BarSet};
use basalt_hal::regs::{self, common, extract_field};

/// TLP size granularity: fields encode `2^v * 128` bytes.
const SIZE_GRANULARITY: u64 = 128;

// =============================================================================
// COMMON CONFIG
// =============================================================================

/// Negotiated DMA core parameters.
///
/// These may differ from the system-programmed PCIe values; the core
/// reports what it actually uses.
#[derive(Debug, Clone, Copy)]
pub struct EngineCommonConfig {
    /// Maximum payload size in use by the core
    max_payload: ByteSize,
    /// Maximum read-request size in use by the core
    max_read_request: ByteSize,
    /// Global DMA interrupt enable
    irq_enable: bool,
    /// Bitmask of engines that have completed their operation
    engine_finished: u16,
}

impl EngineCommonConfig {
    /// Decode the common block word.
    pub const fn decode(word: u64) -> Self {
        let payload = extract_field(word, common::MAX_PAYLOAD_LO, common::MAX_PAYLOAD_HI);
        let read_req = extract_field(
            word,
            common::MAX_READ_REQUEST_LO,
            common::MAX_READ_REQUEST_HI,
        );
        Self {
            max_payload: ByteSize::from_bytes(SIZE_GRANULARITY << payload),
            max_read_request: ByteSize::from_bytes(SIZE_GRANULARITY << read_req),
            irq_enable: extract_field(word, common::IRQ_ENABLE, common::IRQ_ENABLE) != 0,
            engine_finished: extract_field(
                word,
                common::ENGINE_FINISHED_LO,
                common::ENGINE_FINISHED_HI,
            ) as u16,
        }
    }

    /// Read and decode the common block from BAR0.
    pub fn read(bars: &BarSet) -> Result<Self> {
        let word = bars.read64(BarIndex::Bar0, regs::COMMON_BLOCK)?;
        Ok(Self::decode(word))
    }

    /// Maximum payload size in use by the core
    pub fn max_payload(&self) -> ByteSize {
        self.max_payload
    }

    /// Maximum read-request size in use by the core
    pub fn max_read_request(&self) -> ByteSize {
        self.max_read_request
    }

    /// Whether the global DMA interrupt is enabled
    pub fn irq_enabled(&self) -> bool {
        self.irq_enable
    }

    /// Whether `engine` reports its operation as finished
    pub fn engine_finished(&self, engine: usize) -> bool {
        self.engine_finished & (1 << engine) != 0
    }

    /// Number of TLPs the core splits a transfer of `length` bytes into.
    pub fn tlps_for(&self, length: u64) -> u64 {
        length.div_ceil(self.max_payload.as_bytes())
    }
}
