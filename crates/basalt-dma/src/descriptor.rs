//! # Descriptor Records
//!
//! The software-side view of one DMA descriptor: the transfer request a
//! caller submits and the status counters the hardware reports back.

use basalt_hal::EngineControl;

/// Hardware counters are pre-scaled by this factor; reads multiply it
/// back in to report real time/byte units.
pub const HW_COUNTER_SCALE: u64 = 4;

// =============================================================================
// DIRECTION
// =============================================================================

bitflags::bitflags! {
    /// Direction of a transfer, as seen from the host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransferDirection: u8 {
        /// Card writes host memory (card-to-system)
        const DEVICE_TO_HOST = 1 << 0;
        /// Card reads host memory (system-to-card)
        const HOST_TO_DEVICE = 1 << 1;
    }
}

impl TransferDirection {
    /// Encode into the engine control word's direction bits.
    pub fn control_bits(self) -> EngineControl {
        let mut ctrl = EngineControl::empty();
        if self.contains(Self::DEVICE_TO_HOST) {
            ctrl |= EngineControl::DEV_TO_HOST;
        }
        if self.contains(Self::HOST_TO_DEVICE) {
            ctrl |= EngineControl::HOST_TO_DEV;
        }
        ctrl
    }
}

// =============================================================================
// TRANSFER REQUEST
// =============================================================================

/// One descriptor submission.
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest {
    /// Descriptor slot to program (< 1024)
    pub index: usize,
    /// User-level offset into the registered region or pool window
    pub offset: u64,
    /// Length of the operation in bytes
    pub length: u64,
    /// Transfer direction
    pub direction: TransferDirection,
    /// Arm the engine and wait for completion; when clear, the slot is
    /// programmed but not triggered
    pub enable: bool,
}

// =============================================================================
// TRANSFER PHASE
// =============================================================================

/// State machine of a submitted descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// No transfer submitted
    Idle,
    /// Slot programmed, engine not armed
    Programmed,
    /// Enable written, engine owns the descriptor
    Armed,
    /// Waiting for the engine to clear enable
    Polling,
    /// Engine cleared enable within the bound
    Completed,
    /// Enable never cleared; the engine may be wedged
    TimedOut,
}

// =============================================================================
// DESCRIPTOR STATUS
// =============================================================================

/// Status counters of one descriptor, in real (de-scaled) units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptorStatus {
    /// Latency of the operation
    pub latency: u64,
    /// Time attending request TLPs
    pub time_at_req: u64,
    /// Time attending completion TLPs
    pub time_at_comp: u64,
    /// Bytes involved in request TLPs
    pub bytes_at_req: u64,
    /// Bytes involved in completion TLPs
    pub bytes_at_comp: u64,
}

impl DescriptorStatus {
    /// Scale raw hardware counters into real units.
    pub const fn from_raw(
        latency: u64,
        time_at_req: u64,
        time_at_comp: u64,
        bytes_at_req: u64,
        bytes_at_comp: u64,
    ) -> Self {
        Self {
            latency: latency * HW_COUNTER_SCALE,
            time_at_req: time_at_req * HW_COUNTER_SCALE,
            time_at_comp: time_at_comp * HW_COUNTER_SCALE,
            bytes_at_req: bytes_at_req * HW_COUNTER_SCALE,
            bytes_at_comp: bytes_at_comp * HW_COUNTER_SCALE,
        }
    }
}
