//! # DMA Engine Protocol
//!
//! Programs descriptor slots, arms the engine, and polls for
//! completion.
//!
//! All bookkeeping that the engine protocol needs across calls — the
//! ring tail and the scratch table of live bus mappings — lives here,
//! owned by the device handle, so independent virtual devices never
//! share state.
//!
//! A misprogrammed descriptor can freeze the card; every local
//! validation runs before the first register write.

use alloc::vec;
use alloc::vec::Vec;

use basalt_core::{BusMapper, Error, PhysAddr, Result, TimeSource, MAX_NUM_DMA_DESCRIPTORS};
use basalt_hal::bar::{BarIndex, BarRegion, BarSet};
use basalt_hal::regs::{self, desc, EngineControl};

use crate::descriptor::{DescriptorStatus, TransferPhase, TransferRequest};

/// Poll bound in hardware clock-domain time units. An engine that has
/// not cleared enable by then is reported wedged, never successful.
pub const POLL_TIMEOUT_UNITS: u64 = 10_000_000;

/// Smallest accepted read-request window.
pub const WINDOW_SIZE_MIN: u64 = 1;

/// Largest accepted read-request window; also the value that offers the
/// best throughput on the reference design.
pub const WINDOW_SIZE_MAX: u64 = 32;

/// Spin-loop hints between enable-bit samples.
const POLL_SPIN_BATCH: u32 = 100;

/// The protocol addresses engine 0; engine 1 is provisioned in the
/// register map but carries no defined semantics.
const ENGINE: usize = 0;

// =============================================================================
// SCRATCH TABLE
// =============================================================================

/// One live bus mapping, indexed by descriptor slot.
#[derive(Debug, Clone, Copy)]
struct ScratchSlot {
    bus: PhysAddr,
    len: u64,
}

// =============================================================================
// DMA ENGINE
// =============================================================================

/// Submission/completion protocol state for the card's DMA engine.
#[derive(Debug)]
pub struct DmaEngine {
    /// Last ring-tail value written to the hardware
    ring_tail: u16,
    /// Live bus mappings, one slot per descriptor
    scratch: Vec<Option<ScratchSlot>>,
    /// Terminal phase of the most recent submission
    phase: TransferPhase,
}

impl DmaEngine {
    /// Create the protocol state for a freshly attached card.
    pub fn new() -> Self {
        Self {
            ring_tail: 0,
            scratch: vec![None; MAX_NUM_DMA_DESCRIPTORS],
            phase: TransferPhase::Idle,
        }
    }

    /// Phase the most recent submission ended in.
    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    /// Ring-tail value last written to the hardware.
    pub fn ring_tail(&self) -> u16 {
        self.ring_tail
    }

    /// Program descriptor slot `req.index` with `target`, and when
    /// `req.enable` is set, arm the engine and wait for completion.
    ///
    /// The hardware write order is mandatory: address and length first,
    /// then the direction word, then the ring tail, and the enable bit
    /// strictly last. The direction word is written twice on an enabled
    /// transfer — once bare, once with enable — matching the observed
    /// hardware contract.
    ///
    /// On every exit from the armed state, all scratch mappings are
    /// released exactly once. A timeout is surfaced as
    /// [`Error::Timeout`] with the hardware left as found.
    pub fn write_descriptor(
        &mut self,
        bars: &BarSet,
        mapper: &mut dyn BusMapper,
        clock: &dyn TimeSource,
        req: &TransferRequest,
        target: PhysAddr,
    ) -> Result<TransferPhase> {
        if req.index >= MAX_NUM_DMA_DESCRIPTORS {
            return Err(Error::DescriptorOutOfRange);
        }
        let bar = bars.region(BarIndex::Bar0)?;

        // Establish the bus mapping for this transfer. A slot
        // reprogrammed before its mapping was consumed gives up the
        // stale mapping here, so release stays exactly-once.
        let bus = mapper.map(target, req.length)?;
        if let Some(stale) = self.scratch[req.index].replace(ScratchSlot {
            bus,
            len: req.length,
        }) {
            mapper.unmap(stale.bus, stale.len);
        }

        let slot = regs::descriptor_base(ENGINE, req.index);
        let base = regs::engine_base(ENGINE);

        bar.write64(slot + desc::ADDRESS, bus.raw())?;
        bar.write64(slot + desc::LENGTH, req.length)?;

        let ctrl = req.direction.control_bits();
        bar.write8(base + regs::engine::CTRL, ctrl.bits())?;

        self.ring_tail = req.index as u16;
        bar.write16(base + regs::engine::RING_TAIL, self.ring_tail)?;

        self.phase = TransferPhase::Programmed;
        if !req.enable {
            return Ok(TransferPhase::Programmed);
        }

        let start = clock.now_us();
        bar.write8(base + regs::engine::CTRL, (ctrl | EngineControl::ENABLE).bits())?;
        self.phase = TransferPhase::Armed;

        let outcome = self.poll_completion(bar, clock, start);
        self.release_scratch(mapper);

        match outcome {
            Ok(()) => {
                self.phase = TransferPhase::Completed;
                Ok(TransferPhase::Completed)
            }
            Err(Error::Timeout) => {
                log::error!("descriptor {}: exit by timeout", req.index);
                self.phase = TransferPhase::TimedOut;
                Err(Error::Timeout)
            }
            Err(e) => {
                self.phase = TransferPhase::Idle;
                Err(e)
            }
        }
    }

    /// Busy-poll the enable bit until the engine clears it or the bound
    /// elapses. Time is measured on the card's clock domain through the
    /// injected source, so accuracy does not depend on host scheduling.
    fn poll_completion(
        &mut self,
        bar: &BarRegion,
        clock: &dyn TimeSource,
        start: u64,
    ) -> Result<()> {
        self.phase = TransferPhase::Polling;
        let ctrl_offset = regs::engine_base(ENGINE) + regs::engine::CTRL;
        loop {
            let ctrl = EngineControl::from_bits_truncate(bar.read8(ctrl_offset)?);
            if !ctrl.contains(EngineControl::ENABLE) {
                return Ok(());
            }
            if clock.now_us().saturating_sub(start) > POLL_TIMEOUT_UNITS {
                return Err(Error::Timeout);
            }
            for _ in 0..POLL_SPIN_BATCH {
                core::hint::spin_loop();
            }
        }
    }

    /// Retrieve the status counters of slot `index`, de-scaled to real
    /// units. Pure read: no state transition, no mapping change.
    pub fn read_descriptor(&self, bars: &BarSet, index: usize) -> Result<DescriptorStatus> {
        if index >= MAX_NUM_DMA_DESCRIPTORS {
            return Err(Error::DescriptorOutOfRange);
        }
        let bar = bars.region(BarIndex::Bar0)?;
        let slot = regs::descriptor_base(ENGINE, index);

        Ok(DescriptorStatus::from_raw(
            bar.read64(slot + desc::LATENCY)?,
            bar.read64(slot + desc::TIME_AT_REQ)?,
            bar.read64(slot + desc::TIME_AT_COMP)?,
            bar.read64(slot + desc::BYTES_AT_REQ)?,
            bar.read64(slot + desc::BYTES_AT_COMP)?,
        ))
    }

    /// Set the number of concurrent memory-read-request tags.
    ///
    /// The accepted range is `[1, 32]`; anything else is rejected
    /// before the hardware is touched.
    pub fn set_window_size(&mut self, bars: &BarSet, window: u64) -> Result<()> {
        if !(WINDOW_SIZE_MIN..=WINDOW_SIZE_MAX).contains(&window) {
            return Err(Error::InvalidParameter);
        }
        bars.write64(
            BarIndex::Bar0,
            regs::engine_base(ENGINE) + regs::engine::TOTAL_BYTES,
            window,
        )
    }

    /// Read back the configured read-request window.
    pub fn window_size(&self, bars: &BarSet) -> Result<u64> {
        bars.read64(
            BarIndex::Bar0,
            regs::engine_base(ENGINE) + regs::engine::TOTAL_BYTES,
        )
    }

    /// Detach path: wait out a still-armed engine, then drop every
    /// scratch mapping. Safe to call with nothing outstanding.
    pub fn quiesce(
        &mut self,
        bars: &BarSet,
        mapper: &mut dyn BusMapper,
        clock: &dyn TimeSource,
    ) {
        if let Ok(bar) = bars.region(BarIndex::Bar0) {
            let start = clock.now_us();
            if self.poll_completion(bar, clock, start).is_err() {
                log::warn!("engine still armed at detach");
            }
        }
        self.release_scratch(mapper);
        self.phase = TransferPhase::Idle;
    }

    /// Release every live scratch mapping exactly once.
    fn release_scratch(&mut self, mapper: &mut dyn BusMapper) {
        for slot in self.scratch.iter_mut() {
            if let Some(mapping) = slot.take() {
                mapper.unmap(mapping.bus, mapping.len);
            }
        }
    }
}
