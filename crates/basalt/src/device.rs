//! # Device Handle
//!
//! One attached card: its mapped windows, protocol state, memory
//! sources, and the gate that serializes every operation on them.
//!
//! Everything that was process-wide bookkeeping in older control paths
//! (scratch tables, ring tail, pinning tables, cursors) is owned here,
//! so independent cards — and independent tests — never share state.

use alloc::boxed::Box;
use alloc::sync::Arc;

use basalt_core::{
    BusMapper, CancelSignal, OpGate, PagePinner, Result, TimeSource,
};
use basalt_dma::{
    DescriptorStatus, DmaEngine, EngineCommonConfig, TransferPhase, TransferRequest,
};
use basalt_hal::bar::{BarIndex, BarSet};
use basalt_mem::{resolve_target, PagePool, PageRun, PinnedRegion};

// =============================================================================
// DEVICE STATE
// =============================================================================

/// Everything behind the gate.
pub(crate) struct DeviceState {
    /// Mapped BAR windows
    pub(crate) bars: BarSet,
    /// DMA protocol state (ring tail, scratch mappings)
    pub(crate) engine: DmaEngine,
    /// Driver-owned circular page pool
    pub(crate) pool: PagePool,
    /// The at-most-one pinned user region
    pub(crate) pinned: Option<PinnedRegion>,
    /// Platform page pinning service
    pub(crate) pinner: Box<dyn PagePinner + Send>,
    /// Platform bus mapping service
    pub(crate) mapper: Box<dyn BusMapper + Send>,
    /// Hardware clock domain time source
    pub(crate) clock: Box<dyn TimeSource + Send>,
}

// =============================================================================
// DEVICE
// =============================================================================

/// An attached accelerator card.
///
/// Every method runs strictly inside one acquire/release bracket of the
/// operation gate; a blocked caller can be cancelled through
/// [`Device::cancel_signal`] and retries safely, since no register is
/// touched before acquisition succeeds.
pub struct Device {
    pub(crate) gate: OpGate<DeviceState>,
    pub(crate) cancel: Arc<CancelSignal>,
    pub(crate) config: EngineCommonConfig,
}

impl Device {
    // =========================================================================
    // Register access
    // =========================================================================

    /// Read a 32-bit word from a BAR window.
    pub fn read_register(&self, bar: BarIndex, offset: u64) -> Result<u32> {
        let st = self.gate.lock(&self.cancel)?;
        st.bars.read32(bar, offset)
    }

    /// Write a 32-bit word to a BAR window.
    pub fn write_register(&self, bar: BarIndex, offset: u64, value: u32) -> Result<()> {
        let st = self.gate.lock(&self.cancel)?;
        st.bars.write32(bar, offset, value)
    }

    // =========================================================================
    // Descriptor protocol
    // =========================================================================

    /// Program a descriptor slot; when the request is enabled, arm the
    /// engine and wait out the transfer.
    ///
    /// The request offset is translated against the pinned region if
    /// one is registered, otherwise against the pool window.
    pub fn write_descriptor(&self, req: &TransferRequest) -> Result<TransferPhase> {
        let mut guard = self.gate.lock(&self.cancel)?;
        let st = &mut *guard;

        let target = resolve_target(st.pinned.as_ref(), &st.pool, req.offset, req.length)?;
        st.engine
            .write_descriptor(&st.bars, st.mapper.as_mut(), st.clock.as_ref(), req, target)
    }

    /// Read a descriptor slot's status counters, in real units.
    pub fn read_descriptor(&self, index: usize) -> Result<DescriptorStatus> {
        let st = self.gate.lock(&self.cancel)?;
        st.engine.read_descriptor(&st.bars, index)
    }

    /// Set the number of concurrent memory-read-request tags (1..=32).
    pub fn set_window_size(&self, window: u64) -> Result<()> {
        let mut guard = self.gate.lock(&self.cancel)?;
        let st = &mut *guard;
        st.engine.set_window_size(&st.bars, window)
    }

    /// Read back the configured read-request window.
    pub fn window_size(&self) -> Result<u64> {
        let st = self.gate.lock(&self.cancel)?;
        st.engine.window_size(&st.bars)
    }

    // =========================================================================
    // Pinned region
    // =========================================================================

    /// Pin `[base, base + length)` and install its translation table.
    ///
    /// A region already registered on this handle is fully released
    /// first — registration replaces, it never leaks.
    pub fn register_buffer(&self, base: usize, length: u64, page_size: u64) -> Result<()> {
        let mut guard = self.gate.lock(&self.cancel)?;
        let st = &mut *guard;

        if let Some(old) = st.pinned.take() {
            old.release(st.pinner.as_mut());
        }
        st.pinned = Some(PinnedRegion::register(
            st.pinner.as_mut(),
            base,
            length,
            page_size,
        )?);
        Ok(())
    }

    /// Release the registered region, if any.
    ///
    /// Idempotent: a second call with no active region is a no-op, not
    /// an error. The unpin runs exactly once.
    pub fn unregister_buffer(&self) -> Result<()> {
        let mut guard = self.gate.lock(&self.cancel)?;
        let st = &mut *guard;

        if let Some(region) = st.pinned.take() {
            region.release(st.pinner.as_mut());
        }
        Ok(())
    }

    /// Whether a pinned region is currently registered.
    pub fn buffer_registered(&self) -> Result<bool> {
        let st = self.gate.lock(&self.cancel)?;
        Ok(st.pinned.is_some())
    }

    // =========================================================================
    // Circular pool
    // =========================================================================

    /// Hand out `count` pool pages for a new mapping.
    pub fn acquire_pages(&self, count: usize) -> Result<PageRun> {
        let mut st = self.gate.lock(&self.cancel)?;
        st.pool.acquire(count)
    }

    /// Retire `count` pool pages of the oldest mapping.
    pub fn release_pages(&self, count: usize) -> Result<()> {
        let mut st = self.gate.lock(&self.cancel)?;
        st.pool.release(count)
    }

    // =========================================================================
    // Attach-time state
    // =========================================================================

    /// The DMA core parameters negotiated at attach.
    pub fn common_config(&self) -> EngineCommonConfig {
        self.config
    }

    /// The signal that cancels a blocked gate wait.
    ///
    /// Raising it makes pending and subsequent operations return
    /// [`basalt_core::Error::Interrupted`] until it is cleared.
    pub fn cancel_signal(&self) -> Arc<CancelSignal> {
        Arc::clone(&self.cancel)
    }
}
