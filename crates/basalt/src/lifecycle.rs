//! # Device Lifecycle
//!
//! Attach builds the handle out of the resources the platform layer
//! negotiated; detach tears everything down in strictly reverse order
//! of acquisition.

use alloc::boxed::Box;
use alloc::sync::Arc;

use basalt_core::{BusMapper, CancelSignal, OpGate, PagePinner, PhysAddr, Result, TimeSource};
use basalt_dma::{DmaEngine, EngineCommonConfig};
use basalt_hal::bar::BarSet;
use basalt_mem::PagePool;

use crate::device::{Device, DeviceState};

// =============================================================================
// ATTACH RESOURCES
// =============================================================================

/// What the platform layer hands over at attach time.
///
/// The excluded collaborators — PCIe enumeration, BAR mapping, coherent
/// allocation — produce these; the control path only consumes them.
pub struct DeviceResources {
    /// Mapped BAR windows; BAR0 must be present
    pub bars: BarSet,
    /// Physical base of the coherent pool buffer
    /// (`MAX_PAGES * PAGE_SIZE` bytes)
    pub pool_base: PhysAddr,
    /// Page pinning service
    pub pinner: Box<dyn PagePinner + Send>,
    /// Bus mapping service
    pub mapper: Box<dyn BusMapper + Send>,
    /// Hardware clock domain time source
    pub clock: Box<dyn TimeSource + Send>,
}

// =============================================================================
// ATTACH / DETACH
// =============================================================================

impl Device {
    /// Attach to the card.
    ///
    /// Reads the negotiated common configuration from BAR0 — an
    /// unmapped BAR0 fails here, before any handle exists — and anchors
    /// the circular pool over its coherent buffer.
    pub fn attach(resources: DeviceResources) -> Result<Self> {
        let config = EngineCommonConfig::read(&resources.bars)?;
        log::debug!(
            "attach: payload {}, read request {}",
            config.max_payload(),
            config.max_read_request()
        );

        let state = DeviceState {
            bars: resources.bars,
            engine: DmaEngine::new(),
            pool: PagePool::new(resources.pool_base),
            pinned: None,
            pinner: resources.pinner,
            mapper: resources.mapper,
            clock: resources.clock,
        };

        log::info!("device ready");
        Ok(Self {
            gate: OpGate::new(state),
            cancel: Arc::new(CancelSignal::new()),
            config,
        })
    }

    /// Detach from the card, consuming the handle.
    ///
    /// Equivalent to dropping it; the explicit form reads better at
    /// call sites that detach mid-function.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for Device {
    /// Release everything in strictly reverse order of acquisition:
    /// quiesce the engine, drain the pool, unregister the pinned
    /// region, then forget the BAR windows.
    fn drop(&mut self) {
        let st = self.gate.get_mut();

        st.engine.quiesce(&st.bars, st.mapper.as_mut(), st.clock.as_ref());

        let live = st.pool.live_pages();
        if st.pool.release(live).is_err() {
            log::warn!("pool in inconsistent state at detach");
        }

        if let Some(region) = st.pinned.take() {
            region.release(st.pinner.as_mut());
        }

        st.bars.forget_all();
        log::debug!("device detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fake_bars, RecordingMapper, RecordingPinner, SteppingClock};
    use basalt_core::{Error, PAGE_SIZE};
    use basalt_dma::{TransferDirection, TransferRequest};
    use basalt_hal::regs::{self, common};

    fn resources(bars: BarSet) -> (DeviceResources, crate::testutil::PinLog) {
        let (pinner, log) = RecordingPinner::new();
        (
            DeviceResources {
                bars,
                pool_base: PhysAddr::new(0x4000_0000),
                pinner: Box::new(pinner),
                mapper: Box::new(RecordingMapper::default()),
                clock: Box::new(SteppingClock::new(1)),
            },
            log,
        )
    }

    #[test]
    fn test_attach_requires_bar0() {
        let (res, _log) = resources(BarSet::new());
        assert_eq!(Device::attach(res).err(), Some(Error::UnmappedBar));
    }

    #[test]
    fn test_attach_decodes_common_config() {
        let (buf, bars) = fake_bars();
        // Negotiated: payload 256B, read request 4096B, irq enabled.
        let word = 0b001u64 | (0b101 << 3) | (1 << common::IRQ_ENABLE);
        bars.write64(crate::BarIndex::Bar0, regs::COMMON_BLOCK, word).unwrap();

        let (res, _log) = resources(bars);
        let device = Device::attach(res).unwrap();
        let config = device.common_config();
        assert_eq!(config.max_payload().as_bytes(), 256);
        assert_eq!(config.max_read_request().as_bytes(), 4096);
        assert!(config.irq_enabled());
        drop(buf);
    }

    #[test]
    fn test_detach_releases_in_order() {
        let (buf, bars) = fake_bars();
        let (res, pin_log) = resources(bars);

        // Swap in a mapper whose log survives the device.
        let (mapper, unmap_log) = RecordingMapper::with_log();
        let res = DeviceResources {
            mapper: Box::new(mapper),
            ..res
        };

        let device = Device::attach(res).unwrap();

        // Leave all three kinds of state outstanding.
        device.register_buffer(0x0, PAGE_SIZE, PAGE_SIZE).unwrap();
        device.acquire_pages(8).unwrap();
        device
            .write_descriptor(&TransferRequest {
                index: 0,
                offset: 0,
                length: 64,
                direction: TransferDirection::DEVICE_TO_HOST,
                enable: false,
            })
            .unwrap();

        device.detach();

        // The leftover scratch mapping was dropped and the pinned page
        // was released dirty, exactly once each.
        assert_eq!(unmap_log.lock().unwrap().len(), 1);
        let pins = pin_log.lock().unwrap();
        assert_eq!(pins.unpinned.len(), 1);
        assert!(pins.unpinned[0].1);
        drop(buf);
    }

    #[test]
    fn test_detach_with_nothing_outstanding() {
        let (buf, bars) = fake_bars();
        let (res, pin_log) = resources(bars);

        Device::attach(res).unwrap().detach();
        assert!(pin_log.lock().unwrap().unpinned.is_empty());
        drop(buf);
    }
}
