//! Shared mock implementations of the platform seams for the facade
//! tests: a heap-backed BAR0 window, a recording pinner/mapper pair,
//! and a deterministic clock.

use core::cell::Cell;
use std::boxed::Box;
use std::sync::{Arc, Mutex};
use std::vec;
use std::vec::Vec;

use basalt_core::{BusMapper, Error, PagePinner, PhysAddr, Result, TimeSource};
use basalt_hal::bar::{BarIndex, BarRegion, BarSet};
use basalt_hal::regs;

/// Fixed displacement the recording mapper applies, so programmed
/// addresses are distinguishable from raw targets.
pub(crate) const BUS_OFFSET: u64 = 0x1_0000_0000;

/// Heap-backed BAR0 window reaching through the common block. Backed
/// by u64 words so the window base is 8-aligned.
pub(crate) fn fake_bars() -> (Box<[u64]>, BarSet) {
    let bytes = (regs::COMMON_BLOCK + 8) as usize;
    let buf = vec![0u64; bytes / 8].into_boxed_slice();
    let mut bars = BarSet::new();
    // SAFETY: every test keeps the boxed buffer alive for as long as
    // the BarSet (and the Device built over it) exists.
    bars.set(BarIndex::Bar0, unsafe {
        BarRegion::new(buf.as_ptr() as usize, bytes as u64)
    });
    (buf, bars)
}

// =============================================================================
// RECORDING PINNER
// =============================================================================

/// Audit trail of a [`RecordingPinner`].
#[derive(Default)]
pub(crate) struct PinEvents {
    pub pinned: Vec<usize>,
    pub unpinned: Vec<(u64, bool)>,
    pub fail_after: Option<usize>,
}

pub(crate) type PinLog = Arc<Mutex<PinEvents>>;

/// Pinner handing out predictable physical pages while logging every
/// pin and unpin through a shared handle the test keeps.
pub(crate) struct RecordingPinner {
    log: PinLog,
}

impl RecordingPinner {
    pub(crate) fn new() -> (Self, PinLog) {
        let log = Arc::new(Mutex::new(PinEvents::default()));
        (Self { log: Arc::clone(&log) }, log)
    }
}

impl PagePinner for RecordingPinner {
    fn pin(&mut self, virt: usize, _len: u64) -> Result<PhysAddr> {
        let mut log = self.log.lock().unwrap();
        if let Some(limit) = log.fail_after {
            if log.pinned.len() >= limit {
                return Err(Error::PinFailed);
            }
        }
        log.pinned.push(virt);
        Ok(PhysAddr::new(0x8000_0000 + virt as u64))
    }

    fn unpin(&mut self, phys: PhysAddr, dirty: bool) {
        self.log.lock().unwrap().unpinned.push((phys.raw(), dirty));
    }
}

// =============================================================================
// RECORDING MAPPER
// =============================================================================

/// Identity-plus-offset mapper logging unmaps through a shared handle.
#[derive(Default)]
pub(crate) struct RecordingMapper {
    pub unmapped: Arc<Mutex<Vec<u64>>>,
}

impl RecordingMapper {
    pub(crate) fn with_log() -> (Self, Arc<Mutex<Vec<u64>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                unmapped: Arc::clone(&log),
            },
            log,
        )
    }
}

impl BusMapper for RecordingMapper {
    fn map(&mut self, target: PhysAddr, _len: u64) -> Result<PhysAddr> {
        Ok(target + BUS_OFFSET)
    }

    fn unmap(&mut self, bus: PhysAddr, _len: u64) {
        self.unmapped.lock().unwrap().push(bus.raw());
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// Clock advancing a fixed step per sample.
pub(crate) struct SteppingClock {
    now: Cell<u64>,
    step: u64,
}

impl SteppingClock {
    pub(crate) fn new(step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }
}

impl TimeSource for SteppingClock {
    fn now_us(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t + self.step);
        t
    }
}
