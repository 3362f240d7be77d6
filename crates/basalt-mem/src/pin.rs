//! # Pinned Region
//!
//! A user-supplied buffer locked in physical memory for DMA, with its
//! per-page physical address table.
//!
//! The engine holds raw physical addresses for as long as the region is
//! registered; the pages must not be reclaimed, swapped, or repurposed
//! in that window. That precondition cannot be enforced from here — a
//! caller that frees registered memory can freeze the card.

use arrayvec::ArrayVec;
use basalt_core::{Error, PagePinner, PhysAddr, Result, MAX_REGION_PAGES};

// =============================================================================
// PINNED REGION
// =============================================================================

/// A registered, pinned user buffer.
///
/// At most one region is active per device handle. The region records
/// the physical base of every page spanned by the buffer, in order, so
/// the translator can resolve an offset with one table lookup.
#[derive(Debug)]
pub struct PinnedRegion {
    /// User virtual base of the buffer
    base: usize,
    /// Registered length in bytes
    length: u64,
    /// Page granularity the buffer was registered with
    page_size: u64,
    /// Physical base of each spanned page, indexed by page number
    pages: ArrayVec<PhysAddr, MAX_REGION_PAGES>,
}

impl PinnedRegion {
    /// Pin `[base, base + length)` at `page_size` granularity and build
    /// the translation table.
    ///
    /// The spanned page range is inclusive of the partial pages at both
    /// ends. If any page fails to pin, every page already pinned by this
    /// call is unpinned before the error returns — a failed registration
    /// leaks nothing.
    pub fn register(
        pinner: &mut dyn PagePinner,
        base: usize,
        length: u64,
        page_size: u64,
    ) -> Result<Self> {
        if length == 0 || page_size == 0 {
            return Err(Error::InvalidParameter);
        }

        let first_page = base as u64 / page_size;
        let last_page = (base as u64 + length - 1) / page_size;
        let npages = (last_page - first_page + 1) as usize;

        if npages > MAX_REGION_PAGES {
            return Err(Error::RegionTooLarge);
        }

        let mut pages: ArrayVec<PhysAddr, MAX_REGION_PAGES> = ArrayVec::new();
        for n in 0..npages {
            let page_virt = ((first_page + n as u64) * page_size) as usize;
            match pinner.pin(page_virt, page_size) {
                Ok(phys) => pages.push(phys),
                Err(_) => {
                    // Roll back everything pinned so far; nothing was
                    // handed to the hardware yet, so clean unpin.
                    log::error!("pin failed at page {} of {}, rolling back", n, npages);
                    while let Some(phys) = pages.pop() {
                        pinner.unpin(phys, false);
                    }
                    return Err(Error::PinFailed);
                }
            }
        }

        log::debug!(
            "registered region: base 0x{:x}, {} bytes, {} page(s) of {}",
            base,
            length,
            npages,
            page_size
        );

        Ok(Self {
            base,
            length,
            page_size,
            pages,
        })
    }

    /// Release every pinned page exactly once.
    ///
    /// Pages are marked dirty before release: the device may have
    /// written them.
    pub fn release(self, pinner: &mut dyn PagePinner) {
        log::debug!("releasing region: {} page(s)", self.pages.len());
        for phys in self.pages {
            pinner.unpin(phys, true);
        }
    }

    /// User virtual base of the buffer
    pub fn base(&self) -> usize {
        self.base
    }

    /// Registered length in bytes
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Page granularity of the translation table
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of pages in the translation table
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Physical base of page `n`, if the table covers it
    pub fn page(&self, n: usize) -> Option<PhysAddr> {
        self.pages.get(n).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    /// Pinner that hands out predictable physical pages and records
    /// every pin/unpin so tests can audit the lifecycle.
    #[derive(Default)]
    struct RecordingPinner {
        pinned: Vec<usize>,
        unpinned: Vec<(PhysAddr, bool)>,
        fail_after: Option<usize>,
    }

    impl PagePinner for RecordingPinner {
        fn pin(&mut self, virt: usize, _len: u64) -> Result<PhysAddr> {
            if let Some(limit) = self.fail_after {
                if self.pinned.len() >= limit {
                    return Err(Error::PinFailed);
                }
            }
            self.pinned.push(virt);
            Ok(PhysAddr::new(0x10_0000 + virt as u64))
        }

        fn unpin(&mut self, phys: PhysAddr, dirty: bool) {
            self.unpinned.push((phys, dirty));
        }
    }

    #[test]
    fn test_register_spans_inclusive_pages() {
        let mut pinner = RecordingPinner::default();

        // 8192 bytes starting mid-page span three 4K pages.
        let region = PinnedRegion::register(&mut pinner, 0x2100, 8192, 4096).unwrap();
        assert_eq!(region.page_count(), 3);
        assert_eq!(pinner.pinned, std::vec![0x2000, 0x3000, 0x4000]);
        assert_eq!(region.page(0), Some(PhysAddr::new(0x10_0000 + 0x2000)));
        assert_eq!(region.page(3), None);
    }

    #[test]
    fn test_partial_failure_rolls_back() {
        let mut pinner = RecordingPinner {
            fail_after: Some(2),
            ..Default::default()
        };

        let err = PinnedRegion::register(&mut pinner, 0x0, 3 * 4096, 4096).unwrap_err();
        assert_eq!(err, Error::PinFailed);
        // Both successfully pinned pages were released, clean (not dirty).
        assert_eq!(pinner.unpinned.len(), 2);
        assert!(pinner.unpinned.iter().all(|&(_, dirty)| !dirty));
    }

    #[test]
    fn test_release_marks_dirty() {
        let mut pinner = RecordingPinner::default();
        let region = PinnedRegion::register(&mut pinner, 0x0, 4096, 4096).unwrap();

        region.release(&mut pinner);
        assert_eq!(pinner.unpinned.len(), 1);
        assert!(pinner.unpinned[0].1);
    }

    #[test]
    fn test_oversized_span_rejected_before_pinning() {
        let mut pinner = RecordingPinner::default();
        let err = PinnedRegion::register(
            &mut pinner,
            0x0,
            (MAX_REGION_PAGES as u64 + 1) * 4096,
            4096,
        )
        .unwrap_err();
        assert_eq!(err, Error::RegionTooLarge);
        assert!(pinner.pinned.is_empty());
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut pinner = RecordingPinner::default();
        assert_eq!(
            PinnedRegion::register(&mut pinner, 0x1000, 0, 4096).unwrap_err(),
            Error::InvalidParameter
        );
    }
}
