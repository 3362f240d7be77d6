//! # Address Translation
//!
//! Conversion of a user-level `(offset, length)` into the physical
//! target address a descriptor is programmed with.
//!
//! Two sources exist: the pinned region's page table when a region is
//! registered, otherwise the circular pool's current window. A
//! descriptor carries a single physical base and length, so an
//! operation must resolve inside one page — a translation that crossed
//! a page boundary would point the engine at memory unrelated to the
//! caller's buffer.

use basalt_core::{Error, PhysAddr, Result};

use crate::pin::PinnedRegion;
use crate::pool::PagePool;

/// Resolve `(offset, length)` to the physical target of one descriptor.
///
/// With no region registered the pool window is addressed as one
/// contiguous byte range. With a region, `offset` selects a page of the
/// translation table and the operation must not straddle the page's
/// end.
pub fn resolve_target(
    pinned: Option<&PinnedRegion>,
    pool: &PagePool,
    offset: u64,
    length: u64,
) -> Result<PhysAddr> {
    let Some(region) = pinned else {
        return Ok(pool.window_base() + offset);
    };

    let page_size = region.page_size();
    let page = (offset / page_size) as usize;
    let in_page = offset % page_size;

    let Some(page_base) = region.page(page) else {
        return Err(Error::OffsetOutOfRange);
    };
    if in_page + length > page_size {
        return Err(Error::CrossesPageBoundary);
    }

    Ok(page_base + in_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_core::{PagePinner, PAGE_SIZE};

    struct FixedPinner(u64);

    impl PagePinner for FixedPinner {
        fn pin(&mut self, virt: usize, _len: u64) -> Result<PhysAddr> {
            Ok(PhysAddr::new(self.0 + virt as u64))
        }

        fn unpin(&mut self, _phys: PhysAddr, _dirty: bool) {}
    }

    fn pinned_region(length: u64) -> PinnedRegion {
        PinnedRegion::register(&mut FixedPinner(0x8000_0000), 0, length, PAGE_SIZE).unwrap()
    }

    #[test]
    fn test_pool_window_path() {
        let mut pool = PagePool::new(PhysAddr::new(0x4000_0000));

        assert_eq!(
            resolve_target(None, &pool, 0x40, 64).unwrap(),
            PhysAddr::new(0x4000_0040)
        );

        // The window is anchored at the first cursor.
        pool.acquire(4).unwrap();
        pool.release(2).unwrap();
        assert_eq!(
            resolve_target(None, &pool, 0x40, 64).unwrap(),
            PhysAddr::new(0x4000_0042)
        );
    }

    #[test]
    fn test_pinned_lookup_within_page() {
        let region = pinned_region(2 * PAGE_SIZE);

        // offset 100, length 200: inside page 0.
        assert_eq!(
            resolve_target(Some(&region), &PagePool::new(PhysAddr::null()), 100, 200).unwrap(),
            region.page(0).unwrap() + 100
        );
        // Second page resolves through its own table entry.
        assert_eq!(
            resolve_target(
                Some(&region),
                &PagePool::new(PhysAddr::null()),
                PAGE_SIZE + 8,
                16
            )
            .unwrap(),
            region.page(1).unwrap() + 8
        );
    }

    #[test]
    fn test_boundary_atomicity() {
        let region = pinned_region(2 * PAGE_SIZE);
        let pool = PagePool::new(PhysAddr::null());

        // offset % page + length > page is rejected...
        assert_eq!(
            resolve_target(Some(&region), &pool, PAGE_SIZE - 8, 9).unwrap_err(),
            Error::CrossesPageBoundary
        );
        assert_eq!(
            resolve_target(Some(&region), &pool, 1, PAGE_SIZE).unwrap_err(),
            Error::CrossesPageBoundary
        );
        // ...but ending exactly on the boundary is atomic and allowed.
        assert!(resolve_target(Some(&region), &pool, PAGE_SIZE - 8, 8).is_ok());
        assert!(resolve_target(Some(&region), &pool, 0, PAGE_SIZE).is_ok());
    }

    #[test]
    fn test_offset_beyond_table_rejected() {
        let region = pinned_region(PAGE_SIZE);
        let pool = PagePool::new(PhysAddr::null());

        assert_eq!(
            resolve_target(Some(&region), &pool, 2 * PAGE_SIZE, 4).unwrap_err(),
            Error::OffsetOutOfRange
        );
    }
}
