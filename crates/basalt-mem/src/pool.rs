//! # Circular Page Pool
//!
//! The driver-owned ring of pages backing memory-mapped buffers,
//! independent of user pinning.
//!
//! The pool sits over one physically contiguous buffer of
//! [`MAX_PAGES`] 4-KiB pages allocated at attach. Mappings are handed
//! out from the `last` cursor and retired from the `first` cursor;
//! pages between `first` (inclusive) and `last` (exclusive) are live.
//! The cursors only meet through the empty state.

use alloc::vec::Vec;

use basalt_core::{Error, PhysAddr, Result, MAX_PAGES, PAGE_SIZE};

// =============================================================================
// PAGE RUN
// =============================================================================

/// A run of pool pages handed to one mapping.
#[derive(Debug, Clone)]
pub struct PageRun {
    /// Slot index of the first page
    pub start: usize,
    /// Number of pages in the run
    pub count: usize,
    /// Physical base of each page, in slot order
    pub pages: Vec<PhysAddr>,
}

// =============================================================================
// PAGE POOL
// =============================================================================

/// Circular allocator over the driver-owned page buffer.
#[derive(Debug)]
pub struct PagePool {
    /// Physical base of the backing buffer
    base: PhysAddr,
    /// Oldest still-mapped page (inclusive)
    first: usize,
    /// Next page to hand out (exclusive end of the live window)
    last: usize,
    /// Whether any mapping is outstanding
    active: bool,
}

impl PagePool {
    /// Create the pool over its backing buffer.
    pub const fn new(base: PhysAddr) -> Self {
        Self {
            base,
            first: 0,
            last: 0,
            active: false,
        }
    }

    /// Hand out `count` consecutive slots starting at `last`.
    ///
    /// The run may not land on `first`: the ring keeps one slot of
    /// separation between the cursors, so from empty at most
    /// `MAX_PAGES - 1` pages are available. Failure mutates nothing.
    pub fn acquire(&mut self, count: usize) -> Result<PageRun> {
        if count == 0 || count > MAX_PAGES {
            return Err(Error::InvalidParameter);
        }
        if count > self.available() {
            log::debug!("pool exhausted: {} requested, {} free", count, self.available());
            return Err(Error::PoolExhausted);
        }

        let start = self.last;
        let pages = (0..count)
            .map(|n| {
                let slot = (start + n) % MAX_PAGES;
                self.base + (slot as u64) * PAGE_SIZE
            })
            .collect();

        self.last = (self.last + count) % MAX_PAGES;
        self.active = true;

        Ok(PageRun { start, count, pages })
    }

    /// Retire `count` pages from the `first` cursor.
    ///
    /// If the pool has already drained (`first == last`), the call only
    /// clears `active`. Advancing `first` past `last` would wrap the
    /// retire cursor into live pages; that is an internal invariant
    /// violation and fails loudly instead.
    pub fn release(&mut self, count: usize) -> Result<()> {
        if self.first == self.last {
            self.active = false;
            return Ok(());
        }

        if count > self.live_pages() {
            log::error!(
                "pool release of {} page(s) exceeds live window of {}",
                count,
                self.live_pages()
            );
            return Err(Error::PoolUnderflow);
        }

        self.first = (self.first + count) % MAX_PAGES;
        if self.first == self.last {
            self.active = false;
        }
        Ok(())
    }

    /// Free slots currently acquirable in one run.
    pub fn available(&self) -> usize {
        (self.first + MAX_PAGES - self.last - 1) % MAX_PAGES
    }

    /// Pages between `first` and `last`.
    pub fn live_pages(&self) -> usize {
        (self.last + MAX_PAGES - self.first) % MAX_PAGES
    }

    /// Oldest still-mapped slot
    pub fn first(&self) -> usize {
        self.first
    }

    /// Next slot to hand out
    pub fn last(&self) -> usize {
        self.last
    }

    /// Whether any mapping is outstanding
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Physical base of the backing buffer
    pub fn base(&self) -> PhysAddr {
        self.base
    }

    /// DMA target base of the current window.
    ///
    /// The pool is addressed as one contiguous byte range anchored at
    /// the `first` cursor; the raw cursor value is added to the base,
    /// matching the hardware contract observed on the reference design.
    pub fn window_base(&self) -> PhysAddr {
        self.base + self.first as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: PhysAddr = PhysAddr::new(0x4000_0000);

    #[test]
    fn test_acquire_advances_last_and_activates() {
        let mut pool = PagePool::new(BASE);

        let run = pool.acquire(3).unwrap();
        assert_eq!(run.start, 0);
        assert_eq!(run.count, 3);
        assert_eq!(run.pages[0], BASE);
        assert_eq!(run.pages[2], BASE + 2 * PAGE_SIZE);
        assert_eq!(pool.last(), 3);
        assert_eq!(pool.first(), 0);
        assert!(pool.is_active());
    }

    #[test]
    fn test_exhaustion_mutates_nothing() {
        let mut pool = PagePool::new(BASE);

        // From empty, one slot of separation leaves MAX_PAGES - 1 free.
        assert_eq!(pool.available(), MAX_PAGES - 1);
        pool.acquire(MAX_PAGES - 1).unwrap();

        let before = (pool.first(), pool.last());
        assert_eq!(pool.acquire(1).unwrap_err(), Error::PoolExhausted);
        assert_eq!((pool.first(), pool.last()), before);
        assert!(pool.is_active());
    }

    #[test]
    fn test_release_restores_empty_state() {
        let mut pool = PagePool::new(BASE);

        pool.acquire(5).unwrap();
        pool.release(5).unwrap();
        assert_eq!(pool.first(), pool.last());
        assert!(!pool.is_active());
    }

    #[test]
    fn test_release_on_drained_pool_clears_active() {
        let mut pool = PagePool::new(BASE);

        // Defensive case: cursors already equal, release only clears the
        // flag regardless of the count.
        pool.release(7).unwrap();
        assert!(!pool.is_active());
        assert_eq!(pool.first(), 0);
    }

    #[test]
    fn test_release_overrun_fails_loudly() {
        let mut pool = PagePool::new(BASE);

        pool.acquire(2).unwrap();
        assert_eq!(pool.release(3).unwrap_err(), Error::PoolUnderflow);
        // Live window untouched by the failed release.
        assert_eq!(pool.first(), 0);
        assert_eq!(pool.last(), 2);
        assert!(pool.is_active());
    }

    #[test]
    fn test_cursors_wrap_modulo_pool_size() {
        let mut pool = PagePool::new(BASE);

        pool.acquire(MAX_PAGES - 2).unwrap();
        pool.release(MAX_PAGES - 2).unwrap();
        assert_eq!(pool.first(), MAX_PAGES - 2);

        // The next run wraps through slot 0.
        let run = pool.acquire(4).unwrap();
        assert_eq!(run.start, MAX_PAGES - 2);
        assert_eq!(run.pages[1], BASE + ((MAX_PAGES - 1) as u64) * PAGE_SIZE);
        assert_eq!(run.pages[2], BASE);
        assert_eq!(pool.last(), 2);
    }

    #[test]
    fn test_window_base_tracks_first_cursor() {
        let mut pool = PagePool::new(BASE);

        assert_eq!(pool.window_base(), BASE);
        pool.acquire(8).unwrap();
        pool.release(3).unwrap();
        assert_eq!(pool.window_base(), BASE + 3);
    }
}
