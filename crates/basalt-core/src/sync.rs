//! # Operation Gate
//!
//! The single-operation concurrency gate serializing all
//! hardware-touching calls on a device handle.
//!
//! One binary resource guards the whole control path: at most one
//! operation is in flight system-wide for a given device. The wait is
//! cancellable through a [`CancelSignal`]; a cancelled wait performs no
//! hardware operation, so it is always safe to retry.

use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Spin iterations between cancellation checks while waiting.
const WAIT_SPIN_BATCH: u32 = 64;

// =============================================================================
// CANCEL SIGNAL
// =============================================================================

/// External cancellation signal for gate waits.
///
/// Setting the signal makes every in-progress and future [`OpGate::lock`]
/// return [`Error::Interrupted`] until the signal is cleared.
#[derive(Debug)]
pub struct CancelSignal(AtomicBool);

impl CancelSignal {
    /// Create a new, unset signal
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the signal
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the signal so waits can proceed again
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Check whether the signal is raised
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// =============================================================================
// OPERATION GATE
// =============================================================================

/// Cancellable binary gate protecting the device state.
///
/// Wraps a spinlock so the blocking point is the only place a caller can
/// wait, and the wait itself can be abandoned without touching hardware.
#[derive(Debug)]
pub struct OpGate<T> {
    inner: spin::Mutex<T>,
}

/// RAII guard for the gate; releases on drop.
pub struct OpGuard<'a, T>(spin::MutexGuard<'a, T>);

impl<T> OpGate<T> {
    /// Create a gate around the protected state
    pub const fn new(state: T) -> Self {
        Self {
            inner: spin::Mutex::new(state),
        }
    }

    /// Acquire the gate, blocking until it is free.
    ///
    /// Returns [`Error::Interrupted`] if `cancel` is raised while
    /// waiting. No hardware operation happens before acquisition
    /// succeeds, so an interrupted wait leaves no partial state.
    pub fn lock<'a>(&'a self, cancel: &CancelSignal) -> Result<OpGuard<'a, T>> {
        loop {
            if let Some(guard) = self.inner.try_lock() {
                return Ok(OpGuard(guard));
            }
            if cancel.is_set() {
                return Err(Error::Interrupted);
            }
            for _ in 0..WAIT_SPIN_BATCH {
                core::hint::spin_loop();
            }
        }
    }

    /// Acquire the gate without blocking
    pub fn try_lock(&self) -> Option<OpGuard<'_, T>> {
        self.inner.try_lock().map(OpGuard)
    }

    /// Access the state through exclusive ownership (teardown path)
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T> Deref for OpGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for OpGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}
