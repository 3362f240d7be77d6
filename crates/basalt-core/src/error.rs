//! # BASALT Error Handling
//!
//! Unified error types for the FPGA DMA control path.
//!
//! Error handling in BASALT follows these principles:
//! - Errors are typed and categorized by subsystem
//! - Local validation errors are raised before any hardware write
//! - A timeout is never masked as success
//! - No panics in production code paths

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// BASALT Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// BASALT unified error type
///
/// This enum covers all error conditions across the control path.
/// Errors are categorized by subsystem for easier debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// BAR index refers to a window that is not mapped
    UnmappedBar,
    /// Register access outside the mapped window
    OutOfBounds,
    /// Invalid parameter provided
    InvalidParameter,
    /// Region spans more pages than the translation table can hold
    RegionTooLarge,

    // =========================================================================
    // Range / Translation Errors
    // =========================================================================
    /// Descriptor index beyond the engine's descriptor array
    DescriptorOutOfRange,
    /// Offset falls outside the registered region
    OffsetOutOfRange,
    /// Transfer would straddle a page boundary
    CrossesPageBoundary,

    // =========================================================================
    // DMA Protocol Errors
    // =========================================================================
    /// Engine did not clear its enable bit within the poll bound
    Timeout,

    // =========================================================================
    // Memory Errors
    // =========================================================================
    /// A page could not be locked in physical memory
    PinFailed,
    /// A pinned region is already registered on this handle
    BufferAlreadyRegistered,
    /// No pinned region is registered on this handle
    NoBufferRegistered,
    /// The circular pool has no free run of the requested length
    PoolExhausted,
    /// A pool release would advance past the live window
    PoolUnderflow,
    /// Bus mapping for a DMA target failed
    MapFailed,

    // =========================================================================
    // Gate Errors
    // =========================================================================
    /// The wait for the operation gate was cancelled
    Interrupted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration
            Self::UnmappedBar => write!(f, "BAR is not mapped"),
            Self::OutOfBounds => write!(f, "access outside the mapped window"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::RegionTooLarge => write!(f, "region exceeds the translation table"),

            // Range / translation
            Self::DescriptorOutOfRange => write!(f, "descriptor index out of range"),
            Self::OffsetOutOfRange => write!(f, "offset outside the registered region"),
            Self::CrossesPageBoundary => write!(f, "transfer straddles a page boundary"),

            // DMA protocol
            Self::Timeout => write!(f, "engine poll timed out"),

            // Memory
            Self::PinFailed => write!(f, "page pinning failed"),
            Self::BufferAlreadyRegistered => write!(f, "a region is already registered"),
            Self::NoBufferRegistered => write!(f, "no region is registered"),
            Self::PoolExhausted => write!(f, "circular pool exhausted"),
            Self::PoolUnderflow => write!(f, "pool release exceeds live window"),
            Self::MapFailed => write!(f, "bus mapping failed"),

            // Gate
            Self::Interrupted => write!(f, "gate wait interrupted"),
        }
    }
}
