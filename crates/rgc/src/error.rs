//! Error Module - RGC Error Types
//!
//! Defines all error types used in RGC.
//!
//! # Error Categories
//!
//! ## Memory Errors
//! - `ScratchOverflow` - Scratch buffer exhaustion
//! - `InvalidPointer` - Null or invalid address
//!
//! ## Configuration Errors
//! - `Configuration` - Invalid configuration
//! - `InvalidArgument` - Invalid function argument
//!
//! ## Bugs
//! - `Internal` - Invariant violation inside the runtime
//!
//! Corruption of runtime-owned structures (LIFO order violations,
//! freeing an unknown address, live objects left at shutdown) is not
//! represented here. Those are unrecoverable bugs in the embedding and
//! fail fast via assertions instead of flowing through `Result`.

use thiserror::Error;

/// Main error type for all RGC operations
#[derive(Debug, Error)]
pub enum RgcError {
    /// Scratch allocator exhaustion
    ///
    /// **When returned:** A scratch allocation request exceeds the
    /// remaining capacity of the buffer.
    ///
    /// **Recovery strategy:** Unwind the current call and release
    /// outstanding scratch regions, or configure a larger buffer.
    #[error("Scratch overflow: requested {requested} bytes, available {available} bytes")]
    ScratchOverflow { requested: usize, available: usize },

    /// Invalid address
    ///
    /// **When returned:** Null (0x0) or obviously invalid address
    /// passed where a heap object was required.
    ///
    /// **Recovery strategy:** Fix caller to provide a valid reference.
    #[error("Invalid pointer address: {address:#x}")]
    InvalidPointer { address: usize },

    /// Configuration error
    ///
    /// **When returned:** Invalid configuration detected at startup.
    ///
    /// **Recovery strategy:** Use default configuration or fail fast.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid argument
    ///
    /// **When returned:** Function argument fails validation, e.g. a
    /// non-array type handle passed to an array allocation.
    ///
    /// **Recovery strategy:** Fix caller to provide valid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error - indicates a bug in RGC
    ///
    /// **When returned:** Invariant violation or unexpected state.
    ///
    /// **Recovery strategy:** Cannot recover - this is a bug.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RgcError {
    /// Check if this error is recoverable by the caller
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RgcError::ScratchOverflow { .. }
                | RgcError::InvalidPointer { .. }
                | RgcError::InvalidArgument(_)
        )
    }

    /// Check if this error indicates a bug in the code
    pub fn is_bug(&self) -> bool {
        matches!(self, RgcError::Internal(_))
    }
}

/// Result type alias for RGC operations
pub type Result<T> = std::result::Result<T, RgcError>;
