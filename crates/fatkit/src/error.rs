//! Error taxonomy.
//!
//! Each concern gets its own enum rather than one crate-wide error type: a caller decoding a
//! directory never needs to match on carving errors. [`fatkit_core::DeviceError`] is folded in
//! via `#[from]` wherever a device read can fail.

use alloc::string::String;
use fatkit_core::DeviceError;

/// Errors from parsing or encoding a boot sector.
#[derive(Debug, thiserror::Error)]
pub enum BootSectorError {
    #[error("buffer too short to hold a boot sector")]
    ShortBuffer,
    #[error("field `{0}` is zero and cannot be")]
    ZeroField(&'static str),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Errors walking a cluster chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("cluster chain revisits cluster {0}, or is otherwise cyclic")]
    Cycle(u32),
    #[error("cluster {0} is out of range for this volume")]
    OutOfRange(u32),
    #[error("cluster chain exceeded the configured safety limit")]
    TooLong,
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Errors from the recovery state machine.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("no plausible boot sector parameters were found")]
    NoCandidate,
    #[error("recovery was cancelled")]
    Cancelled,
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Top-level error returned by file extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("path refers to a directory, not a file")]
    IsDirectory,
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}
