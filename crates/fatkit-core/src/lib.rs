#![cfg_attr(not(feature = "std"), no_std)]

//! Shared primitives used by the `fatkit` analyzer/recovery library and its CLI: block device
//! access, fixed-width ASCII strings, and DOS-style path splitting.
//!
//! Cargo features:
//! - `alloc`: enables `MemoryDevice` and other heap-backed helpers.
//! - `std` (default): enables `FileDevice` and everything `alloc` enables.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod bpb;
pub mod device;
pub mod path;
pub mod str;
pub mod time;

pub use device::{BlockDevice, BlockDeviceMut, DeviceError, SECTOR_SIZE};
pub use time::UtcTime;
