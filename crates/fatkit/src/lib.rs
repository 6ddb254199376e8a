//! FAT12/FAT16/FAT32 volume analysis and recovery.
//!
//! This crate reads a FAT volume (a raw disk image or a [`fatkit_core::BlockDevice`] of any
//! kind) and answers three kinds of question about it: what is actually on it right now (boot
//! sector, FAT tables, directory tree), what *used* to be on it (deleted directory entries and
//! their still-intact clusters), and what file fragments can be found by content alone when the
//! metadata itself can't be trusted (signature-based carving).
//!
//! It never writes to a volume except through the opt-in `recovery` feature's boot-sector
//! rebuild path, and even then only after a caller explicitly applies a proposed [`layout::Layout`].
//!
//! ## Cargo features
//! - `alloc` -- enables the owned, heap-backed types ([`tree::TreeNode`], carve/extract results).
//! - `std` (default) -- enables [`fatkit_core::device::FileDevice`] and everything `alloc` enables.
//! - `recovery` -- enables [`recovery`]'s brute-force boot sector search and the boot-sector
//!   rebuild/write path.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(not(target_endian = "little"))]
compile_error!("This crate only supports little endian systems");

pub mod config;
pub mod layout;
pub mod structures;

#[cfg(feature = "alloc")]
pub mod error;
#[cfg(feature = "alloc")]
pub mod fs_info;

#[cfg(feature = "alloc")]
pub mod boot_sector;
#[cfg(feature = "alloc")]
pub mod carve;
#[cfg(feature = "alloc")]
pub mod chain;
#[cfg(feature = "alloc")]
pub mod extract;
#[cfg(feature = "alloc")]
pub mod fat;
#[cfg(feature = "alloc")]
pub mod tree;

#[cfg(all(feature = "alloc", feature = "recovery"))]
pub mod recovery;

pub use config::ScanConfig;
pub use layout::{FatVariant, Layout};

#[cfg(feature = "alloc")]
pub use error::{BootSectorError, ChainError, ExtractError, RecoveryError};
