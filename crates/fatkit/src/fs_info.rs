//! FSINFO sector: a FAT32-only, advisory free-cluster hint. Never authoritative -- a FAT32
//! driver must treat its counts as hints and is permitted to ignore them -- but worth surfacing
//! as a diagnostic cross-check against what a full FAT scan finds.

use fatkit_core::device::BlockDevice;

use crate::error::BootSectorError;
use crate::layout::{FatVariant, Layout};
use crate::structures::raw::fs_info::RawFsInfo;

const LEAD_SIGNATURE: u32 = 0x4161_5252;
const STRUCT_SIGNATURE: u32 = 0x6141_7272;
const TRAIL_SIGNATURE: u32 = 0xAA55_0000;
/// FSI_Free_Count / FSI_Nxt_Free value meaning "unknown, do not trust".
const UNKNOWN: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsInfo {
    pub free_cluster_count: Option<u32>,
    pub next_free_cluster: Option<u32>,
    pub signatures_valid: bool,
}

/// Reads and decodes the FSINFO sector for a FAT32 volume. Returns `Ok(None)` for FAT12/16
/// (which have no FSINFO sector at all, not an error).
pub fn read<D: BlockDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
) -> Result<Option<FsInfo>, BootSectorError> {
    if layout.fat_variant() != FatVariant::Fat32 || layout.fs_info_sector == 0 {
        return Ok(None);
    }
    let mut buf = [0u8; 512];
    device.read_sectors(layout.fs_info_sector as u64, &mut buf)?;
    let raw = RawFsInfo::from_bytes(&buf);

    let lead = u32::from_le_bytes(raw.signature);
    let structsig = u32::from_le_bytes(raw.structure_signature);
    let trail = u32::from_le_bytes(raw.trail_signature);
    let signatures_valid = lead == LEAD_SIGNATURE && structsig == STRUCT_SIGNATURE && trail == TRAIL_SIGNATURE;

    let free_count = u32::from_le_bytes(raw.free_count);
    let next_free = u32::from_le_bytes(raw.next_free);

    Ok(Some(FsInfo {
        free_cluster_count: (free_count != UNKNOWN).then_some(free_count),
        next_free_cluster: (next_free != UNKNOWN).then_some(next_free),
        signatures_valid,
    }))
}
