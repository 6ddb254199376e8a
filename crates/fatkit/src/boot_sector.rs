//! Boot sector parsing and validation.
//!
//! [`parse`] turns 512 raw bytes into a [`Layout`] plus a list of [`Finding`]s; it never fails
//! outright on implausible fields, it just accumulates findings, since that is exactly the
//! information [`crate::recovery`] needs when the primary boot sector is too damaged to trust.

extern crate alloc;

use fatkit_core::device::BlockDevice;

use crate::error::BootSectorError;
use crate::layout::{FatVariant, Layout};
use crate::structures::FatStr;
use crate::structures::raw::boot_sector::{MediaType, RawBootSector};

/// Maximum fraction by which a device's actual sector count may diverge from a boot sector's
/// declared `total_sectors` before [`check_device_size`] raises [`Finding::DeviceSizeMismatch`].
pub const DEVICE_SIZE_TOLERANCE: f64 = 0.05;

/// A single validation complaint about a parsed boot sector. Severity is advisory: callers
/// doing a plain read can ignore `findings` entirely, while [`crate::recovery`] treats a
/// non-empty set as reason to prefer the backup copy or the brute-force search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    BadJumpInstruction,
    BadBytesPerSector(u16),
    BadSectorsPerCluster(u8),
    ZeroReservedSectors,
    BadFatCount(u8),
    UnknownMediaType(u8),
    BadSignatureWord(u16),
    /// FAT32 fields observed on what the cluster count says is a FAT12/16 volume, or vice versa.
    InconsistentVariantFields,
    /// The BPB's declared `total_sectors` differs from the device's actual sector count by more
    /// than [`DEVICE_SIZE_TOLERANCE`]. Raised only when the caller supplies a device size (see
    /// [`check_device_size`]); `parse` alone has no way to know it.
    DeviceSizeMismatch { declared: u32, actual: u64 },
}

/// A decoded boot sector: the derived [`Layout`] plus whatever [`Finding`]s were raised while
/// getting there, the volume label/serial for display, and whether it parsed as FAT32 (which
/// carries an FSINFO sector worth inspecting separately, see [`crate::fs_info`]).
#[derive(Debug, Clone)]
pub struct BootSector {
    pub layout: Layout,
    pub findings: alloc::vec::Vec<Finding>,
    pub oem_name: alloc::string::String,
    pub volume_label: alloc::string::String,
    pub volume_id: u32,
}

/// Parses a 512-byte boot sector buffer. Returns [`BootSectorError::ShortBuffer`] only if
/// `sector` is shorter than 512 bytes; every other irregularity becomes a [`Finding`] instead of
/// a hard error, reflecting that a FAT boot sector is a hint, not a contract the volume must
/// satisfy to be readable.
pub fn parse(sector: &[u8]) -> Result<BootSector, BootSectorError> {
    if sector.len() < 512 {
        return Err(BootSectorError::ShortBuffer);
    }
    let raw = RawBootSector::from_bytes(&sector[..512]);
    let bpb = &raw.bpb;

    let mut findings = alloc::vec::Vec::new();

    if !bpb.check_jump_boot() {
        findings.push(Finding::BadJumpInstruction);
    }
    let bytes_per_sector = u16::from_le_bytes(bpb.bytes_per_sector);
    if bytes_per_sector == 0 {
        return Err(BootSectorError::ZeroField("bytes_per_sector"));
    }
    if !bpb.check_bytes_per_sector() {
        findings.push(Finding::BadBytesPerSector(bytes_per_sector));
    }
    if bpb.sectors_per_cluster == 0 {
        return Err(BootSectorError::ZeroField("sectors_per_cluster"));
    }
    if !bpb.check_sectors_per_cluster() {
        findings.push(Finding::BadSectorsPerCluster(bpb.sectors_per_cluster));
    }
    if !bpb.check_reserved_sector_count() {
        findings.push(Finding::ZeroReservedSectors);
    }
    if !bpb.check_fat_count() {
        findings.push(Finding::BadFatCount(bpb.fat_count));
    }
    if MediaType::try_from(bpb.media_type).is_err() {
        findings.push(Finding::UnknownMediaType(bpb.media_type));
    }

    let reserved_sectors = u16::from_le_bytes(bpb.reserved_sector_count) as u32;
    let num_fats = bpb.fat_count;
    let root_entries = u16::from_le_bytes(bpb.root_entry_count);
    let total_sectors_16 = u16::from_le_bytes(bpb.total_sectors_16);
    let total_sectors_32 = u32::from_le_bytes(bpb.total_sectors_32);
    let total_sectors = if total_sectors_16 != 0 { total_sectors_16 as u32 } else { total_sectors_32 };
    if total_sectors == 0 {
        return Err(BootSectorError::ZeroField("total_sectors"));
    }
    let sectors_per_fat_16 = u16::from_le_bytes(bpb.sectors_per_fat_16);

    // FAT32 is the only variant with sectors_per_fat_16 == 0; it carries its own 32-bit field.
    let is_fat32_shaped = sectors_per_fat_16 == 0;

    let (sectors_per_fat, root_cluster, fs_info_sector, backup_boot_sector, signature, volume_id, volume_label) =
        if is_fat32_shaped {
            let ext = unsafe { raw.bpb_ext.bpb32 };
            (
                u32::from_le_bytes(ext.sectors_per_fat_32),
                u32::from_le_bytes(ext.root_cluster),
                u16::from_le_bytes(ext.fs_info_sector),
                u16::from_le_bytes(ext.boot_sector),
                u16::from_le_bytes(ext.signature_word),
                u32::from_le_bytes(ext.volume_id),
                FatStr::<11>::from_bytes(ext.volume_label).as_str().into(),
            )
        } else {
            let ext = unsafe { raw.bpb_ext.bpb16 };
            (
                sectors_per_fat_16 as u32,
                0,
                0,
                0,
                u16::from_le_bytes(ext.signature_word),
                u32::from_le_bytes(ext.volume_id),
                FatStr::<11>::from_bytes(ext.volume_label).as_str().into(),
            )
        };

    if signature != 0xAA55 {
        findings.push(Finding::BadSignatureWord(signature));
    }

    let layout = Layout {
        bytes_per_sector,
        sectors_per_cluster: bpb.sectors_per_cluster,
        reserved_sectors,
        num_fats,
        sectors_per_fat,
        root_entries,
        total_sectors,
        media_type: bpb.media_type,
        root_cluster,
        fs_info_sector,
        backup_boot_sector,
    };

    let variant_matches_shape = matches!(
        (is_fat32_shaped, layout.fat_variant()),
        (true, crate::layout::FatVariant::Fat32) | (false, crate::layout::FatVariant::Fat12 | crate::layout::FatVariant::Fat16)
    );
    if !variant_matches_shape {
        findings.push(Finding::InconsistentVariantFields);
    }

    let oem_name = FatStr::<8>::from_bytes(bpb.oem_name).as_str().into();

    Ok(BootSector { layout, findings, oem_name, volume_label, volume_id })
}

/// Reads sector 0 from `device`, parses it, and folds in a [`Finding::DeviceSizeMismatch`] if
/// the device's own sector count disagrees with what the boot sector declares.
pub fn read_primary<D: BlockDevice + ?Sized>(device: &mut D) -> Result<BootSector, BootSectorError> {
    let mut buf = [0u8; 512];
    device.read_sectors(0, &mut buf)?;
    let mut boot_sector = parse(&buf)?;
    if let Some(actual) = device.sector_count() {
        if let Some(finding) = check_device_size(&boot_sector.layout, actual) {
            boot_sector.findings.push(finding);
        }
    }
    Ok(boot_sector)
}

/// Compares a layout's declared `total_sectors` against a device's actual sector count, allowing
/// up to [`DEVICE_SIZE_TOLERANCE`] relative difference (an image truncated for transport, or a
/// device report that's inaccurate by a track or two, shouldn't read as corruption).
pub fn check_device_size(layout: &Layout, actual_sectors: u64) -> Option<Finding> {
    let declared = layout.total_sectors as u64;
    if declared == 0 || actual_sectors == 0 {
        return None;
    }
    let diff = declared.abs_diff(actual_sectors) as f64;
    let tolerance = declared.max(actual_sectors) as f64 * DEVICE_SIZE_TOLERANCE;
    if diff > tolerance {
        Some(Finding::DeviceSizeMismatch { declared: layout.total_sectors, actual: actual_sectors })
    } else {
        None
    }
}

/// Encodes a [`Layout`] into a conformant 512-byte boot sector, the inverse of [`parse`].
/// Branches on [`Layout::fat_variant`] to write either the FAT32 or FAT12/16 extended BPB;
/// both get the `0x29` extended-boot-signature byte, a `NO NAME`-style volume label, and the
/// matching `fs_type` string, since `mkfs.fat` always writes these even though nothing actually
/// requires them.
pub fn encode(layout: &Layout) -> [u8; 512] {
    let mut sector = [0u8; 512];

    sector[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    sector[3..11].copy_from_slice(b"fatkit  ");
    sector[11..13].copy_from_slice(&layout.bytes_per_sector.to_le_bytes());
    sector[13] = layout.sectors_per_cluster;
    sector[14..16].copy_from_slice(&(layout.reserved_sectors as u16).to_le_bytes());
    sector[16] = layout.num_fats;
    sector[17..19].copy_from_slice(&layout.root_entries.to_le_bytes());
    if layout.total_sectors <= u16::MAX as u32 {
        sector[19..21].copy_from_slice(&(layout.total_sectors as u16).to_le_bytes());
    } else {
        sector[32..36].copy_from_slice(&layout.total_sectors.to_le_bytes());
    }
    sector[21] = layout.media_type;
    sector[24..26].copy_from_slice(&0u16.to_le_bytes());
    sector[26..28].copy_from_slice(&0u16.to_le_bytes());
    sector[28..32].copy_from_slice(&0u32.to_le_bytes());

    if layout.fat_variant() == FatVariant::Fat32 {
        sector[22..24].copy_from_slice(&0u16.to_le_bytes());
        sector[36..40].copy_from_slice(&layout.sectors_per_fat.to_le_bytes());
        sector[40..42].copy_from_slice(&0u16.to_le_bytes());
        sector[42..44].copy_from_slice(&0u16.to_le_bytes());
        sector[44..48].copy_from_slice(&layout.root_cluster.to_le_bytes());
        sector[48..50].copy_from_slice(&layout.fs_info_sector.to_le_bytes());
        sector[50..52].copy_from_slice(&layout.backup_boot_sector.to_le_bytes());
        sector[64] = 0x80;
        sector[65] = 0;
        sector[66] = 0x29;
        sector[67..71].copy_from_slice(&0u32.to_le_bytes());
        sector[71..82].copy_from_slice(b"NO NAME    ");
        sector[82..90].copy_from_slice(b"FAT32   ");
    } else {
        sector[22..24].copy_from_slice(&(layout.sectors_per_fat as u16).to_le_bytes());
        sector[36] = 0x80;
        sector[37] = 0;
        sector[38] = 0x29;
        sector[39..43].copy_from_slice(&0u32.to_le_bytes());
        sector[43..54].copy_from_slice(b"NO NAME    ");
        let fs_type: &[u8; 8] = if layout.fat_variant() == FatVariant::Fat12 { b"FAT12   " } else { b"FAT16   " };
        sector[54..62].copy_from_slice(fs_type);
    }

    sector[510] = 0x55;
    sector[511] = 0xAA;
    sector
}
