//! Signature-based file carving: scans raw device bytes for known file-type magic headers,
//! independent of any FAT metadata. Used when the FAT and/or directory structures are too
//! damaged to walk, or to recover fragments that were never referenced by a live or even
//! deleted directory entry.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use fatkit_core::device::BlockDevice;

/// One entry in the static signature table: a file kind, its header magic, and an optional
/// footer magic used to bound the carve.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub kind: &'static str,
    pub header: &'static [u8],
    pub footer: Option<&'static [u8]>,
}

/// The built-in signature table.
pub const SIGNATURES: &[Signature] = &[
    Signature { kind: "jpeg", header: &[0xFF, 0xD8, 0xFF], footer: Some(&[0xFF, 0xD9]) },
    Signature {
        kind: "png",
        header: &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        footer: Some(&[0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82]),
    },
    Signature { kind: "gif", header: b"GIF87a", footer: None },
    Signature { kind: "gif", header: b"GIF89a", footer: None },
    Signature { kind: "pdf", header: b"%PDF-", footer: Some(b"%%EOF") },
    Signature {
        kind: "doc",
        header: &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1],
        footer: None,
    },
    Signature { kind: "zip", header: &[0x50, 0x4B, 0x03, 0x04], footer: None },
    Signature { kind: "exe", header: b"MZ", footer: None },
    Signature { kind: "txt", header: &[0xEF, 0xBB, 0xBF], footer: None },
    Signature { kind: "txt", header: &[0xFF, 0xFE], footer: None },
    Signature { kind: "txt", header: &[0xFE, 0xFF], footer: None },
];

/// Maximum bytes to carve for a single match, used when a header is found but either there is
/// no footer in the table for that kind or no footer is found before this cap -- without it, a
/// single false-positive header in sparse/corrupt data could carve until end of device.
pub const MAX_CARVE_BYTES: u64 = 10 * 1024 * 1024;

/// One carved (or carve-in-progress) hit.
#[derive(Debug, Clone)]
pub struct CarvedFile {
    pub kind: String,
    pub offset: u64,
    pub length: u64,
    /// `false` if the carve hit `max_carve_bytes` or end of device before a footer was found
    /// (or the signature has no footer at all); still returned, since a truncated recovery is
    /// better than none.
    pub footer_found: bool,
}

/// Scans `device` sequentially for every signature in `table`, returning one [`CarvedFile`] per
/// match. Overlapping matches are possible (e.g. a ZIP magic inside a carved region of a
/// different type) and are not deduplicated here; that judgment is left to the caller.
pub fn carve<D: BlockDevice + ?Sized>(
    device: &mut D,
    table: &[Signature],
    max_carve_bytes: u64,
) -> Result<Vec<CarvedFile>, fatkit_core::device::DeviceError> {
    let total_sectors = device.sector_count().unwrap_or(0);
    const WINDOW_SECTORS: u64 = 64;
    let mut results = Vec::new();

    let mut sector = 0u64;
    while sector < total_sectors {
        let sectors_this_window = WINDOW_SECTORS.min(total_sectors - sector);
        let mut buf = alloc::vec![0u8; sectors_this_window as usize * fatkit_core::device::SECTOR_SIZE];
        device.read_sectors(sector, &mut buf)?;
        let base_offset = sector * fatkit_core::device::SECTOR_SIZE as u64;

        for sig in table {
            let mut search_from = 0usize;
            while let Some(pos) = find_subslice(&buf[search_from..], sig.header) {
                let match_offset = base_offset + (search_from + pos) as u64;
                let (length, footer_found) =
                    locate_end(device, sig, match_offset, total_sectors, max_carve_bytes)?;
                results.push(CarvedFile {
                    kind: String::from(sig.kind),
                    offset: match_offset,
                    length,
                    footer_found,
                });
                search_from += pos + 1;
                if search_from >= buf.len() {
                    break;
                }
            }
        }

        sector += sectors_this_window;
    }

    Ok(results)
}

fn locate_end<D: BlockDevice + ?Sized>(
    device: &mut D,
    sig: &Signature,
    start_offset: u64,
    total_sectors: u64,
    max_carve_bytes: u64,
) -> Result<(u64, bool), fatkit_core::device::DeviceError> {
    let Some(footer) = sig.footer else {
        return Ok((sig.header.len() as u64, false));
    };

    let total_bytes = total_sectors * fatkit_core::device::SECTOR_SIZE as u64;
    let scan_limit = (start_offset + max_carve_bytes).min(total_bytes);
    let mut cursor = start_offset;
    const CHUNK: u64 = 4096;

    while cursor < scan_limit {
        let chunk_len = CHUNK.min(scan_limit - cursor) as usize;
        let mut buf = alloc::vec![0u8; chunk_len];
        device.read_bytes(cursor, &mut buf)?;
        if let Some(pos) = find_subslice(&buf, footer) {
            let end = cursor + pos as u64 + footer.len() as u64;
            return Ok((end - start_offset, true));
        }
        // Overlap by footer.len()-1 bytes so a footer spanning a chunk boundary isn't missed.
        cursor += chunk_len as u64 - footer.len().saturating_sub(1) as u64;
    }

    Ok((scan_limit - start_offset, false))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fatkit_core::device::MemoryDevice;

    #[test]
    fn finds_a_jpeg_header_and_footer() {
        let mut data = alloc::vec![0u8; 4096];
        data[100..103].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        data[200..202].copy_from_slice(&[0xFF, 0xD9]);
        let mut dev = MemoryDevice::new({
            let mut v = data.clone();
            v.resize(v.len().next_multiple_of(fatkit_core::device::SECTOR_SIZE), 0);
            v
        });
        let hits = carve(&mut dev, &[SIGNATURES[0]], MAX_CARVE_BYTES).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offset, 100);
        assert_eq!(hits[0].length, 102);
        assert!(hits[0].footer_found);
    }

    #[test]
    fn finds_a_footer_beyond_the_scan_window_size() {
        // Footer sits past the 64-sector scan window used while searching for headers, well
        // past the old (incorrectly capped) 128 KiB footer-search bound.
        let footer_offset = 200_000;
        let mut data = alloc::vec![0u8; footer_offset + 4096];
        data[100..103].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        data[footer_offset..footer_offset + 2].copy_from_slice(&[0xFF, 0xD9]);
        data.resize(data.len().next_multiple_of(fatkit_core::device::SECTOR_SIZE), 0);
        let mut dev = MemoryDevice::new(data);
        let hits = carve(&mut dev, &[SIGNATURES[0]], MAX_CARVE_BYTES).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offset, 100);
        assert_eq!(hits[0].length, footer_offset as u64 + 2 - 100);
        assert!(hits[0].footer_found);
    }

    #[test]
    fn truncated_carve_without_footer_is_reported() {
        let mut data = alloc::vec![0u8; fatkit_core::device::SECTOR_SIZE];
        data[0..2].copy_from_slice(b"MZ");
        let mut dev = MemoryDevice::new(data);
        let hits = carve(&mut dev, &[SIGNATURES[7]], MAX_CARVE_BYTES).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].footer_found);
    }
}
