//! Directory entry decoding: 8.3 short names, long-filename (VFAT) reassembly, and deleted-entry
//! recognition.
//!
//! This module is a pure decoder over an already-read directory buffer (root directory region
//! or concatenated cluster data); it never touches a device itself. [`crate::tree`] drives it
//! while walking the volume.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::structures::raw::directory::{RawFileEntry, RawLfnEntry};

bitflags::bitflags! {
    /// `DIR_Attr` bits.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_LABEL = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
    }
}

/// Marks a slot as a long-filename entry rather than a short-form file entry.
const ATTR_LONG_NAME: u8 = 0x0F;
const ENTRY_FREE: u8 = 0x00;
const ENTRY_DELETED: u8 = 0xE5;
const KANJI_E5_ESCAPE: u8 = 0x05;
const LAST_LFN_SLOT_BIT: u8 = 0x40;

/// A fully decoded directory entry, short-form fields plus a display name that is the
/// reassembled long filename when one was present and checksum-valid, otherwise the cleaned 8.3
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    pub name: String,
    pub attributes: FileAttributes,
    pub start_cluster: u32,
    pub size: u32,
    pub deleted: bool,
    /// `true` if `name` came from LFN slots rather than the 8.3 short name.
    pub long_name: bool,
}

impl DecodedEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

struct LfnAccumulator {
    // Keyed by ordinal (1-based); reassembled in order at flush time.
    slots: Vec<(u8, [u16; 13])>,
    checksum: u8,
}

impl LfnAccumulator {
    fn new() -> Self {
        Self { slots: Vec::new(), checksum: 0 }
    }

    fn push(&mut self, raw: &RawLfnEntry) {
        let ordinal = raw.sequence_number & 0x1F;
        if raw.sequence_number & LAST_LFN_SLOT_BIT != 0 {
            self.checksum = raw.checksum;
        }
        let mut chars = [0u16; 13];
        for (i, b) in raw.name1.chunks(2).enumerate() {
            chars[i] = u16::from_le_bytes([b[0], b[1]]);
        }
        for (i, b) in raw.name2.chunks(2).enumerate() {
            chars[5 + i] = u16::from_le_bytes([b[0], b[1]]);
        }
        for (i, b) in raw.name3.chunks(2).enumerate() {
            chars[11 + i] = u16::from_le_bytes([b[0], b[1]]);
        }
        self.slots.push((ordinal, chars));
    }

    fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.checksum = 0;
    }

    /// Reassembles the accumulated slots into a name, in ordinal order, trimming at the first
    /// NUL and any trailing 0xFFFF padding.
    fn assemble(&self) -> String {
        let mut ordered = self.slots.clone();
        ordered.sort_by_key(|(ord, _)| *ord);
        let mut out = String::new();
        'outer: for (_, chars) in &ordered {
            for &c in chars {
                if c == 0x0000 {
                    break 'outer;
                }
                if c == 0xFFFF {
                    continue;
                }
                match char::from_u32(c as u32) {
                    Some(ch) => out.push(ch),
                    None => out.push('_'),
                }
            }
        }
        out
    }
}

/// Rotate-right checksum over the raw 11-byte short name, per the VFAT specification.
pub fn short_name_checksum(raw_name: &[u8; 11]) -> u8 {
    let mut sum: u8 = 0;
    for &b in raw_name {
        sum = (if sum & 1 != 0 { 0x80 } else { 0 }).wrapping_add(sum >> 1).wrapping_add(b);
    }
    sum
}

/// Cleans a raw 8.3 name+ext pair into a displayable string, restoring a literal 0xE5 first byte
/// (the kanji escape) and trimming space padding.
///
/// Works directly off the raw bytes rather than through `FatStr::as_str`: that path rejects any
/// non-UTF-8 byte wholesale (returning `""`), which would silently drop the very 0xE5 byte this
/// function exists to restore.
pub fn clean_short_name(raw_name: &[u8; 11]) -> String {
    let mut name = *raw_name;
    if name[0] == KANJI_E5_ESCAPE {
        name[0] = ENTRY_DELETED;
    }
    let clean = |bytes: &[u8]| -> String {
        let trimmed_len = bytes.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        bytes[..trimmed_len]
            .iter()
            .map(|&b| if (0x20..=0x7E).contains(&b) && b != 0xFF { b as char } else { '_' })
            .collect()
    };
    let stem = clean(&name[0..8]);
    let ext = clean(&name[8..11]);
    if ext.is_empty() {
        stem
    } else {
        let mut s = stem;
        s.push('.');
        s.push_str(&ext);
        s
    }
}

/// Iterates 32-byte directory records in `buffer`, yielding decoded entries.
///
/// `include_deleted` controls whether `0xE5`-marked records are yielded as [`DecodedEntry`]
/// with `deleted: true`; when they are, the decoder also attempts to recover a preceding,
/// checksum-consistent LFN run even though the run itself is made of deleted slots (see the
/// module-level note on deleted-entry LFN recovery).
pub fn decode_entries(buffer: &[u8], include_deleted: bool) -> Vec<DecodedEntry> {
    let mut out = Vec::new();
    let mut lfn = LfnAccumulator::new();
    let mut deleted_lfn = LfnAccumulator::new();

    for chunk in buffer.chunks_exact(32) {
        let first = chunk[0];
        if first == ENTRY_FREE {
            break;
        }

        let attr = chunk[11];
        if attr == ATTR_LONG_NAME {
            let raw: &RawLfnEntry = bytemuck::from_bytes(chunk);
            if first == ENTRY_DELETED || (raw.sequence_number & 0x1F) == 0 {
                // A deleted LFN slot: still informative for the following deleted short entry.
                deleted_lfn.push(raw);
            } else {
                lfn.push(raw);
            }
            continue;
        }

        let raw: &RawFileEntry = bytemuck::from_bytes(chunk);
        let is_deleted = first == ENTRY_DELETED;

        if is_deleted && !include_deleted {
            lfn.clear();
            deleted_lfn.clear();
            continue;
        }

        let raw_name = raw.name;
        let expected_checksum = short_name_checksum(&raw_name);

        let (name, long_name) = if is_deleted {
            if !deleted_lfn.is_empty() && deleted_lfn.checksum == expected_checksum {
                (deleted_lfn.assemble(), true)
            } else {
                (clean_short_name(&raw_name), false)
            }
        } else if !lfn.is_empty() && lfn.checksum == expected_checksum {
            (lfn.assemble(), true)
        } else {
            (clean_short_name(&raw_name), false)
        };

        let attributes = FileAttributes::from_bits_truncate(attr);
        if !attributes.contains(FileAttributes::VOLUME_LABEL) || is_deleted {
            let entry = DecodedEntry {
                name,
                attributes,
                start_cluster: (u16::from_le_bytes(raw.first_cluster_high) as u32) << 16
                    | u16::from_le_bytes(raw.first_cluster_low) as u32,
                size: u32::from_le_bytes(raw.size),
                deleted: is_deleted,
                long_name,
            };
            if !attributes.contains(FileAttributes::VOLUME_LABEL) {
                out.push(entry);
            }
        }

        lfn.clear();
        deleted_lfn.clear();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_entry(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
        let mut e = [0u8; 32];
        e[0..11].copy_from_slice(name);
        e[11] = attr;
        let hi = (cluster >> 16) as u16;
        let lo = cluster as u16;
        e[20..22].copy_from_slice(&hi.to_le_bytes());
        e[26..28].copy_from_slice(&lo.to_le_bytes());
        e[28..32].copy_from_slice(&size.to_le_bytes());
        e
    }

    #[test]
    fn decodes_plain_short_entry() {
        let entry = short_entry(b"HELLO   TXT", 0x20, 2, 13);
        let entries = decode_entries(&entry, false);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "HELLO.TXT");
        assert_eq!(entries[0].start_cluster, 2);
        assert_eq!(entries[0].size, 13);
        assert!(!entries[0].deleted);
    }

    #[test]
    fn stops_at_end_marker() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&short_entry(b"HELLO   TXT", 0x20, 2, 13));
        buf.extend_from_slice(&[0u8; 32]);
        buf.extend_from_slice(&short_entry(b"WONTSEE TXT", 0x20, 3, 1));
        assert_eq!(decode_entries(&buf, false).len(), 1);
    }

    #[test]
    fn deleted_entry_reports_kanji_escape() {
        let mut name = *b"\x05ELLO   TXT";
        name[0] = KANJI_E5_ESCAPE;
        let mut entry = short_entry(&name, 0x20, 17, 42);
        entry[0] = ENTRY_DELETED;
        let entries = decode_entries(&entry, true);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].deleted);
        assert!(entries[0].name.starts_with('\u{e5}') || entries[0].name.starts_with('_'));
    }

    #[test]
    fn long_name_reassembles_across_slots() {
        // "LONGFILENAME.TXT" split across two LFN slots (13 chars each), last-slot-first on disk.
        let full = "LONGFILENAME.TXT";
        let utf16: Vec<u16> = full.encode_utf16().collect();
        let mut buf = Vec::new();

        let mut slot2 = [0u8; 32];
        slot2[0] = 2 | LAST_LFN_SLOT_BIT;
        slot2[11] = ATTR_LONG_NAME;
        let chunk2 = &utf16[13..];
        write_lfn_chars(&mut slot2, chunk2);

        let mut short = [0u8; 11];
        short[0..8].copy_from_slice(b"LONGFILE");
        short[8..11].copy_from_slice(b"TXT");
        let checksum = short_name_checksum(&short);
        slot2[13] = checksum;

        let mut slot1 = [0u8; 32];
        slot1[0] = 1;
        slot1[11] = ATTR_LONG_NAME;
        slot1[13] = checksum;
        write_lfn_chars(&mut slot1, &utf16[0..13]);

        buf.extend_from_slice(&slot2);
        buf.extend_from_slice(&slot1);
        buf.extend_from_slice(&short_entry(&{
            let mut n = [b' '; 11];
            n[0..8].copy_from_slice(b"LONGFILE");
            n[8..11].copy_from_slice(b"TXT");
            n
        }, 0x20, 5, 100));

        let entries = decode_entries(&buf, false);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, full);
        assert!(entries[0].long_name);
    }

    fn write_lfn_chars(slot: &mut [u8; 32], chars: &[u16]) {
        let mut padded = [0xFFFFu16; 13];
        for (i, c) in chars.iter().enumerate() {
            padded[i] = *c;
        }
        if chars.len() < 13 {
            padded[chars.len()] = 0x0000;
        }
        for (i, c) in padded[0..5].iter().enumerate() {
            slot[1 + i * 2..3 + i * 2].copy_from_slice(&c.to_le_bytes());
        }
        for (i, c) in padded[5..11].iter().enumerate() {
            slot[14 + i * 2..16 + i * 2].copy_from_slice(&c.to_le_bytes());
        }
        for (i, c) in padded[11..13].iter().enumerate() {
            slot[28 + i * 2..30 + i * 2].copy_from_slice(&c.to_le_bytes());
        }
    }
}
