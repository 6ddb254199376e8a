//! Byte-exact structures for the FAT on-disk format.
//!
//! `raw` holds the `#[repr(C, packed)]` structures that mirror the Microsoft FAT specification
//! field-for-field (used directly via `bytemuck` casts, never copied field-by-field). The
//! sibling modules build typed, owned views on top: [`directory`] for decoded directory
//! entries, [`time`] for display-only timestamp decoding.

pub mod directory;
pub mod raw;
pub mod time;

/// A space-padded fixed-width ASCII string, as used for 8.3 short names and volume labels.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FatStr<const N: usize> {
    pub raw: [u8; N],
}

impl<const N: usize> core::fmt::Debug for FatStr<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FatStr")
            .field("max_len", &Self::MAX_LEN)
            .field("str", &self.as_str())
            .finish()
    }
}

impl<const N: usize> Default for FatStr<N> {
    fn default() -> Self {
        Self { raw: [b' '; N] }
    }
}

impl<const N: usize> FatStr<N> {
    pub const MAX_LEN: usize = N;

    pub fn new_truncate(s: &str) -> Self {
        let bytes = s.as_bytes();
        let bytes = if bytes.len() > N { &bytes[..N] } else { bytes };
        Self::from_slice_unchecked(bytes)
    }

    pub fn clear(&mut self) {
        self.raw = [b' '; N];
    }

    pub fn try_new(s: &str) -> Result<Self, ()> {
        if s.len() > N {
            return Err(());
        }
        Ok(Self::from_slice_unchecked(s.as_bytes()))
    }

    pub fn from_bytes(bytes: [u8; N]) -> Self {
        Self { raw: bytes }
    }

    pub fn from_slice_unchecked(slice: &[u8]) -> Self {
        let mut str = Self::default();
        str.raw[..slice.len()].copy_from_slice(slice);
        str
    }

    /// Length up to the first trailing space (FAT pads short names with spaces, not NULs).
    pub fn len(&self) -> usize {
        self.raw.iter().rposition(|b| *b != b' ').map(|i| i + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the non-padding bytes as a string, replacing anything non-ASCII-printable with
    /// `_` so this never panics on a corrupt name.
    pub fn as_str(&self) -> &str {
        let len = self.len();
        core::str::from_utf8(&self.raw[..len]).unwrap_or("")
    }

    pub fn as_slice(&self) -> &[u8; N] {
        &self.raw
    }

    pub fn copy_from_slice(&mut self, slice: &[u8]) {
        self.raw[..slice.len()].copy_from_slice(slice);
    }
}

unsafe impl<const N: usize> bytemuck::Zeroable for FatStr<N> {}
unsafe impl<const N: usize> bytemuck::NoUninit for FatStr<N> {}
unsafe impl<const N: usize> bytemuck::AnyBitPattern for FatStr<N> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_names() {
        let s = FatStr::<8>::new_truncate("TOOLONGNAME");
        assert_eq!(s.as_str(), "TOOLONGN");
    }

    #[test]
    fn space_padding_trimmed() {
        let s = FatStr::<11>::from_slice_unchecked(b"README  TXT");
        assert_eq!(s.len(), 11);
        let s = FatStr::<8>::from_slice_unchecked(b"HI      ");
        assert_eq!(s.as_str(), "HI");
    }
}
