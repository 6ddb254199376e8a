//! Block device access.
//!
//! A [`BlockDevice`] is the single abstraction every other crate in this workspace builds on:
//! a flat address space of fixed-size sectors. Two implementations ship here: an in-memory
//! slice/vector backed device for tests and pre-loaded images, and a `std::fs::File` backed
//! device for real disk images.

/// Sector size assumed throughout this workspace. The FAT specification allows 512, 1024, 2048
/// or 4096, but every sector-addressed API here works in units of this constant; callers reading
/// a volume with a larger logical sector size resize their reads accordingly.
pub const SECTOR_SIZE: usize = 512;

/// Errors that can occur while reading or writing a block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The requested sector range falls outside the device.
    #[error("sector range out of bounds")]
    OutOfBounds,
    /// Fewer bytes were read or written than requested. Devices should not return this for a
    /// request that is fully out of bounds; that is [`DeviceError::OutOfBounds`] instead.
    #[error("short read or write")]
    ShortIo,
    /// The underlying OS/IO layer reported a failure.
    #[error("device io error: {0}")]
    #[cfg(feature = "std")]
    Io(String),
}

#[cfg(feature = "std")]
impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        DeviceError::Io(err.to_string())
    }
}

/// Read access to a sector-addressed block device.
///
/// Reads are always sector-aligned at the trait boundary; [`BlockDevice::read_bytes`] is a
/// convenience built on top of [`BlockDevice::read_sectors`] for callers that want an arbitrary
/// byte range.
pub trait BlockDevice {
    /// Reads `buffer.len() / SECTOR_SIZE` sectors starting at `lba` into `buffer`.
    ///
    /// `buffer.len()` must be a multiple of [`SECTOR_SIZE`]; implementations may panic otherwise,
    /// since every call site in this workspace sizes its buffers to whole sectors.
    fn read_sectors(&mut self, lba: u64, buffer: &mut [u8]) -> Result<(), DeviceError>;

    /// Total number of `SECTOR_SIZE`-byte sectors available on the device, if known.
    fn sector_count(&self) -> Option<u64>;

    /// Reads an arbitrary byte range that need not be sector-aligned.
    fn read_bytes(&mut self, offset: u64, buffer: &mut [u8]) -> Result<(), DeviceError> {
        let start_lba = offset / SECTOR_SIZE as u64;
        let start_off = (offset % SECTOR_SIZE as u64) as usize;
        let sectors_needed = (start_off + buffer.len()).div_ceil(SECTOR_SIZE);
        let mut scratch = vec![0u8; sectors_needed * SECTOR_SIZE];
        self.read_sectors(start_lba, &mut scratch)?;
        buffer.copy_from_slice(&scratch[start_off..start_off + buffer.len()]);
        Ok(())
    }
}

/// Write access to a sector-addressed block device.
pub trait BlockDeviceMut: BlockDevice {
    /// Writes a whole number of sectors starting at `lba`.
    fn write_sectors(&mut self, lba: u64, buffer: &[u8]) -> Result<(), DeviceError>;
}

impl BlockDevice for &[u8] {
    fn read_sectors(&mut self, lba: u64, buffer: &mut [u8]) -> Result<(), DeviceError> {
        let offset = lba as usize * SECTOR_SIZE;
        if offset + buffer.len() > self.len() {
            return Err(DeviceError::OutOfBounds);
        }
        buffer.copy_from_slice(&self[offset..offset + buffer.len()]);
        Ok(())
    }

    fn sector_count(&self) -> Option<u64> {
        Some((self.len() / SECTOR_SIZE) as u64)
    }
}

impl BlockDevice for &mut [u8] {
    fn read_sectors(&mut self, lba: u64, buffer: &mut [u8]) -> Result<(), DeviceError> {
        let offset = lba as usize * SECTOR_SIZE;
        if offset + buffer.len() > self.len() {
            return Err(DeviceError::OutOfBounds);
        }
        buffer.copy_from_slice(&self[offset..offset + buffer.len()]);
        Ok(())
    }

    fn sector_count(&self) -> Option<u64> {
        Some((self.len() / SECTOR_SIZE) as u64)
    }
}

impl BlockDeviceMut for &mut [u8] {
    fn write_sectors(&mut self, lba: u64, buffer: &[u8]) -> Result<(), DeviceError> {
        let offset = lba as usize * SECTOR_SIZE;
        if offset + buffer.len() > self.len() {
            return Err(DeviceError::OutOfBounds);
        }
        self[offset..offset + buffer.len()].copy_from_slice(buffer);
        Ok(())
    }
}

/// An in-memory device owning its backing bytes. Used by every test in this workspace and by
/// any caller that has already slurped an image fully into memory.
#[cfg(feature = "alloc")]
pub struct MemoryDevice {
    data: alloc::vec::Vec<u8>,
}

#[cfg(feature = "alloc")]
impl MemoryDevice {
    pub fn new(data: alloc::vec::Vec<u8>) -> Self {
        Self { data }
    }

    pub fn zeroed(sectors: u64) -> Self {
        Self {
            data: alloc::vec![0u8; sectors as usize * SECTOR_SIZE],
        }
    }

    pub fn into_inner(self) -> alloc::vec::Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(feature = "alloc")]
impl BlockDevice for MemoryDevice {
    fn read_sectors(&mut self, lba: u64, buffer: &mut [u8]) -> Result<(), DeviceError> {
        let offset = lba as usize * SECTOR_SIZE;
        if offset + buffer.len() > self.data.len() {
            return Err(DeviceError::OutOfBounds);
        }
        buffer.copy_from_slice(&self.data[offset..offset + buffer.len()]);
        Ok(())
    }

    fn sector_count(&self) -> Option<u64> {
        Some((self.data.len() / SECTOR_SIZE) as u64)
    }
}

#[cfg(feature = "alloc")]
impl BlockDeviceMut for MemoryDevice {
    fn write_sectors(&mut self, lba: u64, buffer: &[u8]) -> Result<(), DeviceError> {
        let offset = lba as usize * SECTOR_SIZE;
        if offset + buffer.len() > self.data.len() {
            return Err(DeviceError::OutOfBounds);
        }
        self.data[offset..offset + buffer.len()].copy_from_slice(buffer);
        Ok(())
    }
}

/// A file-backed device for real disk images, opened read-only or read-write depending on how
/// the caller obtained the `File`.
#[cfg(feature = "std")]
pub struct FileDevice {
    file: std::fs::File,
    sector_count: Option<u64>,
}

#[cfg(feature = "std")]
impl FileDevice {
    pub fn open(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            sector_count: Some(len / SECTOR_SIZE as u64),
        })
    }

    pub fn open_read_write(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            sector_count: Some(len / SECTOR_SIZE as u64),
        })
    }
}

#[cfg(feature = "std")]
impl BlockDevice for FileDevice {
    fn read_sectors(&mut self, lba: u64, buffer: &mut [u8]) -> Result<(), DeviceError> {
        use std::io::{Read, Seek, SeekFrom};
        self.file.seek(SeekFrom::Start(lba * SECTOR_SIZE as u64))?;
        self.file.read_exact(buffer).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DeviceError::ShortIo
            } else {
                DeviceError::from(e)
            }
        })
    }

    fn sector_count(&self) -> Option<u64> {
        self.sector_count
    }
}

#[cfg(feature = "std")]
impl BlockDeviceMut for FileDevice {
    fn write_sectors(&mut self, lba: u64, buffer: &[u8]) -> Result<(), DeviceError> {
        use std::io::{Seek, SeekFrom, Write};
        self.file.seek(SeekFrom::Start(lba * SECTOR_SIZE as u64))?;
        self.file.write_all(buffer)?;
        self.file.flush()?;
        Ok(())
    }
}
