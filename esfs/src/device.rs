//! The block device interface this driver consumes. Implementing it is the
//! caller's job (the generic bootloader block-I/O abstraction, a partition
//! window over a disk, or — for tests — an in-memory byte buffer); this
//! module only states the contract.

/// Fixed sector size of the underlying block device, independent of the
/// filesystem's own `blockSize`.
pub const SECTOR_SIZE: u64 = 512;

/// A synchronous, blocking block device addressed in fixed 512-byte sectors.
///
/// Volumes may be a partition window: offsets the driver computes from the
/// superblock are volume-relative, and it is the implementor's job to
/// translate them onto the underlying disk.
pub trait BlockDevice {
    type Error: core::fmt::Debug;

    /// Reads `buf.len()` bytes starting `offset_in_sector` bytes into sector
    /// `sector`. Implementations may serve a read that spans multiple
    /// sectors or extends past `offset_in_sector + buf.len() > SECTOR_SIZE`;
    /// this driver relies on that (e.g. the 8192-byte superblock read).
    fn read(
        &mut self,
        sector: u64,
        offset_in_sector: u32,
        buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Converts an absolute, volume-relative byte offset into the
/// `(sector, offset_in_sector)` pair [`BlockDevice::read`] expects.
pub(crate) fn byte_offset_to_sector(offset: u64) -> (u64, u32) {
    (offset / SECTOR_SIZE, (offset % SECTOR_SIZE) as u32)
}

pub(crate) fn read_bytes<D: BlockDevice>(
    device: &mut D,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), D::Error> {
    let (sector, offset_in_sector) = byte_offset_to_sector(offset);
    device.read(sector, offset_in_sector, buf)
}
