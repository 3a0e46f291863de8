//! The ESFS superblock: the fixed 8192-byte record that anchors a volume.
//!
//! Decoded field-by-field through a [`Cursor`], never overlaid as a packed
//! struct on the raw bytes — see Design Notes in the project's specification
//! for why (the underlying buffer is attacker-controlled; an overlay would
//! make every multi-byte field's alignment and bounds a matter of luck
//! instead of an explicit check).

use alloc::string::{String, ToString};
use esfs_bytes::Cursor;

use crate::device::{self, BlockDevice};
use crate::direntry::DirectoryEntry;
use crate::error::Error;

/// Byte offset of the superblock on the volume.
pub const SUPERBLOCK_OFFSET: u64 = 16 * 512;
/// On-disk size of the superblock record.
pub const SUPERBLOCK_SIZE: usize = 8192;

/// Literal signature every ESFS superblock must carry.
pub const SIGNATURE: &[u8; 16] = b"!EssenceFS2-----";

/// Highest `requiredReadVersion` this driver understands.
pub const MAX_SUPPORTED_READ_VERSION: u16 = 10;

/// Block size must not exceed this ceiling. The original driver tests
/// `blockSize & !0x0FFF_FE00 == 0`, which (per the specification's Open
/// Questions) is really just "a power of two between 512 and ~16 MiB"
/// expressed as a bitmask; this constant makes the intent explicit while the
/// check in [`SuperBlock::validate`] still honors the exact source bitmask.
pub const BLOCK_SIZE_CEILING: u64 = 0x0FFF_FE00;

/// A pointer at a directory entry on disk: which block, and the byte offset
/// of the entry within that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntryRef {
    pub block: u64,
    pub offset_into_block: u32,
}

impl DirEntryRef {
    fn decode(cur: &mut Cursor<'_>) -> Result<Self, esfs_bytes::OutOfBounds> {
        let block: u64 = cur.read()?;
        let offset_into_block: u32 = cur.read()?;
        let _unused: u32 = cur.read()?;
        Ok(Self {
            block,
            offset_into_block,
        })
    }
}

/// Volume parameters decoded from the superblock. Every field that can
/// influence a later pointer, length, or loop bound has already been
/// validated by the time a [`SuperBlock`] exists (see [`SuperBlock::parse`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    pub volume_name: [u8; 32],
    pub required_read_version: u16,
    pub required_write_version: u16,
    pub block_size: u64,
    pub block_count: u64,
    pub blocks_used: u64,
    pub identifier: [u8; 16],
    pub kernel: DirEntryRef,
    pub root: DirEntryRef,
}

/// Logs the rejected field and returns the uniform error string, mirroring
/// the teacher's `identify_ext2` log-on-rejection pattern.
fn reject(reason: &str) -> &'static str {
    log::warn!("esfs: rejecting superblock ({reason})");
    "not an esfs filesystem"
}

impl SuperBlock {
    /// Decodes and validates a superblock from an exactly-[`SUPERBLOCK_SIZE`]
    /// byte buffer. Does not touch the device; [`mount`] is the entry point
    /// that reads the bytes and calls this.
    pub fn parse(bytes: &[u8]) -> Result<Self, &'static str> {
        if bytes.len() < SUPERBLOCK_SIZE {
            return Err(reject("buffer shorter than the superblock"));
        }

        let mut cur = Cursor::new(bytes);
        let signature = cur
            .read_bytes(16)
            .map_err(|_| reject("truncated signature"))?;
        if signature != SIGNATURE {
            return Err(reject("signature mismatch"));
        }

        let mut volume_name = [0u8; 32];
        volume_name.copy_from_slice(cur.read_bytes(32).map_err(|_| reject("truncated volume name"))?);

        let required_read_version: u16 =
            cur.read().map_err(|_| reject("truncated version fields"))?;
        let required_write_version: u16 =
            cur.read().map_err(|_| reject("truncated version fields"))?;
        if required_read_version > MAX_SUPPORTED_READ_VERSION {
            return Err(reject("requiredReadVersion unsupported"));
        }

        let _checksum: u32 = cur.read().map_err(|_| reject("truncated superblock fields"))?;
        let _mounted: u8 = cur.read().map_err(|_| reject("truncated superblock fields"))?;

        let block_size: u64 = cur.read().map_err(|_| reject("truncated superblock fields"))?;
        let block_count: u64 = cur.read().map_err(|_| reject("truncated superblock fields"))?;
        let blocks_used: u64 = cur.read().map_err(|_| reject("truncated superblock fields"))?;
        let _blocks_per_group: u64 = cur.read().map_err(|_| reject("truncated superblock fields"))?;
        let _group_count: u64 = cur.read().map_err(|_| reject("truncated superblock fields"))?;
        let _blocks_per_group_block_bitmap: u64 = cur
            .read()
            .map_err(|_| reject("truncated superblock fields"))?;
        let _gdt_first_block: u64 = cur.read().map_err(|_| reject("truncated superblock fields"))?;
        let _directory_entries_per_block: u64 = cur
            .read()
            .map_err(|_| reject("truncated superblock fields"))?;

        let mut identifier = [0u8; 16];
        identifier.copy_from_slice(cur.read_bytes(16).map_err(|_| reject("truncated identifier"))?);
        let _os_installation = cur
            .read_bytes(16)
            .map_err(|_| reject("truncated superblock fields"))?;
        let _next_identifier = cur
            .read_bytes(16)
            .map_err(|_| reject("truncated superblock fields"))?;

        let kernel = DirEntryRef::decode(&mut cur).map_err(|_| reject("truncated kernel reference"))?;
        let root = DirEntryRef::decode(&mut cur).map_err(|_| reject("truncated root reference"))?;

        if block_size == 0 || block_count == 0 {
            return Err(reject("blockSize or blockCount is zero"));
        }
        if block_size % device::SECTOR_SIZE != 0 {
            return Err(reject("blockSize is not a multiple of the sector size"));
        }
        if block_size & !BLOCK_SIZE_CEILING != 0 {
            return Err(reject("blockSize exceeds the allowed ceiling"));
        }

        Ok(Self {
            volume_name,
            required_read_version,
            required_write_version,
            block_size,
            block_count,
            blocks_used,
            identifier,
            kernel,
            root,
        })
    }

    /// The label, as stored on disk: `volumeName`, not necessarily
    /// null-terminated, decoded as the whole fixed 32-byte field (no NUL
    /// truncation — a name that fills all 32 bytes with non-NUL data is
    /// valid and must round-trip in full). Invalid UTF-8 is replaced lossily
    /// rather than rejected — a cosmetic field is not worth failing a mount
    /// over.
    pub fn label(&self) -> String {
        String::from_utf8_lossy(&self.volume_name).into_owned()
    }

    /// 32-character lowercase hex, no hyphens.
    pub fn uuid(&self) -> String {
        uuid::Uuid::from_bytes(self.identifier)
            .simple()
            .to_string()
    }

    /// Byte offset a directory entry pointer resolves to. `reference.block`
    /// is raw on-disk data, never checked against `block_count`, so the
    /// multiply-and-add is wrapping (modulo 2⁶⁴) to match the source's
    /// unsigned-overflow semantics rather than panicking on a crafted value
    /// (see `extent.rs`'s `wrapping_add` over `curStart` for the same
    /// reasoning).
    pub fn direntry_offset(&self, reference: &DirEntryRef) -> u64 {
        reference
            .block
            .wrapping_mul(self.block_size)
            .wrapping_add(reference.offset_into_block as u64)
    }
}

/// Reads the 8192-byte superblock at [`SUPERBLOCK_OFFSET`] and the root
/// directory entry it points at. Two device reads; no global state, no side
/// effects beyond them.
pub fn mount<D: BlockDevice>(device: &mut D) -> Result<(SuperBlock, DirectoryEntry), Error<D::Error>> {
    let mut buf = [0u8; SUPERBLOCK_SIZE];
    device::read_bytes(device, SUPERBLOCK_OFFSET, &mut buf).map_err(Error::Io)?;

    let superblock = SuperBlock::parse(&buf).map_err(Error::BadFS)?;
    log::debug!(
        "esfs: superblock ok, block_size={} block_count={} read_version={}",
        superblock.block_size,
        superblock.block_count,
        superblock.required_read_version,
    );

    let root_offset = superblock.direntry_offset(&superblock.root);
    let mut entry_bytes = [0u8; DirectoryEntry::SIZE];
    device::read_bytes(device, root_offset, &mut entry_bytes)
        .map_err(Error::Io)
        .map_err(|e| {
            log::warn!("esfs: failed to read root directory entry at offset {root_offset}");
            e.into_mount_error()
        })?;

    let root = DirectoryEntry::parse(&entry_bytes)
        .map_err(Error::BadFS)
        .map_err(|e| {
            log::warn!("esfs: root directory entry failed validation");
            e.into_mount_error()
        })?;

    Ok((superblock, root))
}
