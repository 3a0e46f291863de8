//! Directory iteration: reads a directory's data stream in 1024-byte strides
//! through the extent decoder, classifying each valid slot.

use crate::attribute::{filename_attribute, find_attribute, TYPE_FILENAME};
use crate::device::BlockDevice;
use crate::direntry::{DirectoryEntry, NodeType};
use crate::error::Error;
use crate::extent::read_file;

/// Directories at or above this size are rejected outright rather than
/// walked, per the format's own `fileSize < 2^31` invariant.
const MAX_DIRECTORY_SIZE: u64 = 1 << 31;

/// Visits every valid slot of a directory's data stream.
///
/// `visit` receives the child's raw name bytes (unvalidated UTF-8), its
/// classification, and the freshly parsed child entry; returning `true`
/// stops the walk early (not an error).
///
/// Slots that fail signature validation, have no recognizable `FILENAME`
/// attribute, or classify to neither file nor directory are silently
/// skipped — this is load-bearing: it is how a directory tolerates
/// deleted/free slots.
pub fn iterate_dir<D: BlockDevice>(
    device: &mut D,
    block_size: u64,
    dir: &DirectoryEntry,
    mut visit: impl FnMut(&[u8], NodeType, DirectoryEntry) -> bool,
) -> Result<(), Error<D::Error>> {
    if dir.node_type() != Some(NodeType::Directory) {
        return Err(Error::BadFileType("not a directory"));
    }
    let file_size = dir.file_size();
    if file_size >= MAX_DIRECTORY_SIZE {
        return Err(Error::BadFS("directory too large"));
    }

    let mut pos = 0u64;
    let mut slot = [0u8; DirectoryEntry::SIZE];
    while pos < file_size {
        let n = read_file(device, block_size, dir, pos, &mut slot, None)?;
        if n != DirectoryEntry::SIZE as i64 {
            break;
        }
        pos += DirectoryEntry::SIZE as u64;

        let Ok(child) = DirectoryEntry::parse(&slot) else {
            continue;
        };
        let Some(attr) = find_attribute(&child, TYPE_FILENAME, 4) else {
            continue;
        };
        let Some(name) = filename_attribute::name_bytes(&attr, &child) else {
            continue;
        };
        let Some(ntype) = child.node_type() else {
            continue;
        };

        if visit(name, ntype, child) {
            return Ok(());
        }
    }

    Ok(())
}
