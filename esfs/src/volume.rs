//! The filesystem facade: mount, open-by-path, read, close, list, label,
//! uuid — the surface an outer pathname resolver (or, in this standalone
//! crate, the small internal walker below) consumes.

use alloc::string::String;
use alloc::vec::Vec;

use crate::device::BlockDevice;
use crate::dir::iterate_dir;
use crate::direntry::NodeType;
use crate::error::Error;
use crate::extent::{read_file, ReadHook};
use crate::node::Node;
use crate::superblock::{self, SuperBlock};

/// A mounted ESFS volume: the block device, its superblock, and the
/// pre-loaded root node.
pub struct Volume<D: BlockDevice> {
    device: D,
    superblock: SuperBlock,
    root: Node,
}

/// An open file: the node plus a read cursor the facade advances on every
/// successful read. Never seeks past `fileSize`.
pub struct FileHandle {
    node: Node,
    pos: u64,
}

impl FileHandle {
    pub fn position(&self) -> u64 {
        self.pos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expected {
    File,
    Directory,
}

impl<D: BlockDevice> Volume<D> {
    /// Mounts the volume: reads the superblock and the root directory
    /// entry it points at. Two device reads, no global state.
    pub fn mount(mut device: D) -> Result<Self, Error<D::Error>> {
        let (superblock, root_entry) = superblock::mount(&mut device)?;
        Ok(Self {
            device,
            superblock,
            root: Node::from_entry(root_entry),
        })
    }

    pub fn label(&self) -> String {
        self.superblock.label()
    }

    /// 32-character lowercase hex, no hyphens.
    pub fn uuid(&self) -> String {
        self.superblock.uuid()
    }

    fn block_size(&self) -> u64 {
        self.superblock.block_size
    }

    /// Resolves `path` (absolute, `/`-separated) against the root, walking
    /// one `iterate_dir` call per component. Grounded on the same shape as
    /// an external pathname-walk helper would take, re-implemented here
    /// since this standalone crate has no outer resolver to delegate to.
    fn resolve(&mut self, path: &str, expected: Expected) -> Result<Node, Error<D::Error>> {
        let trimmed = path.trim_start_matches('/');
        let components: Vec<&str> = trimmed.split('/').filter(|c| !c.is_empty()).collect();

        if components.is_empty() {
            return match expected {
                Expected::Directory => Ok(self.root.clone()),
                Expected::File => Err(Error::BadFileType("not a file")),
            };
        }

        let mut current = self.root.clone();
        let last = components.len() - 1;
        for (i, name) in components.iter().enumerate() {
            let block_size = self.block_size();
            let mut found: Option<Node> = None;
            iterate_dir(&mut self.device, block_size, current.entry(), |n, _ntype, child| {
                if n == name.as_bytes() {
                    found = Some(Node::from_entry(child));
                    true
                } else {
                    false
                }
            })?;
            let child = found.ok_or(Error::BadFS("path not found"))?;

            if i == last {
                let want = if expected == Expected::Directory {
                    NodeType::Directory
                } else {
                    NodeType::File
                };
                if child.node_type() != Some(want) {
                    return Err(Error::BadFileType(match expected {
                        Expected::Directory => "not a directory",
                        Expected::File => "not a file",
                    }));
                }
            } else if child.node_type() != Some(NodeType::Directory) {
                return Err(Error::BadFileType("not a directory"));
            }

            current = child;
        }

        Ok(current)
    }

    /// Resolves `path` to a file and returns an open handle positioned at 0.
    pub fn open(&mut self, path: &str) -> Result<FileHandle, Error<D::Error>> {
        let node = self.resolve(path, Expected::File)?;
        Ok(FileHandle { node, pos: 0 })
    }

    /// Reads into `buf` starting at the handle's current position, advancing
    /// it by the number of bytes read. Returns `0` at end of file.
    pub fn read(&mut self, handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize, Error<D::Error>> {
        self.read_with_hook(handle, buf, None)
    }

    /// As [`Volume::read`], but threading a per-physical-read notification
    /// hook through to the extent decoder. Never invoked for DIRECT data.
    pub fn read_with_hook(
        &mut self,
        handle: &mut FileHandle,
        buf: &mut [u8],
        hook: Option<ReadHook<'_>>,
    ) -> Result<usize, Error<D::Error>> {
        let block_size = self.block_size();
        let n = read_file(&mut self.device, block_size, handle.node.entry(), handle.pos, buf, hook)?;
        if n < 0 {
            return Ok(0);
        }
        handle.pos += n as u64;
        Ok(n as usize)
    }

    /// Releases a handle. There is no heap allocation or external resource
    /// behind a [`FileHandle`] to tear down explicitly; `Drop` already does
    /// this. Kept as an explicit call to match the facade's operation
    /// surface.
    pub fn close(&mut self, _handle: FileHandle) {}

    /// Resolves `path` to a directory and visits every valid child slot, in
    /// the same terms as [`iterate_dir`].
    pub fn list(
        &mut self,
        path: &str,
        visit: impl FnMut(&[u8], NodeType, Node) -> bool,
    ) -> Result<(), Error<D::Error>> {
        let dir = self.resolve(path, Expected::Directory)?;
        let block_size = self.block_size();
        iterate_dir(&mut self.device, block_size, dir.entry(), visit)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::attribute::{data_attribute, TYPE_DATA, TYPE_FILENAME};
    use crate::direntry::{DirectoryEntry, SIGNATURE as DIRENTRY_SIGNATURE};
    use crate::superblock::{DirEntryRef, SIGNATURE as SUPERBLOCK_SIGNATURE, SUPERBLOCK_OFFSET, SUPERBLOCK_SIZE};
    use crate::test_support::MemoryDevice;

    const BLOCK_SIZE: u64 = 4096;

    fn filename_attr(name: &[u8]) -> Vec<u8> {
        let mut payload = alloc::vec![0u8; 4];
        payload[0..2].copy_from_slice(&(name.len() as u16).to_le_bytes());
        payload.extend_from_slice(name);
        while payload.len() % 8 != 0 {
            payload.push(0);
        }
        let mut attr = Vec::new();
        attr.extend_from_slice(&TYPE_FILENAME.to_le_bytes());
        attr.extend_from_slice(&((4 + payload.len()) as u16).to_le_bytes());
        attr.extend_from_slice(&payload);
        attr
    }

    fn direct_data_attr(bytes: &[u8]) -> Vec<u8> {
        let mut payload = alloc::vec![0u8; 28];
        payload[0] = data_attribute::INDIRECTION_DIRECT;
        payload[1] = 32;
        payload[2..4].copy_from_slice(&(bytes.len() as u16).to_le_bytes());
        payload.extend_from_slice(bytes);
        while payload.len() % 8 != 0 {
            payload.push(0);
        }
        let mut attr = Vec::new();
        attr.extend_from_slice(&TYPE_DATA.to_le_bytes());
        attr.extend_from_slice(&((4 + payload.len()) as u16).to_le_bytes());
        attr.extend_from_slice(&payload);
        attr
    }

    fn empty_data_attr() -> Vec<u8> {
        direct_data_attr(&[])
    }

    fn build_entry(node_type: u8, file_size: u64, attrs: &[Vec<u8>]) -> [u8; DirectoryEntry::SIZE] {
        let mut buf = [0u8; DirectoryEntry::SIZE];
        buf[0..8].copy_from_slice(DIRENTRY_SIGNATURE);
        buf[28..30].copy_from_slice(&96u16.to_le_bytes());
        buf[30] = node_type;
        buf[56..64].copy_from_slice(&file_size.to_le_bytes());
        let mut off = 96usize;
        for attr in attrs {
            buf[off..off + attr.len()].copy_from_slice(attr);
            off += attr.len();
        }
        buf
    }

    /// Builds a one-level volume image: root directory containing a single
    /// child file `"hello"` with DIRECT embedded bytes `"world"`.
    fn image_with_hello_world() -> Vec<u8> {
        const DEVICE_SIZE: usize = 64 * BLOCK_SIZE as usize;
        let mut image = alloc::vec![0u8; DEVICE_SIZE];

        let child = build_entry(1, 5, &[filename_attr(b"hello"), direct_data_attr(b"world")]);
        let child_block = 2u64;
        let child_offset_in_block = 0u32;
        let child_off = (child_block * BLOCK_SIZE) as usize + child_offset_in_block as usize;
        image[child_off..child_off + DirectoryEntry::SIZE].copy_from_slice(&child);

        // root directory's data stream: one slot containing the child entry.
        let root_data_block = 3u64;
        let root_data_off = (root_data_block * BLOCK_SIZE) as usize;
        image[root_data_off..root_data_off + DirectoryEntry::SIZE].copy_from_slice(&child);

        let root_extent = alloc::vec![0u8, 1, 1]; // delta=+1, count=1 (relative cur_start starts 0 -> block 1... )
        let mut root_data_payload = alloc::vec![0u8; 28];
        root_data_payload[0] = data_attribute::INDIRECTION_L1;
        root_data_payload[1] = 32;
        root_data_payload[2..4].copy_from_slice(&1u16.to_le_bytes());
        root_data_payload.extend_from_slice(&root_extent);
        while root_data_payload.len() % 8 != 0 {
            root_data_payload.push(0);
        }
        let mut root_data_attr = Vec::new();
        root_data_attr.extend_from_slice(&TYPE_DATA.to_le_bytes());
        root_data_attr.extend_from_slice(&((4 + root_data_payload.len()) as u16).to_le_bytes());
        root_data_attr.extend_from_slice(&root_data_payload);

        let root_entry = build_entry(2, DirectoryEntry::SIZE as u64, &[root_data_attr]);
        let root_block = 1u64; // matches extent delta target below
        let root_off = (root_block * BLOCK_SIZE) as usize;
        image[root_off..root_off + DirectoryEntry::SIZE].copy_from_slice(&root_entry);

        // superblock
        let mut sb = alloc::vec![0u8; SUPERBLOCK_SIZE];
        sb[0..16].copy_from_slice(SUPERBLOCK_SIGNATURE);
        sb[48..50].copy_from_slice(&1u16.to_le_bytes());
        let block_size_off = 57usize;
        sb[block_size_off..block_size_off + 8].copy_from_slice(&BLOCK_SIZE.to_le_bytes());
        sb[block_size_off + 8..block_size_off + 16].copy_from_slice(&100u64.to_le_bytes());
        // root DirEntryRef follows, in field order: blockSize, blockCount,
        // blocksUsed, blocksPerGroup, groupCount, blocksPerGroupBlockBitmap,
        // gdtFirstBlock, directoryEntriesPerBlock (8 x u64 = 64 bytes),
        // identifier, osInstallation, nextIdentifier (3 x 16 bytes = 48
        // bytes), then the kernel DirEntryRef (16 bytes) ahead of root's.
        let root_ref_off = block_size_off + 8 * 8 + 3 * 16 + 16;
        sb[root_ref_off..root_ref_off + 8].copy_from_slice(&root_block.to_le_bytes());
        sb[root_ref_off + 8..root_ref_off + 12].copy_from_slice(&0u32.to_le_bytes());

        image[SUPERBLOCK_OFFSET as usize..SUPERBLOCK_OFFSET as usize + SUPERBLOCK_SIZE]
            .copy_from_slice(&sb);
        image
    }

    #[test]
    fn scenario_open_and_read_direct_file() {
        let image = image_with_hello_world();
        let device = MemoryDevice::from_vec(image);
        let mut volume = Volume::mount(device).unwrap();

        let mut handle = volume.open("/hello").unwrap();
        let mut buf = [0u8; 5];
        let device_reads_before = volume.device.read_count();
        let n = volume.read(&mut handle, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"world");
        assert_eq!(volume.device.read_count(), device_reads_before);
        volume.close(handle);
    }

    #[test]
    fn scenario_bad_signature_rejects_mount() {
        let mut image = image_with_hello_world();
        image[SUPERBLOCK_OFFSET as usize] = b'X';
        let device = MemoryDevice::from_vec(image);
        let err = Volume::mount(device).unwrap_err();
        assert!(matches!(err, Error::BadFS("not an esfs filesystem")));
    }

    #[test]
    fn list_root_finds_hello() {
        let image = image_with_hello_world();
        let device = MemoryDevice::from_vec(image);
        let mut volume = Volume::mount(device).unwrap();
        let mut names = Vec::new();
        volume
            .list("/", |name, ntype, _node| {
                names.push((name.to_vec(), ntype));
                false
            })
            .unwrap();
        assert_eq!(names, alloc::vec![(b"hello".to_vec(), NodeType::File)]);
    }

    #[allow(unused)]
    fn _use(_: DirEntryRef) {}
}
