//! The attribute list inside a directory entry: a TLV stream starting at
//! `attributeOffset`, walked without trusting the advisory `attributeCount`.

use esfs_bytes::read_at;

use crate::direntry::DirectoryEntry;

/// `FILENAME` attribute type code.
pub const TYPE_FILENAME: u16 = 2;
/// `DATA` attribute type code.
pub const TYPE_DATA: u16 = 1;

/// A located attribute: its header fields plus enough to slice its payload
/// back out of the owning entry.
#[derive(Debug, Clone, Copy)]
pub struct Attribute {
    offset: usize,
    attr_type: u16,
    size: usize,
}

impl Attribute {
    pub fn attr_type(&self) -> u16 {
        self.attr_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The attribute's payload, i.e. everything after its 4-byte `(type,
    /// size)` header.
    pub fn payload<'e>(&self, entry: &'e DirectoryEntry) -> &'e [u8] {
        &entry.as_bytes()[self.offset + 4..self.offset + self.size]
    }

    /// The full attribute record including its header, relative to the
    /// attribute's own start — used by extent decoding to compute `size -
    /// dataOffset` against the same origin the spec measures `dataOffset`
    /// from.
    pub fn region<'e>(&self, entry: &'e DirectoryEntry) -> &'e [u8] {
        &entry.as_bytes()[self.offset..self.offset + self.size]
    }
}

/// Walks the attribute list starting at `entry.attribute_offset()`, looking
/// for the first attribute matching `attr_type` with `size >= min_size`.
/// Any structural violation encountered while walking ends the search (not
/// the caller's operation) and is reported as `None`, same as end-of-list.
pub fn find_attribute(entry: &DirectoryEntry, attr_type: u16, min_size: u16) -> Option<Attribute> {
    let bytes = entry.as_bytes();
    let mut off = entry.attribute_offset() as usize;

    loop {
        if off % 8 != 0 {
            return None;
        }
        if off.checked_add(4)? > bytes.len() {
            return None;
        }
        let header: &[u8] = bytes.get(off..)?;
        let ty: u16 = read_at(header, 0).ok()?;
        let size: u16 = read_at(header, 2).ok()?;
        if size < 4 {
            return None;
        }
        let size = size as usize;
        if off.checked_add(size)? > bytes.len() {
            return None;
        }

        if ty == attr_type && size >= min_size as usize {
            return Some(Attribute {
                offset: off,
                attr_type: ty,
                size,
            });
        }

        off += size;
    }
}

/// `FILENAME` attribute payload: `{ length: u16, _pad: u16, bytes[length] }`.
pub mod filename_attribute {
    use esfs_bytes::read_at;

    use super::Attribute;
    use crate::direntry::DirectoryEntry;

    /// The name bytes, unvalidated UTF-8, or `None` if the attribute's
    /// declared `length` does not fit within its own payload.
    pub fn name_bytes<'e>(attr: &Attribute, entry: &'e DirectoryEntry) -> Option<&'e [u8]> {
        let payload = attr.payload(entry);
        if payload.len() < 4 {
            return None;
        }
        let length: u16 = read_at(payload, 0).ok()?;
        let length = length as usize;
        if length > payload.len().saturating_sub(4) {
            return None;
        }
        payload.get(4..4 + length)
    }
}

/// `DATA` attribute payload: `{ indirection: u8, dataOffset: u8, count: u16,
/// _pad[24], payload[...] }`. `dataOffset` is measured from the start of the
/// attribute record (its `(type, size)` header), matching how the on-disk
/// format specifies the invariant `dataOffset <= size`.
pub mod data_attribute {
    use esfs_bytes::read_at;

    use super::Attribute;
    use crate::direntry::DirectoryEntry;

    pub const INDIRECTION_DIRECT: u8 = 1;
    pub const INDIRECTION_L1: u8 = 2;

    #[derive(Debug, Clone, Copy)]
    pub struct DataInfo {
        pub indirection: u8,
        pub data_offset: u8,
        pub count: u16,
    }

    impl DataInfo {
        pub fn decode(attr: &Attribute, entry: &DirectoryEntry) -> Result<Self, &'static str> {
            let payload = attr.payload(entry);
            if payload.len() < 28 {
                return Err("extents are missing");
            }
            let indirection: u8 = read_at(payload, 0).map_err(|_| "extents are missing")?;
            let data_offset: u8 = read_at(payload, 1).map_err(|_| "extents are missing")?;
            let count: u16 = read_at(payload, 2).map_err(|_| "extents are missing")?;
            Ok(Self {
                indirection,
                data_offset,
                count,
            })
        }
    }

    /// The byte range, relative to the attribute's start, where embedded
    /// data (DIRECT) or the extent stream (L1) begins: `region[data_offset..]`.
    /// `Err` if `data_offset > size`, matching the spec's invariant exactly.
    pub fn data_region<'e>(
        attr: &Attribute,
        info: &DataInfo,
        entry: &'e DirectoryEntry,
    ) -> Result<&'e [u8], &'static str> {
        let region = attr.region(entry);
        let data_offset = info.data_offset as usize;
        if data_offset > region.len() {
            return Err("data offset is too large");
        }
        Ok(&region[data_offset..])
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::direntry::{DirectoryEntry, SIGNATURE as DIRENTRY_SIGNATURE};

    fn entry_with_attributes(attrs: &[(u16, Vec<u8>)]) -> DirectoryEntry {
        let mut buf = [0u8; DirectoryEntry::SIZE];
        buf[0..8].copy_from_slice(DIRENTRY_SIGNATURE);
        buf[28..30].copy_from_slice(&96u16.to_le_bytes());
        buf[30] = 2;

        let mut off = 96usize;
        for (ty, payload) in attrs {
            let size = (4 + payload.len()).next_multiple_of(8);
            buf[off..off + 2].copy_from_slice(&ty.to_le_bytes());
            buf[off + 2..off + 4].copy_from_slice(&(size as u16).to_le_bytes());
            buf[off + 4..off + 4 + payload.len()].copy_from_slice(payload);
            off += size;
        }
        DirectoryEntry::parse(&buf).unwrap()
    }

    fn filename_payload(name: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&(name.len() as u16).to_le_bytes());
        v.extend_from_slice(&0u16.to_le_bytes());
        v.extend_from_slice(name);
        v
    }

    #[test]
    fn finds_matching_attribute_by_type_and_min_size() {
        let entry = entry_with_attributes(&[(TYPE_FILENAME, filename_payload(b"hello"))]);
        let attr = find_attribute(&entry, TYPE_FILENAME, 4).unwrap();
        assert_eq!(attr.attr_type(), TYPE_FILENAME);
        let name = filename_attribute::name_bytes(&attr, &entry).unwrap();
        assert_eq!(name, b"hello");
    }

    #[test]
    fn skips_non_matching_type() {
        let entry = entry_with_attributes(&[
            (TYPE_FILENAME, filename_payload(b"a")),
            (TYPE_DATA, alloc::vec![0u8; 28]),
        ]);
        let attr = find_attribute(&entry, TYPE_DATA, 32).unwrap();
        assert_eq!(attr.attr_type(), TYPE_DATA);
    }

    #[test]
    fn missing_attribute_returns_none() {
        let entry = entry_with_attributes(&[(TYPE_FILENAME, filename_payload(b"a"))]);
        assert!(find_attribute(&entry, TYPE_DATA, 32).is_none());
    }

    #[test]
    fn rejects_size_below_minimum() {
        let entry = entry_with_attributes(&[(TYPE_FILENAME, filename_payload(b"a"))]);
        assert!(find_attribute(&entry, TYPE_FILENAME, 64).is_none());
    }

    #[test]
    fn filename_rejects_length_overrunning_payload() {
        let mut payload = filename_payload(b"ab");
        payload[0] = 200;
        let entry = entry_with_attributes(&[(TYPE_FILENAME, payload)]);
        let attr = find_attribute(&entry, TYPE_FILENAME, 4).unwrap();
        assert!(filename_attribute::name_bytes(&attr, &entry).is_none());
    }

    #[test]
    fn data_attribute_decodes_fixed_header() {
        let mut payload = alloc::vec![0u8; 28];
        payload[0] = data_attribute::INDIRECTION_DIRECT;
        payload[1] = 32;
        payload[2..4].copy_from_slice(&5u16.to_le_bytes());
        let entry = entry_with_attributes(&[(TYPE_DATA, payload)]);
        let attr = find_attribute(&entry, TYPE_DATA, 32).unwrap();
        let info = data_attribute::DataInfo::decode(&attr, &entry).unwrap();
        assert_eq!(info.indirection, data_attribute::INDIRECTION_DIRECT);
        assert_eq!(info.data_offset, 32);
        assert_eq!(info.count, 5);
    }

    #[test]
    fn data_region_rejects_offset_past_size() {
        let mut payload = alloc::vec![0u8; 28];
        payload[1] = 255;
        let entry = entry_with_attributes(&[(TYPE_DATA, payload)]);
        let attr = find_attribute(&entry, TYPE_DATA, 32).unwrap();
        let info = data_attribute::DataInfo::decode(&attr, &entry).unwrap();
        assert_eq!(
            data_attribute::data_region(&attr, &info, &entry),
            Err("data offset is too large")
        );
    }
}
