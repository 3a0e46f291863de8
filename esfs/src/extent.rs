//! Translates a byte range within a file into either embedded bytes
//! (DIRECT) or a sequence of block-device reads (L1 extents).

use crate::attribute::{
    data_attribute::{DataInfo, INDIRECTION_DIRECT, INDIRECTION_L1},
    find_attribute, Attribute, TYPE_DATA,
};
use crate::device::{self, BlockDevice};
use crate::direntry::DirectoryEntry;
use crate::error::Error;

/// Minimum attribute size for a `DATA` attribute to carry the fixed
/// indirection/dataOffset/count header.
const DATA_MIN_SIZE: u16 = 32;

/// A per-physical-read notification: `(block, offset_in_block, length,
/// data)`. Invoked once per block-device read issued on the L1 path, never
/// on DIRECT. Modeled as an explicit parameter rather than a slot installed
/// on the device — see the crate's module docs.
pub type ReadHook<'a> = &'a mut dyn FnMut(u64, u32, usize, &[u8]);

/// Reads up to `out.len()` bytes of a node's logical data starting at `pos`.
///
/// Returns the number of bytes actually written to `out` (which may be
/// fewer than requested if the file ends first), or `-1` if `pos` is at or
/// past the end of the file.
pub fn read_file<D: BlockDevice>(
    device: &mut D,
    block_size: u64,
    entry: &DirectoryEntry,
    pos: u64,
    out: &mut [u8],
    hook: Option<ReadHook<'_>>,
) -> Result<i64, Error<D::Error>> {
    let file_size = entry.file_size();
    let attr =
        find_attribute(entry, TYPE_DATA, DATA_MIN_SIZE).ok_or(Error::BadFS("extents are missing"))?;
    let info = DataInfo::decode(&attr, entry).map_err(Error::BadFS)?;

    if pos >= file_size {
        return Ok(-1);
    }
    let len = (out.len() as u64).min(file_size - pos) as usize;
    let out = &mut out[..len];

    match info.indirection {
        INDIRECTION_DIRECT => direct_read(entry, &attr, &info, pos, out),
        INDIRECTION_L1 => l1_read(device, block_size, entry, &attr, &info, pos, out, hook),
        _ => Err(Error::BadFS("unknown redirection")),
    }
}

fn direct_read<E>(
    entry: &DirectoryEntry,
    attr: &Attribute,
    info: &DataInfo,
    pos: u64,
    out: &mut [u8],
) -> Result<i64, Error<E>> {
    let region = attr.region(entry);
    let size = attr.size() as u64;
    let data_offset = info.data_offset as u64;
    if data_offset > size {
        return Err(Error::BadFS("data offset is too large"));
    }

    // Deliberately `max`, not `min`: the on-disk driver this is ported from
    // computes the DIRECT capacity this way, which can exceed the bytes the
    // attribute physically has room for. Preserved for observable-behavior
    // parity; the copy below is still bounded by `region`'s real length, so
    // the over-claim can only shorten what gets returned, never read out of
    // bounds.
    let embedded_cap = core::cmp::max(info.count as u64, size - data_offset);
    if pos > embedded_cap {
        return Ok(-1);
    }

    let avail = embedded_cap - pos;
    let requested = (out.len() as u64).min(avail);
    let payload_start = (data_offset + pos) as usize;
    let safe_avail = (region.len().saturating_sub(payload_start)) as u64;
    let actual = requested.min(safe_avail) as usize;

    out[..actual].copy_from_slice(&region[payload_start..payload_start + actual]);
    Ok(actual as i64)
}

#[allow(clippy::too_many_arguments)]
fn l1_read<D: BlockDevice>(
    device: &mut D,
    block_size: u64,
    entry: &DirectoryEntry,
    attr: &Attribute,
    info: &DataInfo,
    pos: u64,
    out: &mut [u8],
    mut hook: Option<ReadHook<'_>>,
) -> Result<i64, Error<D::Error>> {
    let region = attr.region(entry);
    let size = attr.size() as u64;
    let data_offset = info.data_offset as u64;
    if data_offset > size {
        return Err(Error::BadFS("data offset is too large"));
    }

    let stream = &region[data_offset as usize..];
    let stream_len = stream.len();

    let mut consumed = 0usize;
    let mut cur_start: u64 = 0;
    let mut cur_pos: u128 = 0;
    let mut written = 0usize;

    for _ in 0..info.count {
        if written >= out.len() {
            break;
        }
        if consumed + 1 > stream_len {
            break;
        }
        let header = stream[consumed];
        let start_bytes = ((header & 0x07) + 1) as usize;
        let count_bytes = (((header >> 3) & 0x07) + 1) as usize;
        if consumed + 1 + start_bytes + count_bytes > stream_len {
            break;
        }

        consumed += 1;
        let delta = decode_signed_be(&stream[consumed..consumed + start_bytes]);
        consumed += start_bytes;
        let count_blocks = decode_unsigned_be(&stream[consumed..consumed + count_bytes]);
        consumed += count_bytes;

        cur_start = cur_start.wrapping_add(delta as u64);
        let extent_bytes = (count_blocks as u128) * (block_size as u128);
        let extent_end = cur_pos + extent_bytes;

        if extent_end <= pos as u128 {
            cur_pos = extent_end;
            continue;
        }

        let add_off = (pos as u128).saturating_sub(cur_pos);
        let remaining_in_extent = extent_bytes - add_off;
        let remaining_in_buf = (out.len() - written) as u128;
        let to_read = remaining_in_extent.min(remaining_in_buf) as usize;

        let phys_offset = (cur_start as u128) * (block_size as u128) + add_off;
        let phys_offset: u64 = phys_offset
            .try_into()
            .map_err(|_| Error::OutOfRange)?;

        device::read_bytes(device, phys_offset, &mut out[written..written + to_read])
            .map_err(Error::Io)?;
        log::trace!(
            "esfs: read {} bytes at block {} offset {}",
            to_read,
            cur_start,
            add_off
        );
        if let Some(hook) = hook.as_deref_mut() {
            hook(cur_start, add_off as u32, to_read, &out[written..written + to_read]);
        }
        written += to_read;
        cur_pos = extent_end;
    }

    Ok(written as i64)
}

fn decode_unsigned_be(bytes: &[u8]) -> u64 {
    let mut v: u64 = 0;
    for &b in bytes {
        v = (v << 8) | b as u64;
    }
    v
}

fn decode_signed_be(bytes: &[u8]) -> i64 {
    let unsigned = decode_unsigned_be(bytes);
    let bits = bytes.len() * 8;
    if bits >= 64 {
        return unsigned as i64;
    }
    let sign_bit = 1u64 << (bits - 1);
    if unsigned & sign_bit != 0 {
        let mask = !0u64 << bits;
        (unsigned | mask) as i64
    } else {
        unsigned as i64
    }
}
