#![no_std]
//! A read-only driver for the Essence filesystem (ESFS), built on a generic
//! block-I/O abstraction.
//!
//! Given anything implementing [`device::BlockDevice`], [`volume::Volume`]
//! mounts a volume, resolves `/`-separated paths to files or directories,
//! reads byte ranges, enumerates directory contents, and reports the
//! volume's label and UUID. Every field that drives a pointer, length, or
//! loop bound is checked before use — the on-disk format is not trusted.
//!
//! No writes, no dirty-mount repair, no checksum verification, no
//! free-space tracking. Single-threaded and synchronous: there is no
//! background work and nothing here is `async`.

extern crate alloc;

pub mod attribute;
pub mod device;
pub mod dir;
pub mod direntry;
pub mod error;
pub mod extent;
pub mod node;
pub mod superblock;
pub mod volume;

pub use device::BlockDevice;
pub use direntry::NodeType;
pub use error::Error;
pub use node::Node;
pub use volume::{FileHandle, Volume};
