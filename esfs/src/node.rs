//! In-memory handle for a parsed directory entry.

use crate::direntry::{DirectoryEntry, NodeType};

/// A node in the filesystem tree: a parsed [`DirectoryEntry`] held by value.
///
/// Cheap to clone (a 1024-byte copy); carries no back-reference to its
/// volume and no lifetime, since every operation that needs the device or
/// superblock takes them as explicit parameters. Lifetime is bounded only
/// by however long the caller keeps it around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    entry: DirectoryEntry,
}

impl Node {
    pub fn from_entry(entry: DirectoryEntry) -> Self {
        Self { entry }
    }

    pub fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    pub fn node_type(&self) -> Option<NodeType> {
        self.entry.node_type()
    }

    pub fn file_size(&self) -> u64 {
        self.entry.file_size()
    }
}
