//! Stat snapshots returned by the filesystem client.

/// Whether a path names a regular file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    File,
    Directory,
}

impl ObjectKind {
    /// The tag used by `tObjectKind` in the C header.
    pub const fn as_tag(self) -> u8 {
        match self {
            ObjectKind::File => b'F',
            ObjectKind::Directory => b'D',
        }
    }

    pub fn is_dir(self) -> bool {
        self == ObjectKind::Directory
    }
}

/// Immutable snapshot of one path's attributes.
///
/// Times are whole seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub kind: ObjectKind,
    /// Last path component; empty for the root.
    pub name: String,
    pub modification_time: i64,
    pub size: u64,
    /// Permission bits (`0o7777` mask).
    pub permissions: u16,
    pub replication: u16,
    pub block_size: u64,
    pub owner: String,
    pub group: String,
    pub access_time: i64,
}

impl FileStatus {
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Aggregate filesystem counters, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsStats {
    pub capacity: u64,
    pub used: u64,
    pub remaining: u64,
}
