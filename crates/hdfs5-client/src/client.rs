//! The connected-client capability.

use std::sync::Arc;

use hdfs5_config::ClientOptions;
use hdfs5_types::{FileStatus, FsStats};

use crate::error::ClientResult;
use crate::stream::{FileReader, FileWriter};

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Builds connected clients.
///
/// Connecting is synchronous; implementations apply the dial timeouts in
/// `options` themselves.
pub trait Connector: Send + Sync {
    fn connect(&self, options: &ClientOptions) -> ClientResult<Arc<dyn FileSystemClient>>;
}

// ---------------------------------------------------------------------------
// FileSystemClient
// ---------------------------------------------------------------------------

/// A session against one filesystem.
///
/// All methods take `&self`. Implementations decide how concurrent calls
/// on the same client are serialized; callers add no locking of their own.
pub trait FileSystemClient: Send + Sync {
    /// Stat a path, following symlinks.
    fn stat(&self, path: &str) -> ClientResult<FileStatus>;

    /// Open an existing file for reading.
    fn open(&self, path: &str) -> ClientResult<Arc<dyn FileReader>>;

    /// Create a new file. Fails if the path exists.
    fn create(
        &self,
        path: &str,
        replication: u16,
        block_size: u64,
        perm: u32,
    ) -> ClientResult<Arc<dyn FileWriter>>;

    /// Open an existing file for appending.
    fn append(&self, path: &str) -> ClientResult<Arc<dyn FileWriter>>;

    /// Remove a file or an empty directory.
    fn remove(&self, path: &str) -> ClientResult<()>;

    /// Remove a path and everything below it.
    fn remove_all(&self, path: &str) -> ClientResult<()>;

    /// Rename `from` to `to`. Fails if `to` exists.
    fn rename(&self, from: &str, to: &str) -> ClientResult<()>;

    /// Create a directory and any missing parents.
    fn mkdir_all(&self, path: &str, perm: u32) -> ClientResult<()>;

    /// Entries of a directory, sorted by name.
    fn read_dir(&self, path: &str) -> ClientResult<Vec<FileStatus>>;

    fn stat_fs(&self) -> ClientResult<FsStats>;

    /// Change ownership; `None` leaves that attribute unchanged.
    fn chown(&self, path: &str, owner: Option<&str>, group: Option<&str>) -> ClientResult<()>;

    fn chmod(&self, path: &str, perm: u16) -> ClientResult<()>;

    /// Set modification and access times, in seconds since the epoch.
    fn set_times(&self, path: &str, mtime: i64, atime: i64) -> ClientResult<()>;

    /// End the session. Streams opened from it are not closed.
    fn close(&self) -> ClientResult<()>;
}
