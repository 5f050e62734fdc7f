//! Open-file capabilities.

use crate::error::ClientResult;

/// A file opened for reading.
pub trait FileReader: Send + Sync {
    /// Read from the cursor into `buf`, advancing it. Returns 0 at end of
    /// data.
    fn read(&self, buf: &mut [u8]) -> ClientResult<usize>;

    /// Read up to `buf.len()` bytes at `offset` without moving the cursor.
    /// Short reads happen only at end of data.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> ClientResult<usize>;

    /// Move the cursor to an absolute offset.
    fn seek(&self, offset: u64) -> ClientResult<()>;

    fn tell(&self) -> ClientResult<u64>;

    fn close(&self) -> ClientResult<()>;
}

/// A file opened for writing or appending.
pub trait FileWriter: Send + Sync {
    /// Buffer all of `buf`. Returns the number of bytes accepted.
    fn write(&self, buf: &[u8]) -> ClientResult<usize>;

    /// Push buffered bytes out so new readers observe them.
    fn flush(&self) -> ClientResult<()>;

    /// Flush and release the file.
    fn close(&self) -> ClientResult<()>;
}
