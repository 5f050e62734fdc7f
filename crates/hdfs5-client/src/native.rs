//! Wire-protocol backend over `hdfs-native`.
//!
//! Every call blocks on a runtime owned by the connector. The wire client
//! reads the caller identity from the process (`HADOOP_USER_NAME` for
//! simple auth, the default ticket cache for Kerberos); a mismatch with
//! the resolved options is logged at connect.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use hdfs_native::client::FileStatus as WireStatus;
use hdfs_native::{Client, HdfsError, WriteOptions};
use hdfs5_config::credential::current_user;
use hdfs5_config::ClientOptions;
use hdfs5_types::{ErrorKind, FileStatus, FsStats, ObjectKind, Status};
use parking_lot::Mutex;
use tokio::runtime::Runtime;

use crate::client::{Connector, FileSystemClient};
use crate::error::{ClientError, ClientResult};
use crate::stream::{FileReader, FileWriter};
use crate::target::{check_credential, ClusterTarget};

const IO_THREADS: usize = 2;

impl From<HdfsError> for ClientError {
    fn from(err: HdfsError) -> Self {
        match err {
            HdfsError::IOError(e) => ClientError::Io(e),
            HdfsError::FileNotFound(p) => {
                ClientError::Io(io::Error::new(io::ErrorKind::NotFound, p))
            }
            HdfsError::AlreadyExists(p) => {
                ClientError::Io(io::Error::new(io::ErrorKind::AlreadyExists, p))
            }
            other => ClientError::Status(Status::with_message(ErrorKind::Internal, other.to_string())),
        }
    }
}

fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn millis_to_secs(ms: u64) -> i64 {
    i64::try_from(ms / 1000).unwrap_or(i64::MAX)
}

fn secs_to_millis(secs: i64) -> ClientResult<u64> {
    u64::try_from(secs)
        .ok()
        .and_then(|s| s.checked_mul(1000))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("time {} out of range", secs)).into())
}

fn convert(status: &WireStatus) -> FileStatus {
    let name = status.path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let (kind, size) = if status.isdir {
        (ObjectKind::Directory, 0)
    } else {
        (ObjectKind::File, status.length as u64)
    };
    FileStatus {
        kind,
        name: name.to_string(),
        modification_time: millis_to_secs(status.modification_time),
        size,
        permissions: status.permission & 0o7777,
        replication: status
            .replication
            .map(|r| u16::try_from(r).unwrap_or(u16::MAX))
            .unwrap_or(0),
        block_size: status.blocksize.unwrap_or(0),
        owner: status.owner.clone(),
        group: status.group.clone(),
        access_time: millis_to_secs(status.access_time),
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Connects to namenodes over the Hadoop RPC protocol.
pub struct NativeConnector {
    runtime: Arc<Runtime>,
}

impl NativeConnector {
    pub fn new() -> ClientResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(IO_THREADS)
            .thread_name("hdfs5-io")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    fn warn_identity_mismatch(options: &ClientOptions) {
        match &options.kerberos {
            Some(cred) => {
                let ambient = std::env::var_os("KRB5CCNAME");
                let ambient = ambient
                    .as_deref()
                    .map(|v| Path::new(v.to_str().unwrap_or_default().trim_start_matches("FILE:")));
                if ambient != Some(cred.ccache_path()) {
                    tracing::warn!(
                        ccache = %cred.ccache_path().display(),
                        "wire client uses the default ticket cache, not the resolved one"
                    );
                }
            }
            None => {
                let ambient = std::env::var("HADOOP_USER_NAME").unwrap_or_else(|_| current_user());
                if ambient != options.user {
                    tracing::warn!(
                        user = %options.user,
                        %ambient,
                        "wire client connects as the process user"
                    );
                }
            }
        }
    }
}

impl Connector for NativeConnector {
    fn connect(&self, options: &ClientOptions) -> ClientResult<Arc<dyn FileSystemClient>> {
        check_credential(options, epoch_now())?;
        let target = ClusterTarget::from_options(options)?;
        Self::warn_identity_mismatch(options);

        let config: HashMap<String, String> = target.config.into_iter().collect();
        let client = {
            let _guard = self.runtime.enter();
            Client::new_with_config(&target.url, config)?
        };
        tracing::debug!(url = %target.url, user = %options.user, "wire client connected");
        Ok(Arc::new(NativeFileSystem {
            client,
            runtime: Arc::clone(&self.runtime),
            closed: AtomicBool::new(false),
        }))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct NativeFileSystem {
    client: Client,
    runtime: Arc<Runtime>,
    closed: AtomicBool,
}

impl NativeFileSystem {
    fn run<T, F>(&self, fut: F) -> ClientResult<T>
    where
        F: Future<Output = Result<T, HdfsError>>,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        Ok(self.runtime.block_on(fut)?)
    }

    fn remove_path(&self, path: &str, recursive: bool) -> ClientResult<()> {
        if self.run(self.client.delete(path, recursive))? {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, path.to_string()).into())
        }
    }
}

impl FileSystemClient for NativeFileSystem {
    fn stat(&self, path: &str) -> ClientResult<FileStatus> {
        let status = self.run(self.client.get_file_info(path))?;
        Ok(convert(&status))
    }

    fn open(&self, path: &str) -> ClientResult<Arc<dyn FileReader>> {
        let reader = self.run(self.client.read(path))?;
        Ok(Arc::new(NativeReader {
            state: Mutex::new(Some(ReadState { reader, pos: 0 })),
            runtime: Arc::clone(&self.runtime),
        }))
    }

    fn create(
        &self,
        path: &str,
        replication: u16,
        block_size: u64,
        perm: u32,
    ) -> ClientResult<Arc<dyn FileWriter>> {
        let options = WriteOptions {
            replication: Some(u32::from(replication)),
            block_size: Some(block_size),
            permission: perm & 0o7777,
            overwrite: false,
            ..WriteOptions::default()
        };
        let writer = self.run(self.client.create(path, options))?;
        Ok(NativeWriter::new(writer, &self.runtime))
    }

    fn append(&self, path: &str) -> ClientResult<Arc<dyn FileWriter>> {
        let writer = self.run(self.client.append(path))?;
        Ok(NativeWriter::new(writer, &self.runtime))
    }

    fn remove(&self, path: &str) -> ClientResult<()> {
        self.remove_path(path, false)
    }

    fn remove_all(&self, path: &str) -> ClientResult<()> {
        self.remove_path(path, true)
    }

    fn rename(&self, from: &str, to: &str) -> ClientResult<()> {
        self.run(self.client.rename(from, to, false))
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> ClientResult<()> {
        self.run(self.client.mkdirs(path, perm & 0o7777, true))
    }

    fn read_dir(&self, path: &str) -> ClientResult<Vec<FileStatus>> {
        let listing = self.run(self.client.list_status(path, false))?;
        let mut entries: Vec<FileStatus> = listing.iter().map(convert).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn stat_fs(&self) -> ClientResult<FsStats> {
        Err(Status::with_message(ErrorKind::Unsupported, "filesystem usage over the wire client").into())
    }

    fn chown(&self, path: &str, owner: Option<&str>, group: Option<&str>) -> ClientResult<()> {
        self.run(self.client.set_owner(path, owner, group))
    }

    fn chmod(&self, path: &str, perm: u16) -> ClientResult<()> {
        self.run(self.client.set_permission(path, u32::from(perm & 0o7777)))
    }

    fn set_times(&self, path: &str, mtime: i64, atime: i64) -> ClientResult<()> {
        let (mtime, atime) = (secs_to_millis(mtime)?, secs_to_millis(atime)?);
        self.run(self.client.set_times(path, mtime, atime))
    }

    fn close(&self) -> ClientResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

struct ReadState {
    reader: hdfs_native::file::FileReader,
    pos: u64,
}

impl ReadState {
    fn len(&self) -> u64 {
        self.reader.file_length() as u64
    }

    fn read_at(&self, runtime: &Runtime, offset: u64, buf: &mut [u8]) -> ClientResult<usize> {
        let remaining = self.len().saturating_sub(offset);
        let n = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if n == 0 {
            return Ok(0);
        }
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;
        runtime.block_on(self.reader.read_range_buf(&mut buf[..n], start))?;
        Ok(n)
    }
}

struct NativeReader {
    state: Mutex<Option<ReadState>>,
    runtime: Arc<Runtime>,
}

impl FileReader for NativeReader {
    fn read(&self, buf: &mut [u8]) -> ClientResult<usize> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(ClientError::Closed)?;
        let n = state.read_at(&self.runtime, state.pos, buf)?;
        state.pos += n as u64;
        Ok(n)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> ClientResult<usize> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(ClientError::Closed)?;
        state.read_at(&self.runtime, offset, buf)
    }

    fn seek(&self, offset: u64) -> ClientResult<()> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(ClientError::Closed)?;
        if offset > state.len() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("seek past end to {}", offset)).into());
        }
        state.pos = offset;
        Ok(())
    }

    fn tell(&self) -> ClientResult<u64> {
        let guard = self.state.lock();
        guard.as_ref().map(|s| s.pos).ok_or(ClientError::Closed)
    }

    fn close(&self) -> ClientResult<()> {
        self.state.lock().take().map(drop).ok_or(ClientError::Closed)
    }
}

/// Bytes reach readers once the writer is closed; `flush` only checks
/// that the stream is still open.
struct NativeWriter {
    writer: Mutex<Option<hdfs_native::file::FileWriter>>,
    runtime: Arc<Runtime>,
}

impl NativeWriter {
    fn new(writer: hdfs_native::file::FileWriter, runtime: &Arc<Runtime>) -> Arc<dyn FileWriter> {
        Arc::new(Self {
            writer: Mutex::new(Some(writer)),
            runtime: Arc::clone(runtime),
        })
    }
}

impl FileWriter for NativeWriter {
    fn write(&self, buf: &[u8]) -> ClientResult<usize> {
        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(ClientError::Closed)?;
        Ok(self.runtime.block_on(writer.write(Bytes::copy_from_slice(buf)))?)
    }

    fn flush(&self) -> ClientResult<()> {
        self.writer.lock().as_ref().map(drop).ok_or(ClientError::Closed)
    }

    fn close(&self) -> ClientResult<()> {
        let mut writer = self.writer.lock().take().ok_or(ClientError::Closed)?;
        Ok(self.runtime.block_on(writer.close())?)
    }
}
