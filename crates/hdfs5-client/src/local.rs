//! Filesystem client backed by a local directory.
//!
//! The namespace root `/` maps to the connector's root directory.
//! Replication and block size are not meaningful locally; the values a file
//! was created with are remembered for the lifetime of the client and
//! reported back by `stat`.

use std::collections::HashMap;
use std::fs::{self, DirBuilder, File, FileTimes, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::{DirBuilderExt, FileExt, MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hdfs5_config::ClientOptions;
use hdfs5_types::{FileStatus, FsStats, ObjectKind};
use nix::unistd::{Gid, Group, Uid, User};
use parking_lot::Mutex;

use crate::client::{Connector, FileSystemClient};
use crate::error::{ClientError, ClientResult};
use crate::stream::{FileReader, FileWriter};

/// Environment variable naming the local root directory.
pub const ENV_LOCAL_ROOT: &str = "HDFS5_LOCAL_ROOT";

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LocalConnector {
    root: PathBuf,
}

impl LocalConnector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `HDFS5_LOCAL_ROOT`, else `<tmp>/hdfs5`.
    pub fn from_env() -> Self {
        let root = std::env::var_os(ENV_LOCAL_ROOT)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("hdfs5"));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Connector for LocalConnector {
    fn connect(&self, options: &ClientOptions) -> ClientResult<Arc<dyn FileSystemClient>> {
        fs::create_dir_all(&self.root)?;
        tracing::debug!(root = %self.root.display(), user = %options.user, "local client connected");
        Ok(Arc::new(LocalFileSystem::new(self.root.clone(), options)))
    }
}

// ---------------------------------------------------------------------------
// LocalFileSystem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Layout {
    replication: u16,
    block_size: u64,
}

pub struct LocalFileSystem {
    root: PathBuf,
    defaults: Layout,
    layouts: Mutex<HashMap<PathBuf, Layout>>,
    closed: AtomicBool,
}

impl LocalFileSystem {
    pub fn new(root: PathBuf, options: &ClientOptions) -> Self {
        Self {
            root,
            defaults: Layout {
                replication: options.default_replication,
                block_size: options.default_block_size,
            },
            layouts: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Map a namespace path to a local path under the root.
    ///
    /// Accepts absolute paths, relative paths (taken from the root) and
    /// `scheme://authority/path` URIs.
    fn resolve(&self, path: &str) -> ClientResult<PathBuf> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        let trimmed = match path.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
            None => path,
        };
        if trimmed.is_empty() {
            return Err(ClientError::InvalidPath(path.to_string()));
        }
        let mut local = self.root.clone();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => local.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(ClientError::InvalidPath(path.to_string()));
                }
            }
        }
        Ok(local)
    }

    fn status(&self, local: &Path, meta: &fs::Metadata) -> FileStatus {
        let name = if local == self.root {
            String::new()
        } else {
            local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let (kind, layout) = if meta.is_dir() {
            let none = Layout {
                replication: 0,
                block_size: 0,
            };
            (ObjectKind::Directory, none)
        } else {
            let layout = self
                .layouts
                .lock()
                .get(local)
                .copied()
                .unwrap_or(self.defaults);
            (ObjectKind::File, layout)
        };
        FileStatus {
            kind,
            name,
            modification_time: meta.mtime(),
            size: if meta.is_dir() { 0 } else { meta.size() },
            permissions: (meta.mode() & 0o7777) as u16,
            replication: layout.replication,
            block_size: layout.block_size,
            owner: user_name(meta.uid()),
            group: group_name(meta.gid()),
            access_time: meta.atime(),
        }
    }

    fn forget_layouts(&self, local: &Path) {
        self.layouts.lock().retain(|p, _| !p.starts_with(local));
    }
}

impl FileSystemClient for LocalFileSystem {
    fn stat(&self, path: &str) -> ClientResult<FileStatus> {
        let local = self.resolve(path)?;
        let meta = fs::metadata(&local)?;
        Ok(self.status(&local, &meta))
    }

    fn open(&self, path: &str) -> ClientResult<Arc<dyn FileReader>> {
        let local = self.resolve(path)?;
        let file = File::open(&local)?;
        if file.metadata()?.is_dir() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "is a directory").into());
        }
        Ok(Arc::new(LocalReader::new(file)))
    }

    fn create(
        &self,
        path: &str,
        replication: u16,
        block_size: u64,
        perm: u32,
    ) -> ClientResult<Arc<dyn FileWriter>> {
        let local = self.resolve(path)?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(perm)
            .open(&local)?;
        self.layouts.lock().insert(
            local,
            Layout {
                replication,
                block_size,
            },
        );
        Ok(Arc::new(LocalWriter::new(file)))
    }

    fn append(&self, path: &str) -> ClientResult<Arc<dyn FileWriter>> {
        let local = self.resolve(path)?;
        let file = OpenOptions::new().append(true).open(&local)?;
        Ok(Arc::new(LocalWriter::new(file)))
    }

    fn remove(&self, path: &str) -> ClientResult<()> {
        let local = self.resolve(path)?;
        if fs::symlink_metadata(&local)?.is_dir() {
            fs::remove_dir(&local)?;
        } else {
            fs::remove_file(&local)?;
        }
        self.forget_layouts(&local);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> ClientResult<()> {
        let local = self.resolve(path)?;
        if local == self.root {
            return Err(ClientError::InvalidPath(path.to_string()));
        }
        if fs::symlink_metadata(&local)?.is_dir() {
            fs::remove_dir_all(&local)?;
        } else {
            fs::remove_file(&local)?;
        }
        self.forget_layouts(&local);
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> ClientResult<()> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        if fs::symlink_metadata(&dst).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to),
            )
            .into());
        }
        fs::rename(&src, &dst)?;

        let mut layouts = self.layouts.lock();
        let moved: Vec<(PathBuf, Layout)> = layouts
            .iter()
            .filter(|(p, _)| p.starts_with(&src))
            .map(|(p, l)| (p.clone(), *l))
            .collect();
        for (old, layout) in moved {
            layouts.remove(&old);
            if let Ok(rest) = old.strip_prefix(&src) {
                layouts.insert(dst.join(rest), layout);
            }
        }
        Ok(())
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> ClientResult<()> {
        let local = self.resolve(path)?;
        DirBuilder::new().recursive(true).mode(perm).create(&local)?;
        Ok(())
    }

    fn read_dir(&self, path: &str) -> ClientResult<Vec<FileStatus>> {
        let local = self.resolve(path)?;
        if !fs::metadata(&local)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", path),
            )
            .into());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&local)? {
            let entry = entry?;
            let child = entry.path();
            // Follow links the way `stat` does; dangling ones are skipped.
            let Ok(meta) = fs::metadata(&child) else {
                continue;
            };
            entries.push(self.status(&child, &meta));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn stat_fs(&self) -> ClientResult<FsStats> {
        let local = self.resolve("/")?;
        let vfs = nix::sys::statvfs::statvfs(local.as_path()).map_err(io::Error::from)?;
        let frag = vfs.fragment_size() as u64;
        let blocks = vfs.blocks() as u64;
        let free = vfs.blocks_free() as u64;
        Ok(FsStats {
            capacity: blocks * frag,
            used: blocks.saturating_sub(free) * frag,
            remaining: vfs.blocks_available() as u64 * frag,
        })
    }

    fn chown(&self, path: &str, owner: Option<&str>, group: Option<&str>) -> ClientResult<()> {
        let local = self.resolve(path)?;
        let uid = owner.map(lookup_uid).transpose()?;
        let gid = group.map(lookup_gid).transpose()?;
        std::os::unix::fs::chown(&local, uid, gid)?;
        Ok(())
    }

    fn chmod(&self, path: &str, perm: u16) -> ClientResult<()> {
        let local = self.resolve(path)?;
        fs::set_permissions(&local, fs::Permissions::from_mode(u32::from(perm) & 0o7777))?;
        Ok(())
    }

    fn set_times(&self, path: &str, mtime: i64, atime: i64) -> ClientResult<()> {
        let local = self.resolve(path)?;
        let times = FileTimes::new()
            .set_modified(epoch_seconds(mtime))
            .set_accessed(epoch_seconds(atime));
        File::open(&local)?.set_times(times)?;
        Ok(())
    }

    fn close(&self) -> ClientResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ClientError::Closed);
        }
        self.layouts.lock().clear();
        Ok(())
    }
}

fn epoch_seconds(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

fn user_name(uid: u32) -> String {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}

fn group_name(gid: u32) -> String {
    match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}

fn lookup_uid(name: &str) -> ClientResult<u32> {
    if let Ok(uid) = name.parse::<u32>() {
        return Ok(uid);
    }
    match User::from_name(name).map_err(io::Error::from)? {
        Some(user) => Ok(user.uid.as_raw()),
        None => Err(io::Error::new(io::ErrorKind::InvalidInput, format!("unknown user {}", name)).into()),
    }
}

fn lookup_gid(name: &str) -> ClientResult<u32> {
    if let Ok(gid) = name.parse::<u32>() {
        return Ok(gid);
    }
    match Group::from_name(name).map_err(io::Error::from)? {
        Some(group) => Ok(group.gid.as_raw()),
        None => Err(io::Error::new(io::ErrorKind::InvalidInput, format!("unknown group {}", name)).into()),
    }
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

struct ReaderState {
    file: File,
    pos: u64,
}

pub struct LocalReader {
    state: Mutex<Option<ReaderState>>,
}

impl LocalReader {
    fn new(file: File) -> Self {
        Self {
            state: Mutex::new(Some(ReaderState { file, pos: 0 })),
        }
    }
}

fn read_full_at(file: &File, mut offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read_at(&mut buf[total..], offset) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

impl FileReader for LocalReader {
    fn read(&self, buf: &mut [u8]) -> ClientResult<usize> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(ClientError::Closed)?;
        let n = read_full_at(&state.file, state.pos, buf)?;
        state.pos += n as u64;
        Ok(n)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> ClientResult<usize> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(ClientError::Closed)?;
        Ok(read_full_at(&state.file, offset, buf)?)
    }

    fn seek(&self, offset: u64) -> ClientResult<()> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(ClientError::Closed)?;
        let len = state.file.metadata()?.len();
        if offset > len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek to {} past end of file ({})", offset, len),
            )
            .into());
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

pub struct LocalWriter {
    inner: Mutex<Option<BufWriter<File>>>,
}

impl LocalWriter {
    fn new(file: File) -> Self {
        Self {
            inner: Mutex::new(Some(BufWriter::new(file))),
        }
    }
}

impl FileWriter for LocalWriter {
    fn write(&self, buf: &[u8]) -> ClientResult<usize> {
        let mut guard = self.inner.lock();
        let writer = guard.as_mut().ok_or(ClientError::Closed)?;
        writer.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&self) -> ClientResult<()> {
        let mut guard = self.inner.lock();
        guard.as_mut().ok_or(ClientError::Closed)?.flush()?;
        Ok(())
    }

    fn close(&self) -> ClientResult<()> {
        let writer = self.inner.lock().take().ok_or(ClientError::Closed)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}
