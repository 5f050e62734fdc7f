//! Boundary operations as safe methods.
//!
//! A [`Bridge`] owns the handle registry, the configuration resolver and a
//! connector. The exported C functions are thin wrappers that translate
//! pointers to handles and a [`Status`] to an errno; everything observable
//! happens here.

use std::sync::Arc;

use hdfs5_client::{Connector, FileReader, FileSystemClient, FileWriter};
use hdfs5_config::{ClientOptions, ConfigResolver, Configuration};
use hdfs5_types::{make_error_msg, ErrorKind, FileStatus, Handle, Result, Status, Void};

use crate::registry::Registry;

/// Permission for files created by `open_file`.
pub const DEFAULT_FILE_PERM: u32 = 0o644;
/// Permission for directories created by `create_directory`.
pub const DEFAULT_DIR_PERM: u32 = 0o755;

/// A connected client and the options it was built from.
#[derive(Clone)]
pub struct ClientSession {
    fs: Arc<dyn FileSystemClient>,
    options: Arc<ClientOptions>,
}

impl ClientSession {
    pub fn new(fs: Arc<dyn FileSystemClient>, options: ClientOptions) -> Self {
        Self {
            fs,
            options: Arc::new(options),
        }
    }

    pub fn fs(&self) -> &Arc<dyn FileSystemClient> {
        &self.fs
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

/// The three legal ways to open a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Write-only; an existing file is replaced.
    Truncate,
    Append,
}

impl OpenMode {
    /// Classify `open(2)`-style flags.
    ///
    /// `O_CREAT` and `O_TRUNC` are implied by write-only opens and tolerated
    /// there. Read-write is unsupported; anything else is invalid.
    pub fn from_flags(flags: i32) -> Result<Self> {
        let access = flags & libc::O_ACCMODE;
        let extra = flags & !libc::O_ACCMODE;
        match access {
            libc::O_RDWR => make_error_msg(ErrorKind::Unsupported, "read-write open is not supported"),
            libc::O_RDONLY if extra == 0 => Ok(OpenMode::Read),
            libc::O_WRONLY if extra & !(libc::O_CREAT | libc::O_TRUNC) == 0 => Ok(OpenMode::Truncate),
            libc::O_WRONLY if extra & !libc::O_CREAT == libc::O_APPEND => Ok(OpenMode::Append),
            _ => make_error_msg(ErrorKind::InvalidArgument, format!("unsupported open flags {:#o}", flags)),
        }
    }
}

/// An open file: exactly one of a reader or a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFile {
    Reader(Handle),
    Writer(Handle),
}

impl OpenFile {
    /// Rebuild from the two tokens of a boundary file structure. Both or
    /// neither being set is not a valid file.
    pub fn from_tokens(reader: Handle, writer: Handle) -> Option<Self> {
        match (reader.is_null(), writer.is_null()) {
            (false, true) => Some(OpenFile::Reader(reader)),
            (true, false) => Some(OpenFile::Writer(writer)),
            _ => None,
        }
    }

    /// `(reader, writer)` tokens, one of them null.
    pub fn tokens(self) -> (Handle, Handle) {
        match self {
            OpenFile::Reader(h) => (h, Handle::NULL),
            OpenFile::Writer(h) => (Handle::NULL, h),
        }
    }
}

pub struct Bridge {
    registry: Registry,
    resolver: ConfigResolver,
    connector: Arc<dyn Connector>,
}

fn bad_handle<T>(what: &str, handle: Handle) -> Result<T> {
    make_error_msg(ErrorKind::BadHandle, format!("unknown {} handle {}", what, handle))
}

/// Log a failure with its full diagnostic before only the kind crosses the
/// boundary.
fn logged<T>(op: &'static str, result: Result<T>) -> Result<T> {
    if let Err(ref status) = result {
        tracing::warn!(op, error = %status, "operation failed");
    }
    result
}

impl Bridge {
    pub fn new(resolver: ConfigResolver, connector: Arc<dyn Connector>) -> Self {
        Self {
            registry: Registry::new(),
            resolver,
            connector,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    fn client(&self, handle: Handle) -> Result<ClientSession> {
        match self.registry.lookup::<ClientSession>(handle) {
            Some(session) => Ok(session),
            None => logged("lookup", bad_handle("client", handle)),
        }
    }

    fn reader(&self, handle: Handle) -> Result<Arc<dyn FileReader>> {
        match self.registry.lookup::<Arc<dyn FileReader>>(handle) {
            Some(reader) => Ok(reader),
            None => logged("lookup", bad_handle("reader", handle)),
        }
    }

    fn writer(&self, handle: Handle) -> Result<Arc<dyn FileWriter>> {
        match self.registry.lookup::<Arc<dyn FileWriter>>(handle) {
            Some(writer) => Ok(writer),
            None => logged("lookup", bad_handle("writer", handle)),
        }
    }

    // ── Configuration ───────────────────────────────────────────────────

    pub fn new_configuration(&self) -> Handle {
        let conf = self.resolver.new_configuration();
        let handle = self.registry.allocate(conf);
        tracing::debug!(%handle, "configuration created");
        handle
    }

    /// Setters are no-ops on unknown handles.
    fn edit(&self, handle: Handle, f: impl FnOnce(&mut Configuration)) {
        if self.registry.update(handle, f).is_none() {
            tracing::debug!(%handle, "ignoring setter on unknown configuration");
        }
    }

    pub fn set_namenode(&self, handle: Handle, nn: &str) {
        self.edit(handle, |c| c.set_namenode(nn));
    }

    pub fn set_namenode_port(&self, handle: Handle, port: u16) {
        self.edit(handle, |c| c.set_namenode_port(port));
    }

    pub fn set_user_name(&self, handle: Handle, user: &str) {
        self.edit(handle, |c| c.set_user(user));
    }

    pub fn set_kerb_ticket_cache_path(&self, handle: Handle, path: &str) {
        self.edit(handle, |c| c.set_ticket_cache_path(path));
    }

    pub fn conf_set_str(&self, handle: Handle, key: &str, value: &str) -> Result<Void> {
        match self.registry.update(handle, |c: &mut Configuration| c.set_override(key, value)) {
            Some(()) => Ok(()),
            None => bad_handle("configuration", handle),
        }
    }

    pub fn discard_configuration(&self, handle: Handle) {
        if self.registry.release::<Configuration>(handle).is_some() {
            tracing::debug!(%handle, "configuration discarded");
        }
    }

    /// One value from the ambient configuration.
    pub fn conf_get_str(&self, key: &str) -> Option<String> {
        self.resolver
            .conf_manager()
            .get()
            .get(key)
            .map(str::to_string)
    }

    // ── Connect / disconnect ────────────────────────────────────────────

    /// Connect a configuration. On success the configuration is consumed;
    /// on failure it stays live so the caller may retry or discard it.
    pub fn connect(&self, config: Handle) -> Result<Handle> {
        logged("connect", self.connect_inner(config))
    }

    fn connect_inner(&self, config: Handle) -> Result<Handle> {
        let Some(conf) = self.registry.lookup::<Configuration>(config) else {
            return bad_handle("configuration", config);
        };
        let options = self.resolver.resolve(&conf)?;
        let fs = self.connector.connect(&options)?;

        let namenodes = options.addresses.clone();
        let user = options.user.clone();
        let session = ClientSession::new(fs, options);
        match self
            .registry
            .exchange::<Configuration, ClientSession>(config, session)
        {
            Ok((_, client)) => {
                tracing::info!(%client, ?namenodes, %user, "client connected");
                Ok(client)
            }
            Err(session) => {
                // Discarded by another thread while we were connecting.
                if let Err(e) = session.fs.close() {
                    tracing::debug!(error = %e, "closing orphaned client");
                }
                bad_handle("configuration", config)
            }
        }
    }

    /// Close a client. Files opened from it are left alone.
    pub fn disconnect(&self, client: Handle) -> Result<Void> {
        let Some(session) = self.registry.release::<ClientSession>(client) else {
            return logged("disconnect", bad_handle("client", client));
        };
        tracing::info!(%client, "client disconnected");
        logged("disconnect", session.fs.close().map_err(Status::from))
    }

    // ── Files ───────────────────────────────────────────────────────────

    /// Open `path`. A replication or block size of 0 selects the client's
    /// configured default.
    pub fn open_file(
        &self,
        client: Handle,
        path: &str,
        flags: i32,
        replication: u16,
        block_size: u64,
    ) -> Result<OpenFile> {
        logged("open", self.open_inner(client, path, flags, replication, block_size))
    }

    fn open_inner(
        &self,
        client: Handle,
        path: &str,
        flags: i32,
        replication: u16,
        block_size: u64,
    ) -> Result<OpenFile> {
        let session = self.client(client)?;
        let mode = OpenMode::from_flags(flags)?;
        let fs = session.fs();

        let file = match mode {
            OpenMode::Read => {
                let reader = fs.open(path)?;
                OpenFile::Reader(self.registry.allocate(reader))
            }
            OpenMode::Truncate => {
                if fs.stat(path).is_ok() {
                    fs.remove(path)?;
                }
                let options = session.options();
                let replication = if replication == 0 {
                    options.default_replication
                } else {
                    replication
                };
                let block_size = if block_size == 0 {
                    options.default_block_size
                } else {
                    block_size
                };
                let writer = fs.create(path, replication, block_size, DEFAULT_FILE_PERM)?;
                OpenFile::Writer(self.registry.allocate(writer))
            }
            OpenMode::Append => {
                let writer = fs.append(path)?;
                OpenFile::Writer(self.registry.allocate(writer))
            }
        };
        tracing::debug!(path, ?mode, ?file, "file opened");
        Ok(file)
    }

    /// Close whichever of reader or writer the file holds.
    pub fn close_file(&self, file: OpenFile) -> Result<Void> {
        let result = match file {
            OpenFile::Reader(h) => match self.registry.release::<Arc<dyn FileReader>>(h) {
                Some(reader) => reader.close().map_err(Status::from),
                None => bad_handle("reader", h),
            },
            OpenFile::Writer(h) => match self.registry.release::<Arc<dyn FileWriter>>(h) {
                Some(writer) => writer.close().map_err(Status::from),
                None => bad_handle("writer", h),
            },
        };
        if result.is_ok() {
            tracing::debug!(?file, "file closed");
        }
        logged("close", result)
    }

    pub fn seek(&self, reader: Handle, pos: i64) -> Result<Void> {
        let r = self.reader(reader)?;
        let Ok(pos) = u64::try_from(pos) else {
            return logged("seek", make_error_msg(ErrorKind::InvalidArgument, "negative seek offset"));
        };
        logged("seek", r.seek(pos).map_err(Status::from))
    }

    pub fn tell(&self, reader: Handle) -> Result<u64> {
        let r = self.reader(reader)?;
        logged("tell", r.tell().map_err(Status::from))
    }

    /// Sequential read from the cursor. End of data yields 0.
    pub fn read(&self, reader: Handle, buf: &mut [u8]) -> Result<usize> {
        let r = self.reader(reader)?;
        logged("read", r.read(buf).map_err(Status::from))
    }

    /// Read at `offset` without moving the cursor. Short counts mean end of
    /// data, not an error.
    pub fn pread(&self, reader: Handle, offset: i64, buf: &mut [u8]) -> Result<usize> {
        let r = self.reader(reader)?;
        let Ok(offset) = u64::try_from(offset) else {
            return logged("pread", make_error_msg(ErrorKind::InvalidArgument, "negative read offset"));
        };
        logged("pread", r.read_at(offset, buf).map_err(Status::from))
    }

    pub fn write(&self, writer: Handle, buf: &[u8]) -> Result<usize> {
        let w = self.writer(writer)?;
        logged("write", w.write(buf).map_err(Status::from))
    }

    /// Push buffered output to the filesystem.
    ///
    /// `flush`, `hflush` and `hsync` all perform this same operation.
    pub fn flush(&self, writer: Handle) -> Result<Void> {
        let w = self.writer(writer)?;
        logged("flush", w.flush().map_err(Status::from))
    }

    pub fn hflush(&self, writer: Handle) -> Result<Void> {
        self.flush(writer)
    }

    pub fn hsync(&self, writer: Handle) -> Result<Void> {
        self.flush(writer)
    }

    // ── Namespace ───────────────────────────────────────────────────────

    pub fn exists(&self, client: Handle, path: &str) -> Result<Void> {
        let session = self.client(client)?;
        logged("exists", session.fs().stat(path).map(drop).map_err(Status::from))
    }

    /// Remove `path`. Only a directory with `recursive` set is removed with
    /// its contents.
    pub fn delete(&self, client: Handle, path: &str, recursive: bool) -> Result<Void> {
        let session = self.client(client)?;
        let fs = session.fs();
        let result = fs.stat(path).map_err(Status::from).and_then(|st| {
            let removed = if st.is_dir() && recursive {
                fs.remove_all(path)
            } else {
                fs.remove(path)
            };
            removed.map_err(Status::from)
        });
        logged("delete", result)
    }

    pub fn rename(&self, client: Handle, from: &str, to: &str) -> Result<Void> {
        let session = self.client(client)?;
        logged("rename", session.fs().rename(from, to).map_err(Status::from))
    }

    pub fn create_directory(&self, client: Handle, path: &str) -> Result<Void> {
        let session = self.client(client)?;
        logged(
            "mkdir",
            session.fs().mkdir_all(path, DEFAULT_DIR_PERM).map_err(Status::from),
        )
    }

    /// Entries of a directory. An empty directory is an empty list, not an
    /// error.
    pub fn list_directory(&self, client: Handle, path: &str) -> Result<Vec<FileStatus>> {
        let session = self.client(client)?;
        logged("list", session.fs().read_dir(path).map_err(Status::from))
    }

    pub fn get_path_info(&self, client: Handle, path: &str) -> Result<FileStatus> {
        let session = self.client(client)?;
        logged("stat", session.fs().stat(path).map_err(Status::from))
    }

    pub fn get_default_block_size(&self, client: Handle) -> Result<u64> {
        Ok(self.client(client)?.options().default_block_size)
    }

    pub fn get_capacity(&self, client: Handle) -> Result<u64> {
        let session = self.client(client)?;
        logged("statfs", session.fs().stat_fs().map(|s| s.capacity).map_err(Status::from))
    }

    pub fn get_used(&self, client: Handle) -> Result<u64> {
        let session = self.client(client)?;
        logged("statfs", session.fs().stat_fs().map(|s| s.used).map_err(Status::from))
    }

    /// Change ownership. Empty names leave that attribute unchanged.
    pub fn chown(&self, client: Handle, path: &str, owner: &str, group: &str) -> Result<Void> {
        let session = self.client(client)?;
        let owner = Some(owner).filter(|o| !o.is_empty());
        let group = Some(group).filter(|g| !g.is_empty());
        if owner.is_none() && group.is_none() {
            return make_error_msg(ErrorKind::InvalidArgument, "chown needs an owner or a group");
        }
        logged("chown", session.fs().chown(path, owner, group).map_err(Status::from))
    }

    pub fn chmod(&self, client: Handle, path: &str, perm: u16) -> Result<Void> {
        let session = self.client(client)?;
        logged("chmod", session.fs().chmod(path, perm).map_err(Status::from))
    }

    /// Set times, in seconds since the epoch.
    pub fn utime(&self, client: Handle, path: &str, mtime: i64, atime: i64) -> Result<Void> {
        let session = self.client(client)?;
        logged("utime", session.fs().set_times(path, mtime, atime).map_err(Status::from))
    }

    // ── Teardown ────────────────────────────────────────────────────────

    /// Close and release every live object. Streams go first, then clients.
    pub fn shutdown(&self) {
        let drained = self.registry.drain_all();
        let (readers, writers, clients) = (
            drained.readers.len(),
            drained.writers.len(),
            drained.clients.len(),
        );
        for (handle, reader) in drained.readers {
            if let Err(e) = reader.close() {
                tracing::warn!(%handle, error = %e, "closing reader at shutdown");
            }
        }
        for (handle, writer) in drained.writers {
            if let Err(e) = writer.close() {
                tracing::warn!(%handle, error = %e, "closing writer at shutdown");
            }
        }
        for (handle, session) in drained.clients {
            if let Err(e) = session.fs.close() {
                tracing::warn!(%handle, error = %e, "closing client at shutdown");
            }
        }
        tracing::info!(
            readers,
            writers,
            clients,
            configurations = drained.configurations.len(),
            "bridge shut down"
        );
    }
}
