//! `hdfs5*` exports.
//!
//! Value-returning functions report failure with a sentinel (null or -1)
//! and write the boundary errno through their last `errno` argument;
//! `int`-returning ones return 0 or the errno directly. No panic crosses
//! this boundary: every entry point runs under `catch_unwind` and reports a
//! caught panic as an internal error.

use std::ffi::CStr;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use hdfs5_types::{make_error, make_error_msg, ErrorKind, FileStatus, Handle, Result, Status, Void};
use libc::{c_char, c_int, c_short, c_void};

use crate::bridge::{Bridge, OpenFile};
use crate::context;
use crate::types::{
    hdfsBuilder, hdfsFS, hdfsFile, hdfsFileInfo, hdfsFile_internal, hdfs_internal, tOffset, tPort,
    tSize, tTime,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn guarded<R>(f: impl FnOnce(&Bridge) -> Result<R>) -> Result<R> {
    match panic::catch_unwind(AssertUnwindSafe(|| f(context::bridge()))) {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("panic caught at the native boundary");
            make_error_msg(ErrorKind::Internal, "panic")
        }
    }
}

/// Run `f`, writing the errno of a failure to `errno` and returning
/// `fallback` in its place.
unsafe fn with_errno<R>(errno: *mut c_int, fallback: R, f: impl FnOnce(&Bridge) -> Result<R>) -> R {
    match guarded(f) {
        Ok(value) => value,
        Err(status) => {
            if !errno.is_null() {
                *errno = status.errno();
            }
            fallback
        }
    }
}

fn with_code(f: impl FnOnce(&Bridge) -> Result<Void>) -> c_int {
    match guarded(f) {
        Ok(()) => 0,
        Err(status) => status.errno(),
    }
}

fn with_unit(f: impl FnOnce(&Bridge)) {
    let _ = guarded(|b| {
        f(b);
        Ok(())
    });
}

unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return make_error_msg(ErrorKind::InvalidArgument, format!("{} is null", what));
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| {
        Status::with_message(ErrorKind::InvalidArgument, format!("{} is not valid UTF-8", what))
    })
}

/// Like [`str_arg`], but null reads as the empty string.
unsafe fn opt_str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        Ok("")
    } else {
        str_arg(ptr, what)
    }
}

unsafe fn builder_handle(bld: *const hdfsBuilder) -> Handle {
    bld.as_ref().map_or(Handle::NULL, hdfsBuilder::handle)
}

unsafe fn client_handle(fs: hdfsFS) -> Handle {
    fs.as_ref().map_or(Handle::NULL, hdfs_internal::handle)
}

unsafe fn reader_handle(file: hdfsFile) -> Handle {
    file.as_ref().map_or(Handle::NULL, |f| f.handles().0)
}

unsafe fn writer_handle(file: hdfsFile) -> Handle {
    file.as_ref().map_or(Handle::NULL, |f| f.handles().1)
}

fn non_negative<T: TryInto<u64> + Copy>(value: T, what: &str) -> Result<u64> {
    value
        .try_into()
        .map_err(|_| Status::with_message(ErrorKind::InvalidArgument, format!("negative {}", what)))
}

/// `malloc`ed, NUL-terminated copy of `s`.
unsafe fn c_strdup(s: &str) -> *mut c_char {
    let bytes = s.as_bytes();
    let out = libc::malloc(bytes.len() + 1) as *mut u8;
    if out.is_null() {
        return ptr::null_mut();
    }
    ptr::copy_nonoverlapping(bytes.as_ptr(), out, bytes.len());
    *out.add(bytes.len()) = 0;
    out as *mut c_char
}

unsafe fn alloc_file_infos(entries: &[FileStatus]) -> Result<*mut hdfsFileInfo> {
    let array = libc::calloc(entries.len(), mem::size_of::<hdfsFileInfo>()) as *mut hdfsFileInfo;
    if array.is_null() {
        return make_error(ErrorKind::OutOfMemory);
    }
    for (i, status) in entries.iter().enumerate() {
        let mut info = hdfsFileInfo::scalars(status);
        info.mName = c_strdup(&status.name);
        info.mOwner = c_strdup(&status.owner);
        info.mGroup = c_strdup(&status.group);
        let failed = info.mName.is_null() || info.mOwner.is_null() || info.mGroup.is_null();
        array.add(i).write(info);
        if failed {
            free_file_infos(array, i + 1);
            return make_error(ErrorKind::OutOfMemory);
        }
    }
    Ok(array)
}

unsafe fn free_file_infos(array: *mut hdfsFileInfo, count: usize) {
    if array.is_null() {
        return;
    }
    for i in 0..count {
        let info = &*array.add(i);
        libc::free(info.mName as *mut c_void);
        libc::free(info.mOwner as *mut c_void);
        libc::free(info.mGroup as *mut c_void);
    }
    libc::free(array as *mut c_void);
}

/// Whether the wrapper behind a handle should be freed after `result`: a
/// bad handle means the object was never ours to release.
fn consumed(result: &Result<Void>) -> bool {
    !matches!(result, Err(s) if s.kind() == ErrorKind::BadHandle)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn hdfs5NewBuilder(errno: *mut c_int) -> *mut hdfsBuilder {
    with_errno(errno, ptr::null_mut(), |b| {
        let handle = b.new_configuration();
        Ok(Box::into_raw(Box::new(hdfsBuilder {
            opts_id: handle.as_raw(),
        })))
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5BuilderSetNameNode(bld: *mut hdfsBuilder, nn: *const c_char) {
    let handle = builder_handle(bld);
    with_unit(|b| {
        if let Ok(nn) = str_arg(nn, "namenode") {
            b.set_namenode(handle, nn);
        }
    });
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5BuilderSetNameNodePort(bld: *mut hdfsBuilder, port: tPort) {
    let handle = builder_handle(bld);
    with_unit(|b| b.set_namenode_port(handle, port));
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5BuilderSetUserName(bld: *mut hdfsBuilder, user: *const c_char) {
    let handle = builder_handle(bld);
    with_unit(|b| {
        if let Ok(user) = str_arg(user, "user name") {
            b.set_user_name(handle, user);
        }
    });
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5BuilderSetKerbTicketCachePath(
    bld: *mut hdfsBuilder,
    path: *const c_char,
) {
    let handle = builder_handle(bld);
    with_unit(|b| {
        if let Ok(path) = str_arg(path, "ticket cache path") {
            b.set_kerb_ticket_cache_path(handle, path);
        }
    });
}

/// Every connect builds a new client, so this is a no-op.
#[no_mangle]
pub unsafe extern "C" fn hdfs5BuilderSetForceNewInstance(_bld: *mut hdfsBuilder) {}

#[no_mangle]
pub unsafe extern "C" fn hdfs5BuilderConfSetStr(
    bld: *mut hdfsBuilder,
    key: *const c_char,
    val: *const c_char,
) -> c_int {
    let handle = builder_handle(bld);
    with_code(|b| {
        let key = str_arg(key, "key")?;
        let val = str_arg(val, "value")?;
        b.conf_set_str(handle, key, val)
    })
}

/// Release a builder that was never connected.
#[no_mangle]
pub unsafe extern "C" fn hdfs5FreeBuilder(bld: *mut hdfsBuilder) {
    if bld.is_null() {
        return;
    }
    let handle = builder_handle(bld);
    with_unit(|b| b.discard_configuration(handle));
    drop(Box::from_raw(bld));
}

/// Connect a builder. The builder is freed on success only.
#[no_mangle]
pub unsafe extern "C" fn hdfs5BuilderConnect(bld: *mut hdfsBuilder, errno: *mut c_int) -> hdfsFS {
    let handle = builder_handle(bld);
    let fs = with_errno(errno, ptr::null_mut(), |b| {
        let client = b.connect(handle)?;
        Ok(Box::into_raw(Box::new(hdfs_internal {
            client_id: client.as_raw(),
        })))
    });
    if !fs.is_null() {
        drop(Box::from_raw(bld));
    }
    fs
}

/// Ambient configuration value, or null when the key is unset. Release with
/// `hdfs5ConfStrFree`.
#[no_mangle]
pub unsafe extern "C" fn hdfs5ConfGetStr(key: *const c_char) -> *mut c_char {
    with_errno(ptr::null_mut(), ptr::null_mut(), |b| {
        let key = str_arg(key, "key")?;
        Ok(match b.conf_get_str(key) {
            Some(value) => c_strdup(&value),
            None => ptr::null_mut(),
        })
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5ConfStrFree(val: *mut c_char) {
    libc::free(val as *mut c_void);
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn hdfs5Disconnect(fs: hdfsFS) -> c_int {
    let handle = client_handle(fs);
    let result = guarded(|b| b.disconnect(handle));
    if !fs.is_null() && consumed(&result) {
        drop(Box::from_raw(fs));
    }
    match result {
        Ok(()) => 0,
        Err(status) => status.errno(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5OpenFile(
    fs: hdfsFS,
    path: *const c_char,
    flags: c_int,
    _buffer_size: c_int,
    replication: c_short,
    block_size: tSize,
    errno: *mut c_int,
) -> hdfsFile {
    let handle = client_handle(fs);
    with_errno(errno, ptr::null_mut(), |b| {
        let path = str_arg(path, "path")?;
        let replication = u16::try_from(replication).map_err(|_| {
            Status::with_message(ErrorKind::InvalidArgument, "negative replication")
        })?;
        let block_size = non_negative(block_size, "block size")?;
        let file = b.open_file(handle, path, flags, replication, block_size)?;
        let (reader, writer) = file.tokens();
        Ok(Box::into_raw(Box::new(hdfsFile_internal {
            reader_id: reader.as_raw(),
            writer_id: writer.as_raw(),
        })))
    })
}

/// Close a file. The wrapper is freed unless the handle was not a live
/// file.
#[no_mangle]
pub unsafe extern "C" fn hdfs5CloseFile(_fs: hdfsFS, file: hdfsFile) -> c_int {
    let Some(open) = file
        .as_ref()
        .and_then(|f| {
            let (reader, writer) = f.handles();
            OpenFile::from_tokens(reader, writer)
        })
    else {
        return libc::EBADF;
    };
    let result = guarded(|b| b.close_file(open));
    if consumed(&result) {
        drop(Box::from_raw(file));
    }
    match result {
        Ok(()) => 0,
        Err(status) => status.errno(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Exists(fs: hdfsFS, path: *const c_char) -> c_int {
    let handle = client_handle(fs);
    with_code(|b| b.exists(handle, str_arg(path, "path")?))
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn hdfs5Seek(_fs: hdfsFS, file: hdfsFile, pos: tOffset) -> c_int {
    let handle = reader_handle(file);
    with_code(|b| b.seek(handle, pos))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Tell(_fs: hdfsFS, file: hdfsFile, errno: *mut c_int) -> tOffset {
    let handle = reader_handle(file);
    with_errno(errno, -1, |b| Ok(b.tell(handle)? as tOffset))
}

unsafe fn buffer_mut<'a>(buffer: *mut c_void, length: tSize) -> Result<&'a mut [u8]> {
    let len = non_negative(length, "length")? as usize;
    if len == 0 {
        return Ok(&mut []);
    }
    if buffer.is_null() {
        return make_error_msg(ErrorKind::InvalidArgument, "buffer is null");
    }
    Ok(std::slice::from_raw_parts_mut(buffer as *mut u8, len))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Read(
    _fs: hdfsFS,
    file: hdfsFile,
    buffer: *mut c_void,
    length: tSize,
    errno: *mut c_int,
) -> tSize {
    let handle = reader_handle(file);
    with_errno(errno, -1, |b| {
        let buf = buffer_mut(buffer, length)?;
        Ok(b.read(handle, buf)? as tSize)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Pread(
    _fs: hdfsFS,
    file: hdfsFile,
    position: tOffset,
    buffer: *mut c_void,
    length: tSize,
    errno: *mut c_int,
) -> tSize {
    let handle = reader_handle(file);
    with_errno(errno, -1, |b| {
        let buf = buffer_mut(buffer, length)?;
        Ok(b.pread(handle, position, buf)? as tSize)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Write(
    _fs: hdfsFS,
    file: hdfsFile,
    buffer: *const c_void,
    length: tSize,
    errno: *mut c_int,
) -> tSize {
    let handle = writer_handle(file);
    with_errno(errno, -1, |b| {
        let len = non_negative(length, "length")? as usize;
        let data: &[u8] = if len == 0 {
            &[]
        } else if buffer.is_null() {
            return make_error_msg(ErrorKind::InvalidArgument, "buffer is null");
        } else {
            std::slice::from_raw_parts(buffer as *const u8, len)
        };
        Ok(b.write(handle, data)? as tSize)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Flush(_fs: hdfsFS, file: hdfsFile) -> c_int {
    let handle = writer_handle(file);
    with_code(|b| b.flush(handle))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5HFlush(_fs: hdfsFS, file: hdfsFile) -> c_int {
    let handle = writer_handle(file);
    with_code(|b| b.hflush(handle))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5HSync(_fs: hdfsFS, file: hdfsFile) -> c_int {
    let handle = writer_handle(file);
    with_code(|b| b.hsync(handle))
}

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn hdfs5Delete(fs: hdfsFS, path: *const c_char, recursive: c_int) -> c_int {
    let handle = client_handle(fs);
    with_code(|b| b.delete(handle, str_arg(path, "path")?, recursive != 0))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Rename(
    fs: hdfsFS,
    old_path: *const c_char,
    new_path: *const c_char,
) -> c_int {
    let handle = client_handle(fs);
    with_code(|b| {
        let from = str_arg(old_path, "old path")?;
        let to = str_arg(new_path, "new path")?;
        b.rename(handle, from, to)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5CreateDirectory(fs: hdfsFS, path: *const c_char) -> c_int {
    let handle = client_handle(fs);
    with_code(|b| b.create_directory(handle, str_arg(path, "path")?))
}

/// List a directory. An empty directory returns null with `*num_entries`
/// set to 0 and no error; callers must check `errno` to tell the two apart.
#[no_mangle]
pub unsafe extern "C" fn hdfs5ListDirectory(
    fs: hdfsFS,
    path: *const c_char,
    num_entries: *mut c_int,
    errno: *mut c_int,
) -> *mut hdfsFileInfo {
    if !num_entries.is_null() {
        *num_entries = 0;
    }
    let handle = client_handle(fs);
    with_errno(errno, ptr::null_mut(), |b| {
        let entries = b.list_directory(handle, str_arg(path, "path")?)?;
        if entries.is_empty() {
            return Ok(ptr::null_mut());
        }
        let count = c_int::try_from(entries.len())
            .map_err(|_| Status::with_message(ErrorKind::Internal, "too many entries"))?;
        let array = alloc_file_infos(&entries)?;
        if !num_entries.is_null() {
            *num_entries = count;
        }
        Ok(array)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5GetPathInfo(
    fs: hdfsFS,
    path: *const c_char,
    errno: *mut c_int,
) -> *mut hdfsFileInfo {
    let handle = client_handle(fs);
    with_errno(errno, ptr::null_mut(), |b| {
        let status = b.get_path_info(handle, str_arg(path, "path")?)?;
        alloc_file_infos(std::slice::from_ref(&status))
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5FreeFileInfo(info: *mut hdfsFileInfo, num_entries: c_int) {
    free_file_infos(info, usize::try_from(num_entries).unwrap_or(0));
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5GetDefaultBlockSize(fs: hdfsFS, errno: *mut c_int) -> tOffset {
    let handle = client_handle(fs);
    with_errno(errno, -1, |b| Ok(b.get_default_block_size(handle)? as tOffset))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5GetCapacity(fs: hdfsFS, errno: *mut c_int) -> tOffset {
    let handle = client_handle(fs);
    with_errno(errno, -1, |b| Ok(b.get_capacity(handle)? as tOffset))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5GetUsed(fs: hdfsFS, errno: *mut c_int) -> tOffset {
    let handle = client_handle(fs);
    with_errno(errno, -1, |b| Ok(b.get_used(handle)? as tOffset))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Chown(
    fs: hdfsFS,
    path: *const c_char,
    owner: *const c_char,
    group: *const c_char,
) -> c_int {
    let handle = client_handle(fs);
    with_code(|b| {
        let path = str_arg(path, "path")?;
        let owner = opt_str_arg(owner, "owner")?;
        let group = opt_str_arg(group, "group")?;
        b.chown(handle, path, owner, group)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Chmod(fs: hdfsFS, path: *const c_char, mode: c_short) -> c_int {
    let handle = client_handle(fs);
    with_code(|b| b.chmod(handle, str_arg(path, "path")?, mode as u16 & 0o7777))
}

#[no_mangle]
pub unsafe extern "C" fn hdfs5Utime(
    fs: hdfsFS,
    path: *const c_char,
    mtime: tTime,
    atime: tTime,
) -> c_int {
    let handle = client_handle(fs);
    with_code(|b| b.utime(handle, str_arg(path, "path")?, mtime as i64, atime as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn cstr(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn connect() -> hdfsFS {
        context::install_test_bridge();
        let mut err = 0;
        let bld = hdfs5NewBuilder(&mut err);
        assert!(!bld.is_null());
        hdfs5BuilderSetNameNode(bld, cstr("default").as_ptr());
        let fs = hdfs5BuilderConnect(bld, &mut err);
        assert_eq!(err, 0);
        assert!(!fs.is_null());
        fs
    }

    #[test]
    fn test_write_then_read_back() {
        unsafe {
            let fs = connect();
            let path = cstr("/ffi-rw.txt");
            let mut err = 0;

            let w = hdfs5OpenFile(fs, path.as_ptr(), libc::O_WRONLY, 0, 0, 0, &mut err);
            assert!(!w.is_null(), "errno {}", err);
            let data = b"native bytes";
            let n = hdfs5Write(fs, w, data.as_ptr() as *const c_void, data.len() as tSize, &mut err);
            assert_eq!(n, data.len() as tSize);
            assert_eq!(hdfs5HFlush(fs, w), 0);
            assert_eq!(hdfs5CloseFile(fs, w), 0);

            let r = hdfs5OpenFile(fs, path.as_ptr(), libc::O_RDONLY, 0, 0, 0, &mut err);
            assert!(!r.is_null());
            let mut buf = [0u8; 64];
            let n = hdfs5Pread(fs, r, 7, buf.as_mut_ptr() as *mut c_void, 64, &mut err);
            assert_eq!(&buf[..n as usize], b"bytes");
            assert_eq!(hdfs5Tell(fs, r, &mut err), 0);
            assert_eq!(hdfs5Seek(fs, r, 7), 0);
            let n = hdfs5Read(fs, r, buf.as_mut_ptr() as *mut c_void, 64, &mut err);
            assert_eq!(n, 5);
            assert_eq!(hdfs5Tell(fs, r, &mut err), 12);

            // Reader handles are not writers.
            assert_eq!(hdfs5Flush(fs, r), libc::EBADF);
            assert_eq!(hdfs5CloseFile(fs, r), 0);
            assert_eq!(hdfs5Disconnect(fs), 0);
        }
    }

    #[test]
    fn test_open_rejections() {
        unsafe {
            let fs = connect();
            let path = cstr("/ffi-reject");
            let mut err = 0;
            let f = hdfs5OpenFile(fs, path.as_ptr(), libc::O_RDWR, 0, 0, 0, &mut err);
            assert!(f.is_null());
            assert_eq!(err, libc::ENOTSUP);

            err = 0;
            let f = hdfs5OpenFile(fs, path.as_ptr(), libc::O_RDONLY, 0, 0, 0, &mut err);
            assert!(f.is_null());
            assert_eq!(err, libc::ENOENT);

            err = 0;
            let f = hdfs5OpenFile(fs, path.as_ptr(), libc::O_WRONLY, 0, -1, 0, &mut err);
            assert!(f.is_null());
            assert_eq!(err, libc::EINVAL);

            err = 0;
            let f = hdfs5OpenFile(fs, ptr::null(), libc::O_RDONLY, 0, 0, 0, &mut err);
            assert!(f.is_null());
            assert_eq!(err, libc::EINVAL);
            assert_eq!(hdfs5Disconnect(fs), 0);
        }
    }

    #[test]
    fn test_list_directory_and_path_info() {
        unsafe {
            let fs = connect();
            let dir = cstr("/ffi-list");
            assert_eq!(hdfs5CreateDirectory(fs, dir.as_ptr()), 0);

            let mut count = -1;
            let mut err = 0;
            let entries = hdfs5ListDirectory(fs, dir.as_ptr(), &mut count, &mut err);
            assert!(entries.is_null());
            assert_eq!((count, err), (0, 0));

            let missing = cstr("/ffi-list-missing");
            let entries = hdfs5ListDirectory(fs, missing.as_ptr(), &mut count, &mut err);
            assert!(entries.is_null());
            assert_eq!(err, libc::ENOENT);

            let file = cstr("/ffi-list/child");
            err = 0;
            let w = hdfs5OpenFile(fs, file.as_ptr(), libc::O_WRONLY, 0, 0, 0, &mut err);
            assert_eq!(hdfs5CloseFile(fs, w), 0);

            let entries = hdfs5ListDirectory(fs, dir.as_ptr(), &mut count, &mut err);
            assert_eq!((count, err), (1, 0));
            let entry = &*entries;
            assert_eq!(CStr::from_ptr(entry.mName).to_str().unwrap(), "child");
            assert_eq!(entry.mKind, crate::types::kObjectKindFile);
            assert!(!entry.mOwner.is_null());
            hdfs5FreeFileInfo(entries, count);

            let info = hdfs5GetPathInfo(fs, dir.as_ptr(), &mut err);
            assert!(!info.is_null());
            assert_eq!((*info).mKind, crate::types::kObjectKindDirectory);
            hdfs5FreeFileInfo(info, 1);

            assert_eq!(hdfs5Exists(fs, file.as_ptr()), 0);
            assert_eq!(hdfs5Delete(fs, dir.as_ptr(), 1), 0);
            assert_eq!(hdfs5Exists(fs, file.as_ptr()), libc::ENOENT);
            assert_eq!(hdfs5Disconnect(fs), 0);
        }
    }

    #[test]
    fn test_bad_handles() {
        unsafe {
            context::install_test_bridge();
            let mut err = 0;
            assert_eq!(hdfs5Disconnect(ptr::null_mut()), libc::EBADF);
            assert_eq!(hdfs5CloseFile(ptr::null_mut(), ptr::null_mut()), libc::EBADF);
            assert_eq!(hdfs5GetCapacity(ptr::null_mut(), &mut err), -1);
            assert_eq!(err, libc::EBADF);

            let mut stale = hdfs_internal { client_id: 987_654 };
            assert_eq!(hdfs5Exists(&mut stale, cstr("/").as_ptr()), libc::EBADF);

            // A null builder connects to nothing.
            err = 0;
            assert!(hdfs5BuilderConnect(ptr::null_mut(), &mut err).is_null());
            assert_eq!(err, libc::EBADF);
        }
    }

    #[test]
    fn test_builder_and_conf_strings() {
        unsafe {
            context::install_test_bridge();
            let mut err = 0;
            let bld = hdfs5NewBuilder(&mut err);
            hdfs5BuilderSetNameNodePort(bld, 8020);
            hdfs5BuilderSetUserName(bld, cstr("alice").as_ptr());
            hdfs5BuilderSetKerbTicketCachePath(bld, cstr("/tmp/none").as_ptr());
            hdfs5BuilderSetForceNewInstance(bld);
            assert_eq!(
                hdfs5BuilderConfSetStr(bld, cstr("dfs.replication").as_ptr(), cstr("1").as_ptr()),
                0
            );
            assert_eq!(
                hdfs5BuilderConfSetStr(bld, ptr::null(), cstr("1").as_ptr()),
                libc::EINVAL
            );
            hdfs5FreeBuilder(bld);

            let value = hdfs5ConfGetStr(cstr(context::TEST_CONF_KEY).as_ptr());
            assert!(!value.is_null());
            assert_eq!(CStr::from_ptr(value).to_str().unwrap(), context::TEST_CONF_VALUE);
            hdfs5ConfStrFree(value);
            assert!(hdfs5ConfGetStr(cstr("no.such.key").as_ptr()).is_null());
            assert!(hdfs5ConfGetStr(ptr::null()).is_null());
        }
    }

    #[test]
    fn test_attributes() {
        unsafe {
            let fs = connect();
            let path = cstr("/ffi-attr");
            let mut err = 0;
            let w = hdfs5OpenFile(fs, path.as_ptr(), libc::O_WRONLY, 0, 0, 0, &mut err);
            assert_eq!(hdfs5CloseFile(fs, w), 0);

            assert_eq!(hdfs5Chmod(fs, path.as_ptr(), 0o600), 0);
            assert_eq!(hdfs5Utime(fs, path.as_ptr(), 1_234_567, 1_234_568), 0);
            let info = hdfs5GetPathInfo(fs, path.as_ptr(), &mut err);
            assert_eq!((*info).mPermissions, 0o600);
            assert_eq!((*info).mLastMod, 1_234_567);
            hdfs5FreeFileInfo(info, 1);

            assert_eq!(hdfs5Chown(fs, path.as_ptr(), ptr::null(), ptr::null()), libc::EINVAL);
            assert!(hdfs5GetDefaultBlockSize(fs, &mut err) > 0);
            assert!(hdfs5GetCapacity(fs, &mut err) >= hdfs5GetUsed(fs, &mut err));

            let to = cstr("/ffi-attr-renamed");
            assert_eq!(hdfs5Rename(fs, path.as_ptr(), to.as_ptr()), 0);
            assert_eq!(hdfs5Exists(fs, to.as_ptr()), 0);
            assert_eq!(hdfs5Disconnect(fs), 0);
        }
    }
}
