//! libhdfs-compatible `hdfs*` exports.
//!
//! Thin wrappers over [`crate::ffi`] that report failure the libhdfs way:
//! the thread's `errno` is set and the function returns -1 or null.

use libc::{c_char, c_int, c_short, c_void};

use crate::ffi::*;
use crate::types::{hdfsBuilder, hdfsFS, hdfsFile, hdfsFileInfo, tOffset, tPort, tSize, tTime};

#[cfg(any(target_os = "linux", target_os = "android"))]
unsafe fn errno_location() -> *mut c_int {
    libc::__errno_location()
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
unsafe fn errno_location() -> *mut c_int {
    libc::__error()
}

fn set_errno(code: c_int) {
    unsafe { *errno_location() = code }
}

fn status(code: c_int) -> c_int {
    if code == 0 {
        0
    } else {
        set_errno(code);
        -1
    }
}

/// Run a value-returning export and move its error code into `errno`.
fn value<R>(f: impl FnOnce(*mut c_int) -> R) -> R {
    let mut err: c_int = 0;
    let out = f(&mut err);
    if err != 0 {
        set_errno(err);
    }
    out
}

#[no_mangle]
pub unsafe extern "C" fn hdfsNewBuilder() -> *mut hdfsBuilder {
    value(|e| hdfs5NewBuilder(e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsBuilderSetNameNode(bld: *mut hdfsBuilder, nn: *const c_char) {
    hdfs5BuilderSetNameNode(bld, nn)
}

#[no_mangle]
pub unsafe extern "C" fn hdfsBuilderSetNameNodePort(bld: *mut hdfsBuilder, port: tPort) {
    hdfs5BuilderSetNameNodePort(bld, port)
}

#[no_mangle]
pub unsafe extern "C" fn hdfsBuilderSetUserName(bld: *mut hdfsBuilder, user: *const c_char) {
    hdfs5BuilderSetUserName(bld, user)
}

#[no_mangle]
pub unsafe extern "C" fn hdfsBuilderSetKerbTicketCachePath(
    bld: *mut hdfsBuilder,
    path: *const c_char,
) {
    hdfs5BuilderSetKerbTicketCachePath(bld, path)
}

#[no_mangle]
pub unsafe extern "C" fn hdfsBuilderSetForceNewInstance(bld: *mut hdfsBuilder) {
    hdfs5BuilderSetForceNewInstance(bld)
}

#[no_mangle]
pub unsafe extern "C" fn hdfsBuilderConfSetStr(
    bld: *mut hdfsBuilder,
    key: *const c_char,
    val: *const c_char,
) -> c_int {
    status(hdfs5BuilderConfSetStr(bld, key, val))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsFreeBuilder(bld: *mut hdfsBuilder) {
    hdfs5FreeBuilder(bld)
}

#[no_mangle]
pub unsafe extern "C" fn hdfsBuilderConnect(bld: *mut hdfsBuilder) -> hdfsFS {
    value(|e| hdfs5BuilderConnect(bld, e))
}

/// Stores the value of `key`, or null when it is unset, in `*val`. Only a
/// null argument is an error.
#[no_mangle]
pub unsafe extern "C" fn hdfsConfGetStr(key: *const c_char, val: *mut *mut c_char) -> c_int {
    if key.is_null() || val.is_null() {
        return status(libc::EINVAL);
    }
    *val = hdfs5ConfGetStr(key);
    0
}

#[no_mangle]
pub unsafe extern "C" fn hdfsConfStrFree(val: *mut c_char) {
    hdfs5ConfStrFree(val)
}

#[no_mangle]
pub unsafe extern "C" fn hdfsDisconnect(fs: hdfsFS) -> c_int {
    status(hdfs5Disconnect(fs))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsOpenFile(
    fs: hdfsFS,
    path: *const c_char,
    flags: c_int,
    buffer_size: c_int,
    replication: c_short,
    block_size: tSize,
) -> hdfsFile {
    value(|e| hdfs5OpenFile(fs, path, flags, buffer_size, replication, block_size, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsCloseFile(fs: hdfsFS, file: hdfsFile) -> c_int {
    status(hdfs5CloseFile(fs, file))
}

/// 0 when `path` exists, -1 otherwise.
#[no_mangle]
pub unsafe extern "C" fn hdfsExists(fs: hdfsFS, path: *const c_char) -> c_int {
    status(hdfs5Exists(fs, path))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsSeek(fs: hdfsFS, file: hdfsFile, pos: tOffset) -> c_int {
    status(hdfs5Seek(fs, file, pos))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsTell(fs: hdfsFS, file: hdfsFile) -> tOffset {
    value(|e| hdfs5Tell(fs, file, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsRead(
    fs: hdfsFS,
    file: hdfsFile,
    buffer: *mut c_void,
    length: tSize,
) -> tSize {
    value(|e| hdfs5Read(fs, file, buffer, length, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsPread(
    fs: hdfsFS,
    file: hdfsFile,
    position: tOffset,
    buffer: *mut c_void,
    length: tSize,
) -> tSize {
    value(|e| hdfs5Pread(fs, file, position, buffer, length, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsWrite(
    fs: hdfsFS,
    file: hdfsFile,
    buffer: *const c_void,
    length: tSize,
) -> tSize {
    value(|e| hdfs5Write(fs, file, buffer, length, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsFlush(fs: hdfsFS, file: hdfsFile) -> c_int {
    status(hdfs5Flush(fs, file))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsHFlush(fs: hdfsFS, file: hdfsFile) -> c_int {
    status(hdfs5HFlush(fs, file))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsHSync(fs: hdfsFS, file: hdfsFile) -> c_int {
    status(hdfs5HSync(fs, file))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsDelete(fs: hdfsFS, path: *const c_char, recursive: c_int) -> c_int {
    status(hdfs5Delete(fs, path, recursive))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsRename(
    fs: hdfsFS,
    old_path: *const c_char,
    new_path: *const c_char,
) -> c_int {
    status(hdfs5Rename(fs, old_path, new_path))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsCreateDirectory(fs: hdfsFS, path: *const c_char) -> c_int {
    status(hdfs5CreateDirectory(fs, path))
}

/// Null with `*num_entries == 0` and `errno` untouched for an empty
/// directory.
#[no_mangle]
pub unsafe extern "C" fn hdfsListDirectory(
    fs: hdfsFS,
    path: *const c_char,
    num_entries: *mut c_int,
) -> *mut hdfsFileInfo {
    value(|e| hdfs5ListDirectory(fs, path, num_entries, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsGetPathInfo(fs: hdfsFS, path: *const c_char) -> *mut hdfsFileInfo {
    value(|e| hdfs5GetPathInfo(fs, path, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsFreeFileInfo(info: *mut hdfsFileInfo, num_entries: c_int) {
    hdfs5FreeFileInfo(info, num_entries)
}

#[no_mangle]
pub unsafe extern "C" fn hdfsGetDefaultBlockSize(fs: hdfsFS) -> tOffset {
    value(|e| hdfs5GetDefaultBlockSize(fs, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsGetCapacity(fs: hdfsFS) -> tOffset {
    value(|e| hdfs5GetCapacity(fs, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsGetUsed(fs: hdfsFS) -> tOffset {
    value(|e| hdfs5GetUsed(fs, e))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsChown(
    fs: hdfsFS,
    path: *const c_char,
    owner: *const c_char,
    group: *const c_char,
) -> c_int {
    status(hdfs5Chown(fs, path, owner, group))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsChmod(fs: hdfsFS, path: *const c_char, mode: c_short) -> c_int {
    status(hdfs5Chmod(fs, path, mode))
}

#[no_mangle]
pub unsafe extern "C" fn hdfsUtime(
    fs: hdfsFS,
    path: *const c_char,
    mtime: tTime,
    atime: tTime,
) -> c_int {
    status(hdfs5Utime(fs, path, mtime, atime))
}
