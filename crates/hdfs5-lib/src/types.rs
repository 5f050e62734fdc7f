//! Boundary structures, laid out to match `include/hdfs.h`.
//!
//! The handle wrappers hold registry tokens only. A zero token means "no
//! object".

#![allow(non_camel_case_types, non_snake_case)]

use libc::{c_char, c_int, c_short};

use hdfs5_types::{FileStatus, Handle};

pub type tSize = i32;
pub type tOffset = i64;
pub type tTime = libc::time_t;
pub type tPort = u16;

/// `tObjectKind`, a C enum of `'F'` and `'D'`.
pub type tObjectKind = c_int;
pub const kObjectKindFile: tObjectKind = b'F' as tObjectKind;
pub const kObjectKindDirectory: tObjectKind = b'D' as tObjectKind;

#[repr(C)]
#[derive(Debug, Default)]
pub struct hdfsBuilder {
    pub opts_id: u64,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct hdfs_internal {
    pub client_id: u64,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct hdfsFile_internal {
    pub reader_id: u64,
    pub writer_id: u64,
}

pub type hdfsFS = *mut hdfs_internal;
pub type hdfsFile = *mut hdfsFile_internal;

/// Stat record handed to the caller. The strings are `malloc`ed and
/// released by `hdfsFreeFileInfo`.
#[repr(C)]
#[derive(Debug)]
pub struct hdfsFileInfo {
    pub mKind: tObjectKind,
    pub mName: *mut c_char,
    pub mLastMod: tTime,
    pub mSize: tOffset,
    pub mReplication: c_short,
    pub mBlockSize: tOffset,
    pub mOwner: *mut c_char,
    pub mGroup: *mut c_char,
    pub mPermissions: c_short,
    pub mLastAccess: tTime,
}

impl hdfsBuilder {
    pub fn handle(&self) -> Handle {
        Handle::from_raw(self.opts_id)
    }
}

impl hdfs_internal {
    pub fn handle(&self) -> Handle {
        Handle::from_raw(self.client_id)
    }
}

impl hdfsFile_internal {
    pub fn handles(&self) -> (Handle, Handle) {
        (
            Handle::from_raw(self.reader_id),
            Handle::from_raw(self.writer_id),
        )
    }
}

impl hdfsFileInfo {
    /// Scalar fields of `status`; the string fields are left null for the
    /// caller to fill. Replication beyond `c_short` saturates.
    pub fn scalars(status: &FileStatus) -> Self {
        Self {
            mKind: tObjectKind::from(status.kind.as_tag()),
            mName: std::ptr::null_mut(),
            mLastMod: status.modification_time as tTime,
            mSize: status.size as tOffset,
            mReplication: c_short::try_from(status.replication).unwrap_or(c_short::MAX),
            mBlockSize: status.block_size as tOffset,
            mOwner: std::ptr::null_mut(),
            mGroup: std::ptr::null_mut(),
            mPermissions: status.permissions as c_short,
            mLastAccess: status.access_time as tTime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdfs5_types::ObjectKind;

    #[test]
    fn test_layouts() {
        assert_eq!(std::mem::size_of::<hdfsBuilder>(), 8);
        assert_eq!(std::mem::size_of::<hdfs_internal>(), 8);
        assert_eq!(std::mem::size_of::<hdfsFile_internal>(), 16);
        assert_eq!(std::mem::align_of::<hdfsFileInfo>(), std::mem::align_of::<tOffset>());
    }

    #[test]
    fn test_scalars() {
        let status = FileStatus {
            kind: ObjectKind::Directory,
            name: "d".into(),
            modification_time: 10,
            size: 0,
            permissions: 0o755,
            replication: 0,
            block_size: 0,
            owner: "o".into(),
            group: "g".into(),
            access_time: 11,
        };
        let info = hdfsFileInfo::scalars(&status);
        assert_eq!(info.mKind, kObjectKindDirectory);
        assert_eq!(info.mPermissions, 0o755);
        assert_eq!((info.mLastMod, info.mLastAccess), (10, 11));
        assert!(info.mName.is_null());
    }

    #[test]
    fn test_replication_saturates() {
        let mut status = FileStatus {
            kind: ObjectKind::File,
            name: "f".into(),
            modification_time: 0,
            size: 1,
            permissions: 0o644,
            replication: 40_000,
            block_size: 1 << 27,
            owner: "o".into(),
            group: "g".into(),
            access_time: 0,
        };
        assert_eq!(hdfsFileInfo::scalars(&status).mReplication, c_short::MAX);
        status.replication = 3;
        assert_eq!(hdfsFileInfo::scalars(&status).mReplication, 3);
    }
}
