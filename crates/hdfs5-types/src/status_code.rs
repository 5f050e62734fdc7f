//! Error taxonomy shared by every crate and its boundary errno mapping.
//!
//! The mapping is one-directional: a boundary code never carries more than
//! its kind, so diagnostic text must be logged before it crosses.

use std::fmt;
use std::io;

/// Boundary code reported for anything that does not fit a narrower kind.
pub const EINTERNAL: i32 = 255;

/// Coarse error kinds understood at the native boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    PermissionDenied,
    AlreadyExists,
    NotFound,
    Unsupported,
    OutOfMemory,
    /// A null, unknown or already released handle.
    BadHandle,
    Internal,
}

impl ErrorKind {
    /// The errno value reported across the boundary for this kind.
    pub fn to_errno(self) -> i32 {
        match self {
            ErrorKind::InvalidArgument => libc::EINVAL,
            ErrorKind::PermissionDenied => libc::EPERM,
            ErrorKind::AlreadyExists => libc::EEXIST,
            ErrorKind::NotFound => libc::ENOENT,
            ErrorKind::Unsupported => libc::ENOTSUP,
            ErrorKind::OutOfMemory => libc::ENOMEM,
            ErrorKind::BadHandle => libc::EBADF,
            ErrorKind::Internal => EINTERNAL,
        }
    }

    /// Classify an I/O error kind. Kinds without a direct counterpart are
    /// internal.
    pub fn from_io(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => ErrorKind::InvalidArgument,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::Unsupported => ErrorKind::Unsupported,
            io::ErrorKind::OutOfMemory => ErrorKind::OutOfMemory,
            _ => ErrorKind::Internal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::OutOfMemory => "OutOfMemory",
            ErrorKind::BadHandle => "BadHandle",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<io::ErrorKind> for ErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        ErrorKind::from_io(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_errno() {
        assert_eq!(ErrorKind::InvalidArgument.to_errno(), libc::EINVAL);
        assert_eq!(ErrorKind::PermissionDenied.to_errno(), libc::EPERM);
        assert_eq!(ErrorKind::AlreadyExists.to_errno(), libc::EEXIST);
        assert_eq!(ErrorKind::NotFound.to_errno(), libc::ENOENT);
        assert_eq!(ErrorKind::Unsupported.to_errno(), libc::ENOTSUP);
        assert_eq!(ErrorKind::OutOfMemory.to_errno(), libc::ENOMEM);
        assert_eq!(ErrorKind::BadHandle.to_errno(), libc::EBADF);
        assert_eq!(ErrorKind::Internal.to_errno(), 255);
    }

    #[test]
    fn test_from_io() {
        assert_eq!(ErrorKind::from_io(io::ErrorKind::NotFound), ErrorKind::NotFound);
        assert_eq!(
            ErrorKind::from_io(io::ErrorKind::AlreadyExists),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            ErrorKind::from_io(io::ErrorKind::PermissionDenied),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            ErrorKind::from_io(io::ErrorKind::InvalidInput),
            ErrorKind::InvalidArgument
        );
        // Everything unrecognised collapses into the catch-all.
        assert_eq!(ErrorKind::from_io(io::ErrorKind::TimedOut), ErrorKind::Internal);
        assert_eq!(ErrorKind::from_io(io::ErrorKind::BrokenPipe), ErrorKind::Internal);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::NotFound.to_string(), "NotFound");
        assert_eq!(format!("{}", ErrorKind::BadHandle), "BadHandle");
    }
}
