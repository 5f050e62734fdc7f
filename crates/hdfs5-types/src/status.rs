use std::fmt;

use crate::status_code::ErrorKind;

/// A status value carrying an error kind and optional message.
///
/// The `#[must_use]` attribute ensures callers do not silently ignore error
/// statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Status {
    kind: ErrorKind,
    message: Option<String>,
}

impl Status {
    /// Create a status with just a kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Create a status with a kind and a descriptive message.
    pub fn with_message(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(msg.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return the optional message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The code this status reports across the native boundary.
    pub fn errno(&self) -> i32 {
        self.kind.to_errno()
    }

    /// Produce a human-readable description like `"NotFound(2) no such file"`.
    pub fn describe(&self) -> String {
        match &self.message {
            Some(msg) => format!("{}({}) {}", self.kind, self.errno(), msg),
            None => format!("{}({})", self.kind, self.errno()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl std::error::Error for Status {}

impl From<ErrorKind> for Status {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for Status {
    fn from(err: std::io::Error) -> Self {
        Self::with_message(ErrorKind::from_io(err.kind()), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_without_message() {
        let s = Status::new(ErrorKind::BadHandle);
        assert_eq!(s.kind(), ErrorKind::BadHandle);
        assert!(s.message().is_none());
        assert_eq!(s.describe(), format!("BadHandle({})", libc::EBADF));
    }

    #[test]
    fn test_status_with_message() {
        let s = Status::with_message(ErrorKind::NotFound, "/tmp/x");
        assert_eq!(s.errno(), libc::ENOENT);
        assert_eq!(s.message(), Some("/tmp/x"));
        assert_eq!(s.to_string(), format!("NotFound({}) /tmp/x", libc::ENOENT));
    }

    #[test]
    fn test_status_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists");
        let s: Status = err.into();
        assert_eq!(s.kind(), ErrorKind::AlreadyExists);
        assert_eq!(s.message(), Some("exists"));

        let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let s: Status = err.into();
        assert_eq!(s.errno(), 255);
    }

    #[test]
    fn test_status_is_error() {
        let s = Status::new(ErrorKind::Internal);
        let e: &dyn std::error::Error = &s;
        assert!(e.to_string().contains("Internal"));
    }
}
