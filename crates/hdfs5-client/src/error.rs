//! Client error types.

use hdfs5_types::{ErrorKind, Status};

/// Errors that can occur during client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An I/O error from the backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A path the client cannot address (empty, or escaping the root).
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// The client or stream has already been closed.
    #[error("closed")]
    Closed,

    /// A backend reported an already-classified status.
    #[error("status error: {0}")]
    Status(#[from] Status),

    /// No backend could be reached for the given options.
    #[error("connect failed: {0}")]
    Connect(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Io(e) => ErrorKind::from_io(e.kind()),
            ClientError::InvalidPath(_) => ErrorKind::InvalidArgument,
            ClientError::Closed => ErrorKind::BadHandle,
            ClientError::Status(s) => s.kind(),
            ClientError::Connect(_) => ErrorKind::Internal,
        }
    }
}

impl From<ClientError> for Status {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status(s) => s,
            other => Status::with_message(other.kind(), other.to_string()),
        }
    }
}

/// Convenience result type.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_kinds_translate() {
        let cases = [
            (std::io::ErrorKind::NotFound, ErrorKind::NotFound),
            (std::io::ErrorKind::PermissionDenied, ErrorKind::PermissionDenied),
            (std::io::ErrorKind::AlreadyExists, ErrorKind::AlreadyExists),
            (std::io::ErrorKind::InvalidInput, ErrorKind::InvalidArgument),
            (std::io::ErrorKind::UnexpectedEof, ErrorKind::Internal),
        ];
        for (io_kind, expected) in cases {
            let status: Status = ClientError::from(std::io::Error::from(io_kind)).into();
            assert_eq!(status.kind(), expected, "{:?}", io_kind);
        }
    }

    #[test]
    fn test_status_passes_through() {
        let original = Status::with_message(ErrorKind::Unsupported, "append");
        let status: Status = ClientError::from(original.clone()).into();
        assert_eq!(status, original);
    }

    #[test]
    fn test_closed_is_bad_handle() {
        assert_eq!(ClientError::Closed.kind(), ErrorKind::BadHandle);
        assert_eq!(
            ClientError::InvalidPath("../x".into()).kind(),
            ErrorKind::InvalidArgument
        );
    }
}
