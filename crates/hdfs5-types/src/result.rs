use crate::status::Status;
use crate::status_code::ErrorKind;

/// The standard result type used throughout the workspace.
pub type Result<T> = std::result::Result<T, Status>;

pub type Void = ();

/// Create an error result from a kind.
pub fn make_error<T>(kind: ErrorKind) -> Result<T> {
    Err(Status::new(kind))
}

/// Create an error result from a kind and message.
pub fn make_error_msg<T>(kind: ErrorKind, msg: impl Into<String>) -> Result<T> {
    Err(Status::with_message(kind, msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_error() {
        let r: Result<i32> = make_error(ErrorKind::NotFound);
        assert_eq!(r.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_make_error_msg() {
        let r: Result<i32> = make_error_msg(ErrorKind::InvalidArgument, "bad flags");
        let err = r.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), Some("bad flags"));
    }
}
