use std::path::PathBuf;

use hdfs5_types::{ErrorKind, Status};

use crate::kerberos::KerberosError;

/// Errors raised while loading configuration or building client options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration file {}: {message}", path.display())]
    Xml { path: PathBuf, message: String },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("kerberos: {0}")]
    Kerberos(#[from] KerberosError),
}

impl From<ConfigError> for Status {
    fn from(err: ConfigError) -> Self {
        let kind = match &err {
            ConfigError::Io { source, .. } => ErrorKind::from_io(source.kind()),
            ConfigError::Xml { .. } | ConfigError::InvalidValue { .. } => {
                ErrorKind::InvalidArgument
            }
            ConfigError::Kerberos(e) => e.kind(),
        };
        Status::with_message(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_kind() {
        let err = ConfigError::Io {
            path: PathBuf::from("/etc/hadoop/core-site.xml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let status: Status = err.into();
        assert_eq!(status.kind(), ErrorKind::PermissionDenied);
        assert!(status.message().unwrap().contains("core-site.xml"));
    }

    #[test]
    fn test_invalid_value_is_invalid_argument() {
        let err = ConfigError::InvalidValue {
            key: "dfs.replication".into(),
            value: "three".into(),
        };
        let status: Status = err.into();
        assert_eq!(status.kind(), ErrorKind::InvalidArgument);
    }
}
