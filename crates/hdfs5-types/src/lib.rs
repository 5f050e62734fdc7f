pub mod status_code;
pub mod status;
pub mod result;

pub mod ids;
pub mod file_info;

// Re-export commonly used items at the crate root.
pub use file_info::{FileStatus, FsStats, ObjectKind};
pub use ids::Handle;
pub use result::{make_error, make_error_msg, Result, Void};
pub use status::Status;
pub use status_code::{ErrorKind, EINTERNAL};
