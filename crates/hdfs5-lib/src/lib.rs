//! libhdfs-compatible native library.
//!
//! - **[`registry`]** - opaque handle tables for configurations, clients,
//!   readers and writers.
//! - **[`bridge`]** - [`Bridge`], every boundary operation as a safe method.
//! - **[`context`]** - the process-wide bridge used by the exports.
//! - **[`types`]** - `#[repr(C)]` structures matching `include/hdfs.h`.
//! - `ffi` / `compat` (feature `ffi`) - the `hdfs5*` exports reporting
//!   errors through out-parameters, and the `hdfs*` exports reporting them
//!   through `errno`.

pub mod bridge;
pub mod context;
pub mod registry;
pub mod types;

#[cfg(feature = "ffi")]
pub mod compat;
#[cfg(feature = "ffi")]
pub mod ffi;

pub use bridge::{Bridge, ClientSession, OpenFile, OpenMode};
pub use hdfs5_types::{ErrorKind, Handle, Status};
pub use registry::Registry;
