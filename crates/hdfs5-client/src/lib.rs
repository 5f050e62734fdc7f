//! Filesystem client capability used by the native bridge.
//!
//! The bridge only ever talks to the traits defined here. A client is
//! produced by a [`Connector`] from resolved [`ClientOptions`]; files are
//! handed out as independent [`FileReader`] / [`FileWriter`] objects that
//! stay usable until closed.
//!
//! [`LocalConnector`] maps the namespace onto a local directory and is the
//! backend used when no other connector is installed. With the
//! `hdfs-native` feature, `native::NativeConnector` speaks the Hadoop RPC
//! protocol to the addresses in [`ClientOptions`].

pub mod client;
pub mod error;
pub mod local;
#[cfg(feature = "hdfs-native")]
pub mod native;
pub mod stream;
pub mod target;

pub use client::{Connector, FileSystemClient};
pub use error::{ClientError, ClientResult};
pub use hdfs5_config::ClientOptions;
pub use local::{LocalConnector, LocalFileSystem};
pub use stream::{FileReader, FileWriter};
