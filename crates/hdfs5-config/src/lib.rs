//! Configuration resolution for the HDFS shim.
//!
//! Turns the ambient Hadoop configuration (a flat key/value mapping loaded
//! from `core-site.xml` / `hdfs-site.xml`) plus process environment into the
//! [`ClientOptions`] a filesystem client is constructed from:
//!
//! - **[`hadoop_conf`]** - `HadoopConf` and its XML loader.
//! - **[`manager`]** - `HadoopConfManager`, the swappable current conf.
//! - **[`namenode`]** - HA nameservice to namenode address resolution.
//! - **[`credential`]** - local-identity and Kerberos credential providers.
//! - **[`kerberos`]** - `krb5.conf` and credential cache readers.
//! - **[`options`]** - the mutable `Configuration` record and final options.
//! - **[`resolver`]** - `ConfigResolver`, tying the above together.

pub mod credential;
pub mod error;
pub mod hadoop_conf;
pub mod kerberos;
pub mod manager;
pub mod namenode;
pub mod options;
pub mod resolver;

pub use credential::{Credential, CredentialProvider, KerberosCredentialProvider, LocalIdentityProvider};
pub use error::ConfigError;
pub use hadoop_conf::HadoopConf;
pub use kerberos::{KerberosCredential, KerberosError, KerberosPaths, SessionKey};
pub use manager::HadoopConfManager;
pub use namenode::resolve_namenode_addresses;
pub use options::{ClientOptions, Configuration, DialOptions};
pub use resolver::ConfigResolver;
