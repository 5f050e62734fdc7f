use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::credential::CredentialProvider;
use crate::kerberos::KerberosCredential;
use crate::namenode::{normalize_namenode, with_port};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(5);

/// How the client dials namenodes and datanodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialOptions {
    pub connect_timeout: Duration,
    pub keepalive: Duration,
    /// Try both IPv4 and IPv6 addresses of a host.
    pub dual_stack: bool,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive: DEFAULT_KEEPALIVE,
            dual_stack: true,
        }
    }
}

/// Mutable client configuration, edited through builder handles before
/// being connected.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub addresses: Vec<String>,
    /// Explicit identity; `None` means "whoever the credential says".
    pub user: Option<String>,
    pub ticket_cache_path: Option<PathBuf>,
    pub service_principal: Option<String>,
    pub use_datanode_hostname: bool,
    pub namenode_dial: DialOptions,
    pub datanode_dial: DialOptions,
    /// Per-configuration keys consulted before the ambient conf.
    pub overrides: BTreeMap<String, String>,
    pub provider: Arc<dyn CredentialProvider>,
}

impl Configuration {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            addresses: Vec::new(),
            user: None,
            ticket_cache_path: None,
            service_principal: None,
            use_datanode_hostname: false,
            namenode_dial: DialOptions::default(),
            datanode_dial: DialOptions::default(),
            overrides: BTreeMap::new(),
            provider,
        }
    }

    /// Replace the address list with one namenode or nameservice.
    pub fn set_namenode(&mut self, nn: &str) {
        self.addresses = vec![normalize_namenode(nn)];
    }

    pub fn set_namenode_port(&mut self, port: u16) {
        if let [single] = self.addresses.as_mut_slice() {
            *single = with_port(single, port);
        }
    }

    pub fn set_user(&mut self, user: &str) {
        self.user = Some(user.to_string());
    }

    pub fn set_ticket_cache_path(&mut self, path: impl Into<PathBuf>) {
        self.ticket_cache_path = Some(path.into());
    }

    pub fn set_override(&mut self, key: &str, value: &str) {
        self.overrides.insert(key.to_string(), value.to_string());
    }
}

/// Fully resolved options a filesystem client is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub addresses: Vec<String>,
    pub user: String,
    pub kerberos: Option<Arc<KerberosCredential>>,
    pub service_principal: Option<String>,
    pub use_datanode_hostname: bool,
    pub namenode_dial: DialOptions,
    pub datanode_dial: DialOptions,
    pub default_replication: u16,
    pub default_block_size: u64,
}

impl ClientOptions {
    /// Options for a plain local-identity client; used by tests and
    /// embedders that bypass the resolver.
    pub fn for_user(addresses: Vec<String>, user: impl Into<String>) -> Self {
        Self {
            addresses,
            user: user.into(),
            kerberos: None,
            service_principal: None,
            use_datanode_hostname: false,
            namenode_dial: DialOptions::default(),
            datanode_dial: DialOptions::default(),
            default_replication: crate::hadoop_conf::DEFAULT_REPLICATION,
            default_block_size: crate::hadoop_conf::DEFAULT_BLOCK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::LocalIdentityProvider;

    fn conf() -> Configuration {
        Configuration::new(Arc::new(LocalIdentityProvider))
    }

    #[test]
    fn test_default_dial() {
        let dial = DialOptions::default();
        assert_eq!(dial.connect_timeout, Duration::from_secs(5));
        assert_eq!(dial.keepalive, Duration::from_secs(5));
        assert!(dial.dual_stack);
    }

    #[test]
    fn test_set_namenode_overwrites() {
        let mut c = conf();
        c.addresses = vec!["a".into(), "b".into()];
        c.set_namenode("hdfs://nn1:8020/");
        assert_eq!(c.addresses, vec!["nn1:8020".to_string()]);
    }

    #[test]
    fn test_set_namenode_port() {
        let mut c = conf();
        c.set_namenode("nn1");
        c.set_namenode_port(9000);
        assert_eq!(c.addresses, vec!["nn1:9000".to_string()]);
        c.set_namenode_port(1234);
        assert_eq!(c.addresses, vec!["nn1:9000".to_string()]);

        let mut ha = conf();
        ha.addresses = vec!["a".into(), "b".into()];
        ha.set_namenode_port(9000);
        assert_eq!(ha.addresses, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_setters() {
        let mut c = conf();
        c.set_user("alice");
        c.set_ticket_cache_path("/tmp/cc");
        c.set_override("dfs.replication", "2");
        assert_eq!(c.user.as_deref(), Some("alice"));
        assert_eq!(c.ticket_cache_path, Some(PathBuf::from("/tmp/cc")));
        assert_eq!(c.overrides.get("dfs.replication").map(String::as_str), Some("2"));
    }
}
