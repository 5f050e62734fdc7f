//! Wire-client addressing derived from resolved options.
//!
//! A single namenode becomes `hdfs://host[:port]`. An HA address list is
//! presented to the wire client as a synthetic nameservice whose members
//! keep the resolved order.

use std::collections::BTreeMap;
use std::time::Duration;

use hdfs5_config::namenode::DEFAULT_NAMESERVICE;
use hdfs5_config::ClientOptions;
use hdfs5_types::{ErrorKind, Status};

use crate::error::{ClientError, ClientResult};

/// Nameservice id used for a resolved HA address list.
pub const NAMESERVICE: &str = "hdfs5";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTarget {
    pub url: String,
    /// Hadoop-style keys handed to the wire client.
    pub config: BTreeMap<String, String>,
}

fn millis(d: Duration) -> String {
    d.as_millis().to_string()
}

impl ClusterTarget {
    pub fn from_options(options: &ClientOptions) -> ClientResult<Self> {
        let mut config = BTreeMap::new();
        let url = match options.addresses.as_slice() {
            [] => return Err(ClientError::Connect("no namenode address".into())),
            [single] if single == DEFAULT_NAMESERVICE => {
                return Err(ClientError::Connect("no default filesystem configured".into()))
            }
            [single] => format!("hdfs://{}", single),
            many => {
                let ids: Vec<String> = (0..many.len()).map(|i| format!("nn{}", i)).collect();
                config.insert("dfs.nameservices".to_string(), NAMESERVICE.to_string());
                config.insert(format!("dfs.ha.namenodes.{}", NAMESERVICE), ids.join(","));
                for (id, address) in ids.iter().zip(many) {
                    config.insert(
                        format!("dfs.namenode.rpc-address.{}.{}", NAMESERVICE, id),
                        address.clone(),
                    );
                }
                format!("hdfs://{}", NAMESERVICE)
            }
        };

        config.insert(
            "ipc.client.connect.timeout".to_string(),
            millis(options.namenode_dial.connect_timeout),
        );
        config.insert("ipc.ping.interval".to_string(), millis(options.namenode_dial.keepalive));
        config.insert(
            "dfs.client.socket-timeout".to_string(),
            millis(options.datanode_dial.connect_timeout),
        );
        if options.use_datanode_hostname {
            config.insert("dfs.client.use.datanode.hostname".to_string(), "true".to_string());
        }
        if let Some(principal) = &options.service_principal {
            config.insert("dfs.namenode.kerberos.principal".to_string(), principal.clone());
        }
        let auth = if options.kerberos.is_some() { "kerberos" } else { "simple" };
        config.insert("hadoop.security.authentication".to_string(), auth.to_string());

        Ok(Self { url, config })
    }
}

/// Refuse to dial with a ticket-granting ticket that has lapsed at `now`.
pub fn check_credential(options: &ClientOptions, now: u64) -> ClientResult<()> {
    match &options.kerberos {
        Some(cred) if cred.is_expired(now) => Err(ClientError::Status(Status::with_message(
            ErrorKind::PermissionDenied,
            format!("ticket for {} expired at {}", cred.principal(), cred.expires_at()),
        ))),
        _ => Ok(()),
    }
}
