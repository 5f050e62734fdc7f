//! Namenode address resolution.
//!
//! A configured address may name a single namenode or an HA nameservice.
//! Nameservices are expanded to their member namenodes using the
//! `dfs.namenode.rpc-address.<nameservice>.<namenode>` keys.

use std::collections::HashMap;

use url::Url;

use crate::hadoop_conf::HadoopConf;

/// Name used when nothing was configured.
pub const DEFAULT_NAMESERVICE: &str = "default";

/// Matches both `fs.defaultFS` and the deprecated `fs.default.name`.
pub const DEFAULT_FS_PREFIX: &str = "fs.default";

pub const RPC_ADDRESS_PREFIX: &str = "dfs.namenode.rpc-address.";

/// Resolve the addresses a client should dial.
///
/// More than one address is taken as already resolved. A single address is
/// treated as a namenode-or-nameservice name; none at all means `"default"`,
/// which is replaced by the host of the default filesystem URI when one is
/// configured. A name matching a nameservice expands to that nameservice's
/// namenodes in lexicographic order; anything else is returned unchanged.
pub fn resolve_namenode_addresses(addresses: &[String], conf: &HadoopConf) -> Vec<String> {
    let mut name = match addresses {
        [] => DEFAULT_NAMESERVICE.to_string(),
        [single] => single.clone(),
        _ => return addresses.to_vec(),
    };

    if name == DEFAULT_NAMESERVICE {
        if let Some(host) = conf
            .with_prefix(DEFAULT_FS_PREFIX)
            .find_map(|(_, value)| uri_authority(value))
        {
            name = host;
        }
    }

    let mut groups: HashMap<&str, Vec<String>> = HashMap::new();
    for (key, value) in conf.with_prefix(RPC_ADDRESS_PREFIX) {
        let Some(nameservice) = key.split('.').nth(3).filter(|ns| !ns.is_empty()) else {
            continue;
        };
        groups
            .entry(nameservice)
            .or_default()
            .push(value.to_string());
    }

    match groups.remove(name.as_str()) {
        Some(mut nns) if !nns.is_empty() => {
            nns.sort();
            tracing::debug!(nameservice = %name, namenodes = ?nns, "resolved nameservice");
            nns
        }
        _ => vec![name],
    }
}

/// Normalise a user supplied namenode: `hdfs://host:port/path` becomes
/// `host:port`, anything without a scheme is kept as given.
pub fn normalize_namenode(nn: &str) -> String {
    let nn = nn.trim();
    if nn.contains("://") {
        if let Some(authority) = uri_authority(nn) {
            return authority;
        }
    }
    nn.to_string()
}

/// Append `port` to `address` unless it is zero, the address already names
/// a port, or the address is the unresolved default.
pub fn with_port(address: &str, port: u16) -> String {
    // `host:` and `[v6]:` carry an empty port.
    let address = match address.strip_suffix(':') {
        Some(host) if !host.contains(':') || host.ends_with(']') => host,
        _ => address,
    };
    if port == 0 || address == DEFAULT_NAMESERVICE || has_port(address) {
        return address.to_string();
    }
    if address.contains(':') && !address.starts_with('[') {
        // Bare IPv6 literal.
        return format!("[{}]:{}", address, port);
    }
    format!("{}:{}", address, port)
}

fn has_port(address: &str) -> bool {
    let tail = match address.rfind(']') {
        Some(close) => &address[close + 1..],
        None if address.matches(':').count() > 1 => return false,
        None => address,
    };
    tail.rsplit_once(':')
        .map(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// `host[:port]` of a URI, if it has a non-empty host.
fn uri_authority(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    let host = url.host_str().filter(|h| !h.is_empty())?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
