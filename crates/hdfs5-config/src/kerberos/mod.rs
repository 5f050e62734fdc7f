//! Kerberos bootstrap: locate `krb5.conf` and the ticket cache, read both,
//! and produce the client credential.
//!
//! Ticket acquisition is out of scope; the cache must already hold a valid
//! ticket-granting ticket (usually obtained with `kinit`).

pub mod ccache;
pub mod krb5_conf;

use std::path::{Path, PathBuf};

use hdfs5_types::ErrorKind;
use thiserror::Error;

use self::ccache::CCache;
use self::krb5_conf::Krb5Config;

pub const ENV_KRB5_CONFIG: &str = "KRB5_CONFIG";
pub const ENV_KRB5CCNAME: &str = "KRB5CCNAME";
pub const DEFAULT_KRB5_CONFIG: &str = "/etc/krb5.conf";

#[derive(Debug, Error)]
pub enum KerberosError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("krb5.conf line {line}: {message}")]
    Krb5Conf { line: usize, message: String },

    #[error("malformed credential cache: {0}")]
    CCacheFormat(String),

    #[error("unsupported credential cache version {0:#06x}")]
    UnsupportedCCacheVersion(u16),

    #[error("no ticket-granting ticket for {principal} in realm {realm}")]
    NoTicket { principal: String, realm: String },

    #[error("no realm in principal and no default_realm in krb5.conf")]
    NoRealm,
}

impl KerberosError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KerberosError::Io { source, .. } => ErrorKind::from_io(source.kind()),
            _ => ErrorKind::Internal,
        }
    }
}

/// Where the Kerberos client files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KerberosPaths {
    pub krb5_config: PathBuf,
    pub ccache: PathBuf,
}

impl KerberosPaths {
    /// `KRB5_CONFIG` (first entry of a `:` list) or `/etc/krb5.conf`;
    /// `KRB5CCNAME` without its `FILE:` prefix or `/tmp/krb5cc_<uid>`.
    pub fn from_env() -> Self {
        let krb5_config = std::env::var(ENV_KRB5_CONFIG)
            .ok()
            .and_then(|v| v.split(':').find(|p| !p.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KRB5_CONFIG));

        let ccache = std::env::var(ENV_KRB5CCNAME)
            .ok()
            .map(|v| strip_ccache_prefix(&v).to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_ccache_path);

        Self {
            krb5_config,
            ccache,
        }
    }
}

/// `FILE:/tmp/x` names the same cache as `/tmp/x`.
pub fn strip_ccache_prefix(name: &str) -> &str {
    name.strip_prefix("FILE:").unwrap_or(name)
}

pub fn default_ccache_path() -> PathBuf {
    PathBuf::from(format!("/tmp/krb5cc_{}", nix::unistd::getuid().as_raw()))
}

/// TGT session key. Its bytes are never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub enctype: u16,
    pub value: Vec<u8>,
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("enctype", &self.enctype)
            .field("len", &self.value.len())
            .finish()
    }
}

/// A principal holding a usable ticket-granting ticket.
#[derive(Clone, PartialEq, Eq)]
pub struct KerberosCredential {
    principal: String,
    username: String,
    realm: String,
    kdcs: Vec<String>,
    starts_at: u32,
    expires_at: u32,
    session_key: SessionKey,
    ticket: Vec<u8>,
    ccache_path: PathBuf,
}

impl std::fmt::Debug for KerberosCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KerberosCredential")
            .field("principal", &self.principal)
            .field("realm", &self.realm)
            .field("kdcs", &self.kdcs)
            .field("expires_at", &self.expires_at)
            .field("session_key", &self.session_key)
            .field("ticket_len", &self.ticket.len())
            .field("ccache_path", &self.ccache_path)
            .finish()
    }
}

impl KerberosCredential {
    pub fn load(paths: &KerberosPaths, ticket_cache: Option<&Path>) -> Result<Self, KerberosError> {
        let config = Krb5Config::load(&paths.krb5_config)?;
        let ccache_path = ticket_cache.unwrap_or(&paths.ccache);
        let ccache = CCache::load(ccache_path)?;
        Self::from_ccache(&ccache, &config, ccache_path)
    }

    pub fn from_ccache(
        ccache: &CCache,
        config: &Krb5Config,
        ccache_path: &Path,
    ) -> Result<Self, KerberosError> {
        let principal = &ccache.default_principal;
        let realm = if principal.realm.is_empty() {
            config.default_realm().ok_or(KerberosError::NoRealm)?.to_string()
        } else {
            principal.realm.clone()
        };

        let tgt = ccache.tgt(&realm).ok_or_else(|| KerberosError::NoTicket {
            principal: principal.to_string(),
            realm: realm.clone(),
        })?;

        let kdcs = config
            .realm(&realm)
            .map(|r| r.kdcs.clone())
            .unwrap_or_default();

        Ok(Self {
            principal: principal.to_string(),
            username: principal.primary().unwrap_or_default().to_string(),
            kdcs,
            starts_at: tgt.start_time,
            expires_at: tgt.end_time,
            session_key: SessionKey {
                enctype: tgt.key_enctype,
                value: tgt.key.clone(),
            },
            ticket: tgt.ticket.clone(),
            realm,
            ccache_path: ccache_path.to_path_buf(),
        })
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Short user name, the principal's first component.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn kdcs(&self) -> &[String] {
        &self.kdcs
    }

    /// TGT end time, seconds since the epoch.
    pub fn expires_at(&self) -> u32 {
        self.expires_at
    }

    /// TGT start time, seconds since the epoch.
    pub fn starts_at(&self) -> u32 {
        self.starts_at
    }

    /// Whether the TGT has lapsed at `now` (seconds since the epoch).
    pub fn is_expired(&self, now: u64) -> bool {
        now >= u64::from(self.expires_at)
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// DER-encoded TGT as stored in the cache.
    pub fn ticket(&self) -> &[u8] {
        &self.ticket
    }

    pub fn ccache_path(&self) -> &Path {
        &self.ccache_path
    }
}
