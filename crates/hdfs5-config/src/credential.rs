//! Client identity providers.
//!
//! The provider is chosen once when a `Configuration` is built, from
//! `hadoop.security.authentication`; it is asked for a credential when the
//! configuration is connected.

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use nix::unistd::{getuid, User};

use crate::error::ConfigError;
use crate::kerberos::{KerberosCredential, KerberosPaths};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Simple authentication as an OS user.
    Local { user: String },
    Kerberos(Arc<KerberosCredential>),
}

impl Credential {
    pub fn username(&self) -> &str {
        match self {
            Credential::Local { user } => user,
            Credential::Kerberos(cred) => cred.username(),
        }
    }

    pub fn kerberos(&self) -> Option<&Arc<KerberosCredential>> {
        match self {
            Credential::Kerberos(cred) => Some(cred),
            Credential::Local { .. } => None,
        }
    }
}

pub trait CredentialProvider: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Produce the credential to connect with. `ticket_cache` overrides the
    /// provider's default cache location, where that applies.
    fn acquire(&self, ticket_cache: Option<&Path>) -> Result<Credential, ConfigError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalIdentityProvider;

impl CredentialProvider for LocalIdentityProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn acquire(&self, _ticket_cache: Option<&Path>) -> Result<Credential, ConfigError> {
        Ok(Credential::Local {
            user: current_user(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct KerberosCredentialProvider {
    paths: KerberosPaths,
}

impl KerberosCredentialProvider {
    pub fn new(paths: KerberosPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &KerberosPaths {
        &self.paths
    }
}

impl CredentialProvider for KerberosCredentialProvider {
    fn name(&self) -> &'static str {
        "kerberos"
    }

    fn acquire(&self, ticket_cache: Option<&Path>) -> Result<Credential, ConfigError> {
        let cred = KerberosCredential::load(&self.paths, ticket_cache)?;
        tracing::debug!(
            principal = cred.principal(),
            ccache = %cred.ccache_path().display(),
            expires_at = cred.expires_at(),
            "loaded kerberos credential"
        );
        Ok(Credential::Kerberos(Arc::new(cred)))
    }
}

/// Name of the effective OS user. Falls back to `$USER`, `$LOGNAME`, and
/// finally the numeric uid when the passwd database has no entry.
pub fn current_user() -> String {
    let uid = getuid();
    if let Ok(Some(user)) = User::from_uid(uid) {
        return user.name;
    }
    ["USER", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| uid.as_raw().to_string())
}
