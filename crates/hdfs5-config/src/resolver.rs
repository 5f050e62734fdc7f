//! Builds `Configuration`s from the ambient conf and resolves them into
//! `ClientOptions` at connect time.

use std::sync::Arc;

use crate::credential::{CredentialProvider, KerberosCredentialProvider, LocalIdentityProvider};
use crate::error::ConfigError;
use crate::kerberos::KerberosPaths;
use crate::manager::HadoopConfManager;
use crate::namenode::resolve_namenode_addresses;
use crate::options::{ClientOptions, Configuration};

#[derive(Debug, Clone)]
pub struct ConfigResolver {
    conf: Arc<HadoopConfManager>,
    kerberos_paths: KerberosPaths,
}

impl ConfigResolver {
    pub fn new(conf: Arc<HadoopConfManager>, kerberos_paths: KerberosPaths) -> Self {
        Self {
            conf,
            kerberos_paths,
        }
    }

    /// Resolver over `conf` with Kerberos file locations taken from the
    /// environment.
    pub fn with_conf(conf: Arc<HadoopConfManager>) -> Self {
        Self::new(conf, KerberosPaths::from_env())
    }

    /// Resolver reading both the Hadoop conf directory and Kerberos paths
    /// from the environment.
    pub fn from_environment() -> Result<Self, ConfigError> {
        let conf = HadoopConfManager::load_from_environment()?;
        Ok(Self::with_conf(Arc::new(conf)))
    }

    pub fn conf_manager(&self) -> &Arc<HadoopConfManager> {
        &self.conf
    }

    pub fn kerberos_paths(&self) -> &KerberosPaths {
        &self.kerberos_paths
    }

    /// A fresh configuration seeded from the current ambient conf.
    pub fn new_configuration(&self) -> Configuration {
        let conf = self.conf.get();
        let provider: Arc<dyn CredentialProvider> = if conf.kerberos_enabled() {
            Arc::new(KerberosCredentialProvider::new(self.kerberos_paths.clone()))
        } else {
            Arc::new(LocalIdentityProvider)
        };

        let mut config = Configuration::new(provider);
        config.addresses = conf.namenodes();
        config.service_principal = conf.namenode_principal();
        config.use_datanode_hostname = conf.use_datanode_hostname();
        if !conf.kerberos_enabled() {
            config.user = Some(crate::credential::current_user());
        }
        config
    }

    /// Resolve namenodes, acquire the credential and fix the defaults a
    /// client needs. Fails without side effects, so the configuration can be
    /// retried.
    pub fn resolve(&self, config: &Configuration) -> Result<ClientOptions, ConfigError> {
        let conf = self.conf.get().with_overrides(&config.overrides);

        let addresses = resolve_namenode_addresses(&config.addresses, &conf);
        let credential = config
            .provider
            .acquire(config.ticket_cache_path.as_deref())?;
        let user = config
            .user
            .clone()
            .unwrap_or_else(|| credential.username().to_string());

        let options = ClientOptions {
            addresses,
            user,
            kerberos: credential.kerberos().cloned(),
            service_principal: config
                .service_principal
                .clone()
                .or_else(|| conf.namenode_principal()),
            use_datanode_hostname: config.use_datanode_hostname || conf.use_datanode_hostname(),
            namenode_dial: config.namenode_dial,
            datanode_dial: config.datanode_dial,
            default_replication: conf.replication()?,
            default_block_size: conf.block_size()?,
        };
        tracing::debug!(
            namenodes = ?options.addresses,
            user = %options.user,
            provider = config.provider.name(),
            "resolved client options"
        );
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hadoop_conf::HadoopConf;
    use crate::kerberos::ccache::fixture::CCacheBuilder;
    use crate::kerberos::ccache::VERSION_4;
    use std::path::Path;

    fn resolver(conf: HadoopConf, paths: KerberosPaths) -> ConfigResolver {
        ConfigResolver::new(Arc::new(HadoopConfManager::new(conf)), paths)
    }

    fn no_kerberos() -> KerberosPaths {
        KerberosPaths {
            krb5_config: "/nonexistent/krb5.conf".into(),
            ccache: "/nonexistent/cc".into(),
        }
    }

    fn ha_conf() -> HadoopConf {
        [
            ("dfs.namenode.rpc-address.ns1.nn1", "hostB:8020"),
            ("dfs.namenode.rpc-address.ns1.nn2", "hostA:8020"),
            ("fs.defaultFS", "hdfs://ns1"),
            ("dfs.replication", "2"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_new_configuration_defaults() {
        let r = resolver(ha_conf(), no_kerberos());
        let config = r.new_configuration();
        assert_eq!(config.addresses, vec!["hostA:8020".to_string(), "hostB:8020".to_string()]);
        assert_eq!(config.provider.name(), "local");
        assert_eq!(config.user.as_deref(), Some(crate::credential::current_user().as_str()));
    }

    #[test]
    fn test_resolve_nameservice() {
        let r = resolver(ha_conf(), no_kerberos());
        let mut config = r.new_configuration();
        config.addresses.clear();
        config.set_user("alice");

        let opts = r.resolve(&config).unwrap();
        assert_eq!(opts.addresses, vec!["hostA:8020".to_string(), "hostB:8020".to_string()]);
        assert_eq!(opts.user, "alice");
        assert_eq!(opts.default_replication, 2);
        assert_eq!(opts.default_block_size, crate::hadoop_conf::DEFAULT_BLOCK_SIZE);
        assert!(opts.kerberos.is_none());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let r = resolver(ha_conf(), no_kerberos());
        let mut config = r.new_configuration();
        config.set_override("dfs.replication", "5");
        config.set_override("dfs.blocksize", "64m");
        let opts = r.resolve(&config).unwrap();
        assert_eq!(opts.default_replication, 5);
        assert_eq!(opts.default_block_size, 64 * 1024 * 1024);

        config.set_override("dfs.replication", "zero");
        assert!(matches!(r.resolve(&config), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_kerberos_required_but_missing() {
        let mut conf = ha_conf();
        conf.set("hadoop.security.authentication", "kerberos");
        let r = resolver(conf, no_kerberos());
        let config = r.new_configuration();
        assert_eq!(config.provider.name(), "kerberos");
        assert!(config.user.is_none());

        let err = r.resolve(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Kerberos(_)));
    }

    fn write_kerberos(dir: &Path, user: &str) -> KerberosPaths {
        let paths = KerberosPaths {
            krb5_config: dir.join("krb5.conf"),
            ccache: dir.join("cc"),
        };
        std::fs::write(&paths.krb5_config, "[libdefaults]\n default_realm = EXAMPLE.COM\n").unwrap();
        let bytes = CCacheBuilder::new(VERSION_4, &[user], "EXAMPLE.COM")
            .ticket(&[user], &["krbtgt", "EXAMPLE.COM"], "EXAMPLE.COM", 100)
            .build();
        std::fs::write(&paths.ccache, bytes).unwrap();
        paths
    }

    #[test]
    fn test_kerberos_user_from_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_kerberos(dir.path(), "svc");
        let mut conf = ha_conf();
        conf.set("hadoop.security.authentication", "Kerberos");
        conf.set("dfs.namenode.kerberos.principal", "nn/_HOST@EXAMPLE.COM");
        let r = resolver(conf, paths);

        let opts = r.resolve(&r.new_configuration()).unwrap();
        assert_eq!(opts.user, "svc");
        assert_eq!(opts.service_principal.as_deref(), Some("nn/_HOST"));
        assert_eq!(opts.kerberos.unwrap().realm(), "EXAMPLE.COM");
    }

    #[test]
    fn test_ticket_cache_override_applies_at_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_kerberos(dir.path(), "svc");
        let other = tempfile::tempdir().unwrap();
        let other_paths = write_kerberos(other.path(), "other");

        let mut conf = HadoopConf::new();
        conf.set("hadoop.security.authentication", "kerberos");
        let r = resolver(conf, paths);
        let mut config = r.new_configuration();
        config.set_ticket_cache_path(&other_paths.ccache);
        assert_eq!(r.resolve(&config).unwrap().user, "other");
    }
}
