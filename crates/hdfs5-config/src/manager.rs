use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::ConfigError;
use crate::hadoop_conf::HadoopConf;

/// Holds the current ambient configuration with hot-swap support.
///
/// Readers get a cheap snapshot; a reload replaces the whole mapping so a
/// resolution in progress never observes a half-updated conf.
pub struct HadoopConfManager {
    conf: ArcSwap<HadoopConf>,
    dir: Option<PathBuf>,
}

impl HadoopConfManager {
    pub fn new(conf: HadoopConf) -> Self {
        Self {
            conf: ArcSwap::from_pointee(conf),
            dir: None,
        }
    }

    /// Load from a specific configuration directory.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let conf = HadoopConf::load_dir(dir)?.unwrap_or_default();
        Ok(Self {
            conf: ArcSwap::from_pointee(conf),
            dir: Some(dir.to_path_buf()),
        })
    }

    /// Load from `HADOOP_CONF_DIR` / `HADOOP_HOME`.
    pub fn load_from_environment() -> Result<Self, ConfigError> {
        let (conf, dir) = HadoopConf::load_from_environment()?;
        match &dir {
            Some(dir) => tracing::info!(dir = %dir.display(), keys = conf.len(), "hadoop configuration loaded"),
            None => tracing::debug!("no hadoop configuration directory found"),
        }
        Ok(Self {
            conf: ArcSwap::from_pointee(conf),
            dir,
        })
    }

    pub fn get(&self) -> Arc<HadoopConf> {
        self.conf.load_full()
    }

    pub fn update(&self, conf: HadoopConf) {
        self.conf.store(Arc::new(conf));
    }

    /// Directory the configuration was read from, if any.
    pub fn source_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Re-read the source directory. Without one this is a no-op.
    pub fn reload(&self) -> Result<(), ConfigError> {
        if let Some(ref dir) = self.dir {
            let conf = HadoopConf::load_dir(dir)?.unwrap_or_default();
            tracing::info!(dir = %dir.display(), keys = conf.len(), "hadoop configuration reloaded");
            self.conf.store(Arc::new(conf));
        }
        Ok(())
    }
}

impl Default for HadoopConfManager {
    fn default() -> Self {
        Self::new(HadoopConf::new())
    }
}

impl std::fmt::Debug for HadoopConfManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HadoopConfManager")
            .field("dir", &self.dir)
            .field("keys", &self.conf.load().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, value: &str) -> String {
        format!(
            "<configuration><property><name>{}</name><value>{}</value></property></configuration>",
            name, value
        )
    }

    #[test]
    fn test_update_replaces_snapshot() {
        let manager = HadoopConfManager::default();
        let before = manager.get();
        manager.update([("dfs.replication", "1")].into_iter().collect());
        assert!(before.is_empty());
        assert_eq!(manager.get().get("dfs.replication"), Some("1"));
    }

    #[test]
    fn test_reload_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hdfs-site.xml"), site("dfs.replication", "1")).unwrap();
        let manager = HadoopConfManager::load_dir(dir.path()).unwrap();
        assert_eq!(manager.get().get("dfs.replication"), Some("1"));

        std::fs::write(dir.path().join("hdfs-site.xml"), site("dfs.replication", "2")).unwrap();
        manager.reload().unwrap();
        assert_eq!(manager.get().get("dfs.replication"), Some("2"));
        assert_eq!(manager.source_dir(), Some(dir.path()));
    }

    #[test]
    fn test_reload_without_dir_is_noop() {
        let manager = HadoopConfManager::new([("a", "b")].into_iter().collect());
        manager.reload().unwrap();
        assert_eq!(manager.get().get("a"), Some("b"));
    }
}
