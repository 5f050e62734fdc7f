//! Process-wide bridge behind the native exports.
//!
//! The first export to run builds the default bridge: logging from the
//! `HDFS5_LOG*` variables, the ambient Hadoop configuration, and a
//! connector. Builds with the `hdfs-native` feature dial the cluster unless
//! `HDFS5_LOCAL_ROOT` is set; otherwise the local connector rooted there is
//! used. An embedder may [`install`] its own bridge before that.

use std::sync::{Arc, OnceLock};

use hdfs5_client::{Connector, LocalConnector};
use hdfs5_config::{ConfigResolver, HadoopConfManager};
use hdfs5_logging::{LogConfig, LoggingError, WorkerGuard};
use parking_lot::Mutex;

use crate::bridge::Bridge;

static BRIDGE: OnceLock<Arc<Bridge>> = OnceLock::new();

/// Keeps the file appender's writer thread alive for the process lifetime.
static LOG_GUARD: Mutex<Option<WorkerGuard>> = parking_lot::const_mutex(None);

/// Install `bridge` as the process-wide bridge. Fails, handing the bridge
/// back, once one is in place.
pub fn install(bridge: Arc<Bridge>) -> Result<(), Arc<Bridge>> {
    BRIDGE.set(bridge)
}

pub fn bridge() -> &'static Bridge {
    BRIDGE.get_or_init(build_default)
}

fn build_default() -> Arc<Bridge> {
    init_logging();

    let conf = HadoopConfManager::load_from_environment().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable hadoop configuration");
        HadoopConfManager::default()
    });
    let connector = wire_connector().unwrap_or_else(|| {
        let local = LocalConnector::from_env();
        tracing::info!(root = %local.root().display(), "native bridge ready");
        Arc::new(local) as Arc<dyn Connector>
    });

    Arc::new(Bridge::new(ConfigResolver::with_conf(Arc::new(conf)), connector))
}

#[cfg(feature = "hdfs-native")]
fn wire_connector() -> Option<Arc<dyn Connector>> {
    if std::env::var_os(hdfs5_client::local::ENV_LOCAL_ROOT).is_some() {
        return None;
    }
    match hdfs5_client::native::NativeConnector::new() {
        Ok(connector) => {
            tracing::info!("native bridge ready, wire client");
            Some(Arc::new(connector))
        }
        Err(e) => {
            tracing::warn!(error = %e, "wire client unavailable, using local root");
            None
        }
    }
}

#[cfg(not(feature = "hdfs-native"))]
fn wire_connector() -> Option<Arc<dyn Connector>> {
    None
}

fn init_logging() {
    match hdfs5_logging::init_logging(&LogConfig::from_env()) {
        Ok(guard) => *LOG_GUARD.lock() = guard,
        // The host already installed a subscriber; log through it.
        Err(LoggingError::AlreadyInstalled(_)) => {}
        Err(e) => tracing::warn!(error = %e, "logging setup failed"),
    }
}

#[cfg(test)]
pub(crate) const TEST_CONF_KEY: &str = "hdfs5.test.key";
#[cfg(test)]
pub(crate) const TEST_CONF_VALUE: &str = "present";

/// Install a bridge over a process-lifetime temporary root, once per test
/// binary.
#[cfg(test)]
pub(crate) fn install_test_bridge() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::mem::forget(dir);

        let mut conf = hdfs5_config::HadoopConf::new();
        conf.set(TEST_CONF_KEY, TEST_CONF_VALUE);
        let resolver = ConfigResolver::with_conf(Arc::new(HadoopConfManager::new(conf)));
        let bridge = Bridge::new(resolver, Arc::new(LocalConnector::new(root)));
        assert!(install(Arc::new(bridge)).is_ok(), "bridge installed before tests");
    });
}
