//! Logging bootstrap for the shim.
//!
//! The library is loaded into foreign processes, so console output always
//! goes to stderr and installing a subscriber is best-effort: a host that
//! already owns the global subscriber wins.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use tracing::{debug, error, info, instrument, trace, warn};
pub use tracing_appender::non_blocking::WorkerGuard;

pub const ENV_LEVEL: &str = "HDFS5_LOG";
pub const ENV_DIR: &str = "HDFS5_LOG_DIR";
pub const ENV_JSON: &str = "HDFS5_LOG_JSON";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to create log file appender: {0}")]
    Appender(#[from] rolling::InitError),

    #[error("global subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Rolling log files go here; `None` disables file output.
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_prefix")]
    pub file_prefix: String,

    /// `hourly`, `daily` or `never`.
    #[serde(default = "default_rotation")]
    pub rotation: String,

    #[serde(default)]
    pub json_format: bool,

    /// Also log to stderr.
    #[serde(default = "default_true")]
    pub console_output: bool,
}

fn default_level() -> String {
    "warn".into()
}

fn default_prefix() -> String {
    "hdfs5".into()
}

fn default_rotation() -> String {
    "daily".into()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
            log_dir: None,
            file_prefix: default_prefix(),
            rotation: default_rotation(),
            json_format: false,
            console_output: true,
        }
    }
}

impl LogConfig {
    /// Build a config from `HDFS5_LOG`, `HDFS5_LOG_DIR` and `HDFS5_LOG_JSON`.
    ///
    /// When a log directory is given, console output is turned off.
    pub fn from_env() -> Self {
        let mut config = LogConfig::default();
        if let Ok(level) = std::env::var(ENV_LEVEL) {
            if !level.trim().is_empty() {
                config.level = level.trim().to_string();
            }
        }
        if let Some(dir) = std::env::var_os(ENV_DIR) {
            if !dir.is_empty() {
                config.log_dir = Some(PathBuf::from(dir));
                config.console_output = false;
            }
        }
        if let Ok(json) = std::env::var(ENV_JSON) {
            config.json_format = matches!(json.trim(), "1" | "true" | "yes");
        }
        config
    }
}

/// Install the global subscriber described by `config`.
///
/// Returns a guard that must be held alive for as long as file logging is
/// wanted (it owns the non-blocking writer thread).
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, LoggingError> {
    // RUST_LOG still wins so a host can debug us without our variables.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let console_layer: Option<Box<dyn tracing_subscriber::Layer<_> + Send + Sync>> =
        if config.console_output {
            if config.json_format {
                Some(Box::new(fmt::layer().json().with_writer(std::io::stderr)))
            } else {
                Some(Box::new(fmt::layer().with_writer(std::io::stderr)))
            }
        } else {
            None
        };

    let (file_layer, guard): (
        Option<Box<dyn tracing_subscriber::Layer<_> + Send + Sync>>,
        Option<tracing_appender::non_blocking::WorkerGuard>,
    ) = if let Some(ref log_dir) = config.log_dir {
        let rotation = match config.rotation.as_str() {
            "hourly" => rolling::Rotation::HOURLY,
            "never" => rolling::Rotation::NEVER,
            _ => rolling::Rotation::DAILY,
        };

        let file_appender = rolling::RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .build(log_dir)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json_format {
            Box::new(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
        } else {
            Box::new(fmt::layer().with_ansi(false).with_writer(non_blocking))
        };

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    registry.with(console_layer).with(file_layer).try_init()?;

    Ok(guard)
}
