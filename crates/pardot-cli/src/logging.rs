//! Tracing setup driven by the `debug`, `logging` and `logfile` settings.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use pardot_core::config::DEFAULT_LOGFILE;
use pardot_core::ClientConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Where diagnostics go for a given configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRouting {
    /// Default filter for the stderr layer
    pub stderr_level: &'static str,
    /// Directory and file name of the log file, if one is written
    pub file: Option<(PathBuf, OsString)>,
}

impl LogRouting {
    /// `debug` echoes diagnostics to stderr. `logging` writes them to
    /// `logfile`, or to stderr when no logfile is set.
    pub fn for_config(config: &ClientConfig) -> Self {
        let verbose = config.debug || (config.logging && config.logfile.is_none());
        let file = match (config.logging, &config.logfile) {
            (true, Some(path)) => Some(split_log_path(path)),
            _ => None,
        };
        Self {
            stderr_level: if verbose { "debug" } else { "warn" },
            file,
        }
    }
}

fn split_log_path(path: &Path) -> (PathBuf, OsString) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_LOGFILE.into());
    (dir.to_path_buf(), file_name)
}

/// Build a filter from RUST_LOG, falling back to `default`
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer on drop.
pub fn init_tracing(config: &ClientConfig) -> Option<WorkerGuard> {
    let routing = LogRouting::for_config(config);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(env_filter(routing.stderr_level));

    let (file_layer, guard) = match routing.file {
        Some((dir, file_name)) => {
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(env_filter("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}
