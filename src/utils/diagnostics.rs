//! Diagnostic logging setup.
//!
//! The TUI owns the terminal, so interactive sessions log to a file in the
//! platform data directory. One-shot commands log to stderr.

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::core::config::io::project_dirs;

pub const LOG_ENV: &str = "LOGCHAT_LOG";
pub const LOG_FILE_NAME: &str = "logchat.log";

pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// `logchat.log` in the data directory, or stderr when there is none.
    pub fn data_file() -> Self {
        match project_dirs() {
            Ok(dirs) => LogTarget::File(dirs.data_dir().join(LOG_FILE_NAME)),
            Err(_) => LogTarget::Stderr,
        }
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "logchat=debug" } else { "warn" };
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_tracing(target: LogTarget, verbose: bool) -> Result<(), Box<dyn Error>> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(verbose));

    let installed = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = open_log_file(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };

    if let Err(err) = installed {
        tracing::debug!(%err, "tracing subscriber already installed");
    }
    Ok(())
}
