use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::url::normalize_base_url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const BASE_URL_ENV: &str = "LOGCHAT_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root URL of the chatbot server
    pub base_url: Option<String>,
    /// Per-request timeout in seconds; unset means no client-side timeout
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Picks the server URL: explicit flag, then environment, then the
    /// config file, then the built-in default.
    pub fn resolved_base_url(&self, flag: Option<&str>) -> String {
        let env = std::env::var(BASE_URL_ENV).ok();
        self.resolve_base_url_with(flag, env.as_deref())
    }

    pub(crate) fn resolve_base_url_with(&self, flag: Option<&str>, env: Option<&str>) -> String {
        let chosen = [flag, env, self.base_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL);
        normalize_base_url(chosen)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/logchat/config.toml` → `~/.config/logchat/config.toml`
/// - macOS: `/Users/user/Library/Application Support/...` → `~/Library/Application Support/...`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
