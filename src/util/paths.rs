//! Path utilities for statescope data directories

use std::path::PathBuf;
use std::sync::OnceLock;

/// Environment variable overriding the default data directory
pub const DATA_DIR_ENV: &str = "STATESCOPE_DATA_DIR";

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Must be called early in main() before any other path functions are used.
/// If custom_path is None, uses `$STATESCOPE_DATA_DIR` or ~/.statescope.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

/// Get the default data directory path
fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|h| h.join(".statescope"))
        .unwrap_or_else(|| PathBuf::from(".statescope"))
}

/// Get the base data directory.
/// Returns the custom path if set via init_data_dir(), otherwise the default
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Get the logs directory (~/.statescope/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the default log file path (~/.statescope/logs/statescope.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("statescope.log")
}

/// Get the config file path (~/.statescope/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}
