mod backup;
mod config;
pub mod database;

pub use backup::Backup;
pub use config::{AmbientConfig, Config, CustomPatternConfig, NotificationsConfig, SessionConfig};
pub use database::{Database, HistoryTotals};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `PRANAYAMA_DATA_DIR` wins when set. Otherwise `~/.config/pranayama[-dev]/`,
/// with the `-dev` suffix when `PRANAYAMA_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("PRANAYAMA_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PRANAYAMA_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pranayama-dev")
            } else {
                base_dir.join("pranayama")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
