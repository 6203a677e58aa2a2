mod cfg_store;
mod config;
pub mod database;

pub use cfg_store::{CfgStore, DbCfgStore, MemoryCfgStore, CFG_KEY};
pub use config::{Config, NotificationsConfig, PollConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `WORKREST_HOME` wins when set. Otherwise `~/.config/workrest`, or
/// `~/.config/workrest-dev` with `WORKREST_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("WORKREST_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("WORKREST_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("workrest-dev")
            } else {
                base_dir.join("workrest")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
