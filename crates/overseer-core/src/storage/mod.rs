pub mod config;
pub mod database;
pub mod ids;
pub mod migrations;

pub use config::Config;
pub use database::Database;

use std::path::PathBuf;

/// Returns `~/.config/overseer[-dev]/` based on OVERSEER_ENV.
///
/// Set OVERSEER_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("OVERSEER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("overseer-dev")
    } else {
        base_dir.join("overseer")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
