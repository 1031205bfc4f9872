mod config;
pub mod database;
mod history;
mod presets;

pub use config::{Config, HistoryConfig, LogConfig, NotificationsConfig, SessionDefaults};
pub use database::{Database, HistoryStats, PhaseRecord};
pub use history::HistoryRecorder;
pub use presets::{MemoryPresetStore, Preset, PresetId, PresetStore};

use std::path::PathBuf;

/// Returns `~/.config/studyclock[-dev]/` based on STUDYCLOCK_ENV.
///
/// Set STUDYCLOCK_ENV=dev to use development data directory.
/// STUDYCLOCK_DATA_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("STUDYCLOCK_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYCLOCK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyclock-dev")
            } else {
                base_dir.join("studyclock")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
