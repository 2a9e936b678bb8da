//! Centralized path resolution for platform-appropriate user data directories.
//!
//! In development mode (cargo run), paths resolve to local directories.
//! In installed mode, paths resolve to platform-specific locations:
//! - Windows: `%APPDATA%\Stickercam\`
//! - macOS: `~/Library/Application Support/Stickercam/`
//! - Linux: `~/.config/stickercam/` (config), `~/.local/share/stickercam/` (data)

use std::path::PathBuf;

/// Returns true when running in development mode (cargo run).
///
/// Detection methods:
/// - `CARGO` env var is set (cargo run sets this)
/// - Debug assertions enabled (debug builds)
pub fn is_dev_mode() -> bool {
    std::env::var("CARGO").is_ok() || cfg!(debug_assertions)
}

/// Platform-appropriate config directory.
///
/// - Dev mode: current directory
/// - Linux: `~/.config/stickercam/`
/// - Windows/macOS: same as data_dir
pub fn config_dir() -> Option<PathBuf> {
    if is_dev_mode() {
        return Some(PathBuf::from("."));
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir().map(|p| p.join("stickercam"))
    }

    #[cfg(not(target_os = "linux"))]
    {
        data_dir()
    }
}

/// Platform-appropriate data directory.
pub fn data_dir() -> Option<PathBuf> {
    if is_dev_mode() {
        return Some(PathBuf::from("."));
    }

    dirs::data_dir().map(|p| p.join("stickercam"))
}

/// Path to the config file (`config.json` in the config directory).
pub fn config_file() -> PathBuf {
    config_dir()
        .map(|p| p.join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Default sticker directory.
///
/// - Dev mode: `./assets/stickers/`
/// - Installed: `{data_dir}/stickers/`
pub fn default_sticker_dir() -> PathBuf {
    if is_dev_mode() {
        return PathBuf::from("assets/stickers");
    }
    data_dir()
        .map(|p| p.join("stickers"))
        .unwrap_or_else(|| PathBuf::from("stickers"))
}

/// Default directory for exported images.
///
/// - Dev mode: `./exports/`
/// - Installed: the user's picture directory, falling back to `{data_dir}/exports/`
pub fn default_export_dir() -> PathBuf {
    if is_dev_mode() {
        return PathBuf::from("exports");
    }
    dirs::picture_dir()
        .map(|p| p.join("Stickercam"))
        .or_else(|| data_dir().map(|p| p.join("exports")))
        .unwrap_or_else(|| PathBuf::from("exports"))
}

/// Path to the logs directory.
pub fn logs_dir() -> PathBuf {
    data_dir()
        .map(|p| p.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Ensure config and data directories exist.
///
/// Called early in startup, before logging is configured.
pub fn ensure_directories() -> std::io::Result<()> {
    if is_dev_mode() {
        return Ok(());
    }

    if let Some(config) = config_dir() {
        std::fs::create_dir_all(&config)?;
    }
    if let Some(data) = data_dir() {
        std::fs::create_dir_all(&data)?;
        std::fs::create_dir_all(data.join("logs"))?;
    }
    Ok(())
}
