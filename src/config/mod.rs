use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::DEFAULT_OVERLAY_SIZE;

/// System set for config loading (other plugins can run after this)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigLoaded;

fn default_overlay_size() -> f32 {
    DEFAULT_OVERLAY_SIZE
}

/// Application configuration persisted to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfigData {
    /// Directory scanned for sticker images (platform default when unset)
    #[serde(default)]
    pub sticker_library_path: Option<PathBuf>,

    /// Directory exported images are written to (platform default when unset)
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    /// Directory the photo picker opened last
    #[serde(default)]
    pub last_photo_dir: Option<PathBuf>,

    /// Edge length of a sticker at scale 1.0, in canvas units
    #[serde(default = "default_overlay_size")]
    pub overlay_size: f32,

    /// Open exported images with the system viewer
    #[serde(default)]
    pub open_after_export: bool,
}

impl Default for AppConfigData {
    fn default() -> Self {
        Self {
            sticker_library_path: None,
            export_dir: None,
            last_photo_dir: None,
            overlay_size: DEFAULT_OVERLAY_SIZE,
            open_after_export: false,
        }
    }
}

/// Runtime configuration resource
#[derive(Resource)]
pub struct AppConfig {
    /// The persisted configuration data
    pub data: AppConfigData,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Whether config needs to be saved (dirty flag)
    pub dirty: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: AppConfigData::default(),
            config_path: crate::paths::config_file(),
            dirty: false,
        }
    }
}

impl AppConfig {
    pub fn sticker_library_path(&self) -> PathBuf {
        self.data
            .sticker_library_path
            .clone()
            .unwrap_or_else(crate::paths::default_sticker_dir)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.data
            .export_dir
            .clone()
            .unwrap_or_else(crate::paths::default_export_dir)
    }
}

/// Resource to notify user when config was reset to defaults
#[derive(Resource, Default)]
pub struct ConfigResetNotification {
    /// Whether to show the notification dialog
    pub show: bool,
    /// The reason for the reset (parse error, read error, etc.)
    pub reason: Option<String>,
}

/// Message to trigger config save
#[derive(Message)]
pub struct SaveConfigRequest;

/// Message to remember the directory a photo was picked from
#[derive(Message)]
pub struct UpdateLastPhotoDirRequest {
    pub path: PathBuf,
}

/// Parse config JSON, sanitizing values the editor cannot work with.
pub fn parse_config(json: &str) -> Result<AppConfigData, serde_json::Error> {
    let mut data: AppConfigData = serde_json::from_str(json)?;
    if !data.overlay_size.is_finite() || data.overlay_size <= 0.0 {
        warn!(
            "Invalid overlay_size {} in config, using {}",
            data.overlay_size, DEFAULT_OVERLAY_SIZE
        );
        data.overlay_size = DEFAULT_OVERLAY_SIZE;
    }
    Ok(data)
}

/// Load configuration from disk. Returns the data and, when the file could
/// not be used, the reason it was reset to defaults.
fn load_config(config_path: &PathBuf) -> (AppConfigData, Option<String>) {
    if !config_path.exists() {
        info!("No config file found, using defaults");
        return (AppConfigData::default(), None);
    }

    match std::fs::read_to_string(config_path) {
        Ok(json) => match parse_config(&json) {
            Ok(data) => {
                info!("Loaded config from {:?}", config_path);
                (data, None)
            }
            Err(e) => {
                warn!("Failed to parse config file: {}", e);
                (
                    AppConfigData::default(),
                    Some(format!("Configuration file was corrupted: {}", e)),
                )
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            (
                AppConfigData::default(),
                Some(format!("Could not read configuration file: {}", e)),
            )
        }
    }
}

/// Save configuration to disk
fn save_config(config: &AppConfig) {
    match serde_json::to_string_pretty(&config.data) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&config.config_path, json) {
                error!("Failed to save config: {}", e);
            } else {
                info!("Config saved to {:?}", config.config_path);
            }
        }
        Err(e) => {
            error!("Failed to serialize config: {}", e);
        }
    }
}

/// Startup system to load config from disk into the existing resource
fn load_config_system(
    mut config: ResMut<AppConfig>,
    mut reset_notification: ResMut<ConfigResetNotification>,
) {
    let (data, reset_reason) = load_config(&config.config_path);
    config.data = data;
    config.dirty = false;

    if let Some(reason) = reset_reason {
        reset_notification.show = true;
        reset_notification.reason = Some(reason);
    }
}

/// System to save config when requested
fn save_config_system(
    mut events: MessageReader<SaveConfigRequest>,
    mut config: ResMut<AppConfig>,
) {
    for _ in events.read() {
        if config.dirty {
            save_config(&config);
            config.dirty = false;
        }
    }
}

/// System to update the last photo directory
fn update_last_photo_dir_system(
    mut events: MessageReader<UpdateLastPhotoDirRequest>,
    mut config: ResMut<AppConfig>,
    mut save_events: MessageWriter<SaveConfigRequest>,
) {
    for event in events.read() {
        if config.data.last_photo_dir.as_ref() == Some(&event.path) {
            continue;
        }
        config.data.last_photo_dir = Some(event.path.clone());
        config.dirty = true;
        save_events.write(SaveConfigRequest);
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AppConfig>()
            .init_resource::<ConfigResetNotification>()
            .add_message::<SaveConfigRequest>()
            .add_message::<UpdateLastPhotoDirRequest>()
            .add_systems(Startup, load_config_system.in_set(ConfigLoaded))
            .add_systems(
                Update,
                (
                    update_last_photo_dir_system.run_if(on_message::<UpdateLastPhotoDirRequest>),
                    save_config_system.run_if(on_message::<SaveConfigRequest>),
                )
                    .chain(),
            );
    }
}
