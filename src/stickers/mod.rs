mod library;

pub use library::{fitted_base_size, is_image_file, scan_sticker_directory, StickerLibrary};

use bevy::prelude::*;
use std::sync::Arc;

use crate::config::{AppConfig, ConfigLoaded};

/// Message to rescan the sticker directory
#[derive(Message)]
pub struct RefreshStickerLibrary;

pub struct StickerLibraryPlugin;

impl Plugin for StickerLibraryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StickerLibrary>()
            .add_message::<RefreshStickerLibrary>()
            .add_systems(Startup, load_sticker_library.after(ConfigLoaded))
            .add_systems(
                Update,
                refresh_sticker_library.run_if(on_message::<RefreshStickerLibrary>),
            );
    }
}

fn fill_library(library: &mut StickerLibrary, config: &AppConfig) {
    let path = config.sticker_library_path();
    if !path.exists()
        && let Err(e) = std::fs::create_dir_all(&path)
    {
        warn!("Failed to create sticker directory {:?}: {}", path, e);
    }

    library.assets = scan_sticker_directory(&path, config.data.overlay_size)
        .into_iter()
        .map(Arc::new)
        .collect();
    library.library_path = path;
}

/// Startup system: scan the configured sticker directory once
fn load_sticker_library(config: Res<AppConfig>, mut library: ResMut<StickerLibrary>) {
    fill_library(&mut library, &config);
    info!(
        "Loaded {} stickers from {:?}",
        library.assets.len(),
        library.library_path
    );
}

fn refresh_sticker_library(
    mut events: MessageReader<RefreshStickerLibrary>,
    config: Res<AppConfig>,
    mut library: ResMut<StickerLibrary>,
) {
    if events.read().last().is_none() {
        return;
    }
    fill_library(&mut library, &config);
    info!("Refreshed sticker library: {} stickers", library.assets.len());
}
