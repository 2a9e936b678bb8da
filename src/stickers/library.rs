use bevy::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compositor::OverlayAsset;

/// Read-only list of stickers available for placement.
#[derive(Resource, Default)]
pub struct StickerLibrary {
    pub library_path: PathBuf,
    pub assets: Vec<Arc<OverlayAsset>>,
}

impl StickerLibrary {
    pub fn get(&self, id: &str) -> Option<Arc<OverlayAsset>> {
        self.assets.iter().find(|asset| asset.id == id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

pub fn is_image_file(path: &Path) -> bool {
    let extensions = ["png", "jpg", "jpeg", "webp", "gif", "bmp", "tiff", "tif"];

    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Size of a sticker at scale 1.0: its aspect ratio fitted into a square of
/// `overlay_size`.
pub fn fitted_base_size(width: u32, height: u32, overlay_size: f32) -> Vec2 {
    if width == 0 || height == 0 {
        return Vec2::splat(overlay_size);
    }
    let longest = width.max(height) as f32;
    Vec2::new(width as f32, height as f32) * (overlay_size / longest)
}

/// Decode every image in `dir` (non-recursive), sorted by file name.
/// Files that fail to decode are skipped with a warning.
pub fn scan_sticker_directory(dir: &Path, overlay_size: f32) -> Vec<OverlayAsset> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read sticker directory {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    paths.sort();

    let mut assets = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        match image::open(&path) {
            Ok(image) => {
                let base_size = fitted_base_size(image.width(), image.height(), overlay_size);
                assets.push(
                    OverlayAsset::new(file_name, image, base_size).with_source(name, path.clone()),
                );
            }
            Err(e) => warn!("Skipping sticker {:?}: {}", path, e),
        }
    }
    assets
}
