//! GPU textures for the photo and sticker images shown in egui.

use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy_egui::{egui, EguiTextureHandle, EguiUserTextures};
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::Arc;

use crate::compositor::{AssetId, EditingSession, OverlayAsset};
use crate::stickers::StickerLibrary;

pub struct CachedTexture {
    pub handle: Handle<Image>,
    pub texture_id: egui::TextureId,
}

/// Sticker texture plus the library entry it was uploaded from.
struct CachedSticker {
    source: Arc<OverlayAsset>,
    texture: CachedTexture,
}

#[derive(Resource, Default)]
pub struct TextureCache {
    photo_source: Option<Arc<DynamicImage>>,
    photo: Option<CachedTexture>,
    stickers: HashMap<AssetId, CachedSticker>,
}

impl TextureCache {
    pub fn photo_id(&self) -> Option<egui::TextureId> {
        self.photo.as_ref().map(|t| t.texture_id)
    }

    pub fn sticker_id(&self, asset_id: &str) -> Option<egui::TextureId> {
        self.stickers.get(asset_id).map(|s| s.texture.texture_id)
    }
}

/// Cached sticker ids whose library entry is gone or was reloaded from disk.
/// A rescan builds fresh assets, so an edited file under the same id shows
/// up as a different `Arc`.
pub fn stale_stickers<'a>(
    cached: impl IntoIterator<Item = (&'a AssetId, &'a Arc<OverlayAsset>)>,
    library: &StickerLibrary,
) -> Vec<AssetId> {
    cached
        .into_iter()
        .filter(|(id, source)| {
            library
                .get(id)
                .is_none_or(|current| !Arc::ptr_eq(&current, source))
        })
        .map(|(id, _)| id.clone())
        .collect()
}

/// Convert a decoded image into a bevy texture.
pub fn to_bevy_image(image: &DynamicImage) -> Image {
    let rgba = image.to_rgba8();
    Image::new(
        Extent3d {
            width: rgba.width(),
            height: rgba.height(),
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        rgba.into_raw(),
        TextureFormat::Rgba8UnormSrgb,
        default(),
    )
}

fn register(
    image: &DynamicImage,
    images: &mut Assets<Image>,
    egui_textures: &mut EguiUserTextures,
) -> CachedTexture {
    let handle = images.add(to_bevy_image(image));
    let texture_id = egui_textures.add_image(EguiTextureHandle::Weak(handle.id()));
    CachedTexture { handle, texture_id }
}

/// Keep textures in step with the session photo and the sticker library.
/// Runs in Update before the egui pass.
pub fn sync_textures(
    session: Res<EditingSession>,
    library: Res<StickerLibrary>,
    mut cache: ResMut<TextureCache>,
    mut images: ResMut<Assets<Image>>,
    mut egui_textures: ResMut<EguiUserTextures>,
) {
    let photo_changed = match (session.base_image(), cache.photo_source.as_ref()) {
        (Some(current), Some(cached)) => !Arc::ptr_eq(current, cached),
        (None, None) => false,
        _ => true,
    };
    if photo_changed {
        if let Some(old) = cache.photo.take() {
            images.remove(&old.handle);
        }
        cache.photo_source = session.base_image().cloned();
        if let Some(photo) = session.base_image() {
            cache.photo = Some(register(photo, &mut images, &mut egui_textures));
            debug!("Uploaded {}x{} photo texture", photo.width(), photo.height());
        }
    }

    if library.is_changed() {
        let stale = stale_stickers(
            cache.stickers.iter().map(|(id, cached)| (id, &cached.source)),
            &library,
        );
        for id in stale {
            if let Some(old) = cache.stickers.remove(&id) {
                images.remove(&old.texture.handle);
                debug!("Dropped texture for sticker {}", id);
            }
        }
    }

    for asset in &library.assets {
        if !cache.stickers.contains_key(&asset.id) {
            let texture = register(&asset.image, &mut images, &mut egui_textures);
            cache.stickers.insert(
                asset.id.clone(),
                CachedSticker {
                    source: asset.clone(),
                    texture,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    fn sticker(id: &str, color: [u8; 4]) -> Arc<OverlayAsset> {
        Arc::new(OverlayAsset::new(
            id,
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba(color))),
            Vec2::splat(80.0),
        ))
    }

    #[test]
    fn test_to_bevy_image_keeps_size_and_pixels() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4])));
        let image = to_bevy_image(&source);
        assert_eq!(image.width(), 3);
        assert_eq!(image.height(), 2);
        let data = image.data.as_ref().unwrap();
        assert_eq!(data.len(), 3 * 2 * 4);
        assert_eq!(&data[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_rescanned_sticker_is_stale() {
        let kept = sticker("kept", [0, 255, 0, 255]);
        let edited = sticker("edited", [255, 0, 0, 255]);
        let deleted = sticker("deleted", [0, 0, 255, 255]);
        let cached: HashMap<AssetId, Arc<OverlayAsset>> = [&kept, &edited, &deleted]
            .into_iter()
            .map(|asset| (asset.id.clone(), asset.clone()))
            .collect();

        // Same id, new pixels after a rescan; "deleted" is gone from disk.
        let library = StickerLibrary {
            library_path: PathBuf::new(),
            assets: vec![kept.clone(), sticker("edited", [255, 255, 0, 255])],
        };

        let mut stale = stale_stickers(&cached, &library);
        stale.sort();
        assert_eq!(stale, vec![deleted.id.clone(), edited.id.clone()]);
    }
}
