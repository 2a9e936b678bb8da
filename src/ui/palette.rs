use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::compositor::{EditingSession, PlaceOverlayRequest};
use crate::constants::PALETTE_THUMBNAIL_SIZE;
use crate::stickers::{RefreshStickerLibrary, StickerLibrary};

use super::textures::TextureCache;

/// Thumbnail size keeping the sticker's aspect ratio.
pub fn thumbnail_size(base_size: Vec2) -> egui::Vec2 {
    let longest = base_size.max_element();
    if longest <= 0.0 {
        return egui::Vec2::splat(PALETTE_THUMBNAIL_SIZE);
    }
    let fitted = base_size * (PALETTE_THUMBNAIL_SIZE / longest);
    egui::vec2(fitted.x, fitted.y)
}

/// Left panel listing the sticker library. Clicking a sticker places it.
pub fn sticker_palette_ui(
    mut contexts: EguiContexts,
    session: Res<EditingSession>,
    library: Res<StickerLibrary>,
    textures: Res<TextureCache>,
    mut place_events: MessageWriter<PlaceOverlayRequest>,
    mut refresh_events: MessageWriter<RefreshStickerLibrary>,
) -> Result {
    egui::SidePanel::left("sticker_palette")
        .resizable(false)
        .exact_width(PALETTE_THUMBNAIL_SIZE * 2.0 + 36.0)
        .show(contexts.ctx_mut()?, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Stickers");
                if ui.small_button("Rescan").on_hover_text("Reload the sticker folder").clicked() {
                    refresh_events.write(RefreshStickerLibrary);
                }
            });
            ui.separator();

            if library.is_empty() {
                ui.label(egui::RichText::new("No stickers found in").weak());
                ui.label(
                    egui::RichText::new(library.library_path.display().to_string())
                        .weak()
                        .small(),
                );
                return;
            }

            let enabled = session.is_editing();
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for asset in &library.assets {
                        let size = thumbnail_size(asset.base_size);
                        let response = match textures.sticker_id(&asset.id) {
                            Some(texture_id) => ui.add_enabled(
                                enabled,
                                egui::Button::image(egui::Image::new(
                                    egui::load::SizedTexture::new(texture_id, size),
                                ))
                                .min_size(egui::Vec2::splat(PALETTE_THUMBNAIL_SIZE)),
                            ),
                            None => ui.add_enabled(
                                enabled,
                                egui::Button::new(asset.name.as_str())
                                    .min_size(egui::Vec2::splat(PALETTE_THUMBNAIL_SIZE)),
                            ),
                        };
                        if response.on_hover_text(asset.name.as_str()).clicked() {
                            place_events.write(PlaceOverlayRequest {
                                asset_id: asset.id.clone(),
                            });
                        }
                    }
                });
            });
        });
    Ok(())
}
