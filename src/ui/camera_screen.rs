use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::capture::{CaptureRequest, CaptureState};
use crate::compositor::{
    CanvasLayout, DiscardSessionRequest, EditingSession, FinishEditingRequest,
    GestureInterpreter, OverlayInstance, RemoveOverlayRequest, SessionState,
};
use crate::config::AppConfig;
use crate::constants::DELETE_BUTTON_SIZE;
use crate::export::{ExportRequest, ExportState};
use crate::input::CanvasRect;

use super::textures::TextureCache;

/// Aspect-fit `image_size` inside `available`, centered.
pub fn fit_rect(available: egui::Rect, image_size: egui::Vec2) -> egui::Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return egui::Rect::from_center_size(available.center(), egui::Vec2::ZERO);
    }
    let scale = (available.width() / image_size.x).min(available.height() / image_size.y);
    egui::Rect::from_center_size(available.center(), image_size * scale.max(0.0))
}

/// Window rectangle of an overlay, given the canvas origin and the number of
/// window pixels per canvas unit.
fn overlay_rect(origin: egui::Pos2, position: Vec2, size: Vec2, display_scale: f32) -> egui::Rect {
    let min = position * display_scale;
    let size = size * display_scale;
    egui::Rect::from_min_size(origin + egui::vec2(min.x, min.y), egui::vec2(size.x, size.y))
}

/// Canvas units for a freshly measured canvas, or the session's existing
/// layout. Once measured, the layout only changes with a new session; window
/// resizes go through the display scale instead.
fn canvas_layout(current: CanvasLayout, rect: egui::Rect) -> CanvasLayout {
    if current.is_measured() {
        current
    } else {
        CanvasLayout::new(rect.width(), rect.height())
    }
}

fn display_scale(layout: CanvasLayout, rect: egui::Rect) -> f32 {
    if layout.is_measured() {
        rect.width() / layout.width
    } else {
        1.0
    }
}

/// Top bar with the actions available in the current session state
#[allow(clippy::too_many_arguments)]
pub fn camera_toolbar_ui(
    mut contexts: EguiContexts,
    session: Res<EditingSession>,
    capture_state: Res<CaptureState>,
    export_state: Res<ExportState>,
    config: Res<AppConfig>,
    mut capture_events: MessageWriter<CaptureRequest>,
    mut finish_events: MessageWriter<FinishEditingRequest>,
    mut discard_events: MessageWriter<DiscardSessionRequest>,
    mut export_events: MessageWriter<ExportRequest>,
) -> Result {
    egui::TopBottomPanel::top("camera_toolbar")
        .frame(
            egui::Frame::side_top_panel(&contexts.ctx_mut()?.style())
                .inner_margin(egui::Margin::symmetric(12, 8)),
        )
        .show(contexts.ctx_mut()?, |ui| {
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing.x = 4.0;
                let button = |text: &str| {
                    egui::Button::new(egui::RichText::new(text).size(14.0).strong())
                        .min_size(egui::vec2(0.0, 28.0))
                };

                match session.state() {
                    SessionState::Capturing => {
                        let response = ui.add_enabled(
                            !capture_state.is_capturing,
                            button("Capture Photo"),
                        );
                        if response.clicked() {
                            capture_events.write(CaptureRequest);
                        }
                        if capture_state.is_capturing {
                            ui.spinner();
                        }
                    }
                    SessionState::Editing => {
                        if ui.add(button("Done")).clicked() {
                            finish_events.write(FinishEditingRequest);
                        }
                        if ui.add(button("Discard")).clicked() {
                            discard_events.write(DiscardSessionRequest);
                        }
                        ui.add_space(8.0);
                        ui.label(format!("{} sticker(s)", session.registry().len()));
                    }
                    SessionState::Reviewing => {
                        let pending = session.is_export_pending();
                        if ui.add_enabled(!pending, button("Export PNG")).clicked() {
                            export_events.write(ExportRequest);
                        }
                        if ui.add_enabled(!pending, button("Discard")).clicked() {
                            discard_events.write(DiscardSessionRequest);
                        }
                        if pending {
                            ui.spinner();
                        }
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Open Exports").clicked() {
                        let dir = config.export_dir();
                        if let Err(e) = std::fs::create_dir_all(&dir) {
                            warn!("Failed to create export directory {:?}: {}", dir, e);
                        } else if let Err(e) = open::that(&dir) {
                            warn!("Failed to open export directory {:?}: {}", dir, e);
                        }
                    }
                    if let Some(path) = &export_state.last_export {
                        ui.label(egui::RichText::new(path.display().to_string()).weak().small());
                    }
                });
            });
        });
    Ok(())
}

/// Central canvas: the photo, its overlays and their delete buttons. Also
/// measures the canvas rectangle for input and layout.
pub fn canvas_ui(
    mut contexts: EguiContexts,
    mut session: ResMut<EditingSession>,
    interpreter: Res<GestureInterpreter>,
    textures: Res<TextureCache>,
    mut canvas_rect: ResMut<CanvasRect>,
    mut remove_events: MessageWriter<RemoveOverlayRequest>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(photo) = session.base_image() else {
            *canvas_rect = CanvasRect::default();
            ui.centered_and_justified(|ui| {
                ui.label(
                    egui::RichText::new("Capture a photo to start decorating")
                        .size(18.0)
                        .weak(),
                );
            });
            return;
        };
        let photo_size = egui::vec2(photo.width() as f32, photo.height() as f32);

        let rect = fit_rect(ui.available_rect_before_wrap(), photo_size);
        ui.allocate_rect(rect, egui::Sense::hover());
        let layout = canvas_layout(session.layout(), rect);
        if session.layout() != layout {
            session.set_layout(layout);
        }
        let scale = display_scale(layout, rect);
        let mut blocked = Vec::new();

        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        let painter = ui.painter_at(rect);
        if let Some(texture_id) = textures.photo_id() {
            painter.image(texture_id, rect, uv, egui::Color32::WHITE);
        } else {
            painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(60, 60, 60));
        }

        let live = interpreter.live_transform();
        let shown: Vec<(OverlayInstance, bool)> = session
            .registry()
            .iter()
            .map(|instance| {
                let mut instance = instance.clone();
                let active = live.is_some_and(|l| l.id == instance.id);
                if let Some(live) = live.filter(|_| active) {
                    instance.position = live.position;
                    instance.scale = live.scale;
                }
                (instance, active)
            })
            .collect();

        for (instance, active) in &shown {
            let sticker_rect =
                overlay_rect(rect.min, instance.position, instance.scaled_size(), scale);
            if let Some(texture_id) = textures.sticker_id(&instance.asset.id) {
                painter.image(texture_id, sticker_rect, uv, egui::Color32::WHITE);
            } else {
                painter.rect_filled(sticker_rect, 2.0, egui::Color32::from_rgb(60, 60, 60));
            }
            if *active && session.chrome_visible() {
                painter.rect_stroke(
                    sticker_rect,
                    2.0,
                    egui::Stroke::new(1.5, egui::Color32::from_rgb(100, 150, 255)),
                    egui::StrokeKind::Outside,
                );
            }
        }

        if session.can_delete() {
            for (instance, _) in &shown {
                let sticker_rect =
                    overlay_rect(rect.min, instance.position, instance.scaled_size(), scale);
                let button_rect = egui::Rect::from_center_size(
                    sticker_rect.right_top(),
                    egui::Vec2::splat(DELETE_BUTTON_SIZE),
                );
                blocked.push(Rect::from_corners(
                    Vec2::new(button_rect.min.x, button_rect.min.y),
                    Vec2::new(button_rect.max.x, button_rect.max.y),
                ));
                let response = ui
                    .put(
                        button_rect,
                        egui::Button::new(egui::RichText::new("×").strong())
                            .corner_radius(DELETE_BUTTON_SIZE / 2.0),
                    )
                    .on_hover_text("Remove sticker");
                if response.clicked() {
                    remove_events.write(RemoveOverlayRequest { id: instance.id });
                }
            }
        }

        *canvas_rect = CanvasRect {
            origin: Vec2::new(rect.min.x, rect.min.y),
            display_scale: scale,
            layout,
            blocked,
        };
    });

    Ok(())
}
