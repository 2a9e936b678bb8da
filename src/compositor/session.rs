//! Editing session state machine and export orchestration.
//!
//! ```text
//! Capturing --capture_complete--> Editing --finish--> Reviewing
//!     ^                              |                   |  ^
//!     +----------- discard ----------+-------------------+  | export
//!                                                        +--+
//! ```
//!
//! Export hides the transient UI chrome (delete buttons) before flattening
//! and restores it afterwards whatever the outcome. The app drives it across
//! frames with [`EditingSession::begin_export`],
//! [`EditingSession::frame_presented`] and [`EditingSession::finish_export`];
//! [`EditingSession::export`] does the same synchronously.

use std::sync::Arc;

use bevy::prelude::*;
use image::DynamicImage;

use super::error::{CompositorError, SessionError};
use super::flatten::render_png;
use super::overlay::{CanvasLayout, OverlayAsset, OverlayId, OverlayInstance};
use super::registry::OverlayRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for a base photo
    #[default]
    Capturing,
    /// Overlays may be placed, moved, scaled and removed
    Editing,
    /// Overlays are frozen; export is available
    Reviewing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPhase {
    #[default]
    Idle,
    /// Chrome hidden, waiting for a frame without it to be drawn
    AwaitingFrame,
    /// Snapshot handed out for rendering
    Flattening,
}

/// Everything needed to render one export, detached from the session so it
/// can be flattened off the main thread.
#[derive(Debug, Clone)]
pub struct ExportSnapshot {
    pub base: Arc<DynamicImage>,
    pub overlays: Vec<OverlayInstance>,
    pub layout: CanvasLayout,
}

impl ExportSnapshot {
    pub fn render(&self) -> Result<Vec<u8>, CompositorError> {
        render_png(&self.base, &self.overlays, self.layout)
    }
}

/// Hides chrome for its lifetime.
struct ChromeGuard<'a> {
    hidden: &'a mut bool,
}

impl<'a> ChromeGuard<'a> {
    fn hide(hidden: &'a mut bool) -> Self {
        *hidden = true;
        Self { hidden }
    }
}

impl Drop for ChromeGuard<'_> {
    fn drop(&mut self) {
        *self.hidden = false;
    }
}

#[derive(Resource, Debug, Default)]
pub struct EditingSession {
    state: SessionState,
    base: Option<Arc<DynamicImage>>,
    registry: OverlayRegistry,
    layout: CanvasLayout,
    chrome_hidden: bool,
    export: ExportPhase,
}

impl EditingSession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state == SessionState::Editing
    }

    pub fn base_image(&self) -> Option<&Arc<DynamicImage>> {
        self.base.as_ref()
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    /// Mutable registry access for gesture commits and event draining.
    pub fn registry_mut(&mut self) -> &mut OverlayRegistry {
        &mut self.registry
    }

    pub fn layout(&self) -> CanvasLayout {
        self.layout
    }

    /// Record the measured canvas. The first measurement may arrive after
    /// overlays were placed; those keep their fallback positions. Replacing a
    /// measured layout carries every overlay over to the new bounds.
    pub fn set_layout(&mut self, layout: CanvasLayout) {
        if self.layout == layout {
            return;
        }
        debug!("Canvas layout {}x{}", layout.width, layout.height);
        self.registry.relayout(self.layout, layout);
        self.layout = layout;
    }

    /// Whether delete affordances and other transient UI should be drawn.
    pub fn chrome_visible(&self) -> bool {
        !self.chrome_hidden
    }

    /// Delete buttons are only offered while editing with chrome shown.
    pub fn can_delete(&self) -> bool {
        self.is_editing() && self.chrome_visible()
    }

    pub fn export_phase(&self) -> ExportPhase {
        self.export
    }

    pub fn is_export_pending(&self) -> bool {
        self.export != ExportPhase::Idle
    }

    /// Capturing -> Editing with a fresh base photo.
    pub fn capture_complete(&mut self, image: DynamicImage) -> Result<(), SessionError> {
        if self.state != SessionState::Capturing {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "accept a captured photo",
            });
        }
        info!("Captured {}x{} photo", image.width(), image.height());
        self.base = Some(Arc::new(image));
        self.registry.clear();
        self.state = SessionState::Editing;
        Ok(())
    }

    /// Place an overlay centered on the canvas. Ignored outside Editing or
    /// without an asset.
    pub fn place_overlay(&mut self, asset: Option<Arc<OverlayAsset>>) -> Option<OverlayId> {
        if !self.is_editing() {
            debug!("Ignoring placement while {:?}", self.state);
            return None;
        }
        self.registry.place(asset, self.layout)
    }

    pub fn remove_overlay(&mut self, id: OverlayId) -> Result<(), SessionError> {
        if !self.is_editing() {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "remove an overlay",
            });
        }
        self.registry.remove(id);
        Ok(())
    }

    /// Editing -> Reviewing.
    pub fn finish(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Editing {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "finish editing",
            });
        }
        self.state = SessionState::Reviewing;
        Ok(())
    }

    /// Editing/Reviewing -> Capturing, dropping the photo and every overlay.
    /// Refused while an export is being rendered.
    pub fn discard(&mut self) -> Result<(), SessionError> {
        if self.is_export_pending() {
            return Err(SessionError::ExportInProgress);
        }
        if self.state == SessionState::Capturing {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "discard",
            });
        }
        info!("Discarding session with {} overlay(s)", self.registry.len());
        self.registry.clear();
        self.base = None;
        self.layout = CanvasLayout::UNMEASURED;
        self.state = SessionState::Capturing;
        Ok(())
    }

    fn check_exportable(&self) -> Result<&Arc<DynamicImage>, SessionError> {
        if self.state == SessionState::Capturing {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "export",
            });
        }
        if self.is_export_pending() {
            return Err(SessionError::ExportInProgress);
        }
        self.base.as_ref().ok_or(SessionError::NoBaseImage)
    }

    /// Hide chrome and wait for the next presented frame before flattening.
    pub fn begin_export(&mut self) -> Result<(), SessionError> {
        self.check_exportable()?;
        self.chrome_hidden = true;
        self.export = ExportPhase::AwaitingFrame;
        debug!("Export requested, chrome hidden");
        Ok(())
    }

    /// Call once per presented frame. Hands out the render snapshot the first
    /// time a chrome-less frame has been drawn.
    pub fn frame_presented(&mut self) -> Option<ExportSnapshot> {
        if self.export != ExportPhase::AwaitingFrame {
            return None;
        }
        let Some(base) = self.base.clone() else {
            self.chrome_hidden = false;
            self.export = ExportPhase::Idle;
            return None;
        };
        self.export = ExportPhase::Flattening;
        Some(ExportSnapshot {
            base,
            overlays: self.registry.list(),
            layout: self.layout,
        })
    }

    /// Settle an export started with [`Self::begin_export`]. Chrome is
    /// restored and the session state is untouched whatever the outcome.
    pub fn finish_export(
        &mut self,
        result: Result<Vec<u8>, CompositorError>,
    ) -> Result<Vec<u8>, SessionError> {
        let phase = std::mem::take(&mut self.export);
        self.chrome_hidden = false;
        if phase == ExportPhase::Idle {
            return Err(SessionError::ExportNotReady);
        }
        Ok(result?)
    }

    /// Synchronous export. `wait_for_frame` runs while chrome is hidden so the
    /// host can present a chrome-less frame first.
    pub fn export(&mut self, wait_for_frame: impl FnOnce()) -> Result<Vec<u8>, SessionError> {
        self.check_exportable()?;
        let base = self.base.clone().ok_or(SessionError::NoBaseImage)?;

        let _chrome = ChromeGuard::hide(&mut self.chrome_hidden);
        wait_for_frame();
        let overlays = self.registry.list();
        Ok(render_png(&base, &overlays, self.layout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn photo() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 30, Rgba([200, 200, 200, 255])))
    }

    fn sticker() -> Arc<OverlayAsset> {
        Arc::new(OverlayAsset::new(
            "heart",
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]))),
            Vec2::splat(8.0),
        ))
    }

    fn editing() -> EditingSession {
        let mut session = EditingSession::default();
        session.capture_complete(photo()).unwrap();
        session.set_layout(CanvasLayout::new(30.0, 30.0));
        session
    }

    #[test]
    fn test_session_starts_capturing() {
        let session = EditingSession::default();
        assert_eq!(session.state(), SessionState::Capturing);
        assert!(session.base_image().is_none());
        assert!(session.chrome_visible());
    }

    #[test]
    fn test_capture_complete_enters_editing() {
        let session = editing();
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.base_image().is_some());
        assert!(session.can_delete());
    }

    #[test]
    fn test_capture_complete_rejected_outside_capturing() {
        let mut session = editing();
        let err = session.capture_complete(photo()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                state: SessionState::Editing,
                ..
            }
        ));
    }

    #[test]
    fn test_placement_only_while_editing() {
        let mut session = EditingSession::default();
        assert!(session.place_overlay(Some(sticker())).is_none());

        let mut session = editing();
        assert!(session.place_overlay(Some(sticker())).is_some());
        session.finish().unwrap();
        assert!(session.place_overlay(Some(sticker())).is_none());
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn test_remove_only_while_editing() {
        let mut session = editing();
        let id = session.place_overlay(Some(sticker())).unwrap();
        session.finish().unwrap();
        assert!(session.remove_overlay(id).is_err());
        assert_eq!(session.registry().len(), 1);
        assert!(!session.can_delete());
    }

    #[test]
    fn test_finish_and_discard_transitions() {
        let mut session = editing();
        session.place_overlay(Some(sticker()));
        session.finish().unwrap();
        assert_eq!(session.state(), SessionState::Reviewing);
        assert!(session.finish().is_err());

        session.discard().unwrap();
        assert_eq!(session.state(), SessionState::Capturing);
        assert!(session.registry().is_empty());
        assert!(session.base_image().is_none());
        assert!(!session.layout().is_measured());
        assert!(session.discard().is_err());
    }

    #[test]
    fn test_export_not_allowed_while_capturing() {
        let mut session = EditingSession::default();
        assert!(session.begin_export().is_err());
        assert!(session.export(|| {}).is_err());
        assert!(session.chrome_visible());
    }

    #[test]
    fn test_frame_driven_export_hides_and_restores_chrome() {
        let mut session = editing();
        session.place_overlay(Some(sticker()));
        session.finish().unwrap();

        session.begin_export().unwrap();
        assert!(!session.chrome_visible());
        assert_eq!(session.export_phase(), ExportPhase::AwaitingFrame);

        let snapshot = session.frame_presented().unwrap();
        assert_eq!(session.export_phase(), ExportPhase::Flattening);
        assert!(session.frame_presented().is_none());
        assert!(!session.chrome_visible());

        let bytes = session.finish_export(snapshot.render()).unwrap();
        assert!(!bytes.is_empty());
        assert!(session.chrome_visible());
        assert_eq!(session.state(), SessionState::Reviewing);
        assert!(!session.is_export_pending());
    }

    #[test]
    fn test_failed_export_restores_chrome_and_keeps_state() {
        let mut session = editing();
        session.finish().unwrap();
        session.begin_export().unwrap();
        session.frame_presented().unwrap();

        let err = session
            .finish_export(Err(CompositorError::Interrupted))
            .unwrap_err();
        assert!(matches!(err, SessionError::Export(_)));
        assert!(session.chrome_visible());
        assert_eq!(session.state(), SessionState::Reviewing);
        assert!(!session.is_export_pending());
    }

    #[test]
    fn test_discard_refused_during_export() {
        let mut session = editing();
        session.finish().unwrap();
        session.begin_export().unwrap();
        assert!(matches!(
            session.discard(),
            Err(SessionError::ExportInProgress)
        ));
        assert!(matches!(
            session.begin_export(),
            Err(SessionError::ExportInProgress)
        ));

        let snapshot = session.frame_presented().unwrap();
        session.finish_export(snapshot.render()).unwrap();
        session.discard().unwrap();
        assert_eq!(session.state(), SessionState::Capturing);
    }

    #[test]
    fn test_finish_export_without_begin_is_rejected() {
        let mut session = editing();
        assert!(matches!(
            session.finish_export(Ok(Vec::new())),
            Err(SessionError::ExportNotReady)
        ));
        assert!(session.chrome_visible());
    }

    #[test]
    fn test_sync_export_hides_chrome_only_during_render() {
        let mut session = editing();
        session.place_overlay(Some(sticker()));
        session.finish().unwrap();

        let mut waited = false;
        let bytes = session.export(|| waited = true).unwrap();
        assert!(waited);
        assert!(!bytes.is_empty());
        assert!(session.chrome_visible());
    }

    #[test]
    fn test_layout_arriving_late_keeps_fallback_position() {
        let mut session = EditingSession::default();
        session.capture_complete(photo()).unwrap();
        let id = session.place_overlay(Some(sticker())).unwrap();
        session.set_layout(CanvasLayout::new(30.0, 30.0));
        assert_eq!(session.registry().get(id).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_shrinking_layout_keeps_overlay_in_export() {
        let mut session = editing();
        let id = session.place_overlay(Some(sticker())).unwrap();
        session
            .registry_mut()
            .update_position(id, Vec2::new(22.0, 22.0));

        session.set_layout(CanvasLayout::new(15.0, 15.0));
        assert_eq!(session.registry().get(id).unwrap().position, Vec2::new(7.0, 7.0));

        let bytes = session.export(|| {}).unwrap();
        let flattened = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(flattened.get_pixel(29, 29).0, [255, 0, 0, 255]);
        assert_eq!(flattened.get_pixel(5, 5).0, [200, 200, 200, 255]);
    }
}
