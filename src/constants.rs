//! Centralized constants used across the application.
//!
//! Gesture bounds and canvas defaults live here so the compositor core and the
//! UI agree on them.

/// Default window width in pixels
pub const DEFAULT_WINDOW_WIDTH: f32 = 1280.0;

/// Default window height in pixels
pub const DEFAULT_WINDOW_HEIGHT: f32 = 860.0;

/// Smallest scale a pinch gesture may commit.
pub const MIN_OVERLAY_SCALE: f32 = 0.5;

/// Largest scale a pinch gesture may commit.
pub const MAX_OVERLAY_SCALE: f32 = 3.0;

/// Scale given to a freshly placed overlay.
pub const DEFAULT_OVERLAY_SCALE: f32 = 1.0;

/// Edge length (canvas units) of an overlay at scale 1.0 unless the config overrides it.
pub const DEFAULT_OVERLAY_SIZE: f32 = 80.0;

/// Size of the delete affordance drawn on each overlay while editing.
pub const DELETE_BUTTON_SIZE: f32 = 22.0;

/// Edge length of sticker thumbnails in the palette.
pub const PALETTE_THUMBNAIL_SIZE: f32 = 56.0;

/// File name prefix for exported images.
pub const EXPORT_FILE_PREFIX: &str = "sticker";
