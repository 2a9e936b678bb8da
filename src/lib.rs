//! Camera sticker editor.
//!
//! Take a base photo, decorate it with sticker overlays that can be dragged
//! and pinch-scaled, then flatten everything into a single PNG. The
//! [`compositor`] module holds the editing core; the remaining modules wire it
//! into a bevy + egui application.

pub mod capture;
pub mod compositor;
pub mod config;
pub mod constants;
pub mod export;
pub mod input;
pub mod paths;
pub mod stickers;
pub mod ui;
