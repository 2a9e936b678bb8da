//! Overlay data model: immutable sticker assets, placed instances and the
//! measured canvas they live on.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bevy::prelude::*;
use image::DynamicImage;

use crate::constants::{MAX_OVERLAY_SCALE, MIN_OVERLAY_SCALE};

/// Stable identifier of a sticker asset (its file name inside the library).
pub type AssetId = String;

/// Identifier of one placed overlay, unique for the lifetime of an editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

/// A sticker image available for placement. Loaded once, never mutated.
#[derive(Debug)]
pub struct OverlayAsset {
    pub id: AssetId,
    pub name: String,
    pub source: PathBuf,
    pub image: Arc<DynamicImage>,
    /// Size of the overlay on the canvas at scale 1.0
    pub base_size: Vec2,
}

impl OverlayAsset {
    pub fn new(id: impl Into<AssetId>, image: DynamicImage, base_size: Vec2) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            source: PathBuf::new(),
            image: Arc::new(image),
            base_size,
        }
    }

    pub fn with_source(mut self, name: impl Into<String>, source: PathBuf) -> Self {
        self.name = name.into();
        self.source = source;
        self
    }
}

/// One placement of an asset over the base image.
#[derive(Debug, Clone)]
pub struct OverlayInstance {
    pub id: OverlayId,
    pub asset: Arc<OverlayAsset>,
    /// Top-left corner in canvas coordinates
    pub position: Vec2,
    pub scale: f32,
}

impl OverlayInstance {
    /// Rendered size on the canvas at the current scale.
    pub fn scaled_size(&self) -> Vec2 {
        self.asset.base_size * self.scale
    }

    /// Whether a canvas point falls inside the rendered rectangle.
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.position + self.scaled_size();
        point.x >= self.position.x && point.x <= max.x && point.y >= self.position.y && point.y <= max.y
    }
}

/// Measured pixel dimensions of the render surface holding the base image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasLayout {
    pub width: f32,
    pub height: f32,
}

impl CanvasLayout {
    pub const UNMEASURED: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_measured(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Top-left position that centers a box of `size` on the canvas.
    /// Falls back to the origin while the layout is unknown.
    pub fn centered(&self, size: Vec2) -> Vec2 {
        if !self.is_measured() {
            return Vec2::ZERO;
        }
        self.size() / 2.0 - size / 2.0
    }

    /// Keep a box of `size` inside the canvas. When the box is larger than the
    /// canvas on an axis it is pinned to the origin on that axis. Positions pass
    /// through untouched while the layout is unknown.
    pub fn clamp_position(&self, position: Vec2, size: Vec2) -> Vec2 {
        if !self.is_measured() {
            return position;
        }
        let max = (self.size() - size).max(Vec2::ZERO);
        position.clamp(Vec2::ZERO, max)
    }
}

/// Clamp a scale into the supported overlay range.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        return MIN_OVERLAY_SCALE;
    }
    scale.clamp(MIN_OVERLAY_SCALE, MAX_OVERLAY_SCALE)
}
