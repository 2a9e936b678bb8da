//! Flattening of a base photo and its overlays into one raster image.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

use super::error::CompositorError;
use super::overlay::{CanvasLayout, OverlayInstance};

/// Draw every overlay onto a copy of `base`, bottom first.
///
/// Overlay geometry is stored in canvas units; `layout` maps those onto the
/// base image's pixel grid. While the layout is unknown canvas units are
/// treated as image pixels.
pub fn flatten(
    base: &DynamicImage,
    overlays: &[OverlayInstance],
    layout: CanvasLayout,
) -> Result<RgbaImage, CompositorError> {
    let (width, height) = (base.width(), base.height());
    if width == 0 || height == 0 {
        return Err(CompositorError::EmptyCanvas { width, height });
    }

    let mut output = base.to_rgba8();
    let (scale_x, scale_y) = canvas_to_image_scale(width, height, layout);

    for overlay in overlays {
        let size = overlay.scaled_size();
        let target_w = (size.x * scale_x).round();
        let target_h = (size.y * scale_y).round();
        if target_w < 1.0 || target_h < 1.0 {
            continue;
        }

        let sticker = imageops::resize(
            &overlay.asset.image.to_rgba8(),
            target_w as u32,
            target_h as u32,
            FilterType::Triangle,
        );
        let x = (overlay.position.x * scale_x).round() as i64;
        let y = (overlay.position.y * scale_y).round() as i64;

        // Alpha-blends and clips anything hanging off the edges.
        imageops::overlay(&mut output, &sticker, x, y);
    }

    Ok(output)
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CompositorError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Flatten and encode. With no overlays the base image is encoded as-is.
pub fn render_png(
    base: &DynamicImage,
    overlays: &[OverlayInstance],
    layout: CanvasLayout,
) -> Result<Vec<u8>, CompositorError> {
    if base.width() == 0 || base.height() == 0 {
        return Err(CompositorError::EmptyCanvas {
            width: base.width(),
            height: base.height(),
        });
    }
    if overlays.is_empty() {
        return encode_png(base);
    }
    let flattened = flatten(base, overlays, layout)?;
    encode_png(&DynamicImage::ImageRgba8(flattened))
}

fn canvas_to_image_scale(width: u32, height: u32, layout: CanvasLayout) -> (f32, f32) {
    if !layout.is_measured() {
        return (1.0, 1.0);
    }
    (width as f32 / layout.width, height as f32 / layout.height)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bevy::prelude::Vec2;
    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;
    use crate::compositor::overlay::{OverlayAsset, OverlayId};

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    fn instance(id: u64, color: [u8; 4], position: Vec2, scale: f32) -> OverlayInstance {
        OverlayInstance {
            id: OverlayId(id),
            asset: Arc::new(OverlayAsset::new(
                format!("asset-{id}"),
                solid(10, 10, color),
                Vec2::splat(20.0),
            )),
            position,
            scale,
        }
    }

    #[test]
    fn test_flatten_keeps_image_size() {
        let base = solid(120, 80, [255, 255, 255, 255]);
        let overlays = vec![instance(1, [255, 0, 0, 255], Vec2::new(10.0, 10.0), 1.0)];
        let result = flatten(&base, &overlays, CanvasLayout::UNMEASURED).unwrap();
        assert_eq!(result.dimensions(), (120, 80));
    }

    #[test]
    fn test_flatten_places_scaled_overlay() {
        let base = solid(100, 100, [255, 255, 255, 255]);
        let overlays = vec![instance(1, [255, 0, 0, 255], Vec2::new(10.0, 20.0), 2.0)];
        let result = flatten(&base, &overlays, CanvasLayout::new(100.0, 100.0)).unwrap();

        // 20 * 2.0 = 40 pixel square starting at (10, 20)
        assert_eq!(result.get_pixel(10, 20).0, [255, 0, 0, 255]);
        assert_eq!(result.get_pixel(49, 59).0, [255, 0, 0, 255]);
        assert_eq!(result.get_pixel(50, 60).0, [255, 255, 255, 255]);
        assert_eq!(result.get_pixel(9, 20).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_flatten_maps_canvas_units_to_pixels() {
        let base = solid(200, 200, [0, 0, 0, 255]);
        let overlays = vec![instance(1, [0, 255, 0, 255], Vec2::new(50.0, 50.0), 1.0)];
        // Canvas shown at half size: every canvas unit covers two pixels
        let result = flatten(&base, &overlays, CanvasLayout::new(100.0, 100.0)).unwrap();

        assert_eq!(result.get_pixel(100, 100).0, [0, 255, 0, 255]);
        assert_eq!(result.get_pixel(139, 139).0, [0, 255, 0, 255]);
        assert_eq!(result.get_pixel(140, 140).0, [0, 0, 0, 255]);
        assert_eq!(result.get_pixel(99, 99).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_flatten_later_overlays_draw_on_top() {
        let base = solid(100, 100, [255, 255, 255, 255]);
        let overlays = vec![
            instance(1, [0, 0, 255, 255], Vec2::new(10.0, 10.0), 1.0),
            instance(2, [255, 0, 0, 255], Vec2::new(20.0, 20.0), 1.0),
        ];
        let result = flatten(&base, &overlays, CanvasLayout::new(100.0, 100.0)).unwrap();

        assert_eq!(result.get_pixel(25, 25).0, [255, 0, 0, 255]);
        assert_eq!(result.get_pixel(12, 12).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_flatten_clips_at_edges() {
        let base = solid(50, 50, [255, 255, 255, 255]);
        let overlays = vec![instance(1, [255, 0, 0, 255], Vec2::new(40.0, -5.0), 1.0)];
        let result = flatten(&base, &overlays, CanvasLayout::new(50.0, 50.0)).unwrap();

        assert_eq!(result.dimensions(), (50, 50));
        assert_eq!(result.get_pixel(49, 0).0, [255, 0, 0, 255]);
        assert_eq!(result.get_pixel(45, 14).0, [255, 0, 0, 255]);
        assert_eq!(result.get_pixel(45, 15).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_flatten_empty_base_fails() {
        let base = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        let err = flatten(&base, &[], CanvasLayout::UNMEASURED).unwrap_err();
        assert!(matches!(
            err,
            CompositorError::EmptyCanvas {
                width: 0,
                height: 0
            }
        ));
    }

    #[test]
    fn test_render_png_without_overlays_matches_base() {
        let base = solid(16, 9, [10, 20, 30, 255]);
        let bytes = render_png(&base, &[], CanvasLayout::new(32.0, 18.0)).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, base.to_rgba8());
        assert_eq!(bytes, encode_png(&base).unwrap());
    }
}
