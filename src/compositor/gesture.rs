//! Drag and pinch-to-scale interpretation of raw touch samples.
//!
//! One interaction is bound to one overlay at a time. Each sample carries the
//! currently active touch points in canvas coordinates; the number of points
//! selects the phase:
//!
//! - one point drags the overlay, clamped inside the measured canvas
//! - two points scale it by the ratio of the current finger distance to the
//!   distance when the second finger landed
//!
//! Changes are live (visible through [`GestureInterpreter::live_transform`])
//! and only reach the [`OverlayRegistry`] on [`GestureInterpreter::release`].

use bevy::prelude::*;

use super::overlay::{clamp_scale, CanvasLayout, OverlayId, OverlayInstance};
use super::registry::OverlayRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GesturePhase {
    /// Bound to an overlay but no usable sample yet.
    #[default]
    Idle,
    Dragging {
        /// Touch point when this drag phase started
        origin: Vec2,
        /// Cumulative translation already applied during this phase
        last_delta: Vec2,
    },
    Pinching {
        /// Finger distance when the second touch appeared
        base_distance: f32,
        /// Live scale when this pinch phase started
        anchor_scale: f32,
    },
}

/// Position and scale of the overlay being manipulated, before commit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveTransform {
    pub id: OverlayId,
    pub position: Vec2,
    pub scale: f32,
}

#[derive(Debug, Clone)]
struct Interaction {
    target: OverlayId,
    base_size: Vec2,
    anchor_position: Vec2,
    anchor_scale: f32,
    position: Vec2,
    scale: f32,
    phase: GesturePhase,
}

impl Interaction {
    fn live(&self) -> LiveTransform {
        LiveTransform {
            id: self.target,
            position: self.position,
            scale: self.scale,
        }
    }

    fn drag_to(&mut self, point: Vec2, layout: CanvasLayout) {
        let (origin, last_delta) = match self.phase {
            GesturePhase::Dragging { origin, last_delta } => (origin, last_delta),
            _ => {
                // Entering drag (first sample or back from a pinch): start
                // accumulating from here so the overlay does not jump.
                self.anchor_position = self.position;
                self.phase = GesturePhase::Dragging {
                    origin: point,
                    last_delta: Vec2::ZERO,
                };
                return;
            }
        };

        let cumulative = point - origin;
        let next = self.position + (cumulative - last_delta);
        self.position = layout.clamp_position(next, self.base_size * self.scale);
        self.phase = GesturePhase::Dragging {
            origin,
            last_delta: cumulative,
        };
    }

    fn pinch(&mut self, a: Vec2, b: Vec2, layout: CanvasLayout) {
        let distance = a.distance(b);
        let GesturePhase::Pinching {
            base_distance,
            anchor_scale,
        } = self.phase
        else {
            // First two-finger sample only records the baseline.
            self.phase = GesturePhase::Pinching {
                base_distance: distance,
                anchor_scale: self.scale,
            };
            return;
        };

        if base_distance <= f32::EPSILON {
            // Fingers landed on the same spot; restart the baseline.
            self.phase = GesturePhase::Pinching {
                base_distance: distance,
                anchor_scale,
            };
            return;
        }

        self.scale = clamp_scale(anchor_scale * (distance / base_distance));
        self.position = layout.clamp_position(self.position, self.base_size * self.scale);
    }
}

/// Interaction-local gesture state. Not shared between overlays.
#[derive(Resource, Debug, Default)]
pub struct GestureInterpreter {
    active: Option<Interaction>,
}

impl GestureInterpreter {
    /// Bind a new interaction to `instance`, replacing any previous one
    /// without committing it.
    pub fn begin(&mut self, instance: &OverlayInstance) {
        self.active = Some(Interaction {
            target: instance.id,
            base_size: instance.asset.base_size,
            anchor_position: instance.position,
            anchor_scale: instance.scale,
            position: instance.position,
            scale: instance.scale,
            phase: GesturePhase::Idle,
        });
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn target(&self) -> Option<OverlayId> {
        self.active.as_ref().map(|interaction| interaction.target)
    }

    pub fn phase(&self) -> Option<GesturePhase> {
        self.active.as_ref().map(|interaction| interaction.phase)
    }

    /// Position and scale at the start of the interaction.
    pub fn anchor(&self) -> Option<(Vec2, f32)> {
        self.active
            .as_ref()
            .map(|interaction| (interaction.anchor_position, interaction.anchor_scale))
    }

    pub fn live_transform(&self) -> Option<LiveTransform> {
        self.active.as_ref().map(Interaction::live)
    }

    /// Feed one batch of active touch points (canvas coordinates).
    pub fn update(&mut self, points: &[Vec2], layout: CanvasLayout) -> Option<LiveTransform> {
        let interaction = self.active.as_mut()?;

        match points {
            [point] => interaction.drag_to(*point, layout),
            [a, b] => interaction.pinch(*a, *b, layout),
            _ => {}
        }

        Some(interaction.live())
    }

    /// End the interaction and write both the live position and scale back.
    /// Returns the committed id, which may no longer exist in the registry.
    pub fn release(&mut self, registry: &mut OverlayRegistry) -> Option<OverlayId> {
        let interaction = self.active.take()?;
        registry.update_position(interaction.target, interaction.position);
        registry.update_scale(interaction.target, interaction.scale);
        trace!(
            "Committed {} at {:?} scale {:.2}",
            interaction.target,
            interaction.position,
            interaction.scale
        );
        Some(interaction.target)
    }

    /// Drop the interaction without committing anything.
    pub fn cancel(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::overlay::OverlayAsset;
    use image::{DynamicImage, RgbaImage};
    use std::sync::Arc;

    const CANVAS: CanvasLayout = CanvasLayout {
        width: 300.0,
        height: 300.0,
    };

    fn placed(registry: &mut OverlayRegistry) -> OverlayId {
        let asset = Arc::new(OverlayAsset::new(
            "star",
            DynamicImage::ImageRgba8(RgbaImage::new(4, 4)),
            Vec2::splat(80.0),
        ));
        registry.place(Some(asset), CANVAS).unwrap()
    }

    fn begin(registry: &OverlayRegistry, id: OverlayId) -> GestureInterpreter {
        let mut interpreter = GestureInterpreter::default();
        interpreter.begin(registry.get(id).unwrap());
        interpreter
    }

    #[test]
    fn test_update_without_interaction_is_none() {
        let mut interpreter = GestureInterpreter::default();
        assert!(interpreter.update(&[Vec2::ZERO], CANVAS).is_none());
    }

    #[test]
    fn test_drag_moves_by_cumulative_delta() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(150.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(170.0, 140.0)], CANVAS);
        let live = interpreter
            .update(&[Vec2::new(200.0, 130.0)], CANVAS)
            .unwrap();
        assert_eq!(live.position, Vec2::new(160.0, 90.0));

        // Not committed until release
        assert_eq!(registry.get(id).unwrap().position, Vec2::new(110.0, 110.0));
        assert_eq!(interpreter.release(&mut registry), Some(id));
        assert_eq!(registry.get(id).unwrap().position, Vec2::new(160.0, 90.0));
        assert!(!interpreter.is_active());
    }

    #[test]
    fn test_drag_is_clamped_to_canvas() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(150.0, 150.0)], CANVAS);
        let live = interpreter
            .update(&[Vec2::new(1000.0, -1000.0)], CANVAS)
            .unwrap();
        assert_eq!(live.position, Vec2::new(220.0, 0.0));
    }

    #[test]
    fn test_drag_unmeasured_layout_passes_through() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::ZERO], CanvasLayout::UNMEASURED);
        let live = interpreter
            .update(&[Vec2::new(-500.0, 900.0)], CanvasLayout::UNMEASURED)
            .unwrap();
        assert_eq!(live.position, Vec2::new(-390.0, 1010.0));
    }

    #[test]
    fn test_first_pinch_sample_sets_baseline_only() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        let live = interpreter
            .update(&[Vec2::new(100.0, 150.0), Vec2::new(200.0, 150.0)], CANVAS)
            .unwrap();
        assert_eq!(live.scale, 1.0);
        assert_eq!(
            interpreter.phase(),
            Some(GesturePhase::Pinching {
                base_distance: 100.0,
                anchor_scale: 1.0
            })
        );
    }

    #[test]
    fn test_pinch_scales_by_distance_ratio() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(200.0, 150.0)], CANVAS);
        let live = interpreter
            .update(&[Vec2::new(90.0, 150.0), Vec2::new(210.0, 150.0)], CANVAS)
            .unwrap();
        assert!((live.scale - 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_pinch_clamps_floor_and_ceiling() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);

        let mut interpreter = begin(&registry, id);
        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(200.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(120.0, 150.0)], CANVAS);
        interpreter.release(&mut registry);
        assert_eq!(registry.get(id).unwrap().scale, 0.5);

        let mut interpreter = begin(&registry, id);
        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(110.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(0.0, 150.0), Vec2::new(300.0, 150.0)], CANVAS);
        interpreter.release(&mut registry);
        assert_eq!(registry.get(id).unwrap().scale, 3.0);
    }

    #[test]
    fn test_pinch_ignores_translation() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(200.0, 150.0)], CANVAS);
        let live = interpreter
            .update(&[Vec2::new(130.0, 180.0), Vec2::new(230.0, 180.0)], CANVAS)
            .unwrap();
        assert_eq!(live.position, Vec2::new(110.0, 110.0));
        assert_eq!(live.scale, 1.0);
    }

    #[test]
    fn test_pinch_growth_keeps_box_inside_canvas() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(200.0, 150.0)], CANVAS);
        let live = interpreter
            .update(&[Vec2::new(0.0, 150.0), Vec2::new(300.0, 150.0)], CANVAS)
            .unwrap();
        // 80 * 3 = 240, so the top-left may be at most 60
        assert_eq!(live.scale, 3.0);
        assert_eq!(live.position, Vec2::new(60.0, 60.0));
    }

    #[test]
    fn test_pinch_to_drag_reanchors_without_jump() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(140.0, 140.0)], CANVAS);
        interpreter.update(&[Vec2::new(150.0, 140.0)], CANVAS);
        interpreter.update(&[Vec2::new(150.0, 140.0), Vec2::new(250.0, 140.0)], CANVAS);
        interpreter.update(&[Vec2::new(150.0, 140.0), Vec2::new(200.0, 140.0)], CANVAS);

        // Remaining finger is far from where the drag originally started
        let live = interpreter
            .update(&[Vec2::new(60.0, 60.0)], CANVAS)
            .unwrap();
        assert_eq!(live.position, Vec2::new(120.0, 110.0));
        assert_eq!(live.scale, 0.5);
        assert_eq!(interpreter.anchor().unwrap().0, Vec2::new(120.0, 110.0));

        let live = interpreter
            .update(&[Vec2::new(70.0, 50.0)], CANVAS)
            .unwrap();
        assert_eq!(live.position, Vec2::new(130.0, 100.0));
    }

    #[test]
    fn test_second_pinch_restarts_baseline() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(200.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(300.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(100.0, 150.0)], CANVAS);

        let live = interpreter
            .update(&[Vec2::new(100.0, 150.0), Vec2::new(110.0, 150.0)], CANVAS)
            .unwrap();
        assert_eq!(live.scale, 2.0);
        let live = interpreter
            .update(&[Vec2::new(100.0, 150.0), Vec2::new(115.0, 150.0)], CANVAS)
            .unwrap();
        assert_eq!(live.scale, 3.0);
    }

    #[test]
    fn test_release_commits_scale_after_drag() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(200.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(100.0, 150.0), Vec2::new(250.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(100.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(90.0, 150.0)], CANVAS);
        interpreter.release(&mut registry);

        let instance = registry.get(id).unwrap();
        assert_eq!(instance.scale, 1.5);
        assert_eq!(instance.position, Vec2::new(100.0, 110.0));
    }

    #[test]
    fn test_release_after_remove_does_not_resurrect() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(150.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(180.0, 150.0)], CANVAS);
        registry.remove(id);

        assert_eq!(interpreter.release(&mut registry), Some(id));
        assert!(registry.get(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_discards_live_changes() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        interpreter.update(&[Vec2::new(150.0, 150.0)], CANVAS);
        interpreter.update(&[Vec2::new(190.0, 150.0)], CANVAS);
        interpreter.cancel();

        assert!(interpreter.release(&mut registry).is_none());
        assert_eq!(registry.get(id).unwrap().position, Vec2::new(110.0, 110.0));
    }

    #[test]
    fn test_three_touches_are_ignored() {
        let mut registry = OverlayRegistry::default();
        let id = placed(&mut registry);
        let mut interpreter = begin(&registry, id);

        let live = interpreter
            .update(&[Vec2::ZERO, Vec2::ONE, Vec2::new(2.0, 2.0)], CANVAS)
            .unwrap();
        assert_eq!(live.position, Vec2::new(110.0, 110.0));
        assert_eq!(interpreter.phase(), Some(GesturePhase::Idle));
    }
}
