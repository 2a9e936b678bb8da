//! Ordered store of placed overlays for one base image.
//!
//! Insertion order is z-order: the last instance is drawn on top. Every
//! mutation bumps [`OverlayRegistry::revision`] and queues a [`RegistryEvent`]
//! so renderers can re-query instead of holding live references.

use std::sync::Arc;

use bevy::prelude::*;

use super::overlay::{clamp_scale, CanvasLayout, OverlayAsset, OverlayId, OverlayInstance};
use crate::constants::DEFAULT_OVERLAY_SCALE;

/// Change notification emitted by registry mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    Placed(OverlayId),
    Removed(OverlayId),
    Moved(OverlayId),
    Scaled(OverlayId),
    Cleared,
}

#[derive(Debug)]
pub struct OverlayRegistry {
    instances: Vec<OverlayInstance>,
    next_id: u64,
    revision: u64,
    pending_events: Vec<RegistryEvent>,
}

impl Default for OverlayRegistry {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            next_id: 1,
            revision: 0,
            pending_events: Vec::new(),
        }
    }
}

impl OverlayRegistry {
    /// Place a new overlay centered on the canvas, on top of everything else.
    /// Returns `None` (and changes nothing) when no asset is given.
    pub fn place(
        &mut self,
        asset: Option<Arc<OverlayAsset>>,
        layout: CanvasLayout,
    ) -> Option<OverlayId> {
        let asset = asset?;

        let id = OverlayId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        let position = layout.centered(asset.base_size);
        debug!("Placing {} ({}) at {:?}", id, asset.id, position);

        self.instances.push(OverlayInstance {
            id,
            asset,
            position,
            scale: DEFAULT_OVERLAY_SCALE,
        });
        self.notify(RegistryEvent::Placed(id));
        Some(id)
    }

    /// Delete an instance. Unknown ids are ignored.
    pub fn remove(&mut self, id: OverlayId) {
        let before = self.instances.len();
        self.instances.retain(|instance| instance.id != id);
        if self.instances.len() != before {
            self.notify(RegistryEvent::Removed(id));
        }
    }

    /// Replace the stored position. Unknown ids are ignored so a gesture that
    /// outlives its overlay cannot resurrect it.
    pub fn update_position(&mut self, id: OverlayId, position: Vec2) {
        let Some(instance) = self.get_mut(id) else {
            return;
        };
        instance.position = position;
        self.notify(RegistryEvent::Moved(id));
    }

    /// Replace the stored scale (clamped). Unknown ids are ignored.
    pub fn update_scale(&mut self, id: OverlayId, scale: f32) {
        let Some(instance) = self.get_mut(id) else {
            return;
        };
        instance.scale = clamp_scale(scale);
        self.notify(RegistryEvent::Scaled(id));
    }

    /// Move every instance from one measured canvas to another, keeping its
    /// relative place per axis and clamping it into the new bounds.
    pub fn relayout(&mut self, from: CanvasLayout, to: CanvasLayout) {
        if !from.is_measured() || !to.is_measured() || from == to {
            return;
        }
        let factor = to.size() / from.size();
        let mut moved = Vec::new();
        for instance in &mut self.instances {
            let position = to.clamp_position(instance.position * factor, instance.scaled_size());
            if position != instance.position {
                instance.position = position;
                moved.push(instance.id);
            }
        }
        for id in moved {
            self.notify(RegistryEvent::Moved(id));
        }
    }

    /// Snapshot of all instances in z-order (bottom first).
    pub fn list(&self) -> Vec<OverlayInstance> {
        self.instances.clone()
    }

    /// Borrowing view in z-order, for renderers that redraw every frame.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &OverlayInstance> {
        self.instances.iter()
    }

    pub fn get(&self, id: OverlayId) -> Option<&OverlayInstance> {
        self.instances.iter().find(|instance| instance.id == id)
    }

    fn get_mut(&mut self, id: OverlayId) -> Option<&mut OverlayInstance> {
        self.instances.iter_mut().find(|instance| instance.id == id)
    }

    /// Topmost overlay containing a canvas point.
    pub fn hit_test(&self, point: Vec2) -> Option<OverlayId> {
        self.instances
            .iter()
            .rev()
            .find(|instance| instance.contains(point))
            .map(|instance| instance.id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drop every instance. Ids keep increasing so they stay unique across resets.
    pub fn clear(&mut self) {
        if self.instances.is_empty() {
            return;
        }
        self.instances.clear();
        self.notify(RegistryEvent::Cleared);
    }

    /// Monotonic counter bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Take the queued change notifications.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn notify(&mut self, event: RegistryEvent) {
        self.revision += 1;
        self.pending_events.push(event);
    }
}
