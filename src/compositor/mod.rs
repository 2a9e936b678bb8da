//! Sticker compositor: overlay registry, gesture interpretation, session
//! state machine and flattening.

mod error;
pub mod flatten;
pub mod gesture;
pub mod overlay;
pub mod registry;
pub mod session;
mod systems;


pub use error::{CompositorError, SessionError};
pub use flatten::{encode_png, flatten, render_png};
pub use gesture::{GestureInterpreter, GesturePhase, LiveTransform};
pub use overlay::{clamp_scale, AssetId, CanvasLayout, OverlayAsset, OverlayId, OverlayInstance};
pub use registry::{OverlayRegistry, RegistryEvent};
pub use session::{EditingSession, ExportPhase, ExportSnapshot, SessionState};

use bevy::prelude::*;

/// Message to place the sticker with the given asset id
#[derive(Message)]
pub struct PlaceOverlayRequest {
    pub asset_id: AssetId,
}

/// Message to delete a placed overlay
#[derive(Message)]
pub struct RemoveOverlayRequest {
    pub id: OverlayId,
}

/// Message to move from Editing to Reviewing
#[derive(Message)]
pub struct FinishEditingRequest;

/// Message to throw away the photo and all overlays
#[derive(Message)]
pub struct DiscardSessionRequest;

/// Forwarded registry change notification
#[derive(Message, Debug, Clone, Copy)]
pub struct OverlayRegistryChanged {
    pub event: RegistryEvent,
}

/// User-visible notice for failed operations (capture, export, transitions)
#[derive(Resource, Default)]
pub struct CompositorNotice {
    pub message: Option<String>,
}

impl CompositorNotice {
    pub fn show(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }
}

pub struct CompositorPlugin;

impl Plugin for CompositorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EditingSession>()
            .init_resource::<GestureInterpreter>()
            .init_resource::<CompositorNotice>()
            .add_message::<PlaceOverlayRequest>()
            .add_message::<RemoveOverlayRequest>()
            .add_message::<FinishEditingRequest>()
            .add_message::<DiscardSessionRequest>()
            .add_message::<OverlayRegistryChanged>()
            .add_systems(
                Update,
                (
                    systems::place_overlay_system.run_if(on_message::<PlaceOverlayRequest>),
                    systems::remove_overlay_system.run_if(on_message::<RemoveOverlayRequest>),
                    systems::finish_editing_system.run_if(on_message::<FinishEditingRequest>),
                    systems::discard_session_system.run_if(on_message::<DiscardSessionRequest>),
                    systems::forward_registry_events,
                    systems::react_to_registry_changes,
                )
                    .chain(),
            );
    }
}
