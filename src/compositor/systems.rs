//! Bevy systems applying UI requests to the editing session.

use bevy::prelude::*;

use crate::stickers::StickerLibrary;

use super::{
    CompositorNotice, DiscardSessionRequest, EditingSession, FinishEditingRequest,
    GestureInterpreter, OverlayRegistryChanged, PlaceOverlayRequest, RegistryEvent,
    RemoveOverlayRequest,
};

pub fn place_overlay_system(
    mut events: MessageReader<PlaceOverlayRequest>,
    library: Res<StickerLibrary>,
    mut session: ResMut<EditingSession>,
) {
    for event in events.read() {
        let asset = library.get(&event.asset_id);
        if asset.is_none() {
            warn!("Sticker {} is not in the library", event.asset_id);
        }
        if let Some(id) = session.place_overlay(asset) {
            info!("Placed {} from {}", id, event.asset_id);
        }
    }
}

pub fn remove_overlay_system(
    mut events: MessageReader<RemoveOverlayRequest>,
    mut session: ResMut<EditingSession>,
) {
    for event in events.read() {
        if let Err(e) = session.remove_overlay(event.id) {
            warn!("Cannot remove {}: {}", event.id, e);
        }
    }
}

pub fn finish_editing_system(
    mut events: MessageReader<FinishEditingRequest>,
    mut session: ResMut<EditingSession>,
    mut interpreter: ResMut<GestureInterpreter>,
    mut notice: ResMut<CompositorNotice>,
) {
    for _ in events.read() {
        if interpreter.is_active() {
            interpreter.release(session.registry_mut());
        }
        match session.finish() {
            Ok(()) => info!("Editing finished with {} overlay(s)", session.registry().len()),
            Err(e) => {
                warn!("{}", e);
                notice.show(e.to_string());
            }
        }
    }
}

pub fn discard_session_system(
    mut events: MessageReader<DiscardSessionRequest>,
    mut session: ResMut<EditingSession>,
    mut interpreter: ResMut<GestureInterpreter>,
    mut notice: ResMut<CompositorNotice>,
) {
    for _ in events.read() {
        match session.discard() {
            Ok(()) => interpreter.cancel(),
            Err(e) => {
                warn!("Cannot discard session: {}", e);
                notice.show(format!("Cannot discard: {}", e));
            }
        }
    }
}

/// Turn queued registry notifications into messages for other plugins.
pub fn forward_registry_events(
    mut session: ResMut<EditingSession>,
    mut changed: MessageWriter<OverlayRegistryChanged>,
) {
    // Draining is bookkeeping, not a session change.
    let events = session.bypass_change_detection().registry_mut().drain_events();
    for event in events {
        changed.write(OverlayRegistryChanged { event });
    }
}

/// Drop a gesture whose overlay left the registry. Returns true if one was dropped.
pub fn drop_orphaned_gesture(interpreter: &mut GestureInterpreter, event: RegistryEvent) -> bool {
    let orphaned = match event {
        RegistryEvent::Removed(id) => interpreter.target() == Some(id),
        RegistryEvent::Cleared => interpreter.is_active(),
        _ => false,
    };
    if orphaned {
        interpreter.cancel();
    }
    orphaned
}

pub fn react_to_registry_changes(
    mut changes: MessageReader<OverlayRegistryChanged>,
    mut interpreter: ResMut<GestureInterpreter>,
) {
    for change in changes.read() {
        if drop_orphaned_gesture(&mut interpreter, change.event) {
            debug!("Dropped gesture after {:?}", change.event);
        }
    }
}
