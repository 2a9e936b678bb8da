use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::compositor::CompositorNotice;
use crate::config::ConfigResetNotification;

/// Shows the latest capture/export/session notice until dismissed
pub fn notice_ui(mut contexts: EguiContexts, mut notice: ResMut<CompositorNotice>) -> Result {
    let Some(message) = notice.message.clone() else {
        return Ok(());
    };

    let mut dismissed = false;
    egui::Window::new("Notice")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -24.0])
        .show(contexts.ctx_mut()?, |ui| {
            ui.label(message);
            ui.add_space(4.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });

    if dismissed {
        notice.message = None;
    }
    Ok(())
}

/// Tells the user their config file could not be used
pub fn config_reset_notification_ui(
    mut contexts: EguiContexts,
    mut notification: ResMut<ConfigResetNotification>,
) -> Result {
    if !notification.show {
        return Ok(());
    }

    egui::Window::new("Settings Reset")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(contexts.ctx_mut()?, |ui| {
            ui.label("Your settings were reset to defaults.");
            if let Some(reason) = &notification.reason {
                ui.colored_label(egui::Color32::from_rgb(255, 180, 100), reason);
            }
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                notification.show = false;
                notification.reason = None;
            }
        });
    Ok(())
}
