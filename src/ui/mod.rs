mod camera_screen;
mod dialogs;
mod palette;
mod textures;

pub use camera_screen::fit_rect;
pub use textures::{to_bevy_image, TextureCache};

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TextureCache>()
            .add_systems(Startup, setup_camera)
            // Upload textures before egui pass
            .add_systems(Update, textures::sync_textures)
            // Panels in order: top, side, then the central canvas fills the rest
            .add_systems(
                EguiPrimaryContextPass,
                (
                    camera_screen::camera_toolbar_ui,
                    palette::sticker_palette_ui,
                    camera_screen::canvas_ui,
                    dialogs::notice_ui,
                    dialogs::config_reset_notification_ui,
                )
                    .chain(),
            );
    }
}

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}
