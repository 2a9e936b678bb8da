//! Base photo acquisition.
//!
//! A [`PhotoSource`] produces the base image for a new editing session. The
//! desktop build picks an image file through an async dialog and decodes it
//! off the main thread with [`FilePhotoSource`].

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;
use image::DynamicImage;
use std::path::PathBuf;

use crate::compositor::{CompositorNotice, EditingSession, SessionState};
use crate::config::{AppConfig, UpdateLastPhotoDirRequest};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture was cancelled")]
    Cancelled,
    #[error("could not read photo: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode photo: {0}")]
    Decode(#[from] image::ImageError),
    #[error("photo has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Anything that can hand over a base photo.
pub trait PhotoSource {
    fn capture(&mut self) -> Result<DynamicImage, CaptureError>;
}

/// Decodes a photo from an image file on disk.
#[derive(Debug, Clone)]
pub struct FilePhotoSource {
    pub path: PathBuf,
}

impl FilePhotoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PhotoSource for FilePhotoSource {
    fn capture(&mut self) -> Result<DynamicImage, CaptureError> {
        let bytes = std::fs::read(&self.path)?;
        let image = image::load_from_memory(&bytes)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(CaptureError::Empty {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(image)
    }
}

/// Message to start picking a new base photo
#[derive(Message)]
pub struct CaptureRequest;

/// Tracks the in-flight capture so the UI can disable the button
#[derive(Resource, Default)]
pub struct CaptureState {
    pub is_capturing: bool,
}

pub struct CaptureResult {
    pub path: Option<PathBuf>,
    pub image: Result<DynamicImage, CaptureError>,
}

#[derive(Component)]
pub struct CapturePhotoTask(pub Task<CaptureResult>);

pub struct CapturePlugin;

impl Plugin for CapturePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CaptureState>()
            .add_message::<CaptureRequest>()
            .add_systems(
                Update,
                (
                    start_capture_system.run_if(on_message::<CaptureRequest>),
                    poll_capture_tasks,
                )
                    .chain(),
            );
    }
}

fn start_capture_system(
    mut commands: Commands,
    mut events: MessageReader<CaptureRequest>,
    mut capture_state: ResMut<CaptureState>,
    session: Res<EditingSession>,
    config: Res<AppConfig>,
) {
    if events.read().last().is_none() {
        return;
    }
    if capture_state.is_capturing {
        warn!("Capture already in progress");
        return;
    }
    if session.state() != SessionState::Capturing {
        warn!("Ignoring capture while {:?}", session.state());
        return;
    }

    let start_dir = config.data.last_photo_dir.clone();
    capture_state.is_capturing = true;

    let task_pool = AsyncComputeTaskPool::get();
    let task = task_pool.spawn(async move {
        let mut dialog = rfd::AsyncFileDialog::new()
            .set_title("Choose a photo")
            .add_filter(
                "Images",
                &["png", "jpg", "jpeg", "webp", "gif", "bmp", "tiff", "tif"],
            );
        if let Some(dir) = start_dir.filter(|d| d.is_dir()) {
            dialog = dialog.set_directory(dir);
        }

        let Some(handle) = dialog.pick_file().await else {
            return CaptureResult {
                path: None,
                image: Err(CaptureError::Cancelled),
            };
        };
        let path = handle.path().to_path_buf();
        let image = FilePhotoSource::new(path.clone()).capture();
        CaptureResult {
            path: Some(path),
            image,
        }
    });

    commands.spawn(CapturePhotoTask(task));
}

fn poll_capture_tasks(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut CapturePhotoTask)>,
    mut capture_state: ResMut<CaptureState>,
    mut session: ResMut<EditingSession>,
    mut notice: ResMut<CompositorNotice>,
    mut config_events: MessageWriter<UpdateLastPhotoDirRequest>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut task.0)) else {
            continue;
        };
        capture_state.is_capturing = false;
        commands.entity(entity).despawn();

        if let Some(dir) = result.path.as_ref().and_then(|p| p.parent()) {
            config_events.write(UpdateLastPhotoDirRequest {
                path: dir.to_path_buf(),
            });
        }

        apply_capture_result(&mut session, &mut notice, result.image);
    }
}

/// Hand a finished capture to the session. Failures leave the session where
/// it was and show a notice; a cancelled picker is silent.
pub fn apply_capture_result(
    session: &mut EditingSession,
    notice: &mut CompositorNotice,
    image: Result<DynamicImage, CaptureError>,
) {
    match image {
        Ok(image) => {
            if let Err(e) = session.capture_complete(image) {
                warn!("Dropping captured photo: {}", e);
                notice.show(e.to_string());
            }
        }
        Err(CaptureError::Cancelled) => info!("Photo capture cancelled"),
        Err(e) => {
            error!("Photo capture failed: {}", e);
            notice.show(format!("Could not use that photo: {}", e));
        }
    }
}
