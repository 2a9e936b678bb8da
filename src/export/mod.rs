//! Export delivery.
//!
//! Export runs across frames: the request hides chrome, the next frame hands
//! out a snapshot that is flattened on the compute pool, and the finished PNG
//! goes to an [`ExportSink`].

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use chrono::{DateTime, Local};
use futures_lite::future;
use std::path::{Path, PathBuf};

use crate::compositor::{CompositorError, CompositorNotice, EditingSession, ExportPhase};
use crate::config::AppConfig;
use crate::constants::EXPORT_FILE_PREFIX;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("could not write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("saved {path:?} but could not open it: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Destination for finished PNG bytes.
pub trait ExportSink {
    /// Store the image and return where it went.
    fn deliver(&mut self, png: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Writes timestamped PNGs into a directory.
#[derive(Debug, Clone)]
pub struct FileExportSink {
    pub dir: PathBuf,
    pub open_after: bool,
}

/// `sticker-YYYYMMDD-HHMMSS.png`, with `-N` appended for repeats within a second.
pub fn export_file_name(time: DateTime<Local>, attempt: u32) -> String {
    let stamp = time.format("%Y%m%d-%H%M%S");
    if attempt == 0 {
        format!("{}-{}.png", EXPORT_FILE_PREFIX, stamp)
    } else {
        format!("{}-{}-{}.png", EXPORT_FILE_PREFIX, stamp, attempt)
    }
}

fn unused_path(dir: &Path, time: DateTime<Local>) -> PathBuf {
    let mut attempt = 0;
    loop {
        let path = dir.join(export_file_name(time, attempt));
        if !path.exists() {
            return path;
        }
        attempt += 1;
    }
}

impl ExportSink for FileExportSink {
    fn deliver(&mut self, png: &[u8]) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = unused_path(&self.dir, Local::now());
        std::fs::write(&path, png)?;
        info!("Exported {} bytes to {:?}", png.len(), path);

        if self.open_after
            && let Err(source) = open::that(&path)
        {
            return Err(ExportError::Open { path, source });
        }
        Ok(path)
    }
}

/// Message to flatten the current session into a PNG
#[derive(Message)]
pub struct ExportRequest;

/// Where the last export landed, for display
#[derive(Resource, Default)]
pub struct ExportState {
    pub last_export: Option<PathBuf>,
}

#[derive(Component)]
pub struct ExportTask(pub Task<Result<Vec<u8>, CompositorError>>);

pub struct ExportPlugin;

impl Plugin for ExportPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ExportState>()
            .add_message::<ExportRequest>()
            .add_systems(
                Update,
                (
                    advance_export_system,
                    start_export_system.run_if(on_message::<ExportRequest>),
                    poll_export_tasks,
                )
                    .chain(),
            );
    }
}

fn start_export_system(
    mut events: MessageReader<ExportRequest>,
    mut session: ResMut<EditingSession>,
    mut notice: ResMut<CompositorNotice>,
) {
    for _ in events.read() {
        if let Err(e) = session.begin_export() {
            warn!("Cannot export: {}", e);
            notice.show(format!("Cannot export: {}", e));
        }
    }
}

/// Runs before [`start_export_system`] so a request made this frame is only
/// flattened after one chrome-less frame has been drawn.
fn advance_export_system(mut commands: Commands, mut session: ResMut<EditingSession>) {
    if session.export_phase() != ExportPhase::AwaitingFrame {
        return;
    }
    let Some(snapshot) = session.frame_presented() else {
        return;
    };
    debug!("Flattening {} overlay(s)", snapshot.overlays.len());
    let task = AsyncComputeTaskPool::get().spawn(async move { snapshot.render() });
    commands.spawn(ExportTask(task));
}

/// Settle a flatten whose task disappeared, so chrome comes back and a new
/// export can start. Returns true if an export was settled.
pub fn settle_interrupted_export(
    session: &mut EditingSession,
    notice: &mut CompositorNotice,
) -> bool {
    if session.export_phase() != ExportPhase::Flattening {
        return false;
    }
    if let Err(e) = session.finish_export(Err(CompositorError::Interrupted)) {
        error!("Export task vanished before finishing: {}", e);
    }
    notice.show("Export was interrupted");
    true
}

fn poll_export_tasks(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut ExportTask)>,
    mut session: ResMut<EditingSession>,
    mut notice: ResMut<CompositorNotice>,
    mut export_state: ResMut<ExportState>,
    config: Res<AppConfig>,
) {
    if tasks.is_empty() {
        settle_interrupted_export(&mut session, &mut notice);
        return;
    }

    for (entity, mut task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut task.0)) else {
            continue;
        };
        commands.entity(entity).despawn();

        let png = match session.finish_export(result) {
            Ok(png) => png,
            Err(e) => {
                error!("Export failed: {}", e);
                notice.show(format!("Export failed: {}", e));
                continue;
            }
        };

        let mut sink = FileExportSink {
            dir: config.export_dir(),
            open_after: config.data.open_after_export,
        };
        match sink.deliver(&png) {
            Ok(path) => {
                notice.show(format!("Saved {}", path.display()));
                export_state.last_export = Some(path);
            }
            Err(ExportError::Open { path, source }) => {
                warn!("Could not open {:?}: {}", path, source);
                notice.show(format!("Saved {} (could not open it)", path.display()));
                export_state.last_export = Some(path);
            }
            Err(e) => {
                error!("{}", e);
                notice.show(format!("Export failed: {}", e));
            }
        }
    }
}
