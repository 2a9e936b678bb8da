use thiserror::Error;

use super::session::SessionState;

/// Failures while producing the flattened image.
#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("cannot render onto an empty {width}x{height} canvas")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("cannot encode flattened image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("export task ended without producing an image")]
    Interrupted,
}

/// Failures of the editing session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    #[error("no base photo has been captured")]
    NoBaseImage,

    #[error("an export is still being rendered")]
    ExportInProgress,

    #[error("no export is waiting to be rendered")]
    ExportNotReady,

    #[error("export failed: {0}")]
    Export(#[from] CompositorError),
}
