use crate::calibration::CalibrationIoError;
use crate::CharucoBoardError;
use std::path::PathBuf;

/// Boxed error coming from the vision backend.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while capturing, accumulating or solving.
#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    #[error(
        "calibration was unsuccessful: no images were found in {}; add images of the board \
         or point the image directory elsewhere",
        .dir.display()
    )]
    NoImages { dir: PathBuf },

    #[error(
        "calibration was unsuccessful: no ChArUco board was detected in any of the {images} \
         images; check the board definition or take different pictures"
    )]
    NoBoardDetected { images: usize },

    #[error("calibration failed: {0}")]
    SolverFailed(String),

    #[error("corner id {id} does not exist on the board")]
    UnknownCornerId { id: u32 },

    #[error("camera {index} could not be opened")]
    CameraUnavailable { index: i32 },

    #[error(transparent)]
    Board(#[from] CharucoBoardError),

    #[error(transparent)]
    Persistence(#[from] CalibrationIoError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("vision backend: {0}")]
    Backend(#[source] BackendError),
}

impl CalibError {
    /// Wrap any backend error.
    pub fn backend(err: impl Into<BackendError>) -> Self {
        CalibError::Backend(err.into())
    }
}
