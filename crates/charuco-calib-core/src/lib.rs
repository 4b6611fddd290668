//! Backend-agnostic core of the ChArUco calibration tools.
//!
//! This crate holds everything between the vision library and the operator:
//! - the board definition and marker dictionary metadata,
//! - per-image detection results and the backend traits
//!   ([`BoardDetector`], [`ImageLoader`], [`CalibrationSolver`]),
//! - the view accumulator that gates images on the corner threshold,
//! - the batch routine and the persisted [`CameraCalibration`],
//! - the interactive capture state machine.
//!
//! It does *not* detect markers or run the solver itself; see the
//! `charuco-calib` crate for the OpenCV backend.

mod accumulator;
mod batch;
mod board;
mod calibration;
mod capture;
mod config;
mod detection;
mod dictionary;
mod error;
mod logger;
mod solver;

pub use accumulator::{
    CalibrationAccumulator, CorrespondenceSet, ResolutionPolicy, ViewVerdict,
    DEFAULT_CORNER_THRESHOLD,
};
pub use batch::{collect_image_paths, BatchCalibration, BatchReport, NoReview, ReviewHook};
pub use board::{CharucoBoard, CharucoBoardError, CharucoBoardSpec, MarkerLayout};
pub use calibration::{CalibrationIoError, CameraCalibration, InvalidCalibration};
pub use capture::{
    CaptureEvent, CaptureFrontend, CaptureReport, CaptureSession,
    CaptureState, FrameSource, FrameStore, KeyBindings, SnapshotNamer,
};
pub use config::{CalibrationConfig, CaptureConfig};
pub use detection::{
    BoardDetection, BoardDetector, CharucoCorner, DetectedMarker, ImageLoader, ImageSize,
};
pub use dictionary::{Dictionary, UnknownDictionary};
pub use error::{BackendError, CalibError};
pub use solver::{BoardPose, CalibrationSolution, CalibrationSolver};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_for_tool;
