//! ChArUco camera calibration.
//!
//! This crate provides:
//! - re-exports of [`charuco_calib_core`], which holds the board, the view
//!   accumulator, the batch routine and the capture state machine,
//! - (feature `opencv`) the OpenCV backend: marker detection, corner
//!   interpolation, the calibration solve, camera capture and preview windows,
//! - (feature `cli`) argument parsing shared by the `charuco-capture` and
//!   `charuco-calibrate` binaries.
//!
//! ## Quickstart
//!
//! ```no_run
//! # #[cfg(feature = "opencv")]
//! # fn main() -> Result<(), charuco_calib::CalibError> {
//! use charuco_calib::backend::{OpenCvCharuco, OpenCvImageLoader, OpenCvSolver};
//! use charuco_calib::{BatchCalibration, CalibrationConfig, NoReview};
//!
//! let config = CalibrationConfig::default();
//! let board = config.build_board()?;
//! let mut charuco = OpenCvCharuco::new(&board)?;
//! let mut solver = OpenCvSolver::default();
//!
//! let report = BatchCalibration::from_config(&board, &config).run(
//!     &config.image_dir,
//!     &mut OpenCvImageLoader,
//!     &mut charuco,
//!     &mut solver,
//!     &mut NoReview,
//! )?;
//! println!("fx, fy = {:?}", report.calibration.focal_lengths());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "opencv"))]
//! # fn main() {}
//! ```

pub use charuco_calib_core as core;
pub use charuco_calib_core::*;

#[cfg(feature = "opencv")]
pub mod backend;

#[cfg(feature = "cli")]
pub mod cli;
