//! Calibration solver seam.

use crate::{CalibError, CharucoBoard, CorrespondenceSet};
use nalgebra::{Matrix3, Vector3};

/// Board pose in one calibration view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardPose {
    /// Rotation as an axis-angle vector.
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
}

/// Output of a successful calibration solve.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationSolution {
    pub camera_matrix: Matrix3<f64>,
    pub distortion: Vec<f64>,
    /// Overall RMS reprojection error in pixels.
    pub rms_error: f64,
    /// One pose per view, in view order.
    pub poses: Vec<BoardPose>,
}

impl CalibrationSolution {
    /// Reject numerically meaningless output.
    pub fn validate(&self) -> Result<(), CalibError> {
        if !self.rms_error.is_finite() {
            return Err(CalibError::SolverFailed(format!(
                "non-finite reprojection error {}",
                self.rms_error
            )));
        }
        if self.camera_matrix.iter().any(|v| !v.is_finite()) {
            return Err(CalibError::SolverFailed(
                "camera matrix contains non-finite values".to_string(),
            ));
        }
        if self.distortion.iter().any(|v| !v.is_finite()) {
            return Err(CalibError::SolverFailed(
                "distortion coefficients contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

/// Solves for intrinsics and distortion from every accumulated view at once.
pub trait CalibrationSolver {
    fn solve(
        &mut self,
        views: &CorrespondenceSet,
        board: &CharucoBoard,
    ) -> Result<CalibrationSolution, CalibError>;
}
