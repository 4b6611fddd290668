//! Calibration result and its on-disk form.
//!
//! The JSON layout follows OpenCV's `FileStorage`, so `cv::FileStorage` can
//! read the file back:
//!
//! ```json
//! {
//!   "calibration_date": "2026-10-16 14:03:11.512733",
//!   "camera_resolution": [1920, 1080],
//!   "camera_matrix": { "type_id": "opencv-matrix", "rows": 3, "cols": 3, "dt": "d", "data": [...] },
//!   "distortion_coefficients": { "type_id": "opencv-matrix", "rows": 1, "cols": 5, "dt": "d", "data": [...] }
//! }
//! ```

use crate::{CalibrationSolution, ImageSize};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

const OPENCV_MATRIX_TYPE: &str = "opencv-matrix";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(thiserror::Error, Debug)]
pub enum CalibrationIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Shape or type problem in a stored calibration.
#[derive(thiserror::Error, Debug)]
#[error("invalid `{field}`: {reason}")]
pub struct InvalidCalibration {
    field: &'static str,
    reason: String,
}

/// Camera intrinsics produced by a calibration run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredCalibration", into = "StoredCalibration")]
pub struct CameraCalibration {
    /// Local time of the solve.
    pub calibration_date: String,
    pub camera_resolution: ImageSize,
    pub camera_matrix: Matrix3<f64>,
    pub distortion_coefficients: Vec<f64>,
}

impl CameraCalibration {
    /// Stamp a solver result with the current local time.
    pub fn from_solution(solution: &CalibrationSolution, camera_resolution: ImageSize) -> Self {
        Self {
            calibration_date: chrono::Local::now().format(DATE_FORMAT).to_string(),
            camera_resolution,
            camera_matrix: solution.camera_matrix,
            distortion_coefficients: solution.distortion.clone(),
        }
    }

    /// Focal lengths `(fx, fy)` in pixels.
    pub fn focal_lengths(&self) -> (f64, f64) {
        (self.camera_matrix[(0, 0)], self.camera_matrix[(1, 1)])
    }

    /// Principal point `(cx, cy)` in pixels.
    pub fn principal_point(&self) -> (f64, f64) {
        (self.camera_matrix[(0, 2)], self.camera_matrix[(1, 2)])
    }

    /// Load a calibration from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibrationIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this calibration to disk as pretty JSON, replacing any existing file.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibrationIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct OpenCvMatrix {
    type_id: String,
    rows: usize,
    cols: usize,
    dt: String,
    data: Vec<f64>,
}

impl OpenCvMatrix {
    fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        Self {
            type_id: OPENCV_MATRIX_TYPE.to_string(),
            rows,
            cols,
            dt: "d".to_string(),
            data,
        }
    }

    fn check(&self, field: &'static str) -> Result<(), InvalidCalibration> {
        if self.type_id != OPENCV_MATRIX_TYPE {
            return Err(InvalidCalibration {
                field,
                reason: format!("type_id is `{}`", self.type_id),
            });
        }
        if self.rows * self.cols != self.data.len() {
            return Err(InvalidCalibration {
                field,
                reason: format!(
                    "{}x{} matrix holds {} values",
                    self.rows,
                    self.cols,
                    self.data.len()
                ),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredCalibration {
    calibration_date: String,
    camera_resolution: [u32; 2],
    camera_matrix: OpenCvMatrix,
    distortion_coefficients: OpenCvMatrix,
}

impl From<CameraCalibration> for StoredCalibration {
    fn from(c: CameraCalibration) -> Self {
        let k = c.camera_matrix;
        let row_major = (0..3)
            .flat_map(|r| (0..3).map(move |col| k[(r, col)]))
            .collect();
        let n = c.distortion_coefficients.len();
        Self {
            calibration_date: c.calibration_date,
            camera_resolution: [c.camera_resolution.width, c.camera_resolution.height],
            camera_matrix: OpenCvMatrix::new(3, 3, row_major),
            distortion_coefficients: OpenCvMatrix::new(1, n, c.distortion_coefficients),
        }
    }
}

impl TryFrom<StoredCalibration> for CameraCalibration {
    type Error = InvalidCalibration;

    fn try_from(s: StoredCalibration) -> Result<Self, Self::Error> {
        s.camera_matrix.check("camera_matrix")?;
        if s.camera_matrix.rows != 3 || s.camera_matrix.cols != 3 {
            return Err(InvalidCalibration {
                field: "camera_matrix",
                reason: format!(
                    "expected 3x3, got {}x{}",
                    s.camera_matrix.rows, s.camera_matrix.cols
                ),
            });
        }
        s.distortion_coefficients.check("distortion_coefficients")?;
        if s.distortion_coefficients.rows != 1 && s.distortion_coefficients.cols != 1 {
            return Err(InvalidCalibration {
                field: "distortion_coefficients",
                reason: format!(
                    "expected a vector, got {}x{}",
                    s.distortion_coefficients.rows, s.distortion_coefficients.cols
                ),
            });
        }
        let [width, height] = s.camera_resolution;
        Ok(Self {
            calibration_date: s.calibration_date,
            camera_resolution: ImageSize::new(width, height),
            camera_matrix: Matrix3::from_row_slice(&s.camera_matrix.data),
            distortion_coefficients: s.distortion_coefficients.data,
        })
    }
}
