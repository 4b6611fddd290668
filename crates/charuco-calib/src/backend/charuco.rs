use super::{cv_size, mat_size, OrBackend};
use crate::{
    BoardDetection, BoardDetector, BoardPose, CalibError, CalibrationSolution, CalibrationSolver,
    CharucoBoard, CharucoCorner, CorrespondenceSet, DetectedMarker, Dictionary, MarkerLayout,
};
use nalgebra::{Matrix3, Point2, Vector3};
use opencv::{
    calib3d::calibrate_camera,
    core::{
        no_array, Mat, Point2f, Point3f, Size, TermCriteria, TermCriteria_COUNT, TermCriteria_EPS,
        Vector,
    },
    imgproc::{cvt_color_def, COLOR_BGR2GRAY},
    objdetect::{
        get_predefined_dictionary, CharucoDetector, CharucoParameters, DetectorParameters,
        PredefinedDictionaryType, RefineParameters,
    },
    prelude::*,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

fn predefined(dictionary: Dictionary) -> PredefinedDictionaryType {
    use PredefinedDictionaryType as P;
    match dictionary {
        Dictionary::DICT_4X4_50 => P::DICT_4X4_50,
        Dictionary::DICT_4X4_100 => P::DICT_4X4_100,
        Dictionary::DICT_4X4_250 => P::DICT_4X4_250,
        Dictionary::DICT_4X4_1000 => P::DICT_4X4_1000,
        Dictionary::DICT_5X5_50 => P::DICT_5X5_50,
        Dictionary::DICT_5X5_100 => P::DICT_5X5_100,
        Dictionary::DICT_5X5_250 => P::DICT_5X5_250,
        Dictionary::DICT_5X5_1000 => P::DICT_5X5_1000,
        Dictionary::DICT_6X6_50 => P::DICT_6X6_50,
        Dictionary::DICT_6X6_100 => P::DICT_6X6_100,
        Dictionary::DICT_6X6_250 => P::DICT_6X6_250,
        Dictionary::DICT_6X6_1000 => P::DICT_6X6_1000,
        Dictionary::DICT_7X7_50 => P::DICT_7X7_50,
        Dictionary::DICT_7X7_100 => P::DICT_7X7_100,
        Dictionary::DICT_7X7_250 => P::DICT_7X7_250,
        Dictionary::DICT_7X7_1000 => P::DICT_7X7_1000,
        Dictionary::DICT_ARUCO_ORIGINAL => P::DICT_ARUCO_ORIGINAL,
        Dictionary::DICT_APRILTAG_16h5 => P::DICT_APRILTAG_16h5,
        Dictionary::DICT_APRILTAG_25h9 => P::DICT_APRILTAG_25h9,
        Dictionary::DICT_APRILTAG_36h10 => P::DICT_APRILTAG_36h10,
        Dictionary::DICT_APRILTAG_36h11 => P::DICT_APRILTAG_36h11,
        Dictionary::DICT_ARUCO_MIP_36h12 => P::DICT_ARUCO_MIP_36h12,
    }
}

fn to_point(p: Point2f) -> Point2<f32> {
    Point2::new(p.x, p.y)
}

/// ArUco marker detection followed by ChArUco corner interpolation.
pub struct OpenCvCharuco {
    detector: CharucoDetector,
}

impl OpenCvCharuco {
    pub fn new(board: &CharucoBoard) -> Result<Self, CalibError> {
        let spec = board.spec();
        let dictionary = get_predefined_dictionary(predefined(spec.dictionary)).or_backend()?;
        // OpenCV counts squares along x first.
        let size = Size::new(spec.cols as i32, spec.rows as i32);
        let mut cv_board = opencv::objdetect::CharucoBoard::new(
            size,
            spec.square_length,
            spec.marker_length,
            &dictionary,
            &no_array(),
        )
        .or_backend()?;
        cv_board
            .set_legacy_pattern(spec.marker_layout == MarkerLayout::OpenCvLegacy)
            .or_backend()?;

        let detector = CharucoDetector::new(
            &cv_board,
            &CharucoParameters::default().or_backend()?,
            &DetectorParameters::default().or_backend()?,
            RefineParameters::new(10., 3., true).or_backend()?,
        )
        .or_backend()?;

        log::debug!(
            "charuco detector ready: {}x{} squares, {}, {:?} layout",
            spec.cols,
            spec.rows,
            spec.dictionary,
            spec.marker_layout
        );
        Ok(Self { detector })
    }
}

impl BoardDetector<Mat> for OpenCvCharuco {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(width = image.cols(), height = image.rows()))
    )]
    fn detect(&mut self, image: &Mat) -> Result<BoardDetection, CalibError> {
        let gray;
        let input = if image.channels() == 1 {
            image
        } else {
            let mut converted = Mat::default();
            cvt_color_def(image, &mut converted, COLOR_BGR2GRAY).or_backend()?;
            gray = converted;
            &gray
        };

        let mut charuco_corners = Vector::<Point2f>::new();
        let mut charuco_ids = Vector::<i32>::new();
        let mut marker_corners = Vector::<Vector<Point2f>>::new();
        let mut marker_ids = Vector::<i32>::new();
        self.detector
            .detect_board(
                input,
                &mut charuco_corners,
                &mut charuco_ids,
                &mut marker_corners,
                &mut marker_ids,
            )
            .or_backend()?;

        let mut detection = BoardDetection::empty(mat_size(image));
        detection.markers = marker_ids
            .iter()
            .zip(marker_corners.iter())
            .filter_map(|(id, quad)| {
                let corners: Vec<Point2<f32>> = quad.iter().map(to_point).collect();
                Some(DetectedMarker {
                    id: u32::try_from(id).ok()?,
                    corners: corners.try_into().ok()?,
                })
            })
            .collect();
        detection.corners = charuco_ids
            .iter()
            .zip(charuco_corners.iter())
            .filter_map(|(id, p)| {
                Some(CharucoCorner {
                    id: u32::try_from(id).ok()?,
                    position: to_point(p),
                })
            })
            .collect();
        Ok(detection)
    }
}

/// `calibrateCamera` with a fixed termination criterion.
#[derive(Clone, Copy, Debug)]
pub struct OpenCvSolver {
    /// `CALIB_*` flags passed straight through.
    pub flags: i32,
    pub criteria: TermCriteria,
}

impl Default for OpenCvSolver {
    fn default() -> Self {
        Self {
            flags: 0,
            criteria: TermCriteria {
                typ: TermCriteria_EPS + TermCriteria_COUNT,
                max_count: 30,
                epsilon: f64::EPSILON,
            },
        }
    }
}

fn vec3(m: &Mat) -> Result<Vector3<f64>, CalibError> {
    Ok(Vector3::new(
        *m.at::<f64>(0).or_backend()?,
        *m.at::<f64>(1).or_backend()?,
        *m.at::<f64>(2).or_backend()?,
    ))
}

impl CalibrationSolver for OpenCvSolver {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(views = views.view_count()))
    )]
    fn solve(
        &mut self,
        views: &CorrespondenceSet,
        board: &CharucoBoard,
    ) -> Result<CalibrationSolution, CalibError> {
        let object_points: Vector<Vector<Point3f>> = views
            .object_points(board)?
            .iter()
            .map(|view| view.iter().map(|p| Point3f::new(p.x, p.y, p.z)).collect())
            .collect();
        let image_points: Vector<Vector<Point2f>> = views
            .corners
            .iter()
            .map(|view| view.iter().map(|p| Point2f::new(p.x, p.y)).collect())
            .collect();

        let mut camera_matrix = Mat::default();
        let mut dist_coeffs = Mat::default();
        let mut rvecs = Vector::<Mat>::new();
        let mut tvecs = Vector::<Mat>::new();
        let rms_error = calibrate_camera(
            &object_points,
            &image_points,
            cv_size(views.image_size)?,
            &mut camera_matrix,
            &mut dist_coeffs,
            &mut rvecs,
            &mut tvecs,
            self.flags,
            self.criteria,
        )
        .map_err(|err| CalibError::SolverFailed(err.to_string()))?;

        let mut k = Matrix3::zeros();
        for r in 0..3 {
            for c in 0..3 {
                k[(r, c)] = *camera_matrix.at_2d::<f64>(r as i32, c as i32).or_backend()?;
            }
        }
        let distortion = (0..dist_coeffs.rows() * dist_coeffs.cols())
            .map(|i| dist_coeffs.at::<f64>(i).copied())
            .collect::<opencv::Result<Vec<f64>>>()
            .or_backend()?;
        let poses = rvecs
            .iter()
            .zip(tvecs.iter())
            .map(|(r, t)| {
                Ok(BoardPose {
                    rotation: vec3(&r)?,
                    translation: vec3(&t)?,
                })
            })
            .collect::<Result<Vec<_>, CalibError>>()?;

        Ok(CalibrationSolution {
            camera_matrix: k,
            distortion,
            rms_error,
            poses,
        })
    }
}
