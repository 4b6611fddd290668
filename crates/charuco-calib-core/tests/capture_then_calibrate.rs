use charuco_calib_core::{
    BatchCalibration, BoardDetection, BoardDetector, BoardPose, CalibError, CalibrationSolution,
    CalibrationSolver, CameraCalibration, CaptureEvent, CaptureFrontend, CaptureSession,
    CharucoBoard, CharucoBoardSpec, CharucoCorner, CorrespondenceSet, FrameSource, FrameStore,
    ImageLoader, ImageSize, NoReview, SnapshotNamer,
};
use nalgebra::{Matrix3, Point2, Vector3};
use std::cell::Cell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// A frame is the number of corners it shows.
struct FakeCamera {
    frames: VecDeque<u32>,
    released: Rc<Cell<bool>>,
}

impl FrameSource for FakeCamera {
    type Frame = u32;

    fn read_frame(&mut self) -> Result<Option<u32>, CalibError> {
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) -> Result<(), CalibError> {
        self.released.set(true);
        Ok(())
    }
}

struct ScriptedFrontend {
    events: VecDeque<CaptureEvent>,
    closed: Rc<Cell<bool>>,
}

impl CaptureFrontend<u32> for ScriptedFrontend {
    fn show(&mut self, _: &u32, _: Option<&BoardDetection>) -> Result<(), CalibError> {
        Ok(())
    }

    fn poll_event(&mut self) -> Result<CaptureEvent, CalibError> {
        Ok(self.events.pop_front().unwrap_or(CaptureEvent::Idle))
    }

    fn close(&mut self) -> Result<(), CalibError> {
        self.closed.set(true);
        Ok(())
    }
}

/// Writes frames as `1280x720 <corners>`.
struct TextStore;

impl FrameStore<u32> for TextStore {
    fn store(&mut self, frame: &u32, path: &Path) -> Result<(), CalibError> {
        fs::write(path, format!("1280x720 {frame}"))?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct StoredImage {
    size: ImageSize,
    corners: u32,
}

/// Reads what [`TextStore`] wrote and records whether capture had already
/// let go of its devices.
struct TextLoader {
    camera_released: Rc<Cell<bool>>,
    window_closed: Rc<Cell<bool>>,
    loads: usize,
}

impl ImageLoader for TextLoader {
    type Image = StoredImage;

    fn load(&mut self, path: &Path) -> Result<Option<StoredImage>, CalibError> {
        assert!(self.camera_released.get(), "camera still open while loading");
        assert!(self.window_closed.get(), "window still open while loading");
        self.loads += 1;

        let raw = fs::read_to_string(path)?;
        let Some((size, corners)) = raw.split_once(' ') else {
            return Ok(None);
        };
        let Some((w, h)) = size.split_once('x') else {
            return Ok(None);
        };
        match (w.parse::<u32>(), h.parse::<u32>(), corners.parse::<u32>()) {
            (Ok(w), Ok(h), Ok(corners)) => Ok(Some(StoredImage {
                size: ImageSize::new(w, h),
                corners,
            })),
            _ => Ok(None),
        }
    }
}

fn detection(size: ImageSize, corners: u32) -> BoardDetection {
    let mut detection = BoardDetection::empty(size);
    detection.corners = (0..corners)
        .map(|id| CharucoCorner {
            id,
            position: Point2::new(id as f32, 2.0 * id as f32),
        })
        .collect();
    detection
}

/// One detector serves both the live preview and the stored images.
#[derive(Default)]
struct CountingDetector {
    preview: usize,
    stored: usize,
}

impl BoardDetector<u32> for CountingDetector {
    fn detect(&mut self, frame: &u32) -> Result<BoardDetection, CalibError> {
        self.preview += 1;
        Ok(detection(ImageSize::new(1280, 720), *frame))
    }
}

impl BoardDetector<StoredImage> for CountingDetector {
    fn detect(&mut self, image: &StoredImage) -> Result<BoardDetection, CalibError> {
        self.stored += 1;
        Ok(detection(image.size, image.corners))
    }
}

#[derive(Default)]
struct FixedSolver {
    views: usize,
}

impl CalibrationSolver for FixedSolver {
    fn solve(
        &mut self,
        views: &CorrespondenceSet,
        _board: &CharucoBoard,
    ) -> Result<CalibrationSolution, CalibError> {
        self.views = views.view_count();
        Ok(CalibrationSolution {
            camera_matrix: Matrix3::new(1000.0, 0.0, 640.0, 0.0, 1000.0, 360.0, 0.0, 0.0, 1.0),
            distortion: vec![0.0; 5],
            rms_error: 0.2,
            poses: vec![
                BoardPose {
                    rotation: Vector3::zeros(),
                    translation: Vector3::new(0.0, 0.0, 0.4),
                };
                views.view_count()
            ],
        })
    }
}

struct Rig {
    camera: FakeCamera,
    frontend: ScriptedFrontend,
    loader: TextLoader,
}

fn rig(frames: &[u32], events: &[CaptureEvent]) -> Rig {
    let released = Rc::new(Cell::new(false));
    let closed = Rc::new(Cell::new(false));
    Rig {
        camera: FakeCamera {
            frames: frames.iter().copied().collect(),
            released: Rc::clone(&released),
        },
        frontend: ScriptedFrontend {
            events: events.iter().copied().collect(),
            closed: Rc::clone(&closed),
        },
        loader: TextLoader {
            camera_released: released,
            window_closed: closed,
            loads: 0,
        },
    }
}

#[test]
fn saved_frames_are_calibrated_after_the_camera_is_released() {
    use CaptureEvent::*;

    let tmp = tempfile::tempdir().unwrap();
    let images = tmp.path().join("calibration_pictures");
    fs::create_dir(&images).unwrap();
    let output = tmp.path().join("calibration.json");
    let board = CharucoBoard::new(CharucoBoardSpec::default()).unwrap();

    // frames 40 and 30 are saved, 12 is saved but too sparse
    let mut rig = rig(&[5, 40, 30, 12, 50], &[Idle, Save, Save, Save, Quit]);
    let mut detector = CountingDetector::default();
    let mut solver = FixedSolver::default();

    let (capture, batch) = CaptureSession::new(
        &mut rig.camera,
        &mut rig.frontend,
        &mut TextStore,
        &mut detector,
        SnapshotNamer::new(&images, "charuco_", "png"),
    )
    .run_and_calibrate(
        &BatchCalibration::new(&board, &output),
        &mut rig.loader,
        &mut solver,
        &mut NoReview,
    )
    .expect("capture and calibration");

    assert_eq!(capture.frames, 5);
    assert_eq!(capture.saved.len(), 3);
    assert_eq!(rig.loader.loads, 3);
    assert_eq!(detector.preview, 5);
    assert_eq!(detector.stored, 3);

    assert_eq!(batch.images, 3);
    assert_eq!(batch.accepted, 2);
    assert_eq!(batch.rejected, 1);
    assert_eq!(solver.views, 2);

    let stored = CameraCalibration::load_json(&output).expect("calibration written");
    assert_eq!(stored.camera_resolution, ImageSize::new(1280, 720));
}

#[test]
fn earlier_sessions_feed_the_same_solve() {
    let tmp = tempfile::tempdir().unwrap();
    let images = tmp.path().join("calibration_pictures");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("charuco_0000.png"), "1280x720 60").unwrap();
    let output = tmp.path().join("calibration.json");
    let board = CharucoBoard::new(CharucoBoardSpec::default()).unwrap();

    let mut rig = rig(&[45], &[CaptureEvent::Save, CaptureEvent::Quit]);
    let mut solver = FixedSolver::default();

    let (capture, batch) = CaptureSession::new(
        &mut rig.camera,
        &mut rig.frontend,
        &mut TextStore,
        &mut CountingDetector::default(),
        SnapshotNamer::new(&images, "charuco_", "png"),
    )
    .run_and_calibrate(
        &BatchCalibration::new(&board, &output),
        &mut rig.loader,
        &mut solver,
        &mut NoReview,
    )
    .expect("capture and calibration");

    assert_eq!(capture.saved, vec![images.join("charuco_0001.png")]);
    assert_eq!(batch.accepted, 2);
    assert_eq!(solver.views, 2);
    assert!(output.exists());
}

#[test]
fn nothing_saved_and_nothing_on_disk_fails_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("calibration.json");
    let board = CharucoBoard::new(CharucoBoardSpec::default()).unwrap();

    let mut rig = rig(&[30, 30], &[CaptureEvent::Quit]);
    let mut solver = FixedSolver::default();

    let err = CaptureSession::new(
        &mut rig.camera,
        &mut rig.frontend,
        &mut TextStore,
        &mut CountingDetector::default(),
        SnapshotNamer::new(tmp.path(), "charuco_", "png"),
    )
    .run_and_calibrate(
        &BatchCalibration::new(&board, &output),
        &mut rig.loader,
        &mut solver,
        &mut NoReview,
    )
    .unwrap_err();

    assert!(matches!(err, CalibError::NoImages { .. }));
    assert!(rig.camera.released.get());
    assert!(rig.frontend.closed.get());
    assert_eq!(solver.views, 0);
    assert!(!output.exists());
}
