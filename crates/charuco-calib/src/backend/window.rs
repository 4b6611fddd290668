use super::{cv_size, mat_size, OrBackend};
use crate::{BoardDetection, CalibError, CaptureEvent, CaptureFrontend, KeyBindings, ReviewHook};
use opencv::{
    core::{Mat, Point2f, Scalar, Vector},
    highgui::{
        destroy_window, get_window_property, imshow, named_window, wait_key, WINDOW_AUTOSIZE,
        WND_PROP_VISIBLE,
    },
    imgproc::{cvt_color_def, resize, COLOR_GRAY2BGR, INTER_AREA},
    objdetect::{draw_detected_corners_charuco, draw_detected_markers},
    prelude::*,
};
use std::path::Path;

/// A highgui window showing frames with detection overlays.
///
/// Frames larger than `max_dim` are scaled down for display only.
pub struct PreviewWindow {
    name: String,
    max_dim: u32,
    keys: KeyBindings,
    poll_ms: i32,
    open: bool,
}

impl PreviewWindow {
    pub fn new(name: impl Into<String>, max_dim: u32) -> Self {
        Self {
            name: name.into(),
            max_dim,
            keys: KeyBindings::default(),
            poll_ms: 10,
            open: false,
        }
    }

    pub fn with_keys(mut self, keys: KeyBindings) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_poll_interval(mut self, millis: i32) -> Self {
        self.poll_ms = millis.max(1);
        self
    }

    fn ensure_open(&mut self) -> Result<(), CalibError> {
        if !self.open {
            named_window(&self.name, WINDOW_AUTOSIZE).or_backend()?;
            self.open = true;
        }
        Ok(())
    }

    fn render(&self, frame: &Mat, detection: Option<&BoardDetection>) -> Result<Mat, CalibError> {
        let mut canvas = Mat::default();
        if frame.channels() == 1 {
            cvt_color_def(frame, &mut canvas, COLOR_GRAY2BGR).or_backend()?;
        } else {
            frame.copy_to(&mut canvas).or_backend()?;
        }
        if let Some(detection) = detection {
            draw_overlays(&mut canvas, detection)?;
        }

        let size = mat_size(&canvas);
        let target = size.fit_within(self.max_dim);
        if target == size {
            return Ok(canvas);
        }
        let mut shown = Mat::default();
        resize(&canvas, &mut shown, cv_size(target)?, 0.0, 0.0, INTER_AREA).or_backend()?;
        Ok(shown)
    }
}

fn draw_overlays(canvas: &mut Mat, detection: &BoardDetection) -> Result<(), CalibError> {
    if !detection.markers.is_empty() {
        let corners: Vector<Vector<Point2f>> = detection
            .markers
            .iter()
            .map(|m| m.corners.iter().map(|p| Point2f::new(p.x, p.y)).collect())
            .collect();
        let ids: Vector<i32> = detection.markers.iter().map(|m| m.id as i32).collect();
        draw_detected_markers(canvas, &corners, &ids, Scalar::new(0.0, 255.0, 0.0, 0.0))
            .or_backend()?;
    }
    if !detection.corners.is_empty() {
        let corners: Vector<Point2f> = detection
            .corners
            .iter()
            .map(|c| Point2f::new(c.position.x, c.position.y))
            .collect();
        let ids: Vector<i32> = detection.corners.iter().map(|c| c.id as i32).collect();
        draw_detected_corners_charuco(canvas, &corners, &ids, Scalar::new(255.0, 0.0, 0.0, 0.0))
            .or_backend()?;
    }
    Ok(())
}

impl CaptureFrontend<Mat> for PreviewWindow {
    fn show(&mut self, frame: &Mat, detection: Option<&BoardDetection>) -> Result<(), CalibError> {
        let shown = self.render(frame, detection)?;
        self.ensure_open()?;
        imshow(&self.name, &shown).or_backend()
    }

    fn poll_event(&mut self) -> Result<CaptureEvent, CalibError> {
        let key = wait_key(self.poll_ms).or_backend()?;
        // closing the window counts as quitting
        if self.open && get_window_property(&self.name, WND_PROP_VISIBLE).or_backend()? < 1.0 {
            return Ok(CaptureEvent::Quit);
        }
        Ok(self.keys.event_for(key))
    }

    fn close(&mut self) -> Result<(), CalibError> {
        if self.open {
            self.open = false;
            destroy_window(&self.name).or_backend()?;
        }
        Ok(())
    }
}

/// Shows each accepted image and waits for a key before moving on.
impl ReviewHook<Mat> for PreviewWindow {
    fn review(
        &mut self,
        path: &Path,
        image: &Mat,
        detection: &BoardDetection,
    ) -> Result<(), CalibError> {
        log::debug!("reviewing {}", path.display());
        self.show(image, Some(detection))?;
        wait_key(0).or_backend()?;
        Ok(())
    }
}
