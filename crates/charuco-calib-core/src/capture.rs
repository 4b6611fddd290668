//! Operator-driven capture of calibration images.
//!
//! The loop has three states. Every transition is triggered by the operator,
//! except leaving `Saving` once the frame is on disk:
//!
//! ```text
//! Previewing --Save--> Saving --FrameSaved--> Previewing
//!     |                  |
//!     +------Quit--------+-----> Terminated
//! ```
//!
//! [`CaptureSession::run_and_calibrate`] then hands the image directory to
//! the same batch routine `charuco-calibrate` uses.

use crate::{
    BatchCalibration, BatchReport, BoardDetection, BoardDetector, CalibError, CalibrationSolver,
    ImageLoader, ReviewHook,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

const ESC: char = '\u{1b}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Previewing,
    Saving,
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureEvent {
    /// No operator input during this poll.
    Idle,
    Save,
    Quit,
    /// The current frame has been written.
    FrameSaved,
}

impl CaptureState {
    pub fn on_event(self, event: CaptureEvent) -> CaptureState {
        match (self, event) {
            (CaptureState::Terminated, _) | (_, CaptureEvent::Quit) => CaptureState::Terminated,
            (CaptureState::Previewing, CaptureEvent::Save) => CaptureState::Saving,
            (CaptureState::Saving, CaptureEvent::FrameSaved) => CaptureState::Previewing,
            (state, _) => state,
        }
    }
}

/// Keys that trigger capture events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub save: Vec<char>,
    pub quit: Vec<char>,
}

impl Default for KeyBindings {
    /// Space saves; `q` or Esc quits.
    fn default() -> Self {
        Self {
            save: vec![' '],
            quit: vec!['q', ESC],
        }
    }
}

impl KeyBindings {
    /// Map a raw key code (as returned by a GUI key poll) to an event.
    ///
    /// Negative codes mean "no key pressed".
    pub fn event_for(&self, key: i32) -> CaptureEvent {
        if key < 0 {
            return CaptureEvent::Idle;
        }
        let Some(c) = char::from_u32((key & 0xff) as u32) else {
            return CaptureEvent::Idle;
        };
        if self.quit.contains(&c) {
            CaptureEvent::Quit
        } else if self.save.contains(&c) {
            CaptureEvent::Save
        } else {
            CaptureEvent::Idle
        }
    }
}

/// Hands out `<dir>/<prefix><NNNN>.<ext>` paths, skipping files that already exist.
#[derive(Clone, Debug)]
pub struct SnapshotNamer {
    dir: PathBuf,
    prefix: String,
    extension: String,
    next: u32,
}

impl SnapshotNamer {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            extension: extension.trim_start_matches('.').to_string(),
            next: 0,
        }
    }

    /// Directory snapshots are written to.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Next unused snapshot path.
    pub fn next_path(&mut self) -> PathBuf {
        loop {
            let path = self.dir.join(format!(
                "{}{:04}.{}",
                self.prefix, self.next, self.extension
            ));
            self.next += 1;
            if !path.exists() {
                return path;
            }
        }
    }
}

/// Live frame source such as a camera.
pub trait FrameSource {
    type Frame;

    /// Grab the next frame; `Ok(None)` once the source has stopped delivering.
    fn read_frame(&mut self) -> Result<Option<Self::Frame>, CalibError>;

    /// Release the device.
    fn release(&mut self) -> Result<(), CalibError>;
}

/// Operator-facing side of the capture loop: display and input.
pub trait CaptureFrontend<F> {
    /// Present a frame, with overlays for whatever was detected in it.
    fn show(&mut self, frame: &F, detection: Option<&BoardDetection>) -> Result<(), CalibError>;

    /// Wait briefly for operator input.
    fn poll_event(&mut self) -> Result<CaptureEvent, CalibError>;

    /// Tear down any windows.
    fn close(&mut self) -> Result<(), CalibError>;
}

/// Persists raw frames.
pub trait FrameStore<F> {
    fn store(&mut self, frame: &F, path: &Path) -> Result<(), CalibError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureReport {
    pub frames: usize,
    pub saved: Vec<PathBuf>,
}

/// The interactive capture loop.
pub struct CaptureSession<'a, C, U, W, D> {
    camera: &'a mut C,
    frontend: &'a mut U,
    store: &'a mut W,
    detector: &'a mut D,
    namer: SnapshotNamer,
}

impl<'a, C, U, W, D> CaptureSession<'a, C, U, W, D>
where
    C: FrameSource,
    U: CaptureFrontend<C::Frame>,
    W: FrameStore<C::Frame>,
    D: BoardDetector<C::Frame>,
{
    pub fn new(
        camera: &'a mut C,
        frontend: &'a mut U,
        store: &'a mut W,
        detector: &'a mut D,
        namer: SnapshotNamer,
    ) -> Self {
        Self {
            camera,
            frontend,
            store,
            detector,
            namer,
        }
    }

    /// Run until the operator quits or the camera stops.
    ///
    /// The camera and the frontend are released on every exit path.
    pub fn run(&mut self) -> Result<CaptureReport, CalibError> {
        let outcome = self.drive();
        let released = self.camera.release();
        let closed = self.frontend.close();
        let report = outcome?;
        released?;
        closed?;
        log::info!(
            "capture finished: {} frames, {} saved",
            report.frames,
            report.saved.len()
        );
        Ok(report)
    }

    /// Capture, then calibrate from every image in the snapshot directory.
    ///
    /// The camera and the frontend are released before calibration starts.
    /// Images left by earlier sessions are used too.
    pub fn run_and_calibrate<L, S, R>(
        mut self,
        batch: &BatchCalibration<'_>,
        loader: &mut L,
        solver: &mut S,
        review: &mut R,
    ) -> Result<(CaptureReport, BatchReport), CalibError>
    where
        L: ImageLoader,
        D: BoardDetector<L::Image>,
        S: CalibrationSolver,
        R: ReviewHook<L::Image>,
    {
        let capture = self.run()?;
        let image_dir = self.namer.dir().to_path_buf();
        let calibration = batch.run(&image_dir, loader, &mut *self.detector, solver, review)?;
        Ok((capture, calibration))
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    fn drive(&mut self) -> Result<CaptureReport, CalibError> {
        let mut report = CaptureReport::default();
        let mut state = CaptureState::Previewing;

        while state != CaptureState::Terminated {
            let Some(frame) = self.camera.read_frame()? else {
                log::warn!("camera stopped delivering frames");
                break;
            };
            report.frames += 1;

            let detection = match self.detector.detect(&frame) {
                Ok(d) => Some(d),
                Err(err) => {
                    log::debug!("detection failed on preview frame: {err}");
                    None
                }
            };
            self.frontend.show(&frame, detection.as_ref())?;

            state = state.on_event(self.frontend.poll_event()?);
            if state == CaptureState::Saving {
                let path = self.namer.next_path();
                self.store.store(&frame, &path)?;
                log::info!("saved {}", path.display());
                report.saved.push(path);
                state = state.on_event(CaptureEvent::FrameSaved);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_operator_events() {
        use CaptureEvent::*;
        use CaptureState::*;

        assert_eq!(Previewing.on_event(Idle), Previewing);
        assert_eq!(Previewing.on_event(Save), Saving);
        assert_eq!(Previewing.on_event(FrameSaved), Previewing);
        assert_eq!(Saving.on_event(Save), Saving);
        assert_eq!(Saving.on_event(FrameSaved), Previewing);
        assert_eq!(Saving.on_event(Quit), Terminated);
        assert_eq!(Previewing.on_event(Quit), Terminated);
        assert_eq!(Terminated.on_event(Save), Terminated);
        assert_eq!(Terminated.on_event(FrameSaved), Terminated);
    }

    #[test]
    fn default_bindings() {
        let keys = KeyBindings::default();
        assert_eq!(keys.event_for(-1), CaptureEvent::Idle);
        assert_eq!(keys.event_for(' ' as i32), CaptureEvent::Save);
        assert_eq!(keys.event_for('q' as i32), CaptureEvent::Quit);
        assert_eq!(keys.event_for(27), CaptureEvent::Quit);
        assert_eq!(keys.event_for('x' as i32), CaptureEvent::Idle);
        // modifier bits above the low byte are ignored
        assert_eq!(keys.event_for(0x10_0000 | 'q' as i32), CaptureEvent::Quit);
    }

    #[test]
    fn bindings_deserialize_with_defaults() {
        let keys: KeyBindings = serde_json::from_str(r#"{"save": ["c"]}"#).unwrap();
        assert_eq!(keys.save, vec!['c']);
        assert_eq!(keys.quit, KeyBindings::default().quit);
    }

    #[test]
    fn snapshot_names_skip_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shot_0000.png"), b"").unwrap();
        std::fs::write(dir.path().join("shot_0002.png"), b"").unwrap();

        let mut namer = SnapshotNamer::new(dir.path(), "shot_", ".png");
        assert_eq!(namer.next_path(), dir.path().join("shot_0001.png"));
        assert_eq!(namer.next_path(), dir.path().join("shot_0003.png"));
        assert_eq!(namer.next_path(), dir.path().join("shot_0004.png"));
    }
}
