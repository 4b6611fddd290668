//! Batch calibration over a directory of saved images.

use crate::{
    BoardDetection, BoardDetector, CalibError, CalibrationAccumulator, CalibrationConfig,
    CalibrationSolution, CalibrationSolver, CameraCalibration, CharucoBoard, ImageLoader,
    ResolutionPolicy, ViewVerdict, DEFAULT_CORNER_THRESHOLD,
};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Every regular file in `dir` whose name has an extension, sorted by name.
///
/// A missing directory yields no images.
pub fn collect_image_paths(dir: &Path) -> Result<Vec<PathBuf>, CalibError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Called for every accepted image, e.g. to show it to the operator.
pub trait ReviewHook<I> {
    fn review(&mut self, path: &Path, image: &I, detection: &BoardDetection)
        -> Result<(), CalibError>;
}

/// Review hook that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReview;

impl<I> ReviewHook<I> for NoReview {
    fn review(&mut self, _: &Path, _: &I, _: &BoardDetection) -> Result<(), CalibError> {
        Ok(())
    }
}

/// Summary of a successful batch run.
#[derive(Clone, Debug)]
pub struct BatchReport {
    pub images: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Files that could not be decoded.
    pub unreadable: usize,
    pub solution: CalibrationSolution,
    pub calibration: CameraCalibration,
    pub output_path: PathBuf,
}

/// Detection, accumulation, one solve, one write.
#[derive(Clone, Debug)]
pub struct BatchCalibration<'a> {
    board: &'a CharucoBoard,
    output_path: PathBuf,
    corner_threshold: usize,
    resolution_policy: ResolutionPolicy,
}

impl<'a> BatchCalibration<'a> {
    pub fn new(board: &'a CharucoBoard, output_path: impl Into<PathBuf>) -> Self {
        Self {
            board,
            output_path: output_path.into(),
            corner_threshold: DEFAULT_CORNER_THRESHOLD,
            resolution_policy: ResolutionPolicy::default(),
        }
    }

    pub fn from_config(board: &'a CharucoBoard, config: &CalibrationConfig) -> Self {
        Self::new(board, &config.output_path)
            .with_corner_threshold(config.corner_threshold)
            .with_resolution_policy(config.resolution_policy)
    }

    pub fn with_corner_threshold(mut self, threshold: usize) -> Self {
        self.corner_threshold = threshold;
        self
    }

    pub fn with_resolution_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.resolution_policy = policy;
        self
    }

    /// Calibrate from every image in `image_dir` and write the result.
    ///
    /// Nothing is written unless the solve succeeds.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(dir = %image_dir.display()))
    )]
    pub fn run<L, D, S, R>(
        &self,
        image_dir: &Path,
        loader: &mut L,
        detector: &mut D,
        solver: &mut S,
        review: &mut R,
    ) -> Result<BatchReport, CalibError>
    where
        L: ImageLoader,
        D: BoardDetector<L::Image>,
        S: CalibrationSolver,
        R: ReviewHook<L::Image>,
    {
        let paths = collect_image_paths(image_dir)?;
        if paths.is_empty() {
            return Err(CalibError::NoImages {
                dir: image_dir.to_path_buf(),
            });
        }
        log::info!("found {} images in {}", paths.len(), image_dir.display());

        let mut accumulator =
            CalibrationAccumulator::new(self.corner_threshold, self.resolution_policy);
        let unreadable = self.accumulate(&paths, loader, detector, review, &mut accumulator)?;
        let accepted = accumulator.accepted();
        if accepted == 0 {
            // undecodable files count as images without a board
            return Err(CalibError::NoBoardDetected {
                images: paths.len(),
            });
        }
        let rejected = accumulator.rejected();

        let (solution, calibration) = self.solve_and_store(accumulator, solver)?;
        Ok(BatchReport {
            images: paths.len(),
            accepted,
            rejected,
            unreadable,
            solution,
            calibration,
            output_path: self.output_path.clone(),
        })
    }

    /// Detect the board in every image and feed the accumulator.
    ///
    /// Returns how many files could not be decoded.
    pub fn accumulate<L, D, R>(
        &self,
        paths: &[PathBuf],
        loader: &mut L,
        detector: &mut D,
        review: &mut R,
        accumulator: &mut CalibrationAccumulator,
    ) -> Result<usize, CalibError>
    where
        L: ImageLoader,
        D: BoardDetector<L::Image>,
        R: ReviewHook<L::Image>,
    {
        let mut unreadable = 0;
        for path in paths {
            let Some(image) = loader.load(path)? else {
                log::warn!("skipping unreadable image: {}", path.display());
                unreadable += 1;
                continue;
            };

            let detection = detector.detect(&image)?;
            log::debug!(
                "{}: {} markers, {} charuco corners",
                path.display(),
                detection.markers.len(),
                detection.corner_count()
            );

            match accumulator.offer(detection.clone()) {
                ViewVerdict::Accepted { view, corners } => {
                    log::info!(
                        "view {view}: {} ({corners} corners)",
                        path.display()
                    );
                    review.review(path, &image, &detection)?;
                }
                ViewVerdict::TooFewCorners { .. } => {
                    log::warn!(
                        "Not able to detect a charuco board in image: {}",
                        path.display()
                    );
                }
                ViewVerdict::ResolutionMismatch { expected, got } => {
                    log::warn!(
                        "skipping {}: size {got} differs from calibration resolution {expected}",
                        path.display()
                    );
                }
            }
        }
        Ok(unreadable)
    }

    /// Solve once over all accepted views and persist the result.
    pub fn solve_and_store<S: CalibrationSolver>(
        &self,
        accumulator: CalibrationAccumulator,
        solver: &mut S,
    ) -> Result<(CalibrationSolution, CameraCalibration), CalibError> {
        let views = accumulator.finish()?;
        log::info!(
            "calibrating from {} views at {}",
            views.view_count(),
            views.image_size
        );

        let solution = solver.solve(&views, self.board)?;
        solution.validate()?;
        log::info!("RMS reprojection error: {:.4} px", solution.rms_error);

        let calibration = CameraCalibration::from_solution(&solution, views.image_size);
        calibration.write_json(&self.output_path)?;
        log::info!("Calibration finished: {}", self.output_path.display());
        Ok((solution, calibration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_only_files_with_extensions_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "README", "c.tiff"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.d")).unwrap();

        let paths = collect_image_paths(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.jpg", "b.png", "c.tiff"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = collect_image_paths(&dir.path().join("nope")).unwrap();
        assert!(paths.is_empty());
    }
}
