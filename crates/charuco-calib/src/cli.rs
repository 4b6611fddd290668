//! Command-line arguments for `charuco-capture` and `charuco-calibrate`.
//!
//! Both tools read an optional JSON [`CalibrationConfig`] and let flags
//! override individual fields. Precedence is flag, then config file, then
//! the built-in default.

use crate::{CalibError, CalibrationConfig, Dictionary, MarkerLayout, ResolutionPolicy};
use clap::{Args, Parser};
use log::LevelFilter;
use std::path::PathBuf;

/// Errors a binary can exit with.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Calib(#[from] CalibError),

    #[error("failed to install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct Verbosity {
    /// Log per-image detection details.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Verbosity {
    pub fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }

    /// Install the process logger for `tool`.
    ///
    /// With the `tracing` feature a set `RUST_LOG` overrides the flags.
    pub fn init_logging(&self, tool: &'static str) -> Result<(), CliError> {
        #[cfg(feature = "tracing")]
        {
            let _ = tool;
            crate::init_tracing(false, self.level());
            Ok(())
        }
        #[cfg(not(feature = "tracing"))]
        {
            crate::init_for_tool(tool, self.level())?;
            Ok(())
        }
    }
}

/// Board overrides shared by both tools.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct BoardArgs {
    /// Number of board squares along y.
    #[arg(long)]
    pub rows: Option<u32>,

    /// Number of board squares along x.
    #[arg(long)]
    pub cols: Option<u32>,

    /// Square side in metres.
    #[arg(long)]
    pub square_length: Option<f32>,

    /// Marker side in metres.
    #[arg(long)]
    pub marker_length: Option<f32>,

    /// Predefined marker dictionary, e.g. `DICT_5X5_1000` or `5x5_1000`.
    #[arg(long)]
    pub dictionary: Option<Dictionary>,

    /// Board printed by OpenCV 4.6 or later (top-left square always black)
    /// instead of the legacy pattern.
    #[arg(long)]
    pub modern_layout: bool,
}

impl BoardArgs {
    fn apply(&self, config: &mut CalibrationConfig) {
        let board = &mut config.board;
        if let Some(rows) = self.rows {
            board.rows = rows;
        }
        if let Some(cols) = self.cols {
            board.cols = cols;
        }
        if let Some(square) = self.square_length {
            board.square_length = square;
        }
        if let Some(marker) = self.marker_length {
            board.marker_length = marker;
        }
        if let Some(dictionary) = self.dictionary {
            board.dictionary = dictionary;
        }
        if self.modern_layout {
            board.marker_layout = MarkerLayout::OpenCvCharuco;
        }
    }
}

fn load_base(path: Option<&PathBuf>) -> Result<CalibrationConfig, CalibError> {
    match path {
        Some(path) => {
            log::debug!("loading config from {}", path.display());
            CalibrationConfig::load_json(path)
        }
        None => Ok(CalibrationConfig::default()),
    }
}

/// Preview the camera, save frames of the board on a key press, then
/// calibrate from the image directory.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Capture ChArUco calibration images from a camera")]
pub struct CaptureArgs {
    /// JSON configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Camera device index.
    #[arg(short, long)]
    pub camera: Option<i32>,

    /// Directory the snapshots are written to.
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// File name prefix of saved snapshots.
    #[arg(long)]
    pub prefix: Option<String>,

    /// File extension (and so image format) of saved snapshots.
    #[arg(long)]
    pub extension: Option<String>,

    /// Longest side of the preview window in pixels.
    #[arg(long)]
    pub display_max_dim: Option<u32>,

    /// Where to write the calibration result.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only capture images; skip the calibration afterwards.
    #[arg(long)]
    pub no_calibrate: bool,

    #[command(flatten)]
    pub board: BoardArgs,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

impl CaptureArgs {
    /// Merge the config file with the flags and validate the result.
    pub fn resolve(&self) -> Result<CalibrationConfig, CalibError> {
        let mut config = load_base(self.config.as_ref())?;
        self.board.apply(&mut config);
        if let Some(camera) = self.camera {
            config.capture.camera_index = camera;
        }
        if let Some(dir) = &self.image_dir {
            config.image_dir = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.capture.snapshot_prefix = prefix.clone();
        }
        if let Some(extension) = &self.extension {
            config.capture.snapshot_extension = extension.clone();
        }
        if let Some(max_dim) = self.display_max_dim {
            config.display_max_dim = max_dim;
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Calibrate from every image in a directory.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Calibrate a camera from ChArUco board images")]
pub struct CalibrateArgs {
    /// JSON configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the calibration images.
    #[arg(short, long)]
    pub image_dir: Option<PathBuf>,

    /// Where to write the calibration result.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Minimum ChArUco corners per image (exclusive).
    #[arg(long)]
    pub corner_threshold: Option<usize>,

    /// Drop images whose size differs from the first accepted one.
    #[arg(long)]
    pub strict_resolution: bool,

    /// Show every accepted image with overlays and wait for a key.
    #[arg(long)]
    pub review: bool,

    #[command(flatten)]
    pub board: BoardArgs,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

impl CalibrateArgs {
    /// Merge the config file with the flags and validate the result.
    pub fn resolve(&self) -> Result<CalibrationConfig, CalibError> {
        let mut config = load_base(self.config.as_ref())?;
        self.board.apply(&mut config);
        if let Some(dir) = &self.image_dir {
            config.image_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(threshold) = self.corner_threshold {
            config.corner_threshold = threshold;
        }
        if self.strict_resolution {
            config.resolution_policy = ResolutionPolicy::Strict;
        }
        if self.review {
            config.review = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrate_defaults_match_config_defaults() {
        let args = CalibrateArgs::try_parse_from(["charuco-calibrate"]).unwrap();
        assert_eq!(args.resolve().unwrap(), CalibrationConfig::default());
        assert_eq!(args.verbosity.level(), LevelFilter::Info);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"image_dir": "from_file", "corner_threshold": 30, "output_path": "file.json"}"#,
        )
        .unwrap();

        let args = CalibrateArgs::try_parse_from([
            "charuco-calibrate",
            "--config",
            path.to_str().unwrap(),
            "--image-dir",
            "from_flag",
            "--dictionary",
            "4x4_250",
            "--strict-resolution",
            "-v",
        ])
        .unwrap();
        let config = args.resolve().unwrap();

        assert_eq!(config.image_dir, PathBuf::from("from_flag"));
        assert_eq!(config.corner_threshold, 30);
        assert_eq!(config.output_path, PathBuf::from("file.json"));
        assert_eq!(config.board.dictionary, Dictionary::DICT_4X4_250);
        assert_eq!(config.resolution_policy, ResolutionPolicy::Strict);
        assert_eq!(args.verbosity.level(), LevelFilter::Debug);
    }

    #[test]
    fn capture_flags() {
        let args = CaptureArgs::try_parse_from([
            "charuco-capture",
            "--camera",
            "2",
            "--prefix",
            "shot_",
            "--extension",
            "jpg",
            "--quiet",
        ])
        .unwrap();
        let config = args.resolve().unwrap();
        assert_eq!(config.capture.camera_index, 2);
        assert_eq!(config.capture.snapshot_prefix, "shot_");
        assert_eq!(config.capture.snapshot_extension, "jpg");
        assert_eq!(args.verbosity.level(), LevelFilter::Warn);
        assert!(!args.no_calibrate);
    }

    #[test]
    fn capture_calibrates_unless_told_not_to() {
        let args = CaptureArgs::try_parse_from(["charuco-capture", "-o", "cam0.json"]).unwrap();
        assert!(!args.no_calibrate);
        assert_eq!(args.resolve().unwrap().output_path, PathBuf::from("cam0.json"));

        let args = CaptureArgs::try_parse_from(["charuco-capture", "--no-calibrate"]).unwrap();
        assert!(args.no_calibrate);
    }

    #[test]
    fn legacy_layout_unless_modern_is_requested() {
        let args = CalibrateArgs::try_parse_from(["charuco-calibrate"]).unwrap();
        assert_eq!(args.resolve().unwrap().board.marker_layout, MarkerLayout::OpenCvLegacy);

        let args = CaptureArgs::try_parse_from(["charuco-capture", "--modern-layout"]).unwrap();
        assert_eq!(args.resolve().unwrap().board.marker_layout, MarkerLayout::OpenCvCharuco);
    }

    #[test]
    fn invalid_board_is_rejected() {
        let args =
            CalibrateArgs::try_parse_from(["charuco-calibrate", "--marker-length", "0.5"]).unwrap();
        assert!(matches!(args.resolve(), Err(CalibError::Board(_))));
    }

    #[test]
    fn unknown_dictionary_is_a_parse_error() {
        assert!(CalibrateArgs::try_parse_from(["charuco-calibrate", "--dictionary", "9x9"]).is_err());
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(CaptureArgs::try_parse_from(["charuco-capture", "-v", "-q"]).is_err());
    }
}
