//! JSON configuration shared by the capture and calibration tools.

use crate::{
    CalibError, CharucoBoard, CharucoBoardSpec, KeyBindings, ResolutionPolicy, SnapshotNamer,
    DEFAULT_CORNER_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

fn default_image_dir() -> PathBuf {
    PathBuf::from("calibration_pictures")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("calibration.json")
}

fn default_corner_threshold() -> usize {
    DEFAULT_CORNER_THRESHOLD
}

fn default_display_max_dim() -> u32 {
    1000
}

/// Live capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub camera_index: i32,
    pub snapshot_prefix: String,
    pub snapshot_extension: String,
    pub keys: KeyBindings,
    /// How long each key poll blocks, in milliseconds.
    pub poll_interval_ms: i32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            snapshot_prefix: "charuco_".to_string(),
            snapshot_extension: "png".to_string(),
            keys: KeyBindings::default(),
            poll_interval_ms: 10,
        }
    }
}

/// Configuration for both entry points. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub board: CharucoBoardSpec,
    /// Directory captured images are written to and calibration reads from.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// A view is used only with strictly more ChArUco corners than this.
    #[serde(default = "default_corner_threshold")]
    pub corner_threshold: usize,
    #[serde(default)]
    pub resolution_policy: ResolutionPolicy,
    /// Show every accepted image with overlays during batch calibration.
    #[serde(default)]
    pub review: bool,
    /// Longest side of preview windows, in pixels.
    #[serde(default = "default_display_max_dim")]
    pub display_max_dim: u32,
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            board: CharucoBoardSpec::default(),
            image_dir: default_image_dir(),
            output_path: default_output_path(),
            corner_threshold: default_corner_threshold(),
            resolution_policy: ResolutionPolicy::default(),
            review: false,
            display_max_dim: default_display_max_dim(),
            capture: CaptureConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Build a validated board from the config.
    pub fn build_board(&self) -> Result<CharucoBoard, CalibError> {
        Ok(CharucoBoard::new(self.board)?)
    }

    /// Snapshot naming for captured frames.
    pub fn snapshot_namer(&self) -> SnapshotNamer {
        SnapshotNamer::new(
            &self.image_dir,
            self.capture.snapshot_prefix.as_str(),
            &self.capture.snapshot_extension,
        )
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), CalibError> {
        self.build_board()?;
        if self.capture.snapshot_extension.trim_start_matches('.').is_empty() {
            return Err(CalibError::Config(
                "capture.snapshot_extension must not be empty".to_string(),
            ));
        }
        if self.capture.poll_interval_ms <= 0 {
            return Err(CalibError::Config(
                "capture.poll_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dictionary, MarkerLayout};

    #[test]
    fn empty_json_gives_defaults() {
        let cfg: CalibrationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, CalibrationConfig::default());
        assert_eq!(cfg.corner_threshold, 20);
        assert_eq!(cfg.image_dir, PathBuf::from("calibration_pictures"));
        assert_eq!(cfg.output_path, PathBuf::from("calibration.json"));
        assert_eq!(cfg.board.dictionary, Dictionary::DICT_5X5_1000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let cfg: CalibrationConfig = serde_json::from_str(
            r#"{
                "board": {"rows": 7, "cols": 5, "square_length": 0.03,
                          "marker_length": 0.022, "dictionary": "DICT_4X4_50"},
                "resolution_policy": "strict",
                "capture": {"camera_index": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.board.rows, 7);
        assert_eq!(cfg.board.dictionary, Dictionary::DICT_4X4_50);
        assert_eq!(cfg.board.marker_layout, MarkerLayout::OpenCvLegacy);
        assert_eq!(cfg.resolution_policy, ResolutionPolicy::Strict);
        assert_eq!(cfg.capture.camera_index, 2);
        assert_eq!(cfg.capture.snapshot_extension, "png");
        assert_eq!(cfg.corner_threshold, 20);
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut cfg = CalibrationConfig::default();
        cfg.review = true;
        cfg.capture.keys.save = vec!['s'];
        cfg.write_json(&path).unwrap();
        assert_eq!(CalibrationConfig::load_json(&path).unwrap(), cfg);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = CalibrationConfig::default();
        cfg.capture.poll_interval_ms = 0;
        assert!(matches!(cfg.validate(), Err(CalibError::Config(_))));

        let mut cfg = CalibrationConfig::default();
        cfg.board.cols = 1;
        assert!(matches!(cfg.validate(), Err(CalibError::Board(_))));
    }
}
