//! Board specification and layout helpers for ChArUco.

use crate::Dictionary;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Which squares carry markers.
///
/// Marker ids are assigned row-major over the marker squares in both layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerLayout {
    /// OpenCV >= 4.6: the top-left square is always black.
    #[serde(rename = "opencv_charuco", alias = "open_cv_charuco")]
    OpenCvCharuco,
    /// Pattern of `CharucoBoard_create` before OpenCV 4.6: with an even row
    /// count the top-left square is white and carries marker 0.
    #[serde(rename = "opencv_legacy", alias = "open_cv_legacy")]
    #[default]
    OpenCvLegacy,
}

impl MarkerLayout {
    /// Whether square `(0, 0)` is white on a board with `rows` square rows.
    #[inline]
    pub fn top_left_is_white(self, rows: u32) -> bool {
        self == MarkerLayout::OpenCvLegacy && rows % 2 == 0
    }
}

/// Static ChArUco board specification.
///
/// `rows`/`cols` are **square counts** (not inner corner counts). Lengths are
/// in metres and end up as the unit of the solved extrinsics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharucoBoardSpec {
    pub rows: u32,
    pub cols: u32,
    pub square_length: f32,
    pub marker_length: f32,
    pub dictionary: Dictionary,
    #[serde(default)]
    pub marker_layout: MarkerLayout,
}

impl Default for CharucoBoardSpec {
    /// 12 × 9 squares, 20.574 mm squares, 15.912 mm markers, 5×5 markers,
    /// printed with the legacy pattern.
    fn default() -> Self {
        Self {
            rows: 12,
            cols: 9,
            square_length: 0.020574,
            marker_length: 0.015912,
            dictionary: Dictionary::DICT_5X5_1000,
            marker_layout: MarkerLayout::OpenCvLegacy,
        }
    }
}

/// Board specification validation errors.
#[derive(thiserror::Error, Debug)]
pub enum CharucoBoardError {
    #[error("rows and cols must be >= 2")]
    InvalidSize,
    #[error("square_length must be > 0")]
    InvalidSquareLength,
    #[error("marker_length must be > 0 and smaller than square_length")]
    InvalidMarkerLength,
    #[error("board needs {needed} markers, {dictionary} has {available}")]
    NotEnoughDictionaryCodes {
        dictionary: Dictionary,
        needed: usize,
        available: usize,
    },
}

/// Validated board with layout helpers.
#[derive(Clone, Debug)]
pub struct CharucoBoard {
    spec: CharucoBoardSpec,
    marker_positions: Vec<[u32; 2]>,
}

impl CharucoBoard {
    /// Validate and create a board from a spec.
    pub fn new(spec: CharucoBoardSpec) -> Result<Self, CharucoBoardError> {
        if spec.rows < 2 || spec.cols < 2 {
            return Err(CharucoBoardError::InvalidSize);
        }
        if !spec.square_length.is_finite() || spec.square_length <= 0.0 {
            return Err(CharucoBoardError::InvalidSquareLength);
        }
        if !spec.marker_length.is_finite()
            || spec.marker_length <= 0.0
            || spec.marker_length >= spec.square_length
        {
            return Err(CharucoBoardError::InvalidMarkerLength);
        }

        let marker_positions = marker_positions(spec.marker_layout, spec.rows, spec.cols);
        let needed = marker_positions.len();
        let available = spec.dictionary.marker_count();
        if available < needed {
            return Err(CharucoBoardError::NotEnoughDictionaryCodes {
                dictionary: spec.dictionary,
                needed,
                available,
            });
        }

        Ok(Self {
            spec,
            marker_positions,
        })
    }

    /// Return the underlying board specification.
    #[inline]
    pub fn spec(&self) -> CharucoBoardSpec {
        self.spec
    }

    /// Inner chessboard corners in vertical direction.
    #[inline]
    pub fn inner_rows(&self) -> u32 {
        self.spec.rows - 1
    }

    /// Inner chessboard corners in horizontal direction.
    #[inline]
    pub fn inner_cols(&self) -> u32 {
        self.spec.cols - 1
    }

    /// Total number of ChArUco corners (inner intersections).
    #[inline]
    pub fn corner_count(&self) -> usize {
        (self.inner_rows() * self.inner_cols()) as usize
    }

    /// Number of markers on the board.
    #[inline]
    pub fn marker_count(&self) -> usize {
        self.marker_positions.len()
    }

    /// Physical position of a ChArUco corner on the board plane (z = 0).
    ///
    /// Origin is the top-left board corner.
    pub fn corner_object_point(&self, id: u32) -> Option<Point3<f32>> {
        let xy = self.corner_object_xy(id)?;
        Some(Point3::new(xy.x, xy.y, 0.0))
    }

    fn corner_object_xy(&self, id: u32) -> Option<Point2<f32>> {
        let cols = self.inner_cols();
        if id as usize >= self.corner_count() {
            return None;
        }
        let i = (id % cols) as f32 + 1.0;
        let j = (id / cols) as f32 + 1.0;
        Some(Point2::new(
            i * self.spec.square_length,
            j * self.spec.square_length,
        ))
    }
}

/// Square cells `(sx, sy)` holding a marker, indexed by marker id.
fn marker_positions(layout: MarkerLayout, rows: u32, cols: u32) -> Vec<[u32; 2]> {
    // markers sit on white squares
    let white_parity = if layout.top_left_is_white(rows) { 0 } else { 1 };
    let mut out = Vec::new();
    for j in 0..rows {
        for i in 0..cols {
            if (i + j) & 1 == white_parity {
                out.push([i, j]);
            }
        }
    }
    out
}
