//! Per-image detection results and the traits a vision backend implements.

use crate::CalibError;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Image resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size that fits inside a `max_dim` square while keeping the aspect ratio.
    ///
    /// Images already inside the bound are returned unchanged.
    pub fn fit_within(self, max_dim: u32) -> ImageSize {
        let longest = self.width.max(self.height);
        if max_dim == 0 || longest <= max_dim {
            return self;
        }
        let scale = max_dim as f64 / longest as f64;
        ImageSize {
            width: ((self.width as f64 * scale).round() as u32).max(1),
            height: ((self.height as f64 * scale).round() as u32).max(1),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A decoded fiducial marker with its four image corners (TL, TR, BR, BL).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedMarker {
    pub id: u32,
    pub corners: [Point2<f32>; 4],
}

/// An interpolated chessboard corner with its board-relative id.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharucoCorner {
    pub id: u32,
    pub position: Point2<f32>,
}

/// Everything the backend found in one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardDetection {
    pub image_size: ImageSize,
    pub markers: Vec<DetectedMarker>,
    pub corners: Vec<CharucoCorner>,
}

impl BoardDetection {
    /// Detection with nothing in it.
    pub fn empty(image_size: ImageSize) -> Self {
        Self {
            image_size,
            markers: Vec::new(),
            corners: Vec::new(),
        }
    }

    /// Number of interpolated ChArUco corners.
    #[inline]
    pub fn corner_count(&self) -> usize {
        self.corners.len()
    }
}

/// Finds markers and interpolates ChArUco corners in an image.
pub trait BoardDetector<I> {
    /// Detect the board in `image`.
    ///
    /// Finding nothing is not an error: return [`BoardDetection::empty`].
    fn detect(&mut self, image: &I) -> Result<BoardDetection, CalibError>;
}

/// Reads images from disk.
pub trait ImageLoader {
    type Image;

    /// Load and decode `path`. `Ok(None)` means the file is not a decodable image.
    fn load(&mut self, path: &Path) -> Result<Option<Self::Image>, CalibError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        let size = ImageSize::new(4000, 3000).fit_within(1000);
        assert_eq!(size, ImageSize::new(1000, 750));

        let portrait = ImageSize::new(1080, 1920).fit_within(1000);
        assert_eq!(portrait, ImageSize::new(563, 1000));
    }

    #[test]
    fn fit_within_never_upscales() {
        let size = ImageSize::new(640, 480);
        assert_eq!(size.fit_within(1000), size);
        assert_eq!(size.fit_within(0), size);
    }
}
