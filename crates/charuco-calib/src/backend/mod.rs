//! OpenCV implementations of the core traits.
//!
//! - [`OpenCvCharuco`]: marker detection + ChArUco corner interpolation.
//! - [`OpenCvSolver`]: `calibrateCamera` over the accumulated views.
//! - [`OpenCvImageLoader`] / [`ImageWriter`]: image files on disk.
//! - [`OpenCvCamera`]: a `VideoCapture` device.
//! - [`PreviewWindow`]: highgui display, key polling and batch review.

mod camera;
mod charuco;
mod io;
mod window;

pub use camera::OpenCvCamera;
pub use charuco::{OpenCvCharuco, OpenCvSolver};
pub use io::{ImageWriter, OpenCvImageLoader};
pub use window::PreviewWindow;

pub use opencv::core::Mat;

use crate::{CalibError, ImageSize};
use opencv::prelude::*;
use std::path::Path;

/// Lift `opencv::Result` into the crate error.
pub(crate) trait OrBackend<T> {
    fn or_backend(self) -> Result<T, CalibError>;
}

impl<T> OrBackend<T> for opencv::Result<T> {
    fn or_backend(self) -> Result<T, CalibError> {
        self.map_err(CalibError::backend)
    }
}

pub(crate) fn mat_size(image: &Mat) -> ImageSize {
    ImageSize::new(image.cols().max(0) as u32, image.rows().max(0) as u32)
}

pub(crate) fn cv_size(size: ImageSize) -> Result<opencv::core::Size, CalibError> {
    let width = i32::try_from(size.width)
        .map_err(|_| CalibError::Config(format!("image width {} out of range", size.width)))?;
    let height = i32::try_from(size.height)
        .map_err(|_| CalibError::Config(format!("image height {} out of range", size.height)))?;
    Ok(opencv::core::Size::new(width, height))
}

/// OpenCV takes file names as `&str`.
pub(crate) fn path_str(path: &Path) -> Result<&str, CalibError> {
    path.to_str().ok_or_else(|| {
        CalibError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("path is not valid UTF-8: {}", path.display()),
        ))
    })
}
