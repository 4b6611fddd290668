use super::{path_str, OrBackend};
use crate::{CalibError, FrameStore, ImageLoader};
use opencv::{
    core::{Mat, Vector},
    imgcodecs::{imread, imwrite, IMREAD_COLOR},
    prelude::*,
};
use std::path::Path;

/// Decodes image files with `imread`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenCvImageLoader;

impl ImageLoader for OpenCvImageLoader {
    type Image = Mat;

    /// An empty `Mat` means OpenCV could not decode the file.
    fn load(&mut self, path: &Path) -> Result<Option<Mat>, CalibError> {
        let image = imread(path_str(path)?, IMREAD_COLOR).or_backend()?;
        if image.empty() {
            return Ok(None);
        }
        Ok(Some(image))
    }
}

/// Writes frames unmodified with `imwrite`; the format follows the extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageWriter;

impl FrameStore<Mat> for ImageWriter {
    fn store(&mut self, frame: &Mat, path: &Path) -> Result<(), CalibError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let written = imwrite(path_str(path)?, frame, &Vector::new()).or_backend()?;
        if !written {
            return Err(CalibError::backend(format!(
                "could not write {}",
                path.display()
            )));
        }
        Ok(())
    }
}
