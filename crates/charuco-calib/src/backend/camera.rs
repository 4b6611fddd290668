use super::OrBackend;
use crate::{CalibError, FrameSource};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY},
};

/// A camera opened by device index.
pub struct OpenCvCamera {
    capture: VideoCapture,
    index: i32,
}

impl OpenCvCamera {
    pub fn open(index: i32) -> Result<Self, CalibError> {
        let capture = VideoCapture::new(index, CAP_ANY).or_backend()?;
        if !capture.is_opened().or_backend()? {
            return Err(CalibError::CameraUnavailable { index });
        }
        log::info!("opened camera {index}");
        Ok(Self { capture, index })
    }
}

impl FrameSource for OpenCvCamera {
    type Frame = Mat;

    fn read_frame(&mut self) -> Result<Option<Mat>, CalibError> {
        let mut frame = Mat::default();
        let grabbed = self.capture.read(&mut frame).or_backend()?;
        if !grabbed || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<(), CalibError> {
        self.capture.release().or_backend()?;
        log::debug!("released camera {}", self.index);
        Ok(())
    }
}
