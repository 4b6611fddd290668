//! Correspondence accumulation across calibration views.

use crate::{BoardDetection, CalibError, CharucoBoard, ImageSize};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Views need strictly more interpolated corners than this to be used.
pub const DEFAULT_CORNER_THRESHOLD: usize = 20;

/// What to do with an accepted view whose size differs from the recorded resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Keep the first resolution and accept every later view regardless of size.
    #[default]
    FirstWins,
    /// Reject views whose size differs from the first accepted one.
    Strict,
}

/// Outcome of offering one detection to the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewVerdict {
    Accepted {
        view: usize,
        corners: usize,
    },
    TooFewCorners {
        found: usize,
        threshold: usize,
    },
    ResolutionMismatch {
        expected: ImageSize,
        got: ImageSize,
    },
}

impl ViewVerdict {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, ViewVerdict::Accepted { .. })
    }
}

/// Parallel per-view corner and id sequences plus the calibration resolution.
///
/// Both sequences are only ever extended together, so they always have the
/// same length.
#[derive(Clone, Debug)]
pub struct CalibrationAccumulator {
    threshold: usize,
    policy: ResolutionPolicy,
    corners: Vec<Vec<Point2<f32>>>,
    ids: Vec<Vec<u32>>,
    image_size: Option<ImageSize>,
    offered: usize,
}

impl Default for CalibrationAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_CORNER_THRESHOLD, ResolutionPolicy::default())
    }
}

impl CalibrationAccumulator {
    pub fn new(threshold: usize, policy: ResolutionPolicy) -> Self {
        Self {
            threshold,
            policy,
            corners: Vec::new(),
            ids: Vec::new(),
            image_size: None,
            offered: 0,
        }
    }

    /// Offer one detection; accepted views are appended in offer order.
    pub fn offer(&mut self, detection: BoardDetection) -> ViewVerdict {
        self.offered += 1;

        let found = detection.corner_count();
        if found <= self.threshold {
            return ViewVerdict::TooFewCorners {
                found,
                threshold: self.threshold,
            };
        }

        match self.image_size {
            None => self.image_size = Some(detection.image_size),
            Some(expected) if expected != detection.image_size => match self.policy {
                ResolutionPolicy::Strict => {
                    return ViewVerdict::ResolutionMismatch {
                        expected,
                        got: detection.image_size,
                    };
                }
                ResolutionPolicy::FirstWins => {
                    log::warn!(
                        "image size {} differs from calibration resolution {}; keeping {}",
                        detection.image_size,
                        expected,
                        expected
                    );
                }
            },
            Some(_) => {}
        }

        let (corners, ids): (Vec<_>, Vec<_>) = detection
            .corners
            .into_iter()
            .map(|c| (c.position, c.id))
            .unzip();
        self.corners.push(corners);
        self.ids.push(ids);

        ViewVerdict::Accepted {
            view: self.corners.len() - 1,
            corners: found,
        }
    }

    /// Resolution recorded from the first accepted view.
    #[inline]
    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    /// Per-view ChArUco corner positions, in acceptance order.
    #[inline]
    pub fn corner_sets(&self) -> &[Vec<Point2<f32>>] {
        &self.corners
    }

    /// Per-view ChArUco corner ids, parallel to [`Self::corner_sets`].
    #[inline]
    pub fn id_sets(&self) -> &[Vec<u32>] {
        &self.ids
    }

    #[inline]
    pub fn accepted(&self) -> usize {
        self.corners.len()
    }

    #[inline]
    pub fn offered(&self) -> usize {
        self.offered
    }

    #[inline]
    pub fn rejected(&self) -> usize {
        self.offered - self.accepted()
    }

    /// Hand the accumulated views over to the solver.
    ///
    /// Fails when no view was ever accepted, i.e. the resolution is unknown.
    pub fn finish(self) -> Result<CorrespondenceSet, CalibError> {
        let Some(image_size) = self.image_size else {
            return Err(CalibError::NoBoardDetected {
                images: self.offered,
            });
        };
        Ok(CorrespondenceSet {
            corners: self.corners,
            ids: self.ids,
            image_size,
        })
    }
}

/// Everything a calibration solve consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrespondenceSet {
    pub corners: Vec<Vec<Point2<f32>>>,
    pub ids: Vec<Vec<u32>>,
    pub image_size: ImageSize,
}

impl CorrespondenceSet {
    #[inline]
    pub fn view_count(&self) -> usize {
        self.corners.len()
    }

    /// Board-plane object points for every view, parallel to `corners`.
    pub fn object_points(&self, board: &CharucoBoard) -> Result<Vec<Vec<Point3<f32>>>, CalibError> {
        self.ids
            .iter()
            .map(|view| {
                view.iter()
                    .map(|&id| {
                        board
                            .corner_object_point(id)
                            .ok_or(CalibError::UnknownCornerId { id })
                    })
                    .collect()
            })
            .collect()
    }
}
