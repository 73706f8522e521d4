//! Face detection.
//!
//! The service only sees [`FaceDetector`]. The production backend is OpenCV's
//! cascade classifier loaded from a `haarcascade_*.xml` file.

use crate::types::FaceRect;
use image::GrayImage;
use thiserror::Error;

const DEFAULT_SCALE_FACTOR: f64 = 1.1;
const DEFAULT_MIN_NEIGHBORS: u32 = 5;
const DEFAULT_MIN_FACE_SIZE: u32 = 30;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("cascade file not found: {0} (point FACEGATE_CASCADE_PATH at an OpenCV haarcascade XML)")]
    ModelNotFound(String),
    #[error("invalid cascade: {0}")]
    InvalidCascade(String),
    #[error("invalid detection parameters: {0}")]
    InvalidParams(String),
}

/// Anything that can find face boxes in a grayscale image.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage) -> Vec<FaceRect>;
}

/// `detectMultiScale` parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectParams {
    /// Growth of the search window between pyramid levels.
    pub scale_factor: f64,
    /// A face needs more than this many overlapping window hits to be kept.
    pub min_neighbors: u32,
    /// Smallest face edge, in source pixels.
    pub min_size: u32,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: DEFAULT_MIN_FACE_SIZE,
        }
    }
}

impl DetectParams {
    fn validate(&self) -> Result<(), DetectorError> {
        if !(self.scale_factor > 1.0 && self.scale_factor.is_finite()) {
            return Err(DetectorError::InvalidParams(format!(
                "scale factor must be greater than 1, got {}",
                self.scale_factor
            )));
        }
        if i32::try_from(self.min_neighbors).is_err() || i32::try_from(self.min_size).is_err() {
            return Err(DetectorError::InvalidParams(format!("{self:?} out of range")));
        }
        Ok(())
    }
}

#[cfg(feature = "opencv")]
mod imp {
    use super::{DetectParams, DetectorError, FaceDetector};
    use crate::cv::gray_to_mat;
    use crate::types::FaceRect;
    use image::GrayImage;
    use opencv::core::{Rect, Size, Vector};
    use opencv::objdetect::CascadeClassifier;
    use opencv::prelude::*;
    use std::path::Path;
    use std::sync::{Mutex, PoisonError};

    /// OpenCV cascade classifier with fixed scan parameters.
    pub struct HaarCascade {
        // detect_multi_scale needs `&mut`; the classifier is Send but not Sync.
        classifier: Mutex<CascadeClassifier>,
        params: DetectParams,
    }

    impl HaarCascade {
        /// Load a cascade XML file. Fails fast if the file is missing or
        /// OpenCV cannot make a classifier out of it.
        pub fn load(path: impl AsRef<Path>) -> Result<Self, DetectorError> {
            let path = path.as_ref();
            if !path.is_file() {
                return Err(DetectorError::ModelNotFound(path.display().to_string()));
            }
            let name = path.to_str().ok_or_else(|| {
                DetectorError::InvalidCascade(format!("non UTF-8 path {}", path.display()))
            })?;

            let classifier = CascadeClassifier::new(name)
                .map_err(|e| DetectorError::InvalidCascade(e.to_string()))?;
            let empty = CascadeClassifierTraitConst::empty(&classifier)
                .map_err(|e| DetectorError::InvalidCascade(e.to_string()))?;
            if empty {
                return Err(DetectorError::InvalidCascade(format!(
                    "{} holds no usable cascade",
                    path.display()
                )));
            }

            tracing::info!(path = %path.display(), "Haar cascade loaded");
            Ok(Self {
                classifier: Mutex::new(classifier),
                params: DetectParams::default(),
            })
        }

        /// Replace the scan parameters. The scale factor must be greater than 1.
        pub fn with_params(mut self, params: DetectParams) -> Result<Self, DetectorError> {
            params.validate()?;
            self.params = params;
            Ok(self)
        }

        pub fn params(&self) -> DetectParams {
            self.params
        }

        fn detect_multi_scale(&self, gray: &GrayImage) -> opencv::Result<Vec<FaceRect>> {
            if gray.width() == 0 || gray.height() == 0 {
                return Ok(Vec::new());
            }
            let mat = gray_to_mat(gray)?;
            let min = self.params.min_size as i32;
            let mut found = Vector::<Rect>::new();

            self.classifier
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .detect_multi_scale(
                    &mat,
                    &mut found,
                    self.params.scale_factor,
                    self.params.min_neighbors as i32,
                    0,
                    Size::new(min, min),
                    Size::new(0, 0),
                )?;

            Ok(found.iter().filter_map(to_face_rect).collect())
        }
    }

    impl FaceDetector for HaarCascade {
        fn detect(&self, gray: &GrayImage) -> Vec<FaceRect> {
            match self.detect_multi_scale(gray) {
                Ok(faces) => {
                    tracing::debug!(faces = faces.len(), "cascade scan");
                    faces
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cascade detection failed");
                    Vec::new()
                }
            }
        }
    }

    fn to_face_rect(r: Rect) -> Option<FaceRect> {
        Some(FaceRect::new(
            u32::try_from(r.x).ok()?,
            u32::try_from(r.y).ok()?,
            u32::try_from(r.width).ok()?,
            u32::try_from(r.height).ok()?,
        ))
    }
}

#[cfg(feature = "opencv")]
pub use imp::HaarCascade;
