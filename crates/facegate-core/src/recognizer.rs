//! LBPH face recognition.
//!
//! [`RecognizerTrainer`] builds and reloads models; a trained
//! [`FaceRecognizer`] answers nearest-neighbor predictions. The production
//! backend is OpenCV's `LBPHFaceRecognizer`, persisted in OpenCV's own
//! FileStorage format (YAML for a `.yml` path).

use crate::types::Prediction;
use image::GrayImage;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const LBP_RADIUS: i32 = 1;
const LBP_NEIGHBORS: i32 = 8;
const LBP_GRID_X: i32 = 8;
const LBP_GRID_Y: i32 = 8;
const MAX_RADIUS: i32 = 16;
const MAX_NEIGHBORS: i32 = 16;
const MAX_GRID: i32 = 64;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("no faces to train on")]
    EmptyTrainingSet,
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("model I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt model: {0}")]
    Corrupt(String),
    #[error("recognizer backend: {0}")]
    Backend(String),
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for RecognizerError {
    fn from(e: opencv::Error) -> Self {
        RecognizerError::Backend(e.to_string())
    }
}

/// A trained model.
pub trait FaceRecognizer: Send + Sync {
    /// Closest enrolled person to `face`.
    fn predict(&self, face: &GrayImage) -> Result<Prediction, RecognizerError>;
    /// Persist the model, replacing any previous artifact atomically.
    fn save(&self, path: &Path) -> Result<(), RecognizerError>;
    /// Number of training crops the model was built from.
    fn sample_count(&self) -> usize;
}

/// Builds models from labeled crops and reloads persisted ones.
pub trait RecognizerTrainer: Send + Sync {
    fn train(&self, faces: &[(GrayImage, i64)]) -> Result<Box<dyn FaceRecognizer>, RecognizerError>;
    fn load(&self, path: &Path) -> Result<Box<dyn FaceRecognizer>, RecognizerError>;
}

/// Local binary pattern parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LbphParams {
    pub radius: i32,
    pub neighbors: i32,
    pub grid_x: i32,
    pub grid_y: i32,
}

impl Default for LbphParams {
    fn default() -> Self {
        Self {
            radius: LBP_RADIUS,
            neighbors: LBP_NEIGHBORS,
            grid_x: LBP_GRID_X,
            grid_y: LBP_GRID_Y,
        }
    }
}

impl LbphParams {
    /// Reject parameters no sane model was trained with.
    pub fn validate(&self) -> Result<(), RecognizerError> {
        let ok = (1..=MAX_RADIUS).contains(&self.radius)
            && (1..=MAX_NEIGHBORS).contains(&self.neighbors)
            && (1..=MAX_GRID).contains(&self.grid_x)
            && (1..=MAX_GRID).contains(&self.grid_y);
        if ok {
            Ok(())
        } else {
            Err(RecognizerError::Corrupt(format!("bad LBPH parameters {self:?}")))
        }
    }
}

/// Temporary sibling for atomic writes. Keeps the extension last, since
/// OpenCV picks the storage format from it.
fn temp_path(path: &Path) -> std::path::PathBuf {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yml");
    path.with_extension(format!("tmp.{ext}"))
}

#[cfg(feature = "opencv")]
mod imp {
    use super::{temp_path, FaceRecognizer, LbphParams, RecognizerError, RecognizerTrainer};
    use crate::cv::gray_to_mat;
    use crate::types::Prediction;
    use image::GrayImage;
    use opencv::core::{Mat, Ptr, Vector};
    use opencv::face::LBPHFaceRecognizer;
    use opencv::prelude::*;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::{Mutex, PoisonError};

    /// Trains and loads [`LbphModel`]s.
    #[derive(Debug, Clone, Default)]
    pub struct LbphTrainer {
        params: LbphParams,
    }

    impl LbphTrainer {
        pub fn with_params(params: LbphParams) -> Result<Self, RecognizerError> {
            params.validate()?;
            Ok(Self { params })
        }
    }

    fn create(params: &LbphParams) -> Result<Ptr<LBPHFaceRecognizer>, RecognizerError> {
        // Thresholding happens in the service; OpenCV always reports the nearest label.
        Ok(LBPHFaceRecognizer::create(
            params.radius,
            params.neighbors,
            params.grid_x,
            params.grid_y,
            f64::MAX,
        )?)
    }

    fn path_str(path: &Path) -> Result<&str, RecognizerError> {
        path.to_str()
            .ok_or_else(|| RecognizerError::Corrupt(format!("non UTF-8 path {}", path.display())))
    }

    impl RecognizerTrainer for LbphTrainer {
        fn train(
            &self,
            faces: &[(GrayImage, i64)],
        ) -> Result<Box<dyn FaceRecognizer>, RecognizerError> {
            if faces.is_empty() {
                return Err(RecognizerError::EmptyTrainingSet);
            }

            // OpenCV labels are i32; person ids are mapped to dense labels and
            // kept as label info, which is persisted with the model.
            let mut dense: BTreeMap<i64, i32> = BTreeMap::new();
            for (_, id) in faces {
                let next = dense.len() as i32;
                dense.entry(*id).or_insert(next);
            }

            let mut images = Vector::<Mat>::with_capacity(faces.len());
            let mut labels = Vector::<i32>::with_capacity(faces.len());
            for (img, id) in faces {
                images.push(gray_to_mat(img)?);
                labels.push(dense[id]);
            }

            let mut model = create(&self.params)?;
            model.train(&images, &labels)?;
            for (id, label) in &dense {
                model.set_label_info(*label, &id.to_string())?;
            }

            tracing::debug!(faces = faces.len(), people = dense.len(), "trained LBPH model");
            Ok(Box::new(LbphModel::new(model, faces.len())))
        }

        fn load(&self, path: &Path) -> Result<Box<dyn FaceRecognizer>, RecognizerError> {
            if !path.exists() {
                return Err(RecognizerError::ModelNotFound(path.display().to_string()));
            }

            let mut model = create(&LbphParams::default())?;
            FaceRecognizerTrait::read(&mut model, path_str(path)?)
                .map_err(|e| RecognizerError::Corrupt(e.to_string()))?;
            let samples = validate(&model)?;

            tracing::info!(path = %path.display(), faces = samples, "loaded LBPH model");
            Ok(Box::new(LbphModel::new(model, samples)))
        }
    }

    /// Check a freshly read model before it is allowed to predict.
    fn validate(model: &Ptr<LBPHFaceRecognizer>) -> Result<usize, RecognizerError> {
        let params = LbphParams {
            radius: model.get_radius()?,
            neighbors: model.get_neighbors()?,
            grid_x: model.get_grid_x()?,
            grid_y: model.get_grid_y()?,
        };
        params.validate()?;

        let samples = model.get_histograms()?.len();
        let labels = model.get_labels()?;
        let label_count = (labels.rows().max(0) as usize) * (labels.cols().max(0) as usize);
        if samples == 0 || samples != label_count {
            return Err(RecognizerError::Corrupt(format!(
                "{samples} histograms for {label_count} labels"
            )));
        }
        Ok(samples)
    }

    /// Trained OpenCV LBPH model.
    pub struct LbphModel {
        // OpenCV algorithms are Send but not Sync.
        inner: Mutex<Ptr<LBPHFaceRecognizer>>,
        samples: usize,
    }

    impl LbphModel {
        fn new(model: Ptr<LBPHFaceRecognizer>, samples: usize) -> Self {
            Self {
                inner: Mutex::new(model),
                samples,
            }
        }
    }

    impl FaceRecognizer for LbphModel {
        fn predict(&self, face: &GrayImage) -> Result<Prediction, RecognizerError> {
            let mat = gray_to_mat(face)?;
            let model = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

            let mut label = -1;
            let mut distance = f64::MAX;
            model.predict(&mat, &mut label, &mut distance)?;

            let info = model.get_label_info(label)?;
            let person_id = info
                .parse::<i64>()
                .map_err(|_| RecognizerError::Corrupt(format!("no person id for label {label}")))?;
            Ok(Prediction {
                label: person_id,
                distance,
            })
        }

        fn save(&self, path: &Path) -> Result<(), RecognizerError> {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let tmp = temp_path(path);
            {
                let model = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
                FaceRecognizerTraitConst::write(&*model, path_str(&tmp)?)?;
            }
            std::fs::rename(&tmp, path)?;

            tracing::debug!(path = %path.display(), faces = self.samples, "saved LBPH model");
            Ok(())
        }

        fn sample_count(&self) -> usize {
            self.samples
        }
    }
}

#[cfg(feature = "opencv")]
pub use imp::{LbphModel, LbphTrainer};
