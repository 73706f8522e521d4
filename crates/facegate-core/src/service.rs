//! Face service: detection, enrollment and recognition on top of the face store.
//!
//! Every public operation is infallible from the caller's side: failures are
//! logged and reported as `false` or an empty result.

use crate::decode::{decode_base64_image, DecodeError};
use crate::detector::FaceDetector;
use crate::recognizer::{FaceRecognizer, RecognizerError, RecognizerTrainer};
use crate::store::{FaceStore, PersonRecord, StoreError};
use crate::types::{FaceRect, FaceRegion, KNOWN_DISTANCE_THRESHOLD};
use image::{imageops, GrayImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Recognizer(#[from] RecognizerError),
    #[error("no face detected")]
    NoFaceDetected,
}

/// Snapshot of service state for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub trained: bool,
    pub registered_people: usize,
    pub faces_dir: String,
}

pub struct FaceService {
    detector: Box<dyn FaceDetector>,
    trainer: Box<dyn RecognizerTrainer>,
    store: FaceStore,
    model_path: PathBuf,
    known_threshold: f64,
    /// Current recognizer. Readers clone the `Arc` and predict without holding
    /// the lock, so a retrain never blocks or tears an in-flight prediction.
    model: RwLock<Option<Arc<dyn FaceRecognizer>>>,
    train_lock: Mutex<()>,
}

impl FaceService {
    /// Build the service, picking up a previously trained model if one loads.
    pub fn new(
        detector: Box<dyn FaceDetector>,
        trainer: Box<dyn RecognizerTrainer>,
        store: FaceStore,
        model_path: impl Into<PathBuf>,
    ) -> Self {
        let model_path = model_path.into();
        let model: Option<Arc<dyn FaceRecognizer>> = match trainer.load(&model_path) {
            Ok(model) => Some(Arc::from(model)),
            Err(RecognizerError::ModelNotFound(_)) => {
                tracing::info!(path = %model_path.display(), "no trained model yet");
                None
            }
            Err(e) => {
                tracing::warn!(path = %model_path.display(), error = %e, "ignoring unusable model, starting untrained");
                None
            }
        };

        Self {
            detector,
            trainer,
            store,
            model_path,
            known_threshold: KNOWN_DISTANCE_THRESHOLD,
            model: RwLock::new(model),
            train_lock: Mutex::new(()),
        }
    }

    /// Override the distance below which a face counts as known.
    pub fn with_known_threshold(mut self, threshold: f64) -> Self {
        self.known_threshold = threshold;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn is_trained(&self) -> bool {
        self.current_model().is_some()
    }

    fn current_model(&self) -> Option<Arc<dyn FaceRecognizer>> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_model(&self, model: Option<Arc<dyn FaceRecognizer>>) {
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = model;
    }

    /// Detect faces in a base64 image and recognize them if a model is trained.
    pub fn detect_faces(&self, image_data: &str) -> Vec<FaceRegion> {
        match self.try_detect(image_data) {
            Ok(regions) => regions,
            Err(e) => {
                tracing::warn!(error = %e, "face detection failed");
                Vec::new()
            }
        }
    }

    fn try_detect(&self, image_data: &str) -> Result<Vec<FaceRegion>, ServiceError> {
        let gray = decode_base64_image(image_data)?.to_luma8();
        let rects = self.find_faces(&gray);
        let model = self.current_model();

        let regions: Vec<FaceRegion> = rects
            .into_iter()
            .enumerate()
            .map(|(i, rect)| {
                let region = FaceRegion::unrecognized(i, rect);
                let Some(model) = &model else {
                    return region;
                };
                match model.predict(&crop(&gray, rect)) {
                    Ok(prediction) => region.with_prediction(prediction, self.known_threshold),
                    Err(e) => {
                        tracing::warn!(region = i, error = %e, "recognition failed");
                        region
                    }
                }
            })
            .collect();

        tracing::debug!(
            faces = regions.len(),
            recognized = regions.iter().filter(|r| r.is_known == Some(true)).count(),
            "detect"
        );
        Ok(regions)
    }

    /// Enroll the first face found in a base64 image, then retrain.
    ///
    /// Succeeds once the crop and record are on disk; the retrain outcome
    /// does not affect the result.
    pub fn add_face(&self, image_data: &str, name: &str, person_id: i64) -> bool {
        match self.try_enroll(image_data, name, person_id) {
            Ok(path) => {
                tracing::info!(person_id, name, path = %path.display(), "face enrolled");
                self.train_model();
                true
            }
            Err(e) => {
                tracing::warn!(person_id, name, error = %e, "face enrollment failed");
                false
            }
        }
    }

    fn try_enroll(&self, image_data: &str, name: &str, person_id: i64) -> Result<PathBuf, ServiceError> {
        let gray = decode_base64_image(image_data)?.to_luma8();
        let faces = self.find_faces(&gray);
        if faces.len() > 1 {
            tracing::debug!(count = faces.len(), "multiple faces in enrollment image, using the first");
        }
        let rect = faces.first().copied().ok_or(ServiceError::NoFaceDetected)?;
        Ok(self.store.save_face_crop(person_id, name, &crop(&gray, rect))?)
    }

    /// Every enrolled person with a valid record.
    pub fn get_registered_faces(&self) -> Vec<PersonRecord> {
        self.store.list_people().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "listing enrolled faces failed");
            Vec::new()
        })
    }

    /// Remove a person and retrain. Returns `false` if the person is unknown.
    pub fn delete_face(&self, person_id: i64) -> bool {
        match self.store.delete_person(person_id) {
            Ok(true) => {
                self.train_model();
                true
            }
            Ok(false) => {
                tracing::info!(person_id, "delete requested for unknown person");
                false
            }
            Err(e) => {
                tracing::warn!(person_id, error = %e, "face deletion failed");
                false
            }
        }
    }

    /// Retrain from every enrolled crop and persist the model.
    ///
    /// On any failure, including an empty store, the service becomes untrained
    /// and the stale artifact is removed.
    pub fn train_model(&self) -> bool {
        let _guard = self.train_lock.lock().unwrap_or_else(PoisonError::into_inner);

        match self.try_train() {
            Ok(model) => {
                tracing::info!(faces = model.sample_count(), path = %self.model_path.display(), "model trained");
                self.set_model(Some(Arc::from(model)));
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "training failed, recognizer is untrained");
                self.set_model(None);
                self.discard_artifact();
                false
            }
        }
    }

    fn try_train(&self) -> Result<Box<dyn FaceRecognizer>, ServiceError> {
        let faces = self.store.load_all_faces_for_training()?;
        let model = self.trainer.train(&faces)?;
        model.save(&self.model_path)?;
        Ok(model)
    }

    fn discard_artifact(&self) {
        match std::fs::remove_file(&self.model_path) {
            Ok(()) => tracing::debug!(path = %self.model_path.display(), "removed stale model"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.model_path.display(), error = %e, "could not remove stale model"),
        }
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            trained: self.is_trained(),
            registered_people: self.get_registered_faces().len(),
            faces_dir: self.store.root().display().to_string(),
        }
    }

    fn find_faces(&self, gray: &GrayImage) -> Vec<FaceRect> {
        let (w, h) = gray.dimensions();
        self.detector
            .detect(gray)
            .into_iter()
            .filter_map(|r| r.clamp_to(w, h))
            .collect()
    }
}

fn crop(gray: &GrayImage, rect: FaceRect) -> GrayImage {
    imageops::crop_imm(gray, rect.x, rect.y, rect.width, rect.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::encode_base64;
    use crate::types::Prediction;
    use image::{ImageFormat, Luma};
    use std::io::Cursor;
    use std::thread;

    const FACE: FaceRect = FaceRect { x: 30, y: 30, width: 36, height: 36 };

    /// Always reports the same boxes, whatever the image.
    struct FixedDetector(Vec<FaceRect>);

    impl FaceDetector for FixedDetector {
        fn detect(&self, _gray: &GrayImage) -> Vec<FaceRect> {
            self.0.clone()
        }
    }

    /// Nearest neighbor on mean crop intensity, persisted as JSON.
    #[derive(Default)]
    struct MeanTrainer {
        broken_predict: bool,
    }

    struct MeanModel {
        samples: Vec<(f64, i64)>,
        broken_predict: bool,
    }

    fn mean(img: &GrayImage) -> f64 {
        let n = img.as_raw().len().max(1) as f64;
        img.as_raw().iter().map(|&v| v as f64).sum::<f64>() / n
    }

    impl RecognizerTrainer for MeanTrainer {
        fn train(&self, faces: &[(GrayImage, i64)]) -> Result<Box<dyn FaceRecognizer>, RecognizerError> {
            if faces.is_empty() {
                return Err(RecognizerError::EmptyTrainingSet);
            }
            Ok(Box::new(MeanModel {
                samples: faces.iter().map(|(img, id)| (mean(img), *id)).collect(),
                broken_predict: self.broken_predict,
            }))
        }

        fn load(&self, path: &Path) -> Result<Box<dyn FaceRecognizer>, RecognizerError> {
            if !path.exists() {
                return Err(RecognizerError::ModelNotFound(path.display().to_string()));
            }
            let samples: Vec<(f64, i64)> = serde_json::from_slice(&std::fs::read(path)?)
                .map_err(|e| RecognizerError::Corrupt(e.to_string()))?;
            if samples.is_empty() {
                return Err(RecognizerError::Corrupt("no samples".into()));
            }
            Ok(Box::new(MeanModel { samples, broken_predict: self.broken_predict }))
        }
    }

    impl FaceRecognizer for MeanModel {
        fn predict(&self, face: &GrayImage) -> Result<Prediction, RecognizerError> {
            if self.broken_predict {
                return Err(RecognizerError::Backend("predict unavailable".into()));
            }
            let m = mean(face);
            let (distance, label) = self
                .samples
                .iter()
                .map(|(s, id)| ((s - m).abs(), *id))
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .ok_or_else(|| RecognizerError::Corrupt("no samples".into()))?;
            Ok(Prediction { label, distance })
        }

        fn save(&self, path: &Path) -> Result<(), RecognizerError> {
            let json = serde_json::to_vec(&self.samples)
                .map_err(|e| RecognizerError::Corrupt(e.to_string()))?;
            std::fs::write(path, json)?;
            Ok(())
        }

        fn sample_count(&self) -> usize {
            self.samples.len()
        }
    }

    /// Smooth ramp inside the face box on a flat background.
    fn ramp_image() -> GrayImage {
        GrayImage::from_fn(100, 100, |x, y| {
            if (30..66).contains(&x) && (30..66).contains(&y) {
                Luma([(5 * (x - 30) + 2 * (y - 30)) as u8])
            } else {
                Luma([128])
            }
        })
    }

    /// Checkerboard inside the face box.
    fn checker_image() -> GrayImage {
        GrayImage::from_fn(100, 100, |x, y| {
            if (30..66).contains(&x) && (30..66).contains(&y) {
                Luma([if ((x / 6) + (y / 6)) % 2 == 0 { 40 } else { 250 }])
            } else {
                Luma([128])
            }
        })
    }

    fn to_base64(img: &GrayImage) -> String {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        encode_base64(&buf.into_inner())
    }

    fn service_in(dir: &Path, faces: Vec<FaceRect>) -> FaceService {
        let store = FaceStore::open(dir.join("faces")).unwrap();
        FaceService::new(
            Box::new(FixedDetector(faces)),
            Box::<MeanTrainer>::default(),
            store,
            dir.join("face_model.yml"),
        )
    }

    #[test]
    fn test_starts_untrained_without_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        assert!(!service.is_trained());
    }

    #[test]
    fn test_corrupt_artifact_starts_untrained() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("face_model.yml"), b"garbage").unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        assert!(!service.is_trained());
    }

    #[test]
    fn test_no_faces_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![]);
        let image = to_base64(&ramp_image());

        assert!(service.detect_faces(&image).is_empty());
        assert!(!service.add_face(&image, "Nobody", 1));
        assert!(service.get_registered_faces().is_empty());
    }

    #[test]
    fn test_undecodable_image() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);

        assert!(service.detect_faces("definitely not an image").is_empty());
        assert!(!service.add_face("data:image/png;base64,AAAA", "Bad", 1));
        assert!(service.get_registered_faces().is_empty());
    }

    #[test]
    fn test_untrained_detect_returns_geometry_only() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        let regions = service.detect_faces(&to_base64(&ramp_image()));

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, 0);
        assert_eq!(regions[0].rect(), FACE);
        assert_eq!(regions[0].confidence, 0.0);
        assert_eq!(regions[0].recognized_id, None);
        assert_eq!(regions[0].is_known, None);
    }

    #[test]
    fn test_enroll_then_recognize() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        let image = to_base64(&ramp_image());

        assert!(service.add_face(&image, "Bob", 1));
        assert!(service.is_trained());
        assert!(tmp.path().join("face_model.yml").is_file());

        let regions = service.detect_faces(&image);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].recognized_id, Some(1));
        assert_eq!(regions[0].is_known, Some(true));
        assert!(regions[0].confidence < KNOWN_DISTANCE_THRESHOLD);
    }

    #[test]
    fn test_enroll_listing() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        assert!(service.add_face(&to_base64(&ramp_image()), "Alice", 7));

        let people = service.get_registered_faces();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].id, 7);
        assert_eq!(people[0].name, "Alice");
        assert_eq!(people[0].images.len(), 1);
    }

    #[test]
    fn test_enroll_twice_accumulates() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        let image = to_base64(&ramp_image());

        assert!(service.add_face(&image, "Bob", 1));
        assert!(service.add_face(&image, "Bob", 1));
        let people = service.get_registered_faces();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].images.len(), 2);
    }

    #[test]
    fn test_enroll_uses_first_face_only() {
        let tmp = tempfile::tempdir().unwrap();
        let second = FaceRect::new(0, 0, 20, 20);
        let service = service_in(tmp.path(), vec![FACE, second]);
        assert!(service.add_face(&to_base64(&ramp_image()), "Bob", 1));

        let people = service.get_registered_faces();
        assert_eq!(people[0].images.len(), 1);
        let stored = image::open(&people[0].images[0].path).unwrap();
        assert_eq!((stored.width(), stored.height()), (FACE.width, FACE.height));
    }

    #[test]
    fn test_detect_clamps_boxes_to_image() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FaceRect::new(90, 90, 30, 30)]);
        let regions = service.detect_faces(&to_base64(&ramp_image()));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].rect(), FaceRect::new(90, 90, 10, 10));
    }

    #[test]
    fn test_train_with_nothing_enrolled() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        assert!(!service.train_model());
        assert!(!service.is_trained());
    }

    #[test]
    fn test_delete_discards_model_when_store_empties() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        assert!(service.add_face(&to_base64(&ramp_image()), "Bob", 1));
        assert!(service.is_trained());

        assert!(service.delete_face(1));
        assert!(!service.is_trained());
        assert!(!tmp.path().join("face_model.yml").exists());
        assert!(!service.train_model());
    }

    #[test]
    fn test_delete_unknown_person() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        assert!(service.add_face(&to_base64(&ramp_image()), "Bob", 1));

        let listing = || {
            let mut paths: Vec<_> = std::fs::read_dir(tmp.path().join("faces"))
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect();
            paths.sort();
            paths
        };
        let before = listing();
        assert!(!service.delete_face(42));
        assert_eq!(before, listing());
        assert!(service.is_trained());
    }

    #[test]
    fn test_model_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let image = to_base64(&ramp_image());
        {
            let service = service_in(tmp.path(), vec![FACE]);
            assert!(service.add_face(&image, "Bob", 1));
        }

        let service = service_in(tmp.path(), vec![FACE]);
        assert!(service.is_trained());
        assert_eq!(service.detect_faces(&image)[0].recognized_id, Some(1));
    }

    #[test]
    fn test_distinguishes_two_people() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        let ramp = to_base64(&ramp_image());
        let checker = to_base64(&checker_image());

        assert!(service.add_face(&ramp, "Bob", 1));
        assert!(service.add_face(&checker, "Eve", 2));

        assert_eq!(service.detect_faces(&ramp)[0].recognized_id, Some(1));
        assert_eq!(service.detect_faces(&checker)[0].recognized_id, Some(2));
    }

    #[test]
    fn test_stats() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), vec![FACE]);
        assert!(service.add_face(&to_base64(&ramp_image()), "Bob", 1));

        let stats = service.stats();
        assert!(stats.trained);
        assert_eq!(stats.registered_people, 1);
    }

    #[test]
    fn test_predictions_stay_consistent_during_retrain() {
        let tmp = tempfile::tempdir().unwrap();
        let service = Arc::new(service_in(tmp.path(), vec![FACE]));
        let ramp = to_base64(&ramp_image());
        assert!(service.add_face(&ramp, "Bob", 1));

        let reader = {
            let service = Arc::clone(&service);
            let ramp = ramp.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let regions = service.detect_faces(&ramp);
                    assert_eq!(regions.len(), 1);
                    // Old and new models both contain Bob.
                    assert_eq!(regions[0].recognized_id, Some(1));
                }
            })
        };

        let checker = to_base64(&checker_image());
        for id in 2..6 {
            assert!(service.add_face(&checker, "Other", id));
            assert!(service.train_model());
        }

        reader.join().unwrap();
        assert!(service.is_trained());
    }

    #[test]
    fn test_recognition_error_leaves_region_unrecognized() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FaceStore::open(tmp.path().join("faces")).unwrap();
        let service = FaceService::new(
            Box::new(FixedDetector(vec![FACE])),
            Box::new(MeanTrainer { broken_predict: true }),
            store,
            tmp.path().join("face_model.yml"),
        );
        let image = to_base64(&ramp_image());
        assert!(service.add_face(&image, "Bob", 1));
        assert!(service.is_trained());

        let regions = service.detect_faces(&image);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].recognized_id, None);
        assert_eq!(regions[0].is_known, None);
    }

    #[cfg(feature = "opencv")]
    mod opencv_backend {
        use super::*;
        use crate::detector::fixtures::write_cascade;
        use crate::detector::HaarCascade;
        use crate::recognizer::LbphTrainer;
        use image::{Rgb, RgbImage};

        fn lbph_service_in(dir: &Path, detector: Box<dyn FaceDetector>) -> FaceService {
            let store = FaceStore::open(dir.join("faces")).unwrap();
            FaceService::new(
                detector,
                Box::<LbphTrainer>::default(),
                store,
                dir.join("face_model.yml"),
            )
        }

        /// Color photo with a dark-over-bright block the test cascade fires on.
        fn pattern_photo() -> String {
            let img = RgbImage::from_fn(100, 100, |x, y| {
                let inside = (26..74).contains(&x) && (26..74).contains(&y);
                match (inside, y < 50) {
                    (true, true) => Rgb([20, 0, 40]),
                    (true, false) => Rgb([250, 240, 200]),
                    (false, _) => Rgb([120, 130, 140]),
                }
            });
            let mut buf = Cursor::new(Vec::new());
            img.write_to(&mut buf, ImageFormat::Png).unwrap();
            encode_base64(&buf.into_inner())
        }

        fn flat_photo() -> String {
            let img = RgbImage::from_pixel(100, 100, Rgb([90, 160, 30]));
            let mut buf = Cursor::new(Vec::new());
            img.write_to(&mut buf, ImageFormat::Png).unwrap();
            encode_base64(&buf.into_inner())
        }

        #[test]
        fn test_lbph_enroll_then_recognize() {
            let tmp = tempfile::tempdir().unwrap();
            let service = lbph_service_in(tmp.path(), Box::new(FixedDetector(vec![FACE])));
            let image = to_base64(&ramp_image());

            assert!(service.add_face(&image, "Bob", 1));
            assert!(service.is_trained());
            assert!(tmp.path().join("face_model.yml").is_file());

            let regions = service.detect_faces(&image);
            assert_eq!(regions.len(), 1);
            assert_eq!(regions[0].recognized_id, Some(1));
            assert_eq!(regions[0].is_known, Some(true));
            assert!(regions[0].confidence < KNOWN_DISTANCE_THRESHOLD);
        }

        #[test]
        fn test_lbph_distinguishes_two_people_across_restart() {
            let tmp = tempfile::tempdir().unwrap();
            let ramp = to_base64(&ramp_image());
            let checker = to_base64(&checker_image());
            {
                let service = lbph_service_in(tmp.path(), Box::new(FixedDetector(vec![FACE])));
                assert!(service.add_face(&ramp, "Bob", 1));
                assert!(service.add_face(&checker, "Eve", 2));
            }

            let service = lbph_service_in(tmp.path(), Box::new(FixedDetector(vec![FACE])));
            assert!(service.is_trained());
            assert_eq!(service.detect_faces(&ramp)[0].recognized_id, Some(1));
            assert_eq!(service.detect_faces(&checker)[0].recognized_id, Some(2));
        }

        #[test]
        fn test_cascade_detects_color_photo() {
            let tmp = tempfile::tempdir().unwrap();
            let cascade = HaarCascade::load(write_cascade(tmp.path())).unwrap();
            let service = lbph_service_in(tmp.path(), Box::new(cascade));

            let regions = service.detect_faces(&pattern_photo());
            assert!(!regions.is_empty(), "pattern should be detected");
            for (i, r) in regions.iter().enumerate() {
                assert_eq!(r.id, i);
                assert!(r.width >= 30 && r.height >= 30, "{r:?} below min size");
                assert!(r.x + r.width <= 100 && r.y + r.height <= 100, "{r:?} outside image");
                assert_eq!(r.recognized_id, None);
            }
            assert!(service.detect_faces(&flat_photo()).is_empty());
        }

        #[test]
        fn test_cascade_enrollment_round_trip() {
            let tmp = tempfile::tempdir().unwrap();
            let cascade = HaarCascade::load(write_cascade(tmp.path())).unwrap();
            let service = lbph_service_in(tmp.path(), Box::new(cascade));

            assert!(!service.add_face(&flat_photo(), "Nobody", 3));
            assert!(service.add_face(&pattern_photo(), "Ann", 4));
            assert!(service.is_trained());

            let regions = service.detect_faces(&pattern_photo());
            assert!(!regions.is_empty());
            assert_eq!(regions[0].recognized_id, Some(4));
        }

        #[test]
        fn test_cascade_respects_min_size() {
            let tmp = tempfile::tempdir().unwrap();
            let cascade = HaarCascade::load(write_cascade(tmp.path()))
                .unwrap()
                .with_params(crate::detector::DetectParams {
                    min_size: 150,
                    ..Default::default()
                })
                .unwrap();
            let service = lbph_service_in(tmp.path(), Box::new(cascade));
            assert!(service.detect_faces(&pattern_photo()).is_empty());
        }
    }
}
