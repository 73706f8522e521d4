//! facegate-core: face enrollment and recognition engine.
//!
//! Detects faces with an OpenCV Haar cascade, recognizes them with an OpenCV
//! LBPH model trained on the enrolled crops, and keeps enrollments in a
//! per-person directory store. The OpenCV backends sit behind the `opencv`
//! feature (on by default); the service only depends on the
//! [`FaceDetector`] and [`RecognizerTrainer`] traits.

#[cfg(feature = "opencv")]
mod cv;
pub mod decode;
pub mod detector;
pub mod recognizer;
pub mod service;
pub mod store;
pub mod types;

pub use detector::{DetectParams, FaceDetector};
#[cfg(feature = "opencv")]
pub use detector::HaarCascade;
pub use recognizer::{FaceRecognizer, LbphParams, RecognizerTrainer};
#[cfg(feature = "opencv")]
pub use recognizer::{LbphModel, LbphTrainer};
pub use service::{FaceService, ServiceStats};
pub use store::{EnrolledImage, FaceStore, PersonRecord};
pub use types::{FaceRect, FaceRegion, Prediction, KNOWN_DISTANCE_THRESHOLD};
