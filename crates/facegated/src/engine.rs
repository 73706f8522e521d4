use std::sync::Arc;

use facegate_core::{FaceRegion, FaceService, PersonRecord, ServiceStats};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Clone-safe handle to the face service.
///
/// Detection, enrollment and training are CPU and disk bound, so each call
/// runs on the blocking pool. The service does its own locking, which lets
/// detections proceed against the current model while a retrain is running.
#[derive(Clone)]
pub struct FaceEngine {
    service: Arc<FaceService>,
}

impl FaceEngine {
    pub fn new(service: FaceService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&FaceService) -> T + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        Ok(tokio::task::spawn_blocking(move || f(&service)).await?)
    }

    pub async fn detect(&self, image: String) -> Result<Vec<FaceRegion>, EngineError> {
        self.run(move |s| s.detect_faces(&image)).await
    }

    pub async fn add_face(
        &self,
        image: String,
        name: String,
        person_id: i64,
    ) -> Result<bool, EngineError> {
        self.run(move |s| s.add_face(&image, &name, person_id)).await
    }

    pub async fn registered_faces(&self) -> Result<Vec<PersonRecord>, EngineError> {
        self.run(|s| s.get_registered_faces()).await
    }

    pub async fn delete_face(&self, person_id: i64) -> Result<bool, EngineError> {
        self.run(move |s| s.delete_face(person_id)).await
    }

    pub async fn train(&self) -> Result<bool, EngineError> {
        self.run(|s| s.train_model()).await
    }

    pub async fn stats(&self) -> Result<ServiceStats, EngineError> {
        self.run(|s| s.stats()).await
    }
}
