use zbus::interface;

use crate::engine::{EngineError, FaceEngine};

/// D-Bus interface for the facegate daemon.
///
/// Bus name: io.facegate.FaceGate1
/// Object path: /io/facegate/FaceGate1
pub struct FaceGateService {
    engine: FaceEngine,
}

impl FaceGateService {
    pub fn new(engine: FaceEngine) -> Self {
        Self { engine }
    }
}

fn failed(err: EngineError) -> zbus::fdo::Error {
    tracing::error!(error = %err, "request failed");
    zbus::fdo::Error::Failed(err.to_string())
}

#[interface(name = "io.facegate.FaceGate1")]
impl FaceGateService {
    /// Detect faces in a base64 image and recognize them if a model is trained.
    async fn detect(&self, image: String) -> zbus::fdo::Result<String> {
        let faces = self.engine.detect(image).await.map_err(failed)?;
        tracing::info!(count = faces.len(), "detect completed");
        Ok(serde_json::json!({
            "count": faces.len(),
            "faces": faces,
        })
        .to_string())
    }

    /// Enroll the first face found in a base64 image and retrain.
    async fn add_face(
        &self,
        image: String,
        person_name: String,
        person_id: i64,
    ) -> zbus::fdo::Result<bool> {
        tracing::info!(person_id, person_name = %person_name, "add_face requested");
        self.engine
            .add_face(image, person_name, person_id)
            .await
            .map_err(failed)
    }

    /// List enrolled people with their images.
    async fn list_faces(&self) -> zbus::fdo::Result<String> {
        let people = self.engine.registered_faces().await.map_err(failed)?;
        Ok(serde_json::json!({ "registered_faces": people }).to_string())
    }

    /// Remove a person and all of their images, then retrain.
    async fn delete_face(&self, person_id: i64) -> zbus::fdo::Result<bool> {
        tracing::info!(person_id, "delete_face requested");
        self.engine.delete_face(person_id).await.map_err(failed)
    }

    /// Retrain the recognizer from every enrolled image.
    async fn train(&self) -> zbus::fdo::Result<bool> {
        tracing::info!("train requested");
        self.engine.train().await.map_err(failed)
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let stats = self.engine.stats().await.map_err(failed)?;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "trained": stats.trained,
            "registered_people": stats.registered_people,
            "faces_dir": stats.faces_dir,
        })
        .to_string())
    }
}
