use std::path::PathBuf;

const DEFAULT_CASCADE_PATH: &str =
    "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml";

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the per-person face directories.
    pub faces_dir: PathBuf,
    /// Where the trained LBPH model is persisted (OpenCV FileStorage).
    pub model_path: PathBuf,
    /// Haar cascade XML used for detection.
    pub cascade_path: PathBuf,
    /// Recognitions with a distance below this are reported as known.
    pub known_threshold: f64,
    /// Serve on the session bus instead of the system bus.
    pub session_bus: bool,
}

impl Config {
    /// Load configuration from `FACEGATE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("FACEGATE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                var("XDG_DATA_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| {
                        let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                        PathBuf::from(home).join(".local/share")
                    })
                    .join("facegate")
            });

        Self {
            faces_dir: var("FACEGATE_FACES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("faces")),
            model_path: var("FACEGATE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("face_model.yml")),
            cascade_path: var("FACEGATE_CASCADE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CASCADE_PATH)),
            known_threshold: var("FACEGATE_KNOWN_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(facegate_core::KNOWN_DISTANCE_THRESHOLD),
            session_bus: var("FACEGATE_SESSION_BUS").is_some_and(|v| v == "1"),
        }
    }
}
