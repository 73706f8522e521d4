use anyhow::{Context, Result};
use facegate_core::{FaceService, FaceStore, HaarCascade, LbphTrainer};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;

const BUS_NAME: &str = "io.facegate.FaceGate1";
const OBJECT_PATH: &str = "/io/facegate/FaceGate1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("facegated starting");

    let config = config::Config::from_env();

    let cascade = HaarCascade::load(&config.cascade_path).with_context(|| {
        format!(
            "failed to load Haar cascade from {}",
            config.cascade_path.display()
        )
    })?;
    tracing::info!(path = %config.cascade_path.display(), "cascade loaded");

    let store = FaceStore::open(&config.faces_dir)
        .with_context(|| format!("failed to open face store {}", config.faces_dir.display()))?;
    tracing::info!(path = %config.faces_dir.display(), "face store opened");

    let service = FaceService::new(
        Box::new(cascade),
        Box::<LbphTrainer>::default(),
        store,
        &config.model_path,
    )
    .with_known_threshold(config.known_threshold);
    tracing::info!(
        model = %config.model_path.display(),
        trained = service.is_trained(),
        threshold = config.known_threshold,
        "face service ready"
    );

    let iface = dbus_interface::FaceGateService::new(engine::FaceEngine::new(service));

    let builder = if config.session_bus {
        zbus::connection::Builder::session()?
    } else {
        zbus::connection::Builder::system()?
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, iface)?
        .build()
        .await
        .with_context(|| format!("failed to acquire bus name {BUS_NAME}"))?;

    tracing::info!(
        name = BUS_NAME,
        session = config.session_bus,
        "facegated ready"
    );

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("facegated shutting down");

    Ok(())
}
