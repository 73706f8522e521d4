use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "facegate", about = "facegate face enrollment and recognition CLI")]
struct Cli {
    /// Talk to a daemon on the session bus instead of the system bus
    #[arg(long, global = true)]
    session: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and recognize faces in an image
    Detect {
        /// Image file (JPEG, PNG, ...)
        image: PathBuf,
    },
    /// Enroll the face in an image under a person id
    Enroll {
        /// Display name of the person
        #[arg(short, long)]
        name: String,
        /// Numeric person id
        #[arg(short, long)]
        id: i64,
        /// Image file containing the face
        image: PathBuf,
    },
    /// List enrolled people
    List,
    /// Remove a person and all of their images
    Remove {
        /// Person id to remove
        id: i64,
    },
    /// Retrain the recognizer from the enrolled images
    Train,
    /// Show daemon status
    Status,
}

#[zbus::proxy(
    interface = "io.facegate.FaceGate1",
    default_service = "io.facegate.FaceGate1",
    default_path = "/io/facegate/FaceGate1",
    gen_blocking = false
)]
trait FaceGate {
    fn detect(&self, image: &str) -> zbus::Result<String>;
    fn add_face(&self, image: &str, person_name: &str, person_id: i64) -> zbus::Result<bool>;
    fn list_faces(&self) -> zbus::Result<String>;
    fn delete_face(&self, person_id: i64) -> zbus::Result<bool>;
    fn train(&self) -> zbus::Result<bool>;
    fn status(&self) -> zbus::Result<String>;
}

fn read_image(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(facegate_core::decode::encode_base64(&bytes))
}

fn print_json(raw: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("daemon returned malformed JSON")?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Print the outcome of a boolean operation; a `false` result is an error.
fn report(ok: bool, success: &str, failure: &str) -> Result<()> {
    if ok {
        println!("{success}");
        Ok(())
    } else {
        bail!("{failure}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let conn = if cli.session {
        zbus::Connection::session().await
    } else {
        zbus::Connection::system().await
    }
    .context("failed to connect to D-Bus")?;
    let proxy = FaceGateProxy::new(&conn)
        .await
        .context("facegated is not reachable")?;
    tracing::debug!(session = cli.session, "connected to facegated");

    match cli.command {
        Commands::Detect { image } => {
            let data = read_image(&image)?;
            print_json(&proxy.detect(&data).await?)?;
        }
        Commands::Enroll { name, id, image } => {
            let data = read_image(&image)?;
            let ok = proxy.add_face(&data, &name, id).await?;
            report(ok, "Face added successfully", "Failed to add face")?;
        }
        Commands::List => {
            print_json(&proxy.list_faces().await?)?;
        }
        Commands::Remove { id } => {
            let ok = proxy.delete_face(id).await?;
            report(ok, "Face deleted successfully", "Face not found")?;
        }
        Commands::Train => {
            let ok = proxy.train().await?;
            report(
                ok,
                "Model trained successfully",
                "Training failed - no faces registered",
            )?;
        }
        Commands::Status => {
            print_json(&proxy.status().await?)?;
        }
    }

    Ok(())
}
