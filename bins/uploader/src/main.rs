//! Inhamissa image uploader
//!
//! Uploads a local image through the fallback pipeline and prints the outcome as JSON.
//!
//! ```text
//! inhamissa-upload <path> <owner-id>
//! ```

use anyhow::{Context, bail};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inhamissa_core::upload::{UploadRequest, Uploader};
use inhamissa_shared::{AppConfig, OwnerId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inhamissa_core=debug,inhamissa_upload=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(owner)) = (args.next(), args.next()) else {
        bail!("usage: inhamissa-upload <path> <owner-id>");
    };
    let owner = OwnerId::parse(owner).context("invalid owner id")?;

    let config = AppConfig::load().context("failed to load configuration")?;
    if config.storage.is_none() {
        warn!("No [storage] section configured, fallback to object storage is disabled");
    }
    let uploader = Uploader::from_app_config(&config)?;

    let request = UploadRequest::from_path(&path, owner).await?;
    info!(
        path = %path,
        mime_type = request.mime_type(),
        bytes = request.byte_len(),
        "Uploading image"
    );

    let outcome = uploader
        .upload_image(request, |percent| info!(percent, "Upload progress"))
        .await?;

    info!(url = %outcome.url, method = %outcome.method, "Upload complete");
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
