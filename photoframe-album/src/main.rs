use anyhow::Context;
use photoframe_album::config::ConfigManager;
use photoframe_album::{ImageAlbum, Plugin};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config first so we can honor logging.filter directive.
    let path = std::env::args().nth(1).map(PathBuf::from);
    let manager = ConfigManager::load(path).await?;
    let cfg = manager.to_struct()?;
    let filter_directive = cfg
        .logging
        .as_ref()
        .and_then(|l| l.filter.clone())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info,photoframe_album=debug".to_string());
    fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .init();
    tracing::debug!(config = %manager.path().display(), "loaded config");

    let img = ImageAlbum
        .generate_image(&cfg.settings, &cfg.device)
        .await
        .context("generating album image")?;
    let out = cfg.output_path();
    img.save(&out)
        .with_context(|| format!("writing image to {}", out.display()))?;
    tracing::info!(path = %out.display(), width = img.width(), height = img.height(), "wrote image");
    Ok(())
}
