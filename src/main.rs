use anyhow::Result;
use clap::Parser;
use image_catalog::config::AppConfig;
use image_catalog::indexer;
use image_catalog::query::CatalogHandle;
use image_catalog::search::SearchEngine;
use image_catalog::sync::{ContentSync, GitSync, StaticSync};
use image_catalog::web_server;
use log::info;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Serves images and metadata from a git-tracked content tree")]
struct Cli {
    /// Directory holding default.toml and the per-environment overrides
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Use the content root as-is instead of pulling it first
    #[arg(long)]
    skip_sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config_dir)?;

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting image-catalog");

    let sync: Arc<dyn ContentSync> = if cli.skip_sync {
        Arc::new(StaticSync::new("unversioned"))
    } else {
        Arc::new(GitSync::new(config.content_root.clone(), config.repo_url.clone()))
    };

    // a broken content tree stops startup; no partial catalog is served
    let (catalog, version) = indexer::sync_and_build(sync.as_ref(), &config).await?;
    let handle = CatalogHandle::new(catalog, version, SearchEngine::default());

    let config = Arc::new(config);
    indexer::start_refresh_job(config.clone(), sync, handle.clone());

    if let Err(e) = web_server::start_web_server(config, handle).await {
        log::error!("Web server error: {}", e);
    }

    info!("Image-catalog finished");

    Ok(())
}
