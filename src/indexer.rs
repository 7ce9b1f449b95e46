use crate::catalog::{build_catalog, BuildOptions, Catalog};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::query::CatalogHandle;
use crate::sync::ContentSync;
use std::sync::Arc;
use std::time::Duration;

/// Syncs the content root, then builds a full catalog on the blocking pool.
pub async fn sync_and_build(
    sync: &dyn ContentSync,
    config: &AppConfig,
) -> Result<(Catalog, String), AppError> {
    let version = sync.refresh().await?;

    let root = config.content_root.clone();
    let options = BuildOptions::from(config);
    let catalog = tokio::task::spawn_blocking(move || build_catalog(&root, &options)).await??;

    Ok((catalog, version))
}

/// One refresh cycle: the live catalog is replaced only by a completely built one.
pub async fn refresh_catalog(
    sync: &dyn ContentSync,
    config: &AppConfig,
    handle: &CatalogHandle,
) -> Result<(), AppError> {
    let (catalog, version) = sync_and_build(sync, config).await?;
    log::info!(
        "Swapping in catalog at version {} ({} images)",
        version,
        catalog.len()
    );
    handle.replace(catalog, version);
    Ok(())
}

pub fn start_refresh_job(config: Arc<AppConfig>, sync: Arc<dyn ContentSync>, handle: CatalogHandle) {
    if config.refresh_interval_secs == 0 {
        log::debug!("Periodic refresh disabled.");
        return;
    }

    let period = Duration::from_secs(config.refresh_interval_secs);
    log::info!("Refreshing content every {:?}", period);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // first tick completes immediately; startup already built the catalog
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = refresh_catalog(sync.as_ref(), &config, &handle).await {
                log::error!("Catalog refresh failed, keeping previous catalog: {}", e);
            }
        }
    });
}
