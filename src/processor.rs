use crate::catalog::ImageRecord;
use crate::config::AppConfig;
use crate::error::AppError;
use image::{DynamicImage, ImageFormat};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Cached WebP rendition of an image, created on first request and
/// re-rendered when the source is newer than the cached file.
pub fn webp_preview(config: &AppConfig, record: &ImageRecord) -> Result<PathBuf, AppError> {
    let cache_dir = config.cache_directory.as_path();
    let preview_path = cache_dir.join(format!("{}.webp", record.id));

    if is_fresh(&preview_path, &record.storage_path)? {
        log::trace!("Serving cached preview {:?}", preview_path);
        return Ok(preview_path);
    }

    if !cache_dir.exists() {
        std::fs::create_dir_all(cache_dir)?;
        log::debug!("Created cache directory: {:?}", cache_dir);
    }

    render_preview(
        &record.storage_path,
        cache_dir,
        &preview_path,
        config.preview_max_dimension,
    )?;
    Ok(preview_path)
}

fn is_fresh(preview: &Path, source: &Path) -> Result<bool, AppError> {
    let preview_modified = match std::fs::metadata(preview) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(AppError::Io(e)),
    };
    let source_modified = std::fs::metadata(source)?.modified()?;
    Ok(preview_modified >= source_modified)
}

fn render_preview(
    source: &Path,
    cache_dir: &Path,
    target: &Path,
    max_dimension: u32,
) -> Result<(), AppError> {
    log::debug!("Generating preview for {:?}", source);
    let image = image::open(source).map_err(|e| {
        log::warn!("Could not open image {:?}: {}", source, e);
        e
    })?;

    let image = if image.width() > max_dimension || image.height() > max_dimension {
        image.thumbnail(max_dimension, max_dimension)
    } else {
        image
    };

    // the WebP encoder only takes 8-bit RGB(A)
    let image = DynamicImage::ImageRgba8(image.to_rgba8());

    // each render gets its own temp file; persisting renames it over the target in one step
    let mut partial = NamedTempFile::new_in(cache_dir)?;
    {
        let mut writer = BufWriter::new(partial.as_file_mut());
        image.write_to(&mut writer, ImageFormat::WebP)?;
    }
    partial.as_file().sync_all()?;

    if let Err(e) = partial.persist(target) {
        if target.exists() {
            log::debug!("Preview {:?} was written concurrently", target);
        } else {
            return Err(AppError::Io(e.error));
        }
    }

    log::debug!("Preview saved to: {:?}", target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn creates_and_reuses_downscaled_preview() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("kotori.png");
        RgbImage::new(64, 32).save(&source).unwrap();

        let config = AppConfig {
            cache_directory: dir.path().join("cache"),
            preview_max_dimension: 16,
            ..AppConfig::default()
        };
        let record = ImageRecord {
            id: "kotori".into(),
            name: "Kotori".into(),
            authors: Vec::new(),
            category: "Arch".into(),
            tags: Vec::new(),
            sources: Vec::new(),
            storage_path: source,
        };

        let preview = webp_preview(&config, &record).unwrap();
        assert_eq!(preview, dir.path().join("cache/kotori.webp"));
        assert_eq!(image::image_dimensions(&preview).unwrap(), (16, 8));

        assert_eq!(webp_preview(&config, &record).unwrap(), preview);
    }

    fn fixture(dir: &Path, width: u32, height: u32) -> (AppConfig, ImageRecord) {
        let source = dir.join("nanami.png");
        RgbImage::new(width, height).save(&source).unwrap();

        let config = AppConfig {
            cache_directory: dir.join("cache"),
            preview_max_dimension: 16,
            ..AppConfig::default()
        };
        let record = ImageRecord {
            id: "nanami".into(),
            name: "Nanami".into(),
            authors: Vec::new(),
            category: "Arch".into(),
            tags: Vec::new(),
            sources: Vec::new(),
            storage_path: source,
        };
        (config, record)
    }

    #[test]
    fn concurrent_first_requests_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let (config, record) = fixture(dir.path(), 600, 600);

        let results: Vec<Result<PathBuf, AppError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| webp_preview(&config, &record)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in results {
            let preview = result.unwrap();
            assert_eq!(image::image_dimensions(&preview).unwrap(), (16, 16));
        }

        // no temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("cache"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("nanami.webp")]);
    }

    #[test]
    fn newer_source_replaces_cached_preview() {
        let dir = tempfile::tempdir().unwrap();
        let (config, record) = fixture(dir.path(), 64, 32);
        let preview = webp_preview(&config, &record).unwrap();
        assert_eq!(image::image_dimensions(&preview).unwrap(), (16, 8));

        RgbImage::new(32, 64).save(&record.storage_path).unwrap();
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
        std::fs::File::options()
            .write(true)
            .open(&record.storage_path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let preview = webp_preview(&config, &record).unwrap();
        assert_eq!(image::image_dimensions(&preview).unwrap(), (8, 16));
    }
}
