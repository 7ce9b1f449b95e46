use crate::error::AppError;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Case-sensitive match of the file's final suffix against `.ext` entries.
pub fn has_allowed_extension(path: &Path, allowed_extensions: &[String]) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => allowed_extensions
            .iter()
            .any(|allowed| allowed.strip_prefix('.') == Some(ext)),
        None => false,
    }
}

/// Collects image files under `root` in file-name order, skipping hidden entries.
pub fn discover_images(root: &Path, allowed_extensions: &[String]) -> Result<Vec<PathBuf>, AppError> {
    log::info!("Starting file discovery in {:?}", root);
    log::debug!("Configured allowed extensions: {:?}", allowed_extensions);

    let mut paths = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }

        let path = entry.path();
        if has_allowed_extension(path, allowed_extensions) {
            log::debug!("Discovered image file: {:?}", path);
            paths.push(path.to_path_buf());
        } else {
            log::trace!("Skipping file due to unsupported extension: {:?}", path);
        }
    }

    log::info!("File discovery complete, {} images found.", paths.len());
    Ok(paths)
}

/// Directory name `depth` levels below `root` on the way to `path`.
///
/// Only directory segments count; the file name itself never becomes a category.
pub fn derive_category(root: &Path, path: &Path, depth: usize) -> Result<String, AppError> {
    let too_shallow = || AppError::CategoryDepth {
        path: path.to_path_buf(),
        depth,
    };

    let relative = path.strip_prefix(root).map_err(|_| too_shallow())?;
    let parent = relative.parent().ok_or_else(too_shallow)?;

    parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment),
            _ => None,
        })
        .nth(depth)
        .map(|segment| segment.to_string_lossy().into_owned())
        .ok_or_else(too_shallow)
}
