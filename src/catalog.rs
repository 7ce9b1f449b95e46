use crate::error::AppError;
use crate::metadata::{self, Author};
use crate::walker;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One discovered image and the metadata from its descriptor.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub authors: Vec<Author>,
    pub category: String,
    pub tags: Vec<String>,
    pub sources: Vec<String>,
    #[serde(skip)]
    pub storage_path: PathBuf,
}

impl ImageRecord {
    /// Reads the sidecar descriptor of `path` and derives id and category.
    pub fn load(root: &Path, path: &Path, category_depth: usize) -> Result<Self, AppError> {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Generic(format!("{:?} has no file name", path)))?;
        let category = walker::derive_category(root, path, category_depth)?;
        let meta = metadata::load_metadata(path)?;

        Ok(ImageRecord {
            id,
            name: meta.name,
            authors: meta.authors,
            category,
            tags: meta.tags,
            sources: meta.sources,
            storage_path: path.to_path_buf(),
        })
    }
}

/// Options for a catalog build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub allowed_extensions: Vec<String>,
    pub category_depth: usize,
    /// Log and drop images whose descriptor cannot be read instead of failing the build.
    pub skip_invalid: bool,
}

impl From<&crate::config::AppConfig> for BuildOptions {
    fn from(config: &crate::config::AppConfig) -> Self {
        BuildOptions {
            allowed_extensions: config.allowed_extensions.clone(),
            category_depth: config.category_depth,
            skip_invalid: config.skip_invalid_descriptors,
        }
    }
}

/// Immutable image collection plus the category index over it.
#[derive(Debug, Default)]
pub struct Catalog {
    images: Vec<Arc<ImageRecord>>,
    categories: BTreeMap<String, Vec<Arc<ImageRecord>>>,
}

impl Catalog {
    /// Indexes `images` by category, keeping traversal order inside each bucket.
    pub fn from_records(images: Vec<ImageRecord>) -> Self {
        let images: Vec<Arc<ImageRecord>> = images.into_iter().map(Arc::new).collect();
        let mut categories: BTreeMap<String, Vec<Arc<ImageRecord>>> = BTreeMap::new();

        for image in &images {
            categories
                .entry(image.category.clone())
                .or_default()
                .push(Arc::clone(image));
        }

        Catalog { images, categories }
    }

    pub fn images(&self) -> &[Arc<ImageRecord>] {
        &self.images
    }

    pub fn categories(&self) -> &BTreeMap<String, Vec<Arc<ImageRecord>>> {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&[Arc<ImageRecord>]> {
        self.categories.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

pub fn build_catalog(root: &Path, options: &BuildOptions) -> Result<Catalog, AppError> {
    log::info!(
        "Building catalog from {:?} (category depth {})",
        root,
        options.category_depth
    );

    let paths = walker::discover_images(root, &options.allowed_extensions)?;

    // indexed parallel collect keeps traversal order
    let loaded: Vec<Result<ImageRecord, AppError>> = paths
        .par_iter()
        .map(|path| ImageRecord::load(root, path, options.category_depth))
        .collect();

    let mut records = Vec::with_capacity(loaded.len());
    for (path, result) in paths.iter().zip(loaded) {
        match result {
            Ok(record) => records.push(record),
            Err(e) if options.skip_invalid => {
                log::warn!("Skipping image {:?}: {}", path, e);
            }
            Err(e) => {
                log::error!("Catalog build aborted at {:?}: {}", path, e);
                return Err(e);
            }
        }
    }

    let mut seen = HashSet::new();
    for record in &records {
        if !seen.insert(record.id.as_str()) {
            log::warn!(
                "Duplicate image id '{}' at {:?}; lookups return the first occurrence",
                record.id,
                record.storage_path
            );
        }
    }

    let catalog = Catalog::from_records(records);
    log::info!(
        "Catalog built: {} images in {} categories.",
        catalog.len(),
        catalog.categories().len()
    );
    Ok(catalog)
}
