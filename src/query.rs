use crate::catalog::{Catalog, ImageRecord};
use crate::error::QueryError;
use crate::search::SearchEngine;
use parking_lot::RwLock;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::sync::Arc;

/// Read API over one built catalog. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    catalog: Arc<Catalog>,
    engine: SearchEngine,
}

impl CatalogQuery {
    pub fn new(catalog: Arc<Catalog>, engine: SearchEngine) -> Self {
        Self { catalog, engine }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// First record whose id matches exactly.
    pub fn get_by_id(&self, id: &str) -> Option<Arc<ImageRecord>> {
        self.catalog.images().iter().find(|image| image.id == id).cloned()
    }

    pub fn get_random(&self, category: Option<&str>) -> Result<Arc<ImageRecord>, QueryError> {
        self.get_random_with(category, &mut rand::rng())
    }

    /// Uniform pick from the category bucket, or from every image when no category is given.
    ///
    /// An unknown category is reported, not widened to the whole catalog.
    pub fn get_random_with<R: Rng + ?Sized>(
        &self,
        category: Option<&str>,
        rng: &mut R,
    ) -> Result<Arc<ImageRecord>, QueryError> {
        let pool = match category {
            Some(name) => self
                .catalog
                .category(name)
                .ok_or_else(|| QueryError::CategoryNotFound(name.to_string()))?,
            None => self.catalog.images(),
        };

        pool.choose(rng).cloned().ok_or(QueryError::EmptyCatalog)
    }

    pub fn list_all(&self, category: Option<&str>) -> Vec<Arc<ImageRecord>> {
        self.catalog
            .images()
            .iter()
            .filter(|image| category.map_or(true, |c| image.category == c))
            .cloned()
            .collect()
    }

    pub fn list_categories(&self) -> Vec<String> {
        self.catalog.categories().keys().cloned().collect()
    }

    pub fn search_by_name(
        &self,
        query: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Vec<Arc<ImageRecord>> {
        self.engine
            .search_by_name(self.catalog.images(), query, category, limit)
    }

    pub fn search_by_tags_or_author(
        &self,
        tags: Option<&str>,
        author: Option<&str>,
        limit: usize,
    ) -> Vec<Arc<ImageRecord>> {
        self.engine
            .search_by_tags_or_author(self.catalog.images(), tags, author, limit)
    }
}

/// A built catalog together with the content version it was built from.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub query: CatalogQuery,
    pub version: String,
}

/// Shared reference to the live catalog; a refresh swaps in a complete new one.
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<CatalogSnapshot>>>,
    engine: SearchEngine,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog, version: String, engine: SearchEngine) -> Self {
        let snapshot = CatalogSnapshot {
            query: CatalogQuery::new(Arc::new(catalog), engine),
            version,
        };
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
            engine,
        }
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.read().clone()
    }

    pub fn query(&self) -> CatalogQuery {
        self.snapshot().query.clone()
    }

    pub fn version(&self) -> String {
        self.snapshot().version.clone()
    }

    pub fn replace(&self, catalog: Catalog, version: String) {
        let snapshot = Arc::new(CatalogSnapshot {
            query: CatalogQuery::new(Arc::new(catalog), self.engine),
            version,
        });
        *self.current.write() = snapshot;
    }
}
