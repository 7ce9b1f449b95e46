use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinError;

/// Recoverable outcomes of read operations against a built catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("We couldn't find an image with id '{0}'!")]
    ImageNotFound(String),

    #[error("The category '{0}' was not found!")]
    CategoryNotFound(String),

    #[error("The catalog holds no images to pick from.")]
    EmptyCatalog,
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::ImageNotFound(_) => "ImageNotFound",
            QueryError::CategoryNotFound(_) => "CategoryNotFound",
            QueryError::EmptyCatalog => "EmptyCatalog",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("No metadata descriptor at {path:?}")]
    DescriptorMissing { path: PathBuf },

    #[error("Malformed metadata descriptor {path:?}: {source}")]
    DescriptorMalformed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{path:?} is not nested deep enough for a category at depth {depth}")]
    CategoryDepth { path: PathBuf, depth: usize },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Content sync error: {0}")]
    Sync(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Query(e) => e.kind(),
            AppError::Io(_) => "IoError",
            AppError::Config(_) => "ConfigError",
            AppError::Walkdir(_) => "WalkdirError",
            AppError::Image(_) => "ImageError",
            AppError::Join(_) => "JoinError",
            AppError::DescriptorMissing { .. } => "ImageMetadataNotFound",
            AppError::DescriptorMalformed { .. } => "ImageMetadataMalformed",
            AppError::CategoryDepth { .. } => "CategoryDepthError",
            AppError::Git(_) => "GitError",
            AppError::Sync(_) => "SyncError",
            AppError::Generic(_) => "InternalError",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Query(QueryError::ImageNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Query(QueryError::CategoryNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Query(QueryError::EmptyCatalog) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DescriptorMissing { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
