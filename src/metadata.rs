// src/metadata.rs

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DESCRIPTOR_EXTENSION: &str = "toml";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub github: String,
}

/// Fields read from an image's sidecar descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    pub name: String,
    pub authors: Vec<Author>,
    pub tags: Vec<String>,
    pub sources: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Descriptor {
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Deserialize, Default)]
struct RawMetadata {
    name: Option<String>,
    authors: Option<Vec<Author>>,
    author: Option<Author>,
    tags: Option<Vec<String>>,
    sources: Option<Vec<String>>,
}

impl From<RawMetadata> for ImageMetadata {
    fn from(raw: RawMetadata) -> Self {
        // `authors` wins over the single-author form
        let authors = match (raw.authors, raw.author) {
            (Some(authors), _) if !authors.is_empty() => authors,
            (_, Some(author)) => vec![author],
            _ => Vec::new(),
        };

        ImageMetadata {
            name: raw.name.unwrap_or_default(),
            authors,
            tags: raw.tags.unwrap_or_default(),
            sources: raw.sources.unwrap_or_default(),
        }
    }
}

/// Sidecar location for an image: same directory, same base name, `.toml`.
pub fn descriptor_path(image_path: &Path) -> PathBuf {
    image_path.with_extension(DESCRIPTOR_EXTENSION)
}

pub fn parse_descriptor(text: &str) -> Result<ImageMetadata, toml::de::Error> {
    let descriptor: Descriptor = toml::from_str(text)?;
    Ok(descriptor.metadata.into())
}

pub fn load_metadata(image_path: &Path) -> Result<ImageMetadata, AppError> {
    let path = descriptor_path(image_path);
    log::trace!("Reading descriptor {:?} for {:?}", path, image_path);

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::DescriptorMissing { path });
        }
        Err(e) => return Err(AppError::Io(e)),
    };

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            return Err(AppError::DescriptorMalformed {
                path,
                source: Box::new(e),
            })
        }
    };

    parse_descriptor(&text).map_err(|e| AppError::DescriptorMalformed {
        path,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_descriptor() {
        let meta = parse_descriptor(
            r#"
            [metadata]
            name = "Miyako Shikimori"
            tags = ["linux", "ubuntu"]
            sources = ["https://example.com/a"]

            [[metadata.authors]]
            name = "Goldy"
            github = "THEGOLDENPRO"
            "#,
        )
        .unwrap();

        assert_eq!(meta.name, "Miyako Shikimori");
        assert_eq!(meta.tags, vec!["linux", "ubuntu"]);
        assert_eq!(meta.sources, vec!["https://example.com/a"]);
        assert_eq!(
            meta.authors,
            vec![Author {
                name: "Goldy".into(),
                github: "THEGOLDENPRO".into()
            }]
        );
    }

    #[test]
    fn single_author_table_becomes_list() {
        let meta = parse_descriptor(
            r#"
            [metadata.author]
            name = "Ananas"
            github = "r3tr0ananas"
            "#,
        )
        .unwrap();
        assert_eq!(meta.authors.len(), 1);
        assert_eq!(meta.authors[0].github, "r3tr0ananas");
        assert_eq!(meta.name, "");
    }

    #[test]
    fn missing_metadata_table_yields_empty_record() {
        let meta = parse_descriptor("").unwrap();
        assert_eq!(meta, ImageMetadata::default());
    }

    #[test]
    fn wrong_types_are_malformed() {
        assert!(parse_descriptor("[metadata]\ntags = \"linux\"\n").is_err());
        assert!(parse_descriptor("[metadata\nname = ").is_err());
    }

    #[test]
    fn descriptor_sits_next_to_image() {
        assert_eq!(
            descriptor_path(Path::new("repo/Arch/nanami.png")),
            PathBuf::from("repo/Arch/nanami.toml")
        );
    }

    #[test]
    fn load_reports_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("lonely.png");
        std::fs::write(&image, b"png").unwrap();
        assert!(matches!(
            load_metadata(&image),
            Err(AppError::DescriptorMissing { .. })
        ));

        std::fs::write(dir.path().join("lonely.toml"), "[metadata\n").unwrap();
        assert!(matches!(
            load_metadata(&image),
            Err(AppError::DescriptorMalformed { .. })
        ));
    }

    #[test]
    fn non_utf8_descriptor_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("latin1.png");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(dir.path().join("latin1.toml"), b"[metadata]\nname = \"Caf\xe9\"\n").unwrap();

        match load_metadata(&image) {
            Err(AppError::DescriptorMalformed { path, .. }) => {
                assert_eq!(path, dir.path().join("latin1.toml"));
            }
            other => panic!("expected DescriptorMalformed, got {:?}", other),
        }
    }
}
