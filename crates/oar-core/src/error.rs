use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::component::ComponentGroup;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Failure reading or writing a single document on disk.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },

    #[error("{} is not a usable OpenAPI definition: {source}", .path.display())]
    Invalid { path: PathBuf, source: ParseError },
}

#[derive(Debug, Error)]
#[error("unknown component group: {0}")]
pub struct UnknownComponentGroup(pub String);

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(
        "conflicting component in \"{group}\": \"{name}\" is defined more than once, rename one of them"
    )]
    DuplicateComponent { group: ComponentGroup, name: String },

    #[error("failed to scan component directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Error)]
pub enum SplitError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("failed to write {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum BundleError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("failed to read code sample {}: {source}", .path.display())]
    CodeSample { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("{0}")]
    NotDetected(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("I/O failure on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to process {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}
