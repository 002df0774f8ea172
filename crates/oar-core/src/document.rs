use std::fs;
use std::path::Path;

use serde_yaml_ng::Value;

use crate::error::{DocumentError, ParseError};

/// Parse an OpenAPI document from YAML.
pub fn from_yaml(input: &str) -> Result<Value, ParseError> {
    let document: Value = serde_yaml_ng::from_str(input)?;
    validate_version(&document)?;
    Ok(document)
}

/// Parse an OpenAPI document from JSON.
pub fn from_json(input: &str) -> Result<Value, ParseError> {
    let json: serde_json::Value = serde_json::from_str(input)?;
    let document = serde_yaml_ng::to_value(json)?;
    validate_version(&document)?;
    Ok(document)
}

/// Load an OpenAPI document from disk, choosing the parser by extension.
pub fn load(path: &Path) -> Result<Value, DocumentError> {
    let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
    let parsed = match ext {
        "json" => from_json(&content),
        _ => from_yaml(&content),
    };
    parsed.map_err(|source| DocumentError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_version(document: &Value) -> Result<(), ParseError> {
    if let Some(version) = document.get("openapi") {
        let version = scalar_to_string(version).unwrap_or_default();
        if !version.starts_with("3.") {
            return Err(ParseError::UnsupportedVersion(version));
        }
        return Ok(());
    }
    if let Some(version) = document.get("swagger") {
        let version = scalar_to_string(version).unwrap_or_default();
        return Err(ParseError::UnsupportedVersion(format!("swagger {version}")));
    }
    Err(ParseError::MissingField("openapi".to_string()))
}

/// Render a scalar node (string, number, bool) as text. Also used for mapping
/// keys, which YAML allows to be numbers.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `info.title`, if present.
pub fn title(document: &Value) -> Option<&str> {
    document.get("info")?.get("title")?.as_str()
}

/// Read any YAML file into a tree.
pub fn read_yaml(path: &Path) -> Result<Value, DocumentError> {
    let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml_ng::from_str(&content).map_err(|source| DocumentError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a tree as YAML, creating parent directories as needed.
pub fn write_yaml(value: &Value, path: &Path) -> Result<(), DocumentError> {
    let content = serde_yaml_ng::to_string(value).map_err(|source| DocumentError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    write_text(path, &content)
}

/// Write a text file, creating parent directories as needed.
pub fn write_text(path: &Path, content: &str) -> Result<(), DocumentError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| DocumentError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    })
}
