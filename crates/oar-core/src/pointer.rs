//! Pointer forms used across a split repository.
//!
//! An in-document pointer names a component as `#/components/<group>/<name>`.
//! A file pointer names the file holding it, relative to the file that
//! mentions it (`../components/schemas/Pet.yaml`). Both may carry a trailing
//! JSON-pointer fragment into the component.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde_yaml_ng::{Mapping, Value};

use crate::component::ComponentGroup;

pub const COMPONENTS_PREFIX: &str = "#/components/";

/// An in-document pointer to a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentPointer {
    pub group: ComponentGroup,
    pub name: String,
    /// Remainder of the pointer below the component, e.g. `/properties/id`.
    pub fragment: Option<String>,
}

impl ComponentPointer {
    pub fn new(group: ComponentGroup, name: impl Into<String>) -> Self {
        Self {
            group,
            name: name.into(),
            fragment: None,
        }
    }

    /// Parse `#/components/<group>/<name>[/<more>]`.
    ///
    /// Returns `None` for external references, unknown groups, and anything
    /// that does not name a component.
    pub fn parse(pointer: &str) -> Option<Self> {
        let rest = pointer.strip_prefix(COMPONENTS_PREFIX)?;
        let (group, rest) = rest.split_once('/')?;
        let group = group.parse().ok()?;
        let (name, fragment) = match rest.find('/') {
            Some(at) => (&rest[..at], Some(rest[at..].to_string())),
            None => (rest, None),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            group,
            name: unescape_segment(name),
            fragment,
        })
    }
}

impl fmt::Display for ComponentPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}",
            COMPONENTS_PREFIX,
            self.group,
            escape_segment(&self.name)
        )?;
        if let Some(ref fragment) = self.fragment {
            f.write_str(fragment)?;
        }
        Ok(())
    }
}

/// Decode a JSON-pointer segment (`~1` → `/`, `~0` → `~`).
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Encode a JSON-pointer segment (`~` → `~0`, `/` → `~1`).
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// File stem for a path template: `/pets/{id}` → `@pets@{id}`.
pub fn encode_path(template: &str) -> String {
    unescape_segment(template).replace('/', "@")
}

/// Path template for a file stem: `@pets@{id}` → `/pets/{id}`.
///
/// Older repositories stored `/pets` as `pets`; those stems decode to the
/// same template.
pub fn decode_path(stem: &str) -> String {
    let template = stem.replace('@', "/");
    if template.starts_with('/') {
        template
    } else {
        format!("/{template}")
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Render `target` relative to `from_dir` with forward slashes, always
/// starting with `./` or `../`.
pub fn relative_pointer(from_dir: &Path, target: &Path) -> String {
    let from = normalize(from_dir);
    let target = normalize(target);
    let from_parts: Vec<Component<'_>> = from.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();

    let common = from_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = vec!["..".to_string(); from_parts.len() - common];
    segments.extend(
        target_parts[common..]
            .iter()
            .map(|part| part.as_os_str().to_string_lossy().into_owned()),
    );

    let joined = segments.join("/");
    if joined.starts_with("../") || joined == ".." {
        joined
    } else {
        format!("./{joined}")
    }
}

/// Split `file.yaml#/frag` into the file part and the fragment.
pub fn split_fragment(pointer: &str) -> (&str, Option<&str>) {
    match pointer.split_once('#') {
        Some((file, fragment)) => (file, Some(fragment)),
        None => (pointer, None),
    }
}

/// Whether a `$ref` value names a local file rather than a location inside
/// the current document or a remote URL.
pub fn is_file_pointer(pointer: &str) -> bool {
    !pointer.is_empty() && !pointer.starts_with('#') && !pointer.contains("://")
}

/// Resolve a file pointer against the directory of the file containing it.
pub fn resolve_file_pointer(from_dir: &Path, pointer: &str) -> PathBuf {
    let (file, _) = split_fragment(pointer);
    normalize(&from_dir.join(file))
}

/// A `{ $ref: <target> }` node.
pub fn ref_value(target: impl Into<String>) -> Value {
    let mut map = Mapping::new();
    map.insert(
        Value::String("$ref".to_string()),
        Value::String(target.into()),
    );
    Value::Mapping(map)
}

/// The `$ref` string of a node, if it has one.
pub fn ref_of(node: &Value) -> Option<&str> {
    node.get("$ref").and_then(Value::as_str)
}

/// File extension for a code sample language.
pub fn lang_extension(lang: &str) -> &'static str {
    match lang.to_lowercase().as_str() {
        "php" => ".php",
        "c#" => ".cs",
        "shell" | "curl" | "bash" => ".sh",
        "javascript" | "js" => ".js",
        "python" => ".py",
        _ => ".txt",
    }
}
