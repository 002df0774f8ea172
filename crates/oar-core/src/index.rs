use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_yaml_ng::{Mapping, Value};
use walkdir::WalkDir;

use crate::component::ComponentGroup;
use crate::document::{read_yaml, scalar_to_string};
use crate::error::IndexError;
use crate::pointer::{ComponentPointer, normalize};
use crate::warning::{Warning, Warnings};

/// Where a component lives and which schemas it extends.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRecord {
    pub group: ComponentGroup,
    pub name: String,
    pub filename: PathBuf,
    /// In-document pointers listed in a schema's top-level `allOf`.
    pub inherits: Vec<String>,
}

impl ComponentRecord {
    pub fn new(
        group: ComponentGroup,
        name: impl Into<String>,
        filename: PathBuf,
        definition: &Value,
    ) -> Self {
        Self {
            group,
            name: name.into(),
            filename,
            inherits: inherits_of(group, definition),
        }
    }

    pub fn pointer(&self) -> ComponentPointer {
        ComponentPointer::new(self.group, self.name.clone())
    }
}

/// `$ref` values of a schema's top-level `allOf` entries. Other groups
/// never inherit.
pub fn inherits_of(group: ComponentGroup, definition: &Value) -> Vec<String> {
    if group != ComponentGroup::Schemas {
        return Vec::new();
    }
    definition
        .get("allOf")
        .and_then(Value::as_sequence)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("$ref").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Component identity → file location, built once per run and read-only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    groups: IndexMap<ComponentGroup, IndexMap<String, ComponentRecord>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<components_dir>/<group>/<name>.yaml`
    pub fn component_file(components_dir: &Path, group: ComponentGroup, name: &str) -> PathBuf {
        components_dir
            .join(group.as_str())
            .join(format!("{name}.yaml"))
    }

    /// Add a record. A second record with the same group and name is an error.
    pub fn insert(&mut self, record: ComponentRecord) -> Result<(), IndexError> {
        let group = self.groups.entry(record.group).or_default();
        if group.contains_key(&record.name) {
            return Err(IndexError::DuplicateComponent {
                group: record.group,
                name: record.name,
            });
        }
        group.insert(record.name.clone(), record);
        Ok(())
    }

    pub fn get(&self, group: ComponentGroup, name: &str) -> Option<&ComponentRecord> {
        self.groups.get(&group)?.get(name)
    }

    pub fn resolve(&self, pointer: &ComponentPointer) -> Option<&ComponentRecord> {
        self.get(pointer.group, &pointer.name)
    }

    /// Reverse lookup by file location.
    pub fn locate(&self, file: &Path) -> Option<&ComponentRecord> {
        let file = normalize(file);
        self.records()
            .find(|record| normalize(&record.filename) == file)
    }

    pub fn records(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.groups.values().flat_map(|group| group.values())
    }

    pub fn group(&self, group: ComponentGroup) -> impl Iterator<Item = &ComponentRecord> {
        self.groups.get(&group).into_iter().flat_map(|g| g.values())
    }

    pub fn schemas(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.group(ComponentGroup::Schemas)
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the index for an in-memory `components` object. Each component is
    /// assigned `<components_dir>/<group>/<name>.yaml`; `accept` decides
    /// whether it is recorded. Groups outside the known set are ignored.
    pub fn from_components<F>(
        components: &Mapping,
        components_dir: &Path,
        mut accept: F,
    ) -> Result<Self, IndexError>
    where
        F: FnMut(&ComponentRecord, &Value) -> bool,
    {
        let mut index = Self::new();
        for group in ComponentGroup::ALL {
            let Some(entries) = components.get(group.as_str()).and_then(Value::as_mapping) else {
                continue;
            };
            for (key, definition) in entries {
                let Some(name) = scalar_to_string(key) else {
                    continue;
                };
                let filename = Self::component_file(components_dir, group, &name);
                let record = ComponentRecord::new(group, name, filename, definition);
                if accept(&record, definition) {
                    index.insert(record)?;
                }
            }
        }
        Ok(index)
    }

    /// Build the index from component files on disk, walking
    /// `<components_dir>/<group>/**/*.yaml`. A missing directory yields an
    /// empty index.
    pub fn scan(components_dir: &Path, warnings: &mut Warnings) -> Result<Self, IndexError> {
        let mut index = Self::new();
        if !components_dir.is_dir() {
            return Ok(index);
        }

        let mut unknown: HashSet<PathBuf> = HashSet::new();
        for entry in WalkDir::new(components_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_yaml(entry.path()) {
                continue;
            }
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(components_dir) else {
                continue;
            };
            let Some(group_dir) = relative.components().next() else {
                continue;
            };
            let group_dir = group_dir.as_os_str().to_string_lossy();
            if relative.components().count() < 2 {
                continue;
            }
            let Ok(group) = group_dir.parse::<ComponentGroup>() else {
                let dir = components_dir.join(&*group_dir);
                if unknown.insert(dir.clone()) {
                    warnings.push(Warning::UnknownComponentDirectory { path: dir });
                }
                continue;
            };
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };

            let inherits = if group == ComponentGroup::Schemas {
                inherits_of(group, &read_yaml(path)?)
            } else {
                Vec::new()
            };
            log::debug!("indexed {group}/{name} at {}", path.display());
            index.insert(ComponentRecord {
                group,
                name,
                filename: path.to_path_buf(),
                inherits,
            })?;
        }
        Ok(index)
    }
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
