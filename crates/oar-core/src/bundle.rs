use std::fs;
use std::path::Path;

use serde_yaml_ng::{Mapping, Value};

use crate::component::{ComponentGroup, HttpMethod};
use crate::document::read_yaml;
use crate::error::BundleError;
use crate::index::ReferenceIndex;
use crate::pointer::{is_file_pointer, ref_of, resolve_file_pointer};
use crate::rewrite::restore_refs;
use crate::split::{CODE_SAMPLES_KEYS, COMPONENTS_DIR};
use crate::warning::Warnings;

/// Fold a split repository back into a single document.
///
/// Path pointers in the entrypoint are replaced by the path files, the
/// `components` section is rebuilt from `components/<group>/*.yaml`, file
/// pointers to component files become `#/components/...` pointers again, and
/// code sample pointers are replaced by the sample text. Pointers to anything
/// else are kept as they are.
pub fn bundle(entrypoint: &Path) -> Result<Value, BundleError> {
    let root_dir = entrypoint.parent().unwrap_or_else(|| Path::new(""));
    let mut document = read_yaml(entrypoint)?;

    let mut warnings = Warnings::default();
    let index = ReferenceIndex::scan(&root_dir.join(COMPONENTS_DIR), &mut warnings)?;
    log::debug!("bundling {} with {} components", entrypoint.display(), index.len());

    if let Some(paths) = document.get_mut("paths").and_then(Value::as_mapping_mut) {
        for item in paths.values_mut() {
            let Some(pointer) = ref_of(item).filter(|p| is_file_pointer(p)) else {
                continue;
            };
            let file = resolve_file_pointer(root_dir, pointer);
            let file_dir = file.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
            let mut data = read_yaml(&file)?;
            inline_code_samples(&mut data, &file_dir)?;
            restore_refs(&mut data, &file_dir, &index);
            *item = data;
        }
    }

    let mut rebuilt = Mapping::new();
    for group in ComponentGroup::ALL {
        let mut entries = Mapping::new();
        for record in index.group(group) {
            let mut data = read_yaml(&record.filename)?;
            let dir = record.filename.parent().unwrap_or_else(|| Path::new(""));
            restore_refs(&mut data, dir, &index);
            entries.insert(Value::String(record.name.clone()), data);
        }
        if !entries.is_empty() {
            rebuilt.insert(Value::String(group.as_str().to_string()), Value::Mapping(entries));
        }
    }
    merge_components(&mut document, rebuilt, root_dir, &index);

    restore_refs(&mut document, root_dir, &index);
    Ok(document)
}

/// Put rebuilt components into the document. An entry is filled from its file
/// only when it is missing or is a pointer to that same file; a definition
/// kept inline after a split conflict is newer than the file and stays.
fn merge_components(
    document: &mut Value,
    rebuilt: Mapping,
    root_dir: &Path,
    index: &ReferenceIndex,
) {
    if rebuilt.is_empty() {
        return;
    }
    let Some(root) = document.as_mapping_mut() else {
        return;
    };
    let key = Value::String("components".to_string());
    if !root.get(&key).is_some_and(Value::is_mapping) {
        root.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    let Some(components) = root.get_mut(&key).and_then(Value::as_mapping_mut) else {
        return;
    };
    for (group, entries) in rebuilt {
        let Value::Mapping(entries) = entries else {
            continue;
        };
        let Some(group_kind) = group.as_str().and_then(|g| g.parse::<ComponentGroup>().ok())
        else {
            continue;
        };
        if !components.get(&group).is_some_and(Value::is_mapping) {
            components.insert(group.clone(), Value::Mapping(Mapping::new()));
        }
        let Some(existing) = components.get_mut(&group).and_then(Value::as_mapping_mut) else {
            continue;
        };
        for (name, data) in entries {
            let replace = match existing.get(&name) {
                None => true,
                Some(current) => ref_of(current).is_some_and(|pointer| {
                    is_file_pointer(pointer)
                        && index
                            .locate(&resolve_file_pointer(root_dir, pointer))
                            .is_some_and(|record| {
                                record.group == group_kind
                                    && name.as_str() == Some(record.name.as_str())
                            })
                }),
            };
            if replace {
                existing.insert(name, data);
            }
        }
    }
}

fn inline_code_samples(item: &mut Value, file_dir: &Path) -> Result<(), BundleError> {
    let Some(item) = item.as_mapping_mut() else {
        return Ok(());
    };
    for method in HttpMethod::ALL {
        let Some(operation) = item.get_mut(method.as_str()) else {
            continue;
        };
        for key in CODE_SAMPLES_KEYS {
            let Some(samples) = operation.get_mut(key).and_then(Value::as_sequence_mut) else {
                continue;
            };
            for sample in samples.iter_mut().filter_map(Value::as_mapping_mut) {
                let Some(pointer) = sample
                    .get("source")
                    .and_then(ref_of)
                    .filter(|p| is_file_pointer(p))
                else {
                    continue;
                };
                let path = resolve_file_pointer(file_dir, pointer);
                let text = fs::read_to_string(&path)
                    .map_err(|source| BundleError::CodeSample { path, source })?;
                sample.insert(Value::String("source".to_string()), Value::String(text));
            }
        }
    }
    Ok(())
}
