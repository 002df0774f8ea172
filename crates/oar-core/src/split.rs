use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml_ng::{Mapping, Value};

use crate::component::{ComponentGroup, HttpMethod};
use crate::discriminator::{DiscriminatorPolicy, infer_discriminator};
use crate::document::{read_yaml, scalar_to_string, write_text, write_yaml};
use crate::error::SplitError;
use crate::index::{ComponentRecord, ReferenceIndex};
use crate::pointer::{encode_path, lang_extension, ref_of, ref_value, relative_pointer};
use crate::rewrite::rewrite_refs;
use crate::warning::{Warning, Warnings};

/// Entrypoint file name inside a split repository.
pub const ENTRYPOINT: &str = "openapi.yaml";
pub const PATHS_DIR: &str = "paths";
pub const COMPONENTS_DIR: &str = "components";
pub const CODE_SAMPLES_DIR: &str = "code_samples";
/// Operation extensions holding code samples (`lang` + `source`).
pub const CODE_SAMPLES_KEYS: [&str; 2] = ["x-code-samples", "x-codeSamples"];

#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    pub discriminator: DiscriminatorPolicy,
    /// Leave `x-code-samples` sources in the path files.
    pub inline_code_samples: bool,
}

/// Files written by [`split`] and the warnings raised along the way.
#[derive(Debug, Default)]
pub struct SplitReport {
    pub paths: Vec<PathBuf>,
    pub components: Vec<PathBuf>,
    pub code_samples: Vec<PathBuf>,
    pub warnings: Warnings,
}

/// Split one OpenAPI document into a repository under `output_dir`:
///
/// ```text
/// openapi.yaml
/// paths/<encoded-path>.yaml
/// components/<group>/<name>.yaml
/// code_samples/<lang>/<encoded-path>/<method><ext>
/// ```
///
/// Every in-document component pointer is rewritten to a file pointer
/// relative to the file it ends up in. A component whose target file already
/// exists with different content is left inline and reported. Output written
/// before a failure stays on disk.
pub fn split(
    mut document: Value,
    output_dir: &Path,
    options: &SplitOptions,
) -> Result<SplitReport, SplitError> {
    let paths_dir = output_dir.join(PATHS_DIR);
    let components_dir = output_dir.join(COMPONENTS_DIR);
    fs::create_dir_all(&paths_dir).map_err(|source| SplitError::Io {
        path: paths_dir.clone(),
        source,
    })?;

    let mut report = SplitReport::default();

    log::info!("splitting paths into {}", paths_dir.display());
    let mut path_files = Vec::new();
    if let Some(paths) = document.get_mut("paths").and_then(Value::as_mapping_mut) {
        for (key, item) in paths.iter_mut() {
            let Some(template) = key.as_str() else {
                continue;
            };
            if ref_of(item).is_some() {
                continue;
            }
            let encoded = encode_path(template);
            let file = paths_dir.join(format!("{encoded}.yaml"));
            if !options.inline_code_samples {
                extract_code_samples(item, output_dir, &paths_dir, &encoded, &mut report)?;
            }

            let pointer = ref_value(relative_pointer(output_dir, &file));
            path_files.push((file, std::mem::replace(item, pointer)));
        }
    }

    log::info!("splitting components into {}", components_dir.display());
    // Every component's file location. Pointers are rewritten against it, so a
    // component left inline after a conflict is still referenced through the
    // file written by the earlier run.
    let mut index = ReferenceIndex::new();
    let mut component_files = Vec::new();
    if let Some(components) = document
        .get_mut("components")
        .and_then(Value::as_mapping_mut)
    {
        index = ReferenceIndex::from_components(components, &components_dir, |_, _| true)?;
        let warnings = &mut report.warnings;
        let writable =
            ReferenceIndex::from_components(components, &components_dir, |record, definition| {
                if differs_on_disk(record, definition, &index, options.discriminator) {
                    warnings.push(Warning::ComponentConflict {
                        path: record.filename.clone(),
                        name: record.name.clone(),
                    });
                    return false;
                }
                true
            })?;

        component_files = take_components(components, &writable, output_dir);
        prune_empty_groups(components);
    }
    if document
        .get("components")
        .and_then(Value::as_mapping)
        .is_some_and(Mapping::is_empty)
    {
        if let Some(root) = document.as_mapping_mut() {
            root.remove("components");
        }
    }

    for (file, mut data) in path_files {
        rewrite_refs(&mut data, &paths_dir, &index);
        write_yaml(&data, &file)?;
        log::debug!("wrote {}", file.display());
        report.paths.push(file);
    }

    for (record, mut data) in component_files {
        finalize_component(
            &mut data,
            &record,
            &index,
            options.discriminator,
            &mut report.warnings,
        );
        write_yaml(&data, &record.filename)?;
        log::debug!("wrote {}", record.filename.display());
        report.components.push(record.filename);
    }

    rewrite_refs(&mut document, output_dir, &index);
    write_yaml(&document, &output_dir.join(ENTRYPOINT))?;

    log::info!(
        "split {} paths and {} components into {}",
        report.paths.len(),
        report.components.len(),
        output_dir.display()
    );
    Ok(report)
}

/// Rewrite a component's pointers for its own location and, for schemas,
/// add inferred subtypes.
fn finalize_component(
    data: &mut Value,
    record: &ComponentRecord,
    index: &ReferenceIndex,
    policy: DiscriminatorPolicy,
    warnings: &mut Warnings,
) {
    let dir = record.filename.parent().unwrap_or_else(|| Path::new(""));
    rewrite_refs(data, dir, index);
    if record.group == ComponentGroup::Schemas {
        infer_discriminator(data, &record.name, &record.filename, index, policy, warnings);
    }
}

/// Whether the component's file already exists holding something other than
/// what this run would write.
fn differs_on_disk(
    record: &ComponentRecord,
    definition: &Value,
    planned: &ReferenceIndex,
    policy: DiscriminatorPolicy,
) -> bool {
    if !record.filename.exists() {
        return false;
    }
    let Ok(existing) = read_yaml(&record.filename) else {
        return true;
    };
    if existing == *definition {
        return false;
    }
    let mut candidate = definition.clone();
    finalize_component(
        &mut candidate,
        record,
        planned,
        policy,
        &mut Warnings::default(),
    );
    existing != candidate
}

/// Move indexed components out of the entrypoint. Security schemes are left
/// behind as pointers to their files.
fn take_components(
    components: &mut Mapping,
    index: &ReferenceIndex,
    output_dir: &Path,
) -> Vec<(ComponentRecord, Value)> {
    let mut taken = Vec::new();
    for group in ComponentGroup::ALL {
        let Some(entries) = components
            .get_mut(group.as_str())
            .and_then(Value::as_mapping_mut)
        else {
            continue;
        };
        let keys: Vec<Value> = entries.keys().cloned().collect();
        for key in keys {
            let Some(record) = scalar_to_string(&key).and_then(|name| index.get(group, &name))
            else {
                continue;
            };
            let data = if group.is_externalized() {
                entries.remove(&key)
            } else {
                let pointer = ref_value(relative_pointer(output_dir, &record.filename));
                entries
                    .get_mut(&key)
                    .map(|slot| std::mem::replace(slot, pointer))
            };
            if let Some(data) = data {
                taken.push((record.clone(), data));
            }
        }
    }
    taken
}

fn prune_empty_groups(components: &mut Mapping) {
    let empty: Vec<Value> = components
        .iter()
        .filter(|(_, entries)| entries.as_mapping().is_some_and(Mapping::is_empty))
        .map(|(key, _)| key.clone())
        .collect();
    for key in empty {
        components.remove(&key);
    }
}

/// Move inline code samples of every operation of a path item to their own
/// files, leaving a pointer relative to the paths directory.
fn extract_code_samples(
    item: &mut Value,
    output_dir: &Path,
    paths_dir: &Path,
    encoded_path: &str,
    report: &mut SplitReport,
) -> Result<(), SplitError> {
    let Some(item) = item.as_mapping_mut() else {
        return Ok(());
    };
    for method in HttpMethod::ALL {
        let Some(operation) = item
            .get_mut(method.as_str())
            .and_then(Value::as_mapping_mut)
        else {
            continue;
        };
        for key in CODE_SAMPLES_KEYS {
            let Some(samples) = operation.get_mut(key).and_then(Value::as_sequence_mut) else {
                continue;
            };
            for sample in samples.iter_mut().filter_map(Value::as_mapping_mut) {
                let Some(lang) = sample.get("lang").and_then(Value::as_str) else {
                    continue;
                };
                if !is_safe_lang(lang) {
                    report.warnings.push(Warning::UnsafeSampleLanguage {
                        path: encoded_path.to_string(),
                        lang: lang.to_string(),
                    });
                    continue;
                }
                // A source that is already a pointer stays as it is.
                let Some(source) = sample.get("source").and_then(Value::as_str) else {
                    continue;
                };
                let file = output_dir
                    .join(CODE_SAMPLES_DIR)
                    .join(lang)
                    .join(encoded_path)
                    .join(format!("{}{}", method.as_str(), lang_extension(lang)));
                write_text(&file, source)?;

                sample.insert(
                    Value::String("source".to_string()),
                    ref_value(relative_pointer(paths_dir, &file)),
                );
                report.code_samples.push(file);
            }
        }
    }
    Ok(())
}

/// Language names become a directory under `code_samples/`, so they must be a
/// single plain path segment.
fn is_safe_lang(lang: &str) -> bool {
    !lang.is_empty()
        && lang != "."
        && lang != ".."
        && !lang.contains(['/', '\\', '\0'])
        && !Path::new(lang).has_root()
}
