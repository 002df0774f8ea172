//! Implicit polymorphism: a schema with a `discriminator` gets every schema
//! that extends it through `allOf` listed as a subtype.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value};

use crate::component::ComponentGroup;
use crate::index::{ComponentRecord, ReferenceIndex};
use crate::pointer::{
    ComponentPointer, is_file_pointer, ref_of, ref_value, relative_pointer, resolve_file_pointer,
};
use crate::warning::{Warning, Warnings};

/// How inferred subtypes are written into the base schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscriminatorPolicy {
    /// Append `{ $ref: <subtype file> }` to the schema's `oneOf`.
    #[default]
    OneOf,
    /// Add `<subtype name>: <subtype file>` to `discriminator.mapping`.
    Mapping,
}

/// Add the subtypes of `schema_name` to its discriminator construct.
///
/// Does nothing when the schema has no `discriminator` or nothing extends it.
/// An explicit `discriminator.mapping` entry keyed by a subtype's name always
/// wins; if it points at a different schema a warning is recorded and that
/// subtype is not added.
pub fn infer_discriminator(
    schema: &mut Value,
    schema_name: &str,
    schema_file: &Path,
    index: &ReferenceIndex,
    policy: DiscriminatorPolicy,
    warnings: &mut Warnings,
) {
    let Some(schema_map) = schema.as_mapping_mut() else {
        return;
    };
    if !schema_map
        .get("discriminator")
        .is_some_and(Value::is_mapping)
    {
        return;
    }

    let base = ComponentPointer::new(ComponentGroup::Schemas, schema_name).to_string();
    let subtypes: Vec<&ComponentRecord> = index
        .schemas()
        .filter(|record| record.inherits.iter().any(|pointer| *pointer == base))
        .collect();
    if subtypes.is_empty() {
        return;
    }

    let schema_dir = schema_file.parent().unwrap_or_else(|| Path::new(""));
    for record in subtypes {
        let explicit = schema_map
            .get("discriminator")
            .and_then(|d| d.get("mapping"))
            .and_then(|m| m.get(record.name.as_str()))
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(existing) = explicit {
            if !points_at(&existing, record, schema_dir, index) {
                warnings.push(Warning::DiscriminatorConflict {
                    path: schema_file.to_path_buf(),
                    subtype: record.name.clone(),
                });
                continue;
            }
            if policy == DiscriminatorPolicy::Mapping {
                continue;
            }
        }

        let target = relative_pointer(schema_dir, &record.filename);
        match policy {
            DiscriminatorPolicy::Mapping => {
                if let Some(mapping) = discriminator_mapping(schema_map) {
                    mapping.insert(
                        Value::String(record.name.clone()),
                        Value::String(target),
                    );
                }
            }
            DiscriminatorPolicy::OneOf => {
                let Some(one_of) = sequence_entry(schema_map, "oneOf") else {
                    continue;
                };
                let listed = one_of.iter().any(|entry| {
                    ref_of(entry).is_some_and(|r| points_at(r, record, schema_dir, index))
                });
                if !listed {
                    one_of.push(ref_value(target));
                }
            }
        }
    }
}

/// Whether a pointer found in the schema (in-document pointer, file pointer,
/// or bare schema name) designates `record`.
fn points_at(pointer: &str, record: &ComponentRecord, schema_dir: &Path, index: &ReferenceIndex) -> bool {
    if let Some(parsed) = ComponentPointer::parse(pointer) {
        return parsed.fragment.is_none()
            && parsed.group == record.group
            && parsed.name == record.name;
    }
    if pointer == record.name {
        return true;
    }
    if is_file_pointer(pointer) {
        let resolved = resolve_file_pointer(schema_dir, pointer);
        return index
            .locate(&resolved)
            .is_some_and(|found| found.group == record.group && found.name == record.name);
    }
    false
}

fn discriminator_mapping(schema: &mut Mapping) -> Option<&mut Mapping> {
    let discriminator = schema.get_mut("discriminator")?.as_mapping_mut()?;
    if !discriminator
        .get("mapping")
        .is_some_and(Value::is_mapping)
    {
        discriminator.insert(
            Value::String("mapping".to_string()),
            Value::Mapping(Mapping::new()),
        );
    }
    discriminator.get_mut("mapping")?.as_mapping_mut()
}

fn sequence_entry<'a>(schema: &'a mut Mapping, key: &str) -> Option<&'a mut Vec<Value>> {
    let slot = schema
        .entry(Value::String(key.to_string()))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if !slot.is_sequence() {
        *slot = Value::Sequence(Vec::new());
    }
    slot.as_sequence_mut()
}
