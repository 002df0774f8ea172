//! Translation between in-document pointers and file pointers.
//!
//! [`rewrite_refs`] turns `#/components/<group>/<name>` into a path relative to
//! the file being rewritten; [`restore_refs`] goes the other way when a split
//! repository is folded back into one document. Both act on `$ref` values and
//! on `discriminator.mapping` values, and leave anything they cannot resolve
//! through the index untouched.

use std::path::Path;

use serde_yaml_ng::{Mapping, Value};

use crate::crawl::crawl;
use crate::index::ReferenceIndex;
use crate::pointer::{
    ComponentPointer, is_file_pointer, relative_pointer, resolve_file_pointer, split_fragment,
};

/// Replace in-document component pointers with file pointers relative to
/// `current_dir`, the directory of the file `node` will be written to.
pub fn rewrite_refs(node: &mut Value, current_dir: &Path, index: &ReferenceIndex) {
    rewrite_with(node, &mut |pointer| {
        to_file_pointer(pointer, current_dir, index)
    });
}

/// Replace file pointers that resolve to indexed component files with
/// in-document pointers. `current_dir` is the directory of the file `node`
/// was read from.
pub fn restore_refs(node: &mut Value, current_dir: &Path, index: &ReferenceIndex) {
    rewrite_with(node, &mut |pointer| {
        to_document_pointer(pointer, current_dir, index)
    });
}

/// File pointer for an in-document component pointer, if the index knows it.
pub fn to_file_pointer(pointer: &str, current_dir: &Path, index: &ReferenceIndex) -> Option<String> {
    let parsed = ComponentPointer::parse(pointer)?;
    let record = index.resolve(&parsed)?;
    let mut target = relative_pointer(current_dir, &record.filename);
    if let Some(fragment) = parsed.fragment {
        target.push('#');
        target.push_str(&fragment);
    }
    Some(target)
}

/// In-document pointer for a file pointer, if it lands on an indexed file.
pub fn to_document_pointer(
    pointer: &str,
    current_dir: &Path,
    index: &ReferenceIndex,
) -> Option<String> {
    if !is_file_pointer(pointer) {
        return None;
    }
    let record = index.locate(&resolve_file_pointer(current_dir, pointer))?;
    let mut target = record.pointer();
    target.fragment = split_fragment(pointer)
        .1
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string);
    Some(target.to_string())
}

fn rewrite_with<F>(node: &mut Value, translate: &mut F)
where
    F: FnMut(&str) -> Option<String>,
{
    crawl(node, &mut |map: &mut Mapping, key: &Value| match key.as_str() {
        Some("$ref") => {
            if let Some(Value::String(target)) = map.get_mut("$ref") {
                if let Some(replacement) = translate(target) {
                    *target = replacement;
                }
            }
        }
        Some("discriminator") => {
            let mapping = map
                .get_mut("discriminator")
                .and_then(|d| d.get_mut("mapping"))
                .and_then(Value::as_mapping_mut);
            if let Some(mapping) = mapping {
                for value in mapping.values_mut() {
                    if let Value::String(target) = value {
                        if let Some(replacement) = translate(target) {
                            *target = replacement;
                        }
                    }
                }
            }
        }
        _ => {}
    });
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::component::ComponentGroup;
    use crate::index::ComponentRecord;

    fn index() -> ReferenceIndex {
        let mut index = ReferenceIndex::new();
        for (group, name) in [
            (ComponentGroup::Schemas, "Pet"),
            (ComponentGroup::Schemas, "Cat"),
            (ComponentGroup::Responses, "NotFound"),
        ] {
            index
                .insert(ComponentRecord::new(
                    group,
                    name,
                    ReferenceIndex::component_file(Path::new("out/components"), group, name),
                    &Value::Null,
                ))
                .unwrap();
        }
        index
    }

    #[test]
    fn rewrite_nested_refs_from_path_file() {
        let mut node: Value = serde_yaml_ng::from_str(
            r#"
get:
  responses:
    '200':
      content:
        application/json:
          schema:
            type: array
            items:
              $ref: '#/components/schemas/Pet'
    '404':
      $ref: '#/components/responses/NotFound'
"#,
        )
        .unwrap();
        rewrite_refs(&mut node, Path::new("out/paths"), &index());

        let ok = &node["get"]["responses"]["200"]["content"]["application/json"]["schema"];
        assert_eq!(ok["items"]["$ref"], "../components/schemas/Pet.yaml");
        assert_eq!(
            node["get"]["responses"]["404"]["$ref"],
            "../components/responses/NotFound.yaml"
        );
    }

    #[test]
    fn rewrite_sibling_component() {
        let mut node: Value =
            serde_yaml_ng::from_str("allOf:\n  - $ref: '#/components/schemas/Pet'\n").unwrap();
        rewrite_refs(&mut node, Path::new("out/components/schemas"), &index());
        assert_eq!(node["allOf"][0]["$ref"], "./Pet.yaml");
    }

    #[test]
    fn unknown_and_external_refs_pass_through() {
        let mut node: Value = serde_yaml_ng::from_str(
            r#"
a: {$ref: '#/components/schemas/Ghost'}
b: {$ref: 'https://example.com/defs.yaml#/Thing'}
c: {$ref: '#/paths/~1pets'}
"#,
        )
        .unwrap();
        let before = node.clone();
        rewrite_refs(&mut node, Path::new("out"), &index());
        assert_eq!(node, before);
    }

    #[test]
    fn rewrite_keeps_fragment() {
        let mut node: Value =
            serde_yaml_ng::from_str("$ref: '#/components/schemas/Pet/properties/id'\n").unwrap();
        rewrite_refs(&mut node, Path::new("out"), &index());
        assert_eq!(node["$ref"], "./components/schemas/Pet.yaml#/properties/id");
    }

    #[test]
    fn rewrite_discriminator_mapping() {
        let mut node: Value = serde_yaml_ng::from_str(
            r#"
discriminator:
  propertyName: kind
  mapping:
    cat: '#/components/schemas/Cat'
    other: Unlisted
"#,
        )
        .unwrap();
        rewrite_refs(&mut node, Path::new("out/components/schemas"), &index());
        assert_eq!(node["discriminator"]["mapping"]["cat"], "./Cat.yaml");
        assert_eq!(node["discriminator"]["mapping"]["other"], "Unlisted");
    }

    #[test]
    fn restore_reverses_rewrite() {
        let original: Value = serde_yaml_ng::from_str(
            r#"
schema:
  oneOf:
    - $ref: '#/components/schemas/Cat'
    - $ref: '#/components/schemas/Pet/properties/name'
  discriminator:
    propertyName: kind
    mapping:
      cat: '#/components/schemas/Cat'
"#,
        )
        .unwrap();
        let mut node = original.clone();
        let dir = PathBuf::from("out/paths");
        rewrite_refs(&mut node, &dir, &index());
        assert_ne!(node, original);
        restore_refs(&mut node, &dir, &index());
        assert_eq!(node, original);
    }
}
