use std::fs;
use std::path::{Path, PathBuf};

use oar_core::crawl::crawl;
use oar_core::document::{self, read_yaml};
use oar_core::pointer::{is_file_pointer, resolve_file_pointer};
use oar_core::split::ENTRYPOINT;
use oar_core::{DiscriminatorPolicy, SplitOptions, Warning, bundle, split};
use serde_yaml_ng::{Mapping, Value};

const PETSTORE: &str = include_str!("fixtures/petstore.yaml");
const BOOKSTORE: &str = include_str!("fixtures/bookstore.yaml");

fn refs_in(file: &Path) -> Vec<String> {
    let mut data = read_yaml(file).expect("should read written file");
    let mut refs = Vec::new();
    crawl(&mut data, &mut |map: &mut Mapping, key: &Value| {
        if key.as_str() == Some("$ref") {
            if let Some(target) = map.get("$ref").and_then(Value::as_str) {
                refs.push(target.to_string());
            }
        }
    });
    refs
}

fn one_of_refs(schema: &Value) -> Vec<String> {
    schema["oneOf"]
        .as_sequence()
        .expect("oneOf should be a list")
        .iter()
        .filter_map(|entry| entry["$ref"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn split_minimal_document() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("openapi");
    let doc = document::from_yaml(
        r#"
openapi: 3.0.0
info: {title: Pets, version: '1'}
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
components:
  schemas:
    Pet:
      type: object
"#,
    )
    .expect("should parse");

    let report = split(doc, &out, &SplitOptions::default()).expect("should split");
    assert_eq!(report.paths, vec![out.join("paths/@pets.yaml")]);
    assert_eq!(report.components, vec![out.join("components/schemas/Pet.yaml")]);
    assert!(report.warnings.is_empty());

    let path_file = read_yaml(&out.join("paths/@pets.yaml")).unwrap();
    let schema = &path_file["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    assert_eq!(schema["$ref"], "../components/schemas/Pet.yaml");

    let pet = read_yaml(&out.join("components/schemas/Pet.yaml")).unwrap();
    assert_eq!(pet["type"], "object");

    let root = read_yaml(&out.join(ENTRYPOINT)).unwrap();
    assert_eq!(root["paths"]["/pets"]["$ref"], "./paths/@pets.yaml");
    assert!(root.get("components").is_none());
}

#[test]
fn every_written_pointer_resolves() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    let doc = document::from_yaml(PETSTORE).unwrap();
    let report = split(doc, out, &SplitOptions::default()).unwrap();
    assert_eq!(report.paths.len(), 2);
    assert_eq!(report.components.len(), 11);
    assert_eq!(report.code_samples.len(), 2);

    let files: Vec<PathBuf> = report
        .paths
        .iter()
        .chain(&report.components)
        .cloned()
        .chain([out.join(ENTRYPOINT)])
        .collect();
    for file in files {
        let dir = file.parent().unwrap();
        for target in refs_in(&file) {
            assert!(
                is_file_pointer(&target),
                "{} still has in-document pointer {target}",
                file.display()
            );
            assert!(
                target.starts_with("./") || target.starts_with("../"),
                "{target} is not clearly relative"
            );
            let resolved = resolve_file_pointer(dir, &target);
            assert!(
                resolved.is_file(),
                "{target} in {} does not resolve ({})",
                file.display(),
                resolved.display()
            );
        }
    }
}

#[test]
fn path_files_point_at_component_files() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    split(document::from_yaml(PETSTORE).unwrap(), out, &SplitOptions::default()).unwrap();

    let item = read_yaml(&out.join("paths/@pets@{petId}.yaml")).unwrap();
    assert_eq!(
        item["parameters"][0]["$ref"],
        "../components/parameters/PetId.yaml"
    );
    assert_eq!(
        item["get"]["responses"]["404"]["$ref"],
        "../components/responses/NotFound.yaml"
    );
    assert_eq!(
        item["get"]["x-code-samples"][0]["source"]["$ref"],
        "../code_samples/curl/@pets@{petId}/get.sh"
    );
    assert_eq!(
        fs::read_to_string(out.join("code_samples/Python/@pets@{petId}/get.py")).unwrap(),
        "import requests\nrequests.get(\"https://petstore.example.com/v1/pets/42\")\n"
    );

    let error = read_yaml(&out.join("components/responses/Error.yaml")).unwrap();
    assert_eq!(
        error["content"]["application/json"]["schema"]["$ref"],
        "../schemas/Error.yaml"
    );
}

#[test]
fn discriminator_lists_all_subtypes() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    let report =
        split(document::from_yaml(PETSTORE).unwrap(), out, &SplitOptions::default()).unwrap();
    assert!(report.warnings.is_empty());

    let pet = read_yaml(&out.join("components/schemas/Pet.yaml")).unwrap();
    assert_eq!(one_of_refs(&pet), vec!["./Cat.yaml", "./Dog.yaml"]);
    assert_eq!(pet["properties"]["owner"]["$ref"], "./Owner.yaml");

    let cat = read_yaml(&out.join("components/schemas/Cat.yaml")).unwrap();
    assert_eq!(cat["allOf"][0]["$ref"], "./Pet.yaml");
}

#[test]
fn mapping_policy_fills_discriminator_mapping() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    let options = SplitOptions {
        discriminator: DiscriminatorPolicy::Mapping,
        ..SplitOptions::default()
    };
    split(document::from_yaml(PETSTORE).unwrap(), out, &options).unwrap();

    let pet = read_yaml(&out.join("components/schemas/Pet.yaml")).unwrap();
    assert_eq!(pet["discriminator"]["mapping"]["Cat"], "./Cat.yaml");
    assert_eq!(pet["discriminator"]["mapping"]["Dog"], "./Dog.yaml");
    assert!(pet.get("oneOf").is_none());
}

#[test]
fn explicit_mapping_entry_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    let mut doc = document::from_yaml(PETSTORE).unwrap();
    let discriminator = &mut doc["components"]["schemas"]["Pet"]["discriminator"];
    discriminator["propertyName"] = Value::String("kind".to_string());
    let mapping: Value = serde_yaml_ng::from_str("Dog: '#/components/schemas/Owner'").unwrap();
    if let Value::Mapping(map) = discriminator {
        map.insert(Value::String("mapping".to_string()), mapping);
    }

    let report = split(doc, out, &SplitOptions::default()).unwrap();
    assert_eq!(
        report.warnings.into_vec(),
        vec![Warning::DiscriminatorConflict {
            path: out.join("components/schemas/Pet.yaml"),
            subtype: "Dog".to_string(),
        }]
    );

    let pet = read_yaml(&out.join("components/schemas/Pet.yaml")).unwrap();
    assert_eq!(one_of_refs(&pet), vec!["./Cat.yaml"]);
    assert_eq!(pet["discriminator"]["mapping"]["Dog"], "./Owner.yaml");
}

#[test]
fn rerun_with_same_input_is_clean() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    split(document::from_yaml(PETSTORE).unwrap(), out, &SplitOptions::default()).unwrap();
    let pet_before = fs::read_to_string(out.join("components/schemas/Pet.yaml")).unwrap();

    let report =
        split(document::from_yaml(PETSTORE).unwrap(), out, &SplitOptions::default()).unwrap();
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.components.len(), 11);
    assert_eq!(
        fs::read_to_string(out.join("components/schemas/Pet.yaml")).unwrap(),
        pet_before
    );
}

#[test]
fn changed_component_is_not_overwritten() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    split(document::from_yaml(PETSTORE).unwrap(), out, &SplitOptions::default()).unwrap();
    let owner_file = out.join("components/schemas/Owner.yaml");
    let owner_before = fs::read_to_string(&owner_file).unwrap();
    let pet_file = out.join("components/schemas/Pet.yaml");
    let pet_before = fs::read_to_string(&pet_file).unwrap();

    let mut changed = document::from_yaml(PETSTORE).unwrap();
    changed["components"]["schemas"]["Owner"]["description"] =
        Value::String("Changed between runs".to_string());

    let report = split(changed, out, &SplitOptions::default()).unwrap();
    assert_eq!(
        report.warnings.into_vec(),
        vec![Warning::ComponentConflict {
            path: owner_file.clone(),
            name: "Owner".to_string(),
        }]
    );
    assert_eq!(fs::read_to_string(&owner_file).unwrap(), owner_before);
    assert_eq!(report.components.len(), 10);

    // Files referring to the conflicting component keep pointing at its file.
    assert_eq!(fs::read_to_string(&pet_file).unwrap(), pet_before);
    for file in report.components.iter().chain(&report.paths) {
        for pointer in refs_in(file) {
            assert!(
                !pointer.starts_with("#/components/"),
                "{} still holds {pointer}",
                file.display()
            );
        }
    }

    let root = read_yaml(&out.join(ENTRYPOINT)).unwrap();
    assert_eq!(
        root["components"]["schemas"]["Owner"]["description"],
        "Changed between runs"
    );
}

#[test]
fn inline_code_samples_option_keeps_sources() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    let options = SplitOptions {
        inline_code_samples: true,
        ..SplitOptions::default()
    };
    let report = split(document::from_yaml(PETSTORE).unwrap(), out, &options).unwrap();
    assert!(report.code_samples.is_empty());
    assert!(!out.join("code_samples").exists());

    let item = read_yaml(&out.join("paths/@pets@{petId}.yaml")).unwrap();
    assert_eq!(item["get"]["x-code-samples"][0]["lang"], "curl");
    assert!(item["get"]["x-code-samples"][0]["source"].is_string());
}

#[test]
fn bundle_restores_split_document() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("openapi");
    let original = document::from_yaml(BOOKSTORE).unwrap();
    split(original.clone(), &out, &SplitOptions::default()).unwrap();

    let bundled = bundle(&out.join(ENTRYPOINT)).expect("should bundle");
    assert_eq!(bundled, original);
}

#[test]
fn bundle_after_conflict_keeps_inline_definition() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    split(document::from_yaml(PETSTORE).unwrap(), out, &SplitOptions::default()).unwrap();

    let mut changed = document::from_yaml(PETSTORE).unwrap();
    changed["components"]["schemas"]["Owner"]["description"] =
        Value::String("Changed between runs".to_string());
    split(changed, out, &SplitOptions::default()).unwrap();

    let bundled = bundle(&out.join(ENTRYPOINT)).unwrap();
    let schemas = &bundled["components"]["schemas"];
    assert_eq!(schemas["Owner"]["description"], "Changed between runs");
    assert_eq!(
        schemas["Pet"]["properties"]["owner"]["$ref"],
        "#/components/schemas/Owner"
    );
    assert_eq!(schemas["Cat"]["allOf"][0]["$ref"], "#/components/schemas/Pet");
}

#[test]
fn bundle_restores_deep_pointers() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path();
    split(document::from_yaml(BOOKSTORE).unwrap(), out, &SplitOptions::default()).unwrap();

    let item = read_yaml(&out.join("paths/@authors@{id}@books.yaml")).unwrap();
    let items = &item["get"]["responses"]["200"]["content"]["application/json"]["schema"]["items"];
    assert_eq!(items["$ref"], "../components/schemas/Book.yaml#/properties/isbn");

    let bundled = bundle(&out.join(ENTRYPOINT)).unwrap();
    let items =
        &bundled["paths"]["/authors/{id}/books"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"]["items"];
    assert_eq!(items["$ref"], "#/components/schemas/Book/properties/isbn");
    assert_eq!(
        bundled["components"]["schemas"]["Author"]["properties"]["website"]["$ref"],
        "https://schemas.example.com/common.yaml#/Url"
    );
}
