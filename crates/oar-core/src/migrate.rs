//! Upgrade a v2 split repository (`redocly.yaml` + `spec/`) to the v3 layout
//! (`.redocly.yaml` + `openapi/`).
//!
//! The steps run in a fixed order over an explicit [`MigrationState`]. Only a
//! missing v2 layout and index collisions abort before anything is touched;
//! every other anomaly becomes a [`Warning`] on the report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml_ng::{Mapping, Value};

use crate::component::{ComponentGroup, HttpMethod};
use crate::discriminator::{DiscriminatorPolicy, infer_discriminator};
use crate::document::{read_yaml, scalar_to_string, write_text, write_yaml};
use crate::error::MigrateError;
use crate::index::ReferenceIndex;
use crate::pointer::{decode_path, ref_value, relative_pointer};
use crate::rewrite::rewrite_refs;
use crate::split::{CODE_SAMPLES_DIR, COMPONENTS_DIR, ENTRYPOINT, PATHS_DIR};
use crate::warning::{Warning, Warnings};

pub const LEGACY_CONFIG: &str = "redocly.yaml";
pub const LEGACY_DIR: &str = "spec";
pub const TARGET_DIR: &str = "openapi";
pub const CLI_CONFIG: &str = ".redocly.yaml";
const WEB_CONFIG: &str = "web/redoc-config.yaml";
const WEB_TEMPLATE: &str = "web/index.html";
const PLUGINS_DIR: &str = "plugins";
const TRANSFORMERS_INDEX: &str = "transformers/index.js";
const TRANSFORMERS_CONTENT: &str =
    "// require transformers here and export them as an array below\n\nmodule.exports = [];\n";
const PACKAGE_JSON: &str = "package.json";
const GITIGNORE: &str = ".gitignore";
const GITIGNORE_DIST: &str = "# OpenAPI output bundles folder\ndist";
const LEGACY_DEPENDENCY: &str = "swagger-repo";
const CLI_DEPENDENCY: &str = "@redocly/openapi-cli";
const CLI_DEPENDENCY_VERSION: &str = "^1.0.0-beta.9";

pub const CONFIRM_MESSAGE: &str =
    "Please make sure you have a backup. The migration may lose some data. Proceed?";

/// Operator gate in front of the irreversible part of a migration.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Confirms everything, for `--yes` and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub discriminator: DiscriminatorPolicy,
}

#[derive(Debug)]
pub enum MigrationOutcome {
    /// The operator declined; nothing was changed.
    Cancelled,
    Completed(MigrationReport),
}

#[derive(Debug)]
pub struct MigrationReport {
    /// Where the definitions live now: `openapi/`, or `spec/` if the rename
    /// was blocked.
    pub openapi_dir: PathBuf,
    /// Path templates now listed in the entrypoint.
    pub paths: Vec<String>,
    pub components: usize,
    pub warnings: Warnings,
}

/// One old script invocation and what replaces it.
#[derive(Debug, Clone, Copy)]
pub struct ScriptRule {
    pub script: &'static str,
    pub legacy: &'static str,
    pub replacement: &'static str,
    /// Shown when the script is present but not recognized. `None` leaves
    /// unrecognized scripts alone silently.
    pub hint: Option<&'static str>,
    /// Add the bundle output folder to `.gitignore` once migrated.
    pub ignore_dist: bool,
}

pub const SCRIPT_RULES: [ScriptRule; 4] = [
    ScriptRule {
        script: "start",
        legacy: "swagger-repo serve",
        replacement: "openapi preview-docs",
        hint: Some("Use \"openapi preview-docs\" to preview docs."),
        ignore_dist: false,
    },
    ScriptRule {
        script: "build",
        legacy: "swagger-repo build",
        replacement: "openapi bundle -o dist",
        hint: Some("Use \"openapi bundle -o dist\" to bundle definitions."),
        ignore_dist: true,
    },
    ScriptRule {
        script: "test",
        legacy: "swagger-repo validate",
        replacement: "openapi lint",
        hint: Some("Use \"openapi lint\" to lint your API definitions."),
        ignore_dist: false,
    },
    ScriptRule {
        script: "gh-pages",
        legacy: "swagger-repo gh-pages",
        replacement: "echo \"Not implemented\"",
        hint: None,
        ignore_dist: false,
    },
];

impl ScriptRule {
    /// Whether one of the shell commands in `command` (split on `&`, `;` and
    /// `|`) starts with the legacy invocation, optionally behind `npx`.
    pub fn recognizes(&self, command: &str) -> bool {
        let legacy: Vec<&str> = self.legacy.split_whitespace().collect();
        command.split(['&', ';', '|']).any(|segment| {
            let words: Vec<&str> = segment.split_whitespace().collect();
            let words = match words.split_first() {
                Some((&"npx", rest)) => rest,
                _ => &words[..],
            };
            words.starts_with(&legacy)
        })
    }
}

/// Everything accumulated across the steps of one run.
#[derive(Debug)]
struct MigrationState {
    root: PathBuf,
    /// The definitions directory, updated by the rename step.
    spec_dir: PathBuf,
    paths: Mapping,
    security_schemes: Mapping,
    sample_langs: Vec<String>,
    components: usize,
    warnings: Warnings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliConfig {
    api_definitions: ApiDefinitions,
    lint: LintConfig,
    #[serde(skip_serializing_if = "Mapping::is_empty")]
    reference_docs: Mapping,
}

#[derive(Debug, Serialize)]
struct ApiDefinitions {
    main: String,
}

#[derive(Debug, Serialize)]
struct LintConfig {
    rules: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transformers: Option<String>,
}

/// Migrate the repository rooted at `root`.
pub fn migrate(
    root: &Path,
    options: &MigrateOptions,
    confirm: &mut dyn Confirm,
) -> Result<MigrationOutcome, MigrateError> {
    log::info!("starting migration in {}", root.display());
    detect_legacy_layout(root)?;

    if !confirm.confirm(CONFIRM_MESSAGE) {
        log::info!("migration cancelled");
        return Ok(MigrationOutcome::Cancelled);
    }

    let mut state = MigrationState {
        root: root.to_path_buf(),
        spec_dir: root.join(LEGACY_DIR),
        paths: Mapping::new(),
        security_schemes: Mapping::new(),
        sample_langs: Vec::new(),
        components: 0,
        warnings: Warnings::default(),
    };

    log::info!("loading schemas info");
    let index = ReferenceIndex::scan(&state.spec_dir.join(COMPONENTS_DIR), &mut state.warnings)?;

    log::info!("loading code samples");
    state.sample_langs = sample_languages(&state.spec_dir.join(CODE_SAMPLES_DIR))?;

    log::info!("updating paths");
    migrate_paths(&mut state, &index)?;

    log::info!("updating components");
    migrate_components(&mut state, &index, options.discriminator)?;

    rename_spec_dir(&mut state)?;

    log::info!("writing {CLI_CONFIG}");
    let description = write_cli_config(&mut state)?;

    log::info!("updating entrypoint {ENTRYPOINT}");
    update_entrypoint(&state, description.as_deref())?;

    log::info!("updating {PACKAGE_JSON}");
    migrate_package_json(&mut state)?;

    let paths = state.paths.keys().filter_map(scalar_to_string).collect();
    Ok(MigrationOutcome::Completed(MigrationReport {
        openapi_dir: state.spec_dir,
        paths,
        components: state.components,
        warnings: state.warnings,
    }))
}

fn detect_legacy_layout(root: &Path) -> Result<(), MigrateError> {
    if root.join(LEGACY_CONFIG).is_file() && root.join(LEGACY_DIR).is_dir() {
        return Ok(());
    }
    Err(MigrateError::NotDetected(format!(
        "create-openapi-repo v2 not detected in {} (expected {LEGACY_CONFIG} and {LEGACY_DIR}/). \
         Run the migration from the root of your repository.",
        root.display()
    )))
}

/// Names of the language directories under `code_samples/`, sorted.
fn sample_languages(dir: &Path) -> Result<Vec<String>, MigrateError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(io_error(dir, source)),
    };
    let mut langs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| io_error(dir, source))?;
        if entry.path().is_dir() {
            langs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    langs.sort();
    Ok(langs)
}

/// Files directly inside `dir` accepted by `keep`, sorted by name. A missing
/// directory yields nothing.
fn list_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, MigrateError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(io_error(dir, source)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| io_error(dir, source))?.path();
        if path.is_file() && keep(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn migrate_paths(state: &mut MigrationState, index: &ReferenceIndex) -> Result<(), MigrateError> {
    let paths_dir = state.spec_dir.join(PATHS_DIR);
    for file in list_files(&paths_dir, |p| p.extension().is_some_and(|e| e == "yaml"))? {
        let Some(stem) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let mut data = match read_yaml(&file) {
            Ok(data) => data,
            Err(err) => {
                state.warnings.push(Warning::UnreadableFile {
                    path: file,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        rewrite_refs(&mut data, &paths_dir, index);
        inject_code_samples(&mut data, &state.spec_dir, &paths_dir, &stem, &state.sample_langs)?;
        write_yaml(&data, &file)?;
        log::debug!("migrated {}", file.display());

        state.paths.insert(
            Value::String(decode_path(&stem)),
            ref_value(relative_pointer(&state.spec_dir, &file)),
        );
    }
    Ok(())
}

/// Point each operation of a path item at its code sample files, matching
/// `code_samples/<lang>/<encoded-path>/<method>.*`.
fn inject_code_samples(
    item: &mut Value,
    spec_dir: &Path,
    paths_dir: &Path,
    encoded_path: &str,
    langs: &[String],
) -> Result<(), MigrateError> {
    let Some(item) = item.as_mapping_mut() else {
        return Ok(());
    };
    for lang in langs {
        let samples_dir = spec_dir.join(CODE_SAMPLES_DIR).join(lang).join(encoded_path);
        let samples = list_files(&samples_dir, |_| true)?;
        if samples.is_empty() {
            continue;
        }
        for method in HttpMethod::ALL {
            let Some(operation) = item
                .get_mut(method.as_str())
                .and_then(Value::as_mapping_mut)
            else {
                continue;
            };
            let Some(sample) = samples
                .iter()
                .find(|file| file.file_stem().is_some_and(|stem| stem == method.as_str()))
            else {
                continue;
            };

            let key = Value::String("x-code-samples".to_string());
            if !operation.get(&key).is_some_and(Value::is_sequence) {
                operation.insert(key.clone(), Value::Sequence(Vec::new()));
            }
            let Some(Value::Sequence(list)) = operation.get_mut(&key) else {
                continue;
            };
            if list
                .iter()
                .any(|entry| entry.get("lang").and_then(Value::as_str) == Some(lang.as_str()))
            {
                continue;
            }
            let mut entry = Mapping::new();
            entry.insert(Value::String("lang".to_string()), Value::String(lang.clone()));
            entry.insert(
                Value::String("source".to_string()),
                ref_value(relative_pointer(paths_dir, sample)),
            );
            list.push(Value::Mapping(entry));
        }
    }
    Ok(())
}

fn migrate_components(
    state: &mut MigrationState,
    index: &ReferenceIndex,
    policy: DiscriminatorPolicy,
) -> Result<(), MigrateError> {
    for group in ComponentGroup::ALL {
        for record in index.group(group) {
            let mut data = match read_yaml(&record.filename) {
                Ok(data) => data,
                Err(err) => {
                    state.warnings.push(Warning::UnreadableFile {
                        path: record.filename.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            if group == ComponentGroup::Schemas {
                infer_discriminator(
                    &mut data,
                    &record.name,
                    &record.filename,
                    index,
                    policy,
                    &mut state.warnings,
                );
            }
            let dir = record.filename.parent().unwrap_or_else(|| Path::new(""));
            rewrite_refs(&mut data, dir, index);
            write_yaml(&data, &record.filename)?;
            state.components += 1;

            if group == ComponentGroup::SecuritySchemes {
                state.security_schemes.insert(
                    Value::String(record.name.clone()),
                    ref_value(relative_pointer(&state.spec_dir, &record.filename)),
                );
            }
        }
    }
    Ok(())
}

fn rename_spec_dir(state: &mut MigrationState) -> Result<(), MigrateError> {
    let target = state.root.join(TARGET_DIR);
    if target.exists() {
        state.warnings.push(Warning::RenameBlocked {
            from: state.spec_dir.clone(),
            to: target,
        });
        return Ok(());
    }
    log::info!("renaming {LEGACY_DIR}/ to {TARGET_DIR}/");
    fs::rename(&state.spec_dir, &target).map_err(|source| io_error(&state.spec_dir, source))?;
    state.spec_dir = target;
    Ok(())
}

/// Replace `redocly.yaml` with `.redocly.yaml`, carrying over the docs
/// options from the old web config. Returns the external description file
/// the old web config named, if any.
fn write_cli_config(state: &mut MigrationState) -> Result<Option<String>, MigrateError> {
    let legacy = state.root.join(LEGACY_CONFIG);
    fs::remove_file(&legacy).map_err(|source| io_error(&legacy, source))?;

    let mut reference_docs = Mapping::new();
    let web_config = state.root.join(WEB_CONFIG);
    if web_config.is_file() {
        if let Value::Mapping(options) = read_yaml(&web_config)? {
            reference_docs = options;
        }
        fs::remove_file(&web_config).map_err(|source| io_error(&web_config, source))?;
    }
    reference_docs.remove("redocURL");
    reference_docs.remove("redocExport");
    let description = reference_docs
        .remove("unstable_externalDescription")
        .as_ref()
        .and_then(scalar_to_string);
    if state.root.join(WEB_TEMPLATE).is_file() {
        reference_docs.insert(
            Value::String("htmlTemplate".to_string()),
            Value::String(format!("./{WEB_TEMPLATE}")),
        );
    }

    let mut lint = LintConfig {
        rules: IndexMap::from([("no-unused-schemas".to_string(), "warning".to_string())]),
        transformers: None,
    };

    let plugins = state.spec_dir.join(PLUGINS_DIR);
    if plugins.exists() {
        state.warnings.push(Warning::PluginsNotMigrated { path: plugins });
        write_text(&state.root.join(TRANSFORMERS_INDEX), TRANSFORMERS_CONTENT)?;
        lint.transformers = Some(format!("./{TRANSFORMERS_INDEX}"));
    }

    let config = CliConfig {
        api_definitions: ApiDefinitions {
            main: format!("{}/{ENTRYPOINT}", dir_name(&state.spec_dir)),
        },
        lint,
        reference_docs,
    };
    write_text(&state.root.join(CLI_CONFIG), &serde_yaml_ng::to_string(&config)?)?;
    Ok(description)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| TARGET_DIR.to_string())
}

/// Add the collected `paths` and `securitySchemes` to the entrypoint.
///
/// With an external description the entrypoint is rewritten structurally and
/// loses its comments; otherwise the fragment is appended to the file text.
fn update_entrypoint(state: &MigrationState, description: Option<&str>) -> Result<(), MigrateError> {
    let entrypoint = state.spec_dir.join(ENTRYPOINT);
    let Some(description) = description else {
        let fragment = entrypoint_fragment(&state.paths, &state.security_schemes)?;
        return append_to_file(&entrypoint, &fragment, "\n\n");
    };

    log::warn!(
        "rewriting {}: formatting and comments will be lost",
        entrypoint.display()
    );
    let from = state.root.join("web").join(description);
    let to = state.spec_dir.join(description);
    fs::rename(&from, &to).map_err(|source| io_error(&from, source))?;

    let mut document = read_yaml(&entrypoint)?;
    let Some(root) = document.as_mapping_mut() else {
        return Ok(());
    };
    let info = root
        .entry(Value::String("info".to_string()))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if let Some(info) = info.as_mapping_mut() {
        info.insert(
            Value::String("description".to_string()),
            ref_value(description),
        );
    }
    root.insert(
        Value::String("paths".to_string()),
        Value::Mapping(state.paths.clone()),
    );
    if !state.security_schemes.is_empty() {
        let components = root
            .entry(Value::String("components".to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if let Some(components) = components.as_mapping_mut() {
            components.insert(
                Value::String("securitySchemes".to_string()),
                Value::Mapping(state.security_schemes.clone()),
            );
        }
    }
    write_yaml(&document, &entrypoint)?;
    Ok(())
}

/// YAML text appended to a v2 entrypoint: `components.securitySchemes` (if
/// any) followed by `paths`.
pub fn entrypoint_fragment(
    paths: &Mapping,
    security_schemes: &Mapping,
) -> Result<String, MigrateError> {
    let mut fragment = String::new();
    if !security_schemes.is_empty() {
        let mut components = Mapping::new();
        components.insert(
            Value::String("securitySchemes".to_string()),
            Value::Mapping(security_schemes.clone()),
        );
        let mut wrapper = Mapping::new();
        wrapper.insert(
            Value::String("components".to_string()),
            Value::Mapping(components),
        );
        fragment.push_str(&serde_yaml_ng::to_string(&wrapper)?);
        fragment.push('\n');
    }
    let mut wrapper = Mapping::new();
    wrapper.insert(
        Value::String("paths".to_string()),
        Value::Mapping(paths.clone()),
    );
    fragment.push_str(&serde_yaml_ng::to_string(&wrapper)?);
    Ok(fragment)
}

fn migrate_package_json(state: &mut MigrationState) -> Result<(), MigrateError> {
    let path = state.root.join(PACKAGE_JSON);
    if !path.is_file() {
        state.warnings.push(Warning::MissingManifest { path });
        return Ok(());
    }
    let content = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
    let mut manifest: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| MigrateError::Json {
            path: path.clone(),
            source,
        })?;
    let Some(manifest_map) = manifest.as_object_mut() else {
        return Ok(());
    };

    let dependencies = manifest_map
        .entry("dependencies")
        .or_insert_with(|| serde_json::Value::Object(Default::default()));
    if let Some(dependencies) = dependencies.as_object_mut() {
        dependencies.remove(LEGACY_DEPENDENCY);
        dependencies.insert(
            CLI_DEPENDENCY.to_string(),
            serde_json::Value::String(CLI_DEPENDENCY_VERSION.to_string()),
        );
    }

    let mut ignore_dist = false;
    let scripts = manifest_map
        .entry("scripts")
        .or_insert_with(|| serde_json::Value::Object(Default::default()));
    if let Some(scripts) = scripts.as_object_mut() {
        for rule in &SCRIPT_RULES {
            let Some(command) = scripts.get(rule.script).and_then(serde_json::Value::as_str)
            else {
                if rule.hint.is_some() {
                    state.warnings.push(Warning::MissingScript {
                        script: rule.script.to_string(),
                    });
                }
                continue;
            };
            if rule.recognizes(command) {
                scripts.insert(
                    rule.script.to_string(),
                    serde_json::Value::String(rule.replacement.to_string()),
                );
                ignore_dist |= rule.ignore_dist;
            } else if let Some(hint) = rule.hint {
                state.warnings.push(Warning::ScriptNotMigrated {
                    script: rule.script.to_string(),
                    hint: hint.to_string(),
                });
            }
        }
    }

    let json = serde_json::to_string_pretty(&manifest).map_err(|source| MigrateError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| io_error(&path, source))?;

    if ignore_dist {
        append_to_file(&state.root.join(GITIGNORE), GITIGNORE_DIST, "\n\n")?;
    }
    Ok(())
}

fn append_to_file(path: &Path, text: &str, separator: &str) -> Result<(), MigrateError> {
    let mut content = match fs::read_to_string(path) {
        Ok(existing) => existing + separator,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(source) => return Err(io_error(path, source)),
    };
    content.push_str(text);
    fs::write(path, content).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: io::Error) -> MigrateError {
    MigrateError::Io {
        path: path.to_path_buf(),
        source,
    }
}
