use std::path::Path;

use heck::ToKebabCase;
use minijinja::{Environment, context};
use oar_core::GeneratedFile;
use oar_core::pointer::relative_pointer;
use oar_core::split::{CODE_SAMPLES_DIR, ENTRYPOINT};

use crate::error::ScaffoldError;

const FALLBACK_PACKAGE_NAME: &str = "openapi-definition";

/// What goes into a new repository's boilerplate.
#[derive(Debug, Clone)]
pub struct ScaffoldOptions {
    pub api_title: String,
    /// Directory the definition is split into, relative to the repository root.
    pub openapi_dir: String,
    /// Directory holding the static docs page.
    pub docs_dir: String,
    /// Whether to prepare `<openapi_dir>/code_samples/`.
    pub code_samples: bool,
}

/// Render the boilerplate files of a new repository. Paths are relative to
/// the repository root.
pub fn emit_scaffold(options: &ScaffoldOptions) -> Result<Vec<GeneratedFile>, ScaffoldError> {
    let env = environment()?;
    let main_definition = join(&options.openapi_dir, ENTRYPOINT);
    let ctx = context! {
        api_title => options.api_title,
        package_name => package_name(&options.api_title),
        description_json => serde_json::to_string(&format!("{} OpenAPI definition", options.api_title))?,
        openapi_dir => options.openapi_dir,
        docs_dir => options.docs_dir,
        code_samples => options.code_samples,
        main_definition => main_definition,
        spec_url => relative_pointer(Path::new(&options.docs_dir), Path::new("dist/openapi.yaml")),
    };

    let mut outputs = vec![
        ("package.json".to_string(), "package.json.j2"),
        ("README.md".to_string(), "README.md.j2"),
        (".redocly.yaml".to_string(), "redocly.yaml.j2"),
        (".gitignore".to_string(), "gitignore.j2"),
        (join(&options.openapi_dir, "README.md"), "openapi-README.md.j2"),
        (join(&options.docs_dir, "index.html"), "index.html.j2"),
    ];
    if options.code_samples {
        outputs.push((
            join(&join(&options.openapi_dir, CODE_SAMPLES_DIR), "README.md"),
            "code_samples-README.md.j2",
        ));
    }

    let mut files = Vec::with_capacity(outputs.len());
    for (path, template) in outputs {
        let mut content = env.get_template(template)?.render(&ctx)?;
        content.push('\n');
        log::debug!("rendered {path} from {template}");
        files.push(GeneratedFile { path, content });
    }
    Ok(files)
}

/// npm package name for an API title: `My Pet API` → `my-pet-api`.
pub fn package_name(api_title: &str) -> String {
    let name = api_title.to_kebab_case();
    if name.is_empty() {
        FALLBACK_PACKAGE_NAME.to_string()
    } else {
        name
    }
}

/// Definition split into a new repository when the operator brings none.
pub fn starter_definition() -> &'static str {
    include_str!("../templates/openapi.yaml")
}

fn environment() -> Result<Environment<'static>, ScaffoldError> {
    let mut env = Environment::new();
    env.add_template("package.json.j2", include_str!("../templates/package.json.j2"))?;
    env.add_template("README.md.j2", include_str!("../templates/README.md.j2"))?;
    env.add_template("redocly.yaml.j2", include_str!("../templates/redocly.yaml.j2"))?;
    env.add_template("gitignore.j2", include_str!("../templates/gitignore.j2"))?;
    env.add_template(
        "openapi-README.md.j2",
        include_str!("../templates/openapi-README.md.j2"),
    )?;
    env.add_template("index.html.j2", include_str!("../templates/index.html.j2"))?;
    env.add_template(
        "code_samples-README.md.j2",
        include_str!("../templates/code_samples-README.md.j2"),
    )?;
    Ok(env)
}

fn join(dir: &str, file: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ScaffoldOptions {
        ScaffoldOptions {
            api_title: "Pet \"Store\" API".to_string(),
            openapi_dir: "openapi".to_string(),
            docs_dir: "docs".to_string(),
            code_samples: true,
        }
    }

    fn file<'a>(files: &'a [GeneratedFile], path: &str) -> &'a GeneratedFile {
        files
            .iter()
            .find(|f| f.path == path)
            .unwrap_or_else(|| panic!("{path} should be generated"))
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("My API Service"), "my-api-service");
        assert_eq!(package_name("Swagger Petstore"), "swagger-petstore");
        assert_eq!(package_name("  "), "openapi-definition");
    }

    #[test]
    fn test_emit_scaffold_with_code_samples() {
        let files = emit_scaffold(&options()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "package.json",
                "README.md",
                ".redocly.yaml",
                ".gitignore",
                "openapi/README.md",
                "docs/index.html",
                "openapi/code_samples/README.md",
            ]
        );
    }

    #[test]
    fn test_emit_scaffold_without_code_samples() {
        let mut options = options();
        options.code_samples = false;
        let files = emit_scaffold(&options).unwrap();
        assert_eq!(files.len(), 6);
        assert!(!file(&files, "README.md").content.contains("code_samples"));
    }

    #[test]
    fn test_package_json_is_valid() {
        let files = emit_scaffold(&options()).unwrap();
        let manifest: serde_json::Value =
            serde_json::from_str(&file(&files, "package.json").content).unwrap();
        assert_eq!(manifest["name"], "pet-store-api");
        assert_eq!(manifest["description"], "Pet \"Store\" API OpenAPI definition");
        assert_eq!(manifest["scripts"]["build"], "openapi bundle -o dist");
    }

    #[test]
    fn test_redocly_config() {
        let mut options = options();
        options.openapi_dir = "definitions/".to_string();
        let files = emit_scaffold(&options).unwrap();
        insta::assert_snapshot!(file(&files, ".redocly.yaml").content, @r"
        apiDefinitions:
          main: definitions/openapi.yaml
        lint:
          rules:
            no-unused-schemas: warning
        ");
        assert!(files.iter().any(|f| f.path == "definitions/README.md"));
    }

    #[test]
    fn test_docs_page_points_at_bundle() {
        let files = emit_scaffold(&options()).unwrap();
        let page = &file(&files, "docs/index.html").content;
        assert!(page.contains("<title>Pet &quot;Store&quot; API</title>"));
        assert!(page.contains("<redoc spec-url="));
    }

    #[test]
    fn test_starter_definition_is_valid() {
        let doc = oar_core::document::from_yaml(starter_definition()).unwrap();
        assert_eq!(oar_core::document::title(&doc), Some("Example API"));
        let schemas = doc["components"]["schemas"].as_mapping().unwrap();
        assert_eq!(schemas.len(), 3);
    }
}
