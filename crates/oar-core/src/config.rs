use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::discriminator::DiscriminatorPolicy;

/// Project configuration loaded from `.oar.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OarConfig {
    /// Existing definition to split when creating a repository.
    pub definition: Option<String>,
    pub openapi_dir: String,
    pub docs_dir: String,
    /// Move inline `x-code-samples` into `code_samples/`.
    pub code_samples: bool,
    pub discriminator: DiscriminatorPolicy,
}

impl Default for OarConfig {
    fn default() -> Self {
        Self {
            definition: None,
            openapi_dir: "openapi".to_string(),
            docs_dir: "docs".to_string(),
            code_samples: true,
            discriminator: DiscriminatorPolicy::OneOf,
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".oar.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<OarConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: OarConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# oar configuration
# definition: petstore.yaml   # existing definition to split on `oar create`
openapi_dir: openapi
docs_dir: docs
code_samples: true      # extract x-code-samples into code_samples/<lang>/
discriminator: one_of   # one_of | mapping
"#
}
