use std::path::PathBuf;

use thiserror::Error;

/// A recoverable anomaly. The operation that hit it carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// A component file already exists with different content and was left alone.
    #[error(
        "conflict for {name}: file already exists with different content: {}, skipped",
        .path.display()
    )]
    ComponentConflict { path: PathBuf, name: String },

    /// An explicit discriminator entry disagrees with the inferred subtype.
    #[error(
        "{}: discriminator already maps \"{subtype}\" elsewhere, keeping the explicit entry",
        .path.display()
    )]
    DiscriminatorConflict { path: PathBuf, subtype: String },

    /// A directory under `components/` that is not a known component group.
    #[error("{} is not a component group, ignored", .path.display())]
    UnknownComponentDirectory { path: PathBuf },

    /// A code sample whose `lang` can't be used as a directory name.
    #[error("code sample language \"{lang}\" in {path} is not a plain name, left inline")]
    UnsafeSampleLanguage { path: String, lang: String },

    #[error("skipping {}: {reason}", .path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    #[error(
        "failed to rename directory \"{}\" to \"{}\": target already exists",
        .from.display(),
        .to.display()
    )]
    RenameBlocked { from: PathBuf, to: PathBuf },

    #[error(
        "plugins in {} can't be migrated automatically, use transformers instead (folder not removed)",
        .path.display()
    )]
    PluginsNotMigrated { path: PathBuf },

    #[error("can't migrate \"{script}\" script. {hint}")]
    ScriptNotMigrated { script: String, hint: String },

    #[error("no \"{script}\" script found, nothing to migrate")]
    MissingScript { script: String },

    #[error("{} not found, scripts not migrated", .path.display())]
    MissingManifest { path: PathBuf },
}

/// Collected warnings. Each one is logged as it is recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn push(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.0.push(warning);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_file() {
        let warning = Warning::ComponentConflict {
            path: PathBuf::from("openapi/components/schemas/Owner.yaml"),
            name: "Owner".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "conflict for Owner: file already exists with different content: openapi/components/schemas/Owner.yaml, skipped"
        );

        let warning = Warning::RenameBlocked {
            from: PathBuf::from("spec"),
            to: PathBuf::from("openapi"),
        };
        assert_eq!(
            warning.to_string(),
            "failed to rename directory \"spec\" to \"openapi\": target already exists"
        );
    }

    #[test]
    fn collected_in_order() {
        let mut warnings = Warnings::default();
        warnings.push(Warning::MissingScript {
            script: "deploy".to_string(),
        });
        warnings.push(Warning::UnsafeSampleLanguage {
            path: "@pets".to_string(),
            lang: "..".to_string(),
        });
        assert_eq!(warnings.len(), 2);
        let messages: Vec<String> = warnings.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "no \"deploy\" script found, nothing to migrate".to_string(),
                "code sample language \"..\" in @pets is not a plain name, left inline".to_string(),
            ]
        );
    }
}
