pub mod bundle;
pub mod component;
pub mod config;
pub mod crawl;
pub mod discriminator;
pub mod document;
pub mod error;
pub mod index;
pub mod migrate;
pub mod pointer;
pub mod rewrite;
pub mod split;
pub mod warning;

pub use bundle::bundle;
pub use component::{ComponentGroup, HttpMethod};
pub use discriminator::DiscriminatorPolicy;
pub use index::{ComponentRecord, ReferenceIndex};
pub use migrate::{AssumeYes, Confirm, MigrateOptions, MigrationOutcome, MigrationReport, migrate};
pub use split::{SplitOptions, SplitReport, split};
pub use warning::{Warning, Warnings};

/// A generated file with path and content.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}
