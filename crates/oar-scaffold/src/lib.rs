pub mod error;
pub mod scaffold;

pub use error::ScaffoldError;
pub use scaffold::{ScaffoldOptions, emit_scaffold, package_name, starter_definition};
