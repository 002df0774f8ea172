use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("failed to encode template value: {0}")]
    Json(#[from] serde_json::Error),
}
