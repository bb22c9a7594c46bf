//! Error types for declgen

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// declgen errors
///
/// Component errors (model, synthesis, interception, generation) are turned
/// into diagnostics by the pipeline and never surface here; this enum covers
/// what stops a whole run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Declaration parse error: {0}")]
    DeclarationParse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Emission error: {0}")]
    Emission(#[from] crate::emit::EmitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
