use thiserror::Error;

/// Errors raised while deriving or transforming window pairs
#[derive(Debug, Error)]
pub enum WindowingError {
    #[error("Not enough rows: have {have}, need at least {need}")]
    NotEnoughRows { have: usize, need: usize },

    #[error("Expected {expected} feature columns, got {got}")]
    ColumnMismatch { expected: usize, got: usize },
}

/// Errors raised by the model registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registered model not found: {name}")]
    ModelNotFound { name: String },

    #[error("Version {version} not found for model {name}")]
    VersionNotFound { name: String, version: u32 },

    #[error("Alias '{alias}' not set for model {name}")]
    AliasNotFound { name: String, alias: String },

    #[error("Artifact missing: {path}")]
    ArtifactMissing { path: String },

    #[error("Registry I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry index corrupt: {0}")]
    Index(#[from] serde_json::Error),
}
