use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The path is empty or otherwise not addressable.
    #[error("Invalid store path: {0:?}")]
    InvalidPath(String),

    /// A value could not be converted to or from the tree's JSON model.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Transport or backend failure reported by the store implementation.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
