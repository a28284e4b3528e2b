//! Error types for modelpress

use thiserror::Error;

/// Main error type for modelpress operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Internal group bookkeeping is inconsistent (e.g. moving a material
    /// that belongs to no group). Fatal to the current operation.
    #[error("Material group index error: {0}")]
    GroupIndex(String),

    #[error("Atlas packing error: {0}")]
    Packing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for modelpress operations
pub type Result<T> = std::result::Result<T, Error>;
