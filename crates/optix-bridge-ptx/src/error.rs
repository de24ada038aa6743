//! PTX processing errors.

use thiserror::Error;

/// Errors raised while preparing PTX for OptiX.
#[derive(Error, Debug)]
pub enum PtxError {
    /// The placeholder kernel has no `.visible .entry`.
    #[error("No visible entry point in PTX")]
    EntryNotFound,

    /// The compiled kernel does not define the expected entry.
    #[error("Entry {0} not found in compiled kernel")]
    MissingEntry(String),

    /// The placeholder entry does not declare an aligned byte-array parameter.
    #[error("Launch parameter declaration not found in placeholder kernel")]
    ParameterNotFound,

    /// The placeholder entry never loads its parameter.
    #[error("Placeholder kernel does not load its launch parameter")]
    NoParameterLoads,

    /// A parameter layout the synthesizer cannot express.
    #[error("Invalid parameter layout: {0}")]
    InvalidLayout(String),

    /// Regex compilation failed.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Backend-specific compile failure.
    #[error("Kernel compilation failed: {0}")]
    Compile(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, PtxError>;
