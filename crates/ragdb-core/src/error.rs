use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds shared by every stage of the pipeline.
///
/// Library and IO failures are mapped onto one of these at the stage boundary
/// that observed them; nothing below the CLI deals in untyped errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),
}

impl Error {
    /// Short stable name of the variant, used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidConfiguration(_) => "invalid_configuration",
            Error::SourceNotFound(_) => "source_not_found",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::CorruptIndex(_) => "corrupt_index",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Upstream(_) => "upstream",
            Error::UpstreamTimeout(_) => "upstream_timeout",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
