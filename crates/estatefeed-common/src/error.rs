//! Error types for estatefeed
//!
//! Only failures that abort a run live here. Conditions the pipeline
//! absorbs locally are [`crate::Degradation`]s.

use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Fatal failures of an import run
#[derive(Error, Debug)]
pub enum ImportError {
    /// Archive path missing, empty, oversized or not a ZIP container
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Archive extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("No XML feed files found in the archive")]
    NoFeedFilesFound,

    /// Structurally invalid XML in one feed file
    #[error("Failed to parse feed '{file}': {message}")]
    ParseError { file: String, message: String },

    /// Destination unreachable or credentials rejected
    #[error("Export failed: {0}")]
    ExportFatal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed(msg.into())
    }

    /// Create a parse error for a feed file
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a fatal export error
    pub fn export_fatal(msg: impl Into<String>) -> Self {
        Self::ExportFatal(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short, stable name of the failure class, used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ExtractionFailed(_) => "extraction_failed",
            Self::NoFeedFilesFound => "no_feed_files_found",
            Self::ParseError { .. } => "parse_error",
            Self::ExportFatal(_) => "export_fatal",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}
