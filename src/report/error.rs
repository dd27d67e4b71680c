//! Error types for the report module

use std::path::PathBuf;
use thiserror::Error;

/// Error type for report rendering
#[derive(Debug, Error)]
pub enum RenderError {
    /// Report markup could not be parsed
    #[error("Markup error: {0}")]
    Markup(String),

    /// Keyword could not be compiled for highlighting
    #[error("Highlight error: {0}")]
    Highlight(#[from] regex::Error),

    /// A report font is missing or unreadable
    #[error("Font error: {0}")]
    Font(String),

    /// PDF object construction or serialization failed
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Output directory is missing or not a directory
    #[error("Output directory does not exist: {}", .0.display())]
    OutputDir(PathBuf),

    /// Writing the report failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for RenderError {
    fn from(err: lopdf::Error) -> Self {
        RenderError::Pdf(err.to_string())
    }
}
