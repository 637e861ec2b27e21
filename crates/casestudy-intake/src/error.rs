use casestudy_core::EmptyFactPattern;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported document type: {0}")]
    UnsupportedMediaType(String),

    #[error("{program} failed: {message}")]
    Command { program: String, message: String },

    #[error("Could not extract text from {0}")]
    EmptyText(String),

    #[error("Could not extract text from uploaded files")]
    NoExtractableText,

    #[error("No files uploaded")]
    NoFiles,

    #[error("object storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    EmptyFactPattern(#[from] EmptyFactPattern),
}
