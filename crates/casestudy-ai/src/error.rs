use casestudy_core::ValidationErrors;
use thiserror::Error;

use crate::http::Provider;

/// Failures talking to a hosted model.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no provider serves model '{0}'")]
    UnknownModel(String),
    #[error("no API key configured for {0}")]
    MissingApiKey(Provider),
    #[error("provider error: {0}")]
    Provider(String),
}

/// Failures of a study feature as a whole.
#[derive(Error, Debug)]
pub enum StudyError {
    /// The request was rejected before any model call.
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Model(#[from] AiError),
    /// The model answered, but not with a valid document.
    #[error("model output failed validation: {0}")]
    Validation(#[from] ValidationErrors),
}
