use thiserror::Error;

#[derive(Error, Debug)]
pub enum CasesError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CourtListener returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidQuery(String),
    #[error("Invalid case ID format: {0}")]
    InvalidCaseId(String),
}
