use casestudy_core::ArtifactKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact {0} not found")]
    NotFound(i64),

    #[error("artifact {id} is a {stored}, not a {given}")]
    KindChanged {
        id: i64,
        stored: ArtifactKind,
        given: ArtifactKind,
    },

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("artifact payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored timestamp is invalid: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("{0}")]
    Other(String),
}
