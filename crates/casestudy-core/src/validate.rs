//! Strict validation of JSON produced by hosted models.
//!
//! Model output is never trusted field-by-field: it is deserialised into the
//! typed shape and then checked as a whole, and every failure is reported.

use std::fmt;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// A single failed check, located by a JSON-path-like string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every check that failed for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", join(.0))]
pub struct ValidationErrors(Vec<ValidationError>);

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(path, message);
        errors
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `Ok(value)` when nothing failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Semantic checks run after a document has the right shape.
pub trait Validate {
    fn validate(&self, errors: &mut ValidationErrors);

    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.validate(&mut errors);
        errors.into_result(())
    }
}

/// Remove a surrounding markdown code fence (```` ```json ```` … ```` ``` ````).
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the opening fence line, including any language tag.
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches("json"),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse model output into `T`, then run its semantic checks.
pub fn parse_model_json<T>(raw: &str) -> Result<T, ValidationErrors>
where
    T: DeserializeOwned + Validate,
{
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ValidationErrors::single("$", "response was empty"));
    }
    let value: T = serde_json::from_str(cleaned).map_err(|e| {
        debug!(error = %e, "model output did not match the expected shape");
        ValidationErrors::single("$", e.to_string())
    })?;
    let mut errors = ValidationErrors::new();
    value.validate(&mut errors);
    if !errors.is_empty() {
        debug!(failures = errors.len(), "model output failed semantic checks");
    }
    errors.into_result(value)
}

/// Shared check: finite and within `[0, 100]`.
pub(crate) fn check_percentage(errors: &mut ValidationErrors, path: &str, value: f64) {
    if !value.is_finite() {
        errors.push(path, "must be a finite number");
    } else if !(0.0..=100.0).contains(&value) {
        errors.push(path, format!("must be between 0 and 100, got {value}"));
    }
}

pub(crate) fn check_non_empty(errors: &mut ValidationErrors, path: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(path, "must not be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        score: f64,
    }

    impl Validate for Sample {
        fn validate(&self, errors: &mut ValidationErrors) {
            check_non_empty(errors, "name", &self.name);
            check_percentage(errors, "score", self.score);
        }
    }

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let raw = "  \n```\n{\"a\": 1}\n```\n  ";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences(" {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn parse_collects_every_semantic_failure() {
        let err = parse_model_json::<Sample>(r#"{"name": " ", "score": 140}"#).unwrap_err();
        assert_eq!(err.len(), 2);
        let paths: Vec<&str> = err.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "score"]);
    }

    #[test]
    fn parse_reports_shape_errors() {
        let err = parse_model_json::<Sample>(r#"{"name": "x"}"#).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.to_string().contains("missing field `score`"));
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_model_json::<Sample>("Sorry, I cannot grade this.").unwrap_err();
        assert_eq!(err.iter().next().unwrap().path, "$");
    }

    #[test]
    fn parse_rejects_empty() {
        let err = parse_model_json::<Sample>("```json\n```").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn parse_accepts_fenced_valid_document() {
        let sample = parse_model_json::<Sample>("```json\n{\"name\": \"ok\", \"score\": 55.5}\n```")
            .unwrap();
        assert_eq!(sample.name, "ok");
        assert_eq!(sample.score, 55.5);
    }
}
