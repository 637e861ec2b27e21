//! Default model for each feature.

pub const COACH: &str = "claude-sonnet-4-20250514";
pub const EVALUATOR: &str = "claude-3-7-sonnet-20250219";
pub const FACT_PATTERN: &str = "claude-sonnet-4-20250514";
pub const QUIZ: &str = "gpt-4o";
pub const FLASHCARDS: &str = "claude-3-7-sonnet-20250219";
pub const DOCUMENT_ANALYSIS: &str = "claude-sonnet-4-20250514";
pub const CHAT: &str = "claude-sonnet-4-20250514";
