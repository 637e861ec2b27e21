//! Session inputs: subjects, student level, fact patterns and chat turns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bar subject an issue-spotting session can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Torts,
    Contracts,
    Crim,
    ConLaw,
    Property,
    CivPro,
}

impl Subject {
    pub const ALL: [Subject; 6] = [
        Subject::Torts,
        Subject::Contracts,
        Subject::Crim,
        Subject::ConLaw,
        Subject::Property,
        Subject::CivPro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Torts => "Torts",
            Self::Contracts => "Contracts",
            Self::Crim => "Crim",
            Self::ConLaw => "ConLaw",
            Self::Property => "Property",
            Self::CivPro => "CivPro",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown subject '{s}' (expected one of Torts, Contracts, Crim, ConLaw, Property, CivPro)")
            })
    }
}

/// Student level, which governs the difficulty the coach and evaluator assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    #[serde(rename = "1L")]
    FirstYear,
    #[serde(rename = "2L")]
    SecondYear,
    #[serde(rename = "3L")]
    ThirdYear,
    Bar,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::FirstYear,
        Level::SecondYear,
        Level::ThirdYear,
        Level::Bar,
        Level::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstYear => "1L",
            Self::SecondYear => "2L",
            Self::ThirdYear => "3L",
            Self::Bar => "Bar",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown level '{s}' (expected one of 1L, 2L, 3L, Bar, Advanced)"))
    }
}

/// User-editable constraints for a coaching/evaluation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSessionConfig")]
pub struct SessionConfig {
    pub subjects: Vec<Subject>,
    pub level: Level,
    pub focus: String,
}

#[derive(Deserialize)]
struct RawSessionConfig {
    subjects: Vec<Subject>,
    level: Level,
    #[serde(default)]
    focus: String,
}

impl From<RawSessionConfig> for SessionConfig {
    fn from(raw: RawSessionConfig) -> Self {
        Self::new(raw.subjects, raw.level, raw.focus)
    }
}

impl SessionConfig {
    /// Build a config, collapsing duplicate subjects while keeping first-seen order.
    pub fn new(subjects: impl IntoIterator<Item = Subject>, level: Level, focus: impl Into<String>) -> Self {
        let mut unique = Vec::new();
        for subject in subjects {
            if !unique.contains(&subject) {
                unique.push(subject);
            }
        }
        Self {
            subjects: unique,
            level,
            focus: focus.into(),
        }
    }

    /// A session cannot start without at least one subject.
    pub fn validate(&self) -> Result<(), String> {
        if self.subjects.is_empty() {
            return Err("At least one subject is required".to_string());
        }
        Ok(())
    }

    /// Comma-joined subject list as it appears in prompts and titles.
    pub fn subject_list(&self) -> String {
        self.subjects
            .iter()
            .map(Subject::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn focus_or_default(&self) -> &str {
        let focus = self.focus.trim();
        if focus.is_empty() {
            "General issue spotting"
        } else {
            focus
        }
    }
}

/// Where a fact pattern's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Upload,
    Paste,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fact pattern text is empty")]
pub struct EmptyFactPattern;

/// A hypothetical legal scenario. Immutable once constructed.
///
/// Deserializing goes through the same normalization as the constructors,
/// so blank text is rejected there too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawFactPattern")]
pub struct FactPattern {
    source_type: SourceType,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFactPattern {
    source_type: SourceType,
    text: String,
    #[serde(default)]
    filename: Option<String>,
}

impl TryFrom<RawFactPattern> for FactPattern {
    type Error = EmptyFactPattern;

    fn try_from(raw: RawFactPattern) -> Result<Self, Self::Error> {
        Ok(Self {
            source_type: raw.source_type,
            text: normalize_text(&raw.text)?,
            filename: raw.filename,
        })
    }
}

impl FactPattern {
    pub fn pasted(text: &str) -> Result<Self, EmptyFactPattern> {
        Ok(Self {
            source_type: SourceType::Paste,
            text: normalize_text(text)?,
            filename: None,
        })
    }

    pub fn uploaded(text: &str, filename: impl Into<String>) -> Result<Self, EmptyFactPattern> {
        Ok(Self {
            source_type: SourceType::Upload,
            text: normalize_text(text)?,
            filename: Some(filename.into()),
        })
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// First `max_chars` characters, for titles and summaries.
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}

fn normalize_text(text: &str) -> Result<String, EmptyFactPattern> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.trim();
    if text.is_empty() {
        return Err(EmptyFactPattern);
    }
    Ok(text.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of a model conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_parses_case_insensitively() {
        assert_eq!("torts".parse::<Subject>().unwrap(), Subject::Torts);
        assert_eq!(" CONLAW ".parse::<Subject>().unwrap(), Subject::ConLaw);
        assert!("Admiralty".parse::<Subject>().is_err());
    }

    #[test]
    fn level_serialises_with_exam_labels() {
        assert_eq!(serde_json::to_string(&Level::FirstYear).unwrap(), "\"1L\"");
        assert_eq!(serde_json::to_string(&Level::Bar).unwrap(), "\"Bar\"");
        let parsed: Level = serde_json::from_str("\"3L\"").unwrap();
        assert_eq!(parsed, Level::ThirdYear);
        assert_eq!("advanced".parse::<Level>().unwrap(), Level::Advanced);
    }

    #[test]
    fn config_requires_a_subject() {
        let empty = SessionConfig::new([], Level::FirstYear, "");
        assert_eq!(
            empty.validate().unwrap_err(),
            "At least one subject is required"
        );
        let torts = SessionConfig::new([Subject::Torts], Level::FirstYear, "");
        assert!(torts.validate().is_ok());
    }

    #[test]
    fn config_collapses_duplicate_subjects() {
        let config = SessionConfig::new(
            [Subject::Torts, Subject::Crim, Subject::Torts],
            Level::Bar,
            "",
        );
        assert_eq!(config.subjects, vec![Subject::Torts, Subject::Crim]);
        assert_eq!(config.subject_list(), "Torts, Crim");
    }

    #[test]
    fn blank_focus_falls_back() {
        let config = SessionConfig::new([Subject::Torts], Level::FirstYear, "   ");
        assert_eq!(config.focus_or_default(), "General issue spotting");
        let config = SessionConfig::new([Subject::Torts], Level::FirstYear, "Defenses only");
        assert_eq!(config.focus_or_default(), "Defenses only");
    }

    #[test]
    fn fact_pattern_normalises_text() {
        let fp = FactPattern::pasted("  Alice speeds.\r\nBob is hurt.\r  ").unwrap();
        assert_eq!(fp.text(), "Alice speeds.\nBob is hurt.");
        assert_eq!(fp.source_type(), SourceType::Paste);
        assert!(fp.filename().is_none());
    }

    #[test]
    fn empty_fact_pattern_rejected() {
        assert_eq!(FactPattern::pasted(" \n\t "), Err(EmptyFactPattern));
        assert!(FactPattern::uploaded("", "exam.pdf").is_err());
    }

    #[test]
    fn fact_pattern_json_is_normalised_on_load() {
        let blank = serde_json::from_str::<FactPattern>(r#"{"sourceType":"paste","text":"  \r\n "}"#);
        assert!(blank.unwrap_err().to_string().contains("fact pattern text is empty"));

        let fp: FactPattern = serde_json::from_str(
            r#"{"sourceType":"upload","text":" Alice speeds.\r\n","filename":"exam.pdf"}"#,
        )
        .unwrap();
        assert_eq!(fp, FactPattern::uploaded("Alice speeds.", "exam.pdf").unwrap());
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(serde_json::from_str::<FactPattern>(&json).unwrap(), fp);
    }

    #[test]
    fn config_json_collapses_duplicate_subjects() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"subjects":["Torts","Crim","Torts"],"level":"Bar"}"#).unwrap();
        assert_eq!(config, SessionConfig::new([Subject::Torts, Subject::Crim], Level::Bar, ""));
    }

    #[test]
    fn uploaded_fact_pattern_json_shape() {
        let fp = FactPattern::uploaded("Facts.", "exam.docx").unwrap();
        let json = serde_json::to_value(&fp).unwrap();
        assert_eq!(json["sourceType"], "upload");
        assert_eq!(json["filename"], "exam.docx");
    }

    #[test]
    fn chat_message_roles_serialise_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
