//! Saved artifacts: the records a student keeps in the local store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::EvaluationReport;
use crate::session::{ChatMessage, FactPattern, Role, SessionConfig};
use crate::study::{Flashcard, FlashcardDeck, Quiz, QuizQuestion, option_letter, score_answers};
use crate::validate::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Flashcard,
    Quiz,
    Chat,
    Document,
    IssueSpotting,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Flashcard,
        ArtifactKind::Quiz,
        ArtifactKind::Chat,
        ArtifactKind::Document,
        ArtifactKind::IssueSpotting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flashcard => "flashcard",
            Self::Quiz => "quiz",
            Self::Chat => "chat",
            Self::Document => "document",
            Self::IssueSpotting => "issue-spotting",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown artifact type '{s}' (expected flashcard, quiz, chat, document or issue-spotting)")
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardData {
    pub flashcards: Vec<Flashcard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub file_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizData {
    pub questions: Vec<QuizQuestion>,
    /// Question id → chosen option index.
    #[serde(default)]
    pub user_answers: BTreeMap<u32, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<usize>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub file_names: Vec<String>,
}

impl QuizData {
    /// Record a finished attempt and return the number of correct answers.
    ///
    /// Every question must be answered, and every answer must name a question
    /// of this quiz and one of its options. A later attempt replaces the last.
    pub fn submit(&mut self, answers: BTreeMap<u32, usize>) -> Result<usize, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (&id, &choice) in &answers {
            match self.questions.iter().find(|q| q.id == id) {
                None => errors.push(format!("answers.{id}"), "no such question in this quiz"),
                Some(q) if choice >= q.options.len() => errors.push(
                    format!("answers.{id}"),
                    format!(
                        "option {} is out of range ({} options)",
                        option_letter(choice),
                        q.options.len()
                    ),
                ),
                Some(_) => {}
            }
        }
        for q in &self.questions {
            if !answers.contains_key(&q.id) {
                errors.push(format!("answers.{}", q.id), "unanswered");
            }
        }
        errors.into_result(())?;

        let score = score_answers(&self.questions, &answers);
        self.user_answers = answers;
        self.score = Some(score);
        self.completed = true;
        Ok(score)
    }

    pub fn summary(&self) -> String {
        let count = self.questions.len();
        match self.score {
            Some(score) if self.completed => {
                format!("{count} multiple-choice questions, scored {score}/{count}")
            }
            _ => format!("{count} multiple-choice questions"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatData {
    pub messages: Vec<TimedMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentData {
    pub analysis: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

/// One issue note kept with a saved issue-spotting session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IracNote {
    pub issue: String,
    pub rule: String,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSpottingData {
    pub fact_pattern: String,
    pub issues: Vec<IracNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<EvaluationReport>,
}

/// Type-tagged artifact payload. The tag is the artifact's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ArtifactData {
    Flashcard(FlashcardData),
    Quiz(QuizData),
    Chat(ChatData),
    Document(DocumentData),
    IssueSpotting(IssueSpottingData),
}

impl ArtifactData {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Flashcard(_) => ArtifactKind::Flashcard,
            Self::Quiz(_) => ArtifactKind::Quiz,
            Self::Chat(_) => ArtifactKind::Chat,
            Self::Document(_) => ArtifactKind::Document,
            Self::IssueSpotting(_) => ArtifactKind::IssueSpotting,
        }
    }
}

/// An artifact before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtifact {
    pub title: String,
    pub summary: String,
    pub data: ArtifactData,
}

const SESSION_EXCERPT_CHARS: usize = 100;
const ANALYSIS_EXCERPT_CHARS: usize = 200;

impl NewArtifact {
    pub fn new(title: impl Into<String>, summary: impl Into<String>, data: ArtifactData) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            data,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.data.kind()
    }

    pub fn into_saved(self, id: i64, created_at: DateTime<Utc>) -> SavedArtifact {
        SavedArtifact {
            id,
            title: self.title,
            summary: self.summary,
            created_at,
            data: self.data,
        }
    }

    /// Snapshot of a coaching session, optionally with its evaluation.
    pub fn issue_spotting(
        fact_pattern: &FactPattern,
        config: &SessionConfig,
        messages: &[ChatMessage],
        report: Option<EvaluationReport>,
    ) -> Self {
        let title = format!(
            "Issue Spotting - {} ({})",
            config.subject_list(),
            config.level
        );
        let plural = if messages.len() == 1 { "" } else { "s" };
        let summary = format!(
            "{}... - {} message{plural}",
            fact_pattern.excerpt(SESSION_EXCERPT_CHARS),
            messages.len()
        );
        let issues = messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| IracNote {
                issue: "Issue analysis".to_string(),
                rule: String::new(),
                analysis: m.content.chars().take(ANALYSIS_EXCERPT_CHARS).collect(),
            })
            .collect();
        Self::new(
            title,
            summary,
            ArtifactData::IssueSpotting(IssueSpottingData {
                fact_pattern: fact_pattern.text().to_string(),
                issues,
                topic: Some(config.subject_list()),
                messages: messages.to_vec(),
                report,
            }),
        )
    }

    pub fn document(file_name: &str, analysis: String, extracted_text: Option<String>) -> Self {
        let words = analysis.split_whitespace().count();
        Self::new(
            format!("{file_name} - Analysis"),
            format!("Document analysis for {file_name} ({words} words)"),
            ArtifactData::Document(DocumentData {
                analysis,
                file_name: file_name.to_string(),
                extracted_text,
            }),
        )
    }

    pub fn quiz(quiz: Quiz, instructions: Option<String>, file_names: Vec<String>) -> Self {
        let title = format!("Quiz - {}", source_label(&file_names));
        let data = QuizData {
            questions: quiz.questions,
            user_answers: BTreeMap::new(),
            score: None,
            completed: false,
            instructions,
            file_names,
        };
        Self::new(title, data.summary(), ArtifactData::Quiz(data))
    }

    pub fn flashcards(deck: FlashcardDeck, instructions: Option<String>, file_names: Vec<String>) -> Self {
        let count = deck.flashcards.len();
        Self::new(
            format!("Flashcards - {}", source_label(&file_names)),
            format!("{count} flashcards"),
            ArtifactData::Flashcard(FlashcardData {
                flashcards: deck.flashcards,
                instructions,
                file_names,
            }),
        )
    }

    pub fn chat(messages: Vec<TimedMessage>, context: Option<String>) -> Self {
        let title = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.chars().take(60).collect::<String>())
            .unwrap_or_else(|| "Chat".to_string());
        let plural = if messages.len() == 1 { "" } else { "s" };
        let summary = format!("{} message{plural}", messages.len());
        Self::new(title, summary, ArtifactData::Chat(ChatData { messages, context }))
    }
}

fn source_label(file_names: &[String]) -> String {
    match file_names {
        [] => "untitled materials".to_string(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{first} +{}", rest.len()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArtifact {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub data: ArtifactData,
}

impl SavedArtifact {
    pub fn kind(&self) -> ArtifactKind {
        self.data.kind()
    }

    /// Title, summary and payload, for writing back under the same id.
    pub fn into_new(self) -> NewArtifact {
        NewArtifact::new(self.title, self.summary, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Level, Subject};

    #[test]
    fn kind_round_trips_through_str() {
        for kind in ArtifactKind::ALL {
            assert_eq!(kind.as_str().parse::<ArtifactKind>().unwrap(), kind);
        }
        assert!("notes".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn payload_tag_matches_kind() {
        let data = ArtifactData::Document(DocumentData {
            analysis: "Summary".into(),
            file_name: "brief.pdf".into(),
            extracted_text: None,
        });
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "document");
        assert_eq!(json["data"]["fileName"], "brief.pdf");
        assert_eq!(data.kind(), ArtifactKind::Document);
    }

    #[test]
    fn issue_spotting_snapshot_titles_and_notes() {
        let fp = FactPattern::pasted("Alice speeds through a red light and hits Bob.").unwrap();
        let config = SessionConfig::new([Subject::Torts, Subject::Crim], Level::FirstYear, "");
        let messages = vec![
            ChatMessage::user("Where do I start?"),
            ChatMessage::assistant("Start with negligence."),
        ];
        let artifact = NewArtifact::issue_spotting(&fp, &config, &messages, None);
        assert_eq!(artifact.title, "Issue Spotting - Torts, Crim (1L)");
        assert_eq!(
            artifact.summary,
            "Alice speeds through a red light and hits Bob.... - 2 messages"
        );
        let ArtifactData::IssueSpotting(data) = &artifact.data else {
            panic!("expected issue-spotting payload");
        };
        assert_eq!(data.issues.len(), 1);
        assert_eq!(data.issues[0].analysis, "Start with negligence.");
        assert_eq!(data.topic.as_deref(), Some("Torts, Crim"));
    }

    #[test]
    fn quiz_answers_survive_json() {
        let data = QuizData {
            questions: vec![],
            user_answers: BTreeMap::from([(3, 1)]),
            score: Some(1),
            completed: true,
            instructions: None,
            file_names: vec!["torts.pdf".into()],
        };
        let json = serde_json::to_string(&ArtifactData::Quiz(data.clone())).unwrap();
        let back: ArtifactData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ArtifactData::Quiz(data));
    }

    fn two_question_quiz() -> QuizData {
        let question = |id, correct_answer| QuizQuestion {
            id,
            question: format!("Question {id}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer,
            explanation: String::new(),
            topic: None,
        };
        let artifact = NewArtifact::quiz(
            Quiz {
                questions: vec![question(1, 2), question(2, 0)],
            },
            None,
            vec!["torts.pdf".into()],
        );
        let ArtifactData::Quiz(data) = artifact.data else {
            panic!("expected quiz payload");
        };
        data
    }

    #[test]
    fn submitted_quiz_records_answers_and_score() {
        let mut data = two_question_quiz();
        assert_eq!(data.summary(), "2 multiple-choice questions");

        let score = data.submit(BTreeMap::from([(1, 2), (2, 3)])).unwrap();
        assert_eq!(score, 1);
        assert_eq!(data.score, Some(1));
        assert!(data.completed);
        assert_eq!(data.user_answers, BTreeMap::from([(1, 2), (2, 3)]));
        assert_eq!(data.summary(), "2 multiple-choice questions, scored 1/2");
    }

    #[test]
    fn submit_rejects_incomplete_or_unknown_answers() {
        let mut data = two_question_quiz();
        let err = data.submit(BTreeMap::from([(1, 2), (9, 0)])).unwrap_err();
        let paths: Vec<&str> = err.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["answers.9", "answers.2"]);

        let err = data.submit(BTreeMap::from([(1, 5), (2, 0)])).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(!data.completed);
        assert_eq!(data.score, None);
    }

    #[test]
    fn source_labels() {
        assert_eq!(source_label(&[]), "untitled materials");
        assert_eq!(source_label(&["a.pdf".into()]), "a.pdf");
        assert_eq!(source_label(&["a.pdf".into(), "b.pdf".into(), "c.pdf".into()]), "a.pdf +2");
    }
}
