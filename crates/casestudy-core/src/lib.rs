pub mod artifact;
pub mod issue;
pub mod report;
pub mod rubric;
pub mod session;
pub mod study;
pub mod validate;

pub use artifact::{
    ArtifactData, ArtifactKind, ChatData, DocumentData, FlashcardData, IracNote,
    IssueSpottingData, NewArtifact, QuizData, SavedArtifact, TimedMessage,
};
pub use issue::{
    DEFAULT_EXPANDED_DEPTH, Expansion, IssueKind, IssueNode, IssueRow, IssueTree, NodePath, render_text,
};
pub use report::{
    EvaluationReport, Finding, FindingCounts, FindingStatus, OVER_SPOTTING_WARNING, Scores,
};
pub use rubric::{
    AuditVerdict, OVERALL_TOLERANCE, RUBRIC_VERSION, RubricDimension, ScoreAudit, ScoreBand,
    score_band, weighted_base,
};
pub use session::{
    ChatMessage, EmptyFactPattern, FactPattern, Level, Role, SessionConfig, SourceType, Subject,
};
pub use study::{
    Flashcard, FlashcardDeck, QUIZ_OPTION_COUNT, Quiz, QuizQuestion, option_letter,
    parse_answer_sheet, score_answers,
};
pub use validate::{Validate, ValidationError, ValidationErrors, parse_model_json, strip_code_fences};
