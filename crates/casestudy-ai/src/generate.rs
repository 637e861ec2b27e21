//! Study-material generators: fact patterns, quizzes, flashcards, document
//! analysis and free-form study chat.

use std::fmt;
use std::str::FromStr;

use casestudy_core::{
    ChatMessage, FlashcardDeck, QUIZ_OPTION_COUNT, Quiz, Role, SessionConfig, parse_model_json,
};
use tracing::{debug, info, warn};

use crate::{GenerateRequest, LanguageModel, ReplyStream, StudyError};

const QUIZ_QUESTIONS: usize = 10;
const GENERATOR_MAX_TOKENS: u32 = 8192;

fn additional_instructions(instructions: Option<&str>) -> String {
    match instructions.map(str::trim) {
        Some(text) if !text.is_empty() => format!("Additional Instructions: {text}"),
        _ => String::new(),
    }
}

fn require_materials(materials: &str) -> Result<(), StudyError> {
    if materials.trim().is_empty() {
        return Err(StudyError::InvalidRequest(
            "Could not extract text from uploaded files".into(),
        ));
    }
    Ok(())
}

/// Write a fresh exam-style fact pattern for the session.
pub async fn generate_fact_pattern(
    model: &dyn LanguageModel,
    config: &SessionConfig,
) -> Result<String, StudyError> {
    config.validate().map_err(StudyError::InvalidRequest)?;
    let focus = match config.focus.trim() {
        "" => String::new(),
        focus => format!("- Additional Focus: {focus}\n"),
    };
    let prompt = format!(
        "You are a law school professor creating an issue-spotting fact pattern for students.

REQUIREMENTS:
- Subjects: {subjects}
- Level: {level}
{focus}
Create a realistic, exam-style fact pattern (150-250 words) that:
1. Involves multiple legal issues from the specified subjects
2. Is appropriate for {level} level students
3. Contains enough facts to spot 4-6 distinct issues
4. Uses realistic scenarios (not overly academic or theoretical)
5. Includes relevant ambiguities that make analysis interesting
6. Is clear and well-structured

Return ONLY the fact pattern text, with no additional commentary, explanations, or formatting. The text should be ready to use directly as a practice problem.",
        subjects = config.subject_list(),
        level = config.level,
    );

    info!(model = model.model_name(), subjects = %config.subject_list(), "generating fact pattern");
    let text = model.generate(&GenerateRequest::prompt(prompt)).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(StudyError::InvalidRequest(
            "The model returned an empty fact pattern".into(),
        ));
    }
    Ok(text.to_string())
}

/// A ten-question multiple-choice quiz over the given materials.
pub async fn generate_quiz(
    model: &dyn LanguageModel,
    materials: &str,
    instructions: Option<&str>,
) -> Result<Quiz, StudyError> {
    require_materials(materials)?;
    let prompt = format!(
        "You are a legal education expert tasked with creating a {QUIZ_QUESTIONS}-question multiple choice quiz based on the provided legal materials.

Materials:
{materials}

{extra}

Create exactly {QUIZ_QUESTIONS} multiple choice questions. Each question should:
1. Be based on the legal concepts, cases, or principles in the materials
2. Have {QUIZ_OPTION_COUNT} options (A, B, C, D)
3. Have exactly one correct answer
4. Include a clear explanation of why the correct answer is right and why the others are wrong

Format your response as a JSON object with this exact structure:
{{
  \"questions\": [
    {{
      \"id\": 1,
      \"question\": \"What is the legal principle?\",
      \"options\": [\"Option A\", \"Option B\", \"Option C\", \"Option D\"],
      \"correctAnswer\": 0,
      \"explanation\": \"Explanation of why this is correct and why others are wrong.\"
    }}
  ]
}}

correctAnswer is the zero-based index of the correct option. Make sure the questions cover different aspects of the materials and test understanding rather than just memorization.",
        extra = additional_instructions(instructions),
    );

    info!(model = model.model_name(), materials_chars = materials.len(), "generating quiz");
    let request = GenerateRequest::prompt(prompt)
        .with_max_tokens(GENERATOR_MAX_TOKENS)
        .json();
    let raw = model.generate(&request).await?;
    let quiz: Quiz = parse_model_json(&raw).inspect_err(|_| {
        debug!(raw = %raw, "raw quiz output");
    })?;
    if quiz.questions.len() != QUIZ_QUESTIONS {
        warn!(
            questions = quiz.questions.len(),
            expected = QUIZ_QUESTIONS,
            "quiz has an unexpected number of questions"
        );
    }
    Ok(quiz)
}

/// A deck of 20-25 flashcards over the given materials.
pub async fn generate_flashcards(
    model: &dyn LanguageModel,
    materials: &str,
    instructions: Option<&str>,
) -> Result<FlashcardDeck, StudyError> {
    require_materials(materials)?;
    let prompt = format!(
        "You are a legal education expert specializing in creating effective flashcards for law students. Your task is to analyze the provided legal materials and create high-quality flashcards that will help students master key legal concepts.

Materials:
{materials}

{extra}

Create comprehensive flashcards covering:
1. **Legal Terms & Definitions**: Key legal terminology, Latin phrases, and their precise meanings
2. **Case Law**: Important case names, holdings, rules of law, and distinguishing facts
3. **Legal Doctrines & Principles**: Core legal theories, tests, and frameworks
4. **Statutes & Rules**: Key statutory provisions, amendments, and regulatory requirements
5. **Legal Analysis Elements**: Elements of claims, defenses, exceptions, and burdens of proof

Guidelines for creating flashcards:
- **Front of card**: A clear, focused question or term (e.g., \"What is the rule from Miranda v. Arizona?\" or \"Define: Habeas Corpus\")
- **Back of card**: A concise, accurate answer with essential details
- **Category**: Label each card with its legal area (e.g., \"Constitutional Law\", \"Contracts\", \"Torts\", \"Criminal Law\", \"Case Law\", \"Legal Terms\")
- Focus on testable knowledge and practical application
- Include case citations where relevant
- Prioritize foundational concepts and frequently tested material

Create 20-25 flashcards. You must respond with ONLY a valid JSON object in this exact format (no markdown, no code blocks, just raw JSON):
{{
  \"flashcards\": [
    {{
      \"id\": 1,
      \"front\": \"What is the holding in Marbury v. Madison?\",
      \"back\": \"The Supreme Court has the power of judicial review to declare laws unconstitutional.\",
      \"category\": \"Constitutional Law\"
    }}
  ]
}}",
        extra = additional_instructions(instructions),
    );

    info!(model = model.model_name(), materials_chars = materials.len(), "generating flashcards");
    let request = GenerateRequest::prompt(prompt).with_max_tokens(GENERATOR_MAX_TOKENS);
    let raw = model.generate(&request).await?;
    let deck: FlashcardDeck = parse_model_json(&raw).inspect_err(|_| {
        debug!(raw = %raw, "raw flashcard output");
    })?;
    info!(cards = deck.flashcards.len(), "flashcards generated");
    Ok(deck)
}

/// Canned instructions for document analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPreset {
    Understand,
    Summarize,
    LegalIssues,
    KeyPoints,
    CaseBrief,
    Outline,
}

impl AnalysisPreset {
    pub const ALL: [AnalysisPreset; 6] = [
        AnalysisPreset::Understand,
        AnalysisPreset::Summarize,
        AnalysisPreset::LegalIssues,
        AnalysisPreset::KeyPoints,
        AnalysisPreset::CaseBrief,
        AnalysisPreset::Outline,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Understand => "understand",
            Self::Summarize => "summarize",
            Self::LegalIssues => "legal-issues",
            Self::KeyPoints => "key-points",
            Self::CaseBrief => "case-brief",
            Self::Outline => "outline",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Understand => "Help me understand this assignment",
            Self::Summarize => "Summarize this document",
            Self::LegalIssues => "Identify legal issues",
            Self::KeyPoints => "Extract key points",
            Self::CaseBrief => "Create case brief",
            Self::Outline => "Generate outline",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Understand => {
                "Please help me understand this assignment. Break down the key requirements, tasks, and deliverables. Explain what is being asked in clear, simple terms."
            }
            Self::Summarize => {
                "Please provide a comprehensive summary of this document. Include the main points, key arguments, and important details."
            }
            Self::LegalIssues => {
                "Analyze this document and identify all legal issues, questions, and areas of concern. Organize them by category (e.g., contract law, tort law, constitutional law, etc.)."
            }
            Self::KeyPoints => {
                "Extract and list the key points, holdings, and important details from this document in a structured format."
            }
            Self::CaseBrief => {
                "Create a case brief following the standard format: Facts, Issues, Holdings, Reasoning, and Disposition. If this is not a case, organize the information in a similar structured format."
            }
            Self::Outline => {
                "Create a detailed outline of this document, organizing the content hierarchically with main topics, subtopics, and key details."
            }
        }
    }
}

impl fmt::Display for AnalysisPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AnalysisPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisPreset::ALL
            .into_iter()
            .find(|p| p.id() == s.trim())
            .ok_or_else(|| {
                let ids: Vec<&str> = AnalysisPreset::ALL.iter().map(|p| p.id()).collect();
                format!("unknown preset '{s}' (expected one of {})", ids.join(", "))
            })
    }
}

/// Free-text analysis of a document according to `prompt`.
pub async fn analyze_document(
    model: &dyn LanguageModel,
    text: &str,
    prompt: &str,
) -> Result<String, StudyError> {
    if text.trim().is_empty() || prompt.trim().is_empty() {
        return Err(StudyError::InvalidRequest(
            "Text and prompt are required".into(),
        ));
    }
    info!(model = model.model_name(), text_chars = text.len(), "analyzing document");
    let request = GenerateRequest::prompt(format!("{prompt}\n\nDocument content:\n\n{text}"))
        .with_max_tokens(GENERATOR_MAX_TOKENS);
    Ok(model.generate(&request).await?)
}

/// Stream a reply to a free-form study conversation.
pub async fn chat(
    model: &dyn LanguageModel,
    history: &[ChatMessage],
) -> Result<ReplyStream, StudyError> {
    match history.last() {
        None => {
            return Err(StudyError::InvalidRequest(
                "Messages parameter is required".into(),
            ));
        }
        Some(last) if last.role != Role::User => {
            return Err(StudyError::InvalidRequest(
                "The last message must come from the user".into(),
            ));
        }
        Some(_) => {}
    }
    info!(model = model.model_name(), turns = history.len(), "study chat turn");
    let stream = model.stream(&GenerateRequest::new(history.to_vec())).await?;
    Ok(ReplyStream::new(stream))
}
