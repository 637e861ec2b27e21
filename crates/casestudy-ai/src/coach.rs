//! Socratic issue-spotting coach.

use std::sync::Arc;

use casestudy_core::{ChatMessage, FactPattern, SessionConfig};
use tracing::info;

use crate::{GenerateRequest, LanguageModel, ReplyStream, StudyError};

/// A streamed coach reply.
pub type CoachReply = ReplyStream;

const COACH_MAX_TOKENS: u32 = 4096;

const START_OF_SESSION: &str = "This is the start of our issue-spotting session. \
Please provide an initial analysis with an Issue Map and IRAC scaffolds for the major issues.";

const CONTINUING_SESSION: &str = "Previous conversation context is in the message history.";

fn system_prompt(config: &SessionConfig) -> String {
    format!(
        "You are an expert law school exam coach specializing in issue spotting and IRAC analysis.

ROLE & BEHAVIOR:
- Help students identify legal issues, sub-issues, elements, and defenses from fact patterns
- Use the Socratic method: ask clarifying questions and give hints rather than full answers (unless the student explicitly asks \"just tell me\")
- Organize analysis by: Claim → Elements → Defenses → Remedies
- Provide IRAC skeletons (1-3 lines per section) for each major issue
- Keep responses concise, friendly, and exam-practical
- Never invent facts; highlight missing facts as questions
- If a student shares a draft, provide inline annotations of strengths and weaknesses
- Format responses using markdown (headings, lists, bold)

ISSUE MAP FORMAT:
When presenting issues, structure them as:
- Major Issues (most legally significant)
  - Sub-issues (elements to analyze)
  - Defenses (if applicable)
  - Minor/edge issues (mark as \"minor\")

CONSTRAINTS FOR THIS SESSION:
- Subjects: {subjects}
- Level: {level}
- Focus: {focus}

IMPORTANT:
- Respect the subject and level constraints
- Mark low-probability issues as \"minor\"
- Provide practical exam-writing advice
- Cite rules/tests accurately",
        subjects = config.subject_list(),
        level = config.level,
        focus = config.focus_or_default(),
    )
}

pub struct Coach {
    model: Arc<dyn LanguageModel>,
}

impl Coach {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// The full conversation sent for one turn: system preamble, prior
    /// history verbatim, then the fact pattern.
    pub fn messages(
        fact_pattern: &FactPattern,
        config: &SessionConfig,
        history: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        let instruction = if history.is_empty() {
            START_OF_SESSION
        } else {
            CONTINUING_SESSION
        };
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_prompt(config)));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(format!(
            "FACT PATTERN:\n<<<\n{}\n>>>\n\n{instruction}",
            fact_pattern.text()
        )));
        messages
    }

    /// Start streaming the coach's next turn.
    pub async fn reply(
        &self,
        fact_pattern: &FactPattern,
        config: &SessionConfig,
        history: &[ChatMessage],
    ) -> Result<CoachReply, StudyError> {
        config.validate().map_err(StudyError::InvalidRequest)?;
        let request = GenerateRequest::new(Self::messages(fact_pattern, config, history))
            .with_max_tokens(COACH_MAX_TOKENS);
        info!(
            model = self.model.model_name(),
            subjects = %config.subject_list(),
            history = history.len(),
            "coach turn"
        );
        let stream = self.model.stream(&request).await?;
        Ok(ReplyStream::new(stream))
    }
}
