//! Rubric-based grader for issue-spotting answers.
//!
//! One non-streaming call per answer. The response must be a complete
//! [`EvaluationReport`]; anything else is surfaced as a validation error and
//! never repaired or retried.

use std::sync::Arc;

use casestudy_core::{
    ChatMessage, EvaluationReport, FactPattern, RUBRIC_VERSION, RubricDimension, ScoreAudit,
    SessionConfig, Subject, parse_model_json,
};
use tracing::{debug, info, warn};

use crate::{GenerateRequest, LanguageModel, StudyError};

const EVALUATOR_MAX_TOKENS: u32 = 8192;

const REPORT_SHAPE: &str = "interface EvaluationReport {
  rubricVersion: string;
  subjects: string[];
  level: string;
  expectedIssues: Array<{
    title: string;
    type: 'Issue' | 'SubIssue' | 'Element' | 'Defense';
    children?: any[];
    notes?: string;
  }>;
  findings: Array<{
    issue: string;
    status: 'missed' | 'partially_spotted' | 'spotted';
    comment: string;
  }>;
  scores: {
    coverage: number;
    organization: number;
    ruleAccuracy: number;
    applicationQuality: number;
    overSpottingPenalty: number;
    writingClarity: number;
    overall: number;
  };
  prioritizedAdvice: string[];
  suggestedIRACOrder: string[];
}";

const RUBRIC: &str = "RUBRIC (scores 0-100):

1. COVERAGE: % of expected major + minor issues identified
   - 90-100: All major issues + most minor issues
   - 70-89: All major issues, some minor ones
   - 50-69: Most major issues
   - 30-49: Some major issues
   - 0-29: Few or no issues identified

2. ORGANIZATION: Logical structure, headings, flow
   - 90-100: Clear headings, logical IRAC order, excellent flow
   - 70-89: Good structure with minor gaps
   - 50-69: Basic organization, some confusion
   - 30-49: Poor structure, hard to follow
   - 0-29: No clear organization

3. RULE ACCURACY: Correct statement of law/tests
   - 90-100: All rules stated correctly and precisely
   - 70-89: Most rules correct, minor errors
   - 50-69: Some rules correct, some errors
   - 30-49: Frequent rule errors
   - 0-29: Rules mostly incorrect or missing

4. APPLICATION QUALITY: Fact weaving and analysis depth
   - 90-100: Excellent fact-to-element mapping, nuanced analysis
   - 70-89: Good fact application, mostly thorough
   - 50-69: Basic application, some conclusory statements
   - 30-49: Weak application, very conclusory
   - 0-29: Little to no fact application

5. OVER-SPOTTING PENALTY: Frivolous or unsupported issues
   - 0-20: No over-spotting (good)
   - 21-40: Minor over-spotting of edge issues (acceptable if marked \"minor\")
   - 41-60: Moderate over-spotting
   - 61-80: Significant over-spotting
   - 81-100: Severe over-spotting (bad)

6. WRITING CLARITY: Exam-style prose, readability
   - 90-100: Clear, concise, professional
   - 70-89: Generally clear, minor issues
   - 50-69: Adequate but verbose or unclear in places
   - 30-49: Often unclear or disorganized
   - 0-29: Very unclear or illegible";

/// Expected-issue checklist the grader works from, per subject.
pub fn checklist(subject: Subject) -> &'static str {
    match subject {
        Subject::Torts => "TORTS (1L/Bar):
- Negligence: duty, breach, actual causation, proximate causation, damages
- Negligence per se (if statute mentioned)
- Strict liability: abnormally dangerous activities, wild animals
- Intentional torts: battery, assault, IIED, NIED, false imprisonment, trespass to land/chattel
- Defenses: contributory/comparative negligence, assumption of risk, consent
- Vicarious liability, joint & several liability
- Damages: compensatory, punitive (if recklessness)",
        Subject::Contracts => "CONTRACTS (1L/Bar):
- Formation: offer, acceptance, consideration, mutual assent
- Defenses to formation: mistake, fraud, duress, undue influence, unconscionability
- Statute of Frauds
- Performance: conditions, substantial performance, breach
- Remedies: expectation, reliance, restitution, specific performance
- Third-party beneficiaries, assignment, delegation
- UCC Article 2 (if goods involved)",
        Subject::Crim => "CRIMINAL LAW (1L/Bar):
- Elements: actus reus, mens rea, causation, concurrence
- Specific intent vs. general intent vs. strict liability crimes
- Homicide: murder (degrees), felony murder, manslaughter
- Theft crimes: larceny, robbery, burglary, embezzlement
- Inchoate crimes: attempt, conspiracy, solicitation
- Defenses: self-defense, insanity, intoxication, duress, necessity
- Accomplice liability",
        Subject::ConLaw => "CONSTITUTIONAL LAW (1L/Bar):
- Judicial review, standing, mootness, ripeness
- Commerce Clause, taxing/spending power
- Due Process (substantive & procedural)
- Equal Protection: levels of scrutiny
- First Amendment: speech, religion clauses
- Takings Clause
- State action requirement",
        Subject::Property => "PROPERTY (1L/Bar):
- Estates: fee simple, life estate, future interests
- Concurrent ownership: joint tenancy, tenancy in common
- Landlord-tenant: types, duties, remedies
- Easements, covenants, servitudes
- Adverse possession
- Recording acts: notice, race, race-notice",
        Subject::CivPro => "CIVIL PROCEDURE (1L/Bar):
- Personal jurisdiction: minimum contacts, long-arm statutes
- Subject matter jurisdiction: federal question, diversity
- Venue, forum non conveniens
- Pleading standards: notice pleading, plausibility (Twombly/Iqbal)
- Joinder: parties, claims
- Discovery disputes
- Summary judgment standard
- Appeals",
    }
}

fn weights_line() -> String {
    let weights = RubricDimension::ALL
        .iter()
        .map(|d| format!("{} {}%", d.label(), d.weight()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OVERALL = weighted average ({weights}) - OverSpottingPenalty adjustment")
}

fn system_prompt() -> String {
    let checklists = Subject::ALL
        .iter()
        .map(|s| checklist(*s))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "You are an objective grader for law school issue-spotting exams.

ROLE:
- Evaluate student answers against expected issues from the fact pattern
- Use a consistent rubric based on the subject(s) and level
- Set rubricVersion to \"{RUBRIC_VERSION}\"
- Output ONLY valid JSON matching this TypeScript interface:

{REPORT_SHAPE}

{RUBRIC}

{weights}

EXPECTED ISSUES BY SUBJECT (use as checklist):

{checklists}

IMPORTANT:
- Don't penalize reasonable edge issues if student labels them \"possible\" or \"minor\"
- Prioritize advice on the biggest gaps first
- Suggest a logical IRAC order (major claims first, then defenses, then remedies)",
        weights = weights_line(),
    )
}

fn user_prompt(fact_pattern: &FactPattern, config: &SessionConfig, answer: &str) -> String {
    format!(
        "You are grading an issue-spotting answer.

FACT PATTERN:
<<<
{fact_pattern}
>>>

SUBJECTS: {subjects}
LEVEL: {level}
FOCUS: {focus}

USER ANSWER:
<<<
{answer}
>>>

Return ONLY valid JSON matching the EvaluationReport interface. No markdown, no code blocks, just raw JSON.",
        fact_pattern = fact_pattern.text(),
        subjects = config.subject_list(),
        level = config.level,
        focus = config.focus_or_default(),
    )
}

/// A validated report and the audit of its overall score.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub report: EvaluationReport,
    pub audit: ScoreAudit,
}

pub struct Evaluator {
    model: Arc<dyn LanguageModel>,
}

impl Evaluator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn messages(
        fact_pattern: &FactPattern,
        config: &SessionConfig,
        answer: &str,
    ) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(system_prompt()),
            ChatMessage::user(user_prompt(fact_pattern, config, answer)),
        ]
    }

    pub async fn evaluate(
        &self,
        fact_pattern: &FactPattern,
        config: &SessionConfig,
        answer: &str,
    ) -> Result<Evaluation, StudyError> {
        config.validate().map_err(StudyError::InvalidRequest)?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(StudyError::InvalidRequest("An answer is required".into()));
        }

        let request = GenerateRequest::new(Self::messages(fact_pattern, config, answer))
            .with_max_tokens(EVALUATOR_MAX_TOKENS);
        info!(
            model = self.model.model_name(),
            subjects = %config.subject_list(),
            level = %config.level,
            answer_chars = answer.len(),
            "evaluating answer"
        );
        let raw = self.model.generate(&request).await?;

        let report: EvaluationReport = parse_model_json(&raw).inspect_err(|errors| {
            warn!(failures = errors.len(), "evaluation report rejected");
            debug!(raw = %raw, "raw evaluator output");
        })?;

        let audit = ScoreAudit::of(&report.scores);
        if !audit.is_consistent() {
            warn!(
                overall = audit.reported_overall,
                weighted_base = audit.weighted_base,
                "reported overall exceeds the weighted rubric score"
            );
        }
        let counts = report.finding_counts();
        info!(
            overall = report.scores.overall,
            spotted = counts.spotted,
            partial = counts.partially_spotted,
            missed = counts.missed,
            "evaluation complete"
        );
        Ok(Evaluation { report, audit })
    }
}
