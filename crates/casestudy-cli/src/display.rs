//! Plain-text cards for evaluations, study sets, artifacts and cases.
//!
//! Everything renders to a `String` so the layout can be tested; callers
//! print the result.

use std::fmt::Write;

use casestudy_ai::Evaluation;
use casestudy_cases::{CaseResults, CaseSummary};
use casestudy_core::{
    ArtifactData, AuditVerdict, FindingStatus, FlashcardDeck, OVER_SPOTTING_WARNING, Quiz,
    QuizData, RubricDimension, SavedArtifact, option_letter, score_band,
};

const LABEL_WIDTH: usize = 22;

fn field(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {label:<LABEL_WIDTH$} {value}");
}

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "=== {title} ===");
}

// ── Evaluation ──

pub fn evaluation_card(evaluation: &Evaluation) -> String {
    let report = &evaluation.report;
    let scores = &report.scores;
    let audit = &evaluation.audit;
    let mut out = String::new();

    header(&mut out, "Evaluation");
    let subjects: Vec<&str> = report.subjects.iter().map(|s| s.as_str()).collect();
    field(&mut out, "Subjects", subjects.join(", "));
    field(&mut out, "Level", report.level);
    field(&mut out, "Rubric", &report.rubric_version);
    out.push('\n');

    out.push_str("Scores\n");
    for dimension in RubricDimension::ALL {
        let score = dimension.score(scores);
        field(
            &mut out,
            &format!("{} ({}%)", dimension.label(), dimension.weight()),
            format!("{score:>5.1}  {}", score_band(score).label()),
        );
    }
    let penalty_note = if scores.over_spotting_penalty > OVER_SPOTTING_WARNING {
        "high"
    } else {
        "ok"
    };
    field(
        &mut out,
        "Over-spotting penalty",
        format!("{:>5.1}  {penalty_note}", scores.over_spotting_penalty),
    );
    field(
        &mut out,
        "Overall",
        format!("{:>5.1}  {}", scores.overall, score_band(scores.overall).label()),
    );
    match audit.verdict {
        AuditVerdict::Consistent => field(
            &mut out,
            "Weighted base",
            format!(
                "{:>5.1}  (implied deduction {:.1})",
                audit.weighted_base, audit.implied_penalty
            ),
        ),
        AuditVerdict::Inflated => field(
            &mut out,
            "Weighted base",
            format!(
                "{:>5.1}  WARNING: overall exceeds what the weights allow",
                audit.weighted_base
            ),
        ),
    }
    out.push('\n');

    let counts = report.finding_counts();
    let _ = writeln!(
        out,
        "Findings ({} spotted, {} partial, {} missed)",
        counts.spotted, counts.partially_spotted, counts.missed
    );
    for finding in &report.findings {
        let mark = match finding.status {
            FindingStatus::Spotted => "+",
            FindingStatus::PartiallySpotted => "~",
            FindingStatus::Missed => "-",
        };
        let _ = writeln!(out, "  {mark} {}: {}", finding.issue, finding.comment);
    }

    if !report.prioritized_advice.is_empty() {
        out.push_str("\nAdvice\n");
        for (idx, advice) in report.prioritized_advice.iter().enumerate() {
            let _ = writeln!(out, "  {}. {advice}", idx + 1);
        }
    }
    if !report.suggested_irac_order.is_empty() {
        out.push_str("\nSuggested IRAC order\n");
        for (idx, issue) in report.suggested_irac_order.iter().enumerate() {
            let _ = writeln!(out, "  {}. {issue}", idx + 1);
        }
    }
    out
}

// ── Study sets ──

pub fn quiz_card(quiz: &Quiz) -> String {
    let mut out = String::new();
    header(&mut out, &format!("Quiz ({} questions)", quiz.questions.len()));
    for question in &quiz.questions {
        let _ = writeln!(out, "\n{}. {}", question.id, question.question);
        for (idx, option) in question.options.iter().enumerate() {
            let _ = writeln!(out, "   {}) {option}", option_letter(idx));
        }
        let answer = option_letter(question.correct_answer);
        let _ = writeln!(out, "   Answer: {answer}. {}", question.explanation);
    }
    out
}

/// Per-question marks for a submitted quiz.
pub fn quiz_result(data: &QuizData) -> String {
    let mut out = String::new();
    let total = data.questions.len();
    header(&mut out, &format!("Score {}/{total}", data.score.unwrap_or(0)));
    for question in &data.questions {
        let chosen = data.user_answers.get(&question.id).copied();
        let correct = chosen == Some(question.correct_answer);
        let mark = if correct { "+" } else { "-" };
        let chosen = chosen.map_or('?', option_letter);
        let _ = writeln!(out, "  {mark} {}. {}", question.id, question.question);
        if correct {
            let _ = writeln!(out, "      {chosen}");
        } else {
            let _ = writeln!(
                out,
                "      {chosen}, expected {}. {}",
                option_letter(question.correct_answer),
                question.explanation
            );
        }
    }
    out
}

pub fn flashcard_card(deck: &FlashcardDeck) -> String {
    let mut out = String::new();
    header(&mut out, &format!("Flashcards ({})", deck.flashcards.len()));
    for card in &deck.flashcards {
        let category = if card.category.is_empty() {
            String::new()
        } else {
            format!(" [{}]", card.category)
        };
        let _ = writeln!(out, "\n{}.{category} {}", card.id, card.front);
        let _ = writeln!(out, "   {}", card.back);
    }
    out
}

// ── Artifacts ──

/// One line per artifact: id, kind, date, title.
pub fn artifact_row(artifact: &SavedArtifact) -> String {
    format!(
        "{:>5}  {:<14} {}  {}",
        artifact.id,
        artifact.data.kind().as_str(),
        artifact.created_at.format("%Y-%m-%d %H:%M"),
        artifact.title
    )
}

pub fn artifact_card(artifact: &SavedArtifact) -> String {
    let mut out = String::new();
    header(&mut out, &artifact.title);
    field(&mut out, "Id", artifact.id);
    field(&mut out, "Kind", artifact.data.kind());
    field(&mut out, "Created", artifact.created_at.to_rfc3339());
    field(&mut out, "Summary", &artifact.summary);

    match &artifact.data {
        ArtifactData::IssueSpotting(data) => {
            if let Some(topic) = &data.topic {
                field(&mut out, "Topic", topic);
            }
            field(&mut out, "Messages", data.messages.len());
            if let Some(report) = &data.report {
                field(&mut out, "Overall", format!("{:.1}", report.scores.overall));
            }
            let _ = writeln!(out, "\nFact pattern\n  {}", data.fact_pattern);
            for note in &data.issues {
                let _ = writeln!(out, "\n  {}: {}", note.issue, note.analysis);
            }
        }
        ArtifactData::Document(data) => {
            field(&mut out, "File", &data.file_name);
            let _ = writeln!(out, "\n{}", data.analysis);
        }
        ArtifactData::Quiz(data) => {
            field(&mut out, "Files", data.file_names.join(", "));
            field(&mut out, "Completed", if data.completed { "yes" } else { "no" });
            if let Some(score) = data.score {
                field(&mut out, "Score", format!("{score}/{}", data.questions.len()));
            }
            out.push('\n');
            if data.completed {
                out.push_str(&quiz_result(data));
            } else {
                out.push_str(&quiz_card(&Quiz {
                    questions: data.questions.clone(),
                }));
            }
        }
        ArtifactData::Flashcard(data) => {
            field(&mut out, "Files", data.file_names.join(", "));
            out.push('\n');
            out.push_str(&flashcard_card(&FlashcardDeck {
                flashcards: data.flashcards.clone(),
            }));
        }
        ArtifactData::Chat(data) => {
            for message in &data.messages {
                let _ = writeln!(
                    out,
                    "\n[{} {}]\n{}",
                    message.timestamp.format("%H:%M"),
                    message.role.as_str(),
                    message.content
                );
            }
        }
    }
    out
}

// ── Cases ──

pub fn case_list(results: &CaseResults) -> String {
    let mut out = String::new();
    let more = if results.has_more { ", more available" } else { "" };
    let _ = writeln!(
        out,
        "{} of {} results{more}",
        results.cases.len(),
        results.total
    );
    for case in &results.cases {
        let date = case.date.as_deref().unwrap_or("undated");
        let _ = writeln!(out, "\n{}  {}", case.id, case.title);
        let _ = writeln!(out, "  {} | {} | {date}", case.citation, case.court);
    }
    out
}

pub fn case_card(case: &CaseSummary) -> String {
    let mut out = String::new();
    header(&mut out, &case.title);
    field(&mut out, "Id", &case.id);
    field(&mut out, "Citation", &case.citation);
    field(&mut out, "Court", &case.court);
    field(&mut out, "Jurisdiction", &case.jurisdiction);
    field(&mut out, "Date", case.date.as_deref().unwrap_or("unknown"));
    if !case.topics.is_empty() {
        field(&mut out, "Status", case.topics.join(", "));
    }
    field(
        &mut out,
        "Full text",
        if case.full_text_available { "yes" } else { "no" },
    );
    field(&mut out, "URL", &case.url);
    let _ = writeln!(out, "\n{}", case.summary);
    out
}

#[cfg(test)]
mod tests {
    use casestudy_core::{
        EvaluationReport, Finding, Flashcard, Level, NewArtifact, QuizQuestion, ScoreAudit,
        Scores, Subject,
    };
    use chrono::{TimeZone, Utc};

    use super::*;

    fn evaluation(overall: f64) -> Evaluation {
        let scores = Scores {
            coverage: 70.0,
            organization: 60.0,
            rule_accuracy: 70.0,
            application_quality: 60.0,
            over_spotting_penalty: 45.0,
            writing_clarity: 70.0,
            overall,
        };
        Evaluation {
            report: EvaluationReport {
                rubric_version: "issue-spotting-rubric-1".into(),
                subjects: vec![Subject::Torts],
                level: Level::FirstYear,
                expected_issues: Vec::new(),
                findings: vec![
                    Finding {
                        issue: "Negligence".into(),
                        status: FindingStatus::Spotted,
                        comment: "Good duty analysis".into(),
                    },
                    Finding {
                        issue: "Battery".into(),
                        status: FindingStatus::Missed,
                        comment: "Not discussed".into(),
                    },
                ],
                scores,
                prioritized_advice: vec!["Lead with the strongest issue".into()],
                suggested_irac_order: Vec::new(),
            },
            audit: ScoreAudit::of(&scores),
        }
    }

    #[test]
    fn evaluation_shows_bands_and_findings() {
        let card = evaluation_card(&evaluation(60.0));
        assert!(card.contains("Coverage (30%)"));
        assert!(card.contains("Findings (1 spotted, 0 partial, 1 missed)"));
        assert!(card.contains("  + Negligence: Good duty analysis"));
        assert!(card.contains("  - Battery: Not discussed"));
        assert!(card.contains(" 45.0  high"));
        assert!(card.contains("1. Lead with the strongest issue"));
        assert!(!card.contains("Suggested IRAC order"));
        assert!(!card.contains("WARNING"));
    }

    #[test]
    fn inflated_overall_is_flagged() {
        let card = evaluation_card(&evaluation(99.0));
        assert!(card.contains("WARNING: overall exceeds what the weights allow"));
    }

    #[test]
    fn quiz_marks_answer_letter() {
        let quiz = Quiz {
            questions: vec![QuizQuestion {
                id: 1,
                question: "What is consideration?".into(),
                options: vec!["A gift".into(), "A bargained-for exchange".into()],
                correct_answer: 1,
                explanation: "Bargain theory.".into(),
                topic: None,
            }],
        };
        let card = quiz_card(&quiz);
        assert!(card.starts_with("=== Quiz (1 questions) ==="));
        assert!(card.contains("   B) A bargained-for exchange"));
        assert!(card.contains("   Answer: B. Bargain theory."));
    }

    #[test]
    fn quiz_result_marks_each_answer() {
        let question = |id, correct_answer| QuizQuestion {
            id,
            question: format!("Question {id}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer,
            explanation: "See the outline.".into(),
            topic: None,
        };
        let artifact = NewArtifact::quiz(
            Quiz {
                questions: vec![question(1, 0), question(2, 2)],
            },
            None,
            vec![],
        );
        let ArtifactData::Quiz(mut data) = artifact.data else {
            panic!("expected quiz payload");
        };
        data.submit(std::collections::BTreeMap::from([(1, 0), (2, 3)]))
            .unwrap();
        let card = quiz_result(&data);
        assert!(card.starts_with("=== Score 1/2 ==="));
        assert!(card.contains("  + 1. Question 1\n      A\n"));
        assert!(card.contains("  - 2. Question 2\n      D, expected C. See the outline."));
    }

    #[test]
    fn artifact_row_and_card() {
        let deck = FlashcardDeck {
            flashcards: vec![Flashcard {
                id: 1,
                front: "Mailbox rule".into(),
                back: "Acceptance is effective on dispatch".into(),
                category: "Contracts".into(),
            }],
        };
        let saved = NewArtifact::flashcards(deck, None, vec!["k.pdf".into()])
            .into_saved(7, Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap());
        assert_eq!(
            artifact_row(&saved),
            "    7  flashcard      2026-03-01 09:30  Flashcards - k.pdf"
        );
        let card = artifact_card(&saved);
        assert!(card.contains("1. [Contracts] Mailbox rule"));
        assert!(card.contains("k.pdf"));
    }

    #[test]
    fn case_list_lines() {
        let results = CaseResults {
            cases: vec![CaseSummary {
                id: "cl-1-0".into(),
                title: "Palsgraf v. Long Island R.R.".into(),
                citation: "248 N.Y. 339".into(),
                court: "ny".into(),
                date: None,
                jurisdiction: "State".into(),
                topics: vec!["Published".into()],
                summary: "Proximate cause.".into(),
                url: "https://www.courtlistener.com/opinion/1/".into(),
                full_text_available: true,
            }],
            total: 12,
            has_more: true,
        };
        let out = case_list(&results);
        assert!(out.starts_with("1 of 12 results, more available"));
        assert!(out.contains("  248 N.Y. 339 | ny | undated"));
        let card = case_card(&results.cases[0]);
        assert!(card.contains("Proximate cause."));
        assert!(card.contains("Full text"));
    }
}
