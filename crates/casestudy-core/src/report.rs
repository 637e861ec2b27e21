//! Evaluation reports returned by the grader, plus JSON and Markdown export.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::issue::IssueNode;
use crate::session::{Level, Subject};
use crate::validate::{
    Validate, ValidationErrors, check_non_empty, check_percentage, parse_model_json,
};

/// Over-spotting penalties above this are flagged in exports.
pub const OVER_SPOTTING_WARNING: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Missed,
    PartiallySpotted,
    Spotted,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missed => "missed",
            Self::PartiallySpotted => "partially_spotted",
            Self::Spotted => "spotted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub issue: String,
    pub status: FindingStatus,
    pub comment: String,
}

/// Rubric scores, each 0–100. `overall` is reported by the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub coverage: f64,
    pub organization: f64,
    pub rule_accuracy: f64,
    pub application_quality: f64,
    /// Higher is worse.
    pub over_spotting_penalty: f64,
    pub writing_clarity: f64,
    pub overall: f64,
}

impl Scores {
    /// `(json name, value)` pairs in rubric order.
    pub fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("coverage", self.coverage),
            ("organization", self.organization),
            ("ruleAccuracy", self.rule_accuracy),
            ("applicationQuality", self.application_quality),
            ("overSpottingPenalty", self.over_spotting_penalty),
            ("writingClarity", self.writing_clarity),
            ("overall", self.overall),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub rubric_version: String,
    pub subjects: Vec<Subject>,
    pub level: Level,
    pub expected_issues: Vec<IssueNode>,
    pub findings: Vec<Finding>,
    pub scores: Scores,
    pub prioritized_advice: Vec<String>,
    #[serde(rename = "suggestedIRACOrder")]
    pub suggested_irac_order: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindingCounts {
    pub spotted: usize,
    pub partially_spotted: usize,
    pub missed: usize,
}

impl EvaluationReport {
    pub fn finding_counts(&self) -> FindingCounts {
        let mut counts = FindingCounts::default();
        for finding in &self.findings {
            match finding.status {
                FindingStatus::Spotted => counts.spotted += 1,
                FindingStatus::PartiallySpotted => counts.partially_spotted += 1,
                FindingStatus::Missed => counts.missed += 1,
            }
        }
        counts
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import a previously exported report. Runs the same checks as model output.
    pub fn from_json(json: &str) -> Result<Self, ValidationErrors> {
        parse_model_json(json)
    }

    /// Markdown export. `date` is rendered verbatim in the header.
    pub fn to_markdown(&self, date: &str) -> String {
        let subjects = self
            .subjects
            .iter()
            .map(Subject::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let s = &self.scores;
        let penalty_flag = if s.over_spotting_penalty > OVER_SPOTTING_WARNING {
            "(high)"
        } else {
            "(ok)"
        };

        let mut md = String::new();
        let _ = writeln!(md, "# Issue-Spotting Evaluation Report\n");
        let _ = writeln!(md, "**Date:** {date}");
        let _ = writeln!(md, "**Subjects:** {subjects}");
        let _ = writeln!(md, "**Level:** {}", self.level);
        let _ = writeln!(md, "**Rubric Version:** {}\n", self.rubric_version);
        let _ = writeln!(md, "## Overall Score: {}/100\n", s.overall);
        let _ = writeln!(md, "### Score Breakdown");
        let _ = writeln!(md, "- **Coverage:** {}/100", s.coverage);
        let _ = writeln!(md, "- **Organization:** {}/100", s.organization);
        let _ = writeln!(md, "- **Rule Accuracy:** {}/100", s.rule_accuracy);
        let _ = writeln!(md, "- **Application Quality:** {}/100", s.application_quality);
        let _ = writeln!(md, "- **Writing Clarity:** {}/100", s.writing_clarity);
        let _ = writeln!(
            md,
            "- **Over-Spotting Penalty:** {}/100 {penalty_flag}\n",
            s.over_spotting_penalty
        );

        let _ = writeln!(md, "## Findings\n");
        for finding in &self.findings {
            let _ = writeln!(md, "### {}", finding.issue);
            let _ = writeln!(md, "**Status:** {}", finding.status.as_str());
            let _ = writeln!(md, "{}\n", finding.comment);
        }

        let _ = writeln!(md, "## Prioritized Advice\n");
        for (idx, advice) in self.prioritized_advice.iter().enumerate() {
            let _ = writeln!(md, "{}. {advice}", idx + 1);
        }

        let _ = writeln!(md, "\n## Suggested IRAC Order\n");
        for (idx, issue) in self.suggested_irac_order.iter().enumerate() {
            let _ = writeln!(md, "{}. {issue}", idx + 1);
        }

        let _ = writeln!(md, "\n## Expected Issues\n");
        write_issue_list(&mut md, &self.expected_issues, 0);
        md
    }
}

fn write_issue_list(md: &mut String, nodes: &[IssueNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        let _ = write!(md, "{indent}- **{}** ({})", node.title, node.kind.as_str());
        match &node.notes {
            Some(notes) => {
                let _ = writeln!(md, ": {notes}");
            }
            None => md.push('\n'),
        }
        write_issue_list(md, &node.children, depth + 1);
    }
}

fn validate_issues(errors: &mut ValidationErrors, nodes: &[IssueNode], prefix: &str) {
    for (idx, node) in nodes.iter().enumerate() {
        let path = format!("{prefix}[{idx}]");
        check_non_empty(errors, &format!("{path}.title"), &node.title);
        validate_issues(errors, &node.children, &format!("{path}.children"));
    }
}

impl Validate for EvaluationReport {
    fn validate(&self, errors: &mut ValidationErrors) {
        check_non_empty(errors, "rubricVersion", &self.rubric_version);
        if self.subjects.is_empty() {
            errors.push("subjects", "must list at least one subject");
        }
        for (name, value) in self.scores.named() {
            check_percentage(errors, &format!("scores.{name}"), value);
        }
        validate_issues(errors, &self.expected_issues, "expectedIssues");
        for (idx, finding) in self.findings.iter().enumerate() {
            check_non_empty(errors, &format!("findings[{idx}].issue"), &finding.issue);
        }
    }
}
