//! The grading rubric and an independent audit of the model's overall score.
//!
//! The evaluator asks the model for an `overall` score computed as a weighted
//! average of five dimensions minus an over-spotting adjustment. The exact
//! adjustment is left to the model, so the reported `overall` is audited
//! rather than recomputed: it can sit at or below the weighted base, never
//! meaningfully above it.

use crate::report::Scores;

/// Rubric identifier the evaluator asks the model to echo back.
pub const RUBRIC_VERSION: &str = "issue-spotting-rubric-1";

/// How far above the weighted base a reported `overall` may sit before it is
/// flagged. Covers rounding by the model.
pub const OVERALL_TOLERANCE: f64 = 2.0;

/// Weighted rubric dimensions. The over-spotting penalty is not weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubricDimension {
    Coverage,
    Organization,
    RuleAccuracy,
    ApplicationQuality,
    WritingClarity,
}

impl RubricDimension {
    pub const ALL: [RubricDimension; 5] = [
        RubricDimension::Coverage,
        RubricDimension::Organization,
        RubricDimension::RuleAccuracy,
        RubricDimension::ApplicationQuality,
        RubricDimension::WritingClarity,
    ];

    /// Weight in percent; the five weights sum to 100.
    pub fn weight(&self) -> u32 {
        match self {
            Self::Coverage => 30,
            Self::Organization => 15,
            Self::RuleAccuracy => 20,
            Self::ApplicationQuality => 25,
            Self::WritingClarity => 10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Coverage => "Coverage",
            Self::Organization => "Organization",
            Self::RuleAccuracy => "Rule Accuracy",
            Self::ApplicationQuality => "Application Quality",
            Self::WritingClarity => "Writing Clarity",
        }
    }

    pub fn score(&self, scores: &Scores) -> f64 {
        match self {
            Self::Coverage => scores.coverage,
            Self::Organization => scores.organization,
            Self::RuleAccuracy => scores.rule_accuracy,
            Self::ApplicationQuality => scores.application_quality,
            Self::WritingClarity => scores.writing_clarity,
        }
    }
}

/// Weighted average of the five rubric dimensions, before any penalty.
pub fn weighted_base(scores: &Scores) -> f64 {
    RubricDimension::ALL
        .iter()
        .map(|d| d.score(scores) * f64::from(d.weight()))
        .sum::<f64>()
        / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditVerdict {
    /// `overall` is at or below the weighted base (within tolerance).
    Consistent,
    /// `overall` exceeds anything the stated weights allow.
    Inflated,
}

/// Comparison of the reported `overall` with the stated weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreAudit {
    pub weighted_base: f64,
    pub reported_overall: f64,
    /// `weighted_base - reported_overall`; what the model deducted for
    /// over-spotting. Negative when inflated.
    pub implied_penalty: f64,
    pub verdict: AuditVerdict,
}

impl ScoreAudit {
    pub fn of(scores: &Scores) -> Self {
        let base = weighted_base(scores);
        let verdict = if scores.overall >= 0.0 && scores.overall <= base + OVERALL_TOLERANCE {
            AuditVerdict::Consistent
        } else {
            AuditVerdict::Inflated
        };
        Self {
            weighted_base: base,
            reported_overall: scores.overall,
            implied_penalty: base - scores.overall,
            verdict,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.verdict == AuditVerdict::Consistent
    }
}

/// Coarse bands for presenting a 0–100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Weak,
}

impl ScoreBand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Weak => "weak",
        }
    }
}

pub fn score_band(score: f64) -> ScoreBand {
    if score >= 90.0 {
        ScoreBand::Excellent
    } else if score >= 70.0 {
        ScoreBand::Good
    } else if score >= 50.0 {
        ScoreBand::Fair
    } else {
        ScoreBand::Weak
    }
}
