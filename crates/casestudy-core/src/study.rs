//! Quiz and flashcard shapes produced by the study generators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::validate::{Validate, ValidationErrors, check_non_empty};

pub const QUIZ_OPTION_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: u32,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardDeck {
    pub flashcards: Vec<Flashcard>,
}

impl Validate for FlashcardDeck {
    fn validate(&self, errors: &mut ValidationErrors) {
        if self.flashcards.is_empty() {
            errors.push("flashcards", "must contain at least one card");
        }
        for (idx, card) in self.flashcards.iter().enumerate() {
            check_non_empty(errors, &format!("flashcards[{idx}].front"), &card.front);
            check_non_empty(errors, &format!("flashcards[{idx}].back"), &card.back);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl QuizQuestion {
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// Number of answers matching the key. Unanswered questions count as wrong.
    pub fn score(&self, answers: &BTreeMap<u32, usize>) -> usize {
        score_answers(&self.questions, answers)
    }
}

pub fn score_answers(questions: &[QuizQuestion], answers: &BTreeMap<u32, usize>) -> usize {
    questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
        .count()
}

/// Option letter for a zero-based option index: 0 → `A`.
pub fn option_letter(index: usize) -> char {
    char::from(b'A' + (index % 26) as u8)
}

/// Parse an answer sheet such as `1=C, 2=a,3=B` into question id → option index.
///
/// Later entries for the same question replace earlier ones.
pub fn parse_answer_sheet(input: &str) -> Result<BTreeMap<u32, usize>, String> {
    let mut answers = BTreeMap::new();
    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, letter) = entry
            .split_once('=')
            .ok_or_else(|| format!("'{entry}' is not of the form <question>=<letter>"))?;
        let id: u32 = id
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a question number", id.trim()))?;
        let letter = letter.trim();
        let index = match letter.as_bytes() {
            [b] if b.is_ascii_alphabetic() => usize::from(b.to_ascii_uppercase() - b'A'),
            _ => return Err(format!("'{letter}' is not an option letter")),
        };
        answers.insert(id, index);
    }
    if answers.is_empty() {
        return Err("no answers given".to_string());
    }
    Ok(answers)
}

impl Validate for Quiz {
    fn validate(&self, errors: &mut ValidationErrors) {
        if self.questions.is_empty() {
            errors.push("questions", "must contain at least one question");
        }
        for (idx, q) in self.questions.iter().enumerate() {
            let path = format!("questions[{idx}]");
            check_non_empty(errors, &format!("{path}.question"), &q.question);
            if q.options.len() != QUIZ_OPTION_COUNT {
                errors.push(
                    format!("{path}.options"),
                    format!("must have exactly {QUIZ_OPTION_COUNT} options, got {}", q.options.len()),
                );
            }
            if q.correct_answer >= QUIZ_OPTION_COUNT {
                errors.push(
                    format!("{path}.correctAnswer"),
                    format!("must be between 0 and 3, got {}", q.correct_answer),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::validate::parse_model_json;

    const QUIZ: &str = r#"{"questions": [
        {"id": 1, "question": "What does Palsgraf hold?", "options": ["A", "B", "C", "D"],
         "correctAnswer": 2, "explanation": "Foreseeable plaintiff."},
        {"id": 2, "question": "Consideration requires?", "options": ["A", "B", "C", "D"],
         "correctAnswer": 0, "explanation": "Bargained-for exchange.", "topic": "Contracts"}
    ]}"#;

    #[test]
    fn quiz_parses_and_scores() {
        let quiz: Quiz = parse_model_json(QUIZ).unwrap();
        assert_eq!(quiz.questions[0].correct_option(), Some("C"));
        let answers = BTreeMap::from([(1, 2), (2, 3)]);
        assert_eq!(quiz.score(&answers), 1);
    }

    #[test]
    fn answer_sheet_parses_letters() {
        let answers = parse_answer_sheet("1=C, 2=a,,3 = B,2=D").unwrap();
        assert_eq!(answers, BTreeMap::from([(1, 2), (2, 3), (3, 1)]));
        assert_eq!(option_letter(2), 'C');
    }

    #[test]
    fn answer_sheet_rejects_malformed_entries() {
        assert!(parse_answer_sheet("").is_err());
        assert!(parse_answer_sheet("1C").is_err());
        assert!(parse_answer_sheet("one=C").is_err());
        assert!(parse_answer_sheet("1=CD").is_err());
        assert!(parse_answer_sheet("1=3").is_err());
    }

    #[test]
    fn quiz_rejects_bad_options_and_answer_index() {
        let bad = QUIZ
            .replacen(r#"["A", "B", "C", "D"]"#, r#"["A", "B"]"#, 1)
            .replace("\"correctAnswer\": 0", "\"correctAnswer\": 7");
        let err = parse_model_json::<Quiz>(&bad).unwrap_err();
        let paths: Vec<&str> = err.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["questions[0].options", "questions[1].correctAnswer"]);
    }

    #[test]
    fn empty_deck_rejected() {
        let err = parse_model_json::<FlashcardDeck>(r#"{"flashcards": []}"#).unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn deck_category_defaults() {
        let deck: FlashcardDeck =
            parse_model_json(r#"{"flashcards": [{"id": 1, "front": "Define: res ipsa", "back": "The thing speaks for itself"}]}"#)
                .unwrap();
        assert_eq!(deck.flashcards[0].category, "");
    }
}
