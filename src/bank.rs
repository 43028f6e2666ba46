//! Question bank definition and ingestion seam
//!
//! This module defines the immutable question bank a session plays
//! through. Banks are produced outside the engine (the ingestion step
//! parses uploaded tabular files into prompt and answer rows); the
//! engine only consumes the aligned result via [`QuestionBank::from_rows`]
//! and trusts it thereafter.

use garde::Validate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while assembling a bank from ingested rows
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A prompt row has no matching answer row
    #[error("answer row missing for question {0:?}")]
    MissingAnswers(String),
    /// An answer row has no matching prompt row
    #[error("prompt row missing for question {0:?}")]
    MissingPrompt(String),
}

/// A prompt row as produced by the ingestion collaborator
///
/// Mirrors the uploaded questions table: one prompt per question id,
/// with an optional free-form category tag the engine never interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRow {
    /// The question text shown to the room
    pub prompt: String,
    /// Optional category tag carried through from the source file
    pub category: Option<String>,
}

/// An answer row as produced by the ingestion collaborator
///
/// Mirrors the uploaded answers table: the correct answer plus the
/// wrong options presented alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRow {
    /// The exact text of the correct answer
    pub correct_answer: String,
    /// The wrong options, already filtered of empty cells
    pub distractors: Vec<String>,
}

/// One question with its prompt and answer set
///
/// Records are immutable once the bank is built; per-question runtime
/// state (open timestamp, closed flag) lives on the session instead.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionRecord {
    /// Identifier aligning this record across the ingested tables
    #[garde(skip)]
    pub id: String,
    /// The question text shown to the room
    #[garde(length(min = 1, max = crate::constants::bank::MAX_PROMPT_LENGTH))]
    pub prompt: String,
    /// Optional category tag, uninterpreted by the engine
    #[garde(skip)]
    pub category: Option<String>,
    /// The exact text of the correct answer
    #[garde(length(min = 1, max = crate::constants::bank::MAX_ANSWER_LENGTH))]
    pub correct_answer: String,
    /// Wrong options shown alongside the correct answer
    #[garde(
        length(max = crate::constants::bank::MAX_DISTRACTOR_COUNT),
        inner(length(min = 1, max = crate::constants::bank::MAX_ANSWER_LENGTH))
    )]
    pub distractors: Vec<String>,
}

impl QuestionRecord {
    /// Builds the option list for one presentation of this question
    ///
    /// Returns a fresh vector containing the distractors and the correct
    /// answer in a uniformly random order. A new shuffle is produced on
    /// every call; the stored record is never mutated, so repeated opens
    /// of the same question cannot leak a stale order.
    pub fn shuffled_options(&self) -> Vec<String> {
        let mut options = self.distractors.clone();
        options.push(self.correct_answer.clone());
        fastrand::shuffle(&mut options);
        options
    }

    /// Checks a submitted answer against the correct one
    ///
    /// Plain string equality: no trimming, no case folding.
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}

/// An immutable, ordered collection of question records
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionBank {
    /// The questions in source order
    #[garde(length(min = 1, max = crate::constants::bank::MAX_QUESTION_COUNT), dive)]
    questions: Vec<QuestionRecord>,
}

impl QuestionBank {
    /// Creates a bank directly from records
    pub fn new(questions: Vec<QuestionRecord>) -> Self {
        Self { questions }
    }

    /// Assembles a bank from the two ingested tables
    ///
    /// The prompt table fixes the question order; the two tables must
    /// cover exactly the same ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAnswers`] if a prompt id has no answer
    /// row, and [`Error::MissingPrompt`] if an answer row is left over
    /// with no prompt.
    pub fn from_rows(
        prompts: IndexMap<String, PromptRow>,
        mut answers: HashMap<String, AnswerRow>,
    ) -> Result<Self, Error> {
        let questions = prompts
            .into_iter()
            .map(|(id, row)| {
                let answer = answers
                    .remove(&id)
                    .ok_or_else(|| Error::MissingAnswers(id.clone()))?;
                Ok(QuestionRecord {
                    id,
                    prompt: row.prompt,
                    category: row.category,
                    correct_answer: answer.correct_answer,
                    distractors: answer.distractors,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        if let Some(id) = answers.into_keys().next() {
            return Err(Error::MissingPrompt(id));
        }

        Ok(Self { questions })
    }

    /// Returns the number of questions in the bank
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks whether the bank contains no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Looks up a question by its position in source order
    pub fn question(&self, index: usize) -> Option<&QuestionRecord> {
        self.questions.get(index)
    }

    /// Draws a fresh uniform permutation of all question indices
    ///
    /// This becomes a session's presentation order, fixed at creation.
    pub fn shuffled_order(&self) -> Vec<usize> {
        let mut order = (0..self.questions.len()).collect::<Vec<_>>();
        fastrand::shuffle(&mut order);
        order
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn record(id: &str, prompt: &str, correct: &str, distractors: &[&str]) -> QuestionRecord {
        QuestionRecord {
            id: id.to_string(),
            prompt: prompt.to_string(),
            category: None,
            correct_answer: correct.to_string(),
            distractors: distractors.iter().map(ToString::to_string).collect(),
        }
    }

    fn sample_bank(count: usize) -> QuestionBank {
        QuestionBank::new(
            (0..count)
                .map(|i| {
                    record(
                        &i.to_string(),
                        &format!("Question {i}?"),
                        "right",
                        &["wrong a", "wrong b", "wrong c"],
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_bank_validation() {
        assert!(sample_bank(3).validate().is_ok());
    }

    #[test]
    fn test_empty_bank_is_invalid() {
        let bank = QuestionBank::new(vec![]);
        assert!(bank.validate().is_err());
    }

    #[test]
    fn test_record_prompt_too_long() {
        let mut bank = sample_bank(1);
        bank.questions[0].prompt = "a".repeat(crate::constants::bank::MAX_PROMPT_LENGTH + 1);
        assert!(bank.validate().is_err());
    }

    #[test]
    fn test_record_too_many_distractors() {
        let mut bank = sample_bank(1);
        bank.questions[0].distractors =
            vec!["x".to_string(); crate::constants::bank::MAX_DISTRACTOR_COUNT + 1];
        assert!(bank.validate().is_err());
    }

    #[test]
    fn test_from_rows_aligns_ids() {
        let prompts: IndexMap<String, PromptRow> = [
            (
                "1".to_string(),
                PromptRow {
                    prompt: "First?".to_string(),
                    category: Some("history".to_string()),
                },
            ),
            (
                "2".to_string(),
                PromptRow {
                    prompt: "Second?".to_string(),
                    category: None,
                },
            ),
        ]
        .into_iter()
        .collect();
        let answers: HashMap<String, AnswerRow> = [
            (
                "2".to_string(),
                AnswerRow {
                    correct_answer: "two".to_string(),
                    distractors: vec!["three".to_string()],
                },
            ),
            (
                "1".to_string(),
                AnswerRow {
                    correct_answer: "one".to_string(),
                    distractors: vec!["zero".to_string(), "many".to_string()],
                },
            ),
        ]
        .into_iter()
        .collect();

        let bank = QuestionBank::from_rows(prompts, answers).unwrap();
        assert_eq!(bank.len(), 2);
        // Prompt table order is preserved.
        assert_eq!(bank.question(0).unwrap().correct_answer, "one");
        assert_eq!(bank.question(1).unwrap().correct_answer, "two");
        assert_eq!(
            bank.question(0).unwrap().category.as_deref(),
            Some("history")
        );
    }

    #[test]
    fn test_from_rows_missing_answers() {
        let prompts: IndexMap<String, PromptRow> = [(
            "1".to_string(),
            PromptRow {
                prompt: "First?".to_string(),
                category: None,
            },
        )]
        .into_iter()
        .collect();

        let result = QuestionBank::from_rows(prompts, HashMap::new());
        assert_eq!(result.unwrap_err(), Error::MissingAnswers("1".to_string()));
    }

    #[test]
    fn test_from_rows_orphan_answer() {
        let answers: HashMap<String, AnswerRow> = [(
            "ghost".to_string(),
            AnswerRow {
                correct_answer: "boo".to_string(),
                distractors: vec![],
            },
        )]
        .into_iter()
        .collect();

        let result = QuestionBank::from_rows(IndexMap::new(), answers);
        assert_eq!(result.unwrap_err(), Error::MissingPrompt("ghost".to_string()));
    }

    #[test]
    fn test_shuffled_options_is_permutation() {
        let record = record("1", "Capital of France?", "Paris", &["Lyon", "Nice"]);
        for _ in 0..20 {
            let options = record.shuffled_options();
            assert_eq!(options.len(), 3);
            assert_eq!(
                options.iter().sorted().collect::<Vec<_>>(),
                ["Lyon", "Nice", "Paris"].iter().collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_shuffled_options_varies_across_calls() {
        let record = record(
            "1",
            "Pick one",
            "a",
            &["b", "c", "d", "e", "f", "g", "h"],
        );
        let first = record.shuffled_options();
        let varied = (0..50).any(|_| record.shuffled_options() != first);
        assert!(varied, "50 shuffles of 8 options never changed order");
    }

    #[test]
    fn test_shuffled_order_is_permutation() {
        let bank = sample_bank(10);
        let order = bank.shuffled_order();
        assert_eq!(order.iter().copied().sorted().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffled_order_varies_across_calls() {
        let bank = sample_bank(10);
        let first = bank.shuffled_order();
        let varied = (0..50).any(|_| bank.shuffled_order() != first);
        assert!(varied, "50 shuffles of 10 questions never changed order");
    }

    #[test]
    fn test_is_correct_exact_equality() {
        let record = record("1", "Capital of France?", "Paris", &["Lyon"]);
        assert!(record.is_correct("Paris"));
        assert!(!record.is_correct("paris"));
        assert!(!record.is_correct(" Paris"));
        assert!(!record.is_correct(""));
    }
}
