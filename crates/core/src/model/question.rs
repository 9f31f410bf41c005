use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::model::ids::{QuestionId, TestId};
use crate::model::ledger::RewardRate;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least two options, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct option index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestError {
    #[error("category cannot be empty")]
    EmptyCategory,

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

//
// ─── CATEGORY ─────────────────────────────────────────────────────────────────
//

/// Content Store partition a test lives under (e.g. "networking").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(String);

impl Category {
    /// Build a category from user or storage input.
    ///
    /// # Errors
    ///
    /// Returns `TestError::EmptyCategory` if the trimmed name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, TestError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(TestError::EmptyCategory);
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A multiple-choice question as supplied by the Content Store.
///
/// Option indices always refer to the natural order of `options`; the display
/// order for a particular attempt lives in `Attempt::option_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_option_index: usize,
    explanation: String,
    exam_tip: String,
}

impl Question {
    /// Validate and build a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or any option is blank, fewer than two
    /// options are given, or the correct index does not point at an option.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option_index: usize,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if correct_option_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_option_index,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct_option_index,
            explanation: String::new(),
            exam_tip: String::new(),
        })
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    #[must_use]
    pub fn with_exam_tip(mut self, exam_tip: impl Into<String>) -> Self {
        self.exam_tip = exam_tip.into();
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_option_index(&self) -> usize {
        self.correct_option_index
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn exam_tip(&self) -> &str {
        &self.exam_tip
    }
}

//
// ─── TEST ─────────────────────────────────────────────────────────────────────
//

/// Immutable question bank for one test, owned by the Content Store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Test {
    id: TestId,
    category: Category,
    questions: Vec<Question>,
    reward_rate: RewardRate,
}

impl Test {
    /// Build a test from its questions in natural order.
    ///
    /// An empty question list is accepted here; sessions refuse to load it.
    ///
    /// # Errors
    ///
    /// Returns `TestError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        id: TestId,
        category: Category,
        questions: Vec<Question>,
        reward_rate: RewardRate,
    ) -> Result<Self, TestError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(TestError::DuplicateQuestion(question.id()));
            }
        }

        Ok(Self {
            id,
            category,
            questions,
            reward_rate,
        })
    }

    #[must_use]
    pub fn id(&self) -> TestId {
        self.id
    }

    #[must_use]
    pub fn category(&self) -> &Category {
        &self.category
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Reward granted by the Account Ledger for each first-time correct answer.
    #[must_use]
    pub fn reward_rate(&self) -> RewardRate {
        self.reward_rate
    }

    /// The first `len` questions in natural order (clamped to the bank size).
    #[must_use]
    pub fn selected(&self, len: usize) -> &[Question] {
        &self.questions[..len.min(self.questions.len())]
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
