use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{QuestionId, TestId, UserId};
use crate::model::question::{Category, Question, Test};
use crate::shuffle::{generate_orderings, is_permutation};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt must select at least one question")]
    EmptySelection,

    #[error("more than one answer recorded for question {0}")]
    DuplicateAnswer(QuestionId),

    #[error("position {position} is out of range for {len} questions")]
    PositionOutOfRange { position: usize, len: usize },
}

//
// ─── STATUS FILTER ────────────────────────────────────────────────────────────
//

/// Which stored attempt a load is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptStatus {
    /// Only an attempt that can still be continued.
    #[default]
    Unfinished,
    /// Only a finished attempt, for review.
    Finished,
    Any,
}

impl AttemptStatus {
    #[must_use]
    pub fn matches(self, finished: bool) -> bool {
        match self {
            AttemptStatus::Unfinished => !finished,
            AttemptStatus::Finished => finished,
            AttemptStatus::Any => true,
        }
    }
}

//
// ─── ANSWER RECORD ────────────────────────────────────────────────────────────
//

/// The user's answer to one question. `chosen_option_index == None` is a skip.
///
/// Both indices refer to the question's natural option order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub chosen_option_index: Option<usize>,
    pub correct_option_index: usize,
}

impl AnswerRecord {
    #[must_use]
    pub fn chosen(question: &Question, option_index: usize) -> Self {
        Self {
            question_id: question.id(),
            chosen_option_index: Some(option_index),
            correct_option_index: question.correct_option_index(),
        }
    }

    #[must_use]
    pub fn skipped(question: &Question) -> Self {
        Self {
            question_id: question.id(),
            chosen_option_index: None,
            correct_option_index: question.correct_option_index(),
        }
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.chosen_option_index == Some(self.correct_option_index)
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.chosen_option_index.is_none()
    }
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// How a fresh attempt should be shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttemptOptions {
    /// Number of leading questions to include. `None` or `Some(0)` selects the whole test.
    pub selected_length: Option<usize>,
    pub exam_mode: bool,
}

impl AttemptOptions {
    #[must_use]
    pub fn practice() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exam() -> Self {
        Self {
            selected_length: None,
            exam_mode: true,
        }
    }

    #[must_use]
    pub fn with_selected_length(mut self, len: usize) -> Self {
        self.selected_length = Some(len);
        self
    }
}

/// Raw attempt fields as read back from an Attempt Store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptParts {
    pub user_id: UserId,
    pub test_id: TestId,
    pub category: Category,
    pub selected_length: usize,
    pub presentation_order: Vec<usize>,
    pub option_order: Vec<Vec<usize>>,
    pub answers: Vec<AnswerRecord>,
    pub current_position: usize,
    pub finished: bool,
    pub exam_mode: bool,
    pub updated_at: DateTime<Utc>,
}

/// One user's progress through one test.
///
/// `current_position` indexes `presentation_order`; `presentation_order[p]`
/// indexes the test's questions in natural order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    user_id: UserId,
    test_id: TestId,
    category: Category,
    selected_length: usize,
    presentation_order: Vec<usize>,
    option_order: Vec<Vec<usize>>,
    answers: Vec<AnswerRecord>,
    current_position: usize,
    finished: bool,
    exam_mode: bool,
    updated_at: DateTime<Utc>,
}

impl Attempt {
    /// Create a fresh attempt with newly generated orderings and no answers.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::EmptySelection` if the test has no questions.
    pub fn generate<R: Rng + ?Sized>(
        user_id: UserId,
        test: &Test,
        options: AttemptOptions,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        let selected_length = match options.selected_length {
            Some(len) if len > 0 => len.min(test.question_count()),
            _ => test.question_count(),
        };
        if selected_length == 0 {
            return Err(AttemptError::EmptySelection);
        }

        let (presentation_order, option_order) =
            generate_orderings(test.selected(selected_length), rng);

        Ok(Self {
            user_id,
            test_id: test.id(),
            category: test.category().clone(),
            selected_length,
            presentation_order,
            option_order,
            answers: Vec::new(),
            current_position: 0,
            finished: false,
            exam_mode: options.exam_mode,
            updated_at: now,
        })
    }

    /// Rehydrate an attempt from storage.
    ///
    /// Orderings are not checked here; see `orderings_fit`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if no questions are selected, an answer is duplicated,
    /// or the position lies outside the selection.
    pub fn from_parts(parts: AttemptParts) -> Result<Self, AttemptError> {
        if parts.selected_length == 0 {
            return Err(AttemptError::EmptySelection);
        }
        if parts.current_position >= parts.selected_length {
            return Err(AttemptError::PositionOutOfRange {
                position: parts.current_position,
                len: parts.selected_length,
            });
        }
        let mut seen = HashSet::with_capacity(parts.answers.len());
        for answer in &parts.answers {
            if !seen.insert(answer.question_id) {
                return Err(AttemptError::DuplicateAnswer(answer.question_id));
            }
        }

        Ok(Self {
            user_id: parts.user_id,
            test_id: parts.test_id,
            category: parts.category,
            selected_length: parts.selected_length,
            presentation_order: parts.presentation_order,
            option_order: parts.option_order,
            answers: parts.answers,
            current_position: parts.current_position,
            finished: parts.finished,
            exam_mode: parts.exam_mode,
            updated_at: parts.updated_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn category(&self) -> &Category {
        &self.category
    }

    #[must_use]
    pub fn selected_length(&self) -> usize {
        self.selected_length
    }

    #[must_use]
    pub fn presentation_order(&self) -> &[usize] {
        &self.presentation_order
    }

    #[must_use]
    pub fn option_order(&self) -> &[Vec<usize>] {
        &self.option_order
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn current_position(&self) -> usize {
        self.current_position
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn is_exam_mode(&self) -> bool {
        self.exam_mode
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn is_last_position(&self) -> bool {
        self.current_position + 1 >= self.selected_length
    }

    /// True when the persisted orderings can be used against `test` as-is.
    ///
    /// Anything else (length drift, a test that shrank, a corrupt permutation)
    /// is a stale ordering and must be regenerated.
    #[must_use]
    pub fn orderings_fit(&self, test: &Test) -> bool {
        if self.selected_length > test.question_count() {
            return false;
        }
        if !is_permutation(&self.presentation_order, self.selected_length)
            || self.option_order.len() != self.selected_length
        {
            return false;
        }
        self.presentation_order
            .iter()
            .zip(&self.option_order)
            .all(|(&index, options)| {
                test.question(index)
                    .is_some_and(|q| is_permutation(options, q.option_count()))
            })
    }

    /// Replace both orderings with fresh permutations.
    ///
    /// `selected_length` is clamped to the test and the position to the new
    /// selection. Recorded answers are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::EmptySelection` if the test has no questions.
    pub fn regenerate_orderings<R: Rng + ?Sized>(
        &mut self,
        test: &Test,
        rng: &mut R,
    ) -> Result<(), AttemptError> {
        let selected_length = self.selected_length.min(test.question_count());
        if selected_length == 0 {
            return Err(AttemptError::EmptySelection);
        }
        let (presentation_order, option_order) =
            generate_orderings(test.selected(selected_length), rng);
        self.selected_length = selected_length;
        self.presentation_order = presentation_order;
        self.option_order = option_order;
        self.current_position = self.current_position.min(selected_length - 1);
        Ok(())
    }

    /// Natural question index shown at `position`.
    #[must_use]
    pub fn question_index_at(&self, position: usize) -> Option<usize> {
        self.presentation_order.get(position).copied()
    }

    #[must_use]
    pub fn question_at<'t>(&self, test: &'t Test, position: usize) -> Option<&'t Question> {
        self.question_index_at(position)
            .and_then(|index| test.question(index))
    }

    #[must_use]
    pub fn current_question<'t>(&self, test: &'t Test) -> Option<&'t Question> {
        self.question_at(test, self.current_position)
    }

    /// Map a displayed option index at `position` to the question's natural index.
    #[must_use]
    pub fn underlying_option(&self, position: usize, display_index: usize) -> Option<usize> {
        self.option_order
            .get(position)
            .and_then(|order| order.get(display_index))
            .copied()
    }

    /// Inverse of `underlying_option`.
    #[must_use]
    pub fn display_index(&self, position: usize, option_index: usize) -> Option<usize> {
        self.option_order
            .get(position)
            .and_then(|order| order.iter().position(|&o| o == option_index))
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<&AnswerRecord> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    /// A question counts as answered once a non-skip choice is recorded for it.
    #[must_use]
    pub fn is_answered(&self, question_id: QuestionId) -> bool {
        self.answer_for(question_id)
            .is_some_and(|a| a.chosen_option_index.is_some())
    }

    /// Insert or replace the record for `record.question_id`, returning the previous one.
    pub fn upsert_answer(&mut self, record: AnswerRecord) -> Option<AnswerRecord> {
        match self
            .answers
            .iter_mut()
            .find(|a| a.question_id == record.question_id)
        {
            Some(existing) => Some(std::mem::replace(existing, record)),
            None => {
                self.answers.push(record);
                None
            }
        }
    }

    /// Move to `position` within the selection.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::PositionOutOfRange` if `position >= selected_length`.
    pub fn set_position(&mut self, position: usize) -> Result<(), AttemptError> {
        if position >= self.selected_length {
            return Err(AttemptError::PositionOutOfRange {
                position,
                len: self.selected_length,
            });
        }
        self.current_position = position;
        Ok(())
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ledger::RewardRate;
    use crate::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build_test(n: u64) -> Test {
        let questions = (1..=n)
            .map(|i| {
                let options = (0..4).map(|o| format!("Q{i} option {o}")).collect();
                Question::new(QuestionId::new(i), format!("Question {i}"), options, 1).unwrap()
            })
            .collect();
        Test::new(
            TestId::new(1),
            Category::new("net").unwrap(),
            questions,
            RewardRate::new(10, 1),
        )
        .unwrap()
    }

    fn parts(test: &Test, presentation_order: Vec<usize>) -> AttemptParts {
        let option_order = presentation_order.iter().map(|_| vec![0, 1, 2, 3]).collect();
        AttemptParts {
            user_id: UserId::new(1),
            test_id: test.id(),
            category: test.category().clone(),
            selected_length: presentation_order.len(),
            presentation_order,
            option_order,
            answers: Vec::new(),
            current_position: 0,
            finished: false,
            exam_mode: false,
            updated_at: fixed_now(),
        }
    }

    #[test]
    fn generate_respects_selected_length() {
        let test = build_test(6);
        let mut rng = StdRng::seed_from_u64(3);
        let attempt = Attempt::generate(
            UserId::new(1),
            &test,
            AttemptOptions::practice().with_selected_length(4),
            &mut rng,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(attempt.selected_length(), 4);
        assert!(is_permutation(attempt.presentation_order(), 4));
        assert!(attempt.orderings_fit(&test));
        assert!(attempt.answers().is_empty());
    }

    #[test]
    fn zero_or_oversized_selection_means_whole_test() {
        let test = build_test(3);
        let mut rng = StdRng::seed_from_u64(3);
        for len in [0, 10] {
            let attempt = Attempt::generate(
                UserId::new(1),
                &test,
                AttemptOptions::exam().with_selected_length(len),
                &mut rng,
                fixed_now(),
            )
            .unwrap();
            assert_eq!(attempt.selected_length(), 3);
        }
    }

    #[test]
    fn presentation_order_maps_position_to_natural_index() {
        let test = build_test(4);
        let attempt = Attempt::from_parts(parts(&test, vec![2, 0, 3, 1])).unwrap();

        assert_eq!(attempt.question_index_at(0), Some(2));
        assert_eq!(
            attempt.current_question(&test).map(Question::id),
            Some(QuestionId::new(3))
        );
    }

    #[test]
    fn length_mismatch_is_stale() {
        let test = build_test(4);
        let mut p = parts(&test, vec![1, 0, 2]);
        p.selected_length = 4;
        let attempt = Attempt::from_parts(p).unwrap();
        assert!(!attempt.orderings_fit(&test));
    }

    #[test]
    fn regenerate_keeps_answers_and_clamps_to_shrunk_test() {
        let big = build_test(5);
        let mut attempt = Attempt::from_parts(parts(&big, vec![4, 3, 2, 1, 0])).unwrap();
        attempt.set_position(4).unwrap();
        attempt.upsert_answer(AnswerRecord::chosen(&big.questions()[0], 1));

        let small = build_test(3);
        assert!(!attempt.orderings_fit(&small));
        let mut rng = StdRng::seed_from_u64(11);
        attempt.regenerate_orderings(&small, &mut rng).unwrap();

        assert_eq!(attempt.selected_length(), 3);
        assert_eq!(attempt.current_position(), 2);
        assert_eq!(attempt.answers().len(), 1);
        assert!(attempt.orderings_fit(&small));
    }

    #[test]
    fn upsert_answer_replaces_by_question() {
        let test = build_test(2);
        let mut attempt = Attempt::from_parts(parts(&test, vec![0, 1])).unwrap();
        let q = &test.questions()[0];

        assert!(attempt.upsert_answer(AnswerRecord::chosen(q, 0)).is_none());
        let prev = attempt.upsert_answer(AnswerRecord::skipped(q)).unwrap();

        assert_eq!(prev.chosen_option_index, Some(0));
        assert_eq!(attempt.answers().len(), 1);
        assert!(!attempt.is_answered(q.id()));
    }

    #[test]
    fn from_parts_rejects_duplicate_answers() {
        let test = build_test(2);
        let mut p = parts(&test, vec![0, 1]);
        let record = AnswerRecord::skipped(&test.questions()[0]);
        p.answers = vec![record, record];
        let err = Attempt::from_parts(p).unwrap_err();
        assert_eq!(err, AttemptError::DuplicateAnswer(QuestionId::new(1)));
    }

    #[test]
    fn display_index_inverts_option_order() {
        let test = build_test(1);
        let mut p = parts(&test, vec![0]);
        p.option_order = vec![vec![3, 1, 0, 2]];
        let attempt = Attempt::from_parts(p).unwrap();

        assert_eq!(attempt.underlying_option(0, 0), Some(3));
        assert_eq!(attempt.display_index(0, 3), Some(0));
        assert_eq!(attempt.underlying_option(0, 4), None);
    }

    #[test]
    fn status_filter_matches() {
        assert!(AttemptStatus::Unfinished.matches(false));
        assert!(!AttemptStatus::Unfinished.matches(true));
        assert!(AttemptStatus::Finished.matches(true));
        assert!(AttemptStatus::Any.matches(true));
    }
}
