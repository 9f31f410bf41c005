//! Scoring and post-completion review.
//!
//! The score is always derived from the answer records; no incrementally
//! tracked counter is trusted once an attempt finishes.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerRecord, Attempt, FlaggedSet, Question, QuestionId, Test};

//
// ─── SCORE ────────────────────────────────────────────────────────────────────
//

/// Number of records whose choice equals the correct option.
#[must_use]
pub fn score(answers: &[AnswerRecord]) -> u32 {
    let correct = answers.iter().filter(|a| a.is_correct()).count();
    u32::try_from(correct).unwrap_or(u32::MAX)
}

/// `round(score / total * 100)`, rounding halves up. Zero when `total == 0`.
#[must_use]
pub fn percentage(score: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score.min(total));
    let total = u64::from(total);
    let rounded = (score * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

//
// ─── GRADE BANDS ──────────────────────────────────────────────────────────────
//

/// Qualitative band for a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    Highest,
    High,
    MidHigh,
    Mid,
    Low,
}

/// Lower bounds (inclusive) for each band above `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeThresholds {
    pub highest: u8,
    pub high: u8,
    pub mid_high: u8,
    pub mid: u8,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            highest: 90,
            high: 80,
            mid_high: 70,
            mid: 60,
        }
    }
}

impl GradeThresholds {
    #[must_use]
    pub fn grade(&self, percentage: u8) -> Grade {
        if percentage >= self.highest {
            Grade::Highest
        } else if percentage >= self.high {
            Grade::High
        } else if percentage >= self.mid_high {
            Grade::MidHigh
        } else if percentage >= self.mid {
            Grade::Mid
        } else {
            Grade::Low
        }
    }

    /// True when every bound is at most 100 and strictly below the previous one.
    #[must_use]
    pub fn is_descending(&self) -> bool {
        self.highest <= 100
            && self.highest > self.high
            && self.high > self.mid_high
            && self.mid_high > self.mid
    }
}

/// Final result of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: u32,
    pub total: u32,
    pub percentage: u8,
    pub grade: Grade,
}

impl ScoreReport {
    #[must_use]
    pub fn compute(attempt: &Attempt, thresholds: &GradeThresholds) -> Self {
        let score = score(attempt.answers());
        let total = u32::try_from(attempt.selected_length()).unwrap_or(u32::MAX);
        let percentage = percentage(score, total);
        Self {
            score,
            total,
            percentage,
            grade: thresholds.grade(percentage),
        }
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.score == self.total
    }
}

//
// ─── REVIEW ───────────────────────────────────────────────────────────────────
//

/// How a question ended up in an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerStatus {
    /// No record at all.
    Unanswered,
    Skipped,
    Correct,
    Incorrect,
}

#[must_use]
pub fn classify(question_id: QuestionId, answers: &[AnswerRecord]) -> AnswerStatus {
    match answers.iter().find(|a| a.question_id == question_id) {
        None => AnswerStatus::Unanswered,
        Some(record) if record.is_skipped() => AnswerStatus::Skipped,
        Some(record) if record.is_correct() => AnswerStatus::Correct,
        Some(_) => AnswerStatus::Incorrect,
    }
}

/// Review list selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReviewFilter {
    #[default]
    All,
    /// Skipped or never answered.
    Skipped,
    Flagged,
    Incorrect,
    Correct,
}

impl ReviewFilter {
    #[must_use]
    pub fn matches(self, status: AnswerStatus, flagged: bool) -> bool {
        match self {
            ReviewFilter::All => true,
            ReviewFilter::Skipped => {
                matches!(status, AnswerStatus::Skipped | AnswerStatus::Unanswered)
            }
            ReviewFilter::Flagged => flagged,
            ReviewFilter::Incorrect => status == AnswerStatus::Incorrect,
            ReviewFilter::Correct => status == AnswerStatus::Correct,
        }
    }
}

/// One row of a review list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem<'a> {
    pub question: &'a Question,
    /// Where the question was displayed in this attempt, if it still is.
    pub position: Option<usize>,
    pub status: AnswerStatus,
    pub chosen_option_index: Option<usize>,
    pub flagged: bool,
}

/// Questions of the attempt's selection matching `filter`, in the test's natural order.
#[must_use]
pub fn filter_for_review<'a>(
    test: &'a Test,
    attempt: &Attempt,
    flagged: &FlaggedSet,
    filter: ReviewFilter,
) -> Vec<ReviewItem<'a>> {
    test.selected(attempt.selected_length())
        .iter()
        .enumerate()
        .filter_map(|(index, question)| {
            let status = classify(question.id(), attempt.answers());
            let is_flagged = flagged.contains(question.id());
            if !filter.matches(status, is_flagged) {
                return None;
            }
            Some(ReviewItem {
                question,
                position: attempt.presentation_order().iter().position(|&i| i == index),
                status,
                chosen_option_index: attempt
                    .answer_for(question.id())
                    .and_then(|a| a.chosen_option_index),
                flagged: is_flagged,
            })
        })
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttemptParts, Category, RewardRate, TestId, UserId};
    use crate::time::fixed_now;

    fn build_test() -> Test {
        let questions = (1..=4)
            .map(|i| {
                let options = vec!["a".to_string(), "b".to_string(), "c".to_string()];
                Question::new(QuestionId::new(i), format!("Q{i}"), options, 0).unwrap()
            })
            .collect();
        Test::new(
            TestId::new(1),
            Category::new("net").unwrap(),
            questions,
            RewardRate::ZERO,
        )
        .unwrap()
    }

    fn attempt_with(test: &Test, answers: Vec<AnswerRecord>) -> Attempt {
        Attempt::from_parts(AttemptParts {
            user_id: UserId::new(1),
            test_id: test.id(),
            category: test.category().clone(),
            selected_length: 4,
            presentation_order: vec![0, 1, 2, 3],
            option_order: vec![vec![0, 1, 2]; 4],
            answers,
            current_position: 3,
            finished: true,
            exam_mode: false,
            updated_at: fixed_now(),
        })
        .unwrap()
    }

    fn ids(items: &[ReviewItem<'_>]) -> Vec<u64> {
        items.iter().map(|i| i.question.id().value()).collect()
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 4), 25);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn grade_bands_use_inclusive_lower_bounds() {
        let t = GradeThresholds::default();
        assert_eq!(t.grade(90), Grade::Highest);
        assert_eq!(t.grade(89), Grade::High);
        assert_eq!(t.grade(70), Grade::MidHigh);
        assert_eq!(t.grade(60), Grade::Mid);
        assert_eq!(t.grade(59), Grade::Low);
        assert!(t.is_descending());
    }

    #[test]
    fn mixed_attempt_scores_and_filters() {
        let test = build_test();
        let q = test.questions();
        let attempt = attempt_with(
            &test,
            vec![
                AnswerRecord::skipped(&q[0]),
                AnswerRecord::chosen(&q[1], 0),
                AnswerRecord::chosen(&q[2], 2),
                AnswerRecord::skipped(&q[3]),
            ],
        );
        let flagged = FlaggedSet::new();

        let report = ScoreReport::compute(&attempt, &GradeThresholds::default());
        assert_eq!(report.score, 1);
        assert_eq!(report.percentage, 25);
        assert_eq!(report.grade, Grade::Low);

        let skipped = filter_for_review(&test, &attempt, &flagged, ReviewFilter::Skipped);
        assert_eq!(ids(&skipped), vec![1, 4]);
        let incorrect = filter_for_review(&test, &attempt, &flagged, ReviewFilter::Incorrect);
        assert_eq!(ids(&incorrect), vec![3]);
        let correct = filter_for_review(&test, &attempt, &flagged, ReviewFilter::Correct);
        assert_eq!(ids(&correct), vec![2]);
        assert_eq!(incorrect[0].chosen_option_index, Some(2));
    }

    #[test]
    fn missing_record_filters_as_skipped() {
        let test = build_test();
        let attempt = attempt_with(&test, vec![AnswerRecord::chosen(&test.questions()[0], 0)]);
        let skipped = filter_for_review(&test, &attempt, &FlaggedSet::new(), ReviewFilter::Skipped);
        assert_eq!(ids(&skipped), vec![2, 3, 4]);
        assert_eq!(skipped[0].status, AnswerStatus::Unanswered);
    }

    #[test]
    fn flagged_filter_uses_flag_set() {
        let test = build_test();
        let attempt = attempt_with(&test, Vec::new());
        let mut flagged = FlaggedSet::new();
        flagged.toggle(QuestionId::new(3));

        let items = filter_for_review(&test, &attempt, &flagged, ReviewFilter::Flagged);
        assert_eq!(ids(&items), vec![3]);
        assert_eq!(items[0].position, Some(2));
    }

    #[test]
    fn score_ignores_skips() {
        let test = build_test();
        let q = test.questions();
        let answers = vec![AnswerRecord::skipped(&q[0]), AnswerRecord::chosen(&q[1], 0)];
        assert_eq!(score(&answers), 1);
    }
}
