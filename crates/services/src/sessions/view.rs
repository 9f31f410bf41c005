use exam_core::model::{Attempt, FlaggedSet, QuestionId, Test};

/// Answer feedback, revealed once a practice question is answered or in review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback<'a> {
    pub correct_display_index: usize,
    pub is_correct: bool,
    pub explanation: &'a str,
    pub exam_tip: &'a str,
}

/// The question at one position, with options already in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView<'a> {
    pub position: usize,
    pub total: usize,
    pub question_id: QuestionId,
    pub prompt: &'a str,
    pub options: Vec<&'a str>,
    /// Display index of the stored choice, if any.
    pub chosen_display_index: Option<usize>,
    pub skipped: bool,
    pub flagged: bool,
    pub feedback: Option<Feedback<'a>>,
}

impl<'a> QuestionView<'a> {
    /// Build the view for `position`. `None` when the position is outside the selection.
    pub(crate) fn build(
        test: &'a Test,
        attempt: &Attempt,
        flags: &FlaggedSet,
        position: usize,
        reveal: bool,
    ) -> Option<Self> {
        let question = attempt.question_at(test, position)?;
        let order = attempt.option_order().get(position)?;
        let options = order
            .iter()
            .filter_map(|&i| question.options().get(i).map(String::as_str))
            .collect();

        let record = attempt.answer_for(question.id());
        let chosen_display_index = record
            .and_then(|r| r.chosen_option_index)
            .and_then(|chosen| attempt.display_index(position, chosen));
        let skipped = record.is_some_and(|r| r.is_skipped());

        let feedback = if reveal {
            attempt
                .display_index(position, question.correct_option_index())
                .map(|correct_display_index| Feedback {
                    correct_display_index,
                    is_correct: record.is_some_and(|r| r.is_correct()),
                    explanation: question.explanation(),
                    exam_tip: question.exam_tip(),
                })
        } else {
            None
        };

        Some(Self {
            position,
            total: attempt.selected_length(),
            question_id: question.id(),
            prompt: question.prompt(),
            options,
            chosen_display_index,
            skipped,
            flagged: flags.contains(question.id()),
            feedback,
        })
    }
}
