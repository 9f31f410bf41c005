use std::sync::Arc;

use exam_core::model::{
    AccountLedger, AnswerRecord, Attempt, AttemptError, AttemptOptions, AttemptStatus, Category,
    EngineSettings, FlaggedSet, Test, TestId, UserId,
};
use exam_core::scoring::{self, ReviewFilter, ReviewItem, ScoreReport};
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::repository::ContentRepository;
use tracing::{debug, info, warn};

use super::gate::QuestionLimitGate;
use super::progress::SessionProgress;
use super::state::{LoadFailure, SessionState};
use super::view::QuestionView;
use crate::Clock;
use crate::error::{GuardRejection, NotFoundReason, SessionError, SyncError};
use crate::sync::{
    AnswerSubmission, FinishOutcome, FinishRequest, PositionUpdate, ProgressSync, SyncCommand,
    SyncEvent, SyncHandle,
};

//
// ─── LOAD REQUEST ──────────────────────────────────────────────────────────────
//

/// What to load: an existing attempt matching `status`, or a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub status: AttemptStatus,
    /// `Some` discards any stored attempt and generates a new one.
    pub restart: Option<AttemptOptions>,
}

impl LoadRequest {
    #[must_use]
    pub fn resume() -> Self {
        Self {
            status: AttemptStatus::Unfinished,
            restart: None,
        }
    }

    #[must_use]
    pub fn review() -> Self {
        Self {
            status: AttemptStatus::Finished,
            restart: None,
        }
    }

    #[must_use]
    pub fn any() -> Self {
        Self {
            status: AttemptStatus::Any,
            restart: None,
        }
    }

    #[must_use]
    pub fn restart(options: AttemptOptions) -> Self {
        Self {
            status: AttemptStatus::Any,
            restart: Some(options),
        }
    }
}

//
// ─── TRANSITION RESULTS ────────────────────────────────────────────────────────
//

/// Where a navigation transition left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(usize),
    Finished(ScoreReport),
}

/// Result of `select_option`. Correctness is withheld in exam mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOutcome {
    pub position: usize,
    pub is_correct: Option<bool>,
    pub correct_display_index: Option<usize>,
    pub live_score: u32,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Shared collaborators handed to every session.
#[derive(Clone)]
pub struct SessionContext {
    pub clock: Clock,
    pub settings: Arc<EngineSettings>,
    pub content: Arc<dyn ContentRepository>,
    pub sync: Arc<dyn ProgressSync>,
}

struct Loaded {
    test: Test,
    attempt: Attempt,
    gate: QuestionLimitGate,
}

/// One user's working copy of one test attempt.
///
/// Transitions mutate the local attempt first and then queue the matching
/// write on the background sync worker. Sync failures never roll local
/// state back.
pub struct TestSession {
    user_id: UserId,
    category: Category,
    test_id: TestId,
    ctx: SessionContext,
    rng: StdRng,
    state: SessionState,
    loaded: Option<Loaded>,
    flags: FlaggedSet,
    live_score: u32,
    ledger: AccountLedger,
    unlocked: Vec<String>,
    finish_outcome: Option<FinishOutcome>,
    worker: Option<SyncHandle>,
}

impl TestSession {
    #[must_use]
    pub fn new(user_id: UserId, category: Category, test_id: TestId, ctx: SessionContext) -> Self {
        Self {
            user_id,
            category,
            test_id,
            ctx,
            rng: StdRng::from_os_rng(),
            state: SessionState::Uninitialized,
            loaded: None,
            flags: FlaggedSet::new(),
            live_score: 0,
            ledger: AccountLedger::default(),
            unlocked: Vec::new(),
            finish_outcome: None,
            worker: None,
        }
    }

    /// Use a seeded generator for orderings created by this session.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
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
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn attempt(&self) -> Option<&Attempt> {
        self.loaded.as_ref().map(|l| &l.attempt)
    }

    #[must_use]
    pub fn test(&self) -> Option<&Test> {
        self.loaded.as_ref().map(|l| &l.test)
    }

    #[must_use]
    pub fn flags(&self) -> &FlaggedSet {
        &self.flags
    }

    /// Correct first-time answers in this practice session.
    #[must_use]
    pub fn live_score(&self) -> u32 {
        self.live_score
    }

    #[must_use]
    pub fn gate(&self) -> Option<QuestionLimitGate> {
        self.loaded.as_ref().map(|l| l.gate)
    }

    #[must_use]
    pub fn report(&self) -> Option<ScoreReport> {
        self.state.report()
    }

    //
    // ─── LOAD ──────────────────────────────────────────────────────────────────
    //

    /// Fetch the test and attempt and enter `Active`, `Finished` or `Error`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` when there is nothing to resume or the
    /// test is empty, and `SessionError::Sync` when a collaborator fails. The
    /// session is left in `SessionState::Error` in both cases.
    pub async fn load(&mut self, request: LoadRequest) -> Result<(), SessionError> {
        // Earlier writes must land before the store is read or replaced.
        if self.worker.is_some() {
            self.flush().await;
        }
        if let Some(worker) = self.worker.take() {
            worker.detach();
        }
        self.state = SessionState::Loading;
        debug!(user = %self.user_id, test = %self.test_id, ?request, "loading session");

        match self.fetch_and_reconcile(request).await {
            Ok(loaded) => {
                self.state = if loaded.attempt.is_finished() {
                    SessionState::Finished(ScoreReport::compute(
                        &loaded.attempt,
                        self.ctx.settings.grade_thresholds(),
                    ))
                } else {
                    SessionState::Active {
                        exam_mode: loaded.attempt.is_exam_mode(),
                    }
                };
                self.live_score = if loaded.attempt.is_exam_mode() {
                    0
                } else {
                    scoring::score(loaded.attempt.answers())
                };
                self.flags.clear();
                self.unlocked.clear();
                self.finish_outcome = None;
                self.loaded = Some(loaded);
                self.worker = Some(SyncHandle::spawn(Arc::clone(&self.ctx.sync)));
                debug!(state = self.state.name(), "session loaded");
                Ok(())
            }
            Err(err) => {
                warn!(user = %self.user_id, test = %self.test_id, %err, "session load failed");
                self.loaded = None;
                self.state = SessionState::Error(load_failure(&err));
                Err(err)
            }
        }
    }

    async fn fetch_and_reconcile(&mut self, request: LoadRequest) -> Result<Loaded, SessionError> {
        let test = self
            .ctx
            .content
            .get_test(&self.category, self.test_id)
            .await?
            .ok_or(SessionError::NotFound(NotFoundReason::UnknownTest))?;
        if test.is_empty() {
            return Err(SessionError::NotFound(NotFoundReason::EmptyTest));
        }

        let entitlement = self.ctx.sync.fetch_entitlement(self.user_id).await?;
        self.ledger = self.ctx.sync.fetch_account(self.user_id).await?;

        let attempt = if let Some(options) = request.restart {
            let attempt = Attempt::generate(
                self.user_id,
                &test,
                options,
                &mut self.rng,
                self.ctx.clock.now(),
            )?;
            self.ctx.sync.upsert_attempt(&attempt).await?;
            attempt
        } else {
            let mut attempt = self
                .ctx
                .sync
                .fetch_attempt(self.user_id, self.test_id, request.status)
                .await?
                .ok_or(SessionError::NotFound(NotFoundReason::NoSession))?;
            if !attempt.orderings_fit(&test) {
                info!(
                    user = %self.user_id,
                    test = %self.test_id,
                    "stored orderings no longer fit the test; regenerating"
                );
                attempt.regenerate_orderings(&test, &mut self.rng)?;
                attempt.touch(self.ctx.clock.now());
                self.ctx.sync.upsert_attempt(&attempt).await?;
            }
            attempt
        };

        Ok(Loaded {
            test,
            attempt,
            gate: QuestionLimitGate::new(entitlement),
        })
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Answer the current question with the option shown at `display_index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Guard` when a practice question is already
    /// answered or the free limit is reached; nothing is changed in that case.
    pub fn select_option(&mut self, display_index: usize) -> Result<SelectOutcome, SessionError> {
        self.absorb_events();
        let exam_mode = self.require_active()?;
        let now = self.ctx.clock.now();
        let loaded = self.loaded_mut()?;

        let position = loaded.attempt.current_position();
        let question = loaded
            .attempt
            .current_question(&loaded.test)
            .ok_or(AttemptError::PositionOutOfRange {
                position,
                len: loaded.attempt.selected_length(),
            })?;
        if !exam_mode && loaded.attempt.is_answered(question.id()) {
            return Err(SessionError::Guard(GuardRejection::AlreadyAnswered));
        }
        let option = loaded
            .attempt
            .underlying_option(position, display_index)
            .ok_or(SessionError::OptionOutOfRange {
                index: display_index,
                len: question.option_count(),
            })?;
        loaded.gate.check().map_err(SessionError::Guard)?;

        let record = AnswerRecord::chosen(question, option);
        let previous = loaded.attempt.upsert_answer(record);
        loaded.attempt.touch(now);
        let consumed = loaded.gate.record_consumed();
        let submission = AnswerSubmission {
            test_id: loaded.test.id(),
            question_id: question.id(),
            correct_option_index: question.correct_option_index(),
            chosen_option_index: Some(option),
            reward_rate: loaded.test.reward_rate(),
        };
        let correct_display_index = loaded
            .attempt
            .display_index(position, question.correct_option_index());

        let is_correct = record.is_correct();
        if !exam_mode && is_correct && !previous.is_some_and(|p| p.is_correct()) {
            self.live_score += 1;
        }

        if consumed {
            self.send(SyncCommand::ConsumeFreeQuestion {
                user_id: self.user_id,
            });
        }
        self.send(SyncCommand::SubmitAnswer {
            user_id: self.user_id,
            submission,
        });
        debug!(position, exam_mode, "option selected");

        Ok(SelectOutcome {
            position,
            is_correct: (!exam_mode).then_some(is_correct),
            correct_display_index: if exam_mode {
                None
            } else {
                correct_display_index
            },
            live_score: self.live_score,
        })
    }

    /// Record a skip for the current question and move on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Guard(GuardRejection::LimitReached)` for an
    /// exhausted free tier.
    pub fn skip(&mut self) -> Result<Step, SessionError> {
        self.absorb_events();
        let exam_mode = self.require_active()?;
        let now = self.ctx.clock.now();
        let loaded = self.loaded_mut()?;

        let position = loaded.attempt.current_position();
        let question = loaded
            .attempt
            .current_question(&loaded.test)
            .ok_or(AttemptError::PositionOutOfRange {
                position,
                len: loaded.attempt.selected_length(),
            })?;
        loaded.gate.check().map_err(SessionError::Guard)?;

        let previous = loaded.attempt.upsert_answer(AnswerRecord::skipped(question));
        loaded.attempt.touch(now);
        let consumed = loaded.gate.record_consumed();
        let submission = AnswerSubmission {
            test_id: loaded.test.id(),
            question_id: question.id(),
            correct_option_index: question.correct_option_index(),
            chosen_option_index: None,
            reward_rate: loaded.test.reward_rate(),
        };

        if !exam_mode && previous.is_some_and(|p| p.is_correct()) {
            self.live_score = self.live_score.saturating_sub(1);
        }
        if consumed {
            self.send(SyncCommand::ConsumeFreeQuestion {
                user_id: self.user_id,
            });
        }
        self.send(SyncCommand::SubmitAnswer {
            user_id: self.user_id,
            submission,
        });
        debug!(position, "question skipped");

        self.advance()
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Advance, or finish from the last position.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Guard(GuardRejection::AnswerRequired)` in
    /// practice mode while the current question has no chosen option.
    pub fn next(&mut self) -> Result<Step, SessionError> {
        self.absorb_events();
        let exam_mode = self.require_active()?;
        if !exam_mode {
            let loaded = self.loaded_ref()?;
            let answered = loaded
                .attempt
                .current_question(&loaded.test)
                .is_some_and(|q| loaded.attempt.is_answered(q.id()));
            if !answered {
                return Err(SessionError::Guard(GuardRejection::AnswerRequired));
            }
        }
        self.advance()
    }

    /// Step back one position; a no-op at the first position.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `Active`.
    pub fn previous(&mut self) -> Result<Step, SessionError> {
        self.absorb_events();
        self.require_active()?;
        let position = self.loaded_ref()?.attempt.current_position();
        if position == 0 {
            return Ok(Step::Moved(0));
        }
        self.move_to(position - 1)?;
        Ok(Step::Moved(position - 1))
    }

    /// Jump to `position`. Practice sessions may only jump backwards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Attempt` for a position outside the selection and
    /// `SessionError::Guard` for a forward jump in practice mode.
    pub fn go_to(&mut self, position: usize) -> Result<Step, SessionError> {
        self.absorb_events();
        match self.state {
            SessionState::Active { exam_mode: false } => {
                if position > self.loaded_ref()?.attempt.current_position() {
                    return Err(SessionError::Guard(GuardRejection::AnswerRequired));
                }
            }
            SessionState::Active { exam_mode: true }
            | SessionState::Finished(_)
            | SessionState::Reviewing { .. } => {}
            state => {
                return Err(SessionError::InvalidState {
                    state: state.name(),
                });
            }
        }
        self.move_to(position)?;
        Ok(Step::Moved(position))
    }

    /// Flag or unflag the current question. Returns whether it is now flagged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` before a successful load.
    pub fn toggle_flag(&mut self) -> Result<bool, SessionError> {
        if !matches!(
            self.state,
            SessionState::Active { .. } | SessionState::Finished(_) | SessionState::Reviewing { .. }
        ) {
            return Err(SessionError::InvalidState {
                state: self.state.name(),
            });
        }
        let loaded = self.loaded_ref()?;
        let position = loaded.attempt.current_position();
        let question_id = loaded
            .attempt
            .current_question(&loaded.test)
            .map(|q| q.id())
            .ok_or(AttemptError::PositionOutOfRange {
                position,
                len: loaded.attempt.selected_length(),
            })?;
        Ok(self.flags.toggle(question_id))
    }

    //
    // ─── FINISH & REVIEW ───────────────────────────────────────────────────────
    //

    /// Score the attempt from its answer records and enter `Finished`.
    ///
    /// The local report stands even if the synchronizer later rejects the
    /// finish call.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `Active`.
    pub fn finish(&mut self) -> Result<ScoreReport, SessionError> {
        self.absorb_events();
        self.require_active()?;
        let now = self.ctx.clock.now();
        let thresholds = *self.ctx.settings.grade_thresholds();
        let loaded = self.loaded_mut()?;

        let report = ScoreReport::compute(&loaded.attempt, &thresholds);
        loaded.attempt.mark_finished();
        loaded.attempt.touch(now);
        let snapshot = loaded.attempt.clone();

        self.live_score = report.score;
        self.state = SessionState::Finished(report);
        self.send(SyncCommand::Upsert(snapshot));
        self.send(SyncCommand::Finish {
            user_id: self.user_id,
            test_id: self.test_id,
            request: FinishRequest {
                score: report.score,
                total: report.total,
            },
        });
        debug!(score = report.score, total = report.total, "session finished");
        Ok(report)
    }

    /// Enter `Reviewing` and list the questions matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the attempt is finished.
    pub fn review(&mut self, filter: ReviewFilter) -> Result<Vec<ReviewItem<'_>>, SessionError> {
        self.absorb_events();
        let report = match self.state {
            SessionState::Finished(report) | SessionState::Reviewing { report, .. } => report,
            state => {
                return Err(SessionError::InvalidState {
                    state: state.name(),
                });
            }
        };
        self.state = SessionState::Reviewing { report, filter };
        let loaded = self.loaded_ref()?;
        Ok(scoring::filter_for_review(
            &loaded.test,
            &loaded.attempt,
            &self.flags,
            filter,
        ))
    }

    //
    // ─── VIEWS ─────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn current_question(&self) -> Option<QuestionView<'_>> {
        let position = self.loaded.as_ref()?.attempt.current_position();
        self.question_view(position)
    }

    /// View of any position; feedback follows the same rules as the current question.
    #[must_use]
    pub fn question_view(&self, position: usize) -> Option<QuestionView<'_>> {
        let loaded = self.loaded.as_ref()?;
        let reveal = match self.state {
            SessionState::Finished(_) | SessionState::Reviewing { .. } => true,
            SessionState::Active { exam_mode: false } => loaded
                .attempt
                .question_at(&loaded.test, position)
                .is_some_and(|q| loaded.attempt.is_answered(q.id())),
            _ => false,
        };
        QuestionView::build(&loaded.test, &loaded.attempt, &self.flags, position, reveal)
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        let loaded = self.loaded.as_ref()?;
        let attempt = &loaded.attempt;
        let total = attempt.selected_length();
        let selected = loaded.test.selected(total);
        let (mut answered, mut skipped) = (0, 0);
        for question in selected {
            match attempt.answer_for(question.id()) {
                Some(record) if record.is_skipped() => skipped += 1,
                Some(_) => answered += 1,
                None => {}
            }
        }
        Some(SessionProgress {
            total,
            answered,
            skipped,
            remaining_unanswered: total.saturating_sub(answered + skipped),
            position: attempt.current_position(),
            flagged: self.flags.len(),
        })
    }

    /// Local ledger after applying every award the worker has reported.
    pub fn ledger(&mut self) -> AccountLedger {
        self.absorb_events();
        self.ledger
    }

    /// Milestone labels unlocked since the last call.
    pub fn take_unlocked(&mut self) -> Vec<String> {
        self.absorb_events();
        std::mem::take(&mut self.unlocked)
    }

    /// Ledger result of the finish call, once the worker has applied it.
    pub fn finish_outcome(&mut self) -> Option<&FinishOutcome> {
        self.absorb_events();
        self.finish_outcome.as_ref()
    }

    //
    // ─── SYNC ──────────────────────────────────────────────────────────────────
    //

    /// Wait for every queued write to be applied or dropped.
    pub async fn flush(&mut self) {
        if let Some(worker) = self.worker.as_ref() {
            if let Err(err) = worker.flush().await {
                warn!(%err, "sync flush did not complete");
            }
        }
        self.absorb_events();
    }

    /// Queue a final full upsert and let the worker drain on its own.
    pub fn close(mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if let Some(loaded) = self.loaded.take() {
            if let Err(err) = worker.send(SyncCommand::Upsert(loaded.attempt)) {
                warn!(%err, "final upsert not queued");
            }
        }
        worker.detach();
        debug!(user = %self.user_id, test = %self.test_id, "session closed");
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn require_active(&self) -> Result<bool, SessionError> {
        match self.state {
            SessionState::Active { exam_mode } => Ok(exam_mode),
            state => Err(SessionError::InvalidState {
                state: state.name(),
            }),
        }
    }

    fn loaded_ref(&self) -> Result<&Loaded, SessionError> {
        self.loaded.as_ref().ok_or(SessionError::InvalidState {
            state: self.state.name(),
        })
    }

    fn loaded_mut(&mut self) -> Result<&mut Loaded, SessionError> {
        let state = self.state.name();
        self.loaded
            .as_mut()
            .ok_or(SessionError::InvalidState { state })
    }

    fn send(&self, command: SyncCommand) {
        let label = command.label();
        let sent = match self.worker.as_ref() {
            Some(worker) => worker.send(command),
            None => Err(SyncError::Closed),
        };
        if let Err(err) = sent {
            warn!(command = label, %err, "dropping sync write");
        }
    }

    fn advance(&mut self) -> Result<Step, SessionError> {
        let attempt = &self.loaded_ref()?.attempt;
        if attempt.is_last_position() {
            return self.finish().map(Step::Finished);
        }
        let next = attempt.current_position() + 1;
        self.move_to(next)?;
        Ok(Step::Moved(next))
    }

    fn move_to(&mut self, position: usize) -> Result<(), SessionError> {
        let now = self.ctx.clock.now();
        let loaded = self.loaded_mut()?;
        loaded.attempt.set_position(position)?;
        loaded.attempt.touch(now);
        let finished = loaded.attempt.is_finished();
        self.send(SyncCommand::UpdatePosition {
            user_id: self.user_id,
            test_id: self.test_id,
            update: PositionUpdate {
                current_position: position,
                finished,
            },
        });
        Ok(())
    }

    fn absorb_events(&mut self) {
        let Some(worker) = self.worker.as_mut() else {
            return;
        };
        for event in worker.drain_events() {
            match event {
                SyncEvent::Award(award) => {
                    let unlocked = self.ledger.apply(&award, self.ctx.settings.milestones());
                    self.unlocked.extend(unlocked);
                }
                SyncEvent::Finished(outcome) => {
                    self.ledger = AccountLedger::from_persisted(outcome.new_xp, outcome.new_coins);
                    self.unlocked.extend(outcome.newly_unlocked.iter().cloned());
                    self.finish_outcome = Some(outcome);
                }
            }
        }
    }
}

fn load_failure(err: &SessionError) -> LoadFailure {
    match err {
        SessionError::NotFound(reason) => LoadFailure::NotFound(*reason),
        SessionError::Storage(_) => LoadFailure::Storage,
        SessionError::Attempt(_) => LoadFailure::InvalidAttempt,
        SessionError::Sync(_)
        | SessionError::Guard(_)
        | SessionError::InvalidState { .. }
        | SessionError::OptionOutOfRange { .. } => LoadFailure::Sync,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::time::fixed_now;
    use storage::repository::Storage;

    use crate::sync::StoreProgressSync;

    fn session() -> TestSession {
        let storage = Storage::in_memory();
        let settings = Arc::new(EngineSettings::default());
        let clock = Clock::fixed(fixed_now());
        let ctx = SessionContext {
            clock,
            settings: Arc::clone(&settings),
            content: Arc::clone(&storage.content),
            sync: Arc::new(StoreProgressSync::from_storage(clock, settings, &storage)),
        };
        TestSession::new(
            UserId::new(1),
            Category::new("net").unwrap(),
            TestId::new(1),
            ctx,
        )
    }

    #[test]
    fn transitions_before_load_are_rejected() {
        let mut session = session();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(matches!(
            session.select_option(0),
            Err(SessionError::InvalidState {
                state: "uninitialized"
            })
        ));
        assert!(matches!(
            session.finish(),
            Err(SessionError::InvalidState { .. })
        ));
        assert!(matches!(
            session.review(ReviewFilter::All),
            Err(SessionError::InvalidState { .. })
        ));
        assert!(session.current_question().is_none());
        assert!(session.progress().is_none());
    }

    #[tokio::test]
    async fn unknown_test_ends_in_error_state() {
        let mut session = session();
        let err = session.load(LoadRequest::resume()).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotFound(NotFoundReason::UnknownTest)
        ));
        assert_eq!(
            session.state(),
            SessionState::Error(LoadFailure::NotFound(NotFoundReason::UnknownTest))
        );
    }

    #[test]
    fn load_failures_map_to_error_reasons() {
        assert_eq!(
            load_failure(&SessionError::NotFound(NotFoundReason::NoSession)),
            LoadFailure::NotFound(NotFoundReason::NoSession)
        );
        assert_eq!(
            load_failure(&SessionError::Attempt(AttemptError::EmptySelection)),
            LoadFailure::InvalidAttempt
        );
    }
}
