use std::sync::Arc;

use async_trait::async_trait;
use exam_core::model::{
    AccountLedger, AnswerRecord, Attempt, AttemptStatus, AwardEvent, AwardReason, EngineSettings,
    Entitlement, RewardRate, TestId, UserId,
};
use storage::repository::{
    AttemptRepository, EntitlementRepository, LedgerRepository, Storage,
};

use super::{
    AnswerOutcome, AnswerSubmission, FinishOutcome, FinishRequest, PositionUpdate, ProgressSync,
};
use crate::Clock;
use crate::error::SyncError;

/// `ProgressSync` backed directly by the storage repositories.
#[derive(Clone)]
pub struct StoreProgressSync {
    clock: Clock,
    settings: Arc<EngineSettings>,
    attempts: Arc<dyn AttemptRepository>,
    ledger: Arc<dyn LedgerRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
}

impl StoreProgressSync {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: Arc<EngineSettings>,
        attempts: Arc<dyn AttemptRepository>,
        ledger: Arc<dyn LedgerRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
    ) -> Self {
        Self {
            clock,
            settings,
            attempts,
            ledger,
            entitlements,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, settings: Arc<EngineSettings>, storage: &Storage) -> Self {
        Self::new(
            clock,
            settings,
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.ledger),
            Arc::clone(&storage.entitlements),
        )
    }

    fn completion_bonus(&self, request: FinishRequest) -> RewardRate {
        let xp = request
            .score
            .saturating_mul(self.settings.finish_xp_per_correct());
        let perfect = request.total > 0 && request.score >= request.total;
        let coins = if perfect {
            self.settings.perfect_score_coins()
        } else {
            0
        };
        RewardRate::new(xp, coins)
    }
}

#[async_trait]
impl ProgressSync for StoreProgressSync {
    async fn fetch_attempt(
        &self,
        user_id: UserId,
        test_id: TestId,
        status: AttemptStatus,
    ) -> Result<Option<Attempt>, SyncError> {
        Ok(self.attempts.get_attempt(user_id, test_id, status).await?)
    }

    async fn upsert_attempt(&self, attempt: &Attempt) -> Result<(), SyncError> {
        Ok(self.attempts.upsert_attempt(attempt).await?)
    }

    async fn submit_answer(
        &self,
        user_id: UserId,
        submission: &AnswerSubmission,
    ) -> Result<AnswerOutcome, SyncError> {
        let test_id = submission.test_id;
        let attempt = self
            .attempts
            .get_attempt(user_id, test_id, AttemptStatus::Any)
            .await?
            .ok_or(SyncError::MissingAttempt { user_id, test_id })?;

        let record = AnswerRecord {
            question_id: submission.question_id,
            chosen_option_index: submission.chosen_option_index,
            correct_option_index: submission.correct_option_index,
        };
        self.attempts
            .record_answer(user_id, test_id, &record, self.clock.now())
            .await?;

        let exam_mode = attempt.is_exam_mode();
        let is_correct = record.is_correct();
        let mut outcome = AnswerOutcome {
            is_correct,
            exam_mode,
            ..AnswerOutcome::default()
        };
        if !is_correct {
            return Ok(outcome);
        }

        if exam_mode {
            outcome.already_correct = self
                .ledger
                .has_award(user_id, test_id, submission.question_id)
                .await?;
            return Ok(outcome);
        }

        let receipt = self
            .ledger
            .award_correct_answer(
                user_id,
                test_id,
                submission.question_id,
                submission.reward_rate,
            )
            .await?;
        if receipt.applied {
            outcome.awarded_xp = submission.reward_rate.xp;
            outcome.awarded_coins = submission.reward_rate.coins;
        } else {
            outcome.already_correct = true;
        }
        Ok(outcome)
    }

    async fn update_position(
        &self,
        user_id: UserId,
        test_id: TestId,
        update: PositionUpdate,
    ) -> Result<(), SyncError> {
        Ok(self
            .attempts
            .update_position(
                user_id,
                test_id,
                update.current_position,
                update.finished,
                self.clock.now(),
            )
            .await?)
    }

    async fn finish_attempt(
        &self,
        user_id: UserId,
        test_id: TestId,
        request: FinishRequest,
    ) -> Result<FinishOutcome, SyncError> {
        let attempt = self
            .attempts
            .get_attempt(user_id, test_id, AttemptStatus::Any)
            .await?
            .ok_or(SyncError::MissingAttempt { user_id, test_id })?;
        self.attempts
            .update_position(
                user_id,
                test_id,
                attempt.current_position(),
                true,
                self.clock.now(),
            )
            .await?;

        let awarded = self.completion_bonus(request);
        let event = AwardEvent::new(AwardReason::Completion { test_id }, awarded);

        let mut projected = self.ledger.get_account(user_id).await?;
        let newly_unlocked = projected.apply(&event, self.settings.milestones());
        let balance = self.ledger.credit(user_id, &event).await?;

        Ok(FinishOutcome {
            new_xp: balance.xp(),
            new_coins: balance.coins(),
            awarded,
            newly_unlocked,
        })
    }

    async fn fetch_account(&self, user_id: UserId) -> Result<AccountLedger, SyncError> {
        Ok(self.ledger.get_account(user_id).await?)
    }

    async fn fetch_entitlement(&self, user_id: UserId) -> Result<Entitlement, SyncError> {
        Ok(self
            .entitlements
            .get_entitlement(user_id)
            .await?
            .unwrap_or_else(|| Entitlement::free(self.settings.free_question_allowance())))
    }

    async fn consume_free_question(&self, user_id: UserId) -> Result<Entitlement, SyncError> {
        if self.entitlements.get_entitlement(user_id).await?.is_none() {
            let initial = Entitlement::free(self.settings.free_question_allowance());
            self.entitlements.save_entitlement(user_id, &initial).await?;
        }
        Ok(self.entitlements.consume_free_question(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AttemptOptions, Category, Question, QuestionId, Test};
    use exam_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::{ContentRepository, InMemoryRepository};

    fn build_test() -> Test {
        let questions = (1..=2)
            .map(|i| {
                Question::new(
                    QuestionId::new(i),
                    format!("Q{i}"),
                    vec!["a".into(), "b".into()],
                    0,
                )
                .unwrap()
            })
            .collect();
        Test::new(
            TestId::new(1),
            Category::new("networking").unwrap(),
            questions,
            RewardRate::new(10, 1),
        )
        .unwrap()
    }

    async fn setup(exam: bool) -> (StoreProgressSync, InMemoryRepository, Test) {
        let repo = InMemoryRepository::new();
        let test = build_test();
        repo.upsert_test(&test).await.unwrap();
        let options = if exam {
            AttemptOptions::exam()
        } else {
            AttemptOptions::practice()
        };
        let attempt = Attempt::generate(
            UserId::new(1),
            &test,
            options,
            &mut StdRng::seed_from_u64(1),
            fixed_now(),
        )
        .unwrap();
        repo.upsert_attempt(&attempt).await.unwrap();
        let storage = Storage::from_repository(repo.clone());
        let sync = StoreProgressSync::from_storage(
            Clock::fixed(fixed_now()),
            Arc::new(EngineSettings::default()),
            &storage,
        );
        (sync, repo, test)
    }

    fn submission(test: &Test, chosen: Option<usize>) -> AnswerSubmission {
        let question = &test.questions()[0];
        AnswerSubmission {
            test_id: test.id(),
            question_id: question.id(),
            correct_option_index: question.correct_option_index(),
            chosen_option_index: chosen,
            reward_rate: test.reward_rate(),
        }
    }

    #[tokio::test]
    async fn practice_correct_answer_is_rewarded_once() {
        let (sync, repo, test) = setup(false).await;
        let user = UserId::new(1);

        let first = sync
            .submit_answer(user, &submission(&test, Some(0)))
            .await
            .unwrap();
        assert!(first.is_correct);
        assert!(!first.already_correct);
        assert_eq!((first.awarded_xp, first.awarded_coins), (10, 1));

        let replay = sync
            .submit_answer(user, &submission(&test, Some(0)))
            .await
            .unwrap();
        assert!(replay.already_correct);
        assert_eq!(replay.awarded_xp, 0);
        assert_eq!(
            repo.get_account(user).await.unwrap(),
            AccountLedger::from_persisted(10, 1)
        );
    }

    #[tokio::test]
    async fn exam_answers_record_without_reward() {
        let (sync, repo, test) = setup(true).await;
        let user = UserId::new(1);

        let outcome = sync
            .submit_answer(user, &submission(&test, Some(0)))
            .await
            .unwrap();
        assert!(outcome.exam_mode);
        assert!(outcome.is_correct);
        assert_eq!(outcome.awarded_xp, 0);
        assert_eq!(repo.get_account(user).await.unwrap(), AccountLedger::default());

        let stored = repo
            .get_attempt(user, test.id(), AttemptStatus::Any)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.answers().len(), 1);
    }

    #[tokio::test]
    async fn submit_without_attempt_is_missing_attempt() {
        let (sync, _repo, test) = setup(false).await;
        let err = sync
            .submit_answer(UserId::new(2), &submission(&test, None))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingAttempt { .. }));
    }

    #[tokio::test]
    async fn finish_credits_bonus_and_reports_milestones() {
        let (sync, repo, test) = setup(false).await;
        let user = UserId::new(1);
        repo.credit(
            user,
            &AwardEvent::new(
                AwardReason::Completion { test_id: TestId::new(9) },
                RewardRate::new(95, 0),
            ),
        )
        .await
        .unwrap();

        let outcome = sync
            .finish_attempt(user, test.id(), FinishRequest { score: 2, total: 2 })
            .await
            .unwrap();
        assert_eq!(outcome.awarded, RewardRate::new(10, 10));
        assert_eq!(outcome.new_xp, 105);
        assert_eq!(outcome.new_coins, 10);
        assert_eq!(outcome.newly_unlocked, vec!["Bronze".to_string()]);

        let stored = repo
            .get_attempt(user, test.id(), AttemptStatus::Finished)
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn unknown_users_start_with_default_allowance() {
        let (sync, repo, _test) = setup(false).await;
        let user = UserId::new(5);

        let ent = sync.fetch_entitlement(user).await.unwrap();
        assert_eq!(ent.remaining_free_questions(), 20);
        assert!(repo.get_entitlement(user).await.unwrap().is_none());

        let after = sync.consume_free_question(user).await.unwrap();
        assert_eq!(after.remaining_free_questions(), 19);
    }
}
