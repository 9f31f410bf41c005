use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{
    AccountLedger, AnswerRecord, Attempt, AttemptStatus, AwardEvent, AwardReason, Category,
    Entitlement, QuestionId, RewardRate, Test, TestId, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Outcome of a once-per-question ledger credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardReceipt {
    /// False when the question had already been rewarded for this user.
    pub applied: bool,
    pub balance: AccountLedger,
}

/// Read side of the Content Store.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Persist or replace a test and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the test cannot be stored.
    async fn upsert_test(&self, test: &Test) -> Result<(), StorageError>;

    /// Fetch a test by category and id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing test is `Ok(None)`.
    async fn get_test(&self, category: &Category, id: TestId)
    -> Result<Option<Test>, StorageError>;
}

/// Attempt Store: one attempt per (user, test), last write wins.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Fetch the attempt for `(user_id, test_id)` if its finished flag matches `status`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or unreadable rows.
    async fn get_attempt(
        &self,
        user_id: UserId,
        test_id: TestId,
        status: AttemptStatus,
    ) -> Result<Option<Attempt>, StorageError>;

    /// Replace the stored attempt wholesale.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn upsert_attempt(&self, attempt: &Attempt) -> Result<(), StorageError>;

    /// Insert or replace a single answer record on the stored attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no attempt exists.
    async fn record_answer(
        &self,
        user_id: UserId,
        test_id: TestId,
        record: &AnswerRecord,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Update position and finished flag. A finished attempt is never reopened.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no attempt exists, or
    /// `StorageError::Serialization` if the position is outside the selection.
    async fn update_position(
        &self,
        user_id: UserId,
        test_id: TestId,
        position: usize,
        finished: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// Account Ledger: XP/coin balances plus the set of already-rewarded questions.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Current balance; accounts never credited have a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_account(&self, user_id: UserId) -> Result<AccountLedger, StorageError>;

    /// Whether `question_id` has already been rewarded for this user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn has_award(
        &self,
        user_id: UserId,
        test_id: TestId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError>;

    /// Credit `amount` unless this question was rewarded before.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn award_correct_answer(
        &self,
        user_id: UserId,
        test_id: TestId,
        question_id: QuestionId,
        amount: RewardRate,
    ) -> Result<AwardReceipt, StorageError>;

    /// Unconditionally apply `event` and return the new balance.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn credit(
        &self,
        user_id: UserId,
        event: &AwardEvent,
    ) -> Result<AccountLedger, StorageError>;
}

/// Entitlement Service: subscription flag and free-question counter.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; unknown users are `Ok(None)`.
    async fn get_entitlement(&self, user_id: UserId)
    -> Result<Option<Entitlement>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the entitlement cannot be stored.
    async fn save_entitlement(
        &self,
        user_id: UserId,
        entitlement: &Entitlement,
    ) -> Result<(), StorageError>;

    /// Decrement the free counter (floored at zero) and return the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user has no entitlement record.
    async fn consume_free_question(&self, user_id: UserId) -> Result<Entitlement, StorageError>;
}

type AwardKey = (UserId, TestId, QuestionId);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tests: Arc<Mutex<HashMap<(Category, TestId), Test>>>,
    attempts: Arc<Mutex<HashMap<(UserId, TestId), Attempt>>>,
    accounts: Arc<Mutex<HashMap<UserId, AccountLedger>>>,
    awards: Arc<Mutex<HashSet<AwardKey>>>,
    entitlements: Arc<Mutex<HashMap<UserId, Entitlement>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn upsert_test(&self, test: &Test) -> Result<(), StorageError> {
        let mut guard = self.tests.lock().map_err(poisoned)?;
        guard.insert((test.category().clone(), test.id()), test.clone());
        Ok(())
    }

    async fn get_test(
        &self,
        category: &Category,
        id: TestId,
    ) -> Result<Option<Test>, StorageError> {
        let guard = self.tests.lock().map_err(poisoned)?;
        Ok(guard.get(&(category.clone(), id)).cloned())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn get_attempt(
        &self,
        user_id: UserId,
        test_id: TestId,
        status: AttemptStatus,
    ) -> Result<Option<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard
            .get(&(user_id, test_id))
            .filter(|a| status.matches(a.is_finished()))
            .cloned())
    }

    async fn upsert_attempt(&self, attempt: &Attempt) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        guard.insert((attempt.user_id(), attempt.test_id()), attempt.clone());
        Ok(())
    }

    async fn record_answer(
        &self,
        user_id: UserId,
        test_id: TestId,
        record: &AnswerRecord,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let attempt = guard
            .get_mut(&(user_id, test_id))
            .ok_or(StorageError::NotFound)?;
        attempt.upsert_answer(*record);
        attempt.touch(at);
        Ok(())
    }

    async fn update_position(
        &self,
        user_id: UserId,
        test_id: TestId,
        position: usize,
        finished: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let attempt = guard
            .get_mut(&(user_id, test_id))
            .ok_or(StorageError::NotFound)?;
        attempt
            .set_position(position)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        if finished {
            attempt.mark_finished();
        }
        attempt.touch(at);
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for InMemoryRepository {
    async fn get_account(&self, user_id: UserId) -> Result<AccountLedger, StorageError> {
        let guard = self.accounts.lock().map_err(poisoned)?;
        Ok(guard.get(&user_id).copied().unwrap_or_default())
    }

    async fn has_award(
        &self,
        user_id: UserId,
        test_id: TestId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError> {
        let guard = self.awards.lock().map_err(poisoned)?;
        Ok(guard.contains(&(user_id, test_id, question_id)))
    }

    async fn award_correct_answer(
        &self,
        user_id: UserId,
        test_id: TestId,
        question_id: QuestionId,
        amount: RewardRate,
    ) -> Result<AwardReceipt, StorageError> {
        let mut awards = self.awards.lock().map_err(poisoned)?;
        let mut accounts = self.accounts.lock().map_err(poisoned)?;
        let balance = accounts.entry(user_id).or_default();
        if !awards.insert((user_id, test_id, question_id)) {
            return Ok(AwardReceipt {
                applied: false,
                balance: *balance,
            });
        }
        let event = AwardEvent::new(
            AwardReason::CorrectAnswer {
                test_id,
                question_id,
            },
            amount,
        );
        balance.apply(&event, &[]);
        Ok(AwardReceipt {
            applied: true,
            balance: *balance,
        })
    }

    async fn credit(
        &self,
        user_id: UserId,
        event: &AwardEvent,
    ) -> Result<AccountLedger, StorageError> {
        let mut guard = self.accounts.lock().map_err(poisoned)?;
        let balance = guard.entry(user_id).or_default();
        balance.apply(event, &[]);
        Ok(*balance)
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryRepository {
    async fn get_entitlement(
        &self,
        user_id: UserId,
    ) -> Result<Option<Entitlement>, StorageError> {
        let guard = self.entitlements.lock().map_err(poisoned)?;
        Ok(guard.get(&user_id).copied())
    }

    async fn save_entitlement(
        &self,
        user_id: UserId,
        entitlement: &Entitlement,
    ) -> Result<(), StorageError> {
        let mut guard = self.entitlements.lock().map_err(poisoned)?;
        guard.insert(user_id, *entitlement);
        Ok(())
    }

    async fn consume_free_question(&self, user_id: UserId) -> Result<Entitlement, StorageError> {
        let mut guard = self.entitlements.lock().map_err(poisoned)?;
        let entitlement = guard.get_mut(&user_id).ok_or(StorageError::NotFound)?;
        entitlement.consume();
        Ok(*entitlement)
    }
}

/// Aggregates the collaborator repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub entitlements: Arc<dyn EntitlementRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Share one in-memory repository across every collaborator.
    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        Self {
            content: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            ledger: Arc::new(repo.clone()),
            entitlements: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AttemptOptions, Question};
    use exam_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build_test() -> Test {
        let questions = (1..=3)
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
            Category::new("net").unwrap(),
            questions,
            RewardRate::new(10, 1),
        )
        .unwrap()
    }

    fn build_attempt(test: &Test) -> Attempt {
        let mut rng = StdRng::seed_from_u64(5);
        Attempt::generate(
            UserId::new(1),
            test,
            AttemptOptions::practice(),
            &mut rng,
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn attempt_status_filter_hides_finished() {
        let repo = InMemoryRepository::new();
        let test = build_test();
        let attempt = build_attempt(&test);
        repo.upsert_attempt(&attempt).await.unwrap();

        repo.update_position(UserId::new(1), test.id(), 2, true, fixed_now())
            .await
            .unwrap();

        let unfinished = repo
            .get_attempt(UserId::new(1), test.id(), AttemptStatus::Unfinished)
            .await
            .unwrap();
        assert!(unfinished.is_none());

        let finished = repo
            .get_attempt(UserId::new(1), test.id(), AttemptStatus::Finished)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(finished.current_position(), 2);
        assert_eq!(finished.presentation_order(), attempt.presentation_order());
    }

    #[tokio::test]
    async fn record_answer_requires_existing_attempt() {
        let repo = InMemoryRepository::new();
        let test = build_test();
        let record = AnswerRecord::skipped(&test.questions()[0]);

        let err = repo
            .record_answer(UserId::new(1), test.id(), &record, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn award_is_applied_once_per_question() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);

        let first = repo
            .award_correct_answer(user, TestId::new(1), QuestionId::new(2), RewardRate::new(10, 1))
            .await
            .unwrap();
        let second = repo
            .award_correct_answer(user, TestId::new(1), QuestionId::new(2), RewardRate::new(10, 1))
            .await
            .unwrap();

        assert!(first.applied);
        assert!(!second.applied);
        assert_eq!(second.balance.xp(), 10);
        assert!(repo.has_award(user, TestId::new(1), QuestionId::new(2)).await.unwrap());

        let event = AwardEvent::new(
            AwardReason::Completion {
                test_id: TestId::new(1),
            },
            RewardRate::new(5, 0),
        );
        let balance = repo.credit(user, &event).await.unwrap();
        assert_eq!(balance.xp(), 15);
        assert_eq!(balance.coins(), 1);
    }

    #[tokio::test]
    async fn consume_free_question_floors_at_zero() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(3);
        repo.save_entitlement(user, &Entitlement::free(1)).await.unwrap();

        let after = repo.consume_free_question(user).await.unwrap();
        assert_eq!(after.remaining_free_questions(), 0);
        let after = repo.consume_free_question(user).await.unwrap();
        assert_eq!(after.remaining_free_questions(), 0);
    }

    #[tokio::test]
    async fn content_round_trips_by_category() {
        let storage = Storage::in_memory();
        let test = build_test();
        storage.content.upsert_test(&test).await.unwrap();

        let found = storage
            .content
            .get_test(test.category(), test.id())
            .await
            .unwrap();
        assert_eq!(found, Some(test.clone()));

        let other = Category::new("other").unwrap();
        assert!(storage.content.get_test(&other, test.id()).await.unwrap().is_none());
    }
}
