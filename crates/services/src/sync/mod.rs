//! Progress Synchronizer: the engine's narrow view of the Attempt Store,
//! Account Ledger and Entitlement Service.

mod store;
mod worker;

use async_trait::async_trait;
use exam_core::model::{
    AccountLedger, Attempt, AttemptStatus, Entitlement, QuestionId, RewardRate, TestId, UserId,
};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub use store::StoreProgressSync;
pub use worker::{SyncCommand, SyncEvent, SyncHandle};

/// A single answer (or skip) as reported to the Attempt Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub test_id: TestId,
    pub question_id: QuestionId,
    pub correct_option_index: usize,
    /// `None` records a skip.
    pub chosen_option_index: Option<usize>,
    pub reward_rate: RewardRate,
}

impl AnswerSubmission {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.chosen_option_index == Some(self.correct_option_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    /// The question had been rewarded before this submission.
    pub already_correct: bool,
    pub awarded_xp: u32,
    pub awarded_coins: u32,
    pub exam_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub current_position: usize,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishRequest {
    pub score: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FinishOutcome {
    pub new_xp: u64,
    pub new_coins: u64,
    /// Completion bonus credited by this call.
    pub awarded: RewardRate,
    pub newly_unlocked: Vec<String>,
}

/// Operations the session engine needs from its persistence collaborators.
///
/// Every write is idempotent: replaying an upsert or a submission for the same
/// question leaves the stores in the same state.
#[async_trait]
pub trait ProgressSync: Send + Sync {
    /// # Errors
    ///
    /// Returns `SyncError` if the Attempt Store cannot be reached.
    async fn fetch_attempt(
        &self,
        user_id: UserId,
        test_id: TestId,
        status: AttemptStatus,
    ) -> Result<Option<Attempt>, SyncError>;

    /// Full replace of the stored attempt.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the Attempt Store rejects the write.
    async fn upsert_attempt(&self, attempt: &Attempt) -> Result<(), SyncError>;

    /// Record one answer and, for a first correct practice answer, credit the ledger.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::MissingAttempt` if nothing is stored for the pair.
    async fn submit_answer(
        &self,
        user_id: UserId,
        submission: &AnswerSubmission,
    ) -> Result<AnswerOutcome, SyncError>;

    /// # Errors
    ///
    /// Returns `SyncError` if the Attempt Store rejects the write.
    async fn update_position(
        &self,
        user_id: UserId,
        test_id: TestId,
        update: PositionUpdate,
    ) -> Result<(), SyncError>;

    /// Mark the attempt finished and credit the completion bonus.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if either store rejects the write.
    async fn finish_attempt(
        &self,
        user_id: UserId,
        test_id: TestId,
        request: FinishRequest,
    ) -> Result<FinishOutcome, SyncError>;

    /// # Errors
    ///
    /// Returns `SyncError` if the Account Ledger cannot be reached.
    async fn fetch_account(&self, user_id: UserId) -> Result<AccountLedger, SyncError>;

    /// Users unknown to the Entitlement Service get the default free allowance.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the Entitlement Service cannot be reached.
    async fn fetch_entitlement(&self, user_id: UserId) -> Result<Entitlement, SyncError>;

    /// # Errors
    ///
    /// Returns `SyncError` if the Entitlement Service rejects the write.
    async fn consume_free_question(&self, user_id: UserId) -> Result<Entitlement, SyncError>;
}
