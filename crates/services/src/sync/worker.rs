use std::sync::Arc;

use exam_core::model::{Attempt, AwardEvent, AwardReason, RewardRate, TestId, UserId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{AnswerSubmission, FinishOutcome, FinishRequest, PositionUpdate, ProgressSync};
use crate::error::SyncError;

/// A queued write. Commands are applied one at a time, in send order.
#[derive(Debug)]
pub enum SyncCommand {
    Upsert(Attempt),
    SubmitAnswer {
        user_id: UserId,
        submission: AnswerSubmission,
    },
    UpdatePosition {
        user_id: UserId,
        test_id: TestId,
        update: PositionUpdate,
    },
    Finish {
        user_id: UserId,
        test_id: TestId,
        request: FinishRequest,
    },
    ConsumeFreeQuestion {
        user_id: UserId,
    },
    Flush(oneshot::Sender<()>),
}

impl SyncCommand {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            SyncCommand::Upsert(_) => "upsert_attempt",
            SyncCommand::SubmitAnswer { .. } => "submit_answer",
            SyncCommand::UpdatePosition { .. } => "update_position",
            SyncCommand::Finish { .. } => "finish_attempt",
            SyncCommand::ConsumeFreeQuestion { .. } => "consume_free_question",
            SyncCommand::Flush(_) => "flush",
        }
    }
}

/// Results the worker reports back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Award(AwardEvent),
    Finished(FinishOutcome),
}

/// Session-side end of the background sync worker.
///
/// Sends never block. A write that the collaborator rejects is logged and
/// dropped by the worker; the caller only hears about a worker that is gone.
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
}

impl SyncHandle {
    /// Spawn the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(sync: Arc<dyn ProgressSync>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(sync, rx, event_tx));
        Self { commands, events }
    }

    /// Queue `command` behind everything sent before it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Closed` if the worker task has stopped.
    pub fn send(&self, command: SyncCommand) -> Result<(), SyncError> {
        self.commands.send(command).map_err(|_| SyncError::Closed)
    }

    /// Wait until every command sent so far has been applied or dropped.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Closed` if the worker stopped before reaching the barrier.
    pub async fn flush(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.send(SyncCommand::Flush(tx))?;
        rx.await.map_err(|_| SyncError::Closed)
    }

    /// Results that arrived since the last call.
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Let queued writes finish in the background without waiting for them.
    pub fn detach(self) {
        drop(self.commands);
    }
}

async fn run_worker(
    sync: Arc<dyn ProgressSync>,
    mut commands: mpsc::UnboundedReceiver<SyncCommand>,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    while let Some(command) = commands.recv().await {
        let label = command.label();
        match apply(sync.as_ref(), command).await {
            Ok(Some(event)) => {
                // The session may already be gone; nothing left to inform.
                let _ = events.send(event);
            }
            Ok(None) => debug!(command = label, "sync command applied"),
            Err(err) => warn!(command = label, %err, "sync write failed; keeping local state"),
        }
    }
    debug!("sync worker drained");
}

async fn apply(
    sync: &dyn ProgressSync,
    command: SyncCommand,
) -> Result<Option<SyncEvent>, SyncError> {
    match command {
        SyncCommand::Upsert(attempt) => {
            sync.upsert_attempt(&attempt).await?;
            Ok(None)
        }
        SyncCommand::SubmitAnswer {
            user_id,
            submission,
        } => {
            let outcome = sync.submit_answer(user_id, &submission).await?;
            let amount = RewardRate::new(outcome.awarded_xp, outcome.awarded_coins);
            if amount.is_zero() {
                return Ok(None);
            }
            Ok(Some(SyncEvent::Award(AwardEvent::new(
                AwardReason::CorrectAnswer {
                    test_id: submission.test_id,
                    question_id: submission.question_id,
                },
                amount,
            ))))
        }
        SyncCommand::UpdatePosition {
            user_id,
            test_id,
            update,
        } => {
            sync.update_position(user_id, test_id, update).await?;
            Ok(None)
        }
        SyncCommand::Finish {
            user_id,
            test_id,
            request,
        } => {
            let outcome = sync.finish_attempt(user_id, test_id, request).await?;
            Ok(Some(SyncEvent::Finished(outcome)))
        }
        SyncCommand::ConsumeFreeQuestion { user_id } => {
            let remaining = sync.consume_free_question(user_id).await?;
            debug!(
                %user_id,
                remaining = remaining.remaining_free_questions(),
                "free question consumed"
            );
            Ok(None)
        }
        SyncCommand::Flush(done) => {
            let _ = done.send(());
            Ok(None)
        }
    }
}
