use std::sync::Arc;

use exam_core::model::{Category, EngineSettings, TestId, UserId};
use storage::repository::{ContentRepository, Storage};

use super::service::{LoadRequest, SessionContext, TestSession};
use crate::Clock;
use crate::error::SessionError;
use crate::sync::{ProgressSync, StoreProgressSync};

/// Opens `TestSession`s against a shared set of collaborators.
#[derive(Clone)]
pub struct ExamSessionService {
    ctx: SessionContext,
    rng_seed: Option<u64>,
}

impl ExamSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: Arc<EngineSettings>,
        content: Arc<dyn ContentRepository>,
        sync: Arc<dyn ProgressSync>,
    ) -> Self {
        Self {
            ctx: SessionContext {
                clock,
                settings,
                content,
                sync,
            },
            rng_seed: None,
        }
    }

    /// Wire the synchronizer straight to the storage repositories.
    #[must_use]
    pub fn from_storage(clock: Clock, settings: Arc<EngineSettings>, storage: &Storage) -> Self {
        let sync: Arc<dyn ProgressSync> = Arc::new(StoreProgressSync::from_storage(
            clock,
            Arc::clone(&settings),
            storage,
        ));
        Self::new(clock, settings, Arc::clone(&storage.content), sync)
    }

    #[must_use]
    pub fn with_sync(mut self, sync: Arc<dyn ProgressSync>) -> Self {
        self.ctx.sync = sync;
        self
    }

    /// Seed the ordering generator of every session opened afterwards.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.ctx.settings
    }

    /// A session in `Uninitialized`; call `TestSession::load` next.
    #[must_use]
    pub fn session(&self, user_id: UserId, category: Category, test_id: TestId) -> TestSession {
        let session = TestSession::new(user_id, category, test_id, self.ctx.clone());
        match self.rng_seed {
            Some(seed) => session.with_rng_seed(seed),
            None => session,
        }
    }

    /// Create and load a session in one step.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if loading fails.
    pub async fn open(
        &self,
        user_id: UserId,
        category: Category,
        test_id: TestId,
        request: LoadRequest,
    ) -> Result<TestSession, SessionError> {
        let mut session = self.session(user_id, category, test_id);
        session.load(request).await?;
        Ok(session)
    }
}
