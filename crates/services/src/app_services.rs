use std::sync::Arc;

use exam_core::model::EngineSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::config::EngineConfig;
use crate::error::ExamServicesError;
use crate::sessions::ExamSessionService;
use crate::sync::{ProgressSync, StoreProgressSync};

/// Assembles host-facing services over one storage backend.
#[derive(Clone)]
pub struct ExamServices {
    storage: Storage,
    settings: Arc<EngineSettings>,
    sync: Arc<dyn ProgressSync>,
    sessions: Arc<ExamSessionService>,
}

impl ExamServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: &EngineConfig, clock: Clock) -> Result<Self, ExamServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        Ok(Self::from_storage(storage, config.settings.clone(), clock))
    }

    /// Build services from the `EXAM_*` environment.
    ///
    /// # Errors
    ///
    /// Returns `ExamServicesError` if configuration or storage initialization fails.
    pub async fn from_env(clock: Clock) -> Result<Self, ExamServicesError> {
        let config = EngineConfig::from_env()?;
        Self::new_sqlite(&config, clock).await
    }

    #[must_use]
    pub fn in_memory(settings: EngineSettings, clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), settings, clock)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, settings: EngineSettings, clock: Clock) -> Self {
        let settings = Arc::new(settings);
        let sync: Arc<dyn ProgressSync> = Arc::new(StoreProgressSync::from_storage(
            clock,
            Arc::clone(&settings),
            &storage,
        ));
        let sessions = Arc::new(ExamSessionService::new(
            clock,
            Arc::clone(&settings),
            Arc::clone(&storage.content),
            Arc::clone(&sync),
        ));
        Self {
            storage,
            settings,
            sync,
            sessions,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn settings(&self) -> Arc<EngineSettings> {
        Arc::clone(&self.settings)
    }

    #[must_use]
    pub fn progress_sync(&self) -> Arc<dyn ProgressSync> {
        Arc::clone(&self.sync)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        AttemptOptions, Category, Question, QuestionId, RewardRate, Test, TestId, UserId,
    };
    use exam_core::time::fixed_now;
    use storage::repository::ContentRepository;

    use crate::sessions::{LoadRequest, SessionState};

    #[tokio::test]
    async fn in_memory_services_open_a_restarted_session() {
        let services =
            ExamServices::in_memory(EngineSettings::default(), Clock::fixed(fixed_now()));
        let question =
            Question::new(QuestionId::new(1), "Q1", vec!["a".into(), "b".into()], 1).unwrap();
        let test = Test::new(
            TestId::new(1),
            Category::new("net").unwrap(),
            vec![question],
            RewardRate::ZERO,
        )
        .unwrap();
        services.storage().content.upsert_test(&test).await.unwrap();

        let session = services
            .sessions()
            .open(
                UserId::new(1),
                test.category().clone(),
                test.id(),
                LoadRequest::restart(AttemptOptions::practice()),
            )
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Active { exam_mode: false });
        session.close();
    }
}
