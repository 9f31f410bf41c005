use exam_core::scoring::{ReviewFilter, ScoreReport};

use crate::error::NotFoundReason;

/// Why a load ended in `SessionState::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    NotFound(NotFoundReason),
    /// A synchronizer call failed while loading.
    Sync,
    /// The Content Store could not be read.
    Storage,
    /// The stored attempt violates its own invariants.
    InvalidAttempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Loading,
    Active {
        exam_mode: bool,
    },
    Finished(ScoreReport),
    Reviewing {
        report: ScoreReport,
        filter: ReviewFilter,
    },
    Error(LoadFailure),
}

impl SessionState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Loading => "loading",
            SessionState::Active { exam_mode: false } => "active (practice)",
            SessionState::Active { exam_mode: true } => "active (exam)",
            SessionState::Finished(_) => "finished",
            SessionState::Reviewing { .. } => "reviewing",
            SessionState::Error(_) => "error",
        }
    }

    #[must_use]
    pub fn report(&self) -> Option<ScoreReport> {
        match self {
            SessionState::Finished(report) | SessionState::Reviewing { report, .. } => {
                Some(*report)
            }
            _ => None,
        }
    }
}
