mod attempt;
mod entitlement;
mod flags;
mod ids;
mod ledger;
mod question;
mod settings;

pub use ids::{ParseIdError, QuestionId, TestId, UserId};

pub use attempt::{
    AnswerRecord, Attempt, AttemptError, AttemptOptions, AttemptParts, AttemptStatus,
};
pub use entitlement::Entitlement;
pub use flags::FlaggedSet;
pub use ledger::{AccountLedger, AwardEvent, AwardReason, Milestone, RewardRate};
pub use question::{Category, Question, QuestionError, Test, TestError};
pub use settings::{DEFAULT_FREE_QUESTIONS, EngineSettings, EngineSettingsDraft, SettingsError};
