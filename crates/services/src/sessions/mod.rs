mod gate;
mod progress;
mod service;
mod state;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use gate::QuestionLimitGate;
pub use progress::SessionProgress;
pub use service::{LoadRequest, SelectOutcome, SessionContext, Step, TestSession};
pub use state::{LoadFailure, SessionState};
pub use view::{Feedback, QuestionView};
pub use workflow::ExamSessionService;
