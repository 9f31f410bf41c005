/// Free-tier allowance for one user, as tracked by the Entitlement Service.
///
/// Subscribed users are never limited; the counter is ignored for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlement {
    subscribed: bool,
    remaining_free_questions: u32,
}

impl Entitlement {
    #[must_use]
    pub fn subscribed() -> Self {
        Self {
            subscribed: true,
            remaining_free_questions: 0,
        }
    }

    #[must_use]
    pub fn free(remaining_free_questions: u32) -> Self {
        Self {
            subscribed: false,
            remaining_free_questions,
        }
    }

    #[must_use]
    pub fn from_persisted(subscribed: bool, remaining_free_questions: u32) -> Self {
        Self {
            subscribed,
            remaining_free_questions,
        }
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    #[must_use]
    pub fn remaining_free_questions(&self) -> u32 {
        self.remaining_free_questions
    }

    /// True when a gated action must be refused.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        !self.subscribed && self.remaining_free_questions == 0
    }

    /// Record one consumed question. Returns `false` for subscribed users.
    pub fn consume(&mut self) -> bool {
        if self.subscribed {
            return false;
        }
        self.remaining_free_questions = self.remaining_free_questions.saturating_sub(1);
        true
    }
}
