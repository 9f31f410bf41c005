use exam_core::model::Entitlement;

use crate::error::GuardRejection;

/// Free-tier check wrapped around answer and skip transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionLimitGate {
    entitlement: Entitlement,
}

impl QuestionLimitGate {
    #[must_use]
    pub fn new(entitlement: Entitlement) -> Self {
        Self { entitlement }
    }

    /// # Errors
    ///
    /// Returns `GuardRejection::LimitReached` when a free-tier user has no questions left.
    pub fn check(&self) -> Result<(), GuardRejection> {
        if self.entitlement.is_exhausted() {
            return Err(GuardRejection::LimitReached);
        }
        Ok(())
    }

    /// Count one consumed action. Returns false for subscribers, who are never charged.
    pub fn record_consumed(&mut self) -> bool {
        self.entitlement.consume()
    }

    /// `None` for subscribers.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        (!self.entitlement.is_subscribed()).then(|| self.entitlement.remaining_free_questions())
    }

    #[must_use]
    pub fn entitlement(&self) -> Entitlement {
        self.entitlement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_free_question_then_rejects() {
        let mut gate = QuestionLimitGate::new(Entitlement::free(1));
        assert!(gate.check().is_ok());
        assert!(gate.record_consumed());
        assert_eq!(gate.remaining(), Some(0));
        assert_eq!(gate.check(), Err(GuardRejection::LimitReached));
    }

    #[test]
    fn subscribers_bypass() {
        let mut gate = QuestionLimitGate::new(Entitlement::subscribed());
        for _ in 0..3 {
            assert!(gate.check().is_ok());
            assert!(!gate.record_consumed());
        }
        assert_eq!(gate.remaining(), None);
    }
}
