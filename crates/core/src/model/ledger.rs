use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, TestId};

//
// ─── REWARD RATE ──────────────────────────────────────────────────────────────
//

/// XP and coins granted per unit of reward (one correct answer, one bonus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardRate {
    pub xp: u32,
    pub coins: u32,
}

impl RewardRate {
    pub const ZERO: Self = Self { xp: 0, coins: 0 };

    #[must_use]
    pub fn new(xp: u32, coins: u32) -> Self {
        Self { xp, coins }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.xp == 0 && self.coins == 0
    }

    /// Multiply by a count, saturating instead of overflowing.
    #[must_use]
    pub fn times(&self, count: u32) -> Self {
        Self {
            xp: self.xp.saturating_mul(count),
            coins: self.coins.saturating_mul(count),
        }
    }
}

//
// ─── AWARD EVENTS ─────────────────────────────────────────────────────────────
//

/// Why the ledger was credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwardReason {
    /// First correct answer to a question in practice mode.
    CorrectAnswer {
        test_id: TestId,
        question_id: QuestionId,
    },
    /// Bonus granted when an attempt is finished.
    Completion { test_id: TestId },
}

/// A discrete credit applied to an `AccountLedger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardEvent {
    pub reason: AwardReason,
    pub amount: RewardRate,
}

impl AwardEvent {
    #[must_use]
    pub fn new(reason: AwardReason, amount: RewardRate) -> Self {
        Self { reason, amount }
    }
}

//
// ─── MILESTONES ───────────────────────────────────────────────────────────────
//

/// XP threshold that unlocks a named reward once crossed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub label: String,
    pub xp: u64,
}

impl Milestone {
    #[must_use]
    pub fn new(label: impl Into<String>, xp: u64) -> Self {
        Self {
            label: label.into(),
            xp,
        }
    }
}

//
// ─── ACCOUNT LEDGER ───────────────────────────────────────────────────────────
//

/// Running XP/coin balance for one account.
///
/// Only ever changed through `apply`, one award event at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountLedger {
    xp: u64,
    coins: u64,
}

impl AccountLedger {
    #[must_use]
    pub fn from_persisted(xp: u64, coins: u64) -> Self {
        Self { xp, coins }
    }

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    #[must_use]
    pub fn coins(&self) -> u64 {
        self.coins
    }

    /// Credit the ledger and return the labels of milestones crossed by this event.
    pub fn apply(&mut self, event: &AwardEvent, milestones: &[Milestone]) -> Vec<String> {
        let before = self.xp;
        self.xp = self.xp.saturating_add(u64::from(event.amount.xp));
        self.coins = self.coins.saturating_add(u64::from(event.amount.coins));

        milestones
            .iter()
            .filter(|m| before < m.xp && self.xp >= m.xp)
            .map(|m| m.label.clone())
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(xp: u32, coins: u32) -> AwardEvent {
        AwardEvent::new(
            AwardReason::Completion {
                test_id: TestId::new(1),
            },
            RewardRate::new(xp, coins),
        )
    }

    #[test]
    fn apply_credits_balance() {
        let mut ledger = AccountLedger::default();
        ledger.apply(&completion(10, 2), &[]);
        ledger.apply(&completion(5, 1), &[]);
        assert_eq!(ledger.xp(), 15);
        assert_eq!(ledger.coins(), 3);
    }

    #[test]
    fn apply_reports_only_newly_crossed_milestones() {
        let milestones = vec![Milestone::new("bronze", 10), Milestone::new("silver", 50)];
        let mut ledger = AccountLedger::from_persisted(8, 0);

        let unlocked = ledger.apply(&completion(5, 0), &milestones);
        assert_eq!(unlocked, vec!["bronze".to_string()]);

        let unlocked = ledger.apply(&completion(5, 0), &milestones);
        assert!(unlocked.is_empty());
    }

    #[test]
    fn reward_rate_times_saturates() {
        let rate = RewardRate::new(u32::MAX, 1);
        assert_eq!(rate.times(2), RewardRate::new(u32::MAX, 2));
    }
}
