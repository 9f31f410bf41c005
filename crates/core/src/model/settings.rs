use thiserror::Error;

use crate::model::ledger::Milestone;
use crate::scoring::GradeThresholds;

/// Free questions granted to an account the Entitlement Service has never seen.
pub const DEFAULT_FREE_QUESTIONS: u32 = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    grade_thresholds: GradeThresholds,
    free_question_allowance: u32,
    finish_xp_per_correct: u32,
    perfect_score_coins: u32,
    milestones: Vec<Milestone>,
}

#[derive(Clone, Debug, Default)]
pub struct EngineSettingsDraft {
    pub grade_thresholds: Option<GradeThresholds>,
    pub free_question_allowance: Option<u32>,
    pub finish_xp_per_correct: Option<u32>,
    pub perfect_score_coins: Option<u32>,
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("grade thresholds must be strictly descending and at most 100")]
    ThresholdsNotDescending,
    #[error("milestone label cannot be empty")]
    EmptyMilestoneLabel,
    #[error("milestones must have strictly increasing xp")]
    MilestonesNotAscending,
}

impl EngineSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft into engine settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if thresholds overlap or milestones are malformed.
    pub fn validate(self) -> Result<EngineSettings, SettingsError> {
        let grade_thresholds = self.grade_thresholds.unwrap_or_default();
        if !grade_thresholds.is_descending() {
            return Err(SettingsError::ThresholdsNotDescending);
        }

        let mut milestones = Vec::with_capacity(self.milestones.len());
        for milestone in self.milestones {
            let label = milestone.label.trim().to_string();
            if label.is_empty() {
                return Err(SettingsError::EmptyMilestoneLabel);
            }
            if milestones
                .last()
                .is_some_and(|prev: &Milestone| prev.xp >= milestone.xp)
            {
                return Err(SettingsError::MilestonesNotAscending);
            }
            milestones.push(Milestone::new(label, milestone.xp));
        }

        Ok(EngineSettings {
            grade_thresholds,
            free_question_allowance: self
                .free_question_allowance
                .unwrap_or(DEFAULT_FREE_QUESTIONS),
            finish_xp_per_correct: self.finish_xp_per_correct.unwrap_or(5),
            perfect_score_coins: self.perfect_score_coins.unwrap_or(10),
            milestones,
        })
    }
}

impl EngineSettings {
    #[must_use]
    pub fn grade_thresholds(&self) -> &GradeThresholds {
        &self.grade_thresholds
    }

    #[must_use]
    pub fn free_question_allowance(&self) -> u32 {
        self.free_question_allowance
    }

    /// XP credited per correct answer when an attempt is finished.
    #[must_use]
    pub fn finish_xp_per_correct(&self) -> u32 {
        self.finish_xp_per_correct
    }

    /// Coins credited when every selected question was answered correctly.
    #[must_use]
    pub fn perfect_score_coins(&self) -> u32 {
        self.perfect_score_coins
    }

    #[must_use]
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            grade_thresholds: GradeThresholds::default(),
            free_question_allowance: DEFAULT_FREE_QUESTIONS,
            finish_xp_per_correct: 5,
            perfect_score_coins: 10,
            milestones: vec![
                Milestone::new("Bronze", 100),
                Milestone::new("Silver", 500),
                Milestone::new("Gold", 2_000),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_rejects_overlapping_thresholds() {
        let draft = EngineSettingsDraft {
            grade_thresholds: Some(GradeThresholds {
                highest: 90,
                high: 90,
                mid_high: 70,
                mid: 60,
            }),
            ..EngineSettingsDraft::new()
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            SettingsError::ThresholdsNotDescending
        );
    }

    #[test]
    fn draft_trims_and_orders_milestones() {
        let draft = EngineSettingsDraft {
            milestones: vec![Milestone::new(" Bronze ", 10), Milestone::new("Silver", 5)],
            ..EngineSettingsDraft::new()
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            SettingsError::MilestonesNotAscending
        );

        let settings = EngineSettingsDraft {
            milestones: vec![Milestone::new(" Bronze ", 10)],
            free_question_allowance: Some(3),
            ..EngineSettingsDraft::new()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.milestones()[0].label, "Bronze");
        assert_eq!(settings.free_question_allowance(), 3);
    }
}
