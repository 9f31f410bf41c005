use std::env;

use exam_core::model::{EngineSettings, EngineSettingsDraft};
use exam_core::scoring::GradeThresholds;

use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite:exam.sqlite3?mode=rwc";

/// Engine configuration assembled from `EXAM_*` environment variables.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub db_url: String,
    pub settings: EngineSettings,
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_url = match lookup("EXAM_DB_URL") {
            Some(url) if url.trim().is_empty() => {
                return Err(ConfigError::Empty { var: "EXAM_DB_URL" });
            }
            Some(url) => url,
            None => DEFAULT_DB_URL.into(),
        };

        let draft = EngineSettingsDraft {
            grade_thresholds: lookup("EXAM_GRADE_THRESHOLDS")
                .map(|raw| parse_thresholds("EXAM_GRADE_THRESHOLDS", &raw))
                .transpose()?,
            free_question_allowance: parse_u32(&lookup, "EXAM_FREE_QUESTIONS")?,
            finish_xp_per_correct: parse_u32(&lookup, "EXAM_FINISH_XP_PER_CORRECT")?,
            perfect_score_coins: parse_u32(&lookup, "EXAM_PERFECT_COINS")?,
            milestones: EngineSettings::default().milestones().to_vec(),
        };

        Ok(Self {
            db_url,
            settings: draft.validate()?,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.into(),
            settings: EngineSettings::default(),
        }
    }
}

fn parse_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u32>, ConfigError> {
    lookup(var)
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber { var, raw })
        })
        .transpose()
}

/// `"90,80,70,60"` → highest, high, mid-high, mid.
fn parse_thresholds(var: &'static str, raw: &str) -> Result<GradeThresholds, ConfigError> {
    let invalid = || ConfigError::InvalidThresholds {
        var,
        raw: raw.to_string(),
    };
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let [highest, high, mid_high, mid] = values.as_slice() else {
        return Err(invalid());
    };
    Ok(GradeThresholds {
        highest: *highest,
        high: *high,
        mid_high: *mid_high,
        mid: *mid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.settings, EngineSettings::default());
    }

    #[test]
    fn reads_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("EXAM_DB_URL", "sqlite::memory:"),
            ("EXAM_FREE_QUESTIONS", " 3 "),
            ("EXAM_GRADE_THRESHOLDS", "95, 85, 75, 65"),
        ]))
        .unwrap();
        assert_eq!(config.db_url, "sqlite::memory:");
        assert_eq!(config.settings.free_question_allowance(), 3);
        assert_eq!(config.settings.grade_thresholds().highest, 95);
        assert_eq!(config.settings.grade_thresholds().mid, 65);
    }

    #[test]
    fn rejects_bad_values() {
        let err = EngineConfig::from_lookup(lookup(&[("EXAM_PERFECT_COINS", "-1")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: "EXAM_PERFECT_COINS",
                ..
            }
        ));

        let err =
            EngineConfig::from_lookup(lookup(&[("EXAM_GRADE_THRESHOLDS", "90,80")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThresholds { .. }));

        let err = EngineConfig::from_lookup(lookup(&[("EXAM_GRADE_THRESHOLDS", "60,70,80,90")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
    }
}
