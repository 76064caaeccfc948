use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adaptive::AdaptiveConfig;
use crate::pool::DEFAULT_MIN_POOL_SIZE;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("upgrade threshold must be > 0")]
    InvalidUpgradeThreshold,

    #[error("downgrade threshold must be > 0")]
    InvalidDowngradeThreshold,

    #[error("minimum pool size must be > 0")]
    InvalidMinPoolSize,
}

/// Tunables for a practice session.
///
/// The mastery weights and the completion gates are fixed constants and
/// deliberately absent here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PracticeSettings {
    upgrade_threshold: u32,
    downgrade_threshold: u32,
    min_pool_size: usize,
    personalization: bool,
    confidence_weighting: bool,
}

/// Unvalidated settings, typically deserialized from a config file.
///
/// Missing fields fall back to the defaults of `PracticeSettings::default()`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PracticeSettingsDraft {
    pub upgrade_threshold: Option<u32>,
    pub downgrade_threshold: Option<u32>,
    pub min_pool_size: Option<usize>,
    pub personalization: Option<bool>,
    pub confidence_weighting: Option<bool>,
}

impl PracticeSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft into settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a threshold or the minimum pool size is zero.
    pub fn validate(self) -> Result<PracticeSettings, SettingsError> {
        let defaults = PracticeSettings::default();
        let upgrade_threshold = self.upgrade_threshold.unwrap_or(defaults.upgrade_threshold);
        let downgrade_threshold = self
            .downgrade_threshold
            .unwrap_or(defaults.downgrade_threshold);
        let min_pool_size = self.min_pool_size.unwrap_or(defaults.min_pool_size);

        if upgrade_threshold == 0 {
            return Err(SettingsError::InvalidUpgradeThreshold);
        }
        if downgrade_threshold == 0 {
            return Err(SettingsError::InvalidDowngradeThreshold);
        }
        if min_pool_size == 0 {
            return Err(SettingsError::InvalidMinPoolSize);
        }

        Ok(PracticeSettings {
            upgrade_threshold,
            downgrade_threshold,
            min_pool_size,
            personalization: self.personalization.unwrap_or(defaults.personalization),
            confidence_weighting: self
                .confidence_weighting
                .unwrap_or(defaults.confidence_weighting),
        })
    }
}

impl PracticeSettings {
    #[must_use]
    pub fn upgrade_threshold(&self) -> u32 {
        self.upgrade_threshold
    }

    #[must_use]
    pub fn downgrade_threshold(&self) -> u32 {
        self.downgrade_threshold
    }

    #[must_use]
    pub fn min_pool_size(&self) -> usize {
        self.min_pool_size
    }

    #[must_use]
    pub fn personalization(&self) -> bool {
        self.personalization
    }

    #[must_use]
    pub fn confidence_weighting(&self) -> bool {
        self.confidence_weighting
    }

    /// Base thresholds for the adaptive difficulty engine.
    #[must_use]
    pub fn adaptive_config(&self) -> AdaptiveConfig {
        AdaptiveConfig {
            upgrade_threshold: self.upgrade_threshold,
            downgrade_threshold: self.downgrade_threshold,
        }
    }
}

impl Default for PracticeSettings {
    fn default() -> Self {
        let adaptive = AdaptiveConfig::default();
        Self {
            upgrade_threshold: adaptive.upgrade_threshold,
            downgrade_threshold: adaptive.downgrade_threshold,
            min_pool_size: DEFAULT_MIN_POOL_SIZE,
            personalization: true,
            confidence_weighting: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_yields_defaults() {
        let settings = PracticeSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, PracticeSettings::default());
        assert_eq!(settings.upgrade_threshold(), 3);
        assert_eq!(settings.downgrade_threshold(), 2);
        assert_eq!(settings.min_pool_size(), 2);
    }

    #[test]
    fn zero_values_are_rejected() {
        let draft = PracticeSettingsDraft {
            upgrade_threshold: Some(0),
            ..PracticeSettingsDraft::default()
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            SettingsError::InvalidUpgradeThreshold
        );

        let draft = PracticeSettingsDraft {
            min_pool_size: Some(0),
            ..PracticeSettingsDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err(), SettingsError::InvalidMinPoolSize);
    }

    #[test]
    fn draft_deserializes_partial_json() {
        let draft: PracticeSettingsDraft =
            serde_json::from_str(r#"{"upgrade_threshold": 4, "confidence_weighting": false}"#)
                .unwrap();
        let settings = draft.validate().unwrap();
        assert_eq!(settings.upgrade_threshold(), 4);
        assert!(!settings.confidence_weighting());
        assert_eq!(settings.adaptive_config().downgrade_threshold, 2);
    }
}
