//! TOML-based engine configuration.
//!
//! Holds everything the engine treats as static:
//! - the level model for the overall XP pool
//! - XP amounts per activity type and skill crediting
//! - skill and global threshold tables
//! - level-up bonus settings
//! - streak calendar offset
//! - the badge catalog
//!
//! Configuration is stored at `~/.config/questline/config.toml`, loaded once
//! at start-up and handed to the service by value.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, ValidationError};
use crate::progression::activity::ActivityType;
use crate::progression::badges::{BadgeDefinition, Requirement};
use crate::progression::catalog;
use crate::progression::level::{LevelModel, ThresholdTable};
use crate::progression::streak::StreakClock;

/// Level-up bonus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusConfig {
    /// XP granted under `level_up` when an award crosses a level.
    #[serde(default = "default_level_up_xp")]
    pub level_up_xp: u64,
    /// How many bonus legs one submission may trigger.
    #[serde(default = "default_max_cascade")]
    pub max_cascade: u32,
}

/// Streak calendar configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreakConfig {
    /// Minutes east of UTC used to turn instants into calendar dates.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/questline/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub level_model: LevelModel,
    #[serde(default = "catalog::default_xp_amounts")]
    pub xp_amounts: BTreeMap<String, u64>,
    #[serde(default = "catalog::default_skill_credit")]
    pub skill_credit: BTreeMap<String, String>,
    #[serde(default = "catalog::default_skills")]
    pub skills: Vec<String>,
    #[serde(default = "catalog::default_skill_thresholds")]
    pub skill_thresholds: ThresholdTable,
    #[serde(default = "catalog::default_global_thresholds")]
    pub global_thresholds: ThresholdTable,
    #[serde(default)]
    pub bonus: BonusConfig,
    #[serde(default = "default_log_capacity")]
    pub activity_log_capacity: usize,
    #[serde(default)]
    pub streak: StreakConfig,
    #[serde(default = "catalog::default_badges")]
    pub badges: Vec<BadgeDefinition>,
}

fn default_level_up_xp() -> u64 {
    50
}
fn default_max_cascade() -> u32 {
    1
}
fn default_log_capacity() -> usize {
    20
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            level_up_xp: default_level_up_xp(),
            max_cascade: default_max_cascade(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            level_model: LevelModel::default(),
            xp_amounts: catalog::default_xp_amounts(),
            skill_credit: catalog::default_skill_credit(),
            skills: catalog::default_skills(),
            skill_thresholds: catalog::default_skill_thresholds(),
            global_thresholds: catalog::default_global_thresholds(),
            bonus: BonusConfig::default(),
            activity_log_capacity: default_log_capacity(),
            streak: StreakConfig::default(),
            badges: catalog::default_badges(),
        }
    }
}

impl EngineConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// validated, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: EngineConfig =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting configuration fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig = serde_json::from_value(json).map_err(|e| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check tables, amounts and the badge catalog for consistency.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.level_model.validate()?;
        self.skill_thresholds.validate("skill_thresholds")?;
        self.global_thresholds.validate("global_thresholds")?;

        if self.activity_log_capacity == 0 {
            return Err(ValidationError::InvalidValue {
                field: "activity_log_capacity".into(),
                message: "must be at least 1".into(),
            });
        }

        for key in self.xp_amounts.keys().chain(self.skill_credit.keys()) {
            key.parse::<ActivityType>()
                .map_err(|_| ValidationError::InvalidValue {
                    field: "xp_amounts".into(),
                    message: format!("unknown activity type '{key}'"),
                })?;
        }

        let skills: HashSet<&str> = self.skills.iter().map(String::as_str).collect();
        if skills.len() != self.skills.len() {
            return Err(ValidationError::InvalidValue {
                field: "skills".into(),
                message: "skill names must be unique".into(),
            });
        }
        for skill in self.skill_credit.values() {
            if !skills.contains(skill.as_str()) {
                return Err(ValidationError::InvalidValue {
                    field: "skill_credit".into(),
                    message: format!("unknown skill '{skill}'"),
                });
            }
        }

        let mut ids = HashSet::new();
        for badge in &self.badges {
            if !ids.insert(badge.id.as_str()) {
                return Err(ValidationError::Duplicate {
                    kind: "badge".into(),
                    id: badge.id.clone(),
                });
            }
            if let Requirement::SkillLevel { skill, .. } = &badge.requirement {
                if !skills.contains(skill.as_str()) {
                    return Err(ValidationError::InvalidValue {
                        field: format!("badges.{}", badge.id),
                        message: format!("unknown skill '{skill}'"),
                    });
                }
            }
        }
        Ok(())
    }

    /// XP configured for `activity`.
    pub fn xp_for(&self, activity: ActivityType) -> Option<u64> {
        self.xp_amounts.get(activity.as_str()).copied()
    }

    /// Skill credited by `activity`, if any.
    pub fn skill_for(&self, activity: ActivityType) -> Option<&str> {
        self.skill_credit.get(activity.as_str()).map(String::as_str)
    }

    pub fn streak_clock(&self) -> StreakClock {
        StreakClock::from_offset_minutes(self.streak.utc_offset_minutes)
    }
}
