//! Typed core configuration backed by the settings key-value store.
//!
//! # Invariants
//! - Missing keys fall back to defaults; malformed values are errors.
//! - `store` writes every key so a later `load` round-trips exactly.

use crate::policy::capacity::{
    CapacityPolicy, CapacityPolicyError, GoalEnforcement, DEFAULT_ACTIVE_GOAL_LIMIT,
};
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::RepoError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

pub const KEY_GOALS_ACTIVE_LIMIT: &str = "goals.active_limit";
pub const KEY_GOALS_ENFORCEMENT: &str = "goals.enforcement";
pub const KEY_VOICE_LISTEN_TIMEOUT_MS: &str = "voice.listen_timeout_ms";
pub const KEY_VOICE_PROCESSING_TIMEOUT_MS: &str = "voice.processing_timeout_ms";
pub const KEY_VOICE_ERROR_RESET_MS: &str = "voice.error_reset_ms";
pub const KEY_VOICE_SHAKE_TO_ACTIVATE: &str = "voice.shake_to_activate";

const DEFAULT_LISTEN_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_PROCESSING_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_ERROR_RESET_MS: u64 = 3_000;

#[derive(Debug)]
pub enum ConfigError {
    Repo(RepoError),
    InvalidValue { key: &'static str, value: String },
    Policy(CapacityPolicyError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for setting `{key}`")
            }
            Self::Policy(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::InvalidValue { .. } => None,
            Self::Policy(err) => Some(err),
        }
    }
}

impl From<RepoError> for ConfigError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<CapacityPolicyError> for ConfigError {
    fn from(value: CapacityPolicyError) -> Self {
        Self::Policy(value)
    }
}

/// Goal capacity settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    pub active_limit: u32,
    pub enforcement: GoalEnforcement,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            active_limit: DEFAULT_ACTIVE_GOAL_LIMIT,
            enforcement: GoalEnforcement::Soft,
        }
    }
}

/// Voice session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Listening longer than this without an utterance auto-cancels.
    pub listen_timeout_ms: u64,
    /// Parsing longer than this auto-cancels.
    pub processing_timeout_ms: u64,
    /// Unacknowledged errors reset to idle after this long.
    pub error_reset_ms: u64,
    pub shake_to_activate: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            listen_timeout_ms: DEFAULT_LISTEN_TIMEOUT_MS,
            processing_timeout_ms: DEFAULT_PROCESSING_TIMEOUT_MS,
            error_reset_ms: DEFAULT_ERROR_RESET_MS,
            shake_to_activate: false,
        }
    }
}

impl VoiceConfig {
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_millis(self.listen_timeout_ms)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_millis(self.processing_timeout_ms)
    }

    pub fn error_reset(&self) -> Duration {
        Duration::from_millis(self.error_reset_ms)
    }
}

/// Full core configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub goals: GoalConfig,
    pub voice: VoiceConfig,
}

impl CoreConfig {
    /// Loads configuration from settings, defaulting missing keys.
    pub fn load(settings: &impl SettingsRepository) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let goals = GoalConfig {
            active_limit: read_parsed(
                settings,
                KEY_GOALS_ACTIVE_LIMIT,
                defaults.goals.active_limit,
            )?,
            enforcement: match settings.get_setting(KEY_GOALS_ENFORCEMENT)? {
                Some(value) => {
                    GoalEnforcement::parse(&value).ok_or(ConfigError::InvalidValue {
                        key: KEY_GOALS_ENFORCEMENT,
                        value,
                    })?
                }
                None => defaults.goals.enforcement,
            },
        };
        let voice = VoiceConfig {
            listen_timeout_ms: read_parsed(
                settings,
                KEY_VOICE_LISTEN_TIMEOUT_MS,
                defaults.voice.listen_timeout_ms,
            )?,
            processing_timeout_ms: read_parsed(
                settings,
                KEY_VOICE_PROCESSING_TIMEOUT_MS,
                defaults.voice.processing_timeout_ms,
            )?,
            error_reset_ms: read_parsed(
                settings,
                KEY_VOICE_ERROR_RESET_MS,
                defaults.voice.error_reset_ms,
            )?,
            shake_to_activate: read_parsed(
                settings,
                KEY_VOICE_SHAKE_TO_ACTIVATE,
                defaults.voice.shake_to_activate,
            )?,
        };

        let config = Self { goals, voice };
        config.capacity_policy()?;
        Ok(config)
    }

    /// Writes every key to settings.
    pub fn store(&self, settings: &impl SettingsRepository) -> Result<(), ConfigError> {
        self.capacity_policy()?;
        settings.set_setting(KEY_GOALS_ACTIVE_LIMIT, &self.goals.active_limit.to_string())?;
        settings.set_setting(KEY_GOALS_ENFORCEMENT, self.goals.enforcement.as_str())?;
        settings.set_setting(
            KEY_VOICE_LISTEN_TIMEOUT_MS,
            &self.voice.listen_timeout_ms.to_string(),
        )?;
        settings.set_setting(
            KEY_VOICE_PROCESSING_TIMEOUT_MS,
            &self.voice.processing_timeout_ms.to_string(),
        )?;
        settings.set_setting(
            KEY_VOICE_ERROR_RESET_MS,
            &self.voice.error_reset_ms.to_string(),
        )?;
        settings.set_setting(
            KEY_VOICE_SHAKE_TO_ACTIVATE,
            &self.voice.shake_to_activate.to_string(),
        )?;
        Ok(())
    }

    /// Builds the capacity policy described by the goal settings.
    pub fn capacity_policy(&self) -> Result<CapacityPolicy, ConfigError> {
        Ok(CapacityPolicy::new(
            self.goals.active_limit,
            self.goals.enforcement,
        )?)
    }
}

fn read_parsed<T: FromStr>(
    settings: &impl SettingsRepository,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match settings.get_setting(key)? {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, KEY_GOALS_ACTIVE_LIMIT, KEY_GOALS_ENFORCEMENT};
    use crate::db::open_db_in_memory;
    use crate::policy::capacity::GoalEnforcement;
    use crate::repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};

    #[test]
    fn load_defaults_when_settings_are_empty() {
        let conn = open_db_in_memory().expect("open db");
        let settings = SqliteSettingsRepository::try_new(&conn).expect("repo");

        let config = CoreConfig::load(&settings).expect("load");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.goals.active_limit, 2);
        assert_eq!(config.goals.enforcement, GoalEnforcement::Soft);
    }

    #[test]
    fn store_then_load_round_trips() {
        let conn = open_db_in_memory().expect("open db");
        let settings = SqliteSettingsRepository::try_new(&conn).expect("repo");

        let mut config = CoreConfig::default();
        config.goals.enforcement = GoalEnforcement::Hard;
        config.goals.active_limit = 3;
        config.voice.shake_to_activate = true;
        config.store(&settings).expect("store");

        assert_eq!(CoreConfig::load(&settings).expect("load"), config);
    }

    #[test]
    fn load_rejects_malformed_values() {
        let conn = open_db_in_memory().expect("open db");
        let settings = SqliteSettingsRepository::try_new(&conn).expect("repo");

        settings
            .set_setting(KEY_GOALS_ENFORCEMENT, "strict")
            .expect("set");
        let err = CoreConfig::load(&settings).expect_err("unknown enforcement");
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key, .. } if key == KEY_GOALS_ENFORCEMENT
        ));

        settings.set_setting(KEY_GOALS_ENFORCEMENT, "hard").expect("set");
        settings.set_setting(KEY_GOALS_ACTIVE_LIMIT, "0").expect("set");
        let err = CoreConfig::load(&settings).expect_err("zero limit");
        assert!(matches!(err, ConfigError::Policy(_)));
    }

    #[test]
    fn config_deserializes_partial_json_with_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"goals":{"enforcement":"hard"}}"#).expect("json");
        assert_eq!(config.goals.enforcement, GoalEnforcement::Hard);
        assert_eq!(config.goals.active_limit, 2);
        assert_eq!(config.voice.listen_timeout_ms, 30_000);
    }
}
