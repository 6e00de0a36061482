//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default tier and alternate-nostril toggle
//! - Custom pattern slider values
//! - Cue channels (sound, voice, vibration)
//! - Ambient sound and volume
//!
//! Configuration is stored at `~/.config/pranayama/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::ambient::AmbientSound;
use crate::error::{ConfigError, Result, ValidationError};
use crate::notify::CueSettings;
use crate::pattern::{PatternDurations, Tier};

/// Session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_tier")]
    pub tier: Tier,
    #[serde(default)]
    pub nadi: bool,
    /// Interval between clock ticks for real-time drivers.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Custom pattern slider values, in whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPatternConfig {
    #[serde(default = "default_inhale")]
    pub inhale: u32,
    #[serde(default = "default_hold")]
    pub hold: u32,
    #[serde(default = "default_exhale")]
    pub exhale: u32,
    #[serde(default = "default_relax")]
    pub relax: u32,
}

/// Cue channel toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default = "default_true")]
    pub voice: bool,
    #[serde(default = "default_true")]
    pub vibration: bool,
}

/// Ambient noise settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbientConfig {
    #[serde(default)]
    pub kind: AmbientSound,
    /// 0.0 .. 1.0, scaled by the noise volume ceiling.
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pranayama/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub custom: CustomPatternConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub ambient: AmbientConfig,
}

// Default functions
fn default_tier() -> Tier {
    Tier::Easy
}
fn default_tick_interval_ms() -> u64 {
    50
}
fn default_inhale() -> u32 {
    8
}
fn default_hold() -> u32 {
    16
}
fn default_exhale() -> u32 {
    8
}
fn default_relax() -> u32 {
    10
}
fn default_true() -> bool {
    true
}
fn default_volume() -> f32 {
    0.5
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tier: default_tier(),
            nadi: false,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for CustomPatternConfig {
    fn default() -> Self {
        Self {
            inhale: default_inhale(),
            hold: default_hold(),
            exhale: default_exhale(),
            relax: default_relax(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            sound: true,
            voice: true,
            vibration: true,
        }
    }
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            kind: AmbientSound::None,
            volume: default_volume(),
        }
    }
}

impl Config {
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
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(ConfigError::UnknownKey(key.to_string()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return (and persist) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by key in memory. Returns an error if the key is unknown
    /// or the value does not fit the field.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let mut updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        if !(0.0..=1.0).contains(&updated.ambient.volume) {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "ambient.volume must be between 0 and 1".into(),
            });
        }
        updated.session.tick_interval_ms = updated.session.tick_interval_ms.max(1);
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Custom slider values as a validated pattern.
    pub fn custom_pattern(&self) -> Result<PatternDurations, ValidationError> {
        PatternDurations::new(
            self.custom.inhale,
            self.custom.hold,
            self.custom.exhale,
            self.custom.relax,
        )
    }

    pub fn cue_settings(&self) -> CueSettings {
        CueSettings {
            sound: self.notifications.sound,
            voice: self.notifications.voice,
            vibration: self.notifications.vibration,
        }
    }
}
