//! Server configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Values are checked by [`ServerConfig::validate`]; systems
//! built from an invalid configuration refuse to construct.
//!
//! ```toml
//! tick_rate_hz = 30
//!
//! [meditation]
//! interval_secs = 2.0
//! recovery_fraction = 0.05
//! loop_effect = 4
//! loop_sound = 18
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::presentation::{EffectId, SoundId};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// MeditationConfig
// ---------------------------------------------------------------------------

/// Tuning and presentation ids for the meditation system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeditationConfig {
    /// Seconds between recovery passes. Must be positive and finite.
    pub interval_secs: f64,
    /// Share of max mana recovered on a successful pass, in `(0, 1]`.
    pub recovery_fraction: f64,
    pub loop_effect: EffectId,
    pub loop_sound: SoundId,
    pub start_key: String,
    pub stop_key: String,
    pub full_key: String,
    pub recovered_key: String,
}

impl Default for MeditationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            recovery_fraction: 0.1,
            loop_effect: EffectId(4),
            loop_sound: SoundId(18),
            start_key: "MEDITATE_START".to_owned(),
            stop_key: "MEDITATE_STOP".to_owned(),
            full_key: "MANA_FULL".to_owned(),
            recovered_key: "MANA_RECOVERED".to_owned(),
        }
    }
}

impl MeditationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.interval_secs)?;
        let f = self.recovery_fraction;
        if !(f > 0.0 && f <= 1.0) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "meditation.recovery_fraction must be in (0, 1], got {f}"
            )));
        }
        for (field, key) in [
            ("start_key", &self.start_key),
            ("stop_key", &self.stop_key),
            ("full_key", &self.full_key),
            ("recovered_key", &self.recovered_key),
        ] {
            if key.trim().is_empty() {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "meditation.{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Reject intervals that are not positive and finite.
pub(crate) fn validate_interval(interval_secs: f64) -> Result<(), ConfigError> {
    if interval_secs > 0.0 && interval_secs.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfiguration(format!(
            "interval must be positive and finite, got {interval_secs}"
        )))
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Simulation ticks per second.
    pub tick_rate_hz: u32,
    pub meditation: MeditationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            meditation: MeditationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "tick_rate_hz must be at least 1".to_owned(),
            ));
        }
        self.meditation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.meditation.loop_sound, SoundId(18));
    }

    #[test]
    fn partial_override() {
        let config = ServerConfig::from_toml_str(
            r#"
            tick_rate_hz = 30

            [meditation]
            interval_secs = 2.5
            loop_effect = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.tick_rate_hz, 30);
        assert_eq!(config.meditation.interval_secs, 2.5);
        assert_eq!(config.meditation.loop_effect, EffectId(9));
        assert_eq!(config.meditation.recovery_fraction, 0.1);
    }

    #[test]
    fn rejects_non_positive_interval() {
        for bad in ["0.0", "-1.0"] {
            let text = format!("[meditation]\ninterval_secs = {bad}\n");
            assert!(matches!(
                ServerConfig::from_toml_str(&text),
                Err(ConfigError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        for bad in [0.0, -0.2, 1.5, f64::NAN] {
            let config = MeditationConfig {
                recovery_fraction: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "fraction {bad} accepted");
        }
        let full = MeditationConfig {
            recovery_fraction: 1.0,
            ..Default::default()
        };
        assert!(full.validate().is_ok());
    }

    #[test]
    fn rejects_zero_tick_rate() {
        assert!(ServerConfig::from_toml_str("tick_rate_hz = 0").is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ServerConfig::from_toml_str("tick_rate_hz = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ServerConfig::load(Path::new("/nonexistent/meridian.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
