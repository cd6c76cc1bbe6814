use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors loading a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Timing knobs for a [`Client`](crate::Client).
///
/// Serialized with millisecond fields so a config file reads
/// `{"connect_timeout_ms": 5000, "get_timeout_ms": 2000}`. Missing fields keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Default bound for [`Client::connect_default`](crate::Client::connect_default).
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,
    /// Bound for typed getters that take no explicit timeout.
    #[serde(rename = "get_timeout_ms", with = "millis")]
    pub get_timeout: Duration,
    /// Pump sleep between processing cycles.
    #[serde(rename = "pump_interval_ms", with = "millis")]
    pub pump_interval: Duration,
    /// How long disconnect waits for the pump thread to exit.
    #[serde(rename = "shutdown_grace_ms", with = "millis")]
    pub shutdown_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            get_timeout: Duration::from_secs(2),
            pump_interval: Duration::from_millis(10),
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Every duration must be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("connect_timeout_ms", self.connect_timeout),
            ("get_timeout_ms", self.get_timeout),
            ("pump_interval_ms", self.pump_interval),
            ("shutdown_grace_ms", self.shutdown_grace),
        ];
        for (name, value) in fields {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
            }
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = ClientConfig::from_json_str(r#"{"get_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.get_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.pump_interval, Duration::from_millis(10));
    }

    #[test]
    fn zero_and_unknown_fields_are_rejected() {
        assert!(matches!(
            ClientConfig::from_json_str(r#"{"pump_interval_ms": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_json_str(r#"{"poll_ms": 5}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn serializes_in_milliseconds() {
        let json = serde_json::to_value(ClientConfig::default()).unwrap();
        assert_eq!(json["connect_timeout_ms"], 5000);
        assert_eq!(json["shutdown_grace_ms"], 2000);
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = ClientConfig::from_path("/nonexistent/milconn.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
