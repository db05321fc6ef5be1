//! Verifier connection settings.
//!
//! Settings come from [`VerifierConfig::default`], a JSON file and the
//! environment, in that order:
//!
//! ```json
//! { "address": "127.0.0.1", "port": 3141, "connect_timeout_ms": 10000 }
//! ```
//!
//! `VERIFIER_ADDR` and `VERIFIER_PORT` override the file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifierError};
use crate::protocol::DEFAULT_PORT;

/// Default verifier address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable overriding the verifier address.
pub const ENV_ADDRESS: &str = "VERIFIER_ADDR";

/// Environment variable overriding the verifier port.
pub const ENV_PORT: &str = "VERIFIER_PORT";

/// Where and how to reach the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConfigFile", into = "ConfigFile")]
pub struct VerifierConfig {
    /// Host name or IP address.
    pub address: String,
    /// TCP port.
    pub port: u16,
    /// Bound on establishing the connection.
    pub connect_timeout: Duration,
    /// Bound on each read or write. Falls back to `connect_timeout`.
    pub io_timeout: Option<Duration>,
}

impl VerifierConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VerifierError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            VerifierError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            VerifierError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings can describe a reachable endpoint.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(VerifierError::Config("address must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(VerifierError::Config("port must not be 0".to_string()));
        }
        if self.connect_timeout.is_zero() || self.io_timeout.is_some_and(|t| t.is_zero()) {
            return Err(VerifierError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }

    /// Apply `VERIFIER_ADDR` / `VERIFIER_PORT` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(ENV_ADDRESS) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                self.address = trimmed.to_string();
            }
        }

        if let Ok(raw) = std::env::var(ENV_PORT) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                match trimmed.parse::<u16>() {
                    Ok(port) if port != 0 => self.port = port,
                    _ => tracing::warn!("invalid {ENV_PORT} {trimmed:?}, ignoring"),
                }
            }
        }
    }

    /// Timeout applied to each read and write.
    #[inline]
    pub fn io_timeout(&self) -> Duration {
        self.io_timeout.unwrap_or(self.connect_timeout)
    }

    /// `address:port`, as passed to the resolver.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: None,
        }
    }
}

/// On-disk shape, timeouts in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    address: String,
    port: u16,
    connect_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    io_timeout_ms: Option<u64>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        VerifierConfig::default().into()
    }
}

impl From<ConfigFile> for VerifierConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            address: file.address,
            port: file.port,
            connect_timeout: Duration::from_millis(file.connect_timeout_ms),
            io_timeout: file.io_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl From<VerifierConfig> for ConfigFile {
    fn from(config: VerifierConfig) -> Self {
        Self {
            address: config.address,
            port: config.port,
            connect_timeout_ms: config.connect_timeout.as_millis() as u64,
            io_timeout_ms: config.io_timeout.map(|t| t.as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VerifierConfig::default();
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 3141);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.io_timeout(), Duration::from_secs(10));
        assert_eq!(config.endpoint(), "127.0.0.1:3141");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = VerifierConfig::from_json_str(r#"{ "port": 4000 }"#).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_timeouts_in_millis() {
        let config = VerifierConfig::from_json_str(
            r#"{ "connect_timeout_ms": 250, "io_timeout_ms": 1500 }"#,
        )
        .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.io_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = VerifierConfig::from_json_str(r#"{ "prot": 1 }"#).unwrap_err();
        assert!(matches!(err, VerifierError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(VerifierConfig::from_json_str(r#"{ "port": 0 }"#).is_err());
        assert!(VerifierConfig::from_json_str(r#"{ "address": "  " }"#).is_err());
        assert!(VerifierConfig::from_json_str(r#"{ "connect_timeout_ms": 0 }"#).is_err());
        assert!(VerifierConfig::from_json_str(r#"{ "io_timeout_ms": 0 }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verifier.json");
        fs::write(&path, r#"{ "address": "verifier.local", "port": 3142 }"#).unwrap();

        let config = VerifierConfig::load(&path).unwrap();
        assert_eq!(config.endpoint(), "verifier.local:3142");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = VerifierConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = VerifierConfig {
            address: "10.0.0.2".to_string(),
            port: 5000,
            connect_timeout: Duration::from_millis(750),
            io_timeout: Some(Duration::from_secs(2)),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"connect_timeout_ms\":750"));
        assert_eq!(VerifierConfig::from_json_str(&json).unwrap(), config);
    }
}
