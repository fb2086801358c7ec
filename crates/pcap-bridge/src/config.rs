//! Configuration for capture defaults and logging
//!
//! Provides:
//! - Config file discovery (CLI flag, env var, standard paths)
//! - TOML parsing with serde
//! - Environment variable overrides
//! - Applying capture settings to an inactive [`Session`]

use crate::error::PcapResult;
use crate::session::Session;
use crate::types::TimestampPrecision;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "PCAP_BRIDGE_CONFIG";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub logging: LoggingSettings,
    pub capture: CaptureSettings,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Output format: text or json
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Defaults for live captures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Snapshot length in bytes
    pub snaplen: i32,

    pub promiscuous: bool,

    /// Read timeout in milliseconds
    pub timeout_ms: i32,

    /// Deliver packets as soon as they arrive
    pub immediate_mode: bool,

    /// Kernel buffer size in bytes (platform default when unset)
    pub buffer_size: Option<i32>,

    /// Request monitor mode on wireless interfaces
    pub monitor_mode: bool,

    /// Timestamp precision: micro or nano
    pub timestamp_precision: String,

    /// Filter expression applied after activation
    pub filter: Option<String>,

    /// Optimize compiled filters
    pub optimize: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            snaplen: 65535,
            promiscuous: false,
            timeout_ms: 1000,
            immediate_mode: false,
            buffer_size: None,
            monitor_mode: false,
            timestamp_precision: "micro".to_string(),
            filter: None,
            optimize: true,
        }
    }
}

impl CaptureSettings {
    /// Parsed timestamp precision, micro when unrecognized
    pub fn precision(&self) -> TimestampPrecision {
        TimestampPrecision::from_name(&self.timestamp_precision).unwrap_or_default()
    }

    /// Configure an inactive session from these settings
    ///
    /// The filter is not attached here since it can only be compiled once
    /// the session is active.
    pub fn apply(&self, session: &mut Session) -> PcapResult<()> {
        session.set_snap_length(self.snaplen)?;
        session.set_promiscuous(self.promiscuous)?;
        session.set_timeout(self.timeout_ms)?;
        session.set_immediate_mode(self.immediate_mode)?;
        if let Some(size) = self.buffer_size {
            session.set_buffer_size(size)?;
        }
        if self.monitor_mode {
            session.set_monitor_mode(true)?;
        }
        session.set_timestamp_precision(self.precision())?;
        Ok(())
    }
}

/// Configuration loader
pub struct ConfigLoader {
    /// Path to config file (if specified via CLI)
    cli_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { cli_path: None }
    }

    /// Set the config path from CLI argument
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Load configuration with the following precedence:
    /// 1. CLI --config flag
    /// 2. PCAP_BRIDGE_CONFIG environment variable
    /// 3. ~/.config/pcap-bridge/config.toml
    /// 4. /etc/pcap-bridge/config.toml
    /// 5. Default values
    ///
    /// A `--config` path that does not exist is an error; the other
    /// locations are optional.
    pub fn load(&self) -> ConfigResult<BridgeConfig> {
        let mut config = match self.find_config_file()? {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                self.load_from_file(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                BridgeConfig::default()
            }
        };

        apply_overrides(&mut config, |key| std::env::var(key).ok());
        self.validate(&config)?;
        Ok(config)
    }

    fn find_config_file(&self) -> ConfigResult<Option<PathBuf>> {
        if let Some(path) = &self.cli_path {
            if path.exists() {
                return Ok(Some(path.clone()));
            }
            return Err(ConfigError::NotFound(path.clone()));
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok(Some(path));
            }
            warn!("{} path does not exist: {}", CONFIG_ENV, env_path);
        }

        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Ok(Some(path));
            }
        }

        let path = PathBuf::from("/etc/pcap-bridge/config.toml");
        if path.exists() {
            return Ok(Some(path));
        }

        Ok(None)
    }

    pub fn load_from_file(&self, path: &Path) -> ConfigResult<BridgeConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self, config: &BridgeConfig) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                config.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&config.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log format: {}. Must be one of: {:?}",
                config.logging.format, valid_formats
            )));
        }

        if config.capture.snaplen <= 0 {
            return Err(ConfigError::ValidationError(
                "Snapshot length must be positive".to_string(),
            ));
        }

        if config.capture.timeout_ms < 0 {
            return Err(ConfigError::ValidationError(
                "Timeout cannot be negative".to_string(),
            ));
        }

        if matches!(config.capture.buffer_size, Some(size) if size <= 0) {
            return Err(ConfigError::ValidationError(
                "Buffer size must be positive".to_string(),
            ));
        }

        if TimestampPrecision::from_name(&config.capture.timestamp_precision).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Invalid timestamp precision: {}. Must be micro or nano",
                config.capture.timestamp_precision
            )));
        }

        Ok(())
    }

    /// Per-user config file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pcap-bridge").join("config.toml"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `PCAP_BRIDGE_*` overrides read through `lookup`
///
/// Values that fail to parse leave the setting unchanged.
pub fn apply_overrides<F>(config: &mut BridgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("PCAP_BRIDGE_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = lookup("PCAP_BRIDGE_LOG_FORMAT") {
        config.logging.format = val;
    }

    let capture = &mut config.capture;
    if let Some(val) = lookup("PCAP_BRIDGE_SNAPLEN") {
        capture.snaplen = val.parse().unwrap_or(capture.snaplen);
    }
    if let Some(val) = lookup("PCAP_BRIDGE_PROMISCUOUS") {
        capture.promiscuous = val.parse().unwrap_or(capture.promiscuous);
    }
    if let Some(val) = lookup("PCAP_BRIDGE_TIMEOUT_MS") {
        capture.timeout_ms = val.parse().unwrap_or(capture.timeout_ms);
    }
    if let Some(val) = lookup("PCAP_BRIDGE_IMMEDIATE") {
        capture.immediate_mode = val.parse().unwrap_or(capture.immediate_mode);
    }
    if let Some(val) = lookup("PCAP_BRIDGE_BUFFER_SIZE") {
        if let Ok(size) = val.parse() {
            capture.buffer_size = Some(size);
        }
    }
    if let Some(val) = lookup("PCAP_BRIDGE_TSTAMP_PRECISION") {
        capture.timestamp_precision = val;
    }
    if let Some(val) = lookup("PCAP_BRIDGE_FILTER") {
        capture.filter = Some(val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.capture.snaplen, 65535);
        assert_eq!(config.capture.timeout_ms, 1000);
        assert!(!config.capture.promiscuous);
        assert!(config.capture.optimize);
        assert_eq!(config.capture.precision(), TimestampPrecision::Micro);
        assert!(ConfigLoader::new().validate(&config).is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            [capture]
            promiscuous = true
            filter = "tcp port 443"
        "#;
        let config: BridgeConfig = toml::from_str(toml_str).unwrap();
        assert!(config.capture.promiscuous);
        assert_eq!(config.capture.filter.as_deref(), Some("tcp port 443"));
        // Other fields should be default
        assert_eq!(config.capture.snaplen, 65535);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_cli_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [logging]
            level = "debug"
            format = "json"

            [capture]
            snaplen = 128
            timestamp_precision = "nano"
            buffer_size = 4194304
            "#,
        )
        .unwrap();

        let loader = ConfigLoader::new().with_cli_path(Some(path.clone()));
        let config = loader.load_from_file(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.capture.snaplen, 128);
        assert_eq!(config.capture.buffer_size, Some(4_194_304));
        assert_eq!(config.capture.precision(), TimestampPrecision::Nano);
        assert!(loader.validate(&config).is_ok());
    }

    #[test]
    fn test_missing_cli_path_is_error() {
        let loader =
            ConfigLoader::new().with_cli_path(Some(PathBuf::from("/nonexistent/pcap-bridge.toml")));
        assert!(matches!(loader.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[capture\nsnaplen = ").unwrap();
        let loader = ConfigLoader::new();
        assert!(matches!(
            loader.load_from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PCAP_BRIDGE_LOG_LEVEL", "trace"),
            ("PCAP_BRIDGE_SNAPLEN", "96"),
            ("PCAP_BRIDGE_PROMISCUOUS", "true"),
            ("PCAP_BRIDGE_TIMEOUT_MS", "not-a-number"),
            ("PCAP_BRIDGE_FILTER", "udp"),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        apply_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.capture.snaplen, 96);
        assert!(config.capture.promiscuous);
        // Unparseable values keep the previous setting
        assert_eq!(config.capture.timeout_ms, 1000);
        assert_eq!(config.capture.filter.as_deref(), Some("udp"));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = BridgeConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            ConfigLoader::new().validate(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_capture_values() {
        let loader = ConfigLoader::new();

        let mut config = BridgeConfig::default();
        config.capture.snaplen = 0;
        assert!(loader.validate(&config).is_err());

        let mut config = BridgeConfig::default();
        config.capture.timestamp_precision = "pico".to_string();
        assert!(loader.validate(&config).is_err());

        let mut config = BridgeConfig::default();
        config.capture.buffer_size = Some(-1);
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_serialize_config() {
        let config = BridgeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("[capture]"));
        let parsed: BridgeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.capture.snaplen, config.capture.snaplen);
    }

    #[test]
    fn test_apply_to_inactive_session() {
        let settings = CaptureSettings {
            snaplen: 256,
            timeout_ms: 10,
            buffer_size: Some(1 << 20),
            ..Default::default()
        };
        let mut session = Session::create("nosuchdev0").unwrap();
        settings.apply(&mut session).unwrap();
    }
}
