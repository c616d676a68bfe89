//! Server configuration using Figment.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `config/dhm-serv.toml` when present)
//! 3. Environment variables prefixed with `DHM_SERV_`, nested keys split
//!    on `__` (e.g. `DHM_SERV_SERVER__PORT=27183`)
//!
//! # Example
//! ```no_run
//! use dhm_serv::config::Settings;
//!
//! let settings = Settings::load(None)?;
//! println!("listening on {}", settings.server.bind_addr()?);
//! # Ok::<(), dhm_serv::config::ConfigError>(())
//! ```

use crate::logging::{parse_log_level, OutputFormat};
use dhm_core::limits::{DEFAULT_INIT_RETRY_DELAY, SETTLING_FACTOR};
use dhm_driver_mock::MockDhmConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file read when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/dhm-serv.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "DHM_SERV_";

/// Well-known port of the DHM server.
pub const DEFAULT_PORT: u16 = 27182;

/// Errors raised while loading or validating [`Settings`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file is absent.
    #[error("configuration file {0} does not exist")]
    MissingFile(PathBuf),

    /// A provider failed to parse or extract.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Listener settings.
    #[serde(default)]
    pub server: NetworkSettings,
    /// Init and grab-timing settings.
    #[serde(default)]
    pub hardware: HardwareSettings,
    /// Log level and output format.
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Simulated microscope
    #[serde(default)]
    pub mock: MockDhmConfig,
}

/// Listening socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Bind address (default: all interfaces)
    pub addr: String,
    /// TCP port (default: 27182, 0 picks a free port)
    pub port: u16,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl NetworkSettings {
    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .addr
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address '{}'", self.addr)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Hardware supervision and grab timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    /// Delay between failed initialization attempts in milliseconds
    pub init_retry_delay_ms: u64,
    /// Multiple of the shutter time a grab waits after an exposure change
    pub settling_factor: f64,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            init_retry_delay_ms: DEFAULT_INIT_RETRY_DELAY.as_millis() as u64,
            settling_factor: SETTLING_FACTOR,
        }
    }
}

impl HardwareSettings {
    /// Retry delay as a [`Duration`].
    pub fn init_retry_delay(&self) -> Duration {
        Duration::from_millis(self.init_retry_delay_ms)
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Pretty, compact or JSON
    pub format: OutputFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: OutputFormat::default(),
        }
    }
}

impl Settings {
    /// Layered provider without extraction.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let file = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::MissingFile(p.to_path_buf()));
                }
                p.to_path_buf()
            }
            None => PathBuf::from(DEFAULT_CONFIG_PATH),
        };

        Ok(Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(path)?.extract().map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_addr()?;
        parse_log_level(&self.logging.level).map_err(ConfigError::Invalid)?;

        if self.hardware.init_retry_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "hardware.init_retry_delay_ms must be positive".to_string(),
            ));
        }
        let k = self.hardware.settling_factor;
        if !k.is_finite() || k < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "hardware.settling_factor {} must be a non-negative number",
                k
            )));
        }

        self.mock.validate().map_err(ConfigError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for (key, _) in std::env::vars() {
            if key.starts_with(ENV_PREFIX) {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(
            settings.server.bind_addr().unwrap(),
            "0.0.0.0:27182".parse().unwrap()
        );
        assert_eq!(
            settings.hardware.init_retry_delay(),
            Duration::from_secs(1)
        );
        assert_eq!(settings.hardware.settling_factor, 4.0);
    }

    #[test]
    #[serial]
    fn test_toml_overrides_defaults() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 27200

[hardware]
init_retry_delay_ms = 250

[logging]
format = "json"

[mock]
mode = "realistic"
init_failures = 2
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.port, 27200);
        assert_eq!(settings.server.addr, "0.0.0.0");
        assert_eq!(settings.hardware.init_retry_delay_ms, 250);
        assert_eq!(settings.hardware.settling_factor, 4.0);
        assert_eq!(settings.logging.format, OutputFormat::Json);
        assert_eq!(settings.mock.init_failures, 2);
        assert_eq!(settings.mock.profiles.len(), 3);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 27200\naddr = \"127.0.0.1\"").unwrap();

        std::env::set_var("DHM_SERV_SERVER__PORT", "27300");
        std::env::set_var("DHM_SERV_LOGGING__LEVEL", "debug");
        let settings = Settings::load(Some(file.path()));
        clear_env();

        let settings = settings.unwrap();
        assert_eq!(settings.server.port, 27300);
        assert_eq!(settings.server.addr, "127.0.0.1");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        clear_env();
        let err = Settings::load(Some(Path::new("/nonexistent/dhm-serv.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.server.addr = "not-an-ip".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.hardware.settling_factor = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.hardware.init_retry_delay_ms = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.mock.width = 0;
        assert!(settings.validate().is_err());
    }
}
