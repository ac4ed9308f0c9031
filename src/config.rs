//! Configuration management for the predictd service.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Default configuration (embedded in binary from `config/default.toml`)
//! 2. System-wide configuration file (`/etc/predictd/config.toml`)
//! 3. User-specified configuration file (`--config`)
//! 4. Environment variables (`PREDICTD_<SECTION>__<KEY>`, e.g. `PREDICTD_SERVER__PORT`)
//! 5. Command-line arguments, applied by the CLI handler

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::constants::network::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SERVICE_NAME};
use crate::constants::protocol::DEFAULT_MAX_LINE_BYTES;
use crate::constants::ENV_PREFIX;
use crate::error::{Error, Result};
use crate::models::FileModelRegistry;

const SYSTEM_CONFIG_PATH: &str = "/etc/predictd/config.toml";

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub protocol: ProtocolSettings,
    #[serde(default)]
    pub models: ModelSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Name announced in the handshake welcome line
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

/// Line protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Longest accepted inbound line, in bytes
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Reject requests whose attribute count differs from the model's
    /// instead of zero-padding or truncating them
    #[serde(default)]
    pub strict_dimensions: bool,
}

/// Model lookup settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Directory that relative model paths are resolved against
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

/// Diagnostic sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Extra filter directives, e.g. `predictd_core::service=debug`
    #[serde(default)]
    pub filter: Option<String>,

    /// Write to a daily rolling file in this directory instead of stderr
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
            strict_dimensions: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            filter: None,
            dir: None,
        }
    }
}

impl ServerSettings {
    /// `host:port`, with IPv6 hosts bracketed
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl ModelSettings {
    /// Registry honouring the configured base directory
    pub fn registry(&self) -> FileModelRegistry {
        match &self.base_dir {
            Some(dir) => FileModelRegistry::with_base_dir(dir),
            None => FileModelRegistry::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(config_file, None)
    }

    /// Load configuration, reading environment overrides from `env` instead
    /// of the process environment when given
    pub fn load_with_env(
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::from_str(
                include_str!("../config/default.toml"),
                FileFormat::Toml,
            ))
            .add_source(File::from(Path::new(SYSTEM_CONFIG_PATH)).required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config("server.host must not be empty"));
        }
        let name = &self.server.service_name;
        if name.trim().is_empty() || name.contains(['\n', '\r']) {
            return Err(Error::config(
                "server.service_name must be a non-empty single line",
            ));
        }
        if self.protocol.max_line_bytes == 0 {
            return Err(Error::config("protocol.max_line_bytes must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_config_defaults() {
        let settings = Settings::load_with_env(None, env(&[])).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.service_name, "predictd");
        assert_eq!(settings.protocol.max_line_bytes, 1024 * 1024);
        assert!(!settings.protocol.strict_dimensions);
        assert!(settings.models.base_dir.is_none());
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::load_with_env(
            None,
            env(&[
                ("PREDICTD_SERVER__PORT", "9200"),
                ("PREDICTD_PROTOCOL__STRICT_DIMENSIONS", "true"),
                ("PREDICTD_LOGGING__LEVEL", "debug"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 9200);
        assert!(settings.protocol.strict_dimensions);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_file_then_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9300\nservice_name = \"Iris Server\"\n[models]\nbase_dir = \"/srv/models\""
        )
        .unwrap();

        let settings = Settings::load_with_env(Some(file.path()), env(&[])).unwrap();
        assert_eq!(settings.server.port, 9300);
        assert_eq!(settings.server.service_name, "Iris Server");
        assert_eq!(settings.models.base_dir, Some(PathBuf::from("/srv/models")));

        let settings = Settings::load_with_env(
            Some(file.path()),
            env(&[("PREDICTD_SERVER__PORT", "9400")]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 9400);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = Settings::load_with_env(Some(Path::new("/nonexistent/predictd.toml")), env(&[]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let result = Settings::load_with_env(None, env(&[("PREDICTD_SERVER__PORT", "http")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());
        settings.server.service_name = "two\nlines".into();
        assert!(settings.validate().is_err());
        settings.server.service_name = "ok".into();
        settings.protocol.max_line_bytes = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_listen_addr() {
        let mut server = ServerSettings::default();
        assert_eq!(server.listen_addr(), "0.0.0.0:9100");
        server.host = "::1".into();
        assert_eq!(server.listen_addr(), "[::1]:9100");
    }
}
