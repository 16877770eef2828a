//! Service configuration file.
//!
//! Loaded from TOML. Default location: /etc/l2gateway/l2gatewayd.toml
//!
//! ```toml
//! [service]
//! service_providers = ["L2GW:l2gw:logging:default"]
//! state_file = "/var/lib/l2gateway/state.json"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use crate::error::{PluginError, PluginResult};
use l2gw_driver::{RegistryError, ServiceProvider};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/l2gateway/l2gatewayd.toml";

/// Service driver selection and state location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Provider strings of the form `<service_type>:<name>:<driver>[:default]`.
    #[serde(default = "default_service_providers")]
    pub service_providers: Vec<String>,

    /// JSON file the store is loaded from and saved to.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Complete l2gatewayd configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

fn default_service_providers() -> Vec<String> {
    vec!["L2GW:l2gw:logging:default".to_string()]
}

fn default_state_file() -> PathBuf {
    PathBuf::from("/var/lib/l2gateway/state.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            service_providers: default_service_providers(),
            state_file: default_state_file(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ServiceConfig {
    /// Loads and validates the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> PluginResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PluginError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(path, &content)
    }

    /// Like [`ServiceConfig::load`], falling back to defaults when the file
    /// does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> PluginResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(PluginError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn parse(path: &Path, content: &str) -> PluginResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            PluginError::Config(format!("failed to parse config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PluginResult<()> {
        if self.service.service_providers.is_empty() {
            return Err(PluginError::Config(
                "service_providers must name at least one provider".to_string(),
            ));
        }
        self.providers()?;
        if self.logging.level.trim().is_empty() {
            return Err(PluginError::Config("logging.level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Parses every configured provider string.
    pub fn providers(&self) -> Result<Vec<ServiceProvider>, RegistryError> {
        self.service
            .service_providers
            .iter()
            .map(|s| s.parse())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.service.service_providers, vec!["L2GW:l2gw:logging:default"]);
        assert_eq!(config.service.state_file, PathBuf::from("/var/lib/l2gateway/state.json"));
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_deserialization_keeps_defaults() {
        let toml_str = r#"
[service]
state_file = "/tmp/l2gw.json"

[logging]
json = true
"#;
        let config: ServiceConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.state_file, PathBuf::from("/tmp/l2gw.json"));
        assert!(config.logging.json);
        // Unspecified values should use defaults
        assert_eq!(config.service.service_providers.len(), 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_providers_parse() {
        let config = ServiceConfig::default();
        let providers = config.providers().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "l2gw");
        assert_eq!(providers[0].driver, "logging");
        assert!(providers[0].default);
    }

    #[test]
    fn test_validate_rejects_bad_providers() {
        let mut config = ServiceConfig::default();
        config.service.service_providers.clear();
        assert!(config.validate().is_err());

        config.service.service_providers = vec!["garbage".to_string()];
        assert!(matches!(config.validate(), Err(PluginError::Config(_))));
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let config = ServiceConfig::load_or_default("/nonexistent/l2gatewayd.toml").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(ServiceConfig::load("/nonexistent/l2gatewayd.toml").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
service_providers = ["L2GW:primary:logging:default", "L2GW:backup:logging"]

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config.providers().unwrap().len(), 2);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service\nstate_file = 1").unwrap();
        let err = ServiceConfig::load_or_default(file.path()).unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
