//! Settings - the TOML document a proxy process starts from.
//!
//! ```toml
//! [proxy]
//! listen_port = 8081
//! target_host = "billing.internal"
//! target_port = 443
//!
//! [log]
//! filter = "info,snare_core=debug"
//! json = true
//! ```

use serde::{Deserialize, Serialize};
use snare_core::{ConfigError, Parameters};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub proxy: Parameters,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directives. `RUST_LOG` takes precedence when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(source)?;
        settings.proxy.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let settings = Settings::from_toml_str(
            r#"
            [proxy]
            listen_port = 8081
            target_host = "billing.internal"
            target_port = 443

            [log]
            filter = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.proxy.listen_port, 8081);
        assert_eq!(settings.proxy.target_authority(), "billing.internal:443");
        assert_eq!(settings.log.filter, "debug");
        assert!(settings.log.json);
    }

    #[test]
    fn test_missing_tables_use_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log.filter, "info");
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let err = Settings::from_toml_str("[proxy]\nlisten_port = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Settings::load("/nonexistent/snare.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
