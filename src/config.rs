use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default = "Config::default")]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendConfig {
    /// Backend preference order; the first backend whose probe succeeds
    /// handles the whole injection. Known names: "uinput", "eis".
    #[serde(default = "default_backend_order")]
    pub order: Vec<String>,
    /// Delay after virtual device creation before the device is guaranteed
    /// visible to the host input stack.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            order: default_backend_order(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

fn default_backend_order() -> Vec<String> {
    vec!["uinput".to_string(), "eis".to_string()]
}

fn default_settle_delay_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimeoutsConfig {
    /// Bound on the EIS session handshake, from connect to a usable
    /// keyboard device.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Per-read timeout on the EIS socket while pumping session events.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

fn default_handshake_timeout_ms() -> u64 {
    2000
}

fn default_io_timeout_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            timeouts: TimeoutsConfig::default(),
        }
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        tracing::info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(Config::default());
    }

    tracing::info!("Loading config from {:?}", config_path);
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

    Ok(config)
}

fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .expect("Failed to get config directory")
        .join("synthkey")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.backend.order, vec!["uinput", "eis"]);
        assert_eq!(config.backend.settle_delay_ms, 100);
        assert_eq!(config.timeouts.handshake_timeout_ms, 2000);
        assert_eq!(config.timeouts.io_timeout_ms, 500);
    }

    #[test]
    fn test_config_toml_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();

        assert!(toml_str.contains("[backend]"));
        assert!(toml_str.contains("[timeouts]"));
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_with_custom_backend_order() {
        let toml_str = r#"
            [backend]
            order = ["eis", "uinput"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(config.backend.order, vec!["eis", "uinput"]);
        assert_eq!(config.backend.settle_delay_ms, 100); // default
    }

    #[test]
    fn test_config_with_single_backend() {
        let toml_str = r#"
            [backend]
            order = ["eis"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.order, vec!["eis"]);
    }

    #[test]
    fn test_config_with_custom_timeouts() {
        let toml_str = r#"
            [timeouts]
            handshake_timeout_ms = 5000
            io_timeout_ms = 250
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timeouts.handshake_timeout_ms, 5000);
        assert_eq!(config.timeouts.io_timeout_ms, 250);
    }

    #[test]
    fn test_config_with_missing_sections_uses_defaults() {
        let toml_str = r#"
            [backend]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.order, vec!["uinput", "eis"]);
        assert_eq!(config.timeouts.handshake_timeout_ms, 2000);
    }

    #[test]
    fn test_config_with_invalid_toml() {
        let toml_str = "invalid toml content [unclosed";
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_with_invalid_types() {
        let toml_str = r#"
            [backend]
            settle_delay_ms = "not_a_number"
        "#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_backend_order() {
        assert_eq!(default_backend_order(), vec!["uinput", "eis"]);
    }

    #[test]
    fn test_default_settle_delay_ms() {
        assert_eq!(default_settle_delay_ms(), 100);
    }

    #[test]
    fn test_default_handshake_timeout_ms() {
        assert_eq!(default_handshake_timeout_ms(), 2000);
    }

    #[test]
    fn test_default_io_timeout_ms() {
        assert_eq!(default_io_timeout_ms(), 500);
    }

    #[test]
    fn test_load_config_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[backend]\norder = [\"eis\"]\nsettle_delay_ms = 50").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.backend.order, vec!["eis"]);
        assert_eq!(config.backend.settle_delay_ms, 50);
        assert_eq!(config.timeouts.io_timeout_ms, 500); // default
    }

    #[test]
    fn test_load_config_from_unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = [broken").unwrap();

        assert!(load_config_from(&path).is_err());
    }
}
