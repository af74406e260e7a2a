//! First-run bootstrapping.
//!
//! When the data directory holds no `config.json`, a sample document is
//! written there so the user has something to edit.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::schema::GatewayConfig;

/// File name of the configuration document inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Sample configuration written on first run.
pub const SAMPLE_CONFIG: &str = r#"{
  "global": {
    "proxy": "",
    "timeout": 30,
    "defaultAPI": "local_test"
  },
  "apis": [
    {
      "name": "local_test",
      "endpoint": "http://localhost:8999",
      "headers": {
        "Content-Type": "application/json"
      },
      "methods": {
        "/hello": "POST",
        "DEFAULT": "GET"
      },
      "response": {
        "extract": {
          "default": "$.data",
          "by_status": {
            "200": "$.data.result",
            "4xx": "$.error.message"
          }
        },
        "fallback": "API调用失败",
        "format_template": "结果: {{result}}"
      }
    }
  ],
  "rules": [
    "COMMAND,/call,local_test,/hello,POST",
    "REGEX,^请求\\s+(.+)$,local_test,/hello,POST",
    "KEYWORD,测试,local_test,/hello,POST",
    "DEFAULT,local_test"
  ]
}
"#;

/// Parses the sample configuration.
pub fn sample_config() -> ConfigResult<GatewayConfig> {
    serde_json::from_str(SAMPLE_CONFIG)
        .map_err(|e| ConfigError::ParseError(format!("Invalid sample configuration: {e}")))
}

/// Returns the default data directory (`<data_dir>/apibridge`).
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("apibridge"))
}

/// Ensures `<data_dir>/config.json` exists, writing the sample if absent.
///
/// Returns the path of the configuration file. An existing file is never
/// overwritten.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the directory or file cannot be written.
pub fn bootstrap_config(data_dir: &Path) -> ConfigResult<PathBuf> {
    let path = data_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        debug!(path = %path.display(), "Configuration file present");
        return Ok(path);
    }

    std::fs::create_dir_all(data_dir)?;
    std::fs::write(&path, SAMPLE_CONFIG)?;
    info!(path = %path.display(), "Sample configuration created");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigLoader, validate_config};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "apibridge-bootstrap-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_sample_is_valid() {
        let config = sample_config().unwrap();
        assert_eq!(config.apis.len(), 1);
        assert_eq!(config.rules.len(), 4);
        assert_eq!(config.global.default_api(), Some("local_test"));
        assert!(validate_config(&config).unwrap().is_empty());
    }

    #[test]
    fn test_bootstrap_writes_once() {
        let dir = temp_dir("once").join("nested");
        let path = bootstrap_config(&dir).unwrap();
        assert_eq!(path, dir.join(CONFIG_FILE_NAME));

        std::fs::write(&path, r#"{"rules": ["DEFAULT,mine"]}"#).unwrap();
        bootstrap_config(&dir).unwrap();
        let kept = std::fs::read_to_string(&path).unwrap();
        assert!(kept.contains("mine"));
    }

    #[test]
    fn test_bootstrapped_file_loads() {
        let dir = temp_dir("load");
        let path = bootstrap_config(&dir).unwrap();
        let config = ConfigLoader::new().file(path).without_env().load().unwrap();
        assert_eq!(config, sample_config().unwrap());
    }
}
