//! Layered configuration loading.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. a programmatic base ([`ConfigLoader::merge`])
//! 3. the configuration file, either given explicitly or the first of
//!    `apibridge.<ext>` / `config.<ext>` found in the search paths
//! 4. its profile variant next to it, e.g. `config.production.json`
//! 5. `APIBRIDGE_*` environment variables, `__` separating nested keys
//!    (`APIBRIDGE_GLOBAL__TIMEOUT=10`)
//!
//! JSON is always accepted; `toml-config` and `yaml-config` add TOML and
//! YAML files.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::GatewayConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "APIBRIDGE_";

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "APIBRIDGE_PROFILE";

/// File stems searched for, in order.
const FILE_STEMS: [&str; 2] = ["apibridge", "config"];

/// File extensions accepted with the enabled features.
const EXTENSIONS: &[&str] = &[
    "json",
    #[cfg(feature = "toml-config")]
    "toml",
    #[cfg(feature = "yaml-config")]
    "yaml",
    #[cfg(feature = "yaml-config")]
    "yml",
];

/// Configuration profile, selecting the `<stem>.<profile>.<ext>` overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name used in file names.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `dev` and `prod` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" | "" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `APIBRIDGE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a [`GatewayConfig`] from layered sources.
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .file("./data/config.json")
///     .without_env()
///     .load()?;
/// ```
pub struct ConfigLoader {
    base: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    load_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader searching the current directory and the user config
    /// directory, with environment overrides enabled.
    pub fn new() -> Self {
        Self {
            base: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            config_file: None,
            load_env: true,
        }
    }

    /// Sets the profile, overriding `APIBRIDGE_PROFILE`.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a directory to search instead of the default locations.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables `APIBRIDGE_*` environment overrides.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a programmatic base; files and environment override it.
    pub fn merge(mut self, config: GatewayConfig) -> Self {
        self.base = self.base.merge(Serialized::defaults(config));
        self
    }

    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if an explicit file is missing and
    /// [`ConfigError::ParseError`] if a file has an unsupported extension or
    /// any source fails to parse.
    pub fn load(self) -> ConfigResult<GatewayConfig> {
        let mut figment = Figment::from(Serialized::defaults(GatewayConfig::default()))
            .merge(self.base.clone());

        match &self.config_file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => figment = self.merge_file(figment, path)?,
            None => match self.find_file() {
                Some(path) => figment = self.merge_file(figment, &path)?,
                None => warn!("No configuration file found, using defaults"),
            },
        }

        if self.load_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__"));
        }

        let config: GatewayConfig = figment.extract()?;
        debug!(
            profile = %self.profile,
            api_count = config.apis.len(),
            rule_count = config.rules.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Returns the first `<stem>.<ext>` present in the search paths.
    fn find_file(&self) -> Option<PathBuf> {
        let dirs = if self.search_paths.is_empty() {
            default_search_paths()
        } else {
            self.search_paths.clone()
        };

        dirs.iter()
            .flat_map(|dir| {
                FILE_STEMS.iter().flat_map(move |stem| {
                    EXTENSIONS.iter().map(move |ext| dir.join(format!("{stem}.{ext}")))
                })
            })
            .find(|path| path.exists())
    }

    /// Merges a file and, when present, its profile variant.
    fn merge_file(&self, figment: Figment, path: &Path) -> ConfigResult<Figment> {
        info!(path = %path.display(), "Loading configuration file");
        let mut figment = merge_by_extension(figment, path)?;

        if let Some(overlay) = profile_variant(path, &self.profile)
            && overlay.exists()
        {
            debug!(path = %overlay.display(), "Loading profile configuration");
            figment = merge_by_extension(figment, &overlay)?;
        }
        Ok(figment)
    }
}

fn default_search_paths() -> Vec<PathBuf> {
    std::env::current_dir()
        .ok()
        .into_iter()
        .chain(dirs::config_dir().map(|dir| dir.join("apibridge")))
        .collect()
}

/// `dir/config.json` with profile `production` -> `dir/config.production.json`.
fn profile_variant(path: &Path, profile: &Profile) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.{profile}.{ext}")))
}

fn merge_by_extension(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "json" => Ok(figment.merge(Json::file(path))),
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::ParseError(format!(
            "Unsupported or disabled configuration file format: .{ext}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use apibridge_core::ApiDefinition;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "apibridge-loader-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let dir = temp_dir("empty");
        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.apis.is_empty());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_load_json_file() {
        let dir = temp_dir("json");
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{
                "global": {"timeout": 5, "defaultAPI": "local_test"},
                "apis": [{
                    "name": "local_test",
                    "endpoint": "http://localhost:8999",
                    "methods": {"/hello": "POST", "DEFAULT": "GET"},
                    "preprocess": {"enabled": true, "template": {"body": {"q": ["content", 1]}}}
                }],
                "rules": ["COMMAND,/call,local_test,/hello,POST"],
                "logging": {"level": "debug"}
            }"#,
        )
        .unwrap();

        let config = ConfigLoader::new().file(&path).without_env().load().unwrap();
        assert_eq!(config.global.timeout_secs, 5.0);
        assert_eq!(config.global.default_api(), Some("local_test"));
        assert_eq!(config.apis[0].methods.resolve("/hello"), "POST");
        assert!(config.apis[0].body_template().is_some());
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_search_prefers_apibridge_stem() {
        let dir = temp_dir("stems");
        std::fs::write(dir.join("config.json"), r#"{"rules": ["DEFAULT,config"]}"#).unwrap();
        std::fs::write(dir.join("apibridge.json"), r#"{"rules": ["DEFAULT,apibridge"]}"#)
            .unwrap();

        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config.rules, vec!["DEFAULT,apibridge".to_string()]);
    }

    #[test]
    fn test_profile_overlay() {
        let dir = temp_dir("profile");
        std::fs::write(
            dir.join("apibridge.json"),
            r#"{"rules": ["DEFAULT,base"], "logging": {"level": "warn"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("apibridge.production.json"),
            r#"{"logging": {"level": "error"}, "global": {"timeout": 9}}"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .profile("prod")
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Error);
        assert_eq!(config.global.timeout_secs, 9.0);
        assert_eq!(config.rules, vec!["DEFAULT,base".to_string()]);
    }

    #[test]
    fn test_profile_overlay_for_explicit_file() {
        let dir = temp_dir("explicit-profile");
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"global": {"timeout": 5}}"#).unwrap();
        std::fs::write(dir.join("config.staging.json"), r#"{"global": {"timeout": 7}}"#).unwrap();

        let staging = ConfigLoader::new()
            .profile("staging")
            .file(&path)
            .without_env()
            .load()
            .unwrap();
        assert_eq!(staging.global.timeout_secs, 7.0);

        let development = ConfigLoader::new()
            .profile("dev")
            .file(&path)
            .without_env()
            .load()
            .unwrap();
        assert_eq!(development.global.timeout_secs, 5.0);
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/config.json")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = temp_dir("ext");
        let path = dir.join("config.ini");
        std::fs::write(&path, "x=1").unwrap();
        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_file_overrides_programmatic_base() {
        let dir = temp_dir("merge");
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"rules": ["DEFAULT,a"]}"#).unwrap();

        let base = GatewayConfig {
            apis: vec![ApiDefinition::new("a", "http://localhost")],
            rules: vec!["DEFAULT,b".into()],
            ..Default::default()
        };
        let config = ConfigLoader::new()
            .file(&path)
            .without_env()
            .merge(base)
            .load()
            .unwrap();
        assert_eq!(config.rules, vec!["DEFAULT,a".to_string()]);
        assert_eq!(config.apis[0].name, "a");
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
        assert_eq!(
            profile_variant(Path::new("data/config.json"), &Profile::Production),
            Some(PathBuf::from("data/config.production.json"))
        );
    }
}
