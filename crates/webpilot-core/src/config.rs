//! Application configuration.
//!
//! Loaded from a TOML file (`WEBPILOT_CONFIG`, an explicit path, or
//! `./webpilot.toml`), then overridden by environment variables. Every field
//! has a default, so an empty file and an empty environment give a working
//! development setup.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use webpilot_ai::{InferenceConfig, InferenceProvider};
use webpilot_browser::BrowserConfig;

const CONFIG_ENV: &str = "WEBPILOT_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "webpilot.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Database file; defaults to `~/.webpilot/webpilot.db`
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Which planner the executor asks for a plan
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    /// Inference backend with keyword fallback
    #[default]
    Ai,
    /// Keyword rules only
    Keyword,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub plan_source: PlanSource,
    #[serde(default = "default_max_concurrent_executions")]
    pub max_concurrent_executions: usize,
}

fn default_max_concurrent_executions() -> usize {
    4
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            plan_source: PlanSource::default(),
            max_concurrent_executions: default_max_concurrent_executions(),
        }
    }
}

/// Deployment mode. Development captures debug screenshots.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl AppConfig {
    /// Load the file config (if any) and apply environment overrides.
    ///
    /// An explicitly given path, or `WEBPILOT_CONFIG`, must exist;
    /// `./webpilot.toml` is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
        Self::from_toml(&contents)
            .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), err))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Unparsable numeric or boolean values are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = get("WEBPILOT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env(&get, "WEBPILOT_PORT") {
            self.server.port = port;
        }
        if let Some(origins) = get("WEBPILOT_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }
        if let Some(path) = get("WEBPILOT_DB_PATH") {
            self.storage.db_path = Some(PathBuf::from(path));
        }

        if let Some(provider) = get("WEBPILOT_INFERENCE_PROVIDER") {
            match provider.trim().to_ascii_lowercase().as_str() {
                "huggingface" => self.inference.provider = InferenceProvider::HuggingFace,
                "openai" => self.inference.provider = InferenceProvider::OpenAI,
                "disabled" | "none" => self.inference.provider = InferenceProvider::Disabled,
                other => tracing::warn!(value = other, "Ignoring unknown inference provider"),
            }
        }
        if let Some(token) = get("HUGGINGFACE_API_TOKEN") {
            self.inference.api_token = Some(token);
        }
        if let Some(model) = get("HUGGINGFACE_MODEL") {
            self.inference.model = model;
        }
        if let Some(url) = get("WEBPILOT_INFERENCE_BASE_URL") {
            self.inference.base_url = Some(url);
        }

        if let Some(headless) = parse_env(&get, "BROWSER_HEADLESS") {
            self.browser.headless = headless;
        }
        if let Some(timeout) = parse_env(&get, "BROWSER_TIMEOUT") {
            self.browser.navigation_timeout_ms = timeout;
        }
        if let Some(timeout) = parse_env(&get, "BROWSER_ACTION_TIMEOUT") {
            self.browser.action_timeout_ms = timeout;
        }
        if let Some(path) = get("CHROME_EXECUTABLE") {
            self.browser.executable_path = Some(PathBuf::from(path));
        }

        if let Some(source) = get("WEBPILOT_PLAN_SOURCE") {
            match source.trim().to_ascii_lowercase().as_str() {
                "ai" => self.executor.plan_source = PlanSource::Ai,
                "keyword" => self.executor.plan_source = PlanSource::Keyword,
                other => tracing::warn!(value = other, "Ignoring unknown plan source"),
            }
        }
        if let Some(limit) = parse_env(&get, "WEBPILOT_MAX_CONCURRENT_EXECUTIONS") {
            self.executor.max_concurrent_executions = limit;
        }

        if let Some(environment) = get("ENVIRONMENT") {
            match environment.trim().to_ascii_lowercase().as_str() {
                "development" | "dev" => self.environment = Environment::Development,
                "production" | "prod" => self.environment = Environment::Production,
                other => tracing::warn!(value = other, "Ignoring unknown environment"),
            }
        }
    }

    /// Resolved database path
    pub fn db_path(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(path.clone()),
            None => crate::paths::default_db_path(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().to_ascii_lowercase().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert!(config.browser.headless);
        assert_eq!(config.browser.navigation_timeout_ms, 30_000);
        assert_eq!(config.browser.action_timeout_ms, 5_000);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.executor.plan_source, PlanSource::Ai);
        assert_eq!(config.inference.model, "microsoft/DialoGPT-medium");
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            environment = "production"

            [server]
            port = 9100

            [browser]
            headless = false

            [executor]
            plan_source = "keyword"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.window_width, 1920);
        assert_eq!(config.executor.plan_source, PlanSource::Keyword);
        assert_eq!(config.executor.max_concurrent_executions, 4);
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(env_of(&[
            ("HUGGINGFACE_API_TOKEN", "hf_abc"),
            ("HUGGINGFACE_MODEL", "acme/planner"),
            ("BROWSER_HEADLESS", "False"),
            ("BROWSER_TIMEOUT", "12000"),
            ("ENVIRONMENT", "production"),
            ("WEBPILOT_PORT", "not-a-port"),
            ("WEBPILOT_CORS_ORIGINS", "http://a.test, http://b.test"),
        ]));

        assert_eq!(config.inference.api_token.as_deref(), Some("hf_abc"));
        assert_eq!(config.inference.model, "acme/planner");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.navigation_timeout_ms, 12_000);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_explicit_db_path() {
        let config = AppConfig::from_toml("[storage]\ndb_path = \"/tmp/x.db\"").unwrap();
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/x.db"));
    }
}
