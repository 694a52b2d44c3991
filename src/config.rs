//! Client configuration.
//!
//! Configuration is stored in `config.yaml` under the platform config
//! directory, or at `$TASKBOARD_CONFIG` when set. Environment variables take
//! precedence over the file for the server URL and the token.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TaskboardError};
use crate::service::RetryPolicy;
use crate::session::Credential;
use crate::types::ProjectId;

pub const CONFIG_ENV: &str = "TASKBOARD_CONFIG";
pub const TOKEN_ENV: &str = "TASKBOARD_TOKEN";
pub const URL_ENV: &str = "TASKBOARD_URL";

const DEFAULT_SERVER_URL: &str = "http://localhost:8001";

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Total request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<ProjectId>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            auth: AuthConfig::default(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            default_project: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url)
            .field("auth", &self.auth)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("default_project", &self.default_project)
            .finish()
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        directories::ProjectDirs::from("dev", "taskboard", "taskboard")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .ok_or_else(|| {
                TaskboardError::Config("could not determine the config directory".to_string())
            })
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Server base URL, from `TASKBOARD_URL` or the config file
    pub fn server_url(&self) -> Result<Url> {
        let raw = match env::var(URL_ENV) {
            Ok(url) if !url.is_empty() => url,
            _ => self.server_url.clone(),
        };
        Ok(Url::parse(&raw)?)
    }

    /// Bearer token, from `TASKBOARD_TOKEN` or the config file
    pub fn credential(&self) -> Option<Credential> {
        if let Ok(token) = env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            return Some(Credential::new(token));
        }

        self.auth
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(Credential::new)
    }

    pub fn set_token(&mut self, token: String) {
        self.auth.token = Some(token);
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let previous = env::var(key).ok();
            // SAFETY: env-mutating tests are serialized with #[serial]
            unsafe { env::set_var(key, value) };
            Self { key, previous }
        }

        fn unset(key: &'static str) -> Self {
            let previous = env::var(key).ok();
            // SAFETY: env-mutating tests are serialized with #[serial]
            unsafe { env::remove_var(key) };
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: env-mutating tests are serialized with #[serial]
            unsafe {
                match &self.previous {
                    Some(v) => env::set_var(self.key, v),
                    None => env::remove_var(self.key),
                }
            }
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:8001");
        assert!(config.auth.token.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.default_project.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "server_url: https://tracker.example.com\nmax_retries: 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server_url, "https://tracker.example.com");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_timeout, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.set_token("secret".to_string());
        config.default_project = Some(ProjectId::new(3));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.auth.token.as_deref(), Some("secret"));
        assert_eq!(loaded.default_project, Some(ProjectId::new(3)));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "server_url: [unterminated\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(TaskboardError::YamlParse(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = Config::default();
        config.set_token("super-secret-token".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    #[serial]
    fn test_env_token_wins() {
        let _guard = EnvGuard::set(TOKEN_ENV, "from-env");
        let mut config = Config::default();
        config.set_token("from-file".to_string());
        assert_eq!(config.credential().unwrap().expose(), "from-env");
    }

    #[test]
    #[serial]
    fn test_file_token_used_without_env() {
        let _guard = EnvGuard::unset(TOKEN_ENV);
        let mut config = Config::default();
        assert!(config.credential().is_none());
        config.set_token("from-file".to_string());
        assert_eq!(config.credential().unwrap().expose(), "from-file");
    }

    #[test]
    #[serial]
    fn test_env_url_overrides_file() {
        let _guard = EnvGuard::set(URL_ENV, "https://override.example.com/api/");
        let config = Config::default();
        assert_eq!(
            config.server_url().unwrap().as_str(),
            "https://override.example.com/api/"
        );
    }

    #[test]
    #[serial]
    fn test_config_path_from_env() {
        let _guard = EnvGuard::set(CONFIG_ENV, "/tmp/taskboard-test/config.yaml");
        assert_eq!(
            Config::config_path().unwrap(),
            PathBuf::from("/tmp/taskboard-test/config.yaml")
        );
    }
}
