use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::constants::{
    ENV_ACCOUNT_SID, ENV_AUTH_TOKEN, PLUGINS_BASE_URL, PKG_PLUGIN_SCRIPTS, SERVERLESS_BASE_URL,
};

#[derive(Debug, Default, Deserialize)]
pub struct FlexConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
}

impl FlexConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        let cfg = toml::from_str::<Self>(&text)
            .with_context(|| format!("failed to parse TOML config: {path}"))?;
        Ok(cfg)
    }

    /// Loads the config file if it exists, falling back to defaults otherwise.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolves credentials from the config file, letting the given
    /// environment lookup override each field.
    pub fn credentials<F>(&self, env: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account_sid = env(ENV_ACCOUNT_SID).or_else(|| self.credentials.account_sid.clone());
        let auth_token = env(ENV_AUTH_TOKEN).or_else(|| self.credentials.auth_token.clone());

        match (account_sid, auth_token) {
            (Some(account_sid), Some(auth_token)) => Ok(Credentials {
                account_sid,
                auth_token,
            }),
            _ => bail!(
                "missing credentials: set {ENV_ACCOUNT_SID} and {ENV_AUTH_TOKEN} or add a [credentials] section"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
}

/// Account credentials passed by value into API clients.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_sid: String,
    pub auth_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_serverless_url")]
    pub serverless_url: String,
    #[serde(default = "default_plugins_url")]
    pub plugins_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            serverless_url: default_serverless_url(),
            plugins_url: default_plugins_url(),
        }
    }
}

fn default_serverless_url() -> String {
    SERVERLESS_BASE_URL.to_string()
}

fn default_plugins_url() -> String {
    PLUGINS_BASE_URL.to_string()
}

/// Timing used by the e2e waiters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl PollingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// A zero interval is rejected by the waiters, not here.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_interval_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsConfig {
    /// Program and leading arguments used to invoke a bundler script.
    #[serde(default = "default_runner")]
    pub runner: Vec<String>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            runner: default_runner(),
        }
    }
}

fn default_runner() -> Vec<String> {
    vec!["npx".to_string(), PKG_PLUGIN_SCRIPTS.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: FlexConfig = toml::from_str("").expect("empty config should parse");
        assert_eq!(cfg.api.serverless_url, SERVERLESS_BASE_URL);
        assert_eq!(cfg.polling.timeout_ms, 30_000);
        assert_eq!(cfg.polling.interval_ms, 500);
        assert_eq!(cfg.scripts.runner, vec!["npx", "flex-plugin-scripts"]);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let cfg = FlexConfig::load_or_default(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.api.plugins_url, PLUGINS_BASE_URL);
    }

    #[test]
    fn env_overrides_file_credentials() {
        let cfg: FlexConfig = toml::from_str(
            r#"
            [credentials]
            account_sid = "AC-file"
            auth_token = "token-file"
            "#,
        )
        .unwrap();

        let creds = cfg
            .credentials(|key| (key == ENV_AUTH_TOKEN).then(|| "token-env".to_string()))
            .unwrap();
        assert_eq!(creds.account_sid, "AC-file");
        assert_eq!(creds.auth_token, "token-env");
    }

    #[test]
    fn missing_credentials_fail() {
        let cfg = FlexConfig::default();
        let err = cfg.credentials(|_| None).expect_err("must fail");
        assert!(err.to_string().contains("missing credentials"));
    }

    #[test]
    fn credentials_debug_hides_token() {
        let creds = Credentials {
            account_sid: "AC1".to_string(),
            auth_token: "secret".to_string(),
        };
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn polling_durations_follow_file() {
        let cfg: FlexConfig = toml::from_str("[polling]\ninterval_ms = 250").unwrap();
        assert_eq!(cfg.polling.timeout(), Duration::from_millis(30_000));
        assert_eq!(cfg.polling.interval(), Duration::from_millis(250));
    }
}
