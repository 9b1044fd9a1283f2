//! Configuration types and loading
//!
//! Secrets are never read from the TOML itself: each one comes from its
//! environment variable or from the matching `*_file` path, env first.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use gitlab_auth::{Credential, TokenKind};
use gitlab_client::ClientOptions;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub gitlab: GitlabConfig,
    pub auth: AuthConfig,
}

/// Instance and transport settings
#[derive(Debug, Deserialize)]
pub struct GitlabConfig {
    /// Defaults to gitlab.com when absent
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Token,
    Password,
    OAuth,
}

/// Credential settings. Which fields are required depends on `method`.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    #[serde(default)]
    pub token_kind: TokenKind,
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
}

fn default_timeout() -> u64 {
    30
}

impl AuthMethod {
    fn secret_env(self) -> &'static str {
        match self {
            AuthMethod::Token => "GITLAB_TOKEN",
            AuthMethod::Password => "GITLAB_PASSWORD",
            AuthMethod::OAuth => "GITLAB_CLIENT_SECRET",
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Some(endpoint) = &config.gitlab.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "endpoint must start with http:// or https://, got: {endpoint}"
                )));
            }
        }

        if config.gitlab.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        config.auth.secret = config.auth.resolve_secret()?;
        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("gitlab.toml")
    }

    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions {
            endpoint: self.gitlab.endpoint.clone(),
            timeout: Some(Duration::from_secs(self.gitlab.timeout_secs)),
            ..ClientOptions::default()
        };
        if let Some(agent) = &self.gitlab.user_agent {
            options.user_agent = agent.clone();
        }
        options
    }

    /// Build the credential described by `[auth]`.
    pub fn credential(&self) -> common::Result<Credential> {
        let auth = &self.auth;
        let secret = auth.secret.clone().ok_or_else(|| {
            common::Error::Config(format!(
                "no secret for auth method {:?}: set {} or the matching *_file",
                auth.method,
                auth.method.secret_env()
            ))
        })?;
        let credential = match auth.method {
            AuthMethod::Token => Credential::token(secret).with_kind(auth.token_kind),
            AuthMethod::Password => {
                let username = required(&auth.username, "username")?;
                Credential::password(username, secret)
            }
            AuthMethod::OAuth => {
                let client_id = required(&auth.client_id, "client_id")?;
                let redirect_uri = required(&auth.redirect_uri, "redirect_uri")?;
                Credential::oauth(client_id, secret, redirect_uri)
            }
        };
        Ok(credential)
    }
}

impl AuthConfig {
    /// Env var takes precedence over the file.
    fn resolve_secret(&self) -> common::Result<Option<Secret<String>>> {
        if let Ok(value) = std::env::var(self.method.secret_env()) {
            return Ok(Some(Secret::new(value)));
        }
        let file = match self.method {
            AuthMethod::Token => &self.token_file,
            AuthMethod::Password => &self.password_file,
            AuthMethod::OAuth => &self.client_secret_file,
        };
        let Some(file) = file else {
            return Ok(None);
        };
        let value = std::fs::read_to_string(file).map_err(|e| {
            common::Error::Config(format!("failed to read {}: {e}", file.display()))
        })?;
        let value = value.trim().to_owned();
        Ok((!value.is_empty()).then(|| Secret::new(value)))
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> common::Result<&'a str> {
    field
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| common::Error::Config(format!("auth.{name} is required")))
}
