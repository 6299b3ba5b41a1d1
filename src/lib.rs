pub mod build;
pub mod client;
pub mod error;
pub mod filter;
pub mod logging;
pub mod payload;
pub mod relay;
pub mod status;
pub mod webhook;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use client::ApiSettings;
use error::{RelayError, Result};
use filter::ActionFilter;
use status::DEFAULT_WEB_HOST;

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Branches that trigger a build; empty means every branch.
    #[serde(default)]
    pub branches: Vec<String>,
    pub github: GithubConfig,
    pub build: BuildConfig,
    #[serde(default)]
    pub actions: ActionFilter,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    /// Repository used for events that carry no pull request.
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
    #[serde(default = "default_web_host")]
    pub web_host: String,
    #[serde(flatten)]
    pub api: ApiSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildConfig {
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    pub run_script: String,
    /// Link attached to success/failure statuses; empty means the commit page.
    #[serde(default)]
    pub target_url: String,
}

fn default_web_host() -> String {
    DEFAULT_WEB_HOST.to_string()
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

impl RelayConfig {
    /// Returns the API token, which must be set and non-empty.
    pub fn token(&self) -> Result<&str> {
        self.github
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                RelayError::ConfigError(
                    "no GitHub token configured (set github.token or GITHUB_TOKEN)".into(),
                )
            })
    }

    /// Applies a token supplied through the environment over the file value.
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.github.token = Some(token);
        }
        self
    }
}

/// Load and parse the configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<RelayConfig> {
    let path = path.as_ref();
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        RelayError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&config_str)
}

pub fn parse_config(config_str: &str) -> Result<RelayConfig> {
    let config: RelayConfig = toml::from_str(config_str)?;
    Ok(config)
}

pub struct AppState {
    /// Held for the duration of one event so builds never overlap in the workdir.
    /// The build runs inside the webhook request; GitHub marks deliveries that
    /// take longer than 10 seconds as failed even though the build continues.
    pub build_lock: Mutex<()>,
    pub config: RelayConfig,
}

pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [github]
        owner = "octo"
        repo = "hello-world"

        [build]
        run_script = "make test"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert!(config.branches.is_empty());
        assert_eq!(config.actions, ActionFilter::default());
        assert_eq!(config.github.web_host, "github.com");
        assert_eq!(config.github.api, ApiSettings::default());
        assert_eq!(config.build.workdir, PathBuf::from("."));
        assert_eq!(config.build.target_url, "");
        assert!(config.token().is_err());
    }

    #[test]
    fn full_config() {
        let config = parse_config(
            r#"
            branches = ["main", "release"]

            [github]
            owner = "octo"
            repo = "hello-world"
            token = "file-token"
            web_host = "git.example.com"
            api_root = "https://git.example.com/api/v3"
            connect_timeout_ms = 1000

            [build]
            workdir = "/srv/checkout"
            run_script = "cargo test"
            target_url = "https://ci.example.com"

            [actions]
            includes = ["opened", "synchronize"]
            excludes = ["deleted"]
            "#,
        )
        .unwrap();

        assert_eq!(config.branches, vec!["main", "release"]);
        assert_eq!(config.token().unwrap(), "file-token");
        assert_eq!(config.github.api.api_root, "https://git.example.com/api/v3");
        assert_eq!(config.github.api.connect_timeout_ms, 1000);
        assert_eq!(config.build.workdir, PathBuf::from("/srv/checkout"));
        assert!(config.actions.is_eligible("opened"));
        assert!(!config.actions.is_eligible("deleted"));
    }

    #[test]
    fn environment_token_takes_precedence() {
        let config = parse_config(MINIMAL)
            .unwrap()
            .with_token_override(Some("env-token".into()));
        assert_eq!(config.token().unwrap(), "env-token");

        let config = config.with_token_override(Some(String::new()));
        assert_eq!(config.token().unwrap(), "env-token");
    }

    #[test]
    fn invalid_toml_is_reported() {
        assert!(matches!(
            parse_config("[github"),
            Err(RelayError::TomlParseError(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        assert!(matches!(
            load_config("/nonexistent/relay_config.toml"),
            Err(RelayError::ConfigError(_))
        ));
    }
}
