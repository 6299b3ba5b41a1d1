//! Commit status API handle
//!
//! A handle is bound to one repository and commit for its whole life.
//! Building it performs no network I/O; the first request happens on the
//! first status report.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::status::StatusUpdate;

pub const DEFAULT_API_ROOT: &str = "https://api.github.com";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
const USER_AGENT: &str = concat!("commit-status-relay/", env!("CARGO_PKG_VERSION"));

/// Identifies the commit being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCoordinate {
    owner: String,
    repo: String,
    git_ref: String,
}

impl RepositoryCoordinate {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        git_ref: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            git_ref: git_ref.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }
}

/// Connection settings for the status API.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiSettings {
    #[serde(default = "default_api_root")]
    pub api_root: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_api_root() -> String {
    DEFAULT_API_ROOT.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Posts commit statuses for the coordinate the handle is bound to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusApi: Send + Sync {
    fn coordinate(&self) -> &RepositoryCoordinate;

    /// Creates (or replaces) a status on the bound commit. Errors are
    /// returned as-is; nothing is retried.
    async fn create_status(&self, update: &StatusUpdate) -> Result<()>;
}

/// Token-authenticated GitHub REST handle.
///
/// The token is attached per request, so a token that cannot be sent as a
/// header only fails once a status is posted.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_root: String,
    token: String,
    coordinate: RepositoryCoordinate,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_root", &self.api_root)
            .field("coordinate", &self.coordinate)
            .finish_non_exhaustive()
    }
}

/// Builds a handle for `owner/repo` at `git_ref`.
pub fn new_client(
    owner: &str,
    repo: &str,
    git_ref: &str,
    token: &str,
    settings: &ApiSettings,
) -> Result<GithubClient> {
    GithubClient::new(RepositoryCoordinate::new(owner, repo, git_ref), token, settings)
}

impl GithubClient {
    pub fn new(
        coordinate: RepositoryCoordinate,
        token: &str,
        settings: &ApiSettings,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_root: settings.api_root.trim_end_matches('/').to_string(),
            token: token.to_string(),
            coordinate,
        })
    }

    fn statuses_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/statuses/{}",
            self.api_root,
            self.coordinate.owner(),
            self.coordinate.repo(),
            self.coordinate.git_ref()
        )
    }
}

#[async_trait]
impl StatusApi for GithubClient {
    fn coordinate(&self) -> &RepositoryCoordinate {
        &self.coordinate
    }

    #[tracing::instrument(skip_all, fields(state = %update.state))]
    async fn create_status(&self, update: &StatusUpdate) -> Result<()> {
        let url = self.statuses_url();
        debug!("POST {}", url);

        self.http
            .post(&url)
            .bearer_auth(&self.token)
            .json(update)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
