//! Build outcome reporting through the commit status API

use std::fmt;

use serde::Serialize;
use tracing::{Instrument, Span, info};

use crate::client::{RepositoryCoordinate, StatusApi};
use crate::error::Result;

pub const DEFAULT_WEB_HOST: &str = "github.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
}

impl StatusState {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusState::Pending => "pending",
            StatusState::Success => "success",
            StatusState::Failure => "failure",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StatusState::Pending => "The build is pending",
            StatusState::Success => "The build succeeded!",
            StatusState::Failure => "The build failed!",
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of one commit status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub state: StatusState,
    pub target_url: String,
    pub description: String,
}

impl StatusUpdate {
    pub fn new(state: StatusState, target_url: impl Into<String>) -> Self {
        Self {
            state,
            target_url: target_url.into(),
            description: state.description().to_string(),
        }
    }
}

/// Reports pending/success/failure for the commit its handle is bound to.
///
/// Diagnostics are emitted inside the span handed in at construction.
pub struct StatusReporter<A> {
    api: A,
    coordinate: RepositoryCoordinate,
    web_host: String,
    span: Span,
}

impl<A: StatusApi> StatusReporter<A> {
    pub fn new(api: A, span: Span) -> Self {
        let coordinate = api.coordinate().clone();
        Self {
            api,
            coordinate,
            web_host: DEFAULT_WEB_HOST.to_string(),
            span,
        }
    }

    pub fn with_web_host(mut self, web_host: impl Into<String>) -> Self {
        self.web_host = web_host.into();
        self
    }

    pub fn coordinate(&self) -> &RepositoryCoordinate {
        &self.coordinate
    }

    /// Web view of the commit, used when no target URL is given.
    pub fn commit_url(&self) -> String {
        format!(
            "https://{}/{}/{}/commit/{}",
            self.web_host,
            self.coordinate.owner(),
            self.coordinate.repo(),
            self.coordinate.git_ref()
        )
    }

    pub async fn report_pending(&self) -> Result<()> {
        self.submit(StatusUpdate::new(StatusState::Pending, self.commit_url()))
            .await
    }

    pub async fn report_success(&self, target_url: &str) -> Result<()> {
        self.report_outcome(StatusState::Success, target_url).await
    }

    pub async fn report_failure(&self, target_url: &str) -> Result<()> {
        self.report_outcome(StatusState::Failure, target_url).await
    }

    async fn report_outcome(&self, state: StatusState, target_url: &str) -> Result<()> {
        let target = if target_url.is_empty() {
            self.commit_url()
        } else {
            target_url.to_string()
        };

        self.span
            .in_scope(|| info!(%state, "Reporting build outcome, target: {}", target));

        self.submit(StatusUpdate::new(state, target)).await
    }

    async fn submit(&self, update: StatusUpdate) -> Result<()> {
        self.api
            .create_status(&update)
            .instrument(self.span.clone())
            .await
    }
}
