//! Handles one webhook delivery end to end: route, filter, report pending,
//! build, report the outcome.

use tracing::{error, info, info_span};

use crate::RelayConfig;
use crate::build::run_build;
use crate::client::{RepositoryCoordinate, StatusApi};
use crate::error::Result;
use crate::filter::is_branch_allowed;
use crate::payload::EventPayload;
use crate::status::StatusReporter;
use crate::webhook::RoutingInfo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Ping,
    ActionFiltered(String),
    BranchFiltered(String),
    /// Neither a pull request status target nor a pushed head commit.
    NoCommit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Skipped(SkipReason),
    Built { success: bool },
}

/// Pull request events report to the commit their status link names; other
/// events report to the configured repository at the pushed head.
fn resolve_coordinate(config: &RelayConfig, routing: &RoutingInfo) -> Option<RepositoryCoordinate> {
    let target = &routing.status_target;
    if !target.is_empty() {
        return Some(RepositoryCoordinate::new(
            target.owner.clone(),
            target.repo.clone(),
            target.sha.clone(),
        ));
    }

    routing.head_sha.as_ref().map(|sha| {
        RepositoryCoordinate::new(
            config.github.owner.clone(),
            config.github.repo.clone(),
            sha.clone(),
        )
    })
}

/// The branch the branch list applies to. Pull requests carry no top-level
/// `ref`, so they are matched on the branch they target, and are not
/// branch-filtered when the payload does not name one.
fn filtered_branch(routing: &RoutingInfo) -> Option<&str> {
    if routing.status_target.is_empty() {
        Some(&routing.branch)
    } else {
        routing.base_branch.as_deref()
    }
}

/// Processes one event. `make_client` is only called once the event is known
/// to need status reports.
pub async fn handle_event<A, F>(
    config: &RelayConfig,
    event: &str,
    payload: &EventPayload,
    make_client: F,
) -> Result<RelayOutcome>
where
    A: StatusApi,
    F: FnOnce(RepositoryCoordinate) -> Result<A>,
{
    if event == "ping" {
        info!("Received ping event");
        return Ok(RelayOutcome::Skipped(SkipReason::Ping));
    }

    let routing = RoutingInfo::from_payload(payload)?;
    info!(
        "Received {:?} event: action={:?} branch={:?}",
        event, routing.action, routing.branch
    );

    if !config.actions.is_eligible(&routing.action) {
        info!("Action {:?} filtered out", routing.action);
        return Ok(RelayOutcome::Skipped(SkipReason::ActionFiltered(
            routing.action,
        )));
    }

    if let Some(branch) = filtered_branch(&routing) {
        if !is_branch_allowed(branch, &config.branches) {
            info!("Branch {:?} not configured", branch);
            return Ok(RelayOutcome::Skipped(SkipReason::BranchFiltered(
                branch.to_string(),
            )));
        }
    }

    let Some(coordinate) = resolve_coordinate(config, &routing) else {
        info!("No commit to report a status for");
        return Ok(RelayOutcome::Skipped(SkipReason::NoCommit));
    };

    let span = info_span!(
        "commit_status",
        owner = coordinate.owner(),
        repo = coordinate.repo(),
        git_ref = coordinate.git_ref()
    );
    let reporter =
        StatusReporter::new(make_client(coordinate)?, span).with_web_host(&config.github.web_host);

    reporter.report_pending().await?;

    let env = [
        ("RELAY_BRANCH", routing.branch.as_str()),
        ("RELAY_ACTION", routing.action.as_str()),
        ("RELAY_SHA", reporter.coordinate().git_ref()),
    ];
    let target_url = config.build.target_url.as_str();

    let outcome = match run_build(&config.build.workdir, &config.build.run_script, &env).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Build could not run: {}", e);
            reporter.report_failure(target_url).await?;
            return Err(e);
        }
    };

    if outcome.success {
        reporter.report_success(target_url).await?;
    } else {
        reporter.report_failure(target_url).await?;
    }

    Ok(RelayOutcome::Built {
        success: outcome.success,
    })
}
