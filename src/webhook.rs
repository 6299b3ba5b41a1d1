//! Routing metadata extracted from webhook payloads
//!
//! Events that simply do not carry a piece of metadata (a push has no pull
//! request, a pull request has no `created` flag) yield empty values. Values
//! of the wrong shape are reported as `MalformedPayload`.

use crate::error::{RelayError, Result};
use crate::payload::EventPayload;

/// Push events carry no `action` field; these flags stand in for one.
/// Evaluated in order, first `true` wins.
const ACTION_FLAGS: [(&str, &str); 3] = [
    ("created", "created"),
    ("deleted", "deleted"),
    ("forced", "forced"),
];

/// Segment positions of owner, repository and sha in
/// `https://<api-host>/repos/<owner>/<repo>/statuses/<sha>`.
const STATUS_HREF_OWNER: usize = 4;
const STATUS_HREF_REPO: usize = 5;
const STATUS_HREF_SHA: usize = 7;

/// The commit a pull request's statuses should be posted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTarget {
    pub owner: String,
    pub repo: String,
    pub sha: String,
}

impl StatusTarget {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_empty() && self.repo.is_empty() && self.sha.is_empty()
    }
}

/// Returns the branch name from `ref` (`refs/heads/<name>`), or an empty
/// string when there is no usable ref.
pub fn extract_branch(payload: &EventPayload) -> Result<String> {
    let Some(git_ref) = payload.root().str_field("ref")? else {
        return Ok(String::new());
    };

    let segments: Vec<&str> = git_ref.splitn(3, '/').collect();
    if segments.len() != 3 {
        return Ok(String::new());
    }

    Ok(segments[2].to_string())
}

/// Returns the event's action: the explicit `action` field when present,
/// otherwise the first push flag set to `true`, otherwise an empty string.
pub fn extract_action(payload: &EventPayload) -> Result<String> {
    let root = payload.root();

    if let Some(action) = root.str_field("action")? {
        return Ok(action.to_string());
    }

    for (flag, action) in ACTION_FLAGS {
        if root.bool_field(flag)?.unwrap_or(false) {
            return Ok(action.to_string());
        }
    }

    Ok(String::new())
}

/// Reads `pull_request._links.statuses.href` and splits it into the
/// owner, repository and commit sha it points at.
///
/// Payloads without a `pull_request` yield [`StatusTarget::empty`]. Once a
/// pull request is present the whole path is required, and an href with
/// fewer than eight `/`-separated segments is malformed.
pub fn extract_pull_request_status_target(payload: &EventPayload) -> Result<StatusTarget> {
    let Some(pull_request) = payload.root().field("pull_request")? else {
        return Ok(StatusTarget::empty());
    };

    let href_node = pull_request
        .required("_links")?
        .required("statuses")?
        .required("href")?;
    let href = href_node.as_str()?;

    let segments: Vec<&str> = href.split('/').collect();
    if segments.len() <= STATUS_HREF_SHA {
        return Err(RelayError::malformed(
            href_node.path(),
            "a statuses URL with at least 8 segments",
        ));
    }

    Ok(StatusTarget {
        owner: segments[STATUS_HREF_OWNER].to_string(),
        repo: segments[STATUS_HREF_REPO].to_string(),
        sha: segments[STATUS_HREF_SHA].to_string(),
    })
}

/// The pushed head commit (`after`), if the event has one. Branch deletions
/// report the all-zero sha, which names no commit.
pub fn extract_head_sha(payload: &EventPayload) -> Result<Option<String>> {
    Ok(payload
        .root()
        .str_field("after")?
        .filter(|sha| !sha.is_empty() && !sha.bytes().all(|b| b == b'0'))
        .map(String::from))
}

/// The branch a pull request targets (`pull_request.base.ref`), if given.
pub fn extract_pull_request_base_branch(payload: &EventPayload) -> Result<Option<String>> {
    let Some(pull_request) = payload.root().field("pull_request")? else {
        return Ok(None);
    };
    let Some(base) = pull_request.object_field("base")? else {
        return Ok(None);
    };
    Ok(base.str_field("ref")?.map(String::from))
}

/// Everything the relay needs to route one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingInfo {
    pub branch: String,
    pub action: String,
    pub status_target: StatusTarget,
    pub head_sha: Option<String>,
    pub base_branch: Option<String>,
}

impl RoutingInfo {
    pub fn from_payload(payload: &EventPayload) -> Result<Self> {
        Ok(Self {
            branch: extract_branch(payload)?,
            action: extract_action(payload)?,
            status_target: extract_pull_request_status_target(payload)?,
            head_sha: extract_head_sha(payload)?,
            base_branch: extract_pull_request_base_branch(payload)?,
        })
    }
}
