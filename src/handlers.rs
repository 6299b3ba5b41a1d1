use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
};
use commit_status_relay::SharedState;
use commit_status_relay::client::GithubClient;
use commit_status_relay::error::RelayError;
use commit_status_relay::payload::EventPayload;
use commit_status_relay::relay::{RelayOutcome, handle_event};
use tracing::{self, error, info, warn};

pub async fn root() -> &'static str {
    "commit-status-relay is running"
}

fn status_for_error(err: &RelayError) -> StatusCode {
    match err {
        RelayError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
        RelayError::Transport(_) => StatusCode::BAD_GATEWAY,
        RelayError::ConfigError(_)
        | RelayError::BuildError(_)
        | RelayError::IoError(_)
        | RelayError::TomlParseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handles the GitHub webhook POST request.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let event = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let payload = match EventPayload::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            info!("Could not parse JSON body: {:?}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let config = &state.config;
    let token = match config.token() {
        Ok(token) => token,
        Err(e) => {
            error!("{}", e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let _guard = state.build_lock.lock().await;
    let result = handle_event(config, event, &payload, |coordinate| {
        GithubClient::new(coordinate, token, &config.github.api)
    })
    .await;

    match result {
        Ok(RelayOutcome::Skipped(reason)) => {
            info!("Event skipped: {:?}", reason);
            StatusCode::NO_CONTENT
        }
        Ok(RelayOutcome::Built { success }) => {
            info!("Build finished, success = {}", success);
            StatusCode::OK
        }
        Err(e) => {
            let code = status_for_error(&e);
            if code.is_client_error() {
                warn!("Rejected {:?} event: {}", event, e);
            } else {
                error!("Failed to relay {:?} event: {}", event, e);
            }
            code
        }
    }
}
