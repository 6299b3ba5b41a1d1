//! Runs the configured build command for one event

use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::process::Command;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{RelayError, Result};

/// Maximum size for captured build output before truncation (1MB)
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Result of one build run.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub id: String,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

fn capture(bytes: &[u8]) -> String {
    let mut output = String::from_utf8_lossy(bytes).into_owned();
    if output.len() > MAX_OUTPUT_SIZE {
        let mut end = MAX_OUTPUT_SIZE;
        while !output.is_char_boundary(end) {
            end -= 1;
        }
        output.truncate(end);
        output.push_str("\n... (output truncated)");
    }
    output
}

/// Runs `script` (split by whitespace into command + args) inside `workdir`
/// with `env` added to the child's environment.
///
/// A command that runs and exits non-zero is an unsuccessful outcome, not an
/// error. Errors are reserved for commands that cannot be started.
pub async fn run_build(workdir: &Path, script: &str, env: &[(&str, &str)]) -> Result<BuildOutcome> {
    let mut parts = script.split_whitespace();
    let program = parts.next().ok_or_else(|| {
        let msg = "run_script is empty".to_string();
        error!("{}", msg);
        RelayError::ConfigError(msg)
    })?;
    let args: Vec<&str> = parts.collect();

    let id = Uuid::now_v7().to_string();
    let started_at = Utc::now();
    info!("[{}] Running (cwd = '{}'): {}", id, workdir.display(), script);

    let output = Command::new(program)
        .current_dir(workdir)
        .args(&args)
        .envs(env.iter().copied())
        .output()
        .await
        .map_err(|e| {
            error!("[{}] run_script failed to start: {}", id, e);
            RelayError::BuildError(format!("'{}' failed to start: {}", program, e))
        })?;

    let outcome = BuildOutcome {
        id,
        success: output.status.success(),
        stdout: capture(&output.stdout),
        stderr: capture(&output.stderr),
        started_at,
        finished_at: Utc::now(),
    };

    let elapsed = outcome.finished_at - outcome.started_at;
    if outcome.success {
        info!(
            "[{}] Build succeeded in {}ms, output:\n{}",
            outcome.id,
            elapsed.num_milliseconds(),
            outcome.stdout
        );
    } else {
        error!(
            "[{}] Build failed ({}) in {}ms:\n{}",
            outcome.id,
            output.status,
            elapsed.num_milliseconds(),
            outcome.stderr
        );
    }

    Ok(outcome)
}
