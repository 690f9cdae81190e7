use std::time::Duration;

use crate::config::AppConfig;
use crate::context::TriggerContext;
use crate::error::{AppError, Result};
use crate::platform::types::RunFilter;

use super::types::WaitPlan;

/// Polling faster than this only burns API quota.
pub const MIN_WAIT_INTERVAL_SECS: u64 = 5;

/// Sentinel `sha` value asking to take the commit from the trigger context.
pub const AUTO_SHA: &str = "auto";

/// Turn raw configuration into the filter and pacing used for the whole run.
pub fn resolve(config: &AppConfig, context: &TriggerContext) -> Result<WaitPlan> {
    let (owner, repo) = split_repo(&config.repo)?;

    let workflow_id = config.workflow.trim();
    if workflow_id.is_empty() {
        return Err(AppError::Config("workflow must not be empty".to_string()));
    }

    let filter = RunFilter {
        owner,
        repo,
        workflow_id: workflow_id.to_string(),
        head_sha: resolve_sha(config.sha.as_deref(), context)?,
        branch: non_blank(config.branch.as_deref()),
        event: non_blank(config.event.as_deref()),
    };

    Ok(WaitPlan {
        filter,
        interval: clamp_interval(config.wait_interval),
        allowed_conclusions: config.allowed_conclusions.clone(),
    })
}

/// Split `owner/name`. Exactly one `/` with something on both sides.
pub fn split_repo(slug: &str) -> Result<(String, String)> {
    match slug.trim().split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(AppError::Config(format!(
            "Invalid repo '{slug}', expected owner/name"
        ))),
    }
}

pub fn clamp_interval(seconds: u64) -> Duration {
    Duration::from_secs(seconds.max(MIN_WAIT_INTERVAL_SECS))
}

/// Resolve the commit filter, expanding [`AUTO_SHA`] from the trigger context.
pub fn resolve_sha(raw: Option<&str>, context: &TriggerContext) -> Result<Option<String>> {
    let Some(sha) = non_blank(raw) else {
        return Ok(None);
    };

    if sha != AUTO_SHA {
        return Ok(Some(sha));
    }

    let resolved = context
        .pull_request_head_sha
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(context.sha.as_deref())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::Config(
                "sha is 'auto' but no pull request head or triggering commit is available"
                    .to_string(),
            )
        })?;

    tracing::info!(sha = resolved, "Resolved sha from trigger context");
    Ok(Some(resolved.to_string()))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
