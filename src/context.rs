use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// What triggered the current pipeline job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerContext {
    /// Commit the job was triggered for (`GITHUB_SHA`).
    pub sha: Option<String>,
    /// Head commit of the associated pull request, if the event carries one.
    pub pull_request_head_sha: Option<String>,
}

/// The parts of the event payload we read. Any event with a `pull_request`
/// object (`pull_request`, `pull_request_target`, `pull_request_review`, ...)
/// matches.
#[derive(Debug, Deserialize)]
struct EventPayload {
    pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    head: HeadPayload,
}

#[derive(Debug, Deserialize)]
struct HeadPayload {
    sha: Option<String>,
}

impl TriggerContext {
    /// Read the context from a GitHub Actions job environment.
    ///
    /// Never fails: a missing or unreadable payload just leaves fields unset.
    pub fn from_env() -> Self {
        let sha = std::env::var("GITHUB_SHA").ok().filter(|s| !s.is_empty());

        let pull_request_head_sha = match std::env::var("GITHUB_EVENT_PATH") {
            Ok(path) if !path.is_empty() => match Self::read_pull_request_head(Path::new(&path)) {
                Ok(head) => head,
                Err(e) => {
                    tracing::debug!(path = %path, error = %e, "Could not read event payload");
                    None
                }
            },
            _ => None,
        };

        Self {
            sha,
            pull_request_head_sha,
        }
    }

    fn read_pull_request_head(path: &Path) -> Result<Option<String>> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse_pull_request_head(&raw)
    }

    fn parse_pull_request_head(raw: &str) -> Result<Option<String>> {
        let payload: EventPayload = serde_json::from_str(raw)?;
        Ok(payload
            .pull_request
            .and_then(|pr| pr.head.sha)
            .filter(|sha| !sha.is_empty()))
    }
}
