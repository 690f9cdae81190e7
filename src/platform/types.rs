use std::fmt;

/// Query for one workflow's runs. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFilter {
    pub owner: String,
    pub repo: String,
    /// Numeric workflow id or workflow file name (e.g. `ci.yml`).
    pub workflow_id: String,
    pub head_sha: Option<String>,
    pub branch: Option<String>,
    pub event: Option<String>,
}

/// Lifecycle state of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    /// Any other value GitHub reports (`waiting`, `requested`, `pending`, ...).
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Other(s) => s,
        }
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            _ => RunStatus::Other(s),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed run, as of the current listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub id: u64,
    pub status: RunStatus,
    pub conclusion: Option<String>,
}

/// A single page of a run listing.
#[derive(Debug, Clone, Default)]
pub struct RunPage {
    pub runs: Vec<RunSummary>,
    pub has_next: bool,
}
