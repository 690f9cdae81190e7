use std::fmt;
use std::time::Duration;

use crate::platform::types::RunFilter;

/// Everything the poll loop needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct WaitPlan {
    pub filter: RunFilter,
    /// Pause between rounds. Also the floor for rate-limit backoff.
    pub interval: Duration,
    pub allowed_conclusions: Vec<String>,
}

/// Why a completed run is reported as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The API said `completed` but gave no conclusion.
    MissingConclusion,
    /// The conclusion is not in the allowed list.
    DisallowedConclusion(String),
}

/// Terminal answer of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Passed { run_id: u64, conclusion: String },
    Failed { run_id: u64, reason: FailureReason },
}

impl PollOutcome {
    pub fn run_id(&self) -> u64 {
        match self {
            PollOutcome::Passed { run_id, .. } | PollOutcome::Failed { run_id, .. } => *run_id,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, PollOutcome::Passed { .. })
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Passed { run_id, conclusion } => {
                write!(f, "Run#{run_id} is completed with conclusion: {conclusion}")
            }
            PollOutcome::Failed {
                run_id,
                reason: FailureReason::MissingConclusion,
            } => write!(f, "Run#{run_id} is completed without conclusion"),
            PollOutcome::Failed {
                run_id,
                reason: FailureReason::DisallowedConclusion(conclusion),
            } => write!(
                f,
                "Run#{run_id} is completed with disallowed conclusion: {conclusion}"
            ),
        }
    }
}
