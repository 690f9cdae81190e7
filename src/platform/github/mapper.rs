use serde::Deserialize;

use crate::platform::types::{RunPage, RunStatus, RunSummary};

/// Body of `GET /repos/{owner}/{repo}/actions/workflows/{id}/runs`.
#[derive(Debug, Deserialize)]
pub struct WorkflowRunsResponse {
    pub total_count: u64,
    pub workflow_runs: Vec<WorkflowRunPayload>,
}

/// The subset of a workflow run object the waiter looks at.
#[derive(Debug, Deserialize)]
pub struct WorkflowRunPayload {
    pub id: u64,
    pub status: Option<String>,
    pub conclusion: Option<String>,
}

pub fn map_run(run: WorkflowRunPayload) -> RunSummary {
    RunSummary {
        id: run.id,
        status: RunStatus::from(run.status.unwrap_or_default()),
        conclusion: run.conclusion.filter(|c| !c.is_empty()),
    }
}

/// Map one listing response to a page, deciding whether another page follows.
pub fn map_runs_page(response: WorkflowRunsResponse, page: u32, per_page: u8) -> RunPage {
    let fetched_so_far = u64::from(page) * u64::from(per_page);
    let has_next = !response.workflow_runs.is_empty() && fetched_so_far < response.total_count;

    RunPage {
        runs: response.workflow_runs.into_iter().map(map_run).collect(),
        has_next,
    }
}
