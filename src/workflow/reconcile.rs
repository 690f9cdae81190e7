//! The poll loop.
//!
//! Each round lists every page of runs for the filter. The first `completed`
//! run in listing order decides the outcome and ends the loop immediately.
//! Rounds without a completed run are followed by a pause of one interval.
//! A rate-limited round is restarted from the first page after backing off.
//!
//! The loop has no deadline of its own. The host bounds it, e.g. with a
//! job timeout or a shutdown signal.

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::platform::types::{RunPage, RunStatus, RunSummary};
use crate::platform::RunListing;
use crate::report::Reporter;
use crate::sleeper::Sleeper;

use super::backoff::rate_limit_wait_now;
use super::types::{FailureReason, PollOutcome, WaitPlan};

pub const RUN_ID_OUTPUT: &str = "run-id";
pub const RUN_CONCLUSION_OUTPUT: &str = "run-conclusion";

pub struct Reconciler<'a> {
    listing: &'a dyn RunListing,
    sleeper: &'a dyn Sleeper,
    reporter: &'a dyn Reporter,
    plan: &'a WaitPlan,
    /// Runs already logged as found. Observability only.
    seen: HashSet<u64>,
    /// Rounds that listed every page (or stopped on a completed run).
    rounds: u32,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        listing: &'a dyn RunListing,
        sleeper: &'a dyn Sleeper,
        reporter: &'a dyn Reporter,
        plan: &'a WaitPlan,
    ) -> Self {
        Self {
            listing,
            sleeper,
            reporter,
            plan,
            seen: HashSet::new(),
            rounds: 0,
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn seen_runs(&self) -> &HashSet<u64> {
        &self.seen
    }

    /// Poll until a run completes. `Err` only for unrecoverable failures.
    pub async fn run(&mut self) -> Result<PollOutcome> {
        let filter = &self.plan.filter;
        tracing::info!(
            owner = %filter.owner,
            repo = %filter.repo,
            workflow = %filter.workflow_id,
            head_sha = ?filter.head_sha,
            branch = ?filter.branch,
            event = ?filter.event,
            interval_secs = self.plan.interval.as_secs(),
            "Waiting for workflow run"
        );

        loop {
            match self.sweep().await {
                Ok(Some(outcome)) => {
                    self.rounds += 1;
                    return Ok(outcome);
                }
                Ok(None) => {
                    self.rounds += 1;
                    self.sleeper.sleep(self.plan.interval).await;
                }
                Err(AppError::RateLimited { status, reset }) => {
                    let wait = rate_limit_wait_now(self.plan.interval, reset.as_deref());
                    tracing::warn!(
                        status,
                        reset = ?reset,
                        wait_secs = wait.as_secs(),
                        "Rate limited while listing runs, retrying round after backoff"
                    );
                    self.sleeper.sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One full listing. `Some` once a completed run has been found.
    async fn sweep(&mut self) -> Result<Option<PollOutcome>> {
        let round = self.rounds + 1;
        let mut listed = 0usize;
        let mut page = 1u32;

        loop {
            let RunPage { runs, has_next } =
                self.listing.list_runs_page(&self.plan.filter, page).await?;
            listed += runs.len();

            for run in &runs {
                if let Some(outcome) = self.observe(run)? {
                    return Ok(Some(outcome));
                }
            }

            if !has_next {
                break;
            }
            page += 1;
        }

        if listed == 0 {
            tracing::info!(round, "No runs found in this check round, waiting for next round");
        } else {
            tracing::info!(round, runs = listed, "No completed run yet, waiting for next round");
        }

        Ok(None)
    }

    fn observe(&mut self, run: &RunSummary) -> Result<Option<PollOutcome>> {
        if self.seen.insert(run.id) {
            tracing::info!(run_id = run.id, status = %run.status, "Found run");
        } else {
            tracing::debug!(run_id = run.id, status = %run.status, "Run still listed");
        }

        if run.status != RunStatus::Completed {
            return Ok(None);
        }

        self.reporter.set_output(RUN_ID_OUTPUT, &run.id.to_string())?;

        let Some(conclusion) = run.conclusion.as_deref() else {
            return Ok(Some(PollOutcome::Failed {
                run_id: run.id,
                reason: FailureReason::MissingConclusion,
            }));
        };

        self.reporter.set_output(RUN_CONCLUSION_OUTPUT, conclusion)?;

        let outcome = if self.plan.allowed_conclusions.iter().any(|c| c == conclusion) {
            PollOutcome::Passed {
                run_id: run.id,
                conclusion: conclusion.to_string(),
            }
        } else {
            PollOutcome::Failed {
                run_id: run.id,
                reason: FailureReason::DisallowedConclusion(conclusion.to_string()),
            }
        };

        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::platform::types::RunFilter;
    use crate::test_utils::RecordingReporter;

    /// Replays scripted pages in order and records which pages were asked for.
    struct ScriptedListing {
        responses: Mutex<VecDeque<Result<RunPage>>>,
        requested_pages: Mutex<Vec<u32>>,
    }

    impl ScriptedListing {
        fn new(responses: Vec<Result<RunPage>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requested_pages: Mutex::new(Vec::new()),
            }
        }

        fn requested_pages(&self) -> Vec<u32> {
            self.requested_pages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RunListing for ScriptedListing {
        async fn list_runs_page(&self, _filter: &RunFilter, page: u32) -> Result<RunPage> {
            self.requested_pages.lock().unwrap().push(page);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::GitHubApi("script exhausted".to_string())))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn plan(allowed: &[&str]) -> WaitPlan {
        WaitPlan {
            filter: RunFilter {
                owner: "octo".to_string(),
                repo: "widgets".to_string(),
                workflow_id: "ci.yml".to_string(),
                head_sha: Some("abc123".to_string()),
                branch: None,
                event: None,
            },
            interval: Duration::from_secs(5),
            allowed_conclusions: allowed.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn run(id: u64, status: &str, conclusion: Option<&str>) -> RunSummary {
        RunSummary {
            id,
            status: RunStatus::from(status.to_string()),
            conclusion: conclusion.map(str::to_string),
        }
    }

    fn last_page(runs: Vec<RunSummary>) -> Result<RunPage> {
        Ok(RunPage {
            runs,
            has_next: false,
        })
    }

    fn more_pages(runs: Vec<RunSummary>) -> Result<RunPage> {
        Ok(RunPage {
            runs,
            has_next: true,
        })
    }

    fn output(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[tokio::test]
    async fn test_in_progress_then_success_passes_after_two_rounds() {
        let listing = ScriptedListing::new(vec![
            last_page(vec![run(42, "in_progress", None)]),
            last_page(vec![run(42, "completed", Some("success"))]),
        ]);
        let sleeper = RecordingSleeper::default();
        let reporter = RecordingReporter::default();
        let plan = plan(&["success"]);

        let mut reconciler = Reconciler::new(&listing, &sleeper, &reporter, &plan);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Passed {
                run_id: 42,
                conclusion: "success".to_string()
            }
        );
        assert_eq!(reconciler.rounds(), 2);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5)]);
        assert_eq!(
            reporter.outputs(),
            vec![output("run-id", "42"), output("run-conclusion", "success")]
        );
    }

    #[tokio::test]
    async fn test_first_completed_run_in_listing_order_wins() {
        let listing = ScriptedListing::new(vec![
            more_pages(vec![run(9, "queued", None), run(8, "in_progress", None)]),
            more_pages(vec![
                run(7, "completed", Some("failure")),
                run(6, "completed", Some("success")),
            ]),
            last_page(vec![run(5, "completed", Some("success"))]),
        ]);
        let sleeper = RecordingSleeper::default();
        let reporter = RecordingReporter::default();
        let plan = plan(&["success"]);

        let mut reconciler = Reconciler::new(&listing, &sleeper, &reporter, &plan);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                run_id: 7,
                reason: FailureReason::DisallowedConclusion("failure".to_string())
            }
        );
        assert!(outcome.to_string().contains("failure"));
        // Stops on page 2, page 3 is never requested
        assert_eq!(listing.requested_pages(), vec![1, 2]);
        assert!(sleeper.sleeps().is_empty());
        assert_eq!(
            reporter.outputs(),
            vec![output("run-id", "7"), output("run-conclusion", "failure")]
        );
        assert_eq!(reconciler.seen_runs().len(), 3);
    }

    #[tokio::test]
    async fn test_any_allowed_conclusion_passes() {
        let listing =
            ScriptedListing::new(vec![last_page(vec![run(3, "completed", Some("neutral"))])]);
        let sleeper = RecordingSleeper::default();
        let reporter = RecordingReporter::default();
        let plan = plan(&["success", "neutral"]);

        let outcome = Reconciler::new(&listing, &sleeper, &reporter, &plan)
            .run()
            .await
            .unwrap();

        assert!(outcome.is_passed());
        assert_eq!(outcome.run_id(), 3);
    }

    #[tokio::test]
    async fn test_completed_without_conclusion_fails_without_retry() {
        let listing = ScriptedListing::new(vec![
            last_page(vec![run(11, "completed", None)]),
            last_page(vec![run(11, "completed", Some("success"))]),
        ]);
        let sleeper = RecordingSleeper::default();
        let reporter = RecordingReporter::default();
        let plan = plan(&["success"]);

        let outcome = Reconciler::new(&listing, &sleeper, &reporter, &plan)
            .run()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                run_id: 11,
                reason: FailureReason::MissingConclusion
            }
        );
        assert!(outcome.to_string().contains("without conclusion"));
        assert_eq!(listing.requested_pages(), vec![1]);
        assert_eq!(reporter.outputs(), vec![output("run-id", "11")]);
    }

    #[tokio::test]
    async fn test_empty_rounds_keep_polling() {
        let listing = ScriptedListing::new(vec![
            last_page(vec![]),
            last_page(vec![]),
            last_page(vec![]),
            last_page(vec![run(1, "completed", Some("success"))]),
        ]);
        let sleeper = RecordingSleeper::default();
        let reporter = RecordingReporter::default();
        let plan = plan(&["success"]);

        let mut reconciler = Reconciler::new(&listing, &sleeper, &reporter, &plan);
        let outcome = reconciler.run().await.unwrap();

        assert!(outcome.is_passed());
        assert_eq!(reconciler.rounds(), 4);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5); 3]);
    }

    #[tokio::test]
    async fn test_rate_limit_restarts_round_from_first_page() {
        let reset = (chrono::Utc::now().timestamp() + 100).to_string();
        let listing = ScriptedListing::new(vec![
            more_pages(vec![run(2, "in_progress", None)]),
            Err(AppError::RateLimited {
                status: 403,
                reset: Some(reset),
            }),
            more_pages(vec![run(2, "in_progress", None)]),
            last_page(vec![run(1, "completed", Some("success"))]),
        ]);
        let sleeper = RecordingSleeper::default();
        let reporter = RecordingReporter::default();
        let plan = plan(&["success"]);

        let mut reconciler = Reconciler::new(&listing, &sleeper, &reporter, &plan);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome.run_id(), 1);
        assert_eq!(listing.requested_pages(), vec![1, 2, 1, 2]);
        // The rate-limited attempt is not a round
        assert_eq!(reconciler.rounds(), 1);

        let sleeps = sleeper.sleeps();
        assert_eq!(sleeps.len(), 1);
        assert!(sleeps[0] >= Duration::from_secs(100));
        assert!(sleeps[0] <= Duration::from_secs(102));
    }

    #[tokio::test]
    async fn test_rate_limit_without_reset_waits_one_interval() {
        let listing = ScriptedListing::new(vec![
            Err(AppError::RateLimited {
                status: 429,
                reset: None,
            }),
            Err(AppError::RateLimited {
                status: 429,
                reset: Some("not-a-number".to_string()),
            }),
            last_page(vec![run(1, "completed", Some("success"))]),
        ]);
        let sleeper = RecordingSleeper::default();
        let reporter = RecordingReporter::default();
        let plan = plan(&["success"]);

        let outcome = Reconciler::new(&listing, &sleeper, &reporter, &plan)
            .run()
            .await
            .unwrap();

        assert!(outcome.is_passed());
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5); 2]);
    }

    #[tokio::test]
    async fn test_other_errors_abort_the_loop() {
        let listing = ScriptedListing::new(vec![
            last_page(vec![run(2, "queued", None)]),
            Err(AppError::GitHubApi("Listing workflow runs returned 404: Not Found".to_string())),
            last_page(vec![run(2, "completed", Some("success"))]),
        ]);
        let sleeper = RecordingSleeper::default();
        let reporter = RecordingReporter::default();
        let plan = plan(&["success"]);

        let err = Reconciler::new(&listing, &sleeper, &reporter, &plan)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::GitHubApi(ref m) if m.contains("404")));
        assert_eq!(listing.requested_pages(), vec![1, 1]);
        assert!(reporter.outputs().is_empty());
    }
}
