use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use workflow_waiter::config::{AppConfig, Overrides};
use workflow_waiter::context::TriggerContext;
use workflow_waiter::platform::github::GitHubPlatform;
use workflow_waiter::report::{self, ActionsReporter};
use workflow_waiter::shutdown::wait_for_shutdown;
use workflow_waiter::sleeper::TokioSleeper;
use workflow_waiter::workflow::filter;
use workflow_waiter::workflow::reconcile::Reconciler;
use workflow_waiter::workflow::types::PollOutcome;

#[derive(Parser)]
#[command(
    name = "workflow-waiter",
    about = "Wait for a GitHub Actions workflow run to complete"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// GitHub token (defaults to GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Workflow id or file name, e.g. ci.yml
    #[arg(long)]
    workflow: Option<String>,

    /// Repository as owner/name (defaults to GITHUB_REPOSITORY)
    #[arg(long)]
    repo: Option<String>,

    /// Seconds between polls, at least 5
    #[arg(long)]
    wait_interval: Option<u64>,

    /// Commit to filter on, or "auto" to use the triggering commit
    #[arg(long)]
    sha: Option<String>,

    #[arg(long)]
    branch: Option<String>,

    #[arg(long)]
    event: Option<String>,

    /// Conclusion that counts as passing; repeat for several
    #[arg(long = "allowed-conclusion")]
    allowed_conclusions: Vec<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            token: self.token.clone(),
            workflow: self.workflow.clone(),
            repo: self.repo.clone(),
            wait_interval: self.wait_interval,
            sha: self.sha.clone(),
            branch: self.branch.clone(),
            event: self.event.clone(),
            allowed_conclusions: self.allowed_conclusions.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries workflow commands
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let reporter = ActionsReporter::from_env();
    let result = wait(&cli, &reporter).await;
    let code = report::finish(&result, &reporter)?;

    Ok(ExitCode::from(code))
}

async fn wait(cli: &Cli, reporter: &ActionsReporter) -> anyhow::Result<PollOutcome> {
    let config = AppConfig::load(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;
    tracing::debug!(config = ?config, "Loaded configuration");

    let context = TriggerContext::from_env();
    let plan = filter::resolve(&config, &context)?;

    let platform = GitHubPlatform::new(&config.token, &config.api_url, config.per_page)?;
    let sleeper = TokioSleeper;
    let mut reconciler = Reconciler::new(&platform, &sleeper, reporter, &plan);

    tokio::select! {
        outcome = reconciler.run() => Ok(outcome?),
        signal = wait_for_shutdown() => {
            tracing::warn!(signal, "Shutdown requested before the run completed");
            anyhow::bail!("Cancelled while waiting for workflow run")
        }
    }
}
