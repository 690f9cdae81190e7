use serde::{Deserialize, Deserializer};

use crate::error::{AppError, Result};

/// Raw inputs as read from file, environment and command line.
///
/// Values are validated and normalized by [`crate::workflow::filter::resolve`].
#[derive(Deserialize, Clone)]
pub struct AppConfig {
    pub token: String,
    pub workflow: String,
    pub repo: String,
    pub wait_interval: u64,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(deserialize_with = "deserialize_conclusions")]
    pub allowed_conclusions: Vec<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_per_page")]
    pub per_page: u8,
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("token", &"[REDACTED]")
            .field("workflow", &self.workflow)
            .field("repo", &self.repo)
            .field("wait_interval", &self.wait_interval)
            .field("sha", &self.sha)
            .field("branch", &self.branch)
            .field("event", &self.event)
            .field("allowed_conclusions", &self.allowed_conclusions)
            .field("api_url", &self.api_url)
            .field("per_page", &self.per_page)
            .finish()
    }
}

/// Values given on the command line. These win over file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub token: Option<String>,
    pub workflow: Option<String>,
    pub repo: Option<String>,
    pub wait_interval: Option<u64>,
    pub sha: Option<String>,
    pub branch: Option<String>,
    pub event: Option<String>,
    pub allowed_conclusions: Vec<String>,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> u8 {
    100
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConclusionsInput {
    List(Vec<String>),
    Lines(String),
}

/// Accepts either a list or a newline-separated string, one conclusion per line.
fn deserialize_conclusions<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match ConclusionsInput::deserialize(deserializer)? {
        ConclusionsInput::List(items) => items,
        ConclusionsInput::Lines(text) => text.lines().map(str::to_string).collect(),
    };

    Ok(raw
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect())
}

impl AppConfig {
    pub fn load(config_path: Option<&str>, overrides: &Overrides) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Ambient Actions variables act as defaults
        for (key, var) in [
            ("token", "GITHUB_TOKEN"),
            ("repo", "GITHUB_REPOSITORY"),
            ("api_url", "GITHUB_API_URL"),
        ] {
            if let Ok(value) = std::env::var(var) {
                builder = builder
                    .set_default(key, value)
                    .map_err(|e| AppError::Config(e.to_string()))?;
            }
        }

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(
                config::File::with_name("workflow-waiter")
                    .required(false),
            );
        }

        // Environment variable overrides with WORKFLOW_WAITER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("WORKFLOW_WAITER")
                .try_parsing(true),
        );

        let conclusions = if overrides.allowed_conclusions.is_empty() {
            None
        } else {
            Some(overrides.allowed_conclusions.join("\n"))
        };

        builder = builder
            .set_override_option("token", overrides.token.clone())
            .and_then(|b| b.set_override_option("workflow", overrides.workflow.clone()))
            .and_then(|b| b.set_override_option("repo", overrides.repo.clone()))
            .and_then(|b| b.set_override_option("wait_interval", overrides.wait_interval))
            .and_then(|b| b.set_override_option("sha", overrides.sha.clone()))
            .and_then(|b| b.set_override_option("branch", overrides.branch.clone()))
            .and_then(|b| b.set_override_option("event", overrides.event.clone()))
            .and_then(|b| b.set_override_option("allowed_conclusions", conclusions))
            .map_err(|e| AppError::Config(e.to_string()))?;

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("token must not be empty".to_string()));
        }
        if self.allowed_conclusions.is_empty() {
            return Err(AppError::Config(
                "allowed_conclusions must list at least one conclusion".to_string(),
            ));
        }
        if !(1..=100).contains(&self.per_page) {
            return Err(AppError::Config(format!(
                "per_page must be between 1 and 100, got {}",
                self.per_page
            )));
        }
        Ok(())
    }
}
