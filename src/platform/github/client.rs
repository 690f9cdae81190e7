use async_trait::async_trait;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;

use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::RunListing;

use super::mapper::{self, WorkflowRunsResponse};

pub struct GitHubPlatform {
    client: Octocrab,
    per_page: u8,
}

impl GitHubPlatform {
    pub fn new(token: &str, api_url: &str, per_page: u8) -> Result<Self> {
        let client = Octocrab::builder()
            .base_uri(api_url)
            .map_err(|e| AppError::Config(format!("Invalid GitHub API URL {api_url}: {e}")))?
            .personal_token(token.to_string())
            // Retries and backoff belong to the poll loop only
            .add_retry_config(RetryConfig::None)
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self { client, per_page })
    }

    fn runs_route(&self, filter: &RunFilter, page: u32) -> String {
        let mut query = vec![
            format!("per_page={}", self.per_page),
            format!("page={page}"),
        ];
        for (key, value) in [
            ("head_sha", &filter.head_sha),
            ("branch", &filter.branch),
            ("event", &filter.event),
        ] {
            if let Some(value) = value {
                query.push(format!("{key}={}", urlencoding::encode(value)));
            }
        }

        format!(
            "/repos/{}/{}/actions/workflows/{}/runs?{}",
            urlencoding::encode(&filter.owner),
            urlencoding::encode(&filter.repo),
            urlencoding::encode(&filter.workflow_id),
            query.join("&")
        )
    }
}

#[async_trait]
impl RunListing for GitHubPlatform {
    async fn list_runs_page(&self, filter: &RunFilter, page: u32) -> Result<RunPage> {
        let route = self.runs_route(filter, page);
        tracing::debug!(route = %route, "Listing workflow runs");

        let response = self.client._get(route).await?;

        let status = response.status().as_u16();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let remaining = header("x-ratelimit-remaining");
        let reset = header("x-ratelimit-reset");

        if !response.status().is_success() {
            let body = self.client.body_to_string(response).await.unwrap_or_default();
            return Err(classify_failure(status, remaining.as_deref(), reset, &body));
        }

        let body = self.client.body_to_string(response).await?;
        let listing: WorkflowRunsResponse = serde_json::from_str(&body)?;

        Ok(mapper::map_runs_page(listing, page, self.per_page))
    }
}

/// Sort a failed listing response into a rate-limit rejection or a fatal API error.
///
/// Only 403/429 responses that also report zero remaining quota count as rate limiting.
pub fn classify_failure(
    status: u16,
    remaining: Option<&str>,
    reset: Option<String>,
    body: &str,
) -> AppError {
    let quota_exhausted = remaining.map(str::trim) == Some("0");
    if matches!(status, 403 | 429) && quota_exhausted {
        return AppError::RateLimited { status, reset };
    }

    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    AppError::GitHubApi(format!("Listing workflow runs returned {status}: {message}"))
}
