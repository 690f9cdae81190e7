pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

#[async_trait]
pub trait RunListing: Send + Sync {
    /// Fetch one page (1-based) of runs matching `filter`, most recent first.
    ///
    /// Returns [`crate::error::AppError::RateLimited`] when the API rejected the
    /// request because the quota is exhausted.
    async fn list_runs_page(&self, filter: &RunFilter, page: u32) -> Result<RunPage>;
}
