use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    error::FetchError,
    types::{Forge, PullRequest, SearchSpec},
};

/// Fetches closed pull requests and keeps those merged after the threshold.
///
/// Issues exactly one request through the forge. Errors are returned as-is
/// without filtering anything. On success the order the forge returned
/// (most recently updated first) is preserved.
pub async fn fetch_merged_pull_requests<F>(
    spec: &SearchSpec,
    forge: &F,
) -> Result<Vec<PullRequest>, FetchError>
where
    F: Forge + ?Sized,
{
    let all_prs = forge.fetch_closed_pull_requests(spec).await?;
    let fetched = all_prs.len();

    let merged = filter_merged_after(all_prs, spec.merged_after.cutoff());

    debug!(
        repo = %spec.repo,
        merged_after = %spec.merged_after,
        fetched,
        kept = merged.len(),
        "Filtered closed pull requests by merge date"
    );

    Ok(merged)
}

/// Keeps pull requests merged strictly after `cutoff`, in input order.
pub fn filter_merged_after<I>(prs: I, cutoff: DateTime<Utc>) -> Vec<PullRequest>
where
    I: IntoIterator<Item = PullRequest>,
{
    prs.into_iter()
        .filter(|pr| pr.merged_after(cutoff))
        .collect()
}
