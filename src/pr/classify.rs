use chrono::{DateTime, Utc};

use super::types::{PrState, PullRequestSummary};
use crate::config::WindowField;

/// Pull requests partitioned by state.
///
/// A closed PR that is still flagged as draft lands in both `closed` and
/// `draft`; every other PR lands in exactly one bucket.
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    pub opened: Vec<PullRequestSummary>,
    pub closed: Vec<PullRequestSummary>,
    pub draft: Vec<PullRequestSummary>,
}

impl Buckets {
    pub fn total(&self) -> usize {
        self.opened.len() + self.closed.len() + self.draft.len()
    }
}

/// Partition the fetched list, keeping API order within each bucket.
pub fn classify(pull_requests: &[PullRequestSummary]) -> Buckets {
    let mut buckets = Buckets::default();
    for pr in pull_requests {
        if pr.state == PrState::Open && !pr.draft {
            buckets.opened.push(pr.clone());
        }
        if pr.state == PrState::Closed {
            buckets.closed.push(pr.clone());
        }
        if pr.draft {
            buckets.draft.push(pr.clone());
        }
    }
    buckets
}

/// The timestamp a PR is judged by when applying the window.
pub fn window_timestamp(pr: &PullRequestSummary, field: WindowField) -> DateTime<Utc> {
    match field {
        WindowField::Created => pr.created_at,
        WindowField::Updated => pr.updated_at,
    }
}

/// Drop PRs whose window timestamp is before `cutoff`.
pub fn within_window(
    pull_requests: Vec<PullRequestSummary>,
    cutoff: DateTime<Utc>,
    field: WindowField,
) -> Vec<PullRequestSummary> {
    pull_requests
        .into_iter()
        .filter(|pr| window_timestamp(pr, field) >= cutoff)
        .collect()
}
