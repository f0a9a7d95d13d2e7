pub mod classify;
pub mod types;

pub use types::{PullRequestDetail, PullRequestSummary, RepoSlug};

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::{Config, WindowField};
use types::CommitEntry;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid repository: {0}")]
    InvalidRepo(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Parse a repository reference into its owner and name.
///
/// Accepts `owner/repo` or `https://github.com/owner/repo` (a trailing
/// `.git` or extra path segments are ignored for the URL form).
pub fn parse_repo(input: &str) -> Result<RepoSlug, PrError> {
    let invalid = || PrError::InvalidRepo(input.to_string());
    let trimmed = input.trim();

    let (owner, repo) = if trimmed.contains("://") {
        let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
        if parsed.host_str() != Some("github.com") {
            return Err(invalid());
        }
        let segments: Vec<_> = parsed
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.len() < 2 {
            return Err(invalid());
        }
        (
            segments[0].to_string(),
            segments[1].trim_end_matches(".git").to_string(),
        )
    } else {
        let (owner, repo) = trimmed.split_once('/').ok_or_else(invalid)?;
        if repo.contains('/') {
            return Err(invalid());
        }
        (owner.to_string(), repo.to_string())
    };

    let valid = |part: &str| !part.is_empty() && !part.chars().any(char::is_whitespace);
    if !valid(&owner) || !valid(&repo) {
        return Err(invalid());
    }

    Ok(RepoSlug { owner, repo })
}

/// Paging and window settings for the listing call.
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub since: DateTime<Utc>,
    pub window_field: WindowField,
    pub per_page: u8,
    pub max_pages: u32,
}

/// Extract the `rel="next"` target from a GitHub `Link` header.
pub fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| param.trim() == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}

/// Thin GitHub REST client. Every request carries the token header and the
/// v3 JSON media type; non-2xx statuses become errors.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, PrError> {
        let token = config.github_token().ok_or(PrError::MissingToken)?;
        Ok(Self::new(config.github.api_base.clone(), token))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, PrError> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "pr-digest")
            .send()
            .await?
            .error_for_status()?;
        Ok(response)
    }

    /// Read pages starting at `first`, following `Link: rel="next"` until it
    /// runs out, `max_pages` is reached, or `stop` says the last page read
    /// was enough.
    async fn get_paginated<T, F>(
        &self,
        first: Url,
        max_pages: u32,
        stop: F,
    ) -> Result<Vec<T>, PrError>
    where
        T: DeserializeOwned,
        F: Fn(&[T]) -> bool,
    {
        let max_pages = max_pages.max(1);
        let mut items = Vec::new();
        let mut url = first;
        let mut pages = 0;

        loop {
            pages += 1;
            let response = self.get(url.as_str()).await?;
            let next = next_page_url(response.headers());
            let page: Vec<T> = response.json().await?;
            debug!(page = pages, items = page.len(), "received page");

            let done = stop(&page);
            items.extend(page);
            if done {
                break;
            }

            match next {
                None => break,
                Some(_) if pages >= max_pages => {
                    warn!(max_pages, "page limit reached, remaining results skipped");
                    break;
                }
                Some(next) => url = next,
            }
        }

        Ok(items)
    }

    /// List the repository's pull requests, newest first, keeping only
    /// those inside the window.
    ///
    /// `since` is sent for completeness, but the pulls endpoint ignores it,
    /// so the window is applied here after fetching.
    #[instrument(skip(self, slug, options), fields(repo = %slug))]
    pub async fn fetch_pull_requests(
        &self,
        slug: &RepoSlug,
        options: &ListOptions,
    ) -> Result<Vec<PullRequestSummary>, PrError> {
        let endpoint = format!("{}/repos/{}/{}/pulls", self.api_base, slug.owner, slug.repo);
        let mut url = Url::parse(&endpoint).map_err(|_| PrError::InvalidUrl(endpoint.clone()))?;
        url.query_pairs_mut()
            .append_pair("state", "all")
            .append_pair("sort", "created")
            .append_pair("direction", "desc")
            .append_pair("since", &options.since.date_naive().to_string())
            .append_pair("per_page", &options.per_page.to_string());

        let since = options.since;
        let by_created = options.window_field == WindowField::Created;
        let fetched = self
            .get_paginated(url, options.max_pages, |page: &[PullRequestSummary]| {
                by_created && page.last().is_some_and(|pr| pr.created_at < since)
            })
            .await?;
        let fetched_count = fetched.len();

        let kept = classify::within_window(fetched, since, options.window_field);
        debug!(fetched = fetched_count, kept = kept.len(), "applied window");
        Ok(kept)
    }

    #[instrument(skip(self, summary), fields(pr = summary.number))]
    pub async fn fetch_detail(
        &self,
        summary: &PullRequestSummary,
    ) -> Result<PullRequestDetail, PrError> {
        let detail = self.get(&summary.url).await?.json::<PullRequestDetail>().await?;
        debug!(title = %detail.title, "received PR detail");
        Ok(detail)
    }

    /// Commit messages of a PR in API order.
    #[instrument(skip(self, detail), fields(pr = detail.number))]
    pub async fn fetch_commit_messages(
        &self,
        detail: &PullRequestDetail,
    ) -> Result<Vec<String>, PrError> {
        let commits_url = detail.commits_url.replace("{/sha}", "");
        let mut url =
            Url::parse(&commits_url).map_err(|_| PrError::InvalidUrl(commits_url.clone()))?;
        url.query_pairs_mut().append_pair("per_page", "100");

        let commits: Vec<CommitEntry> = self.get_paginated(url, u32::MAX, |_| false).await?;
        debug!(commits = commits.len(), "received commits");
        Ok(commits.into_iter().map(|entry| entry.commit.message).collect())
    }
}
