use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Pull request state as reported by the GitHub REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
        }
    }
}

/// One item of the pull request listing endpoint.
/// Only the fields the digest needs are deserialized.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub state: PrState,
    #[serde(default)]
    pub draft: bool,
    /// API URL of the pull request's own detail resource
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

/// Full pull request resource, fetched once per PR for rendering.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestDetail {
    pub number: u64,
    pub title: String,
    pub state: PrState,
    pub user: User,
    /// Source branch
    pub head: BranchRef,
    /// Target branch
    pub base: BranchRef,
    pub html_url: String,
    /// URI template, e.g. `https://api.github.com/.../pulls/1/commits{/sha}`
    pub commits_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitEntry {
    pub commit: CommitBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitBody {
    pub message: String,
}

/// Represents a repository as `owner/repo`.
/// Extracted by parse_repo() in pr/mod.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
