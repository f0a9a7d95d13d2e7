use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

use crate::config::DigestConfig;
use crate::mail::{MailError, Mailer};
use crate::pr::classify::{self, Buckets};
use crate::pr::{GitHubClient, ListOptions, PrError, PullRequestSummary, RepoSlug};
use crate::report::{self, render, ComposeOptions, DigestSections, EmailMessage, ReportError};
use std::path::Path;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Reporting window of {0} days reaches past the earliest representable date")]
    InvalidWindow(u32),

    #[error(transparent)]
    GitHub(#[from] PrError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Start of the reporting window.
pub fn window_start(now: DateTime<Utc>, window_days: u32) -> Result<DateTime<Utc>, DigestError> {
    TimeDelta::try_days(i64::from(window_days))
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or(DigestError::InvalidWindow(window_days))
}

/// Fetch, classify, enrich and compose the digest for one repository.
///
/// Requests run one after another: the listing pages first, then the detail
/// and commit list of every PR in bucket order. The first failed request
/// aborts the run before anything is composed.
pub async fn build_digest(
    client: &GitHubClient,
    slug: &RepoSlug,
    config: &DigestConfig,
    now: DateTime<Utc>,
) -> Result<EmailMessage, DigestError> {
    let options = ListOptions {
        since: window_start(now, config.window_days)?,
        window_field: config.window_field,
        per_page: config.per_page,
        max_pages: config.max_pages,
    };

    info!(since = %options.since, "fetching pull requests");
    let pull_requests = client.fetch_pull_requests(slug, &options).await?;

    let buckets: Buckets = classify::classify(&pull_requests);
    info!(
        opened = buckets.opened.len(),
        closed = buckets.closed.len(),
        draft = buckets.draft.len(),
        total = buckets.total(),
        "classified pull requests"
    );

    let sections = DigestSections {
        opened: enrich(client, &buckets.opened)
            .instrument(info_span!("enrich", bucket = "opened"))
            .await?,
        closed: enrich(client, &buckets.closed)
            .instrument(info_span!("enrich", bucket = "closed"))
            .await?,
        draft: enrich(client, &buckets.draft)
            .instrument(info_span!("enrich", bucket = "draft"))
            .await?,
    };

    let compose_options = ComposeOptions {
        window_days: config.window_days,
        separator: config.join_style.separator(),
        signature: &config.signature,
    };
    Ok(report::compose(slug, &sections, &compose_options))
}

async fn enrich(
    client: &GitHubClient,
    pull_requests: &[PullRequestSummary],
) -> Result<Vec<String>, PrError> {
    let mut blocks = Vec::with_capacity(pull_requests.len());
    for summary in pull_requests {
        let detail = client.fetch_detail(summary).await?;
        let messages = client.fetch_commit_messages(&detail).await?;
        debug!(pr = detail.number, commits = messages.len(), "rendering PR block");
        blocks.push(render::render_pr_block(&detail, &messages));
    }
    Ok(blocks)
}

/// Build the digest, print it (and write it to `output_path`), then hand it
/// to `mailer` when one is given.
pub async fn run(
    client: &GitHubClient,
    slug: &RepoSlug,
    config: &DigestConfig,
    now: DateTime<Utc>,
    output_path: Option<&Path>,
    mailer: Option<&dyn Mailer>,
) -> Result<EmailMessage, DigestError> {
    let message = build_digest(client, slug, config, now).await?;
    report::output(&message, output_path)?;
    if let Some(mailer) = mailer {
        info!("sending digest email");
        mailer.send(&message).await?;
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn slug() -> RepoSlug {
        RepoSlug {
            owner: "octo".to_string(),
            repo: "widgets".to_string(),
        }
    }

    fn pr_path(number: u64) -> String {
        format!("/repos/octo/widgets/pulls/{number}")
    }

    /// Mount the listing, detail and commit endpoints for three PRs:
    /// #1 open, #2 closed, #3 open draft.
    async fn mount_repo(server: &MockServer) {
        let prs = [(1, "open", false), (2, "closed", false), (3, "open", true)];

        let listing: Vec<_> = prs
            .iter()
            .map(|(number, state, draft)| {
                json!({
                    "number": number,
                    "state": state,
                    "draft": draft,
                    "url": format!("{}{}", server.uri(), pr_path(*number)),
                    "created_at": "2026-10-15T08:00:00Z",
                    "updated_at": "2026-10-16T08:00:00Z"
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing))
            .mount(server)
            .await;

        for (number, state, _) in prs {
            Mock::given(method("GET"))
                .and(path(pr_path(number)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "number": number,
                    "title": format!("Change number {number}"),
                    "state": state,
                    "user": { "login": "alice" },
                    "head": { "ref": format!("feature-{number}") },
                    "base": { "ref": "main" },
                    "html_url": format!("https://github.com/octo/widgets/pull/{number}"),
                    "commits_url": format!("{}{}/commits{{/sha}}", server.uri(), pr_path(number))
                })))
                .expect(1)
                .mount(server)
                .await;
            Mock::given(method("GET"))
                .and(path(format!("{}/commits", pr_path(number))))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                    { "commit": { "message": "fix bug" } },
                    { "commit": { "message": "add test" } }
                ])))
                .expect(1)
                .mount(server)
                .await;
        }
    }

    fn section<'a>(body: &'a str, header: &str, next: &str) -> &'a str {
        let start = body.find(header).unwrap();
        let end = body[start..].find(next).map_or(body.len(), |i| start + i);
        &body[start..end]
    }

    #[test]
    fn test_window_start() {
        let start = window_start(now(), 7).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 11, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_window_start_out_of_range() {
        let err = window_start(now(), 200_000_000).unwrap_err();
        assert!(matches!(err, DigestError::InvalidWindow(200_000_000)));
        assert!(window_start(now(), u32::MAX).is_err());
    }

    #[tokio::test]
    async fn test_oversized_window_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri(), "secret");
        let config = DigestConfig {
            window_days: 200_000_000,
            ..DigestConfig::default()
        };
        let result = build_digest(&client, &slug(), &config, now()).await;
        assert!(matches!(result, Err(DigestError::InvalidWindow(_))));
    }

    #[tokio::test]
    async fn test_end_to_end_digest() {
        let server = MockServer::start().await;
        mount_repo(&server).await;

        let client = GitHubClient::new(server.uri(), "secret");
        let mailer = RecordingMailer::default();
        let message = run(
            &client,
            &slug(),
            &DigestConfig::default(),
            now(),
            None,
            Some(&mailer),
        )
        .await
        .unwrap();

        assert_eq!(message.subject, "Pull Request Summary - octo/widgets");

        let opened = section(&message.body, "- Opened PRs (1):", "- Closed PRs");
        let closed = section(&message.body, "- Closed PRs (1):", "- Draft PRs");
        let draft = section(&message.body, "- Draft PRs (1):", "Thank you,");
        assert!(opened.contains("PR #1\n"));
        assert!(closed.contains("PR #2\n"));
        assert!(closed.contains("Status: closed"));
        assert!(draft.contains("PR #3\n"));
        assert!(!opened.contains("PR #2") && !opened.contains("PR #3"));
        assert!(opened.contains("Commit Messages: ['fix bug', 'add test']"));
        assert!(opened.contains("PR Branches: feature-1 --> main"));

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], message);
    }

    #[tokio::test]
    async fn test_two_blocks_joined_with_literal_backslash_n() {
        let server = MockServer::start().await;
        let listing: Vec<_> = [1, 2]
            .iter()
            .map(|number| {
                json!({
                    "number": number,
                    "state": "open",
                    "draft": false,
                    "url": format!("{}{}", server.uri(), pr_path(*number)),
                    "created_at": "2026-10-15T08:00:00Z",
                    "updated_at": "2026-10-15T08:00:00Z"
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing))
            .mount(&server)
            .await;
        for number in [1, 2] {
            Mock::given(method("GET"))
                .and(path(pr_path(number)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "number": number,
                    "title": "t",
                    "state": "open",
                    "user": { "login": "bob" },
                    "head": { "ref": "h" },
                    "base": { "ref": "main" },
                    "html_url": "https://github.com/octo/widgets/pull/1",
                    "commits_url": format!("{}{}/commits", server.uri(), pr_path(number))
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path(format!("{}/commits", pr_path(number))))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;
        }

        let client = GitHubClient::new(server.uri(), "secret");
        let message = build_digest(&client, &slug(), &DigestConfig::default(), now())
            .await
            .unwrap();
        assert!(message.body.contains("- Opened PRs (2):"));
        assert!(message.body.contains("Commit Messages: []\n    \\n\n        PR #2"));
    }

    #[tokio::test]
    async fn test_old_pull_requests_are_left_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "number": 1,
                "state": "closed",
                "draft": false,
                "url": format!("{}{}", server.uri(), pr_path(1)),
                "created_at": "2025-01-01T08:00:00Z",
                "updated_at": "2025-01-02T08:00:00Z"
            }])))
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri(), "secret");
        let message = build_digest(&client, &slug(), &DigestConfig::default(), now())
            .await
            .unwrap();
        assert!(message.body.contains("- Opened PRs (0):"));
        assert!(message.body.contains("- Closed PRs (0):"));
        assert!(message.body.contains("- Draft PRs (0):"));
    }

    #[tokio::test]
    async fn test_failed_detail_request_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "number": 1,
                "state": "open",
                "draft": false,
                "url": format!("{}{}", server.uri(), pr_path(1)),
                "created_at": "2026-10-15T08:00:00Z",
                "updated_at": "2026-10-15T08:00:00Z"
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(pr_path(1)))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri(), "secret");
        let mailer = RecordingMailer::default();
        let err = run(
            &client,
            &slug(),
            &DigestConfig::default(),
            now(),
            None,
            Some(&mailer),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DigestError::GitHub(PrError::ApiRequest(_))));
        assert!(err.to_string().contains("500"));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_commits_request_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "number": 1,
                "state": "open",
                "draft": false,
                "url": format!("{}{}", server.uri(), pr_path(1)),
                "created_at": "2026-10-15T08:00:00Z",
                "updated_at": "2026-10-15T08:00:00Z"
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(pr_path(1)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "number": 1,
                "title": "t",
                "state": "open",
                "user": { "login": "bob" },
                "head": { "ref": "h" },
                "base": { "ref": "main" },
                "html_url": "https://github.com/octo/widgets/pull/1",
                "commits_url": format!("{}{}/commits{{/sha}}", server.uri(), pr_path(1))
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/commits", pr_path(1))))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri(), "secret");
        let mailer = RecordingMailer::default();
        let err = run(
            &client,
            &slug(),
            &DigestConfig::default(),
            now(),
            None,
            Some(&mailer),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DigestError::GitHub(PrError::ApiRequest(_))));
        assert!(err.to_string().contains("500"));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_listing_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri(), "secret");
        let result = build_digest(&client, &slug(), &DigestConfig::default(), now()).await;
        assert!(matches!(result, Err(DigestError::GitHub(_))));
    }
}
