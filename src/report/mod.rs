pub mod render;
pub mod types;

pub use types::{ComposeOptions, DigestSections, EmailMessage};

use crate::pr::RepoSlug;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write digest file: {0}")]
    FileWrite(#[from] std::io::Error),
}

const RULE_WIDTH: usize = 100;

pub fn subject(slug: &RepoSlug) -> String {
    format!("Pull Request Summary - {slug}")
}

fn activity_line(window_days: u32) -> String {
    if window_days == 7 {
        "Last week's activity:".to_string()
    } else {
        format!("Last {window_days} days' activity:")
    }
}

/// Compose the subject and body from the rendered sections.
///
/// Each section gets a header with its count and a rule; its blocks are
/// joined with `options.separator`. An empty section keeps its header.
pub fn compose(slug: &RepoSlug, sections: &DigestSections, options: &ComposeOptions<'_>) -> EmailMessage {
    let subject = subject(slug);
    let rule = "-".repeat(RULE_WIDTH);
    let join = |blocks: &[String]| blocks.join(options.separator);

    let body = format!(
        "\n    {subject}\n\n    {activity}\n    - Opened PRs ({opened_count}):\n      {rule}\n      {opened}\n\n    - Closed PRs ({closed_count}):\n      {rule}\n      {closed}\n\n    - Draft PRs ({draft_count}):\n      {rule}\n      {draft}\n\n    Thank you,\n    {signature}\n    ",
        activity = activity_line(options.window_days),
        opened_count = sections.opened.len(),
        opened = join(&sections.opened),
        closed_count = sections.closed.len(),
        closed = join(&sections.closed),
        draft_count = sections.draft.len(),
        draft = join(&sections.draft),
        signature = options.signature,
    );

    EmailMessage { subject, body }
}

/// Print the digest to stdout and, if a path is given, also write it there.
#[instrument(skip(message), fields(subject = %message.subject))]
pub fn output(message: &EmailMessage, output_path: Option<&Path>) -> Result<(), ReportError> {
    debug!("writing digest to terminal");
    print_terminal_digest(message);
    if let Some(path) = output_path {
        debug!(path = %path.display(), "writing digest to file");
        write_digest_file(message, path)?;
    }
    Ok(())
}

fn print_terminal_digest(message: &EmailMessage) {
    println!("{}", message.subject.bold());
    println!("****************");
    println!("{}", message.body);
}

fn write_digest_file(message: &EmailMessage, path: &Path) -> Result<(), ReportError> {
    let contents = format!("Subject: {}\n\n{}", message.subject, message.body);
    std::fs::write(path, contents)?;
    Ok(())
}
