mod config;
mod digest;
mod mail;
mod pr;
mod report;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::mail::{Mailer, SmtpMailer};

/// PR Digest: summarizes a repository's opened, closed and draft pull
/// requests over the last week and optionally emails the summary.
#[derive(Parser, Debug)]
#[command(name = "pr-digest", version, about)]
struct Cli {
    /// Repository as owner/repo or https://github.com/owner/repo
    ///
    /// Falls back to github.repository in the config file or PR_DIGEST_REPOSITORY.
    repository: Option<String>,

    /// Length of the reporting window in days (overrides digest.window_days)
    #[arg(long)]
    days: Option<u32>,

    /// Config file path (defaults to .pr-digest.toml in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the digest to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Send the digest by email over SMTP
    #[arg(long)]
    send: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Failures are reported on stdout and the process still exits normally.
    if let Err(err) = run(cli).await {
        println!("{} {}", "Error:".red().bold(), err);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("loading configuration");
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(days) = cli.days {
        config.digest.window_days = days;
    }

    let repository = cli
        .repository
        .as_deref()
        .or(config.github.repository.as_deref())
        .ok_or("Repository is required. Usage: pr-digest <owner/repo> or set github.repository")?;
    let slug = pr::parse_repo(repository)?;

    let _main_span = info_span!("pr_digest", repo = %slug).entered();
    debug!(window_days = config.digest.window_days, window_field = ?config.digest.window_field, "resolved settings");

    let client = pr::GitHubClient::from_config(&config)?;
    let mailer = if cli.send {
        Some(SmtpMailer::from_config(&config.email)?)
    } else {
        info!("email delivery disabled, pass --send to enable");
        None
    };

    digest::run(
        &client,
        &slug,
        &config.digest,
        Utc::now(),
        cli.output.as_deref(),
        mailer.as_ref().map(|m| m as &dyn Mailer),
    )
    .await?;

    if mailer.is_some() {
        println!("Email sent successfully!");
    }
    info!("done");

    Ok(())
}
