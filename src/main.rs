mod cli;
mod error;
mod history;

use crate::cli::{Cli, Command, FetchArgs, UpdateArgs};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use malmeta_api::{AuthSession, OAuthRefresher, RequestExecutor};
use malmeta_cache::{Database, Repository, Summary, SummaryState};
use malmeta_config::Config;
use malmeta_metadata::{FetchOptions, MetadataFetcher};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "Exiting after unrecoverable error");
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr so that stdout stays machine-readable.
fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::builder().with_default_directive(level.into()).from_env_lossy())
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let fetcher = fetcher(&config, cli.dry_run).await?;
    match cli.command {
        Command::Fetch(args) => fetch(&fetcher, args).await,
        Command::UpdateMetadata(args) => update_metadata(&fetcher, args).await,
    }
}

/// Everything that can fail without touching the network happens here, before
/// the first request.
async fn fetcher(config: &Config, dry_run: bool) -> Result<MetadataFetcher> {
    let client = reqwest::Client::new();
    let refresher = OAuthRefresher::new(client.clone(), config.token_endpoint.clone(), config.client_id.clone())
        .with_token_file(&config.token_file);
    let session = AuthSession::from_token_file(&config.token_file, Arc::new(refresher))
        .await
        .or_raise(|| ErrorKind::Auth)?
        .with_client_id(Some(config.client_id.clone()));
    let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Cache)?;
    if dry_run {
        tracing::info!("Dry-run mode: nothing will be written to the cache");
    }
    let repo = Repository::new(db.pool().clone(), dry_run);
    tracing::debug!(username = %config.username, database = %config.database.display(), "Ready");
    let executor = RequestExecutor::new(client, session, config.retry);
    Ok(MetadataFetcher::new(executor, repo, config.api_base.clone()))
}

async fn fetch(fetcher: &MetadataFetcher, args: FetchArgs) -> Result<()> {
    let options = FetchOptions {
        rerequest_failed: args.request_failed,
        force_rerequest: args.force,
    };
    let summary = fetcher.fetch_str(args.id, &args.entry_type, options).await.or_raise(|| ErrorKind::Fetch)?;
    println!("{}", render(&summary));
    Ok(())
}

fn render(summary: &Summary) -> serde_json::Value {
    serde_json::json!({
        "url": summary.url,
        "metadata": summary.metadata,
        "timestamp": summary.timestamp.unix_timestamp(),
    })
}

async fn update_metadata(fetcher: &MetadataFetcher, args: UpdateArgs) -> Result<()> {
    let options = FetchOptions {
        rerequest_failed: args.request_failed,
        ..FetchOptions::default()
    };
    let history = history::read_history(&args.history)?;
    let unapproved = match &args.unapproved {
        Some(path) => history::read_unapproved(path)?,
        None => Vec::new(),
    };
    tracing::info!(history = history.len(), unapproved = unapproved.len(), "Updating metadata");

    let mut tally = Tally::default();
    for entry in &history {
        let result = fetcher.fetch_str(entry.entry_id, &entry.e_type, options).await;
        tally.record(entry.entry_id, &entry.e_type, result);
    }
    for entry in unapproved {
        let result = fetcher.fetch(entry, options).await;
        tally.record(entry.id, entry.kind.as_str(), result);
    }
    tracing::info!(
        successful = tally.successful,
        not_found = tally.not_found,
        failed = tally.failed,
        errors = tally.errors,
        "Finished updating metadata"
    );
    if tally.errors > 0 {
        exn::bail!(ErrorKind::Failures(tally.errors));
    }
    Ok(())
}

/// Outcome counts of a batch. `failed` counts entries whose (possibly cached)
/// summary records a failure; `errors` counts entries that produced no
/// summary at all.
#[derive(Debug, Default, PartialEq)]
struct Tally {
    successful: usize,
    not_found: usize,
    failed: usize,
    errors: usize,
}
impl Tally {
    fn record(&mut self, id: u64, kind: &str, result: malmeta_metadata::error::Result<Summary>) {
        match result {
            Ok(summary) => match summary.state() {
                SummaryState::Successful => self.successful += 1,
                SummaryState::NotFound => self.not_found += 1,
                SummaryState::Failed => self.failed += 1,
            },
            Err(err) => {
                tracing::error!(entry_id = id, entry_type = kind, error = ?err, "Could not fetch entry, skipping");
                self.errors += 1;
            },
        }
    }
}
