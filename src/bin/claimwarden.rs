//! Runs the reconciler against GitHub.
//!
//! Usage:
//!
//! ```text
//! claimwarden event --name <event-name> --payload <path>
//! claimwarden sweep
//! ```
//!
//! `event` reads a webhook payload (as written to `GITHUB_EVENT_PATH` in a
//! workflow run) and reconciles the trigger it describes. `sweep` visits every
//! open item. Settings come from the environment: `GITHUB_REPOSITORY`,
//! `GITHUB_TOKEN`, the optional `GITHUB_API_URL`, the optional
//! `CLAIMWARDEN_CHAT_WEBHOOK_URL` and the `CLAIMWARDEN_*` policy overrides.
//! `CLAIMWARDEN_LOG` sets the log filter.
//!
//! The process exits non-zero only when configuration or the trigger itself
//! is invalid. Per-item failures are logged and left for the next run.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use clap::{Parser, Subcommand};
use claimwarden::assignment::adapters::parse_webhook;
use claimwarden::assignment::domain::Trigger;
use claimwarden::assignment::services::{ReconcileError, ReconcileReport, Reconciler};
use claimwarden::bounty::{BountyOutcome, BountyService};
use claimwarden::config::{ConfigError, ReconcilerConfig};
use claimwarden::notify::memory::DisabledNotifier;
use claimwarden::notify::webhook::WebhookNotifier;
use claimwarden::notify::{ChatNotifier, NotifierError};
use claimwarden::tracker::adapters::github::{
    GitHubIssueTracker, GitHubSetupError, GitHubTrackerConfig,
};
use mockable::DefaultClock;
use std::env;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "claimwarden", version, about = "Issue-assignment lifecycle reconciler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile one webhook delivery.
    Event {
        /// Webhook event name, e.g. `issue_comment`.
        #[arg(long)]
        name: String,
        /// Path to the JSON payload.
        #[arg(long)]
        payload: Utf8PathBuf,
    },
    /// Reconcile every open item.
    Sweep,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("missing required setting {0}")]
    MissingEnv(&'static str),
    #[error("invalid CLAIMWARDEN_CHAT_WEBHOOK_URL: {0}")]
    WebhookUrl(String),
    #[error(transparent)]
    GitHub(#[from] GitHubSetupError),
    #[error(transparent)]
    Notifier(#[from] NotifierError),
    #[error("failed to read payload {path}: {source}")]
    PayloadRead {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("payload {path} is not valid JSON: {source}")]
    PayloadParse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Trigger(ReconcileError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] io::Error),
}

type Lookup = fn(&str) -> Option<String>;

fn lookup_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli, lookup_env) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "claimwarden failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("CLAIMWARDEN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli, lookup: Lookup) -> Result<(), CliError> {
    let config = ReconcilerConfig::from_env(lookup)?;
    let tracker = Arc::new(build_tracker(&config, lookup)?);
    let notifier = build_notifier(lookup)?;
    let trigger = match cli.command {
        Command::Event { name, payload } => {
            let body = read_payload(&payload)?;
            let value = serde_json::from_str(&body).map_err(|source| CliError::PayloadParse {
                path: payload.clone(),
                source,
            })?;
            parse_webhook(&name, &value, config.repository()).map_err(CliError::Trigger)?
        }
        Command::Sweep => Some(Trigger::ScheduledSweep),
    };
    let Some(trigger) = trigger else {
        info!("event carries nothing to reconcile");
        return Ok(());
    };

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::RuntimeInit)?;
    runtime.block_on(dispatch(tracker, notifier, config, trigger))
}

async fn dispatch(
    tracker: Arc<GitHubIssueTracker>,
    notifier: Arc<dyn ChatNotifier>,
    config: ReconcilerConfig,
    trigger: Trigger,
) -> Result<(), CliError> {
    let config = Arc::new(config);
    if let Trigger::CommentEvent(event) = &trigger {
        let bounty = bounty_service(&tracker, &notifier, &config);
        match bounty.handle_comment(event).await {
            Ok(BountyOutcome::NoCommand) => {}
            Ok(outcome) => info!(?outcome, "bounty command handled"),
            Err(err) => warn!(error = %err, "bounty command rejected"),
        }
    }

    let reconciler = Reconciler::new(tracker, Arc::new(DefaultClock), config, notifier);
    match reconciler.reconcile(trigger).await {
        Ok(report) => {
            summarise(&report);
            Ok(())
        }
        Err(err @ ReconcileError::Validation(_)) => Err(CliError::Trigger(err)),
        Err(err) => {
            warn!(error = %err, "run deferred to the next trigger");
            Ok(())
        }
    }
}

fn bounty_service(
    tracker: &Arc<GitHubIssueTracker>,
    notifier: &Arc<dyn ChatNotifier>,
    config: &ReconcilerConfig,
) -> BountyService<GitHubIssueTracker> {
    let service = BountyService::new(
        Arc::clone(tracker),
        Arc::clone(notifier),
        config.repository().clone(),
        config.bounty_label_prefix(),
    );
    match config.chat_channel() {
        Some(channel) => service.with_chat_channel(channel),
        None => service,
    }
}

fn summarise(report: &ReconcileReport) {
    let failed = report.failures().count();
    info!(
        items = report.items().len(),
        changed = report.changed(),
        failed,
        "reconciliation finished"
    );
}

fn build_tracker(
    config: &ReconcilerConfig,
    lookup: Lookup,
) -> Result<GitHubIssueTracker, CliError> {
    let token = lookup("GITHUB_TOKEN").ok_or(CliError::MissingEnv("GITHUB_TOKEN"))?;
    let mut settings = GitHubTrackerConfig::new(config.repository().clone(), token);
    if let Some(api_base) = lookup("GITHUB_API_URL") {
        settings = settings.with_api_base(api_base);
    }
    Ok(GitHubIssueTracker::new(settings)?)
}

fn build_notifier(lookup: Lookup) -> Result<Arc<dyn ChatNotifier>, CliError> {
    let Some(raw) = lookup("CLAIMWARDEN_CHAT_WEBHOOK_URL") else {
        return Ok(Arc::new(DisabledNotifier));
    };
    let url = reqwest::Url::parse(raw.trim()).map_err(|err| CliError::WebhookUrl(err.to_string()))?;
    Ok(Arc::new(WebhookNotifier::new(url)?))
}

fn read_payload(path: &Utf8Path) -> Result<String, CliError> {
    let read_error = |source| CliError::PayloadRead {
        path: path.to_owned(),
        source,
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| read_error(io::Error::other("path has no file name")))?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    dir.read_to_string(file_name).map_err(read_error)
}
