use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use calendar_sync::config::SyncConfig;
use calendar_sync::google::GoogleCalendarFetcher;
use calendar_sync::merge::merge_imported_tasks;
use calendar_sync::service::{CalendarSyncService, ImportOutcome};
use calendar_sync::storage::Storage;

#[derive(Parser)]
#[command(
    name = "taskaid-sync",
    about = "Import upcoming Google Calendar events into the TaskAid task list"
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current credential state
    Status,
    /// Copy a downloaded client-secret file into place
    Credentials {
        /// The google-credentials.json file downloaded from Google Cloud
        path: PathBuf,
    },
    /// Fetch next month's events and merge them into the task list
    Import,
}

#[tokio::main]
async fn main() -> Result<()> {
    calendar_sync::google::install_crypto_provider();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calendar_sync=info,taskaid_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };

    let fetcher = Arc::new(GoogleCalendarFetcher::new(config.max_events_per_import));
    let mut service = CalendarSyncService::new(&config, fetcher);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Cancellation requested, finishing up");
            signal_cancel.cancel();
        }
    });

    match cli.command {
        Command::Status => {
            let state = service.credential_state();
            println!("{:?}: {}", state.status, state.message);
        }
        Command::Credentials { path } => {
            let state = service.import_credentials(&path, &cancel);
            println!("{}", state.message);
        }
        Command::Import => run_import(&service, &config, &cancel).await?,
    }

    service.close();
    Ok(())
}

async fn run_import(
    service: &CalendarSyncService,
    config: &SyncConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let result = service.run_import(cancel).await;

    match result.outcome {
        ImportOutcome::Success => {
            let storage = Storage::new(config.data_dir.clone());
            let mut state = storage.load_state();
            let merge = merge_imported_tasks(&mut state.tasks, result.tasks);
            if merge.has_changes() {
                storage.save_state(&state)?;
            }
            println!("{}", merge.summary_message());
        }
        ImportOutcome::NoEvents => {
            println!("No Google Calendar events found for next month.");
        }
        ImportOutcome::Cancelled
        | ImportOutcome::AccessBlocked
        | ImportOutcome::MissingCredentials
        | ImportOutcome::InvalidCredentials
        | ImportOutcome::Error => {
            let message = result
                .error_message
                .unwrap_or_else(|| "Calendar import failed.".to_string());
            eprintln!("{}", message);
        }
    }

    Ok(())
}
