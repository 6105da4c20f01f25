//! The import façade: credential state, watcher wiring, and import runs.

use crate::config::SyncConfig;
use crate::convert;
use crate::credentials::{
    CredentialState, CredentialStatus, CredentialStore, CREDENTIAL_FILE_NAME, MISSING_MESSAGE,
};
use crate::fetch::{CalendarFetcher, FetchError, FetchWindow};
use crate::watcher::{CredentialFileChange, CredentialWatcher};
use chrono::Local;
use shared_types::TaskItem;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const CANCELLED_MESSAGE: &str = "Authorization was canceled.";
const ACCESS_BLOCKED_MESSAGE: &str =
    "Google blocked the request. Add your account as a test user and try again.";

/// Exactly one of these describes every import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Success,
    NoEvents,
    Cancelled,
    AccessBlocked,
    MissingCredentials,
    InvalidCredentials,
    Error,
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub outcome: ImportOutcome,
    pub tasks: Vec<TaskItem>,
    pub error_message: Option<String>,
}

impl ImportResult {
    fn outcome(outcome: ImportOutcome) -> Self {
        ImportResult {
            outcome,
            tasks: Vec::new(),
            error_message: None,
        }
    }

    fn failure(outcome: ImportOutcome, message: impl Into<String>) -> Self {
        ImportResult {
            outcome,
            tasks: Vec::new(),
            error_message: Some(message.into()),
        }
    }
}

/// Owns the credential store, the optional file watcher, and the fetcher
/// boundary. The credential state lives in a single lock-protected slot;
/// watcher callbacks and explicit calls replace it wholesale and every
/// reader gets a snapshot copy.
pub struct CalendarSyncService {
    store: Arc<CredentialStore>,
    fetcher: Arc<dyn CalendarFetcher>,
    state: Arc<Mutex<CredentialState>>,
    changed_tx: Arc<watch::Sender<CredentialState>>,
    watcher: Option<CredentialWatcher>,
}

impl CalendarSyncService {
    pub fn new(config: &SyncConfig, fetcher: Arc<dyn CalendarFetcher>) -> Self {
        let store = Arc::new(CredentialStore::new(&config.app_dir, config.token_dir()));

        let initial = store.validate();
        tracing::info!("Initial credential state: {:?}", initial.status);

        let (changed_tx, _) = watch::channel(initial.clone());
        let changed_tx = Arc::new(changed_tx);
        let state = Arc::new(Mutex::new(initial));

        let watcher = if config.enable_watcher {
            spawn_watcher(
                &store,
                &state,
                &changed_tx,
                Duration::from_millis(config.watcher_debounce_ms),
            )
        } else {
            None
        };

        CalendarSyncService {
            store,
            fetcher,
            state,
            changed_tx,
            watcher,
        }
    }

    /// Snapshot of the current credential state.
    pub fn credential_state(&self) -> CredentialState {
        lock_state(&self.state).clone()
    }

    /// Subscribe to credential state transitions (explicit imports and
    /// watcher-driven revalidations alike).
    pub fn subscribe(&self) -> watch::Receiver<CredentialState> {
        self.changed_tx.subscribe()
    }

    pub fn credentials_path(&self) -> &Path {
        self.store.credentials_path()
    }

    /// Copy a credential file into place and publish the new state.
    pub fn import_credentials(
        &self,
        source: &Path,
        cancel: &CancellationToken,
    ) -> CredentialState {
        let next = self.store.import(source, cancel);
        publish(&self.state, &self.changed_tx, next)
    }

    /// Run one import pass: validate-gate, fetch next month's events,
    /// convert them to tasks. Every failure mode comes back as an
    /// [`ImportOutcome`], never as an error.
    pub async fn run_import(&self, cancel: &CancellationToken) -> ImportResult {
        let credential_state = self.credential_state();
        match credential_state.status {
            CredentialStatus::Missing => {
                return ImportResult::failure(
                    ImportOutcome::MissingCredentials,
                    credential_state.message,
                );
            }
            CredentialStatus::Invalid => {
                return ImportResult::failure(
                    ImportOutcome::InvalidCredentials,
                    credential_state.message,
                );
            }
            CredentialStatus::Valid => {}
        }

        let credentials_json = match fs::read_to_string(self.store.credentials_path()) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to read google-credentials.json for import: {}", e);
                return ImportResult::failure(ImportOutcome::Error, e.to_string());
            }
        };

        let window = FetchWindow::next_month(Local::now());
        tracing::info!(
            "Importing calendar events between {} and {}",
            window.start,
            window.end
        );

        let fetched = self
            .fetcher
            .fetch_events(
                &credentials_json,
                self.store.token_dir(),
                &window,
                cancel,
            )
            .await;

        match fetched {
            Ok(None) => ImportResult::failure(ImportOutcome::Cancelled, CANCELLED_MESSAGE),
            Ok(Some(events)) if events.is_empty() => {
                ImportResult::outcome(ImportOutcome::NoEvents)
            }
            Ok(Some(events)) => {
                let tasks: Vec<TaskItem> =
                    events.into_iter().map(convert::event_to_task).collect();
                tracing::info!("Fetched {} calendar events", tasks.len());
                ImportResult {
                    outcome: ImportOutcome::Success,
                    tasks,
                    error_message: None,
                }
            }
            Err(FetchError::Cancelled) => {
                ImportResult::failure(ImportOutcome::Cancelled, CANCELLED_MESSAGE)
            }
            Err(FetchError::Denied) => {
                tracing::warn!("User declined the authorization request.");
                ImportResult::failure(ImportOutcome::Cancelled, CANCELLED_MESSAGE)
            }
            Err(FetchError::Forbidden) => {
                tracing::error!("Google Calendar returned access denied.");
                ImportResult::failure(ImportOutcome::AccessBlocked, ACCESS_BLOCKED_MESSAGE)
            }
            Err(FetchError::Other(message)) => {
                tracing::error!(
                    "Unexpected error importing Google Calendar events: {}",
                    message
                );
                ImportResult::failure(ImportOutcome::Error, message)
            }
        }
    }

    /// Stop the watcher and release its OS handle. Also runs on drop.
    pub fn close(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
    }
}

impl Drop for CalendarSyncService {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_watcher(
    store: &Arc<CredentialStore>,
    state: &Arc<Mutex<CredentialState>>,
    changed_tx: &Arc<watch::Sender<CredentialState>>,
    debounce: Duration,
) -> Option<CredentialWatcher> {
    let app_dir = store.app_dir().to_path_buf();
    let store = Arc::clone(store);
    let state = Arc::clone(state);
    let changed_tx = Arc::clone(changed_tx);

    let handler = move |change: CredentialFileChange| {
        let next = match change {
            CredentialFileChange::Removed => CredentialState::missing(MISSING_MESSAGE),
            CredentialFileChange::Updated => {
                let validated = store.validate();
                if validated.status == CredentialStatus::Valid {
                    // A rewritten credential file invalidates any tokens
                    // minted under the previous client secret.
                    store.clear_cached_tokens();
                }
                validated
            }
        };
        publish(&state, &changed_tx, next);
    };

    match CredentialWatcher::spawn(&app_dir, CREDENTIAL_FILE_NAME, debounce, handler) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            // Degrade to explicit imports only.
            tracing::error!("Failed to initialize credentials watcher: {}", e);
            None
        }
    }
}

fn lock_state(state: &Mutex<CredentialState>) -> std::sync::MutexGuard<'_, CredentialState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn publish(
    state: &Mutex<CredentialState>,
    changed_tx: &watch::Sender<CredentialState>,
    next: CredentialState,
) -> CredentialState {
    {
        let mut slot = lock_state(state);
        *slot = next.clone();
    }
    // Nobody listening is fine; the CLI does not always subscribe.
    let _ = changed_tx.send(next.clone());
    next
}
