//! Calendar-import synchronization for the task-aid app.
//!
//! The subsystem tracks a Google OAuth client-secret file
//! (`google-credentials.json`), reacts to it appearing, changing, or
//! disappearing, fetches next month's events from Google Calendar, turns
//! them into local tasks, and merges those tasks into the stored task
//! list.
//!
//! [`service::CalendarSyncService`] is the façade; everything else is a
//! building block it owns or a boundary it talks through.

pub mod config;
pub mod convert;
pub mod credentials;
pub mod fetch;
pub mod google;
pub mod merge;
pub mod service;
pub mod storage;
pub mod watcher;

pub use config::SyncConfig;
pub use credentials::{CredentialState, CredentialStatus, CREDENTIAL_FILE_NAME};
pub use fetch::{CalendarFetcher, FetchError, FetchWindow, RawCalendarEvent};
pub use merge::{merge_imported_tasks, MergeResult};
pub use service::{CalendarSyncService, ImportOutcome, ImportResult};
