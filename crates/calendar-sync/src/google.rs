//! The production [`CalendarFetcher`] backed by the Google Calendar API.
//!
//! Authorization runs the installed-app OAuth flow, persisting tokens
//! under the configured token directory so later imports skip the
//! browser round-trip. Provider errors are folded into the closed
//! [`FetchError`] set here, at the boundary.

use crate::fetch::{
    CalendarFetcher, FetchError, FetchWindow, RawCalendarEvent, RawEventReminders, RawEventStart,
    RawReminderOverride, RawTimestamp,
};
use async_trait::async_trait;
use chrono::Utc;
use google_calendar3::api::{Event, EventDateTime};
use google_calendar3::yup_oauth2 as oauth2;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const TOKEN_CACHE_FILE: &str = "tokens.json";

/// Install the process-level rustls crypto provider the TLS connector
/// needs. Hosts must call this once before the first fetch; calling it
/// again is a no-op.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider was already installed");
    }
}

pub struct GoogleCalendarFetcher {
    max_results: i32,
}

impl GoogleCalendarFetcher {
    pub fn new(max_results: i32) -> Self {
        GoogleCalendarFetcher { max_results }
    }
}

#[async_trait]
impl CalendarFetcher for GoogleCalendarFetcher {
    async fn fetch_events(
        &self,
        credentials_json: &str,
        token_dir: &Path,
        window: &FetchWindow,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<RawCalendarEvent>>, FetchError> {
        let secret = oauth2::parse_application_secret(credentials_json).map_err(|e| {
            FetchError::Other(format!("Failed to parse google-credentials.json: {}", e))
        })?;

        // Building the authenticator may block on the user finishing the
        // consent flow in a browser, so it races against cancellation.
        let build = oauth2::InstalledFlowAuthenticator::builder(
            secret,
            oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(token_dir.join(TOKEN_CACHE_FILE))
        .build();

        let auth = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            auth = build => auth.map_err(|e| {
                FetchError::Other(format!("Failed to start Google authorization: {}", e))
            })?,
        };

        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| FetchError::Other(format!("Failed to load native TLS roots: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = CalendarHub::new(client, auth);

        tracing::debug!(
            "Requesting up to {} events between {} and {}",
            self.max_results,
            window.start,
            window.end
        );

        let request = hub
            .events()
            .list("primary")
            .time_min(window.start.with_timezone(&Utc))
            .time_max(window.end.with_timezone(&Utc))
            .single_events(true)
            .show_deleted(false)
            .order_by("startTime")
            .max_results(self.max_results)
            .doit();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            response = request => response,
        };

        match response {
            Ok((_, events)) => {
                let raw: Vec<RawCalendarEvent> = events
                    .items
                    .unwrap_or_default()
                    .into_iter()
                    .map(raw_from_google)
                    .collect();
                Ok(Some(raw))
            }
            Err(e) => Err(classify_google_error(e)),
        }
    }
}

fn raw_from_google(event: Event) -> RawCalendarEvent {
    RawCalendarEvent {
        id: event.id.unwrap_or_default(),
        summary: event.summary,
        start: event.start.map(raw_start),
        reminders: event.reminders.map(|reminders| RawEventReminders {
            use_default: reminders.use_default.unwrap_or(false),
            overrides: reminders
                .overrides
                .unwrap_or_default()
                .into_iter()
                .map(|reminder| RawReminderOverride {
                    minutes: reminder.minutes.map(i64::from),
                })
                .collect(),
        }),
    }
}

fn raw_start(start: EventDateTime) -> RawEventStart {
    RawEventStart {
        // The transport hands us an already-parsed instant, never the
        // original RFC 3339 text.
        raw: None,
        timestamp: start.date_time.map(RawTimestamp::Utc),
        time_zone: start.time_zone,
        date: start.date.map(|d| d.format("%Y-%m-%d").to_string()),
    }
}

/// Fold a provider error into the closed [`FetchError`] set.
///
/// A 403 means the Google Cloud project blocked the account (usually a
/// consent screen still in testing mode). A refused or abandoned consent
/// screen surfaces through the token machinery instead.
fn classify_google_error(error: google_calendar3::Error) -> FetchError {
    use google_calendar3::Error as G;

    match error {
        G::Cancelled => FetchError::Cancelled,
        G::Failure(ref response) if response.status().as_u16() == 403 => FetchError::Forbidden,
        G::BadRequest(ref value) => {
            let code = value.pointer("/error/code").and_then(|code| code.as_i64());
            if code == Some(403) {
                FetchError::Forbidden
            } else {
                FetchError::Other(error.to_string())
            }
        }
        G::MissingToken(ref source) => {
            let message = source.to_string();
            let lowered = message.to_lowercase();
            if lowered.contains("access_denied") {
                FetchError::Denied
            } else if lowered.contains("cancel") {
                FetchError::Cancelled
            } else {
                FetchError::Other(format!("Google authorization failed: {}", message))
            }
        }
        other => FetchError::Other(other.to_string()),
    }
}
