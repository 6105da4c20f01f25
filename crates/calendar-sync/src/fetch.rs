//! The boundary between the sync service and the calendar provider.
//!
//! The service only ever talks to a [`CalendarFetcher`]; the production
//! implementation lives in [`crate::google`] and tests substitute their
//! own. Failures cross the boundary as the closed [`FetchError`] set so
//! the service can classify outcomes without knowing provider internals.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// How a calendar fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The user declined the OAuth consent screen.
    #[error("authorization was denied")]
    Denied,

    /// The service refused the request (e.g. the account is not an
    /// approved test user).
    #[error("the calendar service blocked the request")]
    Forbidden,

    /// The fetch was cancelled before it completed.
    #[error("the fetch was cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// A timestamp as the provider delivered it, before local resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTimestamp {
    /// The transport already pinned the instant to UTC.
    Utc(DateTime<Utc>),
    /// A wall-clock value with no zone attached.
    Floating(NaiveDateTime),
}

/// Start descriptor of a raw event. Fields mirror what calendar APIs
/// actually send: at most one of them is meaningful, resolved in priority
/// order by [`crate::convert`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEventStart {
    /// RFC 3339 timestamp exactly as received, when available.
    pub raw: Option<String>,
    /// Timestamp the transport already decoded.
    pub timestamp: Option<RawTimestamp>,
    /// IANA zone id the timestamp is expressed in.
    pub time_zone: Option<String>,
    /// Date-only value (`YYYY-MM-DD`) for all-day events.
    pub date: Option<String>,
}

/// A single reminder override carried by an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawReminderOverride {
    pub minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEventReminders {
    pub use_default: bool,
    pub overrides: Vec<RawReminderOverride>,
}

/// A calendar event as fetched, before conversion to a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub start: Option<RawEventStart>,
    pub reminders: Option<RawEventReminders>,
}

/// The `[start, end)` local-time interval to fetch events for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl FetchWindow {
    /// The rolling import window: the first day of the month after `now`,
    /// through the first day of the month after that.
    pub fn next_month(now: DateTime<Local>) -> Self {
        let this_month = month_start(now.date_naive());
        let start_date = add_month(this_month);
        let end_date = add_month(start_date);
        FetchWindow {
            start: local_midnight(start_date),
            end: local_midnight(end_date),
        }
    }
}

// The first of a valid month always exists; the fallback keeps the
// function total without a panic path.
fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

// Only fails at the far edge of chrono's date range.
fn add_month(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(1)).unwrap_or(date)
}

fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_time(NaiveTime::MIN);
    // A DST transition can make local midnight ambiguous or skipped;
    // take the earliest valid instant, or fall back to the UTC reading.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Fetches raw events for a time window using the given credential bundle.
///
/// `Ok(None)` means the user abandoned the sign-in flow; an empty vec
/// means the fetch succeeded and the window simply holds no events.
#[async_trait]
pub trait CalendarFetcher: Send + Sync {
    async fn fetch_events(
        &self,
        credentials_json: &str,
        token_dir: &Path,
        window: &FetchWindow,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<RawCalendarEvent>>, FetchError>;
}
