//! Conversion of raw calendar events into local task records.
//!
//! Conversion is total: every event becomes a task. Bad timestamps, bad
//! zone ids, and missing fields degrade to "no due date" or fallback
//! labels instead of failing the import.

use crate::fetch::{RawCalendarEvent, RawEventStart, RawTimestamp};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use shared_types::{ReminderStatus, TaskItem};

const UNTITLED_EVENT: &str = "Untitled event";
const DEFAULT_REMINDER_LABEL: &str = "Default reminder";

/// Start of an event resolved to local wall-clock terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StartInfo {
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    all_day: bool,
}

/// Convert one raw event into a task record.
pub fn event_to_task(event: RawCalendarEvent) -> TaskItem {
    let start = resolve_start(event.start.as_ref());

    let name = event
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNTITLED_EVENT)
        .to_string();

    let mut task = TaskItem::new(name);
    task.due_date = start.date;
    task.due_time = start.time;
    task.external_id = Some(event.id).filter(|id| !id.is_empty());

    let has_overrides = event
        .reminders
        .as_ref()
        .is_some_and(|r| !r.overrides.is_empty());

    if has_overrides {
        // Overrides with no minute value are ignored; if none carries
        // one, the task simply has no reminder.
        let smallest = event
            .reminders
            .as_ref()
            .and_then(|r| r.overrides.iter().filter_map(|o| o.minutes).min());
        if let Some(minutes) = smallest {
            task.reminder_status = ReminderStatus::Active;
            task.reminder_label = format_reminder_minutes(minutes);
        }
    } else if event.reminders.as_ref().is_some_and(|r| r.use_default) {
        task.reminder_status = ReminderStatus::Active;
        task.reminder_label = DEFAULT_REMINDER_LABEL.to_string();
    } else if start.date.is_some() {
        task.reminder_status = ReminderStatus::Active;
        task.reminder_label = default_reminder_label(&start);
    }

    // Events can arrive with starts already in the past (clock skew,
    // re-imports); their reminders are overdue, not pending.
    if task.reminder_status == ReminderStatus::Active && task.is_overdue() {
        task.reminder_status = ReminderStatus::Overdue;
    }

    task
}

/// Resolve the event start to local date and time.
///
/// Priority: raw RFC 3339 string, then decoded timestamp (zone-aware,
/// then UTC, then floating-as-local), then date-only. Anything
/// unparseable yields an empty start rather than an error.
fn resolve_start(start: Option<&RawEventStart>) -> StartInfo {
    let Some(start) = start else {
        return StartInfo::default();
    };

    if let Some(raw) = start.raw.as_deref().filter(|s| !s.is_empty()) {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return timed(parsed.with_timezone(&Local).naive_local());
        }
    }

    if let Some(timestamp) = start.timestamp {
        if let Some(zone) = start.time_zone.as_deref().filter(|z| !z.is_empty()) {
            if let Ok(tz) = zone.parse::<Tz>() {
                let wall_clock = match timestamp {
                    RawTimestamp::Utc(dt) => dt.naive_utc(),
                    RawTimestamp::Floating(naive) => naive,
                };
                if let Some(zoned) = tz.from_local_datetime(&wall_clock).earliest() {
                    return timed(zoned.with_timezone(&Local).naive_local());
                }
            }
            // Unknown or invalid zone id: fall through and treat the
            // timestamp by its own kind.
        }

        let local = match timestamp {
            RawTimestamp::Utc(dt) => dt.with_timezone(&Local).naive_local(),
            RawTimestamp::Floating(naive) => naive,
        };
        return timed(local);
    }

    if let Some(date) = start.date.as_deref().filter(|d| !d.is_empty()) {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return StartInfo {
                date: Some(parsed),
                time: None,
                all_day: true,
            };
        }
    }

    StartInfo::default()
}

fn timed(local: NaiveDateTime) -> StartInfo {
    StartInfo {
        date: Some(local.date()),
        time: Some(local.time()),
        all_day: false,
    }
}

/// Label for a reminder derived from the event start, e.g.
/// `"Monday, Sep 14 - 9:30 AM"` or `"Monday, Sep 14"` for all-day events.
fn default_reminder_label(start: &StartInfo) -> String {
    match (start.date, start.time) {
        (Some(date), Some(time)) => format!(
            "{} - {}",
            date.format("%A, %b %d"),
            time.format("%-I:%M %p")
        ),
        (Some(date), None) => date.format("%A, %b %d").to_string(),
        _ => "Active".to_string(),
    }
}

/// Human-readable description of a reminder offset in minutes.
pub fn format_reminder_minutes(minutes: i64) -> String {
    if minutes == 0 {
        return "At start time".to_string();
    }
    if minutes == 1 {
        return "1 minute before".to_string();
    }
    if minutes < 60 {
        return format!("{} minutes before", minutes);
    }
    if minutes == 60 {
        return "1 hour before".to_string();
    }
    if minutes < 1440 && minutes % 60 == 0 {
        return format!("{} hours before", minutes / 60);
    }
    if minutes == 1440 {
        return "1 day before".to_string();
    }
    if minutes % 1440 == 0 {
        return format!("{} days before", minutes / 1440);
    }

    let days = minutes / 1440;
    let hours = (minutes % 1440) / 60;
    let mins = minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{} day{}", days, if days == 1 { "" } else { "s" }));
    }
    if hours > 0 {
        parts.push(format!(
            "{} hour{}",
            hours,
            if hours == 1 { "" } else { "s" }
        ));
    }
    if mins > 0 {
        parts.push(format!(
            "{} minute{}",
            mins,
            if mins == 1 { "" } else { "s" }
        ));
    }
    if parts.is_empty() {
        parts.push(format!("{} minutes", minutes));
    }

    format!("{} before", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{RawEventReminders, RawReminderOverride};
    use chrono::{Datelike, Duration, TimeZone, Utc};
    use shared_types::REMINDER_NOT_SET;

    fn event_with_start(start: RawEventStart) -> RawCalendarEvent {
        RawCalendarEvent {
            id: "evt-1".to_string(),
            summary: Some("Team Sync".to_string()),
            start: Some(start),
            reminders: None,
        }
    }

    fn overrides(minutes: &[Option<i64>]) -> RawEventReminders {
        RawEventReminders {
            use_default: false,
            overrides: minutes
                .iter()
                .map(|&minutes| RawReminderOverride { minutes })
                .collect(),
        }
    }

    #[test]
    fn formats_reminder_minutes() {
        let cases = [
            (0, "At start time"),
            (1, "1 minute before"),
            (30, "30 minutes before"),
            (60, "1 hour before"),
            (120, "2 hours before"),
            (1440, "1 day before"),
            (2880, "2 days before"),
            (61, "1 hour 1 minute before"),
            (2885, "2 days 5 minutes before"),
            (1501, "1 day 1 hour 1 minute before"),
        ];
        for (minutes, expected) in cases {
            assert_eq!(format_reminder_minutes(minutes), expected, "{minutes} min");
        }
    }

    #[test]
    fn blank_titles_become_untitled() {
        for summary in [None, Some("".to_string()), Some("   ".to_string())] {
            let task = event_to_task(RawCalendarEvent {
                id: "evt-1".to_string(),
                summary,
                start: None,
                reminders: None,
            });
            assert_eq!(task.name, "Untitled event");
        }

        let task = event_to_task(RawCalendarEvent {
            id: "evt-1".to_string(),
            summary: Some("  Dentist  ".to_string()),
            start: None,
            reminders: None,
        });
        assert_eq!(task.name, "Dentist");
    }

    #[test]
    fn event_without_start_has_no_reminder() {
        let task = event_to_task(RawCalendarEvent {
            id: "evt-1".to_string(),
            summary: Some("Someday".to_string()),
            start: None,
            reminders: None,
        });
        assert!(task.due_date.is_none());
        assert!(task.due_time.is_none());
        assert_eq!(task.reminder_status, ReminderStatus::None);
        assert_eq!(task.reminder_label, REMINDER_NOT_SET);
    }

    #[test]
    fn smallest_override_wins() {
        let mut event = event_with_start(RawEventStart::default());
        event.reminders = Some(overrides(&[Some(30), None, Some(10), Some(120)]));
        let task = event_to_task(event);
        assert_eq!(task.reminder_status, ReminderStatus::Active);
        assert_eq!(task.reminder_label, "10 minutes before");
    }

    #[test]
    fn all_null_overrides_leave_no_reminder() {
        // Overrides exist but none carries minutes: do not fall back to
        // the default-reminder or start-derived labels.
        let mut event = event_with_start(RawEventStart {
            date: Some("2026-09-14".to_string()),
            ..Default::default()
        });
        event.reminders = Some(overrides(&[None, None]));
        let task = event_to_task(event);
        assert_eq!(task.reminder_status, ReminderStatus::None);
        assert_eq!(task.reminder_label, REMINDER_NOT_SET);
    }

    #[test]
    fn use_default_gets_fixed_label() {
        let mut event = event_with_start(RawEventStart::default());
        event.reminders = Some(RawEventReminders {
            use_default: true,
            overrides: Vec::new(),
        });
        let task = event_to_task(event);
        assert_eq!(task.reminder_status, ReminderStatus::Active);
        assert_eq!(task.reminder_label, "Default reminder");
    }

    #[test]
    fn all_day_event_parses_date_only() {
        let date = Local::now().date_naive() + Duration::days(45);
        let task = event_to_task(event_with_start(RawEventStart {
            date: Some(date.format("%Y-%m-%d").to_string()),
            ..Default::default()
        }));
        assert_eq!(task.due_date, Some(date));
        assert!(task.due_time.is_none());
        assert_eq!(task.reminder_status, ReminderStatus::Active);
        // e.g. Monday, Sep 14
        assert_eq!(task.reminder_label, date.format("%A, %b %d").to_string());
    }

    #[test]
    fn past_start_marks_the_reminder_overdue() {
        let task = event_to_task(event_with_start(RawEventStart {
            date: Some("2001-01-01".to_string()),
            ..Default::default()
        }));
        assert_eq!(task.reminder_status, ReminderStatus::Overdue);

        let mut event = event_with_start(RawEventStart {
            timestamp: Some(RawTimestamp::Utc(
                Utc.with_ymd_and_hms(2001, 1, 1, 9, 0, 0).unwrap(),
            )),
            ..Default::default()
        });
        event.reminders = Some(overrides(&[Some(10)]));
        let task = event_to_task(event);
        assert_eq!(task.reminder_status, ReminderStatus::Overdue);
        assert_eq!(task.reminder_label, "10 minutes before");
    }

    #[test]
    fn unparseable_date_only_degrades_to_no_due_date() {
        let task = event_to_task(event_with_start(RawEventStart {
            date: Some("next tuesday".to_string()),
            ..Default::default()
        }));
        assert!(task.due_date.is_none());
        assert_eq!(task.reminder_status, ReminderStatus::None);
        assert_eq!(task.reminder_label, REMINDER_NOT_SET);
    }

    #[test]
    fn raw_rfc3339_string_converts_to_local() {
        let raw = "2026-09-14T15:00:00+02:00";
        let expected = DateTime::parse_from_rfc3339(raw)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();

        let task = event_to_task(event_with_start(RawEventStart {
            raw: Some(raw.to_string()),
            ..Default::default()
        }));
        assert_eq!(task.due_date, Some(expected.date()));
        assert_eq!(task.due_time, Some(expected.time()));
    }

    #[test]
    fn raw_string_wins_over_decoded_timestamp() {
        let raw = "2026-09-14T15:00:00+02:00";
        let decoy = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let expected = DateTime::parse_from_rfc3339(raw)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();

        let task = event_to_task(event_with_start(RawEventStart {
            raw: Some(raw.to_string()),
            timestamp: Some(RawTimestamp::Utc(decoy)),
            ..Default::default()
        }));
        assert_eq!(task.due_date, Some(expected.date()));
    }

    #[test]
    fn named_zone_converts_to_local() {
        let wall_clock = NaiveDate::from_ymd_opt(2026, 9, 14)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let expected = chrono_tz::America::New_York
            .from_local_datetime(&wall_clock)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();

        let task = event_to_task(event_with_start(RawEventStart {
            timestamp: Some(RawTimestamp::Floating(wall_clock)),
            time_zone: Some("America/New_York".to_string()),
            ..Default::default()
        }));
        assert_eq!(task.due_date, Some(expected.date()));
        assert_eq!(task.due_time, Some(expected.time()));
    }

    #[test]
    fn unknown_zone_falls_back_to_local_as_is() {
        let wall_clock = NaiveDate::from_ymd_opt(2026, 9, 14)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let task = event_to_task(event_with_start(RawEventStart {
            timestamp: Some(RawTimestamp::Floating(wall_clock)),
            time_zone: Some("Mars/Olympus_Mons".to_string()),
            ..Default::default()
        }));
        assert_eq!(task.due_date, Some(wall_clock.date()));
        assert_eq!(task.due_time, Some(wall_clock.time()));
    }

    #[test]
    fn utc_timestamp_converts_to_local() {
        let instant = Utc.with_ymd_and_hms(2026, 9, 14, 13, 0, 0).unwrap();
        let expected = instant.with_timezone(&Local).naive_local();

        let task = event_to_task(event_with_start(RawEventStart {
            timestamp: Some(RawTimestamp::Utc(instant)),
            ..Default::default()
        }));
        assert_eq!(task.due_date, Some(expected.date()));
        assert_eq!(task.due_time, Some(expected.time()));
    }

    #[test]
    fn timed_event_label_uses_twelve_hour_clock() {
        let start = Utc::now() + Duration::days(35);
        let task = event_to_task(event_with_start(RawEventStart {
            timestamp: Some(RawTimestamp::Utc(start)),
            ..Default::default()
        }));
        let local = start.with_timezone(&Local);
        assert_eq!(task.reminder_status, ReminderStatus::Active);
        assert_eq!(
            task.reminder_label,
            format!(
                "{} - {}",
                local.date_naive().format("%A, %b %d"),
                local.time().format("%-I:%M %p")
            )
        );
        assert_eq!(task.due_date.map(|d| d.month()), Some(local.month()));
    }

    #[test]
    fn empty_external_id_becomes_none() {
        let task = event_to_task(RawCalendarEvent {
            id: String::new(),
            summary: Some("Loose note".to_string()),
            start: None,
            reminders: None,
        });
        assert!(task.external_id.is_none());
    }
}
