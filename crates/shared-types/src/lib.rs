//! Shared data types for the task-aid workspace.
//!
//! These are plain serde structs used by both the calendar-sync service
//! and any front end that renders the task list. Keep this crate free of
//! I/O so every consumer can depend on it cheaply.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a task's reminder is live, already missed, or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Active,
    Overdue,
    None,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ReminderStatus::Active => "active",
            ReminderStatus::Overdue => "overdue",
            ReminderStatus::None => "none",
        }
    }
}

/// Reminder label shown for tasks without a reminder.
pub const REMINDER_NOT_SET: &str = "Not set";

/// A single entry in the local task list.
///
/// `external_id` correlates the task with a calendar event so repeated
/// imports update the same entry instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: Uuid,
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub reminder_status: ReminderStatus,
    pub reminder_label: String,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskItem {
    pub fn new(name: impl Into<String>) -> Self {
        TaskItem {
            id: Uuid::new_v4(),
            name: name.into(),
            due_date: None,
            due_time: None,
            reminder_status: ReminderStatus::None,
            reminder_label: REMINDER_NOT_SET.to_string(),
            external_id: None,
            created_at: Utc::now(),
        }
    }

    /// Combined due date and time. A task with a date but no time is due
    /// at the start of that day.
    pub fn due_datetime(&self) -> Option<NaiveDateTime> {
        let date = self.due_date?;
        Some(date.and_time(self.due_time.unwrap_or(NaiveTime::MIN)))
    }

    /// Whether the task's due moment has already passed in local time.
    pub fn is_overdue(&self) -> bool {
        match self.due_datetime() {
            Some(due) => due < Local::now().naive_local(),
            None => false,
        }
    }
}

/// User-tweakable application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// "light" or "dark"
    pub theme: String,
    pub helper_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            theme: "light".to_string(),
            helper_enabled: false,
        }
    }
}

/// The full persisted application snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub tasks: Vec<TaskItem>,
    #[serde(default)]
    pub settings: AppSettings,
    #[serde(default = "default_current_page")]
    pub current_page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_current_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            tasks: Vec::new(),
            settings: AppSettings::default(),
            current_page: default_current_page(),
            page_size: default_page_size(),
        }
    }
}
