//! Reconciliation of imported tasks against the existing task list.

use shared_types::TaskItem;

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeResult {
    pub added: usize,
    pub updated: usize,
    pub duplicates: usize,
}

impl MergeResult {
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.updated > 0
    }

    /// One-line summary suitable for showing to the user.
    pub fn summary_message(&self) -> String {
        if !self.has_changes() && self.duplicates > 0 {
            return format!(
                "You're already up to date. Skipped {} duplicate {}.",
                self.duplicates,
                if self.duplicates == 1 { "event" } else { "events" }
            );
        }
        if !self.has_changes() {
            return "No new Google Calendar events to import for next month.".to_string();
        }

        let mut parts = Vec::new();
        if self.added > 0 {
            parts.push(format!(
                "{} new {}",
                self.added,
                if self.added == 1 { "event" } else { "events" }
            ));
        }
        if self.updated > 0 {
            parts.push(format!(
                "{} {}",
                self.updated,
                if self.updated == 1 {
                    "task updated"
                } else {
                    "tasks updated"
                }
            ));
        }
        if self.duplicates > 0 {
            parts.push(format!(
                "{} duplicate{} skipped",
                self.duplicates,
                if self.duplicates == 1 { "" } else { "s" }
            ));
        }
        format!("Import complete: {}.", parts.join(", "))
    }
}

/// Merge imported tasks into `existing`, in place.
///
/// Matching prefers the external id (case-insensitive); otherwise an
/// existing task with the same name, due date, and due time is treated
/// as the same task. Matched tasks are overwritten field-by-field only
/// when something actually differs, so unchanged imports count as
/// duplicates and local ids/created-at stamps survive.
///
/// The caller is the single writer of `existing` for the duration of the
/// call; there is no internal locking.
pub fn merge_imported_tasks(
    existing: &mut Vec<TaskItem>,
    imported: impl IntoIterator<Item = TaskItem>,
) -> MergeResult {
    let mut result = MergeResult::default();

    for imported in imported {
        if imported.name.trim().is_empty() {
            continue;
        }

        let by_external_id = imported
            .external_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .and_then(|id| {
                existing.iter().position(|task| {
                    task.external_id
                        .as_deref()
                        .filter(|existing_id| !existing_id.trim().is_empty())
                        .is_some_and(|existing_id| eq_ignore_case(existing_id, id))
                })
            });

        let position = by_external_id.or_else(|| {
            existing.iter().position(|task| {
                eq_ignore_case(&task.name, &imported.name)
                    && task.due_date == imported.due_date
                    && task.due_time == imported.due_time
            })
        });

        match position {
            Some(index) => {
                if apply_imported_values(&mut existing[index], &imported) {
                    result.updated += 1;
                } else {
                    result.duplicates += 1;
                }
            }
            None => {
                existing.push(imported);
                result.added += 1;
            }
        }
    }

    tracing::info!(
        "Calendar import merge result - added: {}, updated: {}, duplicates: {}",
        result.added,
        result.updated,
        result.duplicates
    );

    result
}

/// Copy the imported field values onto an existing task, reporting
/// whether anything changed.
fn apply_imported_values(existing: &mut TaskItem, imported: &TaskItem) -> bool {
    let mut changed = false;

    if existing.name != imported.name {
        existing.name = imported.name.clone();
        changed = true;
    }
    if existing.due_date != imported.due_date {
        existing.due_date = imported.due_date;
        changed = true;
    }
    if existing.due_time != imported.due_time {
        existing.due_time = imported.due_time;
        changed = true;
    }
    if existing.reminder_status != imported.reminder_status {
        existing.reminder_status = imported.reminder_status;
        changed = true;
    }
    if existing.reminder_label != imported.reminder_label {
        existing.reminder_label = imported.reminder_label.clone();
        changed = true;
    }

    let same_external_id = match (&existing.external_id, &imported.external_id) {
        (Some(a), Some(b)) => eq_ignore_case(a, b),
        (None, None) => true,
        _ => false,
    };
    if !same_external_id {
        existing.external_id = imported.external_id.clone();
        changed = true;
    }

    changed
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use shared_types::ReminderStatus;

    fn imported(name: &str, external_id: Option<&str>) -> TaskItem {
        let mut task = TaskItem::new(name);
        task.external_id = external_id.map(str::to_string);
        task.due_date = NaiveDate::from_ymd_opt(2026, 9, 14);
        task.due_time = NaiveTime::from_hms_opt(9, 30, 0);
        task.reminder_status = ReminderStatus::Active;
        task.reminder_label = "10 minutes before".to_string();
        task
    }

    #[test]
    fn unmatched_tasks_are_appended() {
        let mut existing = Vec::new();
        let result = merge_imported_tasks(&mut existing, vec![imported("Team Sync", Some("abc"))]);
        assert_eq!(result, MergeResult { added: 1, updated: 0, duplicates: 0 });
        assert_eq!(existing.len(), 1);
    }

    #[test]
    fn reimporting_the_same_batch_counts_duplicates() {
        let batch = vec![
            imported("Team Sync", Some("abc")),
            imported("1:1", Some("def")),
        ];
        let mut existing = Vec::new();
        let first = merge_imported_tasks(&mut existing, batch.clone());
        assert_eq!(first.added, 2);

        let second = merge_imported_tasks(&mut existing, batch);
        assert_eq!(second.added, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(existing.len(), 2);
    }

    #[test]
    fn changed_title_updates_the_matched_task() {
        let mut existing = vec![imported("Team Sync", Some("abc123"))];
        let original_id = existing[0].id;

        let mut renamed = imported("Team Sync (moved)", Some("abc123"));
        renamed.due_time = NaiveTime::from_hms_opt(10, 0, 0);

        let result = merge_imported_tasks(&mut existing, vec![renamed]);
        assert_eq!(result, MergeResult { added: 0, updated: 1, duplicates: 0 });
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].name, "Team Sync (moved)");
        assert_eq!(existing[0].due_time, NaiveTime::from_hms_opt(10, 0, 0));
        // The local identity survives the update.
        assert_eq!(existing[0].id, original_id);
    }

    #[test]
    fn external_id_matching_ignores_case() {
        let mut existing = vec![imported("Team Sync", Some("ABC123"))];
        let result =
            merge_imported_tasks(&mut existing, vec![imported("Team Sync", Some("abc123"))]);
        // Only the id casing differs, which still counts as an update.
        assert_eq!(result.added, 0);
        assert_eq!(result.updated + result.duplicates, 1);
        assert_eq!(existing.len(), 1);
    }

    #[test]
    fn name_date_time_match_catches_tasks_without_external_id() {
        let mut local_task = TaskItem::new("team sync");
        local_task.due_date = NaiveDate::from_ymd_opt(2026, 9, 14);
        local_task.due_time = NaiveTime::from_hms_opt(9, 30, 0);
        let mut existing = vec![local_task];

        let result = merge_imported_tasks(&mut existing, vec![imported("Team Sync", Some("abc"))]);
        assert_eq!(result, MergeResult { added: 0, updated: 1, duplicates: 0 });
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].external_id.as_deref(), Some("abc"));
    }

    #[test]
    fn same_name_different_time_is_a_new_task() {
        let mut existing = vec![imported("Team Sync", None)];
        let mut later = imported("Team Sync", None);
        later.due_time = NaiveTime::from_hms_opt(16, 0, 0);

        let result = merge_imported_tasks(&mut existing, vec![later]);
        assert_eq!(result.added, 1);
        assert_eq!(existing.len(), 2);
    }

    #[test]
    fn blank_names_are_skipped_entirely() {
        let mut existing = Vec::new();
        let result = merge_imported_tasks(&mut existing, vec![imported("   ", Some("abc"))]);
        assert_eq!(result, MergeResult::default());
        assert!(existing.is_empty());
    }

    #[test]
    fn summary_messages_cover_the_main_shapes() {
        let added = MergeResult { added: 2, updated: 1, duplicates: 1 };
        assert_eq!(
            added.summary_message(),
            "Import complete: 2 new events, 1 task updated, 1 duplicate skipped."
        );

        let only_duplicates = MergeResult { added: 0, updated: 0, duplicates: 3 };
        assert_eq!(
            only_duplicates.summary_message(),
            "You're already up to date. Skipped 3 duplicate events."
        );

        let nothing = MergeResult::default();
        assert_eq!(
            nothing.summary_message(),
            "No new Google Calendar events to import for next month."
        );
    }
}
