//! One-time import of the older `tasks.json` list kept by the first agent
//! prototype: `{id, text, created_at, status, status_update_time}` records
//! with an optional `priority score` / `priority_score`.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{DEFAULT_CATEGORY, PriorityLabel, Task, normalize_status};
use crate::store::records::{
    UNTITLED, assign_missing_ids, id_value, int_value, score_value, text_or, text_value,
};
use crate::timestamp;

pub const IMPORT_NOTE: &str = "Imported from legacy tasks.json";
const IMPORTED_DESCRIPTION: &str = "Imported task";
const LEGACY_STATUS: &str = "incomplete";

#[derive(Debug, Deserialize)]
struct LegacyTask {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    text: Value,
    #[serde(default)]
    category: Value,
    #[serde(default, rename = "priority score")]
    spaced_score: Value,
    #[serde(default)]
    priority_score: Value,
    #[serde(default)]
    status: Value,
    #[serde(default)]
    created_at: Value,
    #[serde(default)]
    status_update_time: Value,
}

impl LegacyTask {
    fn into_task(self, position: usize, now: DateTime<Utc>) -> (Task, Option<u64>) {
        let id = id_value(&self.id).or_else(|| u64::try_from(position + 1).ok());
        let score_source = if int_value(&self.spaced_score).is_some() {
            &self.spaced_score
        } else {
            &self.priority_score
        };
        let score = score_value(score_source);
        let created_at = timestamp::from_value(&self.created_at).unwrap_or(now);
        let updated_at = timestamp::from_value(&self.status_update_time).unwrap_or(created_at);

        let status = normalize_status(&text_or(&self.status, LEGACY_STATUS));
        let status = if status == "complete" {
            "completed".to_string()
        } else {
            status
        };
        let text = text_value(&self.text);

        let mut task = Task {
            id: id.unwrap_or(0),
            title: text.clone().unwrap_or_else(|| UNTITLED.to_string()),
            description: text.unwrap_or_else(|| IMPORTED_DESCRIPTION.to_string()),
            category: text_or(&self.category, DEFAULT_CATEGORY),
            priority_score: score,
            priority_label: PriorityLabel::from_score(score),
            status,
            estimated_minutes: None,
            scheduled_start: None,
            scheduled_end: None,
            rationale: None,
            suggestions: Vec::new(),
            conflict: false,
            history: Vec::new(),
            created_at,
            updated_at,
        };
        task.record(IMPORT_NOTE, created_at);
        (task, id)
    }
}

/// Map legacy records into current tasks.
pub fn import_records(values: Vec<Value>, now: DateTime<Utc>) -> Vec<Task> {
    let parsed = values
        .into_iter()
        .enumerate()
        .filter(|(position, value)| {
            let keep = value.is_object();
            if !keep {
                tracing::warn!(position, "skipping legacy record that is not an object");
            }
            keep
        })
        .filter_map(
            |(position, value)| match serde_json::from_value::<LegacyTask>(value) {
                Ok(legacy) => Some(legacy.into_task(position, now)),
                Err(err) => {
                    tracing::warn!(position, error = %err, "skipping unreadable legacy record");
                    None
                }
            },
        )
        .collect();
    assign_missing_ids(parsed)
}

/// Read the legacy file, if any. Missing, unreadable or malformed files
/// bootstrap an empty collection.
pub fn bootstrap(path: &Path, now: DateTime<Utc>) -> Vec<Task> {
    if !path.exists() {
        return Vec::new();
    }
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cannot read legacy task list");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<Value>>(&data) {
        Ok(values) => {
            let tasks = import_records(values, now);
            tracing::info!(path = %path.display(), count = tasks.len(), "imported legacy tasks");
            tasks
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "legacy task list is not a JSON array");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn maps_buy_milk_record() {
        let tasks = import_records(
            vec![json!({"text": "Buy milk", "priority_score": 7, "status": "complete"})],
            now(),
        );
        let task = &tasks[0];
        assert_eq!(task.id, 1);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "Buy milk");
        assert_eq!(task.priority_score, 7);
        assert_eq!(task.priority_label, PriorityLabel::Medium);
        assert_eq!(task.status, "completed");
        assert_eq!(task.category, DEFAULT_CATEGORY);
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.history[0].description, IMPORT_NOTE);
    }

    #[test]
    fn prefers_spaced_score_key_and_keeps_timestamps() {
        let tasks = import_records(
            vec![json!({
                "id": 4,
                "text": "File taxes",
                "priority score": 9,
                "priority_score": 2,
                "status": "Incomplete",
                "created_at": "2025-03-01T10:15:42.918273",
                "status_update_time": "2025-03-02T08:00:00.5"
            })],
            now(),
        );
        let task = &tasks[0];
        assert_eq!(task.id, 4);
        assert_eq!(task.priority_score, 9);
        assert_eq!(task.priority_label, PriorityLabel::High);
        assert_eq!(task.status, "incomplete");
        assert_eq!(
            task.created_at,
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 42).unwrap()
        );
        assert_eq!(
            task.updated_at,
            Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap()
        );
        assert_eq!(task.history[0].at, task.created_at);
    }

    #[test]
    fn missing_fields_fall_back() {
        let tasks = import_records(vec![json!({})], now());
        let task = &tasks[0];
        assert_eq!(task.title, UNTITLED);
        assert_eq!(task.description, IMPORTED_DESCRIPTION);
        assert_eq!(task.priority_score, 5);
        assert_eq!(task.status, "incomplete");
        assert_eq!(task.created_at, now());
        assert_eq!(task.updated_at, now());
    }

    #[test]
    fn mistyped_fields_keep_the_record() {
        let tasks = import_records(
            vec![
                json!({"id": 2, "text": 99, "category": 1, "status": null, "priority score": 8}),
                json!("stray"),
                json!({"id": 3, "text": "Walk dog", "status": ""}),
            ],
            now(),
        );
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, 2);
        assert_eq!(tasks[0].title, UNTITLED);
        assert_eq!(tasks[0].category, DEFAULT_CATEGORY);
        assert_eq!(tasks[0].status, "incomplete");
        assert_eq!(tasks[0].priority_label, PriorityLabel::High);
        assert_eq!(tasks[1].status, "incomplete");
    }

    #[test]
    fn bootstrap_tolerates_missing_and_corrupt_files() {
        let dir = tempdir().unwrap();
        assert!(bootstrap(&dir.path().join("absent.json"), now()).is_empty());

        let corrupt = dir.path().join("tasks.json");
        fs::write(&corrupt, "{ not json").unwrap();
        assert!(bootstrap(&corrupt, now()).is_empty());
    }
}
