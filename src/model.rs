use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PrioError, Result};
use crate::timestamp;

pub const DEFAULT_CATEGORY: &str = "Administrative";
pub const DEFAULT_STATUS: &str = "processing";
pub const DEFAULT_SCORE: u8 = 5;
pub const DEFAULT_ESTIMATE_MINUTES: u32 = 30;
pub const MAX_SCORE: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityLabel {
    High,
    Medium,
    Low,
}

impl PriorityLabel {
    pub fn from_score(score: u8) -> Self {
        if score >= 8 {
            Self::High
        } else if score >= 4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for PriorityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Check that a caller-supplied score lies in `0..=10`.
pub fn validate_score(score: i64) -> Result<u8> {
    u8::try_from(score)
        .ok()
        .filter(|s| *s <= MAX_SCORE)
        .ok_or(PrioError::InvalidScore(score))
}

pub fn normalize_status(status: &str) -> String {
    status.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(with = "timestamp")]
    pub at: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority_score: u8,
    pub priority_label: PriorityLabel,
    pub status: String,
    pub estimated_minutes: Option<u32>,
    #[serde(default, with = "timestamp::option")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub scheduled_end: Option<DateTime<Utc>>,
    pub rationale: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub conflict: bool,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn set_score(&mut self, score: u8) {
        self.priority_score = score;
        self.priority_label = PriorityLabel::from_score(score);
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = normalize_status(status);
    }

    /// Append a history entry. History is never reordered or pruned.
    pub fn record(&mut self, description: impl Into<String>, at: DateTime<Utc>) {
        self.history.push(HistoryEntry {
            at,
            description: description.into(),
        });
    }

    /// The `[start, end)` span this task occupies, if both ends are set.
    pub fn occupied(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.scheduled_start, self.scheduled_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Re-derive computed fields and fill text defaults.
    pub fn normalize(&mut self) {
        self.set_score(self.priority_score.min(MAX_SCORE));
        self.status = normalize_status(&self.status);
        if self.status.is_empty() {
            self.status = DEFAULT_STATUS.to_string();
        }
        if self.description.trim().is_empty() {
            self.description = self.title.clone();
        }
        if self.category.trim().is_empty() {
            self.category = DEFAULT_CATEGORY.to_string();
        }
    }

    /// Apply a partial update. Validation happens before any field changes,
    /// so a rejected patch leaves the task untouched.
    pub fn apply_update(&mut self, patch: TaskPatch, now: DateTime<Utc>) -> Result<()> {
        let score = patch.priority_score.map(validate_score).transpose()?;
        let mut changed: Vec<&str> = Vec::new();

        if let Some(title) = non_empty(patch.title) {
            self.title = title;
            changed.push("title");
        }
        if let Some(description) = non_empty(patch.description) {
            self.description = description;
            changed.push("description");
        }
        if let Some(category) = non_empty(patch.category) {
            self.category = category;
            changed.push("category");
        }
        if let Some(score) = score {
            self.set_score(score);
            changed.push("priorityScore");
        }
        if let Some(status) = non_empty(patch.status) {
            self.set_status(&status);
            changed.push("status");
        }
        if let Some(minutes) = patch.estimated_minutes {
            self.estimated_minutes = minutes;
            changed.push("estimatedMinutes");
        }
        if let Some(start) = patch.scheduled_start {
            self.scheduled_start = start;
            changed.push("scheduledStart");
        }
        if let Some(end) = patch.scheduled_end {
            self.scheduled_end = end;
            changed.push("scheduledEnd");
        }
        if let Some(rationale) = patch.rationale {
            self.rationale = rationale;
            changed.push("rationale");
        }
        if let Some(suggestions) = patch.suggestions {
            self.suggestions = suggestions;
            changed.push("suggestions");
        }
        if let Some(conflict) = patch.conflict {
            self.conflict = conflict;
            changed.push("conflict");
        }

        match patch.history_entry {
            Some(note) => {
                let at = note.at.as_deref().and_then(timestamp::parse).unwrap_or(now);
                self.record(note.description, at);
            }
            None if changed.is_empty() => self.record("Task updated", now),
            None => self.record(format!("Updated {}", changed.join(", ")), now),
        }
        self.updated_at = now;
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn present_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(Some(raw.as_ref().and_then(timestamp::from_value)))
}

/// A caller-supplied history line; `at` falls back to the update time when
/// missing or unparsable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryNote {
    pub description: String,
    #[serde(default)]
    pub at: Option<String>,
}

/// Partial update. Absent fields are left untouched; for nullable fields an
/// explicit `null` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "priority_score")]
    pub priority_score: Option<i64>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present", alias = "estimated_minutes")]
    pub estimated_minutes: Option<Option<u32>>,
    #[serde(default, deserialize_with = "present_timestamp", alias = "scheduled_start")]
    pub scheduled_start: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present_timestamp", alias = "scheduled_end")]
    pub scheduled_end: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub rationale: Option<Option<String>>,
    pub suggestions: Option<Vec<String>>,
    pub conflict: Option<bool>,
    #[serde(alias = "history_entry")]
    pub history_entry: Option<HistoryNote>,
}

/// Fields accepted when creating a task. Derived fields are not accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTask {
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "priority_score")]
    pub priority_score: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "estimated_minutes")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, with = "timestamp::option", alias = "scheduled_start")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", alias = "scheduled_end")]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub conflict: bool,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build the stored record. `note` becomes the first history entry.
    pub fn into_task(self, id: u64, now: DateTime<Utc>, note: &str) -> Result<Task> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(PrioError::EmptyTitle);
        }
        let score = match self.priority_score {
            Some(score) => validate_score(score)?,
            None => DEFAULT_SCORE,
        };

        let mut task = Task {
            id,
            description: non_empty(self.description).unwrap_or_else(|| title.clone()),
            title,
            category: non_empty(self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            priority_score: score,
            priority_label: PriorityLabel::from_score(score),
            status: non_empty(self.status).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            estimated_minutes: Some(self.estimated_minutes.unwrap_or(DEFAULT_ESTIMATE_MINUTES)),
            scheduled_start: self.scheduled_start,
            scheduled_end: self.scheduled_end,
            rationale: self.rationale,
            suggestions: self.suggestions,
            conflict: self.conflict,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        task.normalize();
        task.record(note, now);
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
    }

    fn sample() -> Task {
        NewTask {
            priority_score: Some(6),
            rationale: Some("blocks release".into()),
            suggestions: vec!["ask Sam".into(), "draft first".into()],
            ..NewTask::titled("Write report")
        }
        .into_task(1, at(7, 0), "Task captured through API")
        .unwrap()
    }

    #[test]
    fn label_thresholds_cover_every_score() {
        for score in 0..=MAX_SCORE {
            let expected = if score >= 8 {
                PriorityLabel::High
            } else if score >= 4 {
                PriorityLabel::Medium
            } else {
                PriorityLabel::Low
            };
            assert_eq!(PriorityLabel::from_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn validate_score_rejects_out_of_range() {
        assert_eq!(validate_score(0).unwrap(), 0);
        assert_eq!(validate_score(10).unwrap(), 10);
        assert!(matches!(validate_score(11), Err(PrioError::InvalidScore(11))));
        assert!(matches!(validate_score(-1), Err(PrioError::InvalidScore(-1))));
    }

    #[test]
    fn new_task_fills_defaults() {
        let task = NewTask::titled("  Call bank ")
            .into_task(4, at(7, 0), "Task captured through API")
            .unwrap();
        assert_eq!(task.title, "Call bank");
        assert_eq!(task.description, "Call bank");
        assert_eq!(task.category, DEFAULT_CATEGORY);
        assert_eq!(task.priority_score, DEFAULT_SCORE);
        assert_eq!(task.priority_label, PriorityLabel::Medium);
        assert_eq!(task.status, "processing");
        assert_eq!(task.estimated_minutes, Some(30));
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn new_task_rejects_blank_title() {
        let err = NewTask::titled("   ")
            .into_task(1, at(7, 0), "x")
            .unwrap_err();
        assert!(matches!(err, PrioError::EmptyTitle));
    }

    #[test]
    fn status_only_patch_touches_nothing_else() {
        let mut task = sample();
        let before = task.clone();
        let patch: TaskPatch = serde_json::from_str(r#"{"status": "COMPLETED"}"#).unwrap();

        task.apply_update(patch, at(9, 0)).unwrap();

        assert_eq!(task.status, "completed");
        assert_eq!(task.updated_at, at(9, 0));
        assert_eq!(task.history.len(), before.history.len() + 1);
        assert_eq!(task.history[..before.history.len()], before.history[..]);

        let mut expected = before;
        expected.status = "completed".into();
        expected.updated_at = at(9, 0);
        expected.history = task.history.clone();
        assert_eq!(task, expected);
    }

    #[test]
    fn score_patch_recomputes_label() {
        let mut task = sample();
        let patch: TaskPatch = serde_json::from_str(r#"{"priority_score": 9}"#).unwrap();
        task.apply_update(patch, at(9, 0)).unwrap();
        assert_eq!(task.priority_score, 9);
        assert_eq!(task.priority_label, PriorityLabel::High);
    }

    #[test]
    fn invalid_score_leaves_task_untouched() {
        let mut task = sample();
        let before = task.clone();
        let patch: TaskPatch =
            serde_json::from_str(r#"{"priorityScore": 42, "title": "changed"}"#).unwrap();
        assert!(task.apply_update(patch, at(9, 0)).is_err());
        assert_eq!(task, before);
    }

    #[test]
    fn explicit_null_clears_nullable_fields() {
        let mut task = sample();
        task.scheduled_start = Some(at(8, 0));
        task.scheduled_end = Some(at(9, 0));
        let patch: TaskPatch = serde_json::from_str(
            r#"{"scheduledStart": null, "scheduledEnd": "garbage", "rationale": null, "estimatedMinutes": null}"#,
        )
        .unwrap();
        task.apply_update(patch, at(9, 0)).unwrap();
        assert_eq!(task.scheduled_start, None);
        assert_eq!(task.scheduled_end, None);
        assert_eq!(task.rationale, None);
        assert_eq!(task.estimated_minutes, None);
    }

    #[test]
    fn empty_text_fields_are_ignored() {
        let mut task = sample();
        let patch: TaskPatch =
            serde_json::from_str(r#"{"title": "", "category": "  "}"#).unwrap();
        task.apply_update(patch, at(9, 0)).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.category, DEFAULT_CATEGORY);
        assert_eq!(task.history.last().unwrap().description, "Task updated");
    }

    #[test]
    fn updated_text_fields_are_trimmed() {
        let mut task = sample();
        let patch: TaskPatch = serde_json::from_str(
            r#"{"title": "  Final report ", "description": " For Friday\n", "category": " Work "}"#,
        )
        .unwrap();
        task.apply_update(patch, at(9, 0)).unwrap();
        assert_eq!(task.title, "Final report");
        assert_eq!(task.description, "For Friday");
        assert_eq!(task.category, "Work");
    }

    #[test]
    fn history_entry_uses_supplied_time_when_parseable() {
        let mut task = sample();
        let patch: TaskPatch = serde_json::from_str(
            r#"{"historyEntry": {"description": "Called back", "at": "2026-10-19T08:15:00.250Z"}}"#,
        )
        .unwrap();
        task.apply_update(patch, at(9, 0)).unwrap();
        let last = task.history.last().unwrap();
        assert_eq!(last.description, "Called back");
        assert_eq!(last.at, at(8, 15));

        let patch: TaskPatch = serde_json::from_str(
            r#"{"historyEntry": {"description": "Later", "at": "soon"}}"#,
        )
        .unwrap();
        task.apply_update(patch, at(9, 30)).unwrap();
        assert_eq!(task.history.last().unwrap().at, at(9, 30));
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let err = serde_json::from_str::<TaskPatch>(r#"{"priorityLabel": "High"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn task_serializes_camel_case_with_nulls() {
        let task = sample();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["priorityScore"], 6);
        assert_eq!(json["priorityLabel"], "Medium");
        assert_eq!(json["createdAt"], "2026-10-19T07:00:00Z");
        assert!(json["scheduledStart"].is_null());
        assert_eq!(json["history"][0]["at"], "2026-10-19T07:00:00Z");
    }
}
