//! Load-boundary normalization: raw JSON records in, well-formed tasks out.
//!
//! Nothing here fails. Field-level defects fall back to defaults, only
//! records that are not JSON objects are skipped, and duplicate or missing
//! ids are reassigned. Every recovery is logged at `warn`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{
    DEFAULT_CATEGORY, DEFAULT_SCORE, DEFAULT_STATUS, HistoryEntry, PriorityLabel, Task,
    normalize_status, validate_score,
};
use crate::store::files::next_id;
use crate::timestamp;

pub(crate) const UNTITLED: &str = "Untitled task";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: Value,
    #[serde(default)]
    description: Value,
    #[serde(default)]
    category: Value,
    #[serde(default)]
    priority_score: Value,
    #[serde(default)]
    status: Value,
    #[serde(default)]
    estimated_minutes: Value,
    #[serde(default)]
    scheduled_start: Value,
    #[serde(default)]
    scheduled_end: Value,
    #[serde(default)]
    rationale: Value,
    #[serde(default)]
    suggestions: Value,
    #[serde(default)]
    conflict: Value,
    #[serde(default)]
    history: Value,
    #[serde(default)]
    created_at: Value,
    #[serde(default)]
    updated_at: Value,
}

/// Read an integer out of a JSON number or numeric string.
pub(crate) fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Positive integer id, if the value holds one.
pub(crate) fn id_value(value: &Value) -> Option<u64> {
    int_value(value)
        .and_then(|n| u64::try_from(n).ok())
        .filter(|n| *n > 0)
}

/// Score in `0..=10`, defaulting when absent or invalid.
pub(crate) fn score_value(value: &Value) -> u8 {
    match int_value(value).map(validate_score) {
        Some(Ok(score)) => score,
        Some(Err(_)) => {
            tracing::warn!(%value, "priority score out of range; using default");
            DEFAULT_SCORE
        }
        None => {
            if !value.is_null() {
                tracing::warn!(%value, "unreadable priority score; using default");
            }
            DEFAULT_SCORE
        }
    }
}

fn history_value(value: Value, fallback: DateTime<Utc>) -> Vec<HistoryEntry> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .map(|item| {
            let at = item
                .get("at")
                .and_then(timestamp::from_value)
                .unwrap_or(fallback);
            let description = match item.get("description") {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Null) | None => match item {
                    Value::String(text) => text,
                    other => other.to_string(),
                },
                Some(other) => other.to_string(),
            };
            HistoryEntry { at, description }
        })
        .collect()
}

/// Non-blank string content of a JSON value. Other types read as absent.
pub(crate) fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Null | Value::String(_) => None,
        other => {
            tracing::warn!(value = %other, "non-text value where text was expected; using default");
            None
        }
    }
}

pub(crate) fn text_or(value: &Value, fallback: &str) -> String {
    text_value(value).unwrap_or_else(|| fallback.to_string())
}

impl RawTask {
    fn into_task(self, now: DateTime<Utc>) -> (Task, Option<u64>) {
        let id = id_value(&self.id);
        let score = score_value(&self.priority_score);
        let title = text_or(&self.title, UNTITLED);
        let created_at = timestamp::from_value(&self.created_at).unwrap_or(now);
        let updated_at = timestamp::from_value(&self.updated_at).unwrap_or(now);
        let status = normalize_status(&text_or(&self.status, DEFAULT_STATUS));

        let task = Task {
            id: id.unwrap_or(0),
            description: text_or(&self.description, &title),
            title,
            category: text_or(&self.category, DEFAULT_CATEGORY),
            priority_score: score,
            priority_label: PriorityLabel::from_score(score),
            status,
            estimated_minutes: int_value(&self.estimated_minutes)
                .and_then(|m| u32::try_from(m).ok()),
            scheduled_start: timestamp::from_value(&self.scheduled_start),
            scheduled_end: timestamp::from_value(&self.scheduled_end),
            rationale: text_value(&self.rationale),
            suggestions: match self.suggestions {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|s| s.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            },
            conflict: self.conflict.as_bool().unwrap_or(false),
            history: history_value(self.history, created_at),
            created_at,
            updated_at,
        };
        (task, id)
    }
}

/// Normalize every stored record, skipping anything that is not an object.
pub fn normalize_records(values: Vec<Value>, now: DateTime<Utc>) -> Vec<Task> {
    let parsed = values
        .into_iter()
        .enumerate()
        .filter(|(index, value)| {
            let keep = value.is_object();
            if !keep {
                tracing::warn!(index, "skipping task record that is not an object");
            }
            keep
        })
        .filter_map(|(index, value)| match serde_json::from_value::<RawTask>(value) {
            Ok(raw) => Some(raw.into_task(now)),
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping malformed task record");
                None
            }
        })
        .collect();
    assign_missing_ids(parsed)
}

/// Keep the first occurrence of each valid id; everything else gets the
/// smallest free id, in record order.
pub(crate) fn assign_missing_ids(parsed: Vec<(Task, Option<u64>)>) -> Vec<Task> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(parsed.len());
    let mut pending = Vec::new();

    for (mut task, id) in parsed {
        match id {
            Some(id) if seen.insert(id) => {}
            other => {
                tracing::warn!(id = ?other, title = %task.title, "task record needs a fresh id");
                task.id = 0;
                pending.push(tasks.len());
            }
        }
        tasks.push(task);
    }

    for index in pending {
        let id = next_id(&tasks);
        tasks[index].id = id;
    }
    tasks
}
