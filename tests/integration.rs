use std::fs;
use std::sync::{Arc, Barrier};

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::tempdir;

use prio::agent::{self, ToolResult};
use prio::error::PrioError;
use prio::model::{NewTask, PriorityLabel, TaskPatch};
use prio::store::files::TaskStore;

fn store_in(dir: &std::path::Path) -> TaskStore {
    TaskStore::new(dir.join("tasks_store.json"), dir.join("tasks.json"))
}

#[test]
fn test_full_workflow() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());

    // Create
    let report = store
        .create(
            NewTask {
                priority_score: Some(8),
                category: Some("Finance".into()),
                ..NewTask::titled("Quarterly report")
            },
            "Task captured through API",
        )
        .unwrap();
    assert_eq!(report.id, 1);
    assert_eq!(report.priority_label, PriorityLabel::High);
    assert_eq!(report.description, "Quarterly report");

    let call = store
        .create(
            NewTask {
                priority_score: Some(2),
                estimated_minutes: Some(60),
                ..NewTask::titled("Call plumber")
            },
            "Task captured through API",
        )
        .unwrap();
    assert_eq!(call.id, 2);
    assert_eq!(call.priority_label, PriorityLabel::Low);

    // Update
    let patch = TaskPatch {
        status: Some("In Progress".into()),
        ..TaskPatch::default()
    };
    let updated = store.update(1, patch).unwrap();
    assert_eq!(updated.status, "in progress");
    assert_eq!(updated.history.len(), 2);
    assert!(updated.updated_at >= report.updated_at);

    // Schedule: the report occupies 09:00-10:00, so the call fits at 08:00.
    let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let busy = TaskPatch {
        scheduled_start: Some(Some(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap())),
        scheduled_end: Some(Some(Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap())),
        ..TaskPatch::default()
    };
    store.update(1, busy).unwrap();
    let scheduled = store.auto_schedule(2, None, day).unwrap();
    assert_eq!(
        scheduled.scheduled_start,
        Some(Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap())
    );
    assert_eq!(
        scheduled.scheduled_end,
        Some(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap())
    );
    assert_eq!(scheduled.status, "scheduled");

    // Listing order
    let titles: Vec<String> = store.list().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Quarterly report", "Call plumber"]);

    // Delete
    let removed = store.delete(2).unwrap();
    assert_eq!(removed.title, "Call plumber");
    assert!(matches!(store.get(2), Err(PrioError::TaskNotFound(2))));

    // Reopen from disk
    let reopened = store_in(dir.path());
    assert_eq!(reopened.load(), store.load());
}

#[test]
fn test_save_is_idempotent_on_disk() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    store
        .create(NewTask::titled("Renew passport"), "Task captured through API")
        .unwrap();
    store.save().unwrap();
    let first = fs::read_to_string(store.path()).unwrap();

    let reopened = store_in(dir.path());
    reopened.save().unwrap();
    let second = fs::read_to_string(reopened.path()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_concurrent_creates_get_unique_ids() {
    let dir = tempdir().unwrap();
    let store = Arc::new(store_in(dir.path()));
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|n| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                store
                    .create(NewTask::titled(format!("task {n}")), "Task captured through API")
                    .unwrap()
                    .id
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=workers as u64).collect::<Vec<_>>());

    let on_disk: Vec<Value> =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(on_disk.len(), workers);
}

#[test]
fn test_legacy_list_bootstraps_store() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("tasks.json"),
        json!([
            {"id": 1, "text": "Buy milk", "priority score": 6, "status": "complete",
             "created_at": "2024-03-01T10:00:00", "status_update_time": "2024-03-02T11:30:00"},
            {"text": "Water plants"}
        ])
        .to_string(),
    )
    .unwrap();

    let store = store_in(dir.path());
    let tasks = store.list();
    assert_eq!(tasks.len(), 2);

    let milk = store.get(1).unwrap();
    assert_eq!(milk.priority_label, PriorityLabel::Medium);
    assert_eq!(milk.status, "completed");
    assert_eq!(
        milk.updated_at,
        Utc.with_ymd_and_hms(2024, 3, 2, 11, 30, 0).unwrap()
    );
    assert_eq!(milk.history[0].description, "Imported from legacy tasks.json");

    let plants = tasks.iter().find(|t| t.title == "Water plants").unwrap();
    assert_eq!(plants.id, 2);
    assert_eq!(plants.priority_score, 5);
    assert!(store.path().exists());
}

#[test]
fn test_agent_conversation_round() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());

    let added = agent::handle(
        &store,
        &json!({"function": {"name": "add_task",
            "arguments": "{\"task_text\": \"Email Sarah\", \"priority\": 9}"}}),
    );
    let ToolResult::Done { result, task } = added else {
        panic!("expected done");
    };
    assert_eq!(result, "Task added successfully");
    let task = task.unwrap();
    assert_eq!(task.priority_label, PriorityLabel::High);
    assert_eq!(task.history[0].description, "Task captured through agent");

    let updated = agent::handle(
        &store,
        &json!({"name": "update_task",
            "arguments": {"task_id": task.id, "status": "Completed"}}),
    );
    assert!(!updated.is_error());
    assert_eq!(store.get(task.id).unwrap().status, "completed");

    let listed = serde_json::to_value(agent::handle(
        &store,
        &json!({"name": "list_task", "arguments": {}}),
    ))
    .unwrap();
    assert_eq!(listed["tasks"][0]["priorityLabel"], "High");

    let unknown = agent::handle(&store, &json!({"name": "launch_rocket", "arguments": {}}));
    assert_eq!(
        unknown,
        ToolResult::Failed {
            error: "Unknown function: launch_rocket".into()
        }
    );

    let missing = agent::handle(
        &store,
        &json!({"name": "delete_task", "arguments": {"task_id": 99}}),
    );
    assert_eq!(
        serde_json::to_value(missing).unwrap(),
        json!({"result": "Task not found"})
    );
}
