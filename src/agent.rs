//! Tool surface for an external tool-calling chat loop.
//!
//! A model emits calls such as `{"function": {"name": "add_task",
//! "arguments": {"task_text": "Email Sarah"}}}`; each is parsed into a
//! [`ToolCall`] and run against the store by [`dispatch`].

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::{PrioError, Result};
use crate::model::{NewTask, Task, TaskPatch};
use crate::store::files::TaskStore;
use crate::store::records::{id_value, int_value};

pub const AGENT_NOTE: &str = "Task captured through agent";

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListTask,
    SaveTask,
    AddTask {
        task_text: String,
        category: Option<String>,
        priority: Option<i64>,
    },
    DeleteTask {
        task_id: u64,
    },
    UpdateTask {
        task_id: u64,
        patch: TaskPatch,
    },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListTask => "list_task",
            Self::SaveTask => "save_task",
            Self::AddTask { .. } => "add_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::UpdateTask { .. } => "update_task",
        }
    }

    /// Parse either `{"function": {"name", "arguments"}}` or `{"name", "arguments"}`.
    /// `arguments` may be an object or a JSON-encoded object.
    pub fn parse(value: &Value) -> Result<Self> {
        let call = value.get("function").unwrap_or(value);
        let name = call
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| PrioError::InvalidToolCall("missing function name".into()))?;
        let mut args = arguments(call.get("arguments"))?;

        match name {
            "list_task" => Ok(Self::ListTask),
            "save_task" => Ok(Self::SaveTask),
            "add_task" => {
                let task_text = args
                    .remove("task_text")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| PrioError::InvalidToolCall("add_task needs task_text".into()))?;
                let category = args
                    .remove("category")
                    .and_then(|v| v.as_str().map(str::to_string));
                let priority = match args.remove("priority") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(int_value(&v).ok_or_else(|| {
                        PrioError::InvalidToolCall(format!("priority must be an integer, got {v}"))
                    })?),
                };
                Ok(Self::AddTask {
                    task_text,
                    category,
                    priority,
                })
            }
            "delete_task" => Ok(Self::DeleteTask {
                task_id: take_id(&mut args)?,
            }),
            "update_task" => {
                let task_id = take_id(&mut args)?;
                let patch = serde_json::from_value(Value::Object(args))
                    .map_err(|e| PrioError::InvalidToolCall(format!("update_task: {e}")))?;
                Ok(Self::UpdateTask { task_id, patch })
            }
            other => Err(PrioError::UnknownTool(other.to_string())),
        }
    }
}

fn arguments(raw: Option<&Value>) -> Result<Map<String, Value>> {
    match raw {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(Map::new()),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => Ok(map),
            other => Err(PrioError::InvalidToolCall(format!(
                "arguments must be an object, got {other}"
            ))),
        },
        Some(other) => Err(PrioError::InvalidToolCall(format!(
            "arguments must be an object, got {other}"
        ))),
    }
}

fn take_id(args: &mut Map<String, Value>) -> Result<u64> {
    args.remove("task_id")
        .as_ref()
        .and_then(id_value)
        .ok_or_else(|| PrioError::InvalidToolCall("task_id must be a positive integer".into()))
}

/// What a tool call hands back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    Tasks {
        tasks: Vec<Task>,
    },
    Done {
        result: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        task: Option<Task>,
    },
    Failed {
        error: String,
    },
}

impl ToolResult {
    fn done(result: &str, task: Option<Task>) -> Self {
        Self::Done {
            result: result.to_string(),
            task,
        }
    }

    pub fn from_error(err: &PrioError) -> Self {
        Self::Failed {
            error: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Run one tool call against the store.
pub fn dispatch(store: &TaskStore, call: ToolCall) -> ToolResult {
    tracing::debug!(tool = call.name(), "dispatching tool call");
    match call {
        ToolCall::ListTask => {
            // The file may have changed under us; always show fresh data.
            store.reload();
            ToolResult::Tasks {
                tasks: store.list(),
            }
        }
        ToolCall::SaveTask => match store.save() {
            Ok(()) => ToolResult::done("Tasks saved successfully", None),
            Err(err) => ToolResult::from_error(&err),
        },
        ToolCall::AddTask {
            task_text,
            category,
            priority,
        } => {
            let new = NewTask {
                category,
                priority_score: priority,
                ..NewTask::titled(task_text)
            };
            match store.create(new, AGENT_NOTE) {
                Ok(task) => ToolResult::done("Task added successfully", Some(task)),
                Err(err) => ToolResult::from_error(&err),
            }
        }
        ToolCall::DeleteTask { task_id } => match store.delete(task_id) {
            Ok(_) => ToolResult::done("Task deleted successfully", None),
            Err(PrioError::TaskNotFound(_)) => ToolResult::done("Task not found", None),
            Err(err) => ToolResult::from_error(&err),
        },
        ToolCall::UpdateTask { task_id, patch } => match store.update(task_id, patch) {
            Ok(task) => ToolResult::done("Task updated successfully", Some(task)),
            Err(PrioError::TaskNotFound(_)) => ToolResult::done("Task not found", None),
            Err(err) => ToolResult::from_error(&err),
        },
    }
}

/// Parse and run a raw tool call; parse failures become `{"error": ...}`.
pub fn handle(store: &TaskStore, raw: &Value) -> ToolResult {
    match ToolCall::parse(raw) {
        Ok(call) => dispatch(store, call),
        Err(err) => {
            tracing::warn!(error = %err, "rejected tool call");
            ToolResult::from_error(&err)
        }
    }
}

/// Function schema for the five tools, in the shape tool-calling chat APIs expect.
pub fn tool_definitions() -> Value {
    let task_id = json!({
        "type": "integer",
        "description": "Task ID number assigned to each task"
    });
    json!([
        {
            "type": "function",
            "function": {
                "name": "list_task",
                "description": "Load and display the user's current task list from storage. Use this whenever the user wants to see, show, list, display, or view their tasks.",
                "parameters": {"type": "object", "properties": {}, "required": []}
            }
        },
        {
            "type": "function",
            "function": {
                "name": "save_task",
                "description": "Save the task list",
                "parameters": {"type": "object", "properties": {}, "required": []}
            }
        },
        {
            "type": "function",
            "function": {
                "name": "add_task",
                "description": "Add tasks to the task list",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "task_text": {"type": "string", "description": "String description of what the task is"},
                        "category": {"type": "string", "description": "Optional category, e.g. Administrative"},
                        "priority": {"type": "integer", "description": "Optional priority score from 0 (lowest) to 10 (highest)"}
                    },
                    "required": ["task_text"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "delete_task",
                "description": "Delete task from the task list",
                "parameters": {
                    "type": "object",
                    "properties": {"task_id": task_id},
                    "required": ["task_id"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "update_task",
                "description": "Update task fields; only the fields given are changed",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "task_id": task_id,
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "category": {"type": "string"},
                        "status": {"type": "string", "description": "e.g. processing, scheduled, completed"},
                        "priorityScore": {"type": "integer", "description": "0 to 10"},
                        "estimatedMinutes": {"type": "integer"},
                        "rationale": {"type": "string"},
                        "conflict": {"type": "boolean"}
                    },
                    "required": ["task_id"]
                }
            }
        }
    ])
}
