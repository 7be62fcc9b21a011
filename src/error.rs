use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrioError {
    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("no free {minutes}-minute slot between 08:00 and 18:00 on {date}")]
    SchedulingExhausted { date: NaiveDate, minutes: u32 },

    #[error("priority score {0} is outside 0..=10")]
    InvalidScore(i64),

    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("invalid tool call: {0}")]
    InvalidToolCall(String),

    #[error("Unknown function: {0}")]
    UnknownTool(String),

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrioError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TaskNotFound(_) => "task_not_found",
            Self::SchedulingExhausted { .. } => "scheduling_exhausted",
            Self::InvalidScore(_) => "invalid_score",
            Self::EmptyTitle => "empty_title",
            Self::InvalidToolCall(_) => "invalid_tool_call",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Locked(_) => "locked",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, PrioError>;
