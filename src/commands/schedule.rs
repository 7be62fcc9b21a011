use chrono::Utc;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store::files::TaskStore;

/// Auto-schedule a task into today's workday.
pub fn run(store: &TaskStore, id: u64, minutes: Option<u32>, format: Format) -> Result<()> {
    let today = Utc::now().date_naive();
    let task = store.auto_schedule(id, minutes, today)?;
    tracing::info!(id, start = ?task.scheduled_start, "auto-scheduled task");
    output::print_task(&task, format)
}
