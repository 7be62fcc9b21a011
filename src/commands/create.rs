use crate::error::Result;
use crate::model::NewTask;
use crate::output::{self, Format};
use crate::store::files::TaskStore;

pub const API_NOTE: &str = "Task captured through API";

pub fn run(store: &TaskStore, new: NewTask, format: Format) -> Result<()> {
    let task = store.create(new, API_NOTE)?;
    tracing::info!(id = task.id, "created task");
    output::print_task(&task, format)
}
