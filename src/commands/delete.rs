use crate::error::Result;
use crate::output::{self, Format};
use crate::store::files::TaskStore;

/// Remove a task and print what was removed.
pub fn run(store: &TaskStore, id: u64, format: Format) -> Result<()> {
    let task = store.delete(id)?;
    output::print_task(&task, format)
}
