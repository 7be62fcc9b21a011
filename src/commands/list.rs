use crate::error::Result;
use crate::output::{self, Format};
use crate::store::files::TaskStore;

/// Print every task, highest priority first.
pub fn run(store: &TaskStore, format: Format) -> Result<()> {
    let tasks = store.list();
    output::print_tasks(&tasks, format)
}
