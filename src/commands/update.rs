use crate::error::Result;
use crate::model::TaskPatch;
use crate::output::{self, Format};
use crate::store::files::TaskStore;

/// Apply a partial update; fields left out of `patch` keep their values.
pub fn run(store: &TaskStore, id: u64, patch: TaskPatch, format: Format) -> Result<()> {
    let task = store.update(id, patch)?;
    output::print_task(&task, format)
}
