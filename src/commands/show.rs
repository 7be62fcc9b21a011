use crate::error::Result;
use crate::output::{self, Format};
use crate::store::files::TaskStore;

pub fn run(store: &TaskStore, id: u64, format: Format) -> Result<()> {
    let task = store.get(id)?;
    output::print_task(&task, format)
}
