use std::io::{BufRead, Write};

use serde_json::Value;

use crate::agent::{self, ToolResult};
use crate::error::{PrioError, Result};
use crate::store::files::TaskStore;

/// Run a single tool call, or serve calls from stdin when `call` is `None`.
pub fn run(store: &TaskStore, call: Option<String>) -> Result<()> {
    let stdout = std::io::stdout();
    match call {
        Some(raw) => {
            let result = handle_line(store, &raw);
            println!("{}", serde_json::to_string(&result)?);
            Ok(())
        }
        None => {
            let handled = serve(store, std::io::stdin().lock(), stdout.lock())?;
            tracing::debug!(handled, "agent input closed");
            Ok(())
        }
    }
}

fn handle_line(store: &TaskStore, line: &str) -> ToolResult {
    match serde_json::from_str::<Value>(line) {
        Ok(value) => agent::handle(store, &value),
        Err(err) => ToolResult::from_error(&PrioError::InvalidToolCall(err.to_string())),
    }
}

/// One tool call per input line, one JSON result per output line.
/// Blank lines are skipped. Returns the number of calls handled.
pub fn serve(store: &TaskStore, input: impl BufRead, mut output: impl Write) -> Result<usize> {
    let mut handled = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result = handle_line(store, &line);
        writeln!(output, "{}", serde_json::to_string(&result)?)?;
        output.flush()?;
        handled += 1;
    }
    Ok(handled)
}
