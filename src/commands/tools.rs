use crate::agent;
use crate::error::Result;

/// Print the tool schema to hand to a tool-calling model.
pub fn run() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&agent::tool_definitions())?);
    Ok(())
}
