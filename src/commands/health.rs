use colored::Colorize;
use serde::Serialize;

use crate::build_info;
use crate::error::Result;
use crate::output::Format;
use crate::timestamp;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    time: String,
    version: &'static str,
    git_sha: Option<&'static str>,
}

pub fn run(format: Format) -> Result<()> {
    let health = Health {
        status: "ok",
        time: timestamp::format(&timestamp::now()),
        version: build_info::version(),
        git_sha: build_info::git_sha(),
    };
    match format {
        Format::Json => println!("{}", serde_json::to_string(&health)?),
        Format::Pretty => {
            println!("{} {}", "ok".green().bold(), health.time);
            println!("  {} {}", "version:".dimmed(), health.version);
            if let Some(sha) = health.git_sha {
                println!("  {} {}", "build:".dimmed(), sha);
            }
        }
        Format::Minimal => println!("{}", health.status),
    }
    Ok(())
}
