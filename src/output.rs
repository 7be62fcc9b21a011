use clap::ValueEnum;
use colored::{ColoredString, Colorize};

use crate::error::Result;
use crate::model::{PriorityLabel, Task};
use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

fn label(label: PriorityLabel) -> ColoredString {
    let text = label.to_string();
    match label {
        PriorityLabel::High => text.red().bold(),
        PriorityLabel::Medium => text.yellow(),
        PriorityLabel::Low => text.green(),
    }
}

fn schedule_span(task: &Task) -> String {
    match task.occupied() {
        Some((start, end)) => format!("{} -> {}", timestamp::format(&start), timestamp::format(&end)),
        None => "-".to_string(),
    }
}

pub fn print_task(task: &Task, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(task)?),
        Format::Pretty => {
            println!(
                "{} {} ({})",
                format!("[{}]", task.id).cyan().bold(),
                task.title,
                task.status
            );
            if task.description != task.title {
                println!("  {}", task.description);
            }
            println!(
                "  {} {} {} | {} {}",
                "priority:".dimmed(),
                task.priority_score,
                label(task.priority_label),
                "category:".dimmed(),
                task.category
            );
            if let Some(minutes) = task.estimated_minutes {
                println!("  {} {minutes}m", "estimate:".dimmed());
            }
            if task.occupied().is_some() {
                println!("  {} {}", "scheduled:".dimmed(), schedule_span(task));
            }
            if let Some(ref rationale) = task.rationale {
                println!("  {} {}", "rationale:".dimmed(), rationale);
            }
            if !task.suggestions.is_empty() {
                println!("  {} {}", "suggestions:".dimmed(), task.suggestions.join("; "));
            }
            if task.conflict {
                println!("  {}", "conflict".red());
            }
            if let Some(last) = task.history.last() {
                println!(
                    "  {} {} {}",
                    "last:".dimmed(),
                    timestamp::format(&last.at),
                    last.description
                );
            }
        }
        Format::Minimal => println!("{}", minimal_row(task)),
    }
    Ok(())
}

fn minimal_row(task: &Task) -> String {
    format!(
        "{:>4} {:20} {:>5} {:6} {:12} {}",
        task.id,
        truncate_title(&task.title, 20),
        task.priority_score,
        task.priority_label.to_string(),
        task.status,
        schedule_span(task)
    )
}

pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() > max_len {
        let truncated: String = title.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}

pub fn print_tasks(tasks: &[Task], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(tasks)?),
        Format::Pretty => {
            if tasks.is_empty() {
                println!("{}", "No tasks.".dimmed());
            }
            for task in tasks {
                print_task(task, Format::Pretty)?;
                println!();
            }
        }
        Format::Minimal => {
            println!(
                "{:>4} {:20} {:>5} {:6} {:12} SCHEDULED",
                "ID", "TITLE", "SCORE", "LABEL", "STATUS"
            );
            println!("{}", "-".repeat(72));
            for task in tasks {
                println!("{}", minimal_row(task));
            }
        }
    }
    Ok(())
}
