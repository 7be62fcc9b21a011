use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use prio::config::{Config, LOG_ENV};
use prio::model::{HistoryNote, NewTask, TaskPatch};
use prio::output::Format;
use prio::store::files::TaskStore;
use prio::timestamp;

#[derive(Parser)]
#[command(
    name = "prio",
    version,
    about = "Personal task tracker with priority labels and workday auto-scheduling"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    /// Task store file (default: $PRIO_STORE, then ./tasks_store.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Legacy task list imported once when the store does not exist yet
    /// (default: $PRIO_LEGACY_STORE, then ./tasks.json)
    #[arg(long, global = true)]
    legacy: Option<PathBuf>,
    /// Log debug detail to stderr
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks, highest priority first
    List,
    /// Display a single task
    Show {
        /// Task ID
        id: u64,
    },
    /// Create a new task
    Create(CreateArgs),
    /// Partially update a task; omitted fields are left alone
    Update(UpdateArgs),
    /// Put a task into the first free slot of today's 08:00-18:00 workday
    Schedule {
        /// Task ID
        id: u64,
        /// Slot length (default: the task's estimate, then 30)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Delete a task by ID
    Delete {
        /// Task ID
        id: u64,
    },
    /// Answer agent tool calls: one JSON call per stdin line, one result per stdout line
    Agent {
        /// Run a single tool call given as JSON instead of reading stdin
        #[arg(long)]
        call: Option<String>,
    },
    /// Print the agent tool definitions
    Tools,
    /// Report service status
    Health,
}

#[derive(Args)]
struct CreateArgs {
    /// Task title
    title: String,
    /// Task description (defaults to the title)
    #[arg(long, short)]
    description: Option<String>,
    /// Category (defaults to Administrative)
    #[arg(long)]
    category: Option<String>,
    /// Priority score, 0-10 (default 5)
    #[arg(long, allow_hyphen_values = true)]
    score: Option<i64>,
    /// Initial status (default processing)
    #[arg(long)]
    status: Option<String>,
    /// Estimated minutes (default 30)
    #[arg(long)]
    minutes: Option<u32>,
    /// Scheduled start timestamp
    #[arg(long)]
    start: Option<String>,
    /// Scheduled end timestamp
    #[arg(long)]
    end: Option<String>,
    /// Why this task matters
    #[arg(long)]
    rationale: Option<String>,
    /// Suggestion (repeatable)
    #[arg(long = "suggestion")]
    suggestions: Vec<String>,
    /// Flag the task as conflicting
    #[arg(long)]
    conflict: bool,
    /// Preferred ID (ignored if taken)
    #[arg(long)]
    id: Option<u64>,
}

impl CreateArgs {
    fn into_new_task(self) -> NewTask {
        NewTask {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            priority_score: self.score,
            status: self.status,
            estimated_minutes: self.minutes,
            scheduled_start: parse_time_arg("--start", self.start.as_deref()),
            scheduled_end: parse_time_arg("--end", self.end.as_deref()),
            rationale: self.rationale,
            suggestions: self.suggestions,
            conflict: self.conflict,
        }
    }
}

#[derive(Args)]
struct UpdateArgs {
    /// Task ID
    id: u64,
    /// New title
    #[arg(long)]
    title: Option<String>,
    /// New description
    #[arg(long, short)]
    description: Option<String>,
    /// New category
    #[arg(long)]
    category: Option<String>,
    /// New priority score, 0-10
    #[arg(long, allow_hyphen_values = true)]
    score: Option<i64>,
    /// New status (stored lowercase)
    #[arg(long)]
    status: Option<String>,
    /// New estimate in minutes
    #[arg(long, conflicts_with = "clear_minutes")]
    minutes: Option<u32>,
    /// Remove the estimate
    #[arg(long)]
    clear_minutes: bool,
    /// New scheduled start
    #[arg(long, conflicts_with = "clear_schedule")]
    start: Option<String>,
    /// New scheduled end
    #[arg(long, conflicts_with = "clear_schedule")]
    end: Option<String>,
    /// Remove the scheduled slot
    #[arg(long)]
    clear_schedule: bool,
    /// New rationale
    #[arg(long, conflicts_with = "clear_rationale")]
    rationale: Option<String>,
    /// Remove the rationale
    #[arg(long)]
    clear_rationale: bool,
    /// Replace suggestions (repeatable)
    #[arg(long = "suggestion")]
    suggestions: Option<Vec<String>>,
    /// Set or clear the conflict flag
    #[arg(long)]
    conflict: Option<bool>,
    /// History note to record instead of the automatic one
    #[arg(long)]
    note: Option<String>,
    /// Timestamp for --note (default: now)
    #[arg(long, requires = "note")]
    note_at: Option<String>,
}

impl UpdateArgs {
    fn into_patch(self) -> TaskPatch {
        let clearable = |clear: bool, value: Option<String>| {
            if clear { Some(None) } else { value.map(Some) }
        };
        let time = |clear: bool, flag: &str, value: Option<String>| {
            if clear {
                Some(None)
            } else {
                value.map(|raw| parse_time_arg(flag, Some(&raw)))
            }
        };
        TaskPatch {
            title: self.title,
            description: self.description,
            category: self.category,
            priority_score: self.score,
            status: self.status,
            estimated_minutes: if self.clear_minutes {
                Some(None)
            } else {
                self.minutes.map(Some)
            },
            scheduled_start: time(self.clear_schedule, "--start", self.start),
            scheduled_end: time(self.clear_schedule, "--end", self.end),
            rationale: clearable(self.clear_rationale, self.rationale),
            suggestions: self.suggestions,
            conflict: self.conflict,
            history_entry: self.note.map(|description| HistoryNote {
                description,
                at: self.note_at,
            }),
        }
    }
}

fn parse_time_arg(flag: &str, raw: Option<&str>) -> Option<chrono::DateTime<chrono::Utc>> {
    let raw = raw?;
    let parsed = timestamp::parse(raw);
    if parsed.is_none() {
        tracing::warn!(flag, value = raw, "unparsable timestamp treated as absent");
    }
    parsed
}

fn init_tracing(verbose: bool, quiet: bool) -> Result<(), String> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))
}

fn run(cli: Cli, format: Format) -> prio::error::Result<()> {
    let config = Config::resolve(cli.store, cli.legacy);
    tracing::debug!(store = %config.store_path.display(), legacy = %config.legacy_path.display(), "resolved configuration");
    // Opening is lazy; nothing is read or created until a command uses the store.
    let store = TaskStore::open(&config);

    match cli.command {
        Commands::Tools => prio::commands::tools::run(),
        Commands::Health => prio::commands::health::run(format),
        Commands::List => prio::commands::list::run(&store, format),
        Commands::Show { id } => prio::commands::show::run(&store, id, format),
        Commands::Create(args) => prio::commands::create::run(&store, args.into_new_task(), format),
        Commands::Update(args) => {
            let id = args.id;
            prio::commands::update::run(&store, id, args.into_patch(), format)
        }
        Commands::Schedule { id, minutes } => {
            prio::commands::schedule::run(&store, id, minutes, format)
        }
        Commands::Delete { id } => prio::commands::delete::run(&store, id, format),
        Commands::Agent { call } => prio::commands::agent::run(&store, call),
    }
}

fn main() {
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    if let Err(e) = init_tracing(cli.verbose, cli.quiet) {
        eprintln!("warning: {e}");
    }
    if let Err(e) = run(cli, format) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
