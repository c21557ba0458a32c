use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use planner_domain::DependencyKind;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Task dependencies and critical-path scheduling", long_about = None)]
#[command(version, arg_required_else_help = true)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PLANNER_COMMIT_HASH"), ")"))]
pub struct Cli {
    /// Path to the planner data file (or set PLANNER_FILE env var)
    #[arg(long, global = true, value_name = "FILE", env = "PLANNER_FILE")]
    pub file: Option<PathBuf>,

    /// Project the command works on
    #[arg(long, global = true, env = "PLANNER_PROJECT", default_value_t = Uuid::nil())]
    pub project: Uuid,

    /// Engine config file; defaults to the user config location
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Task operations
    Task(TaskCommand),
    /// Dependency operations
    Dep(DepCommand),
    /// Scheduling analyses
    Schedule(ScheduleCommand),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// Task commands
#[derive(Args)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the project
    Add {
        #[arg(long)]
        title: String,
        /// Estimated effort in hours
        #[arg(long)]
        hours: Option<f64>,
    },
    /// List tasks of the project
    List,
    /// Mark a task as completed
    Complete {
        #[arg(long)]
        id: Uuid,
    },
    /// Record progress on a task
    Progress {
        #[arg(long)]
        id: Uuid,
        /// Percent complete, 0-100
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
}

// Dependency commands
#[derive(Args)]
pub struct DepCommand {
    #[command(subcommand)]
    pub action: DepAction,
}

#[derive(Subcommand)]
pub enum DepAction {
    /// Create a dependency between two tasks
    Add(DepAddArgs),
    /// Create several finish-to-start dependencies at once, all or nothing
    AddBatch {
        /// PREDECESSOR:SUCCESSOR pair; repeat for more
        #[arg(long = "link", required = true, value_parser = parse_link)]
        links: Vec<(Uuid, Uuid)>,
    },
    /// Update kind, lag or notes of a dependency
    Update(DepUpdateArgs),
    /// Remove dependencies by id
    Remove {
        #[arg(long = "id", required = true)]
        ids: Vec<Uuid>,
    },
    /// List dependencies
    List {
        /// Only the dependencies of this task
        #[arg(long)]
        task: Option<Uuid>,
        /// Include deactivated dependencies
        #[arg(long)]
        all: bool,
    },
    /// Deactivate every dependency of a task
    Deactivate {
        #[arg(long)]
        task: Uuid,
    },
    /// Reactivate the deactivated dependencies of a task
    Reactivate {
        #[arg(long)]
        task: Uuid,
    },
    /// Shortest dependency chain between two tasks
    Path {
        #[arg(long)]
        from: Uuid,
        #[arg(long)]
        to: Uuid,
    },
}

#[derive(Args)]
pub struct DepAddArgs {
    #[arg(long)]
    pub predecessor: Uuid,
    #[arg(long)]
    pub successor: Uuid,
    /// FS, SS, FF or SF
    #[arg(long, default_value_t = DependencyKind::FinishToStart)]
    pub kind: DependencyKind,
    #[arg(long, allow_negative_numbers = true)]
    pub lag: Option<f64>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct DepUpdateArgs {
    #[arg(long)]
    pub id: Uuid,
    #[arg(long)]
    pub kind: Option<DependencyKind>,
    #[arg(long, allow_negative_numbers = true)]
    pub lag: Option<f64>,
    #[arg(long, conflicts_with = "clear_notes")]
    pub notes: Option<String>,
    #[arg(long)]
    pub clear_notes: bool,
}

// Schedule commands
#[derive(Args)]
pub struct ScheduleCommand {
    #[command(subcommand)]
    pub action: ScheduleAction,
}

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Compute the critical path and per-task timings
    CriticalPath,
    /// Total float of one task
    Float {
        #[arg(long)]
        task: Uuid,
    },
    /// Tasks that can start now
    Ready,
    /// Tasks waiting on unmet dependencies
    Blocked,
    /// Suggestions for shortening the project
    Optimize,
    /// Audit the dependency graph
    Validate,
    /// Dependency counts per kind
    Stats,
    /// Overall schedule risk
    Risk,
    /// Dependencies with long lags
    External {
        #[arg(long, default_value_t = 24.0)]
        min_lag: f64,
    },
    /// Tasks with the most dependencies
    Connected {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Store critical-path flags on dependencies
    MarkCritical,
}

fn parse_link(value: &str) -> Result<(Uuid, Uuid), String> {
    let (predecessor, successor) = value
        .split_once(':')
        .ok_or_else(|| format!("expected PREDECESSOR:SUCCESSOR, got '{}'", value))?;
    let parse = |s: &str| Uuid::parse_str(s.trim()).map_err(|e| format!("{}: {}", s, e));
    Ok((parse(predecessor)?, parse(successor)?))
}
