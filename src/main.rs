use std::path::PathBuf;

use clap::{Parser, Subcommand};
use protask::commands::create::NewTask;
use protask::config::find_workspace_root;
use protask::model::{GoalStatus, Priority, Status};
use protask::output::{self, Format};

#[derive(Parser)]
#[command(
    name = "protask",
    version,
    about = "Local goal and task tracker with write-ahead durability"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    /// Workspace root (defaults to $PROTASK_ROOT, then the nearest directory containing .protask/)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .protask/ with a default config in the workspace root
    Init,
    /// Add a new goal
    AddGoal {
        /// Goal title
        title: String,
        #[arg(long, value_enum, default_value = "medium")]
        priority: Priority,
        /// Background for the goal
        #[arg(long)]
        context: Option<String>,
        #[arg(long, value_enum, default_value = "active")]
        status: GoalStatus,
    },
    /// Add a task to a goal
    AddTask {
        /// Goal id or part of its title (case-insensitive)
        goal: String,
        /// Task title
        title: String,
        /// Task priority (defaults to the goal's)
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Task IDs this task depends on (comma-separated)
        #[arg(long, value_delimiter = ',')]
        depends_on: Vec<String>,
        /// Estimated minutes to complete
        #[arg(long)]
        estimate: Option<u32>,
        /// Mark the task as recurring
        #[arg(long)]
        recurring: bool,
    },
    /// List goals
    ListGoals {
        #[arg(long, value_enum)]
        status: Option<GoalStatus>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
    },
    /// List tasks, optionally for one goal
    ListTasks {
        /// Goal id or part of its title
        goal: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
    },
    /// Pick the next task to work on
    NextTask {
        /// Only tasks of this goal (a `goal_` id, matched as is, or part of a title)
        #[arg(long)]
        goal: Option<String>,
        /// Only tasks estimated at or below this many minutes
        #[arg(long)]
        max_estimate: Option<u32>,
    },
    /// Update a task's status, priority, notes or dependencies
    UpdateTask {
        task_id: String,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Note to append
        #[arg(long)]
        notes: Option<String>,
        /// Task IDs to add as dependencies (comma-separated)
        #[arg(long, value_delimiter = ',')]
        depends_on: Vec<String>,
    },
    /// Update a goal's status, priority or context
    UpdateGoal {
        /// Goal id or part of its title
        goal: String,
        #[arg(long, value_enum)]
        status: Option<GoalStatus>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        context: Option<String>,
    },
    /// Mark a task as completed
    CompleteTask {
        task_id: String,
        /// Completion notes (appended)
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record task progress (0-100)
    MarkProgress {
        task_id: String,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        progress: u8,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Log minutes spent on a task
    LogTime {
        task_id: String,
        minutes: u32,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark a task as blocked
    MarkBlocked {
        task_id: String,
        /// Why the task is blocked
        reason: String,
    },
    /// Check task invariants and repair what can be repaired
    HealthCheck,
    /// Overall counts and recent completions
    Status,
    /// Show the write-ahead log history of a task
    Log { task_id: String },
    /// Move the working buffer into today's memory file
    FlushBuffer,
}

fn run(cli: Cli, format: Format) -> protask::error::Result<()> {
    let root = find_workspace_root(cli.root)?;
    tracing::debug!(root = %root.display(), "workspace resolved");

    match cli.command {
        Commands::Init => protask::commands::init::run(&root, format),
        Commands::AddGoal {
            title,
            priority,
            context,
            status,
        } => protask::commands::create::run_goal(&root, title, priority, context, status, format),
        Commands::AddTask {
            goal,
            title,
            priority,
            depends_on,
            estimate,
            recurring,
        } => protask::commands::create::run_task(
            &root,
            NewTask {
                goal,
                title,
                priority,
                depends_on,
                estimate_minutes: estimate,
                recurring,
            },
            format,
        ),
        Commands::ListGoals { status, priority } => {
            protask::commands::list::goals(&root, status, priority, format)
        }
        Commands::ListTasks {
            goal,
            status,
            priority,
        } => protask::commands::list::tasks(&root, goal, status, priority, format),
        Commands::NextTask { goal, max_estimate } => {
            protask::commands::next::run(&root, goal, max_estimate, format)
        }
        Commands::UpdateTask {
            task_id,
            status,
            priority,
            notes,
            depends_on,
        } => protask::commands::edit::run_task(
            &root, &task_id, status, priority, notes, depends_on, format,
        ),
        Commands::UpdateGoal {
            goal,
            status,
            priority,
            context,
        } => protask::commands::edit::run_goal(&root, &goal, status, priority, context, format),
        Commands::CompleteTask { task_id, notes } => {
            protask::commands::lifecycle::run_complete(&root, &task_id, notes, format)
        }
        Commands::MarkProgress {
            task_id,
            progress,
            notes,
        } => protask::commands::lifecycle::run_progress(&root, &task_id, progress, notes, format),
        Commands::LogTime {
            task_id,
            minutes,
            notes,
        } => protask::commands::lifecycle::run_log_time(&root, &task_id, minutes, notes, format),
        Commands::MarkBlocked { task_id, reason } => {
            protask::commands::lifecycle::run_blocked(&root, &task_id, reason, format)
        }
        Commands::HealthCheck => protask::commands::health::run(&root, format),
        Commands::Status => protask::commands::status::run(&root, format),
        Commands::Log { task_id } => protask::commands::log::run(&root, &task_id, format),
        Commands::FlushBuffer => protask::commands::flush::run(&root, format),
    }
}

fn main() {
    protask::logging::init();
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    if let Err(e) = run(cli, format) {
        tracing::debug!(code = e.code(), "command failed");
        output::print_error(&e, format);
        std::process::exit(1);
    }
}
