use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "lazyplan",
    version,
    about = "Terminal client for the least-optimal day scheduler"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project plan in the current directory
    Init {
        /// Optional plan name
        #[arg(long)]
        name: Option<String>,
    },
    /// List tasks in the current plan
    List,
    /// Add a task to the plan
    Add {
        /// What to do
        name: String,
        /// Duration in hours (at least 0.1)
        #[arg(long, default_value_t = 1.0)]
        length: f64,
        /// Where it happens
        #[arg(long, default_value = "")]
        location: String,
        /// Start time in HH:MM; omit for a flexible task
        #[arg(long)]
        start: Option<String>,
        /// Light or Medium for flexible tasks, Medium or Deep for fixed
        #[arg(long)]
        intensity: Option<String>,
    },
    /// Remove a task from the plan
    Remove {
        /// Task id to remove
        task_id: String,
    },
    /// Submit the plan to the scheduler and print the result
    Schedule {
        /// Scheduler base URL (overrides the plan setting)
        #[arg(long)]
        url: Option<String>,
        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Print a calendar event link for each scheduled block
    Export {
        /// Scheduler base URL (overrides the plan setting)
        #[arg(long)]
        url: Option<String>,
        /// Timezone identifier for the event links
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Launch the interactive TUI
    Tui,
}
