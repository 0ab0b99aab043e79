//! Command-line interface for taskpad.
//!
//! Parsing is done with `clap`; [`run`] executes a parsed command and
//! returns its output instead of printing, so every command is testable.

mod run;

#[cfg(test)]
mod tests;

pub use run::{run, CliOutput};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Local task list with reminders.
///
/// Tasks live in a `SQLite` database in the data directory. Reminders are
/// queued alongside and delivered by `taskpad watch`.
#[derive(Parser, Debug)]
#[command(name = "taskpad")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (default: $TASKPAD_HOME, else ~/.taskpad)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task.
    ///
    /// With `--every` the task repeats its reminder on that interval. With
    /// `--remind-in` a reminder fires once after that many minutes.
    Add {
        /// What needs doing
        description: String,

        /// Category label
        #[arg(short, long)]
        category: Option<String>,

        /// Priority: high, medium, or low
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Repeat the reminder every N minutes
        #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u32).range(1..))]
        every: Option<u32>,

        /// Remind once after N minutes
        #[arg(long, value_name = "MINUTES")]
        remind_in: Option<u32>,
    },

    /// List tasks.
    ///
    /// Filtering happens first, then search, then sorting. Filter and sort
    /// default to the values in config.yaml.
    List {
        /// Case-insensitive text to find in description or category
        #[arg(short, long, default_value = "")]
        search: String,

        /// Filter: all, pending, or completed
        #[arg(short, long)]
        filter: Option<String>,

        /// Sort: name, date, or state
        #[arg(long)]
        sort: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Edit a task. Only the given fields change.
    Edit {
        /// Task ID
        id: i64,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New category
        #[arg(short, long, conflicts_with = "clear_category")]
        category: Option<String>,

        /// Remove the category
        #[arg(long)]
        clear_category: bool,

        /// New priority: high, medium, or low
        #[arg(short, long)]
        priority: Option<String>,

        /// Repeat the reminder every N minutes
        #[arg(
            long,
            value_name = "MINUTES",
            conflicts_with = "no_repeat",
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        every: Option<u32>,

        /// Stop repeating
        #[arg(long)]
        no_repeat: bool,

        /// Remind once after N minutes from now
        #[arg(long, value_name = "MINUTES", conflicts_with = "no_reminder")]
        remind_in: Option<u32>,

        /// Clear the one-off reminder time
        #[arg(long)]
        no_reminder: bool,
    },

    /// Flip a task between pending and completed.
    Toggle {
        /// Task ID
        id: i64,
    },

    /// Delete a task and its pending reminder.
    Delete {
        /// Task ID
        id: i64,
    },

    /// Delete every task and every pending reminder.
    Clear,

    /// Deliver reminders as they come due.
    ///
    /// Runs until interrupted. Reminders are printed to stdout.
    Watch {
        /// Deliver what is due now and exit
        #[arg(long)]
        once: bool,
    },

    /// Show version information.
    Version,

    /// Ensure config file exists (create with defaults if not).
    #[command(name = "ensure-config")]
    EnsureConfig,
}
