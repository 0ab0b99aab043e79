//! Command execution for the CLI.
//!
//! This module handles running CLI commands and producing output.

use crate::board::{ReminderStatus, Saved, TaskBoard};
use crate::cli::{Cli, Command};
use crate::config::{self, AppConfig};
use crate::logging;
use crate::paths;
use crate::reminders::{ConsoleNotifier, ReminderWorker};
use crate::tasks::{NewTask, Priority, Task, TaskId};
use crate::traits::{Clock, SystemClock};
use crate::view::{FilterMode, SortMode};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Notify;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

/// Run a parsed CLI invocation.
pub fn run(cli: Cli) -> CliOutput {
    let data_dir = match paths::resolve_data_dir(cli.data_dir) {
        Ok(dir) => dir,
        Err(e) => return error_output(e.to_string()),
    };

    match cli.command {
        Command::Version => run_version(),
        Command::EnsureConfig => run_ensure_config(&data_dir),
        Command::Add { description, category, priority, every, remind_in } => {
            with_board(&data_dir, |board, _| {
                task_add(&board, description, category, &priority, every, remind_in)
            })
        }
        Command::List { search, filter, sort, json } => with_board(&data_dir, |board, config| {
            task_list(&board, config, search, filter.as_deref(), sort.as_deref(), json)
        }),
        Command::Edit {
            id,
            description,
            category,
            clear_category,
            priority,
            every,
            no_repeat,
            remind_in,
            no_reminder,
        } => {
            let edit = TaskEdit {
                description,
                category: if clear_category { Some(None) } else { category.map(Some) },
                priority,
                every: if no_repeat { Some(None) } else { every.map(Some) },
                remind_in: if no_reminder { Some(None) } else { remind_in.map(Some) },
            };
            with_board(&data_dir, |board, _| task_edit(&board, id, edit))
        }
        Command::Toggle { id } => with_board(&data_dir, |board, _| task_toggle(&board, id)),
        Command::Delete { id } => with_board(&data_dir, |board, _| task_delete(&board, id)),
        Command::Clear => with_board(&data_dir, |board, _| task_clear(&board)),
        Command::Watch { once } => {
            with_board(&data_dir, |board, config| task_watch(board, config, once))
        }
    }
}

// === Utility Commands ===

fn run_version() -> CliOutput {
    success_output(format!("taskpad v{}", crate::VERSION))
}

fn run_ensure_config(data_dir: &Path) -> CliOutput {
    match config::ensure_config_in(data_dir) {
        Ok(config) => {
            let messages = vec![
                format!("Config ensured at {}", paths::config_path(data_dir).display()),
                format!("  poll_interval_secs: {}", config.poll_interval_secs),
                format!("  channel_id: {}", config.channel_id),
                format!("  default_filter: {}", config.default_filter),
                format!("  default_sort: {}", config.default_sort),
            ];
            CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![], stderr: messages }
        }
        Err(e) => error_output(format!("Error ensuring config: {e}")),
    }
}

// === Task Commands ===

/// Load config, start logging, open the board, then hand it to `f`.
fn with_board(data_dir: &Path, f: impl FnOnce(TaskBoard, &AppConfig) -> CliOutput) -> CliOutput {
    let config = match config::load_or_default(data_dir) {
        Ok(c) => c,
        Err(e) => return error_output(format!("Error loading config: {e}")),
    };
    logging::init(&config.log_filter);

    match TaskBoard::open(data_dir, &config, Arc::new(ConsoleNotifier::new())) {
        Ok(board) => f(board, &config),
        Err(e) => error_output(format!("Error opening task database: {e}")),
    }
}

fn remind_at(minutes: u32) -> i64 {
    SystemClock.now_millis().saturating_add(i64::from(minutes) * 60_000)
}

fn task_add(
    board: &TaskBoard,
    description: String,
    category: Option<String>,
    priority: &str,
    every: Option<u32>,
    remind_in: Option<u32>,
) -> CliOutput {
    let priority = match Priority::from_str(priority) {
        Ok(p) => p,
        Err(e) => return error_output(e.to_string()),
    };

    let mut task = NewTask::new(description).with_priority(priority);
    if let Some(category) = category {
        task = task.with_category(category);
    }
    if let Some(minutes) = every {
        task = task.recurring_every(minutes);
    }
    if let Some(minutes) = remind_in {
        task = task.remind_at(remind_at(minutes));
    }

    match board.add_task(task) {
        Ok(saved) => saved_output(format!("Added task #{}", saved.id), &saved),
        Err(e) => error_output(e.to_string()),
    }
}

fn task_list(
    board: &TaskBoard,
    config: &AppConfig,
    search: String,
    filter: Option<&str>,
    sort: Option<&str>,
    json: bool,
) -> CliOutput {
    let mut query = config.default_query();
    query.search = search;
    match filter.map(FilterMode::from_str).transpose() {
        Ok(Some(f)) => query.filter = f,
        Ok(None) => {}
        Err(e) => return error_output(e.to_string()),
    }
    match sort.map(SortMode::from_str).transpose() {
        Ok(Some(s)) => query.sort = s,
        Ok(None) => {}
        Err(e) => return error_output(e.to_string()),
    }

    let tasks = match board.list(&query) {
        Ok(t) => t,
        Err(e) => return error_output(e.to_string()),
    };

    if json {
        let output: Vec<TaskOutput> = tasks.iter().map(TaskOutput::from).collect();
        return json_output(&output);
    }
    if tasks.is_empty() {
        return success_output("No tasks".to_string());
    }
    CliOutput {
        exit_code: ExitCode::SUCCESS,
        stdout: tasks.iter().map(task_line).collect(),
        stderr: vec![],
    }
}

/// Field changes for `edit`. The outer `Option` is "change this field", the
/// inner one is the new value where the field can be cleared.
struct TaskEdit {
    description: Option<String>,
    category: Option<Option<String>>,
    priority: Option<String>,
    every: Option<Option<u32>>,
    remind_in: Option<Option<u32>>,
}

fn task_edit(board: &TaskBoard, id: TaskId, edit: TaskEdit) -> CliOutput {
    let mut task = match board.get(id) {
        Ok(Some(t)) => t,
        Ok(None) => return error_output(format!("Task not found: {id}")),
        Err(e) => return error_output(e.to_string()),
    };

    if let Some(description) = edit.description {
        task.description = description;
    }
    if let Some(category) = edit.category {
        task.category = category;
    }
    if let Some(priority) = edit.priority {
        match Priority::from_str(&priority) {
            Ok(p) => task.priority = p,
            Err(e) => return error_output(e.to_string()),
        }
    }
    if let Some(every) = edit.every {
        task.is_recurring = every.is_some();
        task.recurrence_minutes = every.unwrap_or(0);
    }
    if let Some(remind_in) = edit.remind_in {
        task.next_run_at = remind_in.map_or(0, remind_at);
    }

    match board.update_task(task) {
        Ok(saved) => saved_output(format!("Updated task #{id}"), &saved),
        Err(e) => error_output(e.to_string()),
    }
}

fn task_toggle(board: &TaskBoard, id: TaskId) -> CliOutput {
    let task = match board.get(id) {
        Ok(Some(t)) => t,
        Ok(None) => return error_output(format!("Task not found: {id}")),
        Err(e) => return error_output(e.to_string()),
    };

    match board.toggle_completion(&task) {
        Ok(saved) => {
            let state = if task.is_completed { "pending" } else { "completed" };
            let mut output = saved_output(format!("Marked task #{id} {state}"), &saved);
            // Completing a task does not cancel its reminder.
            if !task.is_completed {
                if let Ok(Some(job)) = board.scheduler().pending(id) {
                    let at = format_time(job.fire_at);
                    output.stdout.push(format!("Reminder still set for {at}"));
                }
            }
            output
        }
        Err(e) => error_output(e.to_string()),
    }
}

fn task_delete(board: &TaskBoard, id: TaskId) -> CliOutput {
    match board.delete_task(id) {
        Ok(true) => success_output(format!("Deleted task #{id}")),
        Ok(false) => error_output(format!("Task not found: {id}")),
        Err(e) => error_output(e.to_string()),
    }
}

fn task_clear(board: &TaskBoard) -> CliOutput {
    match board.delete_all() {
        Ok(count) => success_output(format!("Deleted {count} task(s)")),
        Err(e) => error_output(e.to_string()),
    }
}

fn task_watch(board: TaskBoard, config: &AppConfig, once: bool) -> CliOutput {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(r) => r,
        Err(e) => return error_output(format!("Error starting runtime: {e}")),
    };
    let worker = ReminderWorker::new(Arc::new(board), config.poll_interval());

    if once {
        return match runtime.block_on(worker.run_once()) {
            Ok(reports) => success_output(format!("Delivered {} reminder(s)", reports.len())),
            Err(e) => error_output(e.to_string()),
        };
    }

    let delivered = runtime.block_on(async {
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal.notify_one();
            }
        });
        worker.run(shutdown).await
    });
    success_output(format!("Delivered {delivered} reminder(s)"))
}

// === Helpers ===

fn format_time(epoch_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_millis)
        .map_or_else(|| epoch_millis.to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string())
}

fn task_line(task: &Task) -> String {
    let mark = if task.is_completed { 'x' } else { ' ' };
    let mut line = format!("{:>4} [{mark}] {} ({})", task.id, task.description, task.priority);
    if let Some(category) = &task.category {
        let _ = write!(line, " #{category}");
    }
    if task.is_recurring {
        let _ = write!(line, " every {}m", task.recurrence_minutes);
    }
    if task.next_run_at > 0 {
        let _ = write!(line, " at {}", format_time(task.next_run_at));
    }
    line
}

fn saved_output(message: String, saved: &Saved) -> CliOutput {
    let mut output = success_output(message);
    match &saved.reminder {
        ReminderStatus::Scheduled(job) => {
            output.stdout.push(format!("Reminder set for {}", format_time(job.fire_at)));
        }
        ReminderStatus::NotScheduled => {}
        ReminderStatus::Failed(e) => {
            output.stderr.push(format!("Warning: reminder not scheduled: {e}"));
        }
    }
    output
}

fn json_output<T: Serialize>(value: &T) -> CliOutput {
    match serde_json::to_string_pretty(value) {
        Ok(json) => CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![json], stderr: vec![] },
        Err(e) => error_output(e.to_string()),
    }
}

fn success_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![message], stderr: vec![] }
}

fn error_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
}

// === Output Types ===

/// Task as printed by `list --json`.
#[derive(Debug, Serialize)]
struct TaskOutput {
    id: TaskId,
    description: String,
    completed: bool,
    priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remind_at: Option<String>,
}

impl From<&Task> for TaskOutput {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            description: task.description.clone(),
            completed: task.is_completed,
            priority: task.priority,
            category: task.category.clone(),
            created_at: format_time(task.created_at),
            repeat_minutes: task.is_recurring.then_some(task.recurrence_minutes),
            remind_at: (task.next_run_at > 0).then(|| format_time(task.next_run_at)),
        }
    }
}

