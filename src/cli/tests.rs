//! Tests for the CLI module.

use super::*;
use crate::paths;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn parse(dir: &Path, args: &[&str]) -> Cli {
    let mut argv = vec!["taskpad", "--data-dir", dir.to_str().unwrap()];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn run_in(dir: &Path, args: &[&str]) -> CliOutput {
    run(parse(dir, args))
}

fn list_json(dir: &Path, extra: &[&str]) -> Vec<serde_json::Value> {
    let mut args = vec!["list", "--json"];
    args.extend_from_slice(extra);
    let output = run_in(dir, &args);
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    serde_json::from_str(&output.stdout[0]).unwrap()
}

#[test]
fn test_parse_add_with_options() {
    let cli = Cli::try_parse_from([
        "taskpad",
        "add",
        "Water plants",
        "--category",
        "Home",
        "--priority",
        "high",
        "--every",
        "60",
    ])
    .unwrap();

    assert!(cli.data_dir.is_none());
    let Command::Add { description, category, priority, every, remind_in } = cli.command else {
        panic!("expected add");
    };
    assert_eq!(description, "Water plants");
    assert_eq!(category.as_deref(), Some("Home"));
    assert_eq!(priority, "high");
    assert_eq!(every, Some(60));
    assert_eq!(remind_in, None);
}

#[test]
fn test_parse_rejects_zero_interval() {
    assert!(Cli::try_parse_from(["taskpad", "add", "x", "--every", "0"]).is_err());
}

#[test]
fn test_parse_rejects_conflicting_edit_flags() {
    assert!(Cli::try_parse_from(["taskpad", "edit", "1", "--every", "5", "--no-repeat"]).is_err());
    assert!(
        Cli::try_parse_from(["taskpad", "edit", "1", "--category", "a", "--clear-category"])
            .is_err()
    );
}

#[test]
fn test_data_dir_is_global() {
    let cli = Cli::try_parse_from(["taskpad", "list", "--data-dir", "/tmp/x"]).unwrap();
    assert_eq!(cli.data_dir.as_deref(), Some(Path::new("/tmp/x")));
}

#[test]
fn test_version_command() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["version"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert!(output.stdout[0].starts_with("taskpad v"));
}

#[test]
fn test_ensure_config_command() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["ensure-config"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert!(paths::config_path(dir.path()).exists());
    assert!(output.stderr.iter().any(|l| l.contains("default_sort: BY_DATE")));
}

#[test]
fn test_add_and_list() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["add", "Buy milk", "--category", "Errands"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert_eq!(output.stdout, vec!["Added task #1".to_string()]);

    let output = run_in(dir.path(), &["list"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert_eq!(output.stdout.len(), 1);
    assert!(output.stdout[0].contains("[ ] Buy milk (MEDIUM) #Errands"));
}

#[test]
fn test_add_with_reminder_reports_schedule() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["add", "Call mum", "--remind-in", "10"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert!(output.stdout[1].starts_with("Reminder set for "));
}

#[test]
fn test_add_rejects_bad_priority() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["add", "x", "--priority", "urgent"]);
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stderr[0].contains("invalid priority"));
}

#[test]
fn test_add_rejects_blank_description() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["add", "   "]);
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stdout.is_empty());
    assert!(output.stderr[0].contains("task description must not be empty"));
    assert!(list_json(dir.path(), &[]).is_empty());
}

#[test]
fn test_list_empty() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["list"]);
    assert_eq!(output.stdout, vec!["No tasks".to_string()]);
}

#[test]
fn test_list_filter_search_sort() {
    let dir = TempDir::new().unwrap();
    run_in(dir.path(), &["add", "pay rent"]);
    run_in(dir.path(), &["add", "Buy milk", "--category", "Errands"]);
    run_in(dir.path(), &["add", "Call mum"]);
    run_in(dir.path(), &["toggle", "1"]);

    let pending = list_json(dir.path(), &["--filter", "pending", "--sort", "name"]);
    let names: Vec<&str> = pending.iter().map(|t| t["description"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Buy milk", "Call mum"]);

    let searched = list_json(dir.path(), &["--search", "ERRANDS"]);
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0]["category"], "Errands");

    let completed = list_json(dir.path(), &["--filter", "completed"]);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["completed"], true);
}

#[test]
fn test_list_rejects_bad_modes() {
    let dir = TempDir::new().unwrap();
    assert_eq!(run_in(dir.path(), &["list", "--filter", "done"]).exit_code, ExitCode::from(1));
    assert_eq!(run_in(dir.path(), &["list", "--sort", "size"]).exit_code, ExitCode::from(1));
}

#[test]
fn test_list_uses_configured_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(paths::config_path(dir.path()), "default_filter: PENDING\n").unwrap();
    run_in(dir.path(), &["add", "a"]);
    run_in(dir.path(), &["add", "b"]);
    run_in(dir.path(), &["toggle", "2"]);

    assert_eq!(list_json(dir.path(), &[]).len(), 1);
}

#[test]
fn test_edit_fields() {
    let dir = TempDir::new().unwrap();
    run_in(dir.path(), &["add", "Buy milk", "--category", "Errands", "--every", "30"]);

    let output = run_in(
        dir.path(),
        &["edit", "1", "--description", "Buy oat milk", "--clear-category", "--priority", "low"],
    );
    assert_eq!(output.exit_code, ExitCode::SUCCESS);

    let tasks = list_json(dir.path(), &[]);
    assert_eq!(tasks[0]["description"], "Buy oat milk");
    assert_eq!(tasks[0]["priority"], "LOW");
    assert!(tasks[0].get("category").is_none());
    assert_eq!(tasks[0]["repeat_minutes"], 30);

    run_in(dir.path(), &["edit", "1", "--no-repeat"]);
    let tasks = list_json(dir.path(), &[]);
    assert!(tasks[0].get("repeat_minutes").is_none());
}

#[test]
fn test_edit_missing_task() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["edit", "42", "--description", "x"]);
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert_eq!(output.stderr, vec!["Task not found: 42".to_string()]);
}

#[test]
fn test_toggle_round_trip() {
    let dir = TempDir::new().unwrap();
    run_in(dir.path(), &["add", "a"]);

    let output = run_in(dir.path(), &["toggle", "1"]);
    assert_eq!(output.stdout[0], "Marked task #1 completed");
    let output = run_in(dir.path(), &["toggle", "1"]);
    assert_eq!(output.stdout[0], "Marked task #1 pending");
    assert_eq!(run_in(dir.path(), &["toggle", "9"]).exit_code, ExitCode::from(1));
}

#[test]
fn test_completing_keeps_pending_reminder() {
    let dir = TempDir::new().unwrap();
    run_in(dir.path(), &["add", "Call mum", "--remind-in", "10"]);

    let output = run_in(dir.path(), &["toggle", "1"]);
    assert_eq!(output.stdout[0], "Marked task #1 completed");
    assert!(output.stdout[1].starts_with("Reminder still set for "));

    let output = run_in(dir.path(), &["toggle", "1"]);
    assert_eq!(output.stdout[0], "Marked task #1 pending");
    assert!(output.stdout[1].starts_with("Reminder set for "));
}

#[test]
fn test_delete_and_clear() {
    let dir = TempDir::new().unwrap();
    run_in(dir.path(), &["add", "a"]);
    run_in(dir.path(), &["add", "b"]);
    run_in(dir.path(), &["add", "c"]);

    assert_eq!(run_in(dir.path(), &["delete", "2"]).exit_code, ExitCode::SUCCESS);
    assert_eq!(run_in(dir.path(), &["delete", "2"]).exit_code, ExitCode::from(1));

    let output = run_in(dir.path(), &["clear"]);
    assert_eq!(output.stdout, vec!["Deleted 2 task(s)".to_string()]);

    // Ids are not reused after clearing.
    assert_eq!(run_in(dir.path(), &["add", "d"]).stdout[0], "Added task #4");
}

#[test]
fn test_watch_once_delivers_due_reminders() {
    let dir = TempDir::new().unwrap();
    run_in(dir.path(), &["add", "Stretch", "--every", "30"]);
    run_in(dir.path(), &["add", "Later", "--remind-in", "60"]);

    let output = run_in(dir.path(), &["watch", "--once"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert_eq!(output.stdout, vec!["Delivered 1 reminder(s)".to_string()]);

    // The recurring reminder was re-armed for its next period.
    let output = run_in(dir.path(), &["watch", "--once"]);
    assert_eq!(output.stdout, vec!["Delivered 0 reminder(s)".to_string()]);
}
